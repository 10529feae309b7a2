//! Project field rules
//!
//! Shared by the request layer and the store, so both reject the same
//! input with the same error kind.

use serde::Deserialize;
use url::Url;

use crate::core::error::{Error, Result};

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
pub const MIN_DESCRIPTION_WORDS: usize = 75;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 5_000;
pub const DEFAULT_TECHNOLOGY: &str = "General";

/// Types accepted for new uploads.
pub const UPLOAD_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];
/// Types that may be served from stored records.
pub const STORED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Please add a title".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(Error::Validation(format!(
            "Title cannot be more than {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

pub fn validate_description(description: &str) -> Result<String> {
    if description.trim().is_empty() {
        return Err(Error::Validation("Please add a description".to_string()));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(Error::Validation(format!(
            "Description cannot be more than {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }
    if word_count(description) < MIN_DESCRIPTION_WORDS {
        return Err(Error::DescriptionTooShort {
            min: MIN_DESCRIPTION_WORDS,
        });
    }
    Ok(description.to_string())
}

/// `technologies` arrives as a list or as one comma-delimited string. List
/// items are kept whole (`"Node.js, Express"` stays one tag).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TechnologiesInput {
    List(Vec<String>),
    Delimited(String),
}

impl TechnologiesInput {
    /// Trimmed, non-empty entries in order. Never empty.
    pub fn normalize(self) -> Vec<String> {
        let entries: Vec<String> = match self {
            TechnologiesInput::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            TechnologiesInput::Delimited(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        };
        if entries.is_empty() {
            vec![DEFAULT_TECHNOLOGY.to_string()]
        } else {
            entries
        }
    }
}

/// Empty means no link; anything else must be an absolute http(s) URL.
pub fn validate_link(field: &str, raw: &str) -> Result<Option<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            Ok(Some(raw.to_string()))
        }
        _ => Err(Error::Validation(format!(
            "Please use a valid URL with HTTP or HTTPS for {}",
            field
        ))),
    }
}

/// Declared type first, then a guess from the filename. Parameters are
/// dropped and `image/jpg` is folded into `image/jpeg`.
pub fn resolve_content_type(declared: Option<&str>, filename: Option<&str>) -> Option<String> {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    let resolved = declared.or_else(|| {
        filename
            .and_then(|name| mime_guess::from_path(name).first())
            .map(|mime| mime.essence_str().to_string())
    })?;

    Some(match resolved.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => resolved,
    })
}

pub fn check_upload_type(content_type: &str) -> Result<()> {
    if UPLOAD_IMAGE_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(Error::UnsupportedImageType(content_type.to_string()))
    }
}

pub fn is_servable_type(content_type: &str) -> bool {
    STORED_IMAGE_TYPES.contains(&content_type)
}
