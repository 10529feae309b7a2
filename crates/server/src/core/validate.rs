//! Shared input checks

use once_cell::sync::Lazy;
use regex::Regex;

// Basic `x@y.z` shape; deliverability is the mail server's problem.
static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

pub fn is_plausible_email(value: &str) -> bool {
    match EMAIL_RE.as_ref() {
        Some(re) => re.is_match(value),
        None => false,
    }
}

/// Trimmed value, or `None` when nothing is left.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
