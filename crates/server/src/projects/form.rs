//! Project request body
//!
//! Create and update accept either `multipart/form-data` (the only way to
//! attach an image) or a JSON object. Both land in `ProjectForm`, which
//! validates text fields before it looks at the image.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use bytes::{Bytes, BytesMut};
use serde::Deserialize;
use tracing::debug;

use super::models::{NewProject, ProjectChanges, ProjectImage};
use super::validation::{
    check_upload_type, resolve_content_type, validate_description, validate_link, validate_title,
    TechnologiesInput, MAX_IMAGE_BYTES,
};
use crate::core::error::{Error, Result};
use crate::core::extract::ApiJson;

/// An image field as received, before type checks.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub data: Bytes,
    pub declared_type: Option<String>,
    pub filename: Option<String>,
}

impl RawUpload {
    fn into_image(self) -> Result<ProjectImage> {
        let content_type = resolve_content_type(self.declared_type.as_deref(), self.filename.as_deref())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        check_upload_type(&content_type)?;
        if self.data.is_empty() {
            return Err(Error::EmptyUpload);
        }
        Ok(ProjectImage {
            data: self.data,
            content_type,
            filename: self.filename,
        })
    }
}

#[derive(Debug, Default)]
pub struct ProjectForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<TechnologiesInput>,
    pub github_url: Option<String>,
    pub live_demo_url: Option<String>,
    pub image: Option<RawUpload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectJson {
    title: Option<String>,
    description: Option<String>,
    technologies: Option<TechnologiesInput>,
    github_url: Option<String>,
    github_link: Option<String>,
    live_demo_url: Option<String>,
    live_demo: Option<String>,
}

impl From<ProjectJson> for ProjectForm {
    fn from(body: ProjectJson) -> Self {
        Self {
            title: body.title,
            description: body.description,
            technologies: body.technologies,
            github_url: body.github_url.or(body.github_link),
            live_demo_url: body.live_demo_url.or(body.live_demo),
            image: None,
        }
    }
}

impl ProjectForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = ProjectForm::default();
        let mut tags: Vec<String> = Vec::new();
        let mut saw_tags = false;
        let mut bracketed = false;
        let mut github_link = None;
        let mut live_demo = None;

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" {
                if form.image.is_some() {
                    return Err(Error::Validation("Only one image may be uploaded".to_string()));
                }
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty());
                let declared_type = field.content_type().map(str::to_string);

                // Stop reading as soon as the ceiling is crossed.
                let mut buf = BytesMut::new();
                while let Some(chunk) = field.chunk().await? {
                    if buf.len() + chunk.len() > MAX_IMAGE_BYTES {
                        debug!("[Projects] Upload abandoned above {} bytes", MAX_IMAGE_BYTES);
                        return Err(Error::PayloadTooLarge {
                            limit: MAX_IMAGE_BYTES,
                        });
                    }
                    buf.extend_from_slice(&chunk);
                }

                // Browsers send an empty, nameless part when no file was picked.
                if filename.is_none() && buf.is_empty() {
                    continue;
                }
                form.image = Some(RawUpload {
                    data: buf.freeze(),
                    declared_type,
                    filename,
                });
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "description" => form.description = Some(value),
                "technologies" | "technologies[]" => {
                    saw_tags = true;
                    bracketed |= name == "technologies[]";
                    tags.push(value);
                }
                "githubUrl" => form.github_url = Some(value),
                "githubLink" => github_link = Some(value),
                "liveDemoUrl" => form.live_demo_url = Some(value),
                "liveDemo" => live_demo = Some(value),
                other => debug!("[Projects] Ignoring form field {}", other),
            }
        }

        // A lone plain field is the delimited form; repeated fields are a list.
        if saw_tags {
            form.technologies = Some(if tags.len() == 1 && !bracketed {
                TechnologiesInput::Delimited(tags.remove(0))
            } else {
                TechnologiesInput::List(tags)
            });
        }
        form.github_url = form.github_url.or(github_link);
        form.live_demo_url = form.live_demo_url.or(live_demo);
        Ok(form)
    }

    pub fn into_new_project(self) -> Result<NewProject> {
        let title = validate_title(self.title.as_deref().unwrap_or_default())?;
        let description = validate_description(self.description.as_deref().unwrap_or_default())?;
        let technologies = self
            .technologies
            .unwrap_or(TechnologiesInput::List(Vec::new()))
            .normalize();
        let github_url = link(self.github_url, "githubUrl")?.flatten();
        let live_demo_url = link(self.live_demo_url, "liveDemoUrl")?.flatten();
        let image = self.image.map(RawUpload::into_image).transpose()?;

        Ok(NewProject {
            title,
            description,
            technologies,
            github_url,
            live_demo_url,
            image,
        })
    }

    pub fn into_changes(self) -> Result<ProjectChanges> {
        let title = self.title.as_deref().map(validate_title).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        let technologies = self.technologies.map(TechnologiesInput::normalize);
        let github_url = link(self.github_url, "githubUrl")?;
        let live_demo_url = link(self.live_demo_url, "liveDemoUrl")?;
        let image = self.image.map(RawUpload::into_image).transpose()?;

        Ok(ProjectChanges {
            title,
            description,
            technologies,
            github_url,
            live_demo_url,
            image,
        })
    }
}

/// `None` when the field was absent, `Some(None)` when it was blank.
fn link(raw: Option<String>, field: &str) -> Result<Option<Option<String>>> {
    raw.map(|value| validate_link(field, &value)).transpose()
}

impl<S> FromRequest<S> for ProjectForm
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| Error::Validation(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else {
            let ApiJson(body) = ApiJson::<ProjectJson>::from_request(req, state).await?;
            Ok(body.into())
        }
    }
}
