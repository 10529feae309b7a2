//! Project data model

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::router::API_PREFIX;

/// Image bytes as uploaded, already type-checked and size-checked.
#[derive(Debug, Clone)]
pub struct ProjectImage {
    pub data: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
}

impl ProjectImage {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Validated input for a new project.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_demo_url: Option<String>,
    pub image: Option<ProjectImage>,
}

/// Partial update. `None` leaves the stored value alone; for the link
/// fields `Some(None)` clears the link.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub github_url: Option<Option<String>>,
    pub live_demo_url: Option<Option<String>>,
    pub image: Option<ProjectImage>,
}

/// Stored image metadata; the bytes are only read by the image endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    pub content_type: String,
    pub filename: Option<String>,
    pub size: i64,
    #[serde(skip)]
    pub digest: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A project as read back from storage, without image bytes.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_demo_url: Option<String>,
    pub image: Option<ImageMeta>,
    pub owner: OwnerInfo,
    pub created_at: DateTime<Utc>,
}

/// Wire shape of a project in list and detail responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub live_demo_url: Option<String>,
    pub image: Option<ImageMeta>,
    pub image_url: Option<String>,
    pub user: OwnerInfo,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectRecord> for ProjectView {
    fn from(record: ProjectRecord) -> Self {
        let image_url = record
            .image
            .as_ref()
            .map(|meta| image_url(&record.id, &meta.digest));
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            technologies: record.technologies,
            github_url: record.github_url,
            live_demo_url: record.live_demo_url,
            image: record.image,
            image_url,
            user: record.owner,
            created_at: record.created_at,
        }
    }
}

/// The digest prefix changes whenever the image does, so clients can
/// cache the byte response forever.
pub fn image_url(project_id: &str, digest: &str) -> String {
    let version: String = digest.chars().take(12).collect();
    format!("{}/projects/{}/image?v={}", API_PREFIX, project_id, version)
}

/// Raw image as served by the byte endpoint.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub data: Vec<u8>,
    pub content_type: String,
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image: Option<ImageMeta>) -> ProjectRecord {
        ProjectRecord {
            id: "p1".to_string(),
            title: "T".to_string(),
            description: "D".to_string(),
            technologies: vec!["Rust".to_string()],
            github_url: None,
            live_demo_url: None,
            image,
            owner: OwnerInfo {
                id: "u1".to_string(),
                name: "N".to_string(),
                email: "n@example.com".to_string(),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_without_image() {
        let value = serde_json::to_value(ProjectView::from(record(None))).unwrap();
        assert_eq!(value["_id"], "p1");
        assert!(value["imageUrl"].is_null());
        assert!(value["image"].is_null());
        assert_eq!(value["user"]["email"], "n@example.com");
    }

    #[test]
    fn test_view_with_image_has_url_and_no_bytes() {
        let meta = ImageMeta {
            content_type: "image/png".to_string(),
            filename: Some("shot.png".to_string()),
            size: 1234,
            digest: "abcdef0123456789".to_string(),
        };
        let value = serde_json::to_value(ProjectView::from(record(Some(meta)))).unwrap();

        assert_eq!(value["imageUrl"], "/api/v1/projects/p1/image?v=abcdef012345");
        assert_eq!(value["image"]["contentType"], "image/png");
        assert_eq!(value["image"]["size"], 1234);
        assert!(value["image"].get("data").is_none());
        assert!(value["image"].get("digest").is_none());
    }
}
