//! Project Store
//!
//! SQLite-backed project records. Image bytes live in the same row as the
//! rest of the record, so every create and update is a single statement.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{
    ImageMeta, NewProject, OwnerInfo, ProjectChanges, ProjectImage, ProjectRecord, StoredImage,
};
use super::validation::{word_count, MIN_DESCRIPTION_WORDS};
use crate::core::db::Database;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Description must be at least {min} words.")]
    DescriptionTooShort { min: usize },
    #[error("{0}")]
    Invalid(String),
    #[error("A project with this title already exists")]
    DuplicateTitle,
    #[error("Project not found with id of {0}")]
    NotFound(String),
    #[error("No image found for this project")]
    NoImage,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const SELECT_PROJECT: &str = r#"
    SELECT p.id, p.title, p.description, p.technologies, p.github_url, p.live_demo_url,
           p.image_content_type, p.image_filename, p.image_size, p.image_digest, p.created_at,
           u.id AS owner_id, u.name AS owner_name, u.email AS owner_email
    FROM projects p
    JOIN users u ON u.id = p.owner_id
"#;

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    title: String,
    description: String,
    technologies: Json<Vec<String>>,
    github_url: Option<String>,
    live_demo_url: Option<String>,
    image_content_type: Option<String>,
    image_filename: Option<String>,
    image_size: Option<i64>,
    image_digest: Option<String>,
    created_at: DateTime<Utc>,
    owner_id: String,
    owner_name: String,
    owner_email: String,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        let image = match (row.image_content_type, row.image_size, row.image_digest) {
            (Some(content_type), Some(size), Some(digest)) => Some(ImageMeta {
                content_type,
                filename: row.image_filename,
                size,
                digest,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            technologies: row.technologies.0,
            github_url: row.github_url,
            live_demo_url: row.live_demo_url,
            image,
            owner: OwnerInfo {
                id: row.owner_id,
                name: row.owner_name,
                email: row.owner_email,
            },
            created_at: row.created_at,
        }
    }
}

/// Column values for an image write. All `None` leaves the stored image.
struct ImageColumns {
    data: Option<Vec<u8>>,
    content_type: Option<String>,
    filename: Option<String>,
    size: Option<i64>,
    digest: Option<String>,
}

impl ImageColumns {
    fn from_image(image: Option<ProjectImage>) -> Self {
        match image {
            Some(image) => Self {
                size: Some(image.size() as i64),
                digest: Some(digest_hex(&image.data)),
                data: Some(image.data.to_vec()),
                content_type: Some(image.content_type),
                filename: image.filename,
            },
            None => Self {
                data: None,
                content_type: None,
                filename: None,
                size: None,
                digest: None,
            },
        }
    }
}

pub fn digest_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Last line of defence; the request layer applies the same rules first.
fn check_record(title: &str, description: &str, technologies: &[String]) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::Invalid("Please add a title".to_string()));
    }
    if word_count(description) < MIN_DESCRIPTION_WORDS {
        return Err(StoreError::DescriptionTooShort {
            min: MIN_DESCRIPTION_WORDS,
        });
    }
    if technologies.is_empty() {
        return Err(StoreError::Invalid(
            "Please add at least one technology".to_string(),
        ));
    }
    Ok(())
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateTitle,
        _ => StoreError::Database(e),
    }
}

pub struct ProjectStore {
    db: Arc<Database>,
}

impl ProjectStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All projects, newest first.
    pub async fn list(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        let pool = self.db.pool().await?;
        let rows: Vec<ProjectRow> =
            sqlx::query_as(&format!("{SELECT_PROJECT} ORDER BY p.created_at DESC"))
                .fetch_all(&pool)
                .await?;
        debug!("[Projects] Listed {} projects", rows.len());
        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<ProjectRecord, StoreError> {
        let pool = self.db.pool().await?;
        let row: Option<ProjectRow> = sqlx::query_as(&format!("{SELECT_PROJECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&pool)
            .await?;
        row.map(ProjectRecord::from)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub async fn insert(&self, owner_id: &str, project: NewProject) -> Result<ProjectRecord, StoreError> {
        check_record(&project.title, &project.description, &project.technologies)?;

        let pool = self.db.pool().await?;
        let id = Uuid::new_v4().to_string();
        let image = ImageColumns::from_image(project.image);

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, title, description, technologies, github_url, live_demo_url,
                image_data, image_content_type, image_filename, image_size, image_digest,
                owner_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(Json(&project.technologies))
        .bind(&project.github_url)
        .bind(&project.live_demo_url)
        .bind(image.data)
        .bind(image.content_type)
        .bind(image.filename)
        .bind(image.size)
        .bind(image.digest)
        .bind(owner_id)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .map_err(map_write_error)?;

        info!("[Projects] Created project {} for {}", id, owner_id);
        self.get(&id).await
    }

    /// Merge `changes` into the stored record and write it back.
    pub async fn update(&self, id: &str, changes: ProjectChanges) -> Result<ProjectRecord, StoreError> {
        let current = self.get(id).await?;

        let title = changes.title.unwrap_or(current.title);
        let description = changes.description.unwrap_or(current.description);
        let technologies = changes.technologies.unwrap_or(current.technologies);
        let github_url = changes.github_url.unwrap_or(current.github_url);
        let live_demo_url = changes.live_demo_url.unwrap_or(current.live_demo_url);
        check_record(&title, &description, &technologies)?;

        let pool = self.db.pool().await?;
        let image = ImageColumns::from_image(changes.image);

        let result = sqlx::query(
            r#"
            UPDATE projects SET
                title = ?, description = ?, technologies = ?, github_url = ?, live_demo_url = ?,
                image_data = COALESCE(?, image_data),
                image_content_type = COALESCE(?, image_content_type),
                image_filename = CASE WHEN ? IS NULL THEN image_filename ELSE ? END,
                image_size = COALESCE(?, image_size),
                image_digest = COALESCE(?, image_digest)
            WHERE id = ?
            "#,
        )
        .bind(&title)
        .bind(&description)
        .bind(Json(&technologies))
        .bind(&github_url)
        .bind(&live_demo_url)
        .bind(image.data)
        .bind(image.content_type)
        .bind(&image.digest)
        .bind(image.filename)
        .bind(image.size)
        .bind(&image.digest)
        .bind(id)
        .execute(&pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        info!("[Projects] Updated project {}", id);
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let pool = self.db.pool().await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        info!("[Projects] Deleted project {}", id);
        Ok(())
    }

    pub async fn image(&self, id: &str) -> Result<StoredImage, StoreError> {
        let pool = self.db.pool().await?;
        let row: Option<(Option<Vec<u8>>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT image_data, image_content_type, image_digest FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&pool)
        .await?;

        match row {
            None => Err(StoreError::NotFound(id.to_string())),
            Some((Some(data), Some(content_type), digest)) if !data.is_empty() => {
                let digest = digest.unwrap_or_else(|| digest_hex(&data));
                Ok(StoredImage {
                    data,
                    content_type,
                    digest,
                })
            }
            Some(_) => Err(StoreError::NoImage),
        }
    }
}
