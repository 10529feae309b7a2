//! Project handlers

use axum::{
    body::Body,
    extract::{FromRequest, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use super::form::ProjectForm;
use super::models::{ProjectRecord, ProjectView};
use super::validation::is_servable_type;
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::core::response::DataResponse;

const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// GET /projects
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectView>>> {
    info!("GET /projects");
    let projects = state.projects.list().await?;
    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

/// GET /projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<DataResponse<ProjectView>> {
    info!("GET /projects/{}", id);
    let project = state.projects.get(&id).await?;
    Ok(DataResponse::ok(project.into()))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    ctx: Ctx,
    form: ProjectForm,
) -> Result<DataResponse<ProjectView>> {
    info!("POST /projects - {}", ctx.user_id());

    let new_project = form.into_new_project()?;
    let project = state.projects.insert(ctx.user_id(), new_project).await?;

    Ok(DataResponse::created(project.into()))
}

/// PUT /projects/{id}
///
/// The body is only read once the project exists and the caller may modify
/// it, so 404 and 403 win over body errors.
pub async fn update_project(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
    req: Request,
) -> Result<DataResponse<ProjectView>> {
    info!("PUT /projects/{} - {}", id, ctx.user_id());

    let existing = state.projects.get(&id).await?;
    ensure_can_modify(&ctx, &existing, "update")?;

    let form = ProjectForm::from_request(req, &state).await?;
    let changes = form.into_changes()?;
    let project = state.projects.update(&id, changes).await?;

    Ok(DataResponse::ok(project.into()))
}

/// DELETE /projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    info!("DELETE /projects/{} - {}", id, ctx.user_id());

    let existing = state.projects.get(&id).await?;
    ensure_can_modify(&ctx, &existing, "delete")?;

    state.projects.delete(&id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}

/// GET /projects/{id}/image
pub async fn get_project_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let image = state.projects.image(&id).await?;

    if !is_servable_type(&image.content_type) {
        warn!("[Projects] Refusing to serve {} for {}", image.content_type, id);
        return Err(Error::NotFound("No image found for this project".to_string()));
    }

    let etag = format!("\"{}\"", image.digest);
    let etag_value =
        HeaderValue::from_str(&etag).map_err(|e| Error::Internal(format!("Bad ETag: {e}")))?;

    if etag_matches(&headers, &etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [
                (header::ETAG, etag_value),
                (header::CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL)),
            ],
        )
            .into_response());
    }

    let content_type = HeaderValue::from_str(&image.content_type)
        .map_err(|e| Error::Internal(format!("Bad content type: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL)),
            (header::ETAG, etag_value),
        ],
        Body::from(image.data),
    )
        .into_response())
}

fn ensure_can_modify(ctx: &Ctx, project: &ProjectRecord, action: &str) -> Result<()> {
    if ctx.can_modify(&project.owner.id) {
        return Ok(());
    }
    warn!(
        "[Projects] {} tried to {} project {} owned by {}",
        ctx.user_id(),
        action,
        project.id,
        project.owner.id
    );
    Err(Error::Forbidden(format!(
        "User {} is not authorized to {} this project",
        ctx.user_id(),
        action
    )))
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|tag| {
            let tag = tag.trim();
            tag == "*" || tag.trim_start_matches("W/") == etag
        }))
        .unwrap_or(false)
}
