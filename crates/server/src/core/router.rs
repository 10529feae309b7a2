//! Router
//!
//! Public and protected API routes under `/api/v1`, plus the root, health
//! and fallback routes. Protected routes get `mw_require_auth` through
//! `route_layer`, so unknown paths still reach the JSON 404 fallback.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{Method, StatusCode, Uri},
    middleware::{from_fn_with_state, map_response_with_state},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::chat;
use crate::contact;
use crate::core::auth::handlers as auth_handlers;
use crate::core::auth::middleware::mw_require_auth;
use crate::core::config::AppState;
use crate::core::cors::cors_layer;
use crate::core::error::mw_response_map;
use crate::projects;
use crate::projects::validation::MAX_IMAGE_BYTES;

pub const API_PREFIX: &str = "/api/v1";

/// Room for the multipart envelope and text fields around a maximum-size
/// image.
pub const MAX_REQUEST_BYTES: usize = MAX_IMAGE_BYTES + 256 * 1024;

pub const API_ROUTES: &[&str] = &[
    "POST /api/v1/auth/register",
    "POST /api/v1/auth/login",
    "POST /api/v1/auth/logout",
    "GET /api/v1/auth/me",
    "GET /api/v1/projects",
    "POST /api/v1/projects",
    "GET /api/v1/projects/{id}",
    "PUT /api/v1/projects/{id}",
    "DELETE /api/v1/projects/{id}",
    "GET /api/v1/projects/{id}/image",
    "POST /api/v1/contact",
    "POST /api/v1/chat",
];

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(api_index))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/projects", get(projects::list_projects))
        .route("/projects/{id}", get(projects::get_project))
        .route("/projects/{id}/image", get(projects::get_project_image))
        .route("/contact", post(contact::send_contact))
        .route("/chat", post(chat::chat));

    let protected = Router::new()
        .route("/auth/me", get(auth_handlers::me))
        .route("/projects", post(projects::create_project))
        .route(
            "/projects/{id}",
            axum::routing::put(projects::update_project).delete(projects::delete_project),
        )
        .route_layer(from_fn_with_state(state.clone(), mw_require_auth));

    let api = public.merge(protected);

    Router::new()
        .route("/", get(root))
        .route("/api", get(root))
        .route("/api/health", get(health))
        .nest(API_PREFIX, api)
        .fallback(not_found)
        .layer(map_response_with_state(state.clone(), mw_response_map))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(cors_layer(state.config.cors.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Portfolio API is running",
        "api": API_PREFIX,
    }))
}

async fn api_index() -> Json<Value> {
    Json(json!({
        "success": true,
        "routes": API_ROUTES,
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Not Found",
            "message": format!("Route {} {} not found", method, uri.path()),
        })),
    )
}
