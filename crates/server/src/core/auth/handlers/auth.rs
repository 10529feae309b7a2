use crate::core::auth::middleware::TOKEN_COOKIE;
use crate::core::auth::{NewUser, Role, User, UserInfo};
use crate::core::config::AppState;
use crate::core::error::{Error, Result};
use crate::core::extract::ApiJson;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    info!("POST /auth/register - {}", req.email);

    if !state.config.allow_registration {
        return Err(Error::Forbidden("Registration is disabled".to_string()));
    }

    let new_user = NewUser::validate(&req.name, &req.email, &req.password, Role::User)?;
    let user = state.auth.register(new_user).await.inspect_err(|e| {
        warn!("Register failed for {}: {}", req.email, e);
    })?;
    let token = state.auth.issue_token(&user)?;

    let jar = jar.add(session_cookie(&state, token.clone()));
    Ok((StatusCode::CREATED, jar, auth_body(user, token)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    info!("POST /auth/login - {}", req.email);

    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(Error::Validation(
            "Please provide an email and password".to_string(),
        ));
    }

    let (user, token) = state.auth.login(&req.email, &req.password).await?;

    let jar = jar.add(session_cookie(&state, token.clone()));
    Ok((jar, auth_body(user, token)))
}

/// POST /auth/logout
///
/// Tokens are stateless; logging out only drops the cookie. The expired
/// cookie is always sent, since cross-site callers may not have sent theirs.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    info!("POST /auth/logout");
    let jar = jar.add(expired_cookie(&state));
    (
        jar,
        Json(serde_json::json!({ "success": true, "data": {} })),
    )
}

fn auth_body(user: User, token: String) -> Json<AuthResponse> {
    Json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    })
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = cookie::time::Duration::seconds(state.auth.tokens().ttl().num_seconds());
    token_cookie(state, token, max_age)
}

fn expired_cookie(state: &AppState) -> Cookie<'static> {
    token_cookie(state, String::new(), cookie::time::Duration::ZERO)
}

// Same attributes for set and clear, or browsers keep the old cookie.
fn token_cookie(state: &AppState, value: String, max_age: cookie::time::Duration) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}
