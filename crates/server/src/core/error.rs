//! Central error type
//!
//! Every handler returns `core::Result`. Component errors (`StoreError`,
//! `AuthError`, ...) convert into `Error` here, and this is the only place
//! that decides status codes and the JSON error body.

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::core::auth::token::TokenError;
use crate::core::auth::AuthError;
use crate::core::config::AppState;
use crate::projects::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Auth Errors
    #[error("Not authorized to access this route")]
    AuthFailNoToken,
    #[error("Not authorized to access this route")]
    AuthFailInvalidToken,
    #[error("Invalid credentials")]
    LoginFail,
    #[error("Auth context missing")]
    AuthFailCtxNotInRequestExt,
    #[error("{0}")]
    Forbidden(String),

    // Input Errors
    #[error("{0}")]
    Validation(String),
    #[error("Description must be at least {min} words.")]
    DescriptionTooShort { min: usize },
    #[error("Unsupported image type '{0}'. Please upload a JPEG, PNG or WebP image")]
    UnsupportedImageType(String),
    #[error("Uploaded image is empty")]
    EmptyUpload,
    #[error("Please upload an image less than {}MB", mib(.limit))]
    PayloadTooLarge { limit: usize },

    // Model Errors
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),

    // External services
    #[error("{0} is not configured")]
    ServiceNotConfigured(&'static str),
    #[error("{0}")]
    UpstreamFailure(String),
    #[error("{0}")]
    UpstreamUnavailable(String),
    #[error("{0}")]
    UpstreamTimeout(String),

    // Generic
    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

fn mib(bytes: &usize) -> usize {
    bytes / (1024 * 1024)
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::AuthFailNoToken | Error::AuthFailInvalidToken | Error::LoginFail => {
                StatusCode::UNAUTHORIZED
            }
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Validation(_)
            | Error::DescriptionTooShort { .. }
            | Error::UnsupportedImageType(_)
            | Error::EmptyUpload => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            Error::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::AuthFailCtxNotInRequestExt
            | Error::ServiceNotConfigured(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind, rendered as the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::AuthFailNoToken | Error::AuthFailInvalidToken | Error::LoginFail => {
                "Unauthorized"
            }
            Error::Forbidden(_) => "Forbidden",
            Error::Validation(_) => "ValidationError",
            Error::DescriptionTooShort { .. } => "DescriptionTooShort",
            Error::UnsupportedImageType(_) => "UnsupportedImageType",
            Error::EmptyUpload => "EmptyUpload",
            Error::PayloadTooLarge { .. } => "PayloadTooLarge",
            Error::NotFound(_) => "NotFound",
            Error::Conflict(_) => "Conflict",
            Error::ServiceNotConfigured(_) => "ServiceNotConfigured",
            Error::UpstreamFailure(_) => "UpstreamFailure",
            Error::UpstreamUnavailable(_) => "UpstreamUnavailable",
            Error::UpstreamTimeout(_) => "UpstreamTimeout",
            Error::AuthFailCtxNotInRequestExt | Error::Internal(_) => "Internal",
        }
    }

    /// Message safe to show to callers. Internal details never leave here.
    pub fn client_message(&self) -> String {
        match self {
            Error::AuthFailCtxNotInRequestExt | Error::Internal(_) => "Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{} -> {:?}", status, self);
        }

        let body = Json(json!({
            "success": false,
            "error": self.kind(),
            "message": self.client_message(),
        }));

        let mut response = (status, body).into_response();
        // Picked up by `mw_response_map` in development mode.
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

/// Re-renders error bodies with the internal detail attached when the
/// server runs in development mode.
pub async fn mw_response_map(State(state): State<AppState>, res: Response) -> Response {
    if !state.config.development {
        return res;
    }
    let Some(err) = res.extensions().get::<Arc<Error>>().cloned() else {
        return res;
    };

    let body = Json(json!({
        "success": false,
        "error": err.kind(),
        "message": err.client_message(),
        "stack": format!("{err:?}"),
    }));
    (res.status(), body).into_response()
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge {
                limit: crate::projects::validation::MAX_IMAGE_BYTES,
            }
        } else {
            Error::Validation(rejection.body_text())
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge {
                limit: crate::projects::validation::MAX_IMAGE_BYTES,
            }
        } else {
            Error::Validation(err.body_text())
        }
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Error::LoginFail,
            AuthError::Invalid(msg) => Error::Validation(msg),
            AuthError::EmailTaken => {
                Error::Conflict("User already exists with this email".to_string())
            }
            AuthError::UserNotFound => Error::NotFound("User not found".to_string()),
            AuthError::Token(TokenError::InvalidToken) => Error::AuthFailInvalidToken,
            AuthError::Token(TokenError::Signing(msg)) | AuthError::Hashing(msg) => {
                Error::Internal(msg)
            }
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DescriptionTooShort { min } => Error::DescriptionTooShort { min },
            StoreError::Invalid(msg) => Error::Validation(msg),
            StoreError::DuplicateTitle => {
                Error::Conflict("A project with this title already exists".to_string())
            }
            StoreError::NotFound(id) => {
                Error::NotFound(format!("Project not found with id of {}", id))
            }
            StoreError::NoImage => Error::NotFound("No image found for this project".to_string()),
            StoreError::Database(e) => e.into(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Internal(format!("Database error: {err}"))
    }
}

// Allow conversion from other errors (e.g., anyhow) easiest via string
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_failures_share_status_and_message() {
        let missing = Error::AuthFailNoToken;
        let invalid = Error::AuthFailInvalidToken;
        assert_eq!(missing.status_code(), invalid.status_code());
        assert_eq!(missing.kind(), invalid.kind());
        assert_eq!(missing.client_message(), invalid.client_message());
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = Error::Internal("connection refused at 10.0.0.3".to_string());
        assert_eq!(err.client_message(), "Server Error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = Error::PayloadTooLarge {
            limit: 2 * 1024 * 1024,
        };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "Please upload an image less than 2MB");
    }
}
