//! Core Service Layer
//!
//! Shared infrastructure: configuration, the connection manager,
//! authentication, error rendering and the router.

pub mod auth;
pub mod config;
pub mod cors;
pub mod ctx;
pub mod db;
pub mod error;
pub mod extract;
pub mod response;
pub mod router;
pub mod validate;

// Re-exports for convenience
pub use config::{AppState, ServerConfig};
pub use ctx::Ctx;
pub use error::{Error, Result};
pub use router::router;
