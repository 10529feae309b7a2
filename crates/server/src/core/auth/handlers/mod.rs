//! Auth handlers

mod auth;
mod auth_me;

pub use auth::{login, logout, register};
pub use auth_me::me;
