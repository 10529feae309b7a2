//! JSON extractor whose rejections render through `core::Error`.

use crate::core::error::Error;
use axum::extract::FromRequest;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);
