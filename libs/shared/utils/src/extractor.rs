use axum::extract::{FromRequest, FromRequestParts};

use shared_models::error::AppError;

// Extractors that turn axum rejections into the shared error body, so malformed
// input gets `undecodable.request` instead of axum's plain-text rejection.

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
