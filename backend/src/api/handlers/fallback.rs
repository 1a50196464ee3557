//! Catch-all for requests no route or static file matched.

use axum::{
    extract::OriginalUri,
    http::{Method, Uri},
};

use crate::error::AppError;

/// The 404 error for a request nothing handles.
pub fn route_not_found(method: &Method, uri: &Uri) -> AppError {
    AppError::NotFound(format!("{} {} route not found", method, uri))
}

/// `OriginalUri` keeps the `/img` prefix that `nest_service` strips. The
/// parameter pollution guard updates it when it collapses the query.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    route_not_found(&method, &uri)
}
