//! Posting and image upload.

use std::path::Path;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Redirect,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::FormOrJson;
use crate::api::middleware::auth::RequireUser;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::post_service::PostService;

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const UPLOAD_FIELD: &str = "img";

pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/img",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/", post(create_post))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Stored file name: sanitized stem + upload time in milliseconds + extension.
pub fn stored_file_name(original: &str, millis: i64) -> String {
    let path = Path::new(original);
    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let ext: String = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.chars().filter(|c| c.is_ascii_alphanumeric()).collect())
        .unwrap_or_default();

    let stem = if stem.is_empty() { "image".to_string() } else { stem };
    if ext.is_empty() {
        format!("{}{}", stem, millis)
    } else {
        format!("{}{}.{}", stem, millis, ext.to_lowercase())
    }
}

/// POST /post/img
pub async fn upload_image(
    State(state): State<SharedState>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or("image").to_string();
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        let name = stored_file_name(&original, chrono::Utc::now().timestamp_millis());
        tokio::fs::create_dir_all(&state.config.uploads_dir).await?;
        tokio::fs::write(state.config.uploads_dir.join(&name), &bytes).await?;

        tracing::info!(user_id = user.id(), file = %name, size = bytes.len(), "Image uploaded");
        return Ok(Json(UploadResponse {
            url: format!("/img/{}", name),
        }));
    }

    Err(AppError::Validation(format!(
        "Multipart field '{}' is required",
        UPLOAD_FIELD
    )))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub url: Option<String>,
}

/// POST /post
pub async fn create_post(
    State(state): State<SharedState>,
    RequireUser(user): RequireUser,
    FormOrJson(payload): FormOrJson<CreatePostRequest>,
) -> Result<Redirect> {
    PostService::new(state.db.clone())
        .create(user.id(), &payload.content, payload.url.as_deref())
        .await?;
    Ok(Redirect::to("/"))
}
