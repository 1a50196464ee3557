//! Follow relations.

use axum::{
    extract::{Path, State},
    routing::post,
    Router,
};

use crate::api::middleware::auth::RequireUser;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::user_service::UserService;

pub fn router() -> Router<SharedState> {
    Router::new().route("/:id/follow", post(follow))
}

/// POST /user/:id/follow
pub async fn follow(
    State(state): State<SharedState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
) -> Result<&'static str> {
    UserService::new(state.db.clone())
        .follow(user.id(), id)
        .await?;
    Ok("success")
}
