//! Join, login and logout.

use axum::{extract::State, response::Redirect, routing::{get, post}, Router};
use tower_sessions::Session;

use crate::api::extract::FormOrJson;
use crate::api::middleware::auth::{login_session, logout_session, RequireGuest, RequireUser};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::auth_service::{AuthService, JoinRequest, LoginRequest};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/join", post(join))
        .route("/login", post(login))
        .route("/logout", get(logout))
}

/// POST /auth/join
pub async fn join(
    State(state): State<SharedState>,
    _guest: RequireGuest,
    FormOrJson(payload): FormOrJson<JoinRequest>,
) -> Result<Redirect> {
    match AuthService::new(state.db.clone()).join(&payload).await {
        Ok(_) => Ok(Redirect::to("/")),
        Err(AppError::Conflict(_)) => Ok(Redirect::to("/join?error=exist")),
        Err(e) => Err(e),
    }
}

/// POST /auth/login
pub async fn login(
    State(state): State<SharedState>,
    _guest: RequireGuest,
    session: Session,
    FormOrJson(payload): FormOrJson<LoginRequest>,
) -> Result<Redirect> {
    match AuthService::new(state.db.clone()).authenticate(&payload).await {
        Ok(user) => {
            login_session(&session, user.id).await?;
            tracing::info!(user_id = user.id, "User logged in");
            Ok(Redirect::to("/"))
        }
        Err(AppError::Authentication(message)) => {
            tracing::info!(reason = %message, "Login rejected");
            let target = format!("/?loginError={}", urlencoding::encode(&message));
            Ok(Redirect::to(&target))
        }
        Err(e) => Err(e),
    }
}

/// GET /auth/logout
pub async fn logout(RequireUser(user): RequireUser, session: Session) -> Result<Redirect> {
    logout_session(&session).await?;
    tracing::info!(user_id = user.id(), "User logged out");
    Ok(Redirect::to("/"))
}
