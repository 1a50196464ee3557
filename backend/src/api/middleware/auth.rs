//! Session-based authentication.
//!
//! The session only stores the user id. `load_user` turns it back into a
//! full [`UserProfile`] on every request and attaches it as an
//! [`AuthExtension`]; handlers then pick it up through [`MaybeUser`],
//! [`RequireUser`] or [`RequireGuest`].

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::UserProfile;
use crate::services::user_service::UserService;

/// Session key holding the logged-in user's id.
pub const USER_ID_KEY: &str = "user_id";

/// The authenticated user attached to the request.
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user: Arc<UserProfile>,
}

/// Restore the logged-in user from the session.
pub async fn load_user(
    State(state): State<SharedState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(user_id) = session.get::<i64>(USER_ID_KEY).await? {
        match UserService::new(state.db.clone()).load_profile(user_id).await? {
            Some(profile) => {
                request.extensions_mut().insert(AuthExtension {
                    user: Arc::new(profile),
                });
            }
            None => {
                tracing::warn!(user_id, "Session refers to a missing user; clearing it");
                session.remove::<i64>(USER_ID_KEY).await?;
            }
        }
    }

    Ok(next.run(request).await)
}

/// Mark the session as belonging to `user_id`. The session id is rotated so a
/// pre-login id cannot be reused.
pub async fn login_session(session: &Session, user_id: i64) -> Result<()> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user_id).await?;
    Ok(())
}

/// Destroy the session entirely.
pub async fn logout_session(session: &Session) -> Result<()> {
    session.flush().await?;
    Ok(())
}

/// The current user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Arc<UserProfile>>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<AuthExtension>()
                .map(|auth| auth.user.clone()),
        ))
    }
}

/// Requires a logged-in user; rejects with 403 otherwise.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Arc<UserProfile>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthExtension>()
            .map(|auth| Self(auth.user.clone()))
            .ok_or_else(|| AppError::Forbidden("Login required".to_string()))
    }
}

/// Requires that nobody is logged in; redirects home otherwise.
#[derive(Debug, Clone, Copy)]
pub struct RequireGuest;

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireGuest {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        if parts.extensions.get::<AuthExtension>().is_some() {
            let target = format!("/?error={}", urlencoding::encode("Already logged in"));
            return Err(Redirect::to(&target).into_response());
        }
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use axum::http::{header::LOCATION, Request as HttpRequest, StatusCode};

    fn profile() -> UserProfile {
        let now = chrono::Utc::now();
        UserProfile {
            user: User {
                id: 7,
                email: Some("bird@example.com".into()),
                nick: "bird".into(),
                password: None,
                provider: "local".into(),
                sns_id: None,
                created_at: now,
                updated_at: now,
            },
            followers: vec![],
            followings: vec![],
        }
    }

    fn parts(logged_in: bool) -> Parts {
        let (mut parts, _) = HttpRequest::builder().uri("/").body(()).unwrap().into_parts();
        if logged_in {
            parts.extensions.insert(AuthExtension {
                user: Arc::new(profile()),
            });
        }
        parts
    }

    #[tokio::test]
    async fn test_require_user_rejects_guest() {
        let err = RequireUser::from_request_parts(&mut parts(false), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_require_user_accepts_user() {
        let RequireUser(user) = RequireUser::from_request_parts(&mut parts(true), &())
            .await
            .unwrap();
        assert_eq!(user.id(), 7);
    }

    #[tokio::test]
    async fn test_require_guest_redirects_user() {
        let response = RequireGuest::from_request_parts(&mut parts(true), &())
            .await
            .unwrap_err();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "/?error=Already%20logged%20in"
        );
    }

    #[tokio::test]
    async fn test_maybe_user() {
        let MaybeUser(none) = MaybeUser::from_request_parts(&mut parts(false), &())
            .await
            .unwrap();
        assert!(none.is_none());
        let MaybeUser(some) = MaybeUser::from_request_parts(&mut parts(true), &())
            .await
            .unwrap();
        assert_eq!(some.unwrap().user.nick, "bird");
    }
}
