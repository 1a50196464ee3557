//! Server-rendered pages.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::{MaybeUser, RequireGuest, RequireUser};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::post::TimelinePost;
use crate::models::user::UserProfile;
use crate::services::post_service::PostService;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(main_page))
        .route("/join", get(join_page))
        .route("/profile", get(profile_page))
        .route("/hashtag", get(hashtag_page))
}

/// Values every page can use, plus the page-specific body.
#[derive(Debug, Serialize)]
pub struct PageContext<'a, T: Serialize> {
    pub title: String,
    pub user: Option<&'a UserProfile>,
    #[serde(rename = "followerCount")]
    pub follower_count: usize,
    #[serde(rename = "followingCount")]
    pub following_count: usize,
    #[serde(rename = "followingIdList")]
    pub following_id_list: Vec<i64>,
    #[serde(flatten)]
    pub body: T,
}

impl<'a, T: Serialize> PageContext<'a, T> {
    pub fn new(title: impl Into<String>, user: Option<&'a Arc<UserProfile>>, body: T) -> Self {
        let user = user.map(|u| u.as_ref());
        Self {
            title: title.into(),
            follower_count: user.map(|u| u.followers.len()).unwrap_or(0),
            following_count: user.map(|u| u.followings.len()).unwrap_or(0),
            following_id_list: user.map(|u| u.following_ids()).unwrap_or_default(),
            user,
            body,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MainQuery {
    pub error: Option<String>,
    #[serde(rename = "loginError")]
    pub login_error: Option<String>,
}

#[derive(Debug, Serialize)]
struct TimelineBody {
    twits: Vec<TimelinePost>,
    error: Option<String>,
    #[serde(rename = "loginError")]
    login_error: Option<String>,
}

/// GET /
pub async fn main_page(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<MainQuery>,
) -> Result<Html<String>> {
    let twits = PostService::new(state.db.clone()).timeline().await?;
    let context = PageContext::new(
        "NodeBird",
        user.as_ref(),
        TimelineBody {
            twits,
            error: query.error,
            login_error: query.login_error,
        },
    );
    Ok(Html(state.templates.render("main", &context)?))
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct JoinBody {
    #[serde(rename = "joinError")]
    join_error: Option<&'static str>,
}

/// GET /join
pub async fn join_page(
    State(state): State<SharedState>,
    _guest: RequireGuest,
    Query(query): Query<JoinQuery>,
) -> Result<Html<String>> {
    let join_error = match query.error.as_deref() {
        Some("exist") => Some("This email is already registered"),
        Some(_) => Some("Could not complete registration"),
        None => None,
    };
    let context = PageContext::new("Join - NodeBird", None, JoinBody { join_error });
    Ok(Html(state.templates.render("join", &context)?))
}

#[derive(Debug, Serialize)]
struct EmptyBody {}

/// GET /profile
pub async fn profile_page(
    State(state): State<SharedState>,
    RequireUser(user): RequireUser,
) -> Result<Html<String>> {
    let context = PageContext::new("My profile - NodeBird", Some(&user), EmptyBody {});
    Ok(Html(state.templates.render("profile", &context)?))
}

#[derive(Debug, Deserialize)]
pub struct HashtagQuery {
    pub hashtag: Option<String>,
}

/// GET /hashtag?hashtag=...
pub async fn hashtag_page(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<HashtagQuery>,
) -> Result<Response> {
    let Some(tag) = query
        .hashtag
        .map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
    else {
        return Ok(Redirect::to("/").into_response());
    };

    let twits = PostService::new(state.db.clone()).by_hashtag(&tag).await?;
    let context = PageContext::new(
        format!("#{} | NodeBird", tag),
        user.as_ref(),
        TimelineBody {
            twits,
            error: None,
            login_error: None,
        },
    );
    Ok(Html(state.templates.render("main", &context)?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{User, UserSummary};

    #[test]
    fn test_page_context_counts() {
        let now = chrono::Utc::now();
        let user = Arc::new(UserProfile {
            user: User {
                id: 1,
                email: None,
                nick: "bird".into(),
                password: None,
                provider: "local".into(),
                sns_id: None,
                created_at: now,
                updated_at: now,
            },
            followers: vec![UserSummary { id: 2, nick: "owl".into() }],
            followings: vec![
                UserSummary { id: 3, nick: "crow".into() },
                UserSummary { id: 4, nick: "wren".into() },
            ],
        });

        let ctx = PageContext::new("t", Some(&user), EmptyBody {});
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["followerCount"], 1);
        assert_eq!(value["followingCount"], 2);
        assert_eq!(value["followingIdList"], serde_json::json!([3, 4]));
        assert_eq!(value["user"]["nick"], "bird");
    }

    #[test]
    fn test_page_context_for_guest() {
        let ctx = PageContext::new("t", None, EmptyBody {});
        let value = serde_json::to_value(&ctx).unwrap();
        assert!(value["user"].is_null());
        assert_eq!(value["followerCount"], 0);
    }
}
