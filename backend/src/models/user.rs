//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Provider value for accounts registered with email and password.
pub const LOCAL_PROVIDER: &str = "local";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub nick: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub provider: String,
    pub sns_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The id and nick of a related user (follower or followee).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub nick: String,
}

/// A user together with their follow relations, as restored from the session.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub followers: Vec<UserSummary>,
    pub followings: Vec<UserSummary>,
}

impl UserProfile {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn following_ids(&self) -> Vec<i64> {
        self.followings.iter().map(|f| f.id).collect()
    }
}
