//! Post and hashtag models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub content: String,
    pub img: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post joined with its author, as shown on the timeline.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimelinePost {
    pub id: i64,
    pub content: String,
    pub img: Option<String>,
    pub user_id: i64,
    pub nick: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Hashtag {
    pub id: i64,
    pub title: String,
}
