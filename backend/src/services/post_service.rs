//! Post creation, hashtag indexing and timeline queries.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::post::{Hashtag, Post, TimelinePost};

pub const MAX_CONTENT_LEN: usize = 140;
const MAX_HASHTAG_LEN: usize = 15;
const TIMELINE_LIMIT: i64 = 100;

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[^\s#]+").expect("valid regex"));

/// Extract hashtags from post content: lower-cased, without `#`,
/// deduplicated in order of first appearance. Over-long tags are skipped.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for m in HASHTAG_RE.find_iter(content) {
        let tag = m.as_str()[1..].to_lowercase();
        if tag.chars().count() > MAX_HASHTAG_LEN {
            continue;
        }
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

pub struct PostService {
    db: PgPool,
}

impl PostService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a post and link it to its hashtags in one transaction.
    pub async fn create(&self, user_id: i64, content: &str, img: Option<&str>) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(AppError::Validation(format!(
                "Content must be at most {} characters",
                MAX_CONTENT_LEN
            )));
        }

        let mut tx = self.db.begin().await?;

        let post: Post = sqlx::query_as(
            r#"
            INSERT INTO posts (content, img, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, img, user_id, created_at, updated_at
            "#,
        )
        .bind(content)
        .bind(img.filter(|url| !url.is_empty()))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for title in extract_hashtags(content) {
            let hashtag: Hashtag = sqlx::query_as(
                r#"
                INSERT INTO hashtags (title)
                VALUES ($1)
                ON CONFLICT (title) DO UPDATE SET updated_at = NOW()
                RETURNING id, title
                "#,
            )
            .bind(&title)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO post_hashtags (post_id, hashtag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post.id)
            .bind(hashtag.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(post_id = post.id, user_id, "Post created");
        Ok(post)
    }

    /// Most recent posts first.
    pub async fn timeline(&self) -> Result<Vec<TimelinePost>> {
        let posts: Vec<TimelinePost> = sqlx::query_as(
            r#"
            SELECT p.id, p.content, p.img, p.user_id, u.nick, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE u.deleted_at IS NULL
            ORDER BY p.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(TIMELINE_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(posts)
    }

    /// Posts carrying the given hashtag (case-insensitive), newest first.
    pub async fn by_hashtag(&self, title: &str) -> Result<Vec<TimelinePost>> {
        let posts: Vec<TimelinePost> = sqlx::query_as(
            r#"
            SELECT p.id, p.content, p.img, p.user_id, u.nick, p.created_at
            FROM hashtags h
            JOIN post_hashtags ph ON ph.hashtag_id = h.id
            JOIN posts p ON p.id = ph.post_id
            JOIN users u ON u.id = p.user_id
            WHERE h.title = $1 AND u.deleted_at IS NULL
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(title.to_lowercase())
        .fetch_all(&self.db)
        .await?;

        Ok(posts)
    }
}
