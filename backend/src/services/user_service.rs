//! User lookup, registration and follow relations.

use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::user::{User, UserProfile, UserSummary, LOCAL_PROVIDER};

const USER_COLUMNS: &str =
    "id, email, nick, password, provider, sns_id, created_at, updated_at";

/// Service for user rows and the follow graph.
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user: Option<User> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user: Option<User> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Insert a user that signs in with email and password.
    pub async fn create_local(&self, email: &str, nick: &str, password_hash: &str) -> Result<User> {
        let result: std::result::Result<User, sqlx::Error> = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (email, nick, password, provider)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(email)
        .bind(nick)
        .bind(password_hash)
        .bind(LOCAL_PROVIDER)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "Email is already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a user with followers and followings.
    pub async fn load_profile(&self, id: i64) -> Result<Option<UserProfile>> {
        let Some(user) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let followers: Vec<UserSummary> = sqlx::query_as(
            r#"
            SELECT u.id, u.nick
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1 AND u.deleted_at IS NULL
            ORDER BY f.created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        let followings: Vec<UserSummary> = sqlx::query_as(
            r#"
            SELECT u.id, u.nick
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1 AND u.deleted_at IS NULL
            ORDER BY f.created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(UserProfile {
            user,
            followers,
            followings,
        }))
    }

    /// Make `follower_id` follow `following_id`. Following twice is a no-op.
    pub async fn follow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        if follower_id == following_id {
            return Err(AppError::Validation("You cannot follow yourself".to_string()));
        }
        if self.find_by_id(following_id).await?.is_none() {
            return Err(AppError::NotFound("No such user".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.db)
        .await?;

        tracing::info!(follower_id, following_id, "User followed");
        Ok(())
    }
}
