//! Local (email + password) registration and login.

use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::services::user_service::UserService;

/// bcrypt cost for stored password hashes.
pub const PASSWORD_HASH_COST: u32 = 12;

const MAX_EMAIL_LEN: usize = 40;
const MAX_NICK_LEN: usize = 15;

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub email: String,
    pub nick: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    users: UserService,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(db: PgPool) -> Self {
        Self {
            users: UserService::new(db),
            hash_cost: PASSWORD_HASH_COST,
        }
    }

    /// Register a local account. Returns `Conflict` when the email is taken.
    pub async fn join(&self, request: &JoinRequest) -> Result<User> {
        let account = validate_join(request)?;

        if self.users.find_by_email(account.email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let hash = hash_password(request.password.clone(), self.hash_cost).await?;
        let user = self
            .users
            .create_local(account.email, account.nick, &hash)
            .await?;

        tracing::info!(user_id = user.id, "User joined");
        Ok(user)
    }

    /// Check credentials. Failures are `Authentication` errors whose message
    /// is shown on the login form.
    pub async fn authenticate(&self, request: &LoginRequest) -> Result<User> {
        let user = self
            .users
            .find_by_email(login_email(request))
            .await?
            .ok_or_else(|| AppError::Authentication("Unregistered user".to_string()))?;

        let Some(hash) = user.password.clone() else {
            return Err(AppError::Authentication(
                "This account signs in through another provider".to_string(),
            ));
        };

        if !verify_password(request.password.clone(), hash).await? {
            return Err(AppError::Authentication("Password does not match".to_string()));
        }

        Ok(user)
    }
}

/// Email and nick of a join request, trimmed as they are stored.
#[derive(Debug, PartialEq, Eq)]
struct NewAccount<'a> {
    email: &'a str,
    nick: &'a str,
}

fn login_email(request: &LoginRequest) -> &str {
    request.email.trim()
}

fn validate_join(request: &JoinRequest) -> Result<NewAccount<'_>> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::Validation(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_LEN
        )));
    }
    let nick = request.nick.trim();
    if nick.is_empty() || nick.chars().count() > MAX_NICK_LEN {
        return Err(AppError::Validation(format!(
            "Nickname must be 1 to {} characters",
            MAX_NICK_LEN
        )));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    Ok(NewAccount { email, nick })
}

/// Hash a password on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(email: &str, nick: &str, password: &str) -> JoinRequest {
        JoinRequest {
            email: email.into(),
            nick: nick.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_validate_join_accepts_valid() {
        assert!(validate_join(&join("bird@example.com", "bird", "pw")).is_ok());
    }

    #[test]
    fn test_validate_join_rejects_bad_email() {
        assert!(validate_join(&join("", "bird", "pw")).is_err());
        assert!(validate_join(&join("no-at-sign", "bird", "pw")).is_err());
        let long = format!("{}@example.com", "a".repeat(40));
        assert!(validate_join(&join(&long, "bird", "pw")).is_err());
    }

    #[test]
    fn test_validate_join_rejects_bad_nick() {
        assert!(validate_join(&join("b@example.com", "  ", "pw")).is_err());
        assert!(validate_join(&join("b@example.com", "sixteen-chars-xx", "pw")).is_err());
    }

    #[test]
    fn test_validate_join_returns_trimmed_fields() {
        let request = join("  bird@example.com ", "abcdefghijklmno ", "pw");
        let account = validate_join(&request).unwrap();
        assert_eq!(
            account,
            NewAccount {
                email: "bird@example.com",
                nick: "abcdefghijklmno",
            }
        );
        assert_eq!(account.nick.chars().count(), MAX_NICK_LEN);
    }

    #[test]
    fn test_login_email_is_trimmed() {
        let request = LoginRequest {
            email: " bird@example.com\t".into(),
            password: "pw".into(),
        };
        assert_eq!(login_email(&request), "bird@example.com");
    }

    #[test]
    fn test_validate_join_rejects_empty_password() {
        assert!(validate_join(&join("b@example.com", "bird", "")).is_err());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("secret".into(), 4).await.unwrap();
        assert_ne!(hash, "secret");
        assert!(verify_password("secret".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
    }
}
