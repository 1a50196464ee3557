//! Redis-backed session store and the session cookie layer.
//!
//! Sessions are stored as JSON records under `sess:<id>` with a TTL, so
//! Redis expires abandoned sessions on its own.

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sha2::{Digest, Sha512};
use time::OffsetDateTime;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::Config;
use crate::error::Result;

pub const SESSION_COOKIE_NAME: &str = "connect.sid";
const KEY_PREFIX: &str = "sess:";
/// Upper bound on how long a session lives in Redis.
const MAX_TTL_SECONDS: i64 = 86_400;

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSessionStore").finish_non_exhaustive()
    }
}

impl RedisSessionStore {
    /// Open a managed connection; reconnects are handled by the manager.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis session store");
        Ok(Self { conn })
    }
}

fn redis_key(id: &Id) -> String {
    format!("{}{}", KEY_PREFIX, id)
}

/// Seconds until `expiry`, clamped to `1..=MAX_TTL_SECONDS`.
fn ttl_seconds(expiry: OffsetDateTime, now: OffsetDateTime) -> u64 {
    (expiry - now).whole_seconds().clamp(1, MAX_TTL_SECONDS) as u64
}

fn backend_error(e: redis::RedisError) -> session_store::Error {
    session_store::Error::Backend(e.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut conn = self.conn.clone();
        loop {
            let payload = serde_json::to_string(&*record)
                .map_err(|e| session_store::Error::Encode(e.to_string()))?;
            let ttl = ttl_seconds(record.expiry_date, OffsetDateTime::now_utc());

            let created: Option<String> = redis::cmd("SET")
                .arg(redis_key(&record.id))
                .arg(payload)
                .arg("NX")
                .arg("EX")
                .arg(ttl)
                .query_async(&mut conn)
                .await
                .map_err(backend_error)?;

            if created.is_some() {
                return Ok(());
            }
            // Id collision: pick a fresh one.
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let payload = serde_json::to_string(record)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;
        let ttl = ttl_seconds(record.expiry_date, OffsetDateTime::now_utc());

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(redis_key(&record.id), payload, ttl)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn
            .get(redis_key(session_id))
            .await
            .map_err(backend_error)?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| session_store::Error::Decode(e.to_string()))
            })
            .transpose()
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(redis_key(session_id))
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}

/// Derive the 64-byte cookie signing key from a secret of any length.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Session middleware: HttpOnly, non-secure, browser-session cookie signed
/// with the session secret. Unmodified sessions are never written.
pub fn session_layer<S: SessionStore + Clone>(
    store: S,
    config: &Config,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_http_only(true)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnSessionEnd)
        .with_signed(signing_key(&config.session_secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_ttl_clamps_to_one_day() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(ttl_seconds(now + Duration::weeks(2), now), 86_400);
    }

    #[test]
    fn test_ttl_short_expiry() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(ttl_seconds(now + Duration::seconds(90), now), 90);
    }

    #[test]
    fn test_ttl_never_zero() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(ttl_seconds(now - Duration::seconds(5), now), 1);
    }

    #[test]
    fn test_redis_key_prefix() {
        let id = Id::default();
        assert_eq!(redis_key(&id), format!("sess:{}", id));
    }

    #[test]
    fn test_signing_key_is_deterministic() {
        assert_eq!(
            signing_key("secret").master(),
            signing_key("secret").master()
        );
        assert_ne!(signing_key("secret").master(), signing_key("other").master());
    }
}
