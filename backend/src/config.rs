//! Application configuration loaded from environment variables.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::{AppError, Result};

const DEFAULT_PORT: u16 = 8001;
const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost:5432/nodebird";

/// Runtime mode selected by `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Only the exact value `production` selects production mode.
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    /// Secret the session cookie is signed with.
    pub session_secret: String,
    pub cookie_secret: String,
    pub views_dir: PathBuf,
    pub public_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = Environment::from_node_env(var("NODE_ENV").as_deref());

        let port = parse_or(var("PORT"), "PORT", DEFAULT_PORT)?;
        let redis_port = parse_or(var("REDIS_PORT"), "REDIS_PORT", 6379)?;
        let database_max_connections =
            parse_or(var("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 10)?;

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None if environment.is_production() => {
                return Err(AppError::Config(
                    "DATABASE_URL must be set in production".to_string(),
                ))
            }
            None => DEFAULT_DATABASE_URL.to_string(),
        };

        let cookie_secret = var("COOKIE_SECRET")
            .ok_or_else(|| AppError::Config("COOKIE_SECRET must be set".to_string()))?;
        let session_secret = var("SESSION_SECRET").unwrap_or_else(|| cookie_secret.clone());

        Ok(Self {
            port,
            environment,
            database_url,
            database_max_connections,
            redis_host: var("REDIS_HOST").unwrap_or_else(|| "localhost".to_string()),
            redis_port,
            redis_password: var("REDIS_PASSWORD"),
            session_secret,
            cookie_secret,
            views_dir: var("VIEWS_DIR").unwrap_or_else(|| "views".into()).into(),
            public_dir: var("PUBLIC_DIR").unwrap_or_else(|| "public".into()).into(),
            uploads_dir: var("UPLOADS_DIR").unwrap_or_else(|| "uploads".into()).into(),
            log_dir: var("LOG_DIR").unwrap_or_else(|| "logs".into()).into(),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Connection URL for the session store, with the password embedded.
    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) => format!(
                "redis://:{}@{}:{}",
                urlencoding::encode(password),
                self.redis_host,
                self.redis_port
            ),
            None => format!("redis://{}:{}", self.redis_host, self.redis_port),
        }
    }

    /// Production deployments sit behind a reverse proxy.
    pub fn trust_proxy(&self) -> bool {
        self.environment.is_production()
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
