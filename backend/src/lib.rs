//! NodeBird backend: a server-rendered social network on axum, PostgreSQL
//! and Redis-backed sessions.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod services;
pub mod session;
pub mod templates;
