//! Database models (SQLx).

pub mod post;
pub mod user;
