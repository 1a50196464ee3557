//! Route handlers, one module per mounted route group.

pub mod auth;
pub mod fallback;
pub mod page;
pub mod post;
pub mod user;
