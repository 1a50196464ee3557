//! Request middleware.

pub mod access_log;
pub mod auth;
pub mod error_page;
pub mod hpp;
