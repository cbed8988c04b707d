//! API Middleware Module
//!
//! Authentication and rate limiting for the conversion and admin routes.

pub mod auth;
pub mod rate_limit;
pub mod service;

pub use auth::ApiKeyExt;
pub use service::GateMiddleware;
