//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video upload intake feeding the dataset and notebook pipeline
//! - The notebook output callback and summary polling
//! - Bearer token verification
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, Claims, TokenVerifier};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
