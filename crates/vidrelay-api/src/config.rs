//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use vidrelay_pipeline::Secret;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP, on upload routes
    pub rate_limit_rps: u32,
    /// Request timeout. Covers the notebook trigger, which runs inline.
    pub request_timeout: Duration,
    /// Max upload body size
    pub max_upload_size: usize,
    /// Where accepted videos are written
    pub upload_dir: PathBuf,
    /// HS256 secret for bearer tokens; unset rejects every protected route
    pub auth_jwt_secret: Option<Secret>,
    /// Environment (development/production)
    pub environment: String,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(300),
            max_upload_size: 500 * 1024 * 1024, // 500MB
            upload_dir: PathBuf::from("static/uploads"),
            auth_jwt_secret: None,
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500 * 1024 * 1024),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static/uploads")),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(Secret::new),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
