//! Health check handlers.

use std::path::Path;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub webdriver: CheckStatus,
    pub dataset_cli: CheckStatus,
    pub directories: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks the WebDriver endpoint, the dataset CLI, and writable directories.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let webdriver_check = {
        let start = Instant::now();
        match state.webdriver.status().await {
            Ok(status) if status.ready => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Ok(status) => CheckStatus::error(format!("driver not ready: {}", status.message)),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let cli_check = match vidrelay_dataset::check_cli(&state.dataset.cli) {
        Ok(_) => CheckStatus::ok(0),
        Err(e) => CheckStatus::error(e.to_string()),
    };

    let dir_check = {
        let start = Instant::now();
        let upload = ensure_writable(&state.config.upload_dir).await;
        let mirror = ensure_writable(&state.dataset.mirror_dir).await;
        match upload.and(mirror) {
            Ok(()) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(e),
        }
    };

    let all_ok = webdriver_check.is_ok() && cli_check.is_ok() && dir_check.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            webdriver: webdriver_check,
            dataset_cli: cli_check,
            directories: dir_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Create `dir` if needed and check that it is a writable directory.
///
/// Nothing is written inside `dir`: the dataset mirror is published as a
/// whole, so any file left there would end up in a dataset version.
pub(crate) async fn ensure_writable(dir: &Path) -> Result<(), String> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| format!("{}: {}", dir.display(), e))?;

    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|e| format!("{}: {}", dir.display(), e))?;

    if !metadata.is_dir() {
        return Err(format!("{}: not a directory", dir.display()));
    }
    if metadata.permissions().readonly() {
        return Err(format!("{}: read-only", dir.display()));
    }
    Ok(())
}
