//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};
use vidrelay_models::{ErrorBody, UploadRejection};
use vidrelay_pipeline::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message for every authentication failure.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized access. Please log in.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Rejected(#[from] UploadRejection),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Request timed out")]
    RequestTimeout,

    /// Detail is logged, never returned.
    #[error("Dataset update failed.")]
    DatasetFailed(String),

    #[error("Browser automation timed out: {0}")]
    GatewayTimeout(String),

    #[error("Browser automation failed: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn forbidden() -> Self {
        Self::Forbidden(UNAUTHORIZED_MESSAGE.to_string())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::Rejected(_) | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::DatasetFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Internal(_) | ApiError::GatewayTimeout(_) | ApiError::BadGateway(_)
        )
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Dataset(e) => ApiError::DatasetFailed(e.to_string()),
            PipelineError::Browser(e) if e.is_timeout() => ApiError::GatewayTimeout(e.to_string()),
            PipelineError::Browser(e) => ApiError::BadGateway(e.to_string()),
            PipelineError::EmptyOutput => ApiError::bad_request("Notebook output is empty"),
            PipelineError::ConfigError(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::DatasetFailed(detail) => error!(detail = %detail, "Dataset update failed"),
            e if status.is_server_error() => error!(error = %e, "Request failed"),
            e => warn!(status = status.as_u16(), error = %e, "Request rejected"),
        }

        // Don't expose internal error details in production
        let message = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            match status {
                StatusCode::GATEWAY_TIMEOUT => "Upstream service timed out".to_string(),
                StatusCode::BAD_GATEWAY => "Upstream service failed".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidrelay_dataset::DatasetError;
    use vidrelay_webdriver::BrowserError;

    #[test]
    fn test_pipeline_error_mapping() {
        let dataset: ApiError = PipelineError::from(DatasetError::ToolNotFound("kaggle".into())).into();
        assert_eq!(dataset.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(dataset.to_string(), "Dataset update failed.");

        let timeout: ApiError = PipelineError::from(BrowserError::Timeout {
            locator: "css `#reply`".into(),
            waited_ms: 30_000,
        })
        .into();
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let network: ApiError =
            PipelineError::from(BrowserError::Network("connection refused".into())).into();
        assert_eq!(network.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_rejection_messages() {
        let err: ApiError = UploadRejection::MissingFilePart.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No file part in form.");
        assert_eq!(ApiError::forbidden().to_string(), UNAUTHORIZED_MESSAGE);
    }

    #[test]
    fn test_request_timeout_is_client_facing() {
        let err = ApiError::RequestTimeout;
        assert_eq!(err.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.to_string(), "Request timed out");
        assert!(!err.is_internal());
    }
}
