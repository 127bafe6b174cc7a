//! HTTP transport for the WebDriver wire protocol.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, debug_span, info, Instrument};
use url::Url;

use crate::capabilities::ChromeOptions;
use crate::error::{BrowserError, BrowserResult};
use crate::session::Session;

/// Default per-command HTTP timeout. Page loads block the navigate command.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connect timeout to the driver endpoint.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Every WebDriver response wraps its payload in `value`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSessionValue {
    session_id: String,
}

/// Result of `GET /status`.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverStatus {
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}

/// Client for a single WebDriver endpoint.
#[derive(Clone)]
pub struct WebDriverClient {
    http: Client,
    base_url: String,
}

impl WebDriverClient {
    /// Create a client for the endpoint at `base_url`.
    pub fn new(base_url: &str) -> BrowserResult<Self> {
        Self::with_timeouts(base_url, DEFAULT_REQUEST_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> BrowserResult<Self> {
        let parsed =
            Url::parse(base_url).map_err(|e| BrowserError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BrowserError::InvalidUrl(format!(
                "{base_url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("vidrelay-webdriver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query driver readiness.
    pub async fn status(&self) -> BrowserResult<DriverStatus> {
        self.send(Method::GET, "status", None).await
    }

    /// Start a browser session with the given Chrome options.
    pub async fn new_session(&self, options: &ChromeOptions) -> BrowserResult<Session> {
        let value: NewSessionValue = self
            .send(Method::POST, "session", Some(options.to_capabilities()))
            .await?;

        info!(session_id = %value.session_id, "WebDriver session created");
        Ok(Session::new(self.clone(), value.session_id))
    }

    /// Send one command and decode the `value` payload.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> BrowserResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        let span = debug_span!("webdriver_command", method = %method, command = %path);

        async {
            let mut request = self.http.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(&body);
            } else if method == Method::POST {
                request = request.json(&serde_json::json!({}));
            }

            let response = request.send().await?;
            let status = response.status();
            debug!(status = status.as_u16(), "WebDriver response");

            if !status.is_success() {
                return Err(Self::handle_error_response(status, response).await);
            }

            let text = response.text().await?;
            let envelope: Envelope<T> = serde_json::from_str(&text)
                .map_err(|e| BrowserError::InvalidResponse(format!("{path}: {e}")))?;
            Ok(envelope.value)
        }
        .instrument(span)
        .await
    }

    async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> BrowserError {
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<Envelope<ErrorValue>>(&body) {
            Ok(envelope) => BrowserError::WebDriver {
                status: status.as_u16(),
                error: envelope.value.error,
                message: envelope.value.message,
            },
            Err(_) => BrowserError::WebDriver {
                status: status.as_u16(),
                error: "unknown error".to_string(),
                message: body,
            },
        }
    }
}

impl std::fmt::Debug for WebDriverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = WebDriverClient::new("http://localhost:9515/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9515");
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        assert!(matches!(
            WebDriverClient::new("not a url"),
            Err(BrowserError::InvalidUrl(_))
        ));
        assert!(matches!(
            WebDriverClient::new("ftp://localhost:9515"),
            Err(BrowserError::InvalidUrl(_))
        ));
    }
}
