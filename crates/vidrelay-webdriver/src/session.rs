//! A live browser session and the element commands it supports.

use std::time::{Duration, Instant};

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::client::WebDriverClient;
use crate::error::{BrowserError, BrowserResult};
use crate::locator::{Locator, WaitCondition};

/// W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Default interval between polls in [`Session::wait_for`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Reference to an element within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: String,
}

impl Element {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Serialized form used as a script argument.
    pub fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.id })
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        match map.get(ELEMENT_KEY).and_then(Value::as_str) {
            Some(id) => Ok(Element::new(id)),
            None => Err(serde::de::Error::custom(format!(
                "missing `{ELEMENT_KEY}` in element reference"
            ))),
        }
    }
}

/// A browser session created through [`WebDriverClient::new_session`].
#[derive(Debug, Clone)]
pub struct Session {
    client: WebDriverClient,
    id: String,
    poll_interval: Duration,
}

impl Session {
    pub(crate) fn new(client: WebDriverClient, id: String) -> Self {
        Self {
            client,
            id,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn path(&self, suffix: &str) -> String {
        format!("session/{}/{}", self.id, suffix)
    }

    fn element_path(&self, element: &Element, suffix: &str) -> String {
        format!("session/{}/element/{}/{}", self.id, element.id, suffix)
    }

    /// Navigate to `url` and wait for the page load.
    pub async fn goto(&self, url: &str) -> BrowserResult<()> {
        debug!(session_id = %self.id, url = %url, "Navigating");
        self.client
            .send(Method::POST, &self.path("url"), Some(json!({ "url": url })))
            .await
    }

    pub async fn current_url(&self) -> BrowserResult<String> {
        self.client.send(Method::GET, &self.path("url"), None).await
    }

    /// Find the first element matching `locator`.
    pub async fn find(&self, locator: &Locator) -> BrowserResult<Element> {
        self.client
            .send(Method::POST, &self.path("element"), Some(locator.to_json()))
            .await
    }

    /// Find every element matching `locator`. No match is an empty list.
    pub async fn find_all(&self, locator: &Locator) -> BrowserResult<Vec<Element>> {
        self.client
            .send(Method::POST, &self.path("elements"), Some(locator.to_json()))
            .await
    }

    /// First element matching `locator` whose trimmed text equals `text`.
    pub async fn find_by_text(&self, locator: &Locator, text: &str) -> BrowserResult<Element> {
        for element in self.find_all(locator).await? {
            match self.text(&element).await {
                Ok(found) if found.trim() == text => return Ok(element),
                Ok(_) => {}
                Err(e) if e.is_stale() => {}
                Err(e) => return Err(e),
            }
        }

        Err(BrowserError::TextNotFound {
            locator: locator.to_string(),
            text: text.to_string(),
        })
    }

    pub async fn click(&self, element: &Element) -> BrowserResult<()> {
        self.client
            .send(Method::POST, &self.element_path(element, "click"), None)
            .await
    }

    /// Type `text` into the element.
    pub async fn send_keys(&self, element: &Element, text: &str) -> BrowserResult<()> {
        self.client
            .send(
                Method::POST,
                &self.element_path(element, "value"),
                Some(json!({ "text": text })),
            )
            .await
    }

    /// Rendered text of the element.
    pub async fn text(&self, element: &Element) -> BrowserResult<String> {
        self.client
            .send(Method::GET, &self.element_path(element, "text"), None)
            .await
    }

    pub async fn is_displayed(&self, element: &Element) -> BrowserResult<bool> {
        self.client
            .send(Method::GET, &self.element_path(element, "displayed"), None)
            .await
    }

    pub async fn is_enabled(&self, element: &Element) -> BrowserResult<bool> {
        self.client
            .send(Method::GET, &self.element_path(element, "enabled"), None)
            .await
    }

    /// Run a synchronous script and return its result.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> BrowserResult<Value> {
        self.client
            .send(
                Method::POST,
                &self.path("execute/sync"),
                Some(json!({ "script": script, "args": args })),
            )
            .await
    }

    pub async fn scroll_into_view(&self, element: &Element) -> BrowserResult<()> {
        self.execute("arguments[0].scrollIntoView(true);", vec![element.to_json()])
            .await
            .map(|_| ())
    }

    /// Click through script, bypassing overlay interception.
    pub async fn js_click(&self, element: &Element) -> BrowserResult<()> {
        self.execute("arguments[0].click();", vec![element.to_json()])
            .await
            .map(|_| ())
    }

    /// Poll until `locator` satisfies `condition` or `timeout` elapses.
    pub async fn wait_for(
        &self,
        locator: &Locator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> BrowserResult<Element> {
        let start = Instant::now();

        loop {
            match self.find(locator).await {
                Ok(element) => match self.satisfies(&element, condition).await {
                    Ok(true) => return Ok(element),
                    Ok(false) => {}
                    Err(e) if e.is_stale() || e.is_no_such_element() => {}
                    Err(e) => return Err(e),
                },
                Err(e) if e.is_no_such_element() => {}
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(BrowserError::Timeout {
                    locator: locator.to_string(),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }

    async fn satisfies(&self, element: &Element, condition: WaitCondition) -> BrowserResult<bool> {
        match condition {
            WaitCondition::Present => Ok(true),
            WaitCondition::Clickable => {
                Ok(self.is_displayed(element).await? && self.is_enabled(element).await?)
            }
        }
    }

    /// End the session and close the browser.
    pub async fn quit(&self) -> BrowserResult<()> {
        debug!(session_id = %self.id, "Quitting WebDriver session");
        self.client
            .send::<Value>(Method::DELETE, &format!("session/{}", self.id), None)
            .await
            .map(|_| ())
    }

    /// Quit, logging instead of returning failures.
    pub async fn quit_quietly(&self) {
        if let Err(e) = self.quit().await {
            warn!(session_id = %self.id, error = %e, "Failed to quit WebDriver session");
        }
    }
}
