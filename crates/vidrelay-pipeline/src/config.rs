//! Pipeline configuration.

use std::fmt;
use std::time::Duration;

use url::Url;
use vidrelay_webdriver::{ChromeOptions, Locator};

use crate::error::{PipelineError, PipelineResult};

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

/// Selectors for the notebook login and re-run chain.
#[derive(Debug, Clone)]
pub struct NotebookSelectors {
    pub sign_in_button: Locator,
    pub email_input: Locator,
    pub password_input: Locator,
    /// Buttons scanned for one whose text is `next_button_text`
    pub next_button: Locator,
    pub next_button_text: String,
    pub more_actions: Locator,
    pub check_for_updates: Locator,
    pub update_button: Locator,
    pub run_all: Locator,
}

impl Default for NotebookSelectors {
    fn default() -> Self {
        Self {
            sign_in_button: Locator::css(r#"[class="sc-hJRrWL iwZBhE"]"#),
            email_input: Locator::css(r#"[aria-label="Email or phone"]"#),
            password_input: Locator::css(r#"[aria-label="Enter your password"]"#),
            next_button: Locator::css(r#"[jsname="V67aGc"]"#),
            next_button_text: "Next".to_string(),
            more_actions: Locator::css(r#"[aria-label="More actions for (Bro123)"]"#),
            check_for_updates: Locator::xpath(r#"//p[normalize-space()="Check for updates"]"#),
            update_button: Locator::xpath("//*[normalize-space()='Update']"),
            run_all: Locator::xpath("//*[normalize-space()='Run All']"),
        }
    }
}

impl NotebookSelectors {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sign_in_button: css_from_env("NOTEBOOK_SIGN_IN_SELECTOR", defaults.sign_in_button),
            email_input: css_from_env("NOTEBOOK_EMAIL_SELECTOR", defaults.email_input),
            password_input: css_from_env("NOTEBOOK_PASSWORD_SELECTOR", defaults.password_input),
            next_button: css_from_env("NOTEBOOK_NEXT_SELECTOR", defaults.next_button),
            next_button_text: std::env::var("NOTEBOOK_NEXT_TEXT")
                .unwrap_or(defaults.next_button_text),
            more_actions: css_from_env("NOTEBOOK_MORE_ACTIONS_SELECTOR", defaults.more_actions),
            check_for_updates: xpath_from_env(
                "NOTEBOOK_CHECK_UPDATES_XPATH",
                defaults.check_for_updates,
            ),
            update_button: xpath_from_env("NOTEBOOK_UPDATE_XPATH", defaults.update_button),
            run_all: xpath_from_env("NOTEBOOK_RUN_ALL_XPATH", defaults.run_all),
        }
    }
}

/// Selectors for the chat assistant page.
#[derive(Debug, Clone)]
pub struct ChatSelectors {
    pub prompt_input: Locator,
    pub send_button: Locator,
    pub response: Locator,
}

impl Default for ChatSelectors {
    fn default() -> Self {
        Self {
            prompt_input: Locator::css(r#"[data-placeholder="Ask anything"]"#),
            send_button: Locator::css(r#"[data-testid="send-button"]"#),
            response: Locator::css(
                r#"[class="markdown prose w-full break-words dark:prose-invert dark"]"#,
            ),
        }
    }
}

impl ChatSelectors {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            prompt_input: css_from_env("CHAT_PROMPT_SELECTOR", defaults.prompt_input),
            send_button: css_from_env("CHAT_SEND_SELECTOR", defaults.send_button),
            response: css_from_env("CHAT_RESPONSE_SELECTOR", defaults.response),
        }
    }
}

/// Fixed pauses between UI steps, before scaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pauses {
    /// After the second `Next` click of the login form
    pub after_login: Duration,
    /// After navigating to the notebook editor
    pub after_notebook_load: Duration,
    /// Between scrolling the actions menu into view and clicking it
    pub before_more_actions: Duration,
    /// After clicking `Update`, on the fresh path
    pub after_update_fresh: Duration,
    /// After clicking `Update`, on the reuse path
    pub after_update_reuse: Duration,
    /// After sending the chat prompt
    pub before_chat_response: Duration,
}

impl Default for Pauses {
    fn default() -> Self {
        Self {
            after_login: Duration::from_secs(6),
            after_notebook_load: Duration::from_secs(13),
            before_more_actions: Duration::from_secs(3),
            after_update_fresh: Duration::from_secs(13),
            after_update_reuse: Duration::from_secs(12),
            before_chat_response: Duration::from_secs(10),
        }
    }
}

/// Browser automation configuration for the notebook and chat steps.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// WebDriver endpoint (chromedriver or a Selenium grid)
    pub webdriver_url: String,
    pub notebook_login_url: String,
    /// Notebook editor page
    pub notebook_url: String,
    pub notebook_email: Secret,
    pub notebook_password: Secret,
    pub chat_url: String,
    pub headless: bool,
    /// Chrome switches for the notebook session
    pub notebook_chrome_args: Vec<String>,
    /// Chrome switches for chat sessions
    pub chat_chrome_args: Vec<String>,
    /// Bound on each element wait
    pub element_wait: Duration,
    /// Bound on the chat response wait
    pub response_wait: Duration,
    /// Interval between element polls during a wait
    pub poll_interval: Duration,
    /// Multiplier for every fixed pause; 0 disables them
    pub pause_scale: f64,
    pub pauses: Pauses,
    pub notebook_selectors: NotebookSelectors,
    pub chat_selectors: ChatSelectors,
}

/// Largest accepted `PAUSE_SCALE`.
pub const MAX_PAUSE_SCALE: f64 = 100.0;

const BACKGROUND_ARGS: [&str; 3] = [
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
];

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut notebook_chrome_args = vec![
            "--window-size=1920,1080".to_string(),
            "--no-sandbox".to_string(),
        ];
        notebook_chrome_args.extend(BACKGROUND_ARGS.iter().map(|s| s.to_string()));

        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            notebook_login_url: "https://www.kaggle.com/account/login".to_string(),
            notebook_url: "https://www.kaggle.com/code/txctyg/videoconv/edit".to_string(),
            notebook_email: Secret::default(),
            notebook_password: Secret::default(),
            chat_url: "https://chatgpt.com".to_string(),
            headless: false,
            notebook_chrome_args,
            chat_chrome_args: BACKGROUND_ARGS.iter().map(|s| s.to_string()).collect(),
            element_wait: Duration::from_secs(20),
            response_wait: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            pause_scale: 1.0,
            pauses: Pauses::default(),
            notebook_selectors: NotebookSelectors::default(),
            chat_selectors: ChatSelectors::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            webdriver_url: std::env::var("WEBDRIVER_URL").unwrap_or(defaults.webdriver_url),
            notebook_login_url: std::env::var("NOTEBOOK_LOGIN_URL")
                .unwrap_or(defaults.notebook_login_url),
            notebook_url: std::env::var("NOTEBOOK_URL").unwrap_or(defaults.notebook_url),
            notebook_email: Secret::new(env_with_fallback("NOTEBOOK_EMAIL", "KAGGLE_EMAIL")),
            notebook_password: Secret::new(env_with_fallback(
                "NOTEBOOK_PASSWORD",
                "KAGGLE_PASSWORD",
            )),
            chat_url: std::env::var("CHAT_URL").unwrap_or(defaults.chat_url),
            headless: std::env::var("BROWSER_HEADLESS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            notebook_chrome_args: defaults.notebook_chrome_args,
            chat_chrome_args: defaults.chat_chrome_args,
            element_wait: Duration::from_secs(
                std::env::var("ELEMENT_WAIT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
            response_wait: Duration::from_secs(
                std::env::var("RESPONSE_WAIT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            poll_interval: Duration::from_millis(
                std::env::var("ELEMENT_POLL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            pause_scale: std::env::var("PAUSE_SCALE")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite() && (0.0..=MAX_PAUSE_SCALE).contains(v))
                .unwrap_or(1.0),
            pauses: defaults.pauses,
            notebook_selectors: NotebookSelectors::from_env(),
            chat_selectors: ChatSelectors::from_env(),
        }
    }

    /// Check URLs parse and credentials are present.
    pub fn validate(&self) -> PipelineResult<()> {
        for (name, value) in [
            ("WEBDRIVER_URL", &self.webdriver_url),
            ("NOTEBOOK_LOGIN_URL", &self.notebook_login_url),
            ("NOTEBOOK_URL", &self.notebook_url),
            ("CHAT_URL", &self.chat_url),
        ] {
            Url::parse(value)
                .map_err(|e| PipelineError::config_error(format!("{name} is not a URL: {e}")))?;
        }

        if self.notebook_email.is_empty() || self.notebook_password.is_empty() {
            return Err(PipelineError::config_error(
                "NOTEBOOK_EMAIL and NOTEBOOK_PASSWORD must be set",
            ));
        }

        Ok(())
    }

    /// Apply `pause_scale` to a configured pause. A scale that cannot
    /// produce a valid duration leaves the pause unscaled.
    pub fn scaled(&self, pause: Duration) -> Duration {
        Duration::try_from_secs_f64(pause.as_secs_f64() * self.pause_scale).unwrap_or(pause)
    }

    /// Sleep for a configured pause after scaling.
    pub async fn pause(&self, pause: Duration) {
        let pause = self.scaled(pause);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    pub fn notebook_chrome_options(&self) -> ChromeOptions {
        self.chrome_options(&self.notebook_chrome_args)
    }

    pub fn chat_chrome_options(&self) -> ChromeOptions {
        self.chrome_options(&self.chat_chrome_args)
    }

    fn chrome_options(&self, args: &[String]) -> ChromeOptions {
        let options = ChromeOptions::new().args(args.iter().cloned());
        if self.headless {
            options.headless()
        } else {
            options
        }
    }
}

fn env_with_fallback(primary: &str, fallback: &str) -> String {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .unwrap_or_default()
}

fn css_from_env(key: &str, default: Locator) -> Locator {
    std::env::var(key).map(Locator::css).unwrap_or(default)
}

fn xpath_from_env(key: &str, default: Locator) -> Locator {
    std::env::var(key).map(Locator::xpath).unwrap_or(default)
}
