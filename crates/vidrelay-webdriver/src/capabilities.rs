//! Chrome session capabilities.

use serde_json::{json, Value};

/// Chrome launch options sent with a new-session request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromeOptions {
    args: Vec<String>,
    binary: Option<String>,
}

impl ChromeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command-line switch.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple command-line switches.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run without a visible window.
    pub fn headless(self) -> Self {
        self.arg("--headless=new")
    }

    /// Use a specific Chrome binary.
    pub fn binary(mut self, path: impl Into<String>) -> Self {
        self.binary = Some(path.into());
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Build the W3C new-session body.
    pub fn to_capabilities(&self) -> Value {
        let mut chrome = json!({ "args": self.args });
        if let Some(binary) = &self.binary {
            chrome["binary"] = json!(binary);
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_body() {
        let caps = ChromeOptions::new()
            .args(["--no-sandbox", "--window-size=1920,1080"])
            .headless()
            .to_capabilities();

        let always = &caps["capabilities"]["alwaysMatch"];
        assert_eq!(always["browserName"], "chrome");
        assert_eq!(
            always["goog:chromeOptions"]["args"],
            json!(["--no-sandbox", "--window-size=1920,1080", "--headless=new"])
        );
        assert!(always["goog:chromeOptions"].get("binary").is_none());
    }

    #[test]
    fn test_capabilities_with_binary() {
        let caps = ChromeOptions::new().binary("/usr/bin/chromium").to_capabilities();
        assert_eq!(
            caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["binary"],
            "/usr/bin/chromium"
        );
    }
}
