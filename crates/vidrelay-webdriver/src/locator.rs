//! Element locators and wait conditions.

use std::fmt;

use serde_json::{json, Value};

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    /// W3C location strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::XPath(v) => v,
        }
    }

    /// Request body for the find-element endpoints.
    pub fn to_json(&self) -> Value {
        json!({ "using": self.strategy(), "value": self.value() })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css `{}`", v),
            Locator::XPath(v) => write!(f, "xpath `{}`", v),
        }
    }
}

/// What a wait requires of the located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// Element is in the DOM.
    Present,
    /// Element is displayed and enabled.
    Clickable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_json() {
        let css = Locator::css("[data-testid=\"send-button\"]");
        assert_eq!(
            css.to_json(),
            json!({ "using": "css selector", "value": "[data-testid=\"send-button\"]" })
        );

        let xpath = Locator::xpath("//*[normalize-space()='Run All']");
        assert_eq!(xpath.strategy(), "xpath");
        assert_eq!(xpath.to_string(), "xpath `//*[normalize-space()='Run All']`");
    }
}
