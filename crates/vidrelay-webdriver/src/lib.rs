//! W3C WebDriver client over HTTP.
//!
//! Talks JSON to a chromedriver-compatible endpoint. This crate provides:
//! - Session creation with Chrome options, and session teardown
//! - Element lookup by CSS selector or XPath
//! - Bounded polling waits for presence or clickability
//! - Clicks, typing, script execution and text scraping

pub mod capabilities;
pub mod client;
pub mod error;
pub mod locator;
pub mod session;


pub use capabilities::ChromeOptions;
pub use client::{DriverStatus, WebDriverClient};
pub use error::{BrowserError, BrowserResult};
pub use locator::{Locator, WaitCondition};
pub use session::{Element, Session};
