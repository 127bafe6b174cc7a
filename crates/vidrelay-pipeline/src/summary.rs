//! Summary relay: ask the chat assistant to merge notebook snippets.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;
use vidrelay_webdriver::{BrowserResult, Session, WaitCondition, WebDriverClient};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::logging::UploadLogger;
use crate::traits::Summarizer;

/// Prompt sent to the chat assistant for a notebook's output.
pub fn build_prompt(output: &str) -> String {
    format!(
        "Here are my snippet summaries: {output} \
         Please combine these snippets into one cohesive summary."
    )
}

/// Chat assistant driven through a fresh WebDriver session per request.
pub struct BrowserSummarizer {
    client: WebDriverClient,
    config: Arc<PipelineConfig>,
}

impl BrowserSummarizer {
    pub fn new(client: WebDriverClient, config: Arc<PipelineConfig>) -> Self {
        Self { client, config }
    }

    async fn converse(&self, session: &Session, prompt: &str) -> BrowserResult<String> {
        let cfg = &self.config;
        let sel = &cfg.chat_selectors;

        session.goto(&cfg.chat_url).await?;

        let input = session
            .wait_for(&sel.prompt_input, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session.send_keys(&input, prompt).await?;

        let send = session
            .wait_for(&sel.send_button, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session.click(&send).await?;

        cfg.pause(cfg.pauses.before_chat_response).await;

        let reply = session
            .wait_for(&sel.response, WaitCondition::Present, cfg.response_wait)
            .await?;
        session.text(&reply).await
    }
}

#[async_trait]
impl Summarizer for BrowserSummarizer {
    async fn summarize(&self, prompt: &str, log: &UploadLogger) -> PipelineResult<String> {
        let session = self
            .client
            .new_session(&self.config.chat_chrome_options())
            .await?
            .with_poll_interval(self.config.poll_interval);
        log.log_progress(&format!("Chat session {} opened", session.id()));

        let result = self.converse(&session, prompt).instrument(log.span()).await;
        session.quit_quietly().await;

        result.map_err(Into::into)
    }
}
