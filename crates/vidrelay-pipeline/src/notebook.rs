//! Notebook trigger: log in to the notebook host and re-run the notebook.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::Instrument;
use vidrelay_models::NotebookRunMode;
use vidrelay_webdriver::{BrowserError, BrowserResult, Session, WaitCondition, WebDriverClient};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::logging::UploadLogger;
use crate::traits::NotebookRunner;

const NOTEBOOK_TRIGGERS_TOTAL: &str = "vidrelay_notebook_triggers_total";
const NOTEBOOK_TRIGGER_DURATION_SECONDS: &str = "vidrelay_notebook_trigger_duration_seconds";

/// Drives the notebook UI through WebDriver, holding one session for reuse.
pub struct BrowserNotebookRunner {
    client: WebDriverClient,
    config: Arc<PipelineConfig>,
    session: Mutex<Option<Session>>,
}

impl BrowserNotebookRunner {
    pub fn new(client: WebDriverClient, config: Arc<PipelineConfig>) -> Self {
        Self {
            client,
            config,
            session: Mutex::new(None),
        }
    }

    async fn open_session(&self) -> BrowserResult<Session> {
        let session = self
            .client
            .new_session(&self.config.notebook_chrome_options())
            .await?;
        Ok(session.with_poll_interval(self.config.poll_interval))
    }

    async fn drive(
        &self,
        session: &Session,
        mode: NotebookRunMode,
        log: &UploadLogger,
    ) -> BrowserResult<()> {
        if mode == NotebookRunMode::Fresh {
            self.login(session, log).await?;
        }
        self.rerun_chain(session, mode, log).await
    }

    async fn login(&self, session: &Session, log: &UploadLogger) -> BrowserResult<()> {
        let cfg = &self.config;
        let sel = &cfg.notebook_selectors;

        session.goto(&cfg.notebook_login_url).await?;

        let sign_in = session
            .wait_for(&sel.sign_in_button, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session.click(&sign_in).await?;

        let email = session
            .wait_for(&sel.email_input, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session.send_keys(&email, cfg.notebook_email.expose()).await?;
        self.click_next(session, log).await?;

        let password = session
            .wait_for(&sel.password_input, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session
            .send_keys(&password, cfg.notebook_password.expose())
            .await?;
        self.click_next(session, log).await?;

        cfg.pause(cfg.pauses.after_login).await;
        session.goto(&cfg.notebook_url).await?;
        cfg.pause(cfg.pauses.after_notebook_load).await;

        log.log_progress("Logged in and opened notebook editor");
        Ok(())
    }

    /// Click the first `Next` button. A missing button is not fatal; the
    /// following wait reports the stuck page instead.
    async fn click_next(&self, session: &Session, log: &UploadLogger) -> BrowserResult<()> {
        let sel = &self.config.notebook_selectors;
        match session
            .find_by_text(&sel.next_button, &sel.next_button_text)
            .await
        {
            Ok(button) => session.click(&button).await,
            Err(BrowserError::TextNotFound { .. }) => {
                log.log_warning(&format!("No '{}' button found", sel.next_button_text));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn rerun_chain(
        &self,
        session: &Session,
        mode: NotebookRunMode,
        log: &UploadLogger,
    ) -> BrowserResult<()> {
        let cfg = &self.config;
        let sel = &cfg.notebook_selectors;

        let more_actions = session
            .wait_for(&sel.more_actions, WaitCondition::Present, cfg.element_wait)
            .await?;
        session.scroll_into_view(&more_actions).await?;
        cfg.pause(cfg.pauses.before_more_actions).await;
        session.js_click(&more_actions).await?;

        let check_updates = session
            .wait_for(&sel.check_for_updates, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session.js_click(&check_updates).await?;

        let update = session
            .wait_for(&sel.update_button, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session.click(&update).await?;

        let settle = match mode {
            NotebookRunMode::Fresh => cfg.pauses.after_update_fresh,
            NotebookRunMode::Reuse => cfg.pauses.after_update_reuse,
        };
        cfg.pause(settle).await;

        let run_all = session
            .wait_for(&sel.run_all, WaitCondition::Clickable, cfg.element_wait)
            .await?;
        session.click(&run_all).await?;

        log.log_progress("Run All clicked");
        Ok(())
    }
}

#[async_trait]
impl NotebookRunner for BrowserNotebookRunner {
    async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn run(&self, mode: NotebookRunMode, log: &UploadLogger) -> PipelineResult<()> {
        let mut slot = self.session.lock().await;
        let start = Instant::now();

        let (session, mode) = match (mode, slot.take()) {
            (NotebookRunMode::Reuse, Some(session)) => (session, NotebookRunMode::Reuse),
            (requested, existing) => {
                if let Some(stale) = existing {
                    stale.quit_quietly().await;
                }
                if requested == NotebookRunMode::Reuse {
                    log.log_warning("No live notebook session, logging in again");
                }
                match self.open_session().await {
                    Ok(session) => (session, NotebookRunMode::Fresh),
                    Err(e) => {
                        record_trigger(NotebookRunMode::Fresh, "failure", start);
                        return Err(e.into());
                    }
                }
            }
        };

        log.log_start(&format!("Notebook trigger ({mode} session {})", session.id()));
        let result = self.drive(&session, mode, log).instrument(log.span()).await;

        match result {
            Ok(()) => {
                *slot = Some(session);
                record_trigger(mode, "success", start);
                log.log_completion("Notebook re-run triggered");
                Ok(())
            }
            Err(e) => {
                session.quit_quietly().await;
                record_trigger(mode, "failure", start);
                Err(e.into())
            }
        }
    }

    async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.quit_quietly().await;
        }
    }
}

fn record_trigger(mode: NotebookRunMode, outcome: &'static str, start: Instant) {
    counter!(NOTEBOOK_TRIGGERS_TOTAL, "mode" => mode.as_str(), "outcome" => outcome).increment(1);
    histogram!(NOTEBOOK_TRIGGER_DURATION_SECONDS, "mode" => mode.as_str())
        .record(start.elapsed().as_secs_f64());
}
