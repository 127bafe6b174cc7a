//! Application state.

use std::sync::Arc;

use vidrelay_dataset::DatasetConfig;
use vidrelay_pipeline::{PipelineConfig, PipelineResult, UploadPipeline};
use vidrelay_webdriver::WebDriverClient;

use crate::auth::TokenVerifier;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<UploadPipeline>,
    pub auth: Arc<TokenVerifier>,
    /// Used by the readiness probe
    pub webdriver: WebDriverClient,
    pub dataset: DatasetConfig,
}

impl AppState {
    /// Create new application state with the CLI and browser backed pipeline.
    pub fn new(
        config: ApiConfig,
        dataset: DatasetConfig,
        pipeline_config: PipelineConfig,
    ) -> PipelineResult<Self> {
        let webdriver = WebDriverClient::new(&pipeline_config.webdriver_url)?;
        let pipeline = UploadPipeline::from_config(dataset.clone(), pipeline_config)?;
        Ok(Self::from_parts(config, Arc::new(pipeline), webdriver, dataset))
    }

    /// Assemble state around an existing pipeline.
    pub fn from_parts(
        config: ApiConfig,
        pipeline: Arc<UploadPipeline>,
        webdriver: WebDriverClient,
        dataset: DatasetConfig,
    ) -> Self {
        let auth = TokenVerifier::new(config.auth_jwt_secret.as_ref().map(|s| s.expose()));
        Self {
            config,
            pipeline,
            auth: Arc::new(auth),
            webdriver,
            dataset,
        }
    }
}
