//! The external natural-language extraction step.

pub mod openai;

pub use openai::OpenAiExtractor;

use crate::core::config::ExtractionSettings;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction is not enabled; set [extraction] enabled = true in formrelay.toml")]
    Disabled,

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("extraction request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("extraction service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("extraction service returned no choices")]
    EmptyResponse,
}

impl ExtractionError {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::Disabled | ExtractionError::MissingApiKey(_) => "FR-EXTRACT-001",
            ExtractionError::Transport(_) => "FR-EXTRACT-002",
            ExtractionError::Status { .. } | ExtractionError::EmptyResponse => "FR-EXTRACT-003",
        }
    }
}

/// Cleans a messy raw value for a named field.
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn extract(&self, field: &str, raw: &Value) -> Result<Value, ExtractionError>;
}

/// Extractor used when no extraction service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledExtractor;

#[async_trait]
impl Extractor for DisabledExtractor {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn extract(&self, _field: &str, _raw: &Value) -> Result<Value, ExtractionError> {
        Err(ExtractionError::Disabled)
    }
}

/// Build the extractor described by `settings`.
pub fn from_settings(settings: &ExtractionSettings) -> Result<Arc<dyn Extractor>, ExtractionError> {
    if !settings.enabled {
        return Ok(Arc::new(DisabledExtractor));
    }
    let api_key = std::env::var(&settings.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ExtractionError::MissingApiKey(settings.api_key_env.clone()))?;
    Ok(Arc::new(OpenAiExtractor::new(settings, api_key)?))
}
