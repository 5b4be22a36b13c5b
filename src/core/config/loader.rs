#![allow(clippy::result_large_err)]

use super::{CustomerConfig, Settings};
use crate::core::error::AppError;
use crate::core::expression::ExpressionEngine;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

/// Default settings file name looked up in the working directory.
pub const SETTINGS_FILE: &str = "formrelay.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from an explicit path, or from ./formrelay.toml when present.
    /// Environment variables override file values; the result is validated.
    pub fn load_settings(path: Option<&Path>) -> Result<Settings, AppError> {
        let settings_file = match path {
            Some(path) => Some(Self::load_from_file(path)?.ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ConfigurationError,
                    format!("settings file not found: {}", path.display()),
                )
                .with_code("FR-CONFIG-009")
            })?),
            None => Self::load_from_file(Path::new(SETTINGS_FILE))?,
        };

        let mut settings = settings_file.unwrap_or_default();
        Self::apply_env_overrides(&mut settings);
        Self::validate_settings(&settings)?;

        Ok(settings)
    }

    /// Load settings from a specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<Settings>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read settings file {}: {}", path.display(), e),
            )
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse settings file {}: {}", path.display(), e),
            )
            .with_code("FR-CONFIG-009")
        })?;

        Ok(Some(settings))
    }

    /// Load and validate a customer configuration.
    pub fn load_customer(path: &Path, engine: &ExpressionEngine) -> Result<CustomerConfig, AppError> {
        let config = CustomerConfig::load(path)?;
        config.validate(engine)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the settings
    fn apply_env_overrides(settings: &mut Settings) {
        if let Some(timeout_ms) = parsed_var::<u64>("FORMRELAY_DELIVERY_TIMEOUT_MS") {
            settings.delivery.timeout_ms = timeout_ms;
        }

        // Retry overrides
        if let Some(retries) = parsed_var::<u32>("FORMRELAY_RETRY_RETRIES") {
            settings.retry.retries = retries;
        }

        if let Some(delay_ms) = parsed_var::<u64>("FORMRELAY_RETRY_DELAY_MS") {
            settings.retry.delay_ms = delay_ms;
        }

        if let Some(factor) = parsed_var::<f64>("FORMRELAY_RETRY_BACKOFF_FACTOR") {
            settings.retry.backoff_factor = factor;
        }

        // Extraction overrides
        if let Some(enabled) = parsed_var::<bool>("FORMRELAY_EXTRACTION_ENABLED") {
            settings.extraction.enabled = enabled;
        }

        if let Ok(base_url) = env::var("FORMRELAY_EXTRACTION_BASE_URL") {
            settings.extraction.base_url = base_url;
        }

        if let Ok(model) = env::var("FORMRELAY_EXTRACTION_MODEL") {
            settings.extraction.model = model;
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "FORMRELAY_DELIVERY_TIMEOUT_MS - Override per-request delivery timeout (default: 10000)",
            "FORMRELAY_RETRY_RETRIES - Override default retry count (default: 3)",
            "FORMRELAY_RETRY_DELAY_MS - Override default initial retry delay (default: 500)",
            "FORMRELAY_RETRY_BACKOFF_FACTOR - Override default backoff factor (default: 2.0)",
            "FORMRELAY_EXTRACTION_ENABLED - Enable the llm transform step (true/false, default: false)",
            "FORMRELAY_EXTRACTION_BASE_URL - Override extraction service base url",
            "FORMRELAY_EXTRACTION_MODEL - Override extraction model (default: gpt-3.5-turbo)",
            "FORMRELAY_LOG_LEVEL / RUST_LOG - Override log filter",
            "FORMRELAY_QUIET - Suppress console logging (true/false)",
        ]
    }

    /// Validate settings values
    pub fn validate_settings(settings: &Settings) -> Result<(), AppError> {
        if settings.delivery.timeout_ms == 0 {
            return Err(settings_error("delivery.timeout_ms must be greater than zero"));
        }

        if !settings.retry.backoff_factor.is_finite() || settings.retry.backoff_factor < 1.0 {
            return Err(settings_error("retry.backoff_factor must be at least 1.0"));
        }

        if settings.extraction.enabled {
            if url::Url::parse(&settings.extraction.base_url).is_err() {
                return Err(settings_error(format!(
                    "extraction.base_url is not a valid url: {}",
                    settings.extraction.base_url
                )));
            }
            if settings.extraction.model.trim().is_empty() {
                return Err(settings_error("extraction.model cannot be empty"));
            }
            if !(0.0..=2.0).contains(&settings.extraction.temperature) {
                return Err(settings_error(
                    "extraction.temperature must be between 0.0 and 2.0",
                ));
            }
        }

        Ok(())
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|raw| raw.trim().parse::<T>().ok())
}

fn settings_error<T: Into<String>>(message: T) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message).with_code("FR-CONFIG-010")
}
