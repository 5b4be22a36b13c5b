#![allow(clippy::result_large_err)] // Customer config validation returns AppError with FR-CONFIG codes.

use crate::core::config::RetrySettings;
use crate::core::dispatch::RetryPolicy;
use crate::core::error::AppError;
use crate::core::expression::ExpressionEngine;
use crate::core::submission::is_known_field;
use crate::core::transform::TransformStep;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

fn default_enabled() -> bool {
    true
}

/// Predicate attached to a field, either a literal or a `$expr` expression.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Condition {
    Expr {
        #[serde(rename = "$expr")]
        expr: String,
    },
    Bool(bool),
}

impl Condition {
    pub fn expr<T: Into<String>>(expr: T) -> Self {
        Condition::Expr { expr: expr.into() }
    }

    pub fn expression(&self) -> Option<&str> {
        match self {
            Condition::Expr { expr } => Some(expr.as_str()),
            Condition::Bool(_) => None,
        }
    }
}

/// One transform step identifier or an ordered chain of them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TransformSpec {
    Single(String),
    Chain(Vec<String>),
}

impl TransformSpec {
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            TransformSpec::Single(step) => vec![step.as_str()],
            TransformSpec::Chain(steps) => steps.iter().map(String::as_str).collect(),
        }
    }

    pub fn steps(&self) -> Vec<TransformStep> {
        self.identifiers()
            .into_iter()
            .map(TransformStep::from_identifier)
            .collect()
    }
}

impl From<&str> for TransformSpec {
    fn from(step: &str) -> Self {
        TransformSpec::Single(step.to_string())
    }
}

impl From<Vec<&str>> for TransformSpec {
    fn from(steps: Vec<&str>) -> Self {
        TransformSpec::Chain(steps.into_iter().map(str::to_string).collect())
    }
}

/// Per-endpoint retry tuning; unset values fall back to the settings defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RetryOptions {
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub backoff_factor: Option<f64>,
    #[serde(default)]
    pub jitter_ms: Option<u64>,
}

impl RetryOptions {
    pub fn resolve(&self, defaults: &RetrySettings) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retries.unwrap_or(defaults.retries),
            base_delay: Duration::from_millis(self.delay_ms.unwrap_or(defaults.delay_ms)),
            backoff_factor: self.backoff_factor.unwrap_or(defaults.backoff_factor),
            jitter: Duration::from_millis(self.jitter_ms.unwrap_or(0)),
        }
    }
}

/// A named delivery target.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub transformations: IndexMap<String, TransformSpec>,
    #[serde(default)]
    pub include_if: IndexMap<String, Condition>,
    #[serde(default, alias = "retry_options")]
    pub retry: Option<RetryOptions>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

impl EndpointConfig {
    pub fn new<N: Into<String>, U: Into<String>>(name: N, url: U, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
            transformations: IndexMap::new(),
            include_if: IndexMap::new(),
            retry: None,
            enabled: true,
            headers: IndexMap::new(),
        }
    }

    pub fn with_transform<S: Into<TransformSpec>>(mut self, field: &str, spec: S) -> Self {
        self.transformations.insert(field.to_string(), spec.into());
        self
    }

    pub fn with_include_if(mut self, field: &str, condition: Condition) -> Self {
        self.include_if.insert(field.to_string(), condition);
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn retry_policy(&self, defaults: &RetrySettings) -> RetryPolicy {
        self.retry
            .clone()
            .unwrap_or_default()
            .resolve(defaults)
    }

    fn validate(&self, engine: &ExpressionEngine) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(config_error("FR-CONFIG-003", "endpoint name cannot be empty"));
        }
        let parsed = Url::parse(&self.url).map_err(|err| {
            config_error(
                "FR-CONFIG-004",
                format!("endpoint {} has invalid url '{}': {}", self.name, self.url, err),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(config_error(
                "FR-CONFIG-004",
                format!("endpoint {} url must use http or https", self.name),
            ));
        }
        if self.fields.is_empty() {
            return Err(config_error(
                "FR-CONFIG-005",
                format!("endpoint {} must list at least one field", self.name),
            ));
        }
        let referenced = self
            .fields
            .iter()
            .chain(self.transformations.keys())
            .chain(self.include_if.keys());
        for field in referenced {
            if !is_known_field(field) {
                return Err(config_error(
                    "FR-CONFIG-006",
                    format!("endpoint {} references unknown field '{}'", self.name, field),
                ));
            }
        }
        for (field, spec) in &self.transformations {
            if spec.identifiers().is_empty() {
                return Err(config_error(
                    "FR-CONFIG-007",
                    format!("endpoint {} has an empty transform chain for {}", self.name, field),
                ));
            }
        }
        if let Some(retry) = &self.retry {
            if let Some(factor) = retry.backoff_factor {
                if !factor.is_finite() || factor < 1.0 {
                    return Err(config_error(
                        "FR-CONFIG-008",
                        format!("endpoint {} backoff_factor must be >= 1", self.name),
                    ));
                }
            }
        }
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                config_error(
                    "FR-CONFIG-011",
                    format!("endpoint {} has invalid header name '{}': {}", self.name, name, err),
                )
            })?;
            if header_name == CONTENT_TYPE {
                return Err(config_error(
                    "FR-CONFIG-011",
                    format!(
                        "endpoint {} cannot override Content-Type; payloads are always application/json",
                        self.name
                    ),
                ));
            }
            HeaderValue::from_str(value).map_err(|err| {
                config_error(
                    "FR-CONFIG-011",
                    format!("endpoint {} has invalid value for header {}: {}", self.name, name, err),
                )
            })?;
        }
        for condition in self.include_if.values() {
            if let Some(expr) = condition.expression() {
                engine.compile(expr)?;
            }
        }
        Ok(())
    }
}

/// Everything needed to process one customer's submissions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CustomerConfig {
    pub customer_id: String,
    #[serde(alias = "enabled_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub defaults: IndexMap<String, Value>,
    #[serde(default)]
    pub validation_rules: IndexMap<String, Condition>,
}

impl CustomerConfig {
    pub fn new<T: Into<String>>(customer_id: T) -> Self {
        Self {
            customer_id: customer_id.into(),
            endpoints: Vec::new(),
            defaults: IndexMap::new(),
            validation_rules: IndexMap::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_default(mut self, field: &str, value: Value) -> Self {
        self.defaults.insert(field.to_string(), value);
        self
    }

    pub fn with_rule(mut self, field: &str, condition: Condition) -> Self {
        self.validation_rules.insert(field.to_string(), condition);
        self
    }

    pub fn enabled_endpoints(&self) -> impl Iterator<Item = &EndpointConfig> {
        self.endpoints.iter().filter(|endpoint| endpoint.enabled)
    }

    /// Load a customer configuration from YAML (`.yaml`/`.yml`) or JSON.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read customer config {}: {}", path.display(), err),
            )
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let parsed = if is_json {
            serde_json::from_str(&text).map_err(|err| err.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|err| err.to_string())
        };
        parsed.map_err(|err| {
            config_error(
                "FR-CONFIG-001",
                format!("failed to parse customer config {}: {}", path.display(), err),
            )
        })
    }

    /// Check the structural invariants of the configuration.
    pub fn validate(&self, engine: &ExpressionEngine) -> Result<(), AppError> {
        if self.customer_id.trim().is_empty() {
            return Err(config_error("FR-CONFIG-002", "customer_id cannot be empty"));
        }
        if self.endpoints.is_empty() {
            return Err(config_error(
                "FR-CONFIG-002",
                format!("customer {} defines no endpoints", self.customer_id),
            ));
        }
        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if !names.insert(endpoint.name.as_str()) {
                return Err(config_error(
                    "FR-CONFIG-003",
                    format!("duplicate endpoint name: {}", endpoint.name),
                ));
            }
            endpoint.validate(engine)?;
        }
        for field in self.defaults.keys().chain(self.validation_rules.keys()) {
            if !is_known_field(field) {
                return Err(config_error(
                    "FR-CONFIG-006",
                    format!("customer {} references unknown field '{}'", self.customer_id, field),
                ));
            }
        }
        for condition in self.validation_rules.values() {
            if let Some(expr) = condition.expression() {
                engine.compile(expr)?;
            }
        }
        Ok(())
    }
}

fn config_error<T: Into<String>>(code: &str, message: T) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message).with_code(code)
}
