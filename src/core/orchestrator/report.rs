use crate::core::config::EndpointConfig;
use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, RunStatus};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;
use uuid::Uuid;

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub customer_id: String,
    pub status: RunStatus,
    pub violations: Vec<String>,
    pub outcomes: Vec<EndpointOutcome>,
    #[serde(serialize_with = "serialize_elapsed", deserialize_with = "deserialize_elapsed")]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_aborted(&self) -> bool {
        self.status == RunStatus::Aborted
    }

    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.delivered).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.delivered_count()
    }

    pub fn outcome(&self, endpoint: &str) -> Option<&EndpointOutcome> {
        self.outcomes.iter().find(|outcome| outcome.endpoint == endpoint)
    }

    /// The error surfaced to callers when validation aborted the run.
    pub fn abort_error(&self) -> Option<AppError> {
        if !self.is_aborted() {
            return None;
        }
        Some(
            AppError::new(
                ErrorCategory::ValidationError,
                format!("submission rejected: {}", self.violations.join("; ")),
            )
            .with_code("FR-VALIDATION-001")
            .with_context("customer_id", self.customer_id.clone())
            .with_context("run_id", self.run_id.to_string()),
        )
    }

    pub fn render_text(&self) -> String {
        let mut lines = vec![format!(
            "run {} for {}: {} in {}",
            self.run_id,
            if self.customer_id.is_empty() {
                "<missing customerID>"
            } else {
                self.customer_id.as_str()
            },
            match self.status {
                RunStatus::Aborted => "aborted",
                RunStatus::Completed => "completed",
            },
            humantime::format_duration(truncate_to_millis(self.elapsed))
        )];
        for violation in &self.violations {
            lines.push(format!("  violation: {}", violation));
        }
        for outcome in &self.outcomes {
            let detail = match (&outcome.status_code, &outcome.error) {
                (Some(status), _) => format!("delivered (HTTP {})", status),
                (None, Some(error)) => format!("failed: {}", error),
                (None, None) => "failed".to_string(),
            };
            lines.push(format!(
                "  {} [{} attempt(s)]: {}",
                outcome.endpoint, outcome.attempts, detail
            ));
        }
        lines.join("\n")
    }
}

/// Result of delivering to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOutcome {
    pub endpoint: String,
    pub url: String,
    pub delivered: bool,
    pub status_code: Option<u16>,
    /// Delivery attempts made; 0 when the payload could not be built.
    pub attempts: u32,
    pub error: Option<String>,
    pub error_code: Option<String>,
}

impl EndpointOutcome {
    pub(crate) fn delivered(endpoint: &EndpointConfig, attempts: u32, status: u16) -> Self {
        EndpointOutcome {
            endpoint: endpoint.name.clone(),
            url: endpoint.url.clone(),
            delivered: true,
            status_code: Some(status),
            attempts,
            error: None,
            error_code: None,
        }
    }

    pub(crate) fn failed(endpoint: &EndpointConfig, attempts: u32, err: &AppError) -> Self {
        EndpointOutcome {
            endpoint: endpoint.name.clone(),
            url: endpoint.url.clone(),
            delivered: false,
            status_code: None,
            attempts,
            error: Some(err.detail()),
            error_code: Some(err.code.clone()),
        }
    }
}

fn truncate_to_millis(elapsed: Duration) -> Duration {
    Duration::from_millis(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

fn serialize_elapsed<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*elapsed).to_string())
}

fn deserialize_elapsed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}
