//! Runs one submission through validation and concurrent endpoint delivery.

mod report;

pub use report::{EndpointOutcome, RunReport};

use crate::core::config::{CustomerConfig, EndpointConfig, RetrySettings, Settings};
use crate::core::dispatch::{
    send_with_retry, Attempted, DeliveryClient, Exhausted, ReqwestDeliveryClient, RetryContext,
};
use crate::core::error::AppError;
use crate::core::expression::ExpressionEngine;
use crate::core::extraction::{self, Extractor};
use crate::core::metrics::RunMetrics;
use crate::core::payload::PayloadBuilder;
use crate::core::submission::Submission;
use crate::core::transform::TransformChain;
use crate::core::types::{ErrorCategory, RunPhase, RunStatus};
use crate::core::validation::validate_submission;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub struct Orchestrator {
    builder: PayloadBuilder,
    client: Arc<dyn DeliveryClient>,
    engine: Arc<ExpressionEngine>,
    metrics: Arc<RunMetrics>,
    retry_defaults: RetrySettings,
}

impl Orchestrator {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        client: Arc<dyn DeliveryClient>,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        let engine = Arc::new(ExpressionEngine::default());
        Orchestrator {
            builder: PayloadBuilder::new(TransformChain::new(extractor), Arc::clone(&engine)),
            client,
            engine,
            metrics,
            retry_defaults: RetrySettings::default(),
        }
    }

    /// Wire the HTTP delivery client and extractor described by `settings`.
    pub fn from_settings(settings: &Settings, metrics: Arc<RunMetrics>) -> Result<Self, AppError> {
        let client = ReqwestDeliveryClient::new(&settings.delivery).map_err(|err| {
            AppError::with_source(
                ErrorCategory::ConfigurationError,
                "failed to build delivery client",
                Box::new(err),
            )
            .with_code("FR-DELIVERY-004")
        })?;
        let extractor = extraction::from_settings(&settings.extraction).map_err(|err| {
            AppError::new(ErrorCategory::ConfigurationError, err.to_string()).with_code(err.code())
        })?;
        Ok(Orchestrator::new(extractor, Arc::new(client), metrics)
            .with_retry_defaults(settings.retry.clone()))
    }

    /// Retry tuning for endpoints without their own retry block.
    pub fn with_retry_defaults(mut self, retry_defaults: RetrySettings) -> Self {
        self.retry_defaults = retry_defaults;
        self
    }

    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    /// Validate `submission`, then build and deliver a payload to every enabled endpoint.
    ///
    /// Endpoint failures are isolated and reported per endpoint; only a failed
    /// validation aborts the run.
    pub async fn process(&self, submission: &Submission, config: &CustomerConfig) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            customer_id = %submission.customer_id()
        );
        self.run(run_id, submission, config).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, submission: &Submission, config: &CustomerConfig) -> RunReport {
        let started = Instant::now();
        let customer_id = submission.customer_id().to_string();
        let mut phase = RunPhase::Idle;

        tracing::info!(customer_id = %customer_id, "processing form submission");
        if !customer_id.is_empty() && customer_id != config.customer_id {
            tracing::warn!(
                customer_id = %customer_id,
                config_customer_id = %config.customer_id,
                "submission customerID does not match configuration"
            );
        }

        advance(&mut phase, RunPhase::Validating);
        let violations = validate_submission(submission, &config.validation_rules, &self.engine);
        if !violations.is_empty() {
            advance(&mut phase, RunPhase::Aborted);
            tracing::warn!(customer_id = %customer_id, violations = ?violations, "validation failed");
            self.metrics.record_failure();
            return RunReport {
                run_id,
                customer_id,
                status: RunStatus::Aborted,
                violations,
                outcomes: Vec::new(),
                elapsed: started.elapsed(),
            };
        }
        tracing::info!(customer_id = %customer_id, "validation passed");

        advance(&mut phase, RunPhase::Dispatching);
        let tasks = config.endpoints.iter().filter_map(|endpoint| {
            if endpoint.enabled {
                Some(self.dispatch_endpoint(submission, config, endpoint))
            } else {
                tracing::info!(endpoint = %endpoint.name, "endpoint disabled, skipping");
                None
            }
        });
        let outcomes = join_all(tasks).await;

        advance(&mut phase, RunPhase::Completed);
        let elapsed = started.elapsed();
        self.metrics.record_duration(elapsed);
        tracing::info!(
            customer_id = %customer_id,
            elapsed = %humantime::format_duration(elapsed),
            "form submission completed"
        );
        self.metrics.log_summary();

        RunReport {
            run_id,
            customer_id,
            status: RunStatus::Completed,
            violations,
            outcomes,
            elapsed,
        }
    }

    async fn dispatch_endpoint(
        &self,
        submission: &Submission,
        config: &CustomerConfig,
        endpoint: &EndpointConfig,
    ) -> EndpointOutcome {
        let customer_id = submission.customer_id();
        tracing::debug!(endpoint = %endpoint.name, url = %endpoint.url, "preparing payload");

        let payload = match self.builder.build(submission, endpoint, &config.defaults).await {
            Ok(payload) => payload,
            Err(err) => {
                let err = err.with_context("customer_id", customer_id);
                tracing::error!(
                    customer_id,
                    endpoint = %endpoint.name,
                    error = %err,
                    "failed to build payload for {}",
                    endpoint.name
                );
                self.metrics.record_failure();
                return EndpointOutcome::failed(endpoint, 0, &err);
            }
        };

        tracing::info!(endpoint = %endpoint.name, url = %endpoint.url, "sending payload to {}", endpoint.name);
        tracing::debug!(endpoint = %endpoint.name, payload = %payload.to_value(), "payload preview");

        let policy = endpoint.retry_policy(&self.retry_defaults);
        let label = format!("POST {}", endpoint.name);
        let metrics = Arc::clone(&self.metrics);
        let endpoint_name = endpoint.name.clone();
        let on_retry = move || metrics.increment_retry(&endpoint_name);
        let context = RetryContext::new(&label, customer_id).with_hook(&on_retry);

        let client = self.client.as_ref();
        let url = endpoint.url.as_str();
        let headers = &endpoint.headers;
        let body = &payload;
        match send_with_retry(&policy, context, move || client.post(url, body, headers)).await {
            Ok(Attempted { value, attempts }) => {
                tracing::info!(
                    endpoint = %endpoint.name,
                    status = value.status,
                    status_text = %value.status_text,
                    attempts,
                    "submission to {} succeeded",
                    endpoint.name
                );
                self.metrics.record_success();
                EndpointOutcome::delivered(endpoint, attempts, value.status)
            }
            Err(Exhausted { error, attempts }) => {
                let err = AppError::new(
                    ErrorCategory::DeliveryError,
                    format!("failed to submit to {}: {}", endpoint.name, error),
                )
                .with_code(error.code())
                .with_context("customer_id", customer_id)
                .with_context("endpoint", endpoint.name.clone());
                tracing::error!(
                    customer_id,
                    endpoint = %endpoint.name,
                    error = %error,
                    attempts,
                    "failed to submit to {}",
                    endpoint.name
                );
                self.metrics.record_failure();
                EndpointOutcome::failed(endpoint, attempts, &err)
            }
        }
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    debug_assert!(
        phase.can_transition_to(next),
        "invalid run transition {} -> {}",
        phase,
        next
    );
    tracing::debug!(from = %phase, to = %next, "run phase");
    *phase = next;
}
