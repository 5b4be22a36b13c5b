//! Counters shared by every run that uses the same [`RunMetrics`].

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Success/failure counts, per-endpoint retries and completed-run durations.
///
/// Safe to update from concurrent endpoint tasks. Never resets on its own.
#[derive(Debug, Default)]
pub struct RunMetrics {
    successes: AtomicU64,
    failures: AtomicU64,
    total_outcomes: AtomicU64,
    retries: DashMap<String, u64>,
    durations: Mutex<Vec<Duration>>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.total_outcomes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.total_outcomes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retry(&self, endpoint: &str) {
        *self.retries.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    pub fn record_duration(&self, elapsed: Duration) {
        self.durations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(elapsed);
    }

    pub fn retries_for(&self, endpoint: &str) -> u64 {
        self.retries.get(endpoint).map(|count| *count).unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations_ms = self
            .durations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|elapsed| elapsed.as_secs_f64() * 1000.0)
            .collect();
        MetricsSnapshot {
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            total_outcomes: self.total_outcomes.load(Ordering::Relaxed),
            retries: self
                .retries
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            durations_ms,
        }
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            successes = snapshot.success_count,
            failures = snapshot.failure_count,
            average_ms = snapshot.average_duration_ms(),
            "{}",
            snapshot.summary()
        );
    }
}

/// Point-in-time copy of [`RunMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub total_outcomes: u64,
    pub retries: BTreeMap<String, u64>,
    pub durations_ms: Vec<f64>,
}

impl MetricsSnapshot {
    /// Mean completed-run duration, 0 when nothing has completed.
    pub fn average_duration_ms(&self) -> f64 {
        if self.durations_ms.is_empty() {
            return 0.0;
        }
        self.durations_ms.iter().sum::<f64>() / self.durations_ms.len() as f64
    }

    pub fn summary(&self) -> String {
        let retries = if self.retries.is_empty() {
            "none".to_string()
        } else {
            self.retries
                .iter()
                .map(|(endpoint, count)| format!("{}={}", endpoint, count))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Submission metrics:\n- successes: {}\n- failures: {}\n- retries: {}\n- average submission time: {:.2} ms",
            self.success_count,
            self.failure_count,
            retries,
            self.average_duration_ms()
        )
    }
}
