use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    /// Upper bound of the uniform random delay added to each wait.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// The waits before each retry, without jitter.
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let mut backoff_ms = duration_ms(self.base_delay);
        let mut schedule = Vec::with_capacity(self.max_retries as usize);
        for _ in 0..self.max_retries {
            schedule.push(Duration::from_millis(backoff_ms));
            backoff_ms = next_backoff(backoff_ms, self.backoff_factor);
        }
        schedule
    }
}

/// Labels and hooks for one retried operation.
#[derive(Clone, Copy)]
pub struct RetryContext<'a> {
    pub label: &'a str,
    pub customer_id: &'a str,
    /// Fired at the start of every retry attempt.
    pub on_retry: Option<&'a (dyn Fn() + Send + Sync)>,
}

impl<'a> RetryContext<'a> {
    pub fn new(label: &'a str, customer_id: &'a str) -> Self {
        Self {
            label,
            customer_id,
            on_retry: None,
        }
    }

    pub fn with_hook(mut self, on_retry: &'a (dyn Fn() + Send + Sync)) -> Self {
        self.on_retry = Some(on_retry);
        self
    }
}

/// A successful result with the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// The last error after every attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub error: E,
    pub attempts: u32,
}

/// Run `action` until it succeeds or `policy.max_retries` retries have failed.
pub async fn send_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    context: RetryContext<'_>,
    mut action: F,
) -> Result<Attempted<T>, Exhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0u32;
    let mut backoff_ms = duration_ms(policy.base_delay);
    let jitter_ms = duration_ms(policy.jitter);

    loop {
        if attempt > 0 {
            tracing::info!(
                label = context.label,
                customer_id = context.customer_id,
                attempt,
                "retry attempt {} for {}",
                attempt,
                context.label
            );
            if let Some(hook) = context.on_retry {
                hook();
            }
        }

        match action().await {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: attempt + 1,
                })
            }
            Err(error) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    tracing::error!(
                        label = context.label,
                        customer_id = context.customer_id,
                        error = %error,
                        "{} failed after {} retries",
                        context.label,
                        policy.max_retries
                    );
                    return Err(Exhausted {
                        error,
                        attempts: attempt,
                    });
                }

                let sleep_ms = backoff_ms.saturating_add(if jitter_ms > 0 {
                    rand::thread_rng().gen_range(0..=jitter_ms)
                } else {
                    0
                });
                tracing::warn!(
                    label = context.label,
                    customer_id = context.customer_id,
                    error = %error,
                    attempt,
                    "{} attempt {} failed, retrying in {} ms",
                    context.label,
                    attempt,
                    sleep_ms
                );
                if sleep_ms > 0 {
                    sleep(Duration::from_millis(sleep_ms)).await;
                }
                backoff_ms = next_backoff(backoff_ms, policy.backoff_factor);
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn next_backoff(backoff_ms: u64, factor: f64) -> u64 {
    (backoff_ms as f64 * factor) as u64
}
