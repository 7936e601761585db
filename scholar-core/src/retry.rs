//! Timeout and retry policy for external calls
//!
//! Every outbound call (paper search, web search, embeddings, chat completion)
//! goes through a [`CallPolicy`]: each attempt is bounded by a timeout and a
//! failed attempt is retried with exponential backoff until the attempt budget
//! is spent. The final failure keeps the kind of the call that produced it.

use std::future::Future;
use std::time::Duration;

use crate::config::ResilienceConfig;
use crate::error::{ErrorKind, Result, ScholarError};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add jitter to prevent thundering herd
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Builder: set max attempts
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder: set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Builder: set max delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Builder: enable/disable jitter
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculate delay for a given retry (0-indexed)
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);

        let clamped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.add_jitter {
            // Up to 25% jitter
            clamped_delay + clamped_delay * 0.25 * rand_jitter()
        } else {
            clamped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random jitter in 0.0..1.0 from a time-seeded LCG
fn rand_jitter() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEED: AtomicU64 = AtomicU64::new(0);

    const A: u64 = 1103515245;
    const C: u64 = 12345;
    const M: u64 = 1 << 31;

    let seed = SEED.fetch_add(1, Ordering::Relaxed);
    let time_component = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let next = (A.wrapping_mul(seed.wrapping_add(time_component)).wrapping_add(C)) % M;
    (next as f64) / (M as f64)
}

/// Retry state tracker
#[derive(Debug)]
pub struct RetryState {
    config: RetryConfig,
    attempt: usize,
    last_error: Option<String>,
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            last_error: None,
        }
    }

    /// Check if another attempt is allowed
    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Record a failed attempt
    pub fn record_attempt(&mut self, error: impl Into<String>) {
        self.attempt += 1;
        self.last_error = Some(error.into());
    }

    /// Delay before the next attempt
    pub fn next_delay(&self) -> Duration {
        self.config
            .delay_for_attempt(self.attempt.saturating_sub(1))
    }

    /// Attempts made so far
    pub fn current_attempt(&self) -> usize {
        self.attempt
    }

    pub fn remaining_attempts(&self) -> usize {
        self.config.max_attempts.saturating_sub(self.attempt)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Execute an async operation with retries
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> std::result::Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut state = RetryState::new(config.clone());

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                state.record_attempt(e.to_string());

                if !state.should_retry() {
                    if state.current_attempt() > 1 {
                        tracing::debug!(
                            attempts = state.current_attempt(),
                            last_error = state.last_error().unwrap_or_default(),
                            "Retries exhausted"
                        );
                    }
                    return Err(e);
                }

                let delay = state.next_delay();
                tracing::debug!(
                    attempt = state.current_attempt(),
                    remaining = state.remaining_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Bounded-timeout, bounded-retry policy for one class of external call
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Retry behaviour between attempts
    pub retry: RetryConfig,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}

impl CallPolicy {
    /// Build the policy from configuration
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            timeout: config.timeout,
            retry: RetryConfig::default()
                .with_max_attempts(config.max_attempts)
                .with_initial_delay(config.initial_backoff),
        }
    }

    /// Single attempt, no retry
    pub fn once(timeout: Duration) -> Self {
        Self {
            timeout,
            retry: RetryConfig::no_retry(),
        }
    }

    /// Run `operation` under this policy.
    ///
    /// A timed-out attempt counts as a failure of kind `kind`; after the last
    /// attempt the error is re-tagged as `kind` so callers see the failure
    /// class of the call, not of the transport.
    pub async fn run<F, Fut, T>(&self, kind: ErrorKind, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = self.timeout;
        with_retry(&self.retry, || {
            let attempt = operation();
            async move {
                match tokio::time::timeout(timeout, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(ScholarError::Other(format!(
                        "call timed out after {}ms",
                        timeout.as_millis()
                    ))),
                }
            }
        })
        .await
        .map_err(|e| e.retag(kind))
    }
}
