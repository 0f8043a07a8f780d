use crate::types::Retryable;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff, SystemClock};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Bounded exponential retry: `max_attempts` tries, delays doubling from `initial_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    fn backoff(&self) -> ExponentialBackoff<SystemClock> {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.initial_delay * 32,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are spent. The last error is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Retryable + Display,
{
    let mut backoff = policy.backoff();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                warn!("{} failed with non-retryable error: {}", label, e);
                return Err(e);
            }
            Err(e) if attempt >= policy.max_attempts => {
                error!("{} failed after {} attempts: {}", label, attempt, e);
                return Err(e);
            }
            Err(e) => {
                let delay = backoff.next_backoff().unwrap_or(policy.initial_delay);
                warn!("Attempt {} for {} failed ({}), retrying in {:?}", attempt, label, e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
