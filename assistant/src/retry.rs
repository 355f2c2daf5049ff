use exam_planner_core::config::RetrySettings;
use exam_planner_core::{ExtractionProvider, ProviderError};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Bounded retry policy for provider calls.
///
/// Only errors whose text contains a transient marker are retried. The delay
/// before retry `n` is `base_delay * n`, and no delay follows the last attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub transient_markers: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            transient_markers: settings.transient_markers.clone(),
        }
    }
}

impl RetryPolicy {
    pub fn is_transient(&self, error: &ProviderError) -> bool {
        error.mentions_any(&self.transient_markers)
    }

    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }
}

/// Result of a provider call after retries.
#[derive(Debug)]
pub enum RetryOutcome {
    Success(String),
    /// Every attempt failed with a transient overload.
    Busy {
        attempts: u32,
        last_error: ProviderError,
    },
    /// A non-transient failure, returned after the attempt that raised it.
    Fatal(ProviderError),
}

/// Calls the provider, retrying transient overloads with increasing delay.
pub async fn call_with_retry<P>(provider: &P, prompt: &str, policy: &RetryPolicy) -> RetryOutcome
where
    P: ExtractionProvider + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match provider.generate(prompt).await {
            Ok(text) => {
                debug!(attempt, "Provider call succeeded");
                return RetryOutcome::Success(text);
            }
            Err(e) if policy.is_transient(&e) => {
                if attempt >= max_attempts {
                    error!(error = %e, attempts = attempt, "Provider still overloaded after retries");
                    return RetryOutcome::Busy {
                        attempts: attempt,
                        last_error: e,
                    };
                }
                let delay = policy.delay_before_retry(attempt);
                warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "Transient provider error, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(error = %e, attempt, "Provider call failed");
                return RetryOutcome::Fatal(e);
            }
        }
    }
}
