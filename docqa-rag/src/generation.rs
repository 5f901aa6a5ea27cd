//! Calling the completion endpoint with bounded retry on rate limiting.
//!
//! [`GenerationClient`] drives a [`CompletionEndpoint`] through an explicit
//! [`Backoff`] state machine: rate-limited attempts are retried after an
//! exponentially growing delay until the attempt ceiling is reached, and
//! every other failure ends the request at once. Delays use
//! `tokio::time::sleep`, so tests can run the schedule on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{EndpointError, GenerationError};

/// An external text-completion API.
///
/// One call to [`complete`](CompletionEndpoint::complete) is one request.
/// Retrying is the caller's job.
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    /// Send `prompt` as a single user message and return the answer text.
    async fn complete(&self, prompt: &str) -> Result<String, EndpointError>;
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of requests allowed, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each later retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    /// Start a fresh retry schedule.
    pub fn backoff(&self) -> Backoff {
        Backoff { policy: *self, attempts: 0 }
    }

    /// Worst-case time spent sleeping across all retries.
    pub fn total_delay(&self) -> Duration {
        let mut backoff = self.backoff();
        let mut total = Duration::ZERO;
        while let Some(delay) = backoff.record_attempt() {
            total += delay;
        }
        total
    }
}

/// Retry state for one request: how many attempts were made and what the
/// next delay is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    policy: RetryPolicy,
    attempts: u32,
}

impl Backoff {
    /// Number of attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed, retryable attempt.
    ///
    /// Returns the delay to wait before the next attempt, or `None` once the
    /// attempt ceiling has been reached.
    pub fn record_attempt(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(self.attempts - 1);
        Some(self.policy.base_delay.saturating_mul(factor))
    }
}

/// Produces answers from prompts, absorbing transient rate limiting.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{GeminiEndpoint, GenerationClient, GenerationConfig};
///
/// let config = GenerationConfig::from_env();
/// let client = GenerationClient::new(Arc::new(GeminiEndpoint::new(&config)?), config.retry);
/// let answer = client.generate_text("Say hello").await;
/// ```
#[derive(Clone)]
pub struct GenerationClient {
    endpoint: Arc<dyn CompletionEndpoint>,
    policy: RetryPolicy,
}

impl GenerationClient {
    /// Wrap an endpoint with a retry policy.
    pub fn new(endpoint: Arc<dyn CompletionEndpoint>, policy: RetryPolicy) -> Self {
        Self { endpoint, policy }
    }

    /// The retry policy in force.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Generate an answer for `prompt`.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::MissingCredentials`] without retrying
    /// - [`GenerationError::RateLimitExhausted`] once every allowed attempt
    ///   was rate limited
    /// - [`GenerationError::Request`] on the first failure of any other kind
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut backoff = self.policy.backoff();
        loop {
            let attempt = backoff.attempts() + 1;
            debug!(attempt, prompt_len = prompt.len(), "sending completion request");

            match self.endpoint.complete(prompt).await {
                Ok(answer) => {
                    info!(attempt, answer_len = answer.len(), "completion succeeded");
                    return Ok(answer);
                }
                Err(EndpointError::RateLimited) => match backoff.record_attempt() {
                    Some(delay) => {
                        warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!(attempts = backoff.attempts(), "rate limited on every attempt");
                        return Err(GenerationError::RateLimitExhausted {
                            attempts: backoff.attempts(),
                        });
                    }
                },
                Err(EndpointError::MissingCredentials) => {
                    warn!("no API key configured, skipping completion request");
                    return Err(GenerationError::MissingCredentials);
                }
                Err(e) => {
                    error!(attempt, error = %e, "completion request failed");
                    let status = match &e {
                        EndpointError::Http { status, .. } => Some(*status),
                        _ => None,
                    };
                    return Err(GenerationError::Request { status, message: e.to_string() });
                }
            }
        }
    }

    /// Like [`generate`](Self::generate), but failures become the fixed
    /// user-facing messages.
    pub async fn generate_text(&self, prompt: &str) -> String {
        match self.generate(prompt).await {
            Ok(answer) => answer,
            Err(e) => e.user_message().to_string(),
        }
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient").field("policy", &self.policy).finish_non_exhaustive()
    }
}
