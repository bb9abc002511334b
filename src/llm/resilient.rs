//! Retry + model-fallback wrapper around a [`Completer`].
//!
//! Each configured model gets up to `max_attempts` tries. Only rate-limit
//! errors are retried; the pause is the provider's suggested wait plus a
//! small buffer when one is given, exponential backoff otherwise. Any other
//! error, or running out of attempts, moves on to the next model. When every
//! model has failed the last error is returned.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use super::{Completer, CompletionError};

static RETRY_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry\s+(?:in|after)\s+([0-9]+(?:\.[0-9]+)?)\s*(ms|s|sec|secs|seconds)?\b")
        .expect("valid regex")
});

static RETRY_DELAY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?retry_?delay"?\s*[:=]\s*"?([0-9]+(?:\.[0-9]+)?)s"#).expect("valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per model, including the first one
    pub max_attempts: u32,
    /// Pause before the second attempt; doubles for each later one
    pub base_delay: Duration,
    /// Added on top of a provider-suggested wait
    pub rate_limit_buffer: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            rate_limit_buffer: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Pause after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, err: &CompletionError, attempt: u32) -> Duration {
        match suggested_wait(err) {
            Some(wait) => wait + self.rate_limit_buffer,
            None => self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1)),
        }
    }
}

/// Wait time the provider asked for, from the structured field or the
/// error text ("Please retry in 34.5s", `"retryDelay": "34s"`).
pub fn suggested_wait(err: &CompletionError) -> Option<Duration> {
    match err {
        CompletionError::RateLimited {
            retry_after: Some(wait),
            ..
        } if *wait <= MAX_SUGGESTED_WAIT => Some(*wait),
        CompletionError::RateLimited { message, .. } => parse_retry_delay(message),
        _ => None,
    }
}

/// Longest provider-suggested wait honored; anything above falls back to backoff.
pub const MAX_SUGGESTED_WAIT: Duration = Duration::from_secs(10 * 60);

/// A provider wait hint in seconds, or `None` if it is unusable or too long.
pub fn wait_hint(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|wait| *wait <= MAX_SUGGESTED_WAIT)
}

pub fn parse_retry_delay(message: &str) -> Option<Duration> {
    if let Some(caps) = RETRY_IN.captures(message) {
        let value: f64 = caps[1].parse().ok()?;
        let unit = caps.get(2).map(|m| m.as_str().to_lowercase());
        let secs = if unit.as_deref() == Some("ms") {
            value / 1000.0
        } else {
            value
        };
        return wait_hint(secs);
    }
    let caps = RETRY_DELAY_FIELD.captures(message)?;
    let secs: f64 = caps[1].parse().ok()?;
    wait_hint(secs)
}

pub struct ResilientCompleter {
    completer: Arc<dyn Completer>,
    models: Vec<String>,
    policy: RetryPolicy,
}

impl ResilientCompleter {
    pub fn new(completer: Arc<dyn Completer>, models: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            completer,
            models,
            policy,
        }
    }

    /// Complete a fixed prompt.
    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.call(|_| prompt.to_string()).await
    }

    /// Complete a prompt built per model, walking the model list in order.
    pub async fn call<F>(&self, build_prompt: F) -> Result<String, CompletionError>
    where
        F: Fn(&str) -> String + Send + Sync,
    {
        let mut last_error = CompletionError::NoModels;

        for model in &self.models {
            let prompt = build_prompt(model);
            match self.call_model(model, &prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!("Model {model} failed, trying next model: {e}");
                    last_error = e;
                }
            }
        }

        tracing::error!("All completion models failed: {last_error}");
        Err(last_error)
    }

    async fn call_model(&self, model: &str, prompt: &str) -> Result<String, CompletionError> {
        let mut attempt = 1;
        loop {
            match self.completer.complete(prompt, model).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limited() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(&e, attempt);
                    tracing::warn!(
                        "{model} rate limited (attempt {attempt}/{}), retrying in {:.1}s",
                        self.policy.max_attempts,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
