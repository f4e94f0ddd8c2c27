//! Retry policy for HTTP requests.
//!
//! Only rate-limit rejections and transport failures are ever retried. Both
//! are understood to happen before the server acted on the request; a 5xx
//! after acceptance is never retried.

use std::time::Duration;

use reqwest::Method;

use crate::error::TransientPhase;
use crate::http::classify::Failure;

/// Whether repeating a request can change server state more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Idempotency {
    /// Safe to repeat after any transient failure.
    Idempotent,
    /// Repeated only when the request provably never reached the server.
    #[default]
    NonIdempotent,
}

impl Idempotency {
    /// GET and HEAD are idempotent; every other method is treated as a write.
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET || *method == Method::HEAD {
            Idempotency::Idempotent
        } else {
            Idempotency::NonIdempotent
        }
    }

    pub fn is_idempotent(self) -> bool {
        self == Idempotency::Idempotent
    }
}

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    fn stop() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }

    fn after(delay: Duration) -> Self {
        Self { retry: true, delay }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further attempt.
    pub base_delay: Duration,
    /// Ceiling for computed backoff delays.
    pub max_delay: Duration,
    /// Jitter window as a fraction of the nominal delay (`0.25` = ±25%).
    pub jitter: f64,
    /// Ceiling for server-provided `Retry-After` waits.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: 0.25,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Create a config with the given total attempt count and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// A config that never retries.
    pub fn disabled() -> Self {
        Self::new(1)
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter fraction. Clamped to `0.0..=1.0`; a non-finite value
    /// disables jitter.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = clamp_jitter(jitter);
        self
    }

    pub fn with_max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = max;
        self
    }

    /// Exponential delay for a given attempt (0-indexed), before jitter.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(20))
            .min(self.max_delay)
    }

    /// Calculate the jittered delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt);
        let jitter = self.jitter_fraction();
        if jitter == 0.0 {
            return nominal;
        }

        let offset = (rand::random::<f64>() - 0.5) * 2.0 * jitter;
        nominal.mul_f64(1.0 + offset).min(self.max_delay)
    }

    /// Decide whether attempt `attempt` (0-indexed) should be followed by another.
    pub fn should_retry(
        &self,
        attempt: u32,
        failure: &Failure,
        idempotency: Idempotency,
    ) -> RetryDecision {
        if attempt.saturating_add(1) >= self.max_attempts {
            return RetryDecision::stop();
        }

        match failure {
            Failure::RateLimited {
                retry_after: Some(wait),
            } => RetryDecision::after((*wait).min(self.max_retry_after)),
            Failure::RateLimited { retry_after: None } => {
                RetryDecision::after(self.delay_for_attempt(attempt))
            }
            Failure::Transient { phase }
                if idempotency.is_idempotent() || *phase == TransientPhase::Connect =>
            {
                RetryDecision::after(self.delay_for_attempt(attempt))
            }
            _ => RetryDecision::stop(),
        }
    }

    // `jitter` is a public field, so it is clamped again on use.
    fn jitter_fraction(&self) -> f64 {
        clamp_jitter(self.jitter)
    }
}

fn clamp_jitter(jitter: f64) -> f64 {
    if jitter.is_finite() {
        jitter.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
