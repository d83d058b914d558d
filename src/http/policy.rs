//! Pacing and retry policies
//!
//! Both are plain values read by the executor. Sleeping goes through the
//! [`Sleeper`] trait so tests can observe delays without waiting for them.

use crate::config::{BackoffConfig, PacingConfig, RetryConfig};
use crate::types::BackoffType;
use async_trait::async_trait;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Pacing
// ============================================================================

/// Bounds of the random delay inserted before each dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacingPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl PacingPolicy {
    /// Create a policy
    ///
    /// Reversed bounds are swapped, except that a zero `max_delay` always
    /// means pacing is off.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        if min_delay > max_delay && !max_delay.is_zero() {
            Self {
                min_delay: max_delay,
                max_delay: min_delay,
            }
        } else {
            Self {
                min_delay,
                max_delay,
            }
        }
    }

    /// Pacing disabled
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.max_delay.is_zero()
    }

    /// Draw a delay from `[min_delay, max_delay)`
    ///
    /// Returns `None` when pacing is disabled. Equal bounds yield that value.
    pub fn sample(&self) -> Option<Duration> {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Same as [`sample`](Self::sample) with a caller-supplied RNG
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }
        if self.min_delay >= self.max_delay {
            return Some(self.min_delay);
        }
        let min = self.min_delay.as_nanos() as u64;
        let max = self.max_delay.as_nanos() as u64;
        Some(Duration::from_nanos(rng.gen_range(min..max)))
    }
}

impl From<&PacingConfig> for PacingPolicy {
    fn from(config: &PacingConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

// ============================================================================
// Retry
// ============================================================================

/// How long to wait after a failed attempt
#[derive(Clone)]
pub enum Backoff {
    /// Built-in strategy, capped at `max`
    Strategy {
        backoff_type: BackoffType,
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
    /// Arbitrary function of the failed attempt number (1-based)
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Strategy {
                backoff_type,
                initial,
                max,
                multiplier,
            } => f
                .debug_struct("Strategy")
                .field("backoff_type", backoff_type)
                .field("initial", initial)
                .field("max", max)
                .field("multiplier", multiplier)
                .finish(),
            Backoff::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        Backoff::Strategy {
            backoff_type: config.backoff_type,
            initial: Duration::from_millis(config.initial_ms),
            max: Duration::from_millis(config.max_ms),
            multiplier: config.multiplier,
        }
    }
}

/// Attempt budget around transport failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Strategy {
                backoff_type: BackoffType::Constant,
                initial: Duration::ZERO,
                max: Duration::ZERO,
                multiplier: 1.0,
            },
        }
    }

    /// Built-in backoff strategy
    pub fn new(
        max_attempts: u32,
        backoff_type: BackoffType,
        initial: Duration,
        max: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Strategy {
                backoff_type,
                initial,
                max,
                multiplier: 2.0,
            },
        }
    }

    /// Custom backoff function
    pub fn custom<F>(max_attempts: u32, backoff: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Custom(Arc::new(backoff)),
        }
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Custom(f) => f(attempt),
            Backoff::Strategy {
                backoff_type,
                initial,
                max,
                multiplier,
            } => {
                let step = attempt.saturating_sub(1);
                let delay = match backoff_type {
                    BackoffType::Constant => *initial,
                    BackoffType::Linear => initial.saturating_mul(step + 1),
                    BackoffType::Exponential => {
                        let factor = multiplier.max(1.0).powi(step.min(64) as i32);
                        let nanos = initial.as_nanos() as f64 * factor;
                        if nanos >= max.as_nanos() as f64 {
                            *max
                        } else {
                            Duration::from_nanos(nanos.round() as u64)
                        }
                    }
                };
                std::cmp::min(delay, *max)
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff::from(&config.backoff),
        }
    }
}

// ============================================================================
// Sleeper
// ============================================================================

/// Suspends the current task
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
