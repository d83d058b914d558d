//! Client configuration
//!
//! Everything a [`RequestExecutor`](crate::http::RequestExecutor) reads at
//! construction time. Configs can be written by hand through the builder or
//! loaded from YAML:
//!
//! ```yaml
//! base_url: "https://i.example.com/api/v1/"
//! timeout_ms: 20000
//! pacing:
//!   min_delay_ms: 500
//!   max_delay_ms: 1500
//! retry:
//!   max_attempts: 3
//!   backoff:
//!     type: exponential
//!     initial_ms: 200
//! ```

use crate::error::{Error, Result};
use crate::types::{BackoffType, LogLevel, StringMap};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Client Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL that relative request targets are joined onto
    #[serde(default)]
    pub base_url: Option<String>,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-attempt request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Headers added to every request
    #[serde(default)]
    pub default_headers: StringMap,

    /// Random delay inserted before each dispatch
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Retry behaviour around transport failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Optional request rate ceiling
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Level used by the tracing request logger
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            default_headers: StringMap::new(),
            pacing: PacingConfig::default(),
            retry: RetryConfig::default(),
            rate_limit: None,
            log_level: LogLevel::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("instacore/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: ClientConfig = serde_yaml::from_str(yaml)?;
        config.pacing.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&contents)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::invalid_value(
                "retry.max_attempts",
                "at least one attempt is required",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(Error::invalid_value("timeout_ms", "must be greater than 0"));
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base)?;
        }
        if let Some(limit) = &self.rate_limit {
            if limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "rate_limit.requests_per_second",
                    "must be greater than 0",
                ));
            }
        }
        Ok(())
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// Pacing
// ============================================================================

/// Bounds of the random pre-dispatch delay
///
/// A `max_delay_ms` of zero disables pacing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default)]
    pub min_delay_ms: u64,
    #[serde(default)]
    pub max_delay_ms: u64,
}

impl PacingConfig {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        let mut config = Self {
            min_delay_ms,
            max_delay_ms,
        };
        config.normalize();
        config
    }

    /// Swap reversed bounds; a zero maximum is left alone (pacing off)
    pub fn normalize(&mut self) {
        if self.min_delay_ms > self.max_delay_ms && self.max_delay_ms > 0 {
            std::mem::swap(&mut self.min_delay_ms, &mut self.max_delay_ms);
        }
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_max_attempts() -> u32 {
    1
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Multiplier for exponential backoff
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

fn default_multiplier() -> f64 {
    2.0
}

// ============================================================================
// Rate Limit
// ============================================================================

/// Rate limiting configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Burst size (max tokens in bucket)
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

fn default_rps() -> u32 {
    1
}

fn default_burst() -> u32 {
    1
}

// ============================================================================
// Builder
// ============================================================================

/// Whole milliseconds, rounding any sub-millisecond remainder up so a
/// nonzero duration never becomes zero
fn ceil_millis(duration: Duration) -> u64 {
    let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if Duration::from_millis(ms) < duration {
        ms.saturating_add(1)
    } else {
        ms
    }
}

/// Builder for client config
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = ceil_millis(timeout);
        self
    }

    /// Set the pacing delay bounds
    pub fn request_delay(mut self, min: Duration, max: Duration) -> Self {
        self.config.pacing = PacingConfig::new(ceil_millis(min), ceil_millis(max));
        self
    }

    /// Set the total number of attempts per dispatch
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.retry.backoff.backoff_type = backoff_type;
        self.config.retry.backoff.initial_ms = ceil_millis(initial);
        self.config.retry.backoff.max_ms = ceil_millis(max);
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the request logger level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
