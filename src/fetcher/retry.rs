//! Retry policy for the API client.
//!
//! Transient failures (timeouts, connection and TLS errors, HTTP 429/500/502/503/504)
//! are retried with exponential backoff and jitter. A 429 carrying the
//! rate-limit-reset header waits for the advertised number of seconds instead.

use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

/// Maximum number of attempts per request, including the first one.
pub const MAX_ATTEMPTS: u32 = 5;

/// Backoff before the first retry, before jitter.
pub const BASE_INTERVAL: Duration = Duration::from_millis(50);

/// Jitter applied to each backoff: the delay varies by +/- this fraction.
pub const INTERVAL_RANDOMNESS: f64 = 0.5;

/// Multiplier applied to the backoff after every failed attempt.
pub const BACKOFF_FACTOR: u32 = 2;

/// Statuses that are retried.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Response header carrying seconds until the rate limit resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Upper bound on a wait derived from the rate-limit-reset header.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(120);

/// Retry configuration for one logical request
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_interval: Duration,
    randomness: f64,
    backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_interval: BASE_INTERVAL,
            randomness: INTERVAL_RANDOMNESS,
            backoff_factor: BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least 1 and
    /// `randomness` to `0.0..=1.0`.
    pub fn new(max_attempts: u32, base_interval: Duration, randomness: f64, backoff_factor: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_interval,
            randomness: randomness.clamp(0.0, 1.0),
            backoff_factor,
        }
    }

    /// Maximum attempts including the initial one
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether an HTTP status should be retried
    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status.as_u16())
    }

    /// Backoff before the next attempt after `failed_attempts` failures (1-based)
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let nominal = self.nominal_backoff(failed_attempts);
        if self.randomness == 0.0 {
            return nominal;
        }

        let jitter = rand::thread_rng().gen_range(-self.randomness..=self.randomness);
        nominal.mul_f64(1.0 + jitter)
    }

    /// Backoff without jitter: `base * factor^(failed_attempts - 1)`
    pub fn nominal_backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let multiplier = self.backoff_factor.saturating_pow(exponent);
        self.base_interval.saturating_mul(multiplier)
    }

    /// Wait before retrying a failed response.
    ///
    /// A 429 with a parseable rate-limit-reset header overrides the computed backoff.
    pub fn wait_for_status(&self, status: StatusCode, headers: &HeaderMap, failed_attempts: u32) -> Duration {
        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(wait) = rate_limit_reset_delay(headers) {
                return wait;
            }
        }
        self.backoff(failed_attempts)
    }
}

/// Parse the rate-limit-reset header as whole seconds until reset.
///
/// Fractional values are truncated; negative or non-numeric values are ignored.
pub fn rate_limit_reset_delay(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RATE_LIMIT_RESET_HEADER)?.to_str().ok()?.trim();

    match raw.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => {
            Some(Duration::from_secs(seconds.trunc() as u64).min(MAX_RATE_LIMIT_WAIT))
        }
        _ => {
            warn!(header = RATE_LIMIT_RESET_HEADER, value = raw, "Ignoring unparseable rate limit header");
            None
        }
    }
}

/// Classification of retried failures for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request or connect timeout
    NetworkTimeout,
    /// Connection refused, DNS or TLS failure
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
    /// Any other transport error
    NetworkGeneric,
}

impl RetryErrorType {
    /// Classify a reqwest transport error
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NetworkTimeout
        } else if err.is_connect() {
            Self::NetworkOffline
        } else {
            Self::NetworkGeneric
        }
    }

    /// Classify a retried HTTP status
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit
        } else {
            Self::ServerError(status.as_u16())
        }
    }

    /// Short description used in retry messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::NetworkGeneric => "network error",
        }
    }
}

/// Whether a transport error is worth another attempt.
///
/// Builder, redirect and decode errors are permanent.
pub fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

/// Format the message logged before sleeping for a retry
pub fn format_retry(attempt: u32, max_attempts: u32, error_type: RetryErrorType, wait: Duration, path: &str) -> String {
    format!(
        "Retrying (attempt {}/{}) after {} - waiting {:.2} seconds... ({})",
        attempt + 1,
        max_attempts,
        error_type.description(),
        wait.as_secs_f64(),
        path
    )
}
