// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client configuration.
//!
//! All knobs are passed in at construction; nothing is read from files or
//! the environment.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use windmill_fan::config::{ClientConfig, RetryPolicy};
//!
//! // Defaults: vendor API host, 60 s updates, 3 attempts per call
//! let config = ClientConfig::default();
//! assert_eq!(config.update_interval(), Duration::from_secs(60));
//!
//! let config = ClientConfig::new()
//!     .with_base_url("http://127.0.0.1:8080")
//!     .with_update_interval(Duration::from_secs(30))
//!     .with_max_retries(5);
//! assert_eq!(config.retry().max_retries, 5);
//! ```

use std::time::Duration;

use rand::Rng;

/// Configuration for a device client and its coordinator.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    update_interval: Duration,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ClientConfig {
    /// Vendor API host.
    pub const DEFAULT_BASE_URL: &'static str = "https://dashboard.windmillair.com";
    /// Default poll interval.
    pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
    /// Shortest accepted poll interval.
    pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(1);
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL. A trailing slash is ignored.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the poll interval, raised to [`MIN_UPDATE_INTERVAL`](Self::MIN_UPDATE_INTERVAL)
    /// if shorter.
    #[must_use]
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval.max(Self::MIN_UPDATE_INTERVAL);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of attempts per device call.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry = self.retry.with_max_retries(max_retries);
        self
    }

    /// Replaces the whole retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            update_interval: Self::DEFAULT_UPDATE_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Retry policy for transient device failures.
///
/// `max_retries` counts every attempt, the first one included, so the
/// default of 3 means one call plus up to two retries.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use windmill_fan::config::RetryPolicy;
///
/// let policy = RetryPolicy::new()
///     .with_initial_delay(Duration::from_millis(100))
///     .with_jitter(0.0);
///
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
/// assert!(policy.should_retry(1));
/// assert!(!policy.should_retry(3));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per call (at least 1).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the exponential delay.
    pub max_delay: Duration,
    /// Multiplier applied per retry.
    pub backoff_multiplier: f32,
    /// Random extra delay as a fraction of the computed delay (0.0-1.0).
    pub jitter: f32,
}

impl RetryPolicy {
    /// Creates a retry policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that makes a single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts. Zero is treated as one.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between attempts.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the jitter fraction, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Returns the backoff delay before retry `retry` (0-based), without jitter.
    ///
    /// Grows as `initial_delay * backoff_multiplier^retry`, capped at
    /// `max_delay`. A non-finite or negative result yields `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let scale = f64::from(self.backoff_multiplier).powi(exponent);

        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * scale)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Returns the backoff delay with random jitter added.
    ///
    /// A jitter outside `0.0..=1.0` is clamped; NaN disables jitter.
    #[must_use]
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let delay = self.delay_for_attempt(retry);
        let jitter = if self.jitter.is_nan() {
            0.0
        } else {
            self.jitter.clamp(0.0, 1.0)
        };
        if jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        delay + delay.mul_f32(rand::rng().random_range(0.0..=jitter))
    }

    /// Returns `true` if another attempt is allowed after `attempts` attempts.
    #[must_use]
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: 0.25,
        }
    }
}
