// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Exponential backoff for failed reconciliations.
//!
//! A reconciliation pass never retries internally. When a pass fails, the
//! controller's error policy asks [`ErrorBackoffTracker`] how long to wait
//! before running the same key again. Delays grow per key and reset after the
//! next successful pass.

use crate::constants::{ERROR_BACKOFF_INITIAL_SECS, ERROR_BACKOFF_MAX_SECS};
use rand::Rng;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Initial interval duration
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with specified parameters.
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            multiplier,
            randomization_factor,
        }
    }

    /// Get the next backoff interval and advance the schedule.
    pub fn next_backoff(&mut self) -> Duration {
        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        jittered
    }

    /// Apply randomization (jitter) to an interval.
    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let min = secs - delta;
        let max = secs + delta;

        let jittered = rand::rng().random_range(min..=max);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff schedule for failed reconciliations.
///
/// # Configuration
///
/// - **Initial interval**: 1 second
/// - **Max interval**: 5 minutes
/// - **Multiplier**: 2.0
/// - **Randomization**: ±10%
///
/// Delays run roughly 1s, 2s, 4s, 8s ... 256s, then stay at 300s.
#[must_use]
pub fn error_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_secs(ERROR_BACKOFF_INITIAL_SECS),
        Duration::from_secs(ERROR_BACKOFF_MAX_SECS),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Determine if an HTTP status code is retryable.
///
/// # Retryable Status Codes
///
/// - **429** (Too Many Requests) - Rate limiting
/// - **500** (Internal Server Error) - Server error
/// - **502** (Bad Gateway) - Proxy/gateway error
/// - **503** (Service Unavailable) - Temporary unavailability
/// - **504** (Gateway Timeout) - Gateway timeout
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Per-key error backoff shared by the controller's error policy.
///
/// Keys are `namespace/name` strings. The map only holds keys that are
/// currently failing.
#[derive(Debug, Default)]
pub struct ErrorBackoffTracker {
    schedules: Mutex<HashMap<String, ExponentialBackoff>>,
}

impl ErrorBackoffTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `key` and return how long to wait before retrying.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut schedules = self
            .schedules
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let delay = schedules
            .entry(key.to_string())
            .or_insert_with(error_backoff)
            .next_backoff();
        debug!(key = key, delay = ?delay, "Computed error backoff");
        delay
    }

    /// Forget the failure history of `key` after a successful pass.
    pub fn reset(&self, key: &str) {
        let mut schedules = self
            .schedules
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if schedules.remove(key).is_some() {
            debug!(key = key, "Reset error backoff");
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
