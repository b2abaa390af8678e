// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hetzner Cloud HTTP error mapping to Kubernetes status condition reasons.
//!
//! # Usage
//!
//! ```rust
//! use capi_hetzner::http_errors::map_hcloud_status_to_reason;
//!
//! let (reason, message) = map_hcloud_status_to_reason(429);
//! assert_eq!(reason, "HcloudRateLimited");
//! assert!(message.contains("429"));
//! ```

use crate::status_reasons::{
    REASON_HCLOUD_CONFLICT, REASON_HCLOUD_INVALID_INPUT, REASON_HCLOUD_NOT_FOUND,
    REASON_HCLOUD_RATE_LIMITED, REASON_HCLOUD_UNAUTHORIZED, REASON_HCLOUD_UNAVAILABLE,
    REASON_HCLOUD_UNREACHABLE,
};

/// Map a Hetzner Cloud HTTP status code to a condition reason and message.
///
/// # HTTP Code Mapping
///
/// | HTTP Code | Reason | Meaning |
/// |-----------|--------|---------|
/// | 400, 422 | `HcloudInvalidInput` | Request rejected as invalid |
/// | 401, 403 | `HcloudUnauthorized` | Token missing, wrong or lacking permission |
/// | 404 | `HcloudNotFound` | Resource does not exist |
/// | 409 | `HcloudConflict` | Uniqueness or locking conflict |
/// | 429 | `HcloudRateLimited` | Rate limit exceeded |
/// | 5xx | `HcloudUnavailable` | Hetzner side failure |
/// | Other | `HcloudUnreachable` | Unexpected response |
#[must_use]
pub fn map_hcloud_status_to_reason(status_code: u16) -> (&'static str, String) {
    match status_code {
        400 | 422 => (
            REASON_HCLOUD_INVALID_INPUT,
            format!("Hetzner Cloud rejected the request as invalid ({status_code})"),
        ),
        401 => (
            REASON_HCLOUD_UNAUTHORIZED,
            "Hetzner Cloud token is missing or invalid (401)".into(),
        ),
        403 => (
            REASON_HCLOUD_UNAUTHORIZED,
            "Hetzner Cloud token lacks permission (403)".into(),
        ),
        404 => (
            REASON_HCLOUD_NOT_FOUND,
            "Hetzner Cloud resource not found (404)".into(),
        ),
        409 => (
            REASON_HCLOUD_CONFLICT,
            "Hetzner Cloud reported a conflict (409)".into(),
        ),
        429 => (
            REASON_HCLOUD_RATE_LIMITED,
            "Hetzner Cloud rate limit exceeded (429)".into(),
        ),
        500..=599 => (
            REASON_HCLOUD_UNAVAILABLE,
            format!("Hetzner Cloud service error ({status_code})"),
        ),
        _ => (
            REASON_HCLOUD_UNREACHABLE,
            format!("Unexpected HTTP response from Hetzner Cloud ({status_code})"),
        ),
    }
}

/// Map a transport failure (no HTTP status received) to a condition reason and message.
#[must_use]
pub fn map_connection_error() -> (&'static str, String) {
    (
        REASON_HCLOUD_UNREACHABLE,
        "Cannot connect to the Hetzner Cloud API".into(),
    )
}
