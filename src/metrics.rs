// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Hetzner Cloud machine controller.
//!
//! All metrics carry the namespace prefix `capi_hetzner_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Passes, their outcomes and durations, requeues
//! - **Server Lifecycle Metrics** - Servers created, adopted and deleted
//! - **Provider API Metrics** - Hetzner Cloud calls by operation and outcome
//! - **Error Metrics** - Failed passes by error category
//!
//! # Example
//!
//! ```rust,no_run
//! use capi_hetzner::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("HetznerCloudMachine", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "capi_hetzner";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric is registered once");
    counter
}

fn register_histogram(name: &str, help: &str, labels: &[&str], buckets: Vec<f64>) -> HistogramVec {
    let opts = HistogramOpts::new(format!("{METRICS_NAMESPACE}_{name}"), help).buckets(buckets);
    let histogram = HistogramVec::new(opts, labels).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric is registered once");
    histogram
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`HetznerCloudMachine`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram(
        "reconciliation_duration_seconds",
        "Duration of reconciliations in seconds by resource type",
        &["resource_type"],
        vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0],
    )
});

/// Total number of requeues
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Why the pass was deferred (a `Waiting*` condition reason)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ============================================================================
// Server Lifecycle Metrics
// ============================================================================

/// Servers created through the Hetzner Cloud API
pub static SERVERS_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "servers_created_total",
        "Total number of Hetzner Cloud servers created by server type",
        &["server_type"],
    )
});

/// Existing servers adopted instead of created
pub static SERVERS_ADOPTED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "servers_adopted_total",
        "Total number of existing Hetzner Cloud servers adopted by a machine",
        &["resource_type"],
    )
});

/// Servers deleted through the Hetzner Cloud API
pub static SERVERS_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "servers_deleted_total",
        "Total number of Hetzner Cloud servers deleted",
        &["resource_type"],
    )
});

// ============================================================================
// Provider API Metrics
// ============================================================================

/// Hetzner Cloud API calls
///
/// Labels:
/// - `operation`: `get_ssh_key`, `find_server`, `create_server`, `assign_floating_ip`, `delete_server`
/// - `outcome`: `success` or the HTTP status / `transport` on failure
pub static PROVIDER_API_CALLS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "provider_api_calls_total",
        "Total number of Hetzner Cloud API calls by operation and outcome",
        &["operation", "outcome"],
    )
});

/// Latency of Hetzner Cloud API calls
pub static PROVIDER_API_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram(
        "provider_api_duration_seconds",
        "Duration of Hetzner Cloud API calls in seconds by operation",
        &["operation"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
    )
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: `configuration`, `bootstrap`, `provider`, `conflict`, `kubernetes`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "errors_total",
        "Total number of errors by resource type and error category",
        &["resource_type", "error_type"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a deferred reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `reason` - Condition reason the pass was waiting on
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record a server created for a machine
pub fn record_server_created(server_type: &str) {
    SERVERS_CREATED_TOTAL
        .with_label_values(&[server_type])
        .inc();
}

/// Record an existing server adopted by a machine
pub fn record_server_adopted(resource_type: &str) {
    SERVERS_ADOPTED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a server deleted for a machine
pub fn record_server_deleted(resource_type: &str) {
    SERVERS_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record one Hetzner Cloud API call
///
/// # Arguments
/// * `operation` - Client operation name
/// * `outcome` - `success`, an HTTP status code, or `transport`
/// * `duration` - Wall time of the call
pub fn record_provider_call(operation: &str, outcome: &str, duration: Duration) {
    PROVIDER_API_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    PROVIDER_API_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource where error occurred
/// * `error_type` - Error category (see [`crate::provider_errors::MachineError::category`])
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
