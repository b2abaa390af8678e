// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Hetzner Cloud machine controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the infrastructure CRDs owned by this provider
pub const INFRASTRUCTURE_API_GROUP: &str = "infrastructure.cluster.x-k8s.io";

/// API version for the infrastructure CRDs owned by this provider
pub const INFRASTRUCTURE_API_VERSION: &str = "v1alpha3";

/// API group of the Cluster API core resources (`Machine`, `Cluster`)
pub const CLUSTER_API_GROUP: &str = "cluster.x-k8s.io";

/// Kind name for `HetznerCloudMachine` resource
pub const KIND_HETZNER_CLOUD_MACHINE: &str = "HetznerCloudMachine";

/// Kind name for `HetznerCloudCluster` resource
pub const KIND_HETZNER_CLOUD_CLUSTER: &str = "HetznerCloudCluster";

/// Kind name of the Cluster API `Machine` resource
pub const KIND_MACHINE: &str = "Machine";

/// Kind name of the Cluster API `Cluster` resource
pub const KIND_CLUSTER: &str = "Cluster";

// ============================================================================
// Hetzner Cloud Constants
// ============================================================================

/// Default Hetzner Cloud API endpoint
pub const DEFAULT_HCLOUD_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Environment variable holding the Hetzner Cloud API token
pub const HCLOUD_TOKEN_ENV: &str = "HC_ACCESS_TOKEN";

/// Image used for new servers when neither the machine nor the flags name one
pub const DEFAULT_SERVER_IMAGE: &str = "ubuntu-18.04";

/// Scheme prefix of provider IDs written to `HetznerCloudMachine` resources
pub const PROVIDER_ID_PREFIX: &str = "hcloud://";

/// Timeout applied to every Hetzner Cloud API request
pub const HCLOUD_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Bootstrap Constants
// ============================================================================

/// Key inside the bootstrap data secret that holds the cloud-init payload
pub const BOOTSTRAP_DATA_SECRET_KEY: &str = "value";

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Requeue delay while waiting on owner, cluster infrastructure or bootstrap data
pub const DEFER_REQUEUE_DURATION_SECS: u64 = 10;

/// Requeue delay while the referenced `HetznerCloudCluster` does not exist yet
pub const INFRA_CLUSTER_REQUEUE_DURATION_SECS: u64 = 5;

/// Initial delay of the per-resource error backoff (1 second)
pub const ERROR_BACKOFF_INITIAL_SECS: u64 = 1;

/// Maximum delay of the per-resource error backoff (5 minutes)
pub const ERROR_BACKOFF_MAX_SECS: u64 = 300;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
