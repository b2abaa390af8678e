// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `HetznerCloudMachine`.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why the
//! `Ready` condition has a particular status.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   ready: false
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: WaitingForBootstrapData
//!       message: "Waiting for the bootstrap provider to set Machine.spec.bootstrap.dataSecretName"
//! ```

/// The only condition type reported by this controller.
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Provisioned
// ============================================================================

/// The server exists and the machine has been marked ready.
pub const REASON_INSTANCE_PROVISIONED: &str = "InstanceProvisioned";

// ============================================================================
// Waiting (transient, requeued without error)
// ============================================================================

/// No `Machine` owner reference has been set yet.
pub const REASON_WAITING_FOR_OWNER: &str = "WaitingForOwner";

/// The `Cluster` reports `infrastructureReady: false`.
pub const REASON_WAITING_FOR_CLUSTER_INFRASTRUCTURE: &str = "WaitingForClusterInfrastructure";

/// The `HetznerCloudCluster` referenced by the `Cluster` does not exist yet.
pub const REASON_WAITING_FOR_HETZNER_CLUSTER: &str = "WaitingForHetznerCloudCluster";

/// The `Machine` has no `bootstrap.dataSecretName` yet, or the secret is not created yet.
pub const REASON_WAITING_FOR_BOOTSTRAP_DATA: &str = "WaitingForBootstrapData";

// ============================================================================
// Failures (surfaced as reconciliation errors)
// ============================================================================

/// The owner reference names a `Machine` that does not exist.
pub const REASON_OWNER_NOT_FOUND: &str = "OwnerNotFound";

/// The owning `Machine` or its `Cluster` is misconfigured (missing label, missing reference).
pub const REASON_CLUSTER_MISCONFIGURED: &str = "ClusterMisconfigured";

/// The bootstrap data secret exists but holds no usable payload.
pub const REASON_BOOTSTRAP_DATA_INVALID: &str = "BootstrapDataInvalid";

/// No SSH key name is configured, or Hetzner does not know the configured key.
pub const REASON_SSH_KEY_UNAVAILABLE: &str = "SSHKeyUnavailable";

/// A server with the machine's name exists but belongs to something else.
pub const REASON_SERVER_NAME_CONFLICT: &str = "ServerNameConflict";

/// Creating the server failed.
pub const REASON_INSTANCE_CREATE_FAILED: &str = "InstanceCreateFailed";

/// Assigning the cluster floating IP to the new server failed.
pub const REASON_FLOATING_IP_ASSIGN_FAILED: &str = "FloatingIPAssignFailed";

/// Writing the provider ID or status back failed (usually a conflict).
pub const REASON_STATUS_UPDATE_FAILED: &str = "StatusUpdateFailed";

/// Deleting the server failed; the finalizer is kept.
pub const REASON_INSTANCE_DELETE_FAILED: &str = "InstanceDeleteFailed";

// ============================================================================
// Hetzner Cloud API Reasons
// ============================================================================

/// The API token was rejected (HTTP 401/403).
pub const REASON_HCLOUD_UNAUTHORIZED: &str = "HcloudUnauthorized";

/// The request was rejected as invalid (HTTP 400/422).
pub const REASON_HCLOUD_INVALID_INPUT: &str = "HcloudInvalidInput";

/// The requested Hetzner resource does not exist (HTTP 404).
pub const REASON_HCLOUD_NOT_FOUND: &str = "HcloudNotFound";

/// The request conflicts with existing state (HTTP 409, e.g. `uniqueness_error`).
pub const REASON_HCLOUD_CONFLICT: &str = "HcloudConflict";

/// The project hit its rate limit (HTTP 429).
pub const REASON_HCLOUD_RATE_LIMITED: &str = "HcloudRateLimited";

/// Hetzner returned a server-side error (HTTP 5xx).
pub const REASON_HCLOUD_UNAVAILABLE: &str = "HcloudUnavailable";

/// The API could not be reached at all (DNS, TLS, timeout).
pub const REASON_HCLOUD_UNREACHABLE: &str = "HcloudUnreachable";
