// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for Hetzner Cloud machine reconciliation.
//!
//! This module provides specialized error types for:
//! - Hetzner Cloud REST API calls ([`HcloudError`])
//! - Kubernetes reads and optimistic-concurrency writes ([`AccessorError`])
//! - Reading the bootstrap payload secret ([`BootstrapError`])
//! - A full reconciliation pass ([`MachineError`])
//!
//! [`MachineError`] is what the reconciler returns to the controller runtime.
//! Its [`MachineError::reason`] feeds the `Ready` condition and its
//! [`MachineError::category`] labels the error metric.

use crate::http_errors::{map_connection_error, map_hcloud_status_to_reason};
use crate::reconcilers::retry::is_retryable_http_status;
use crate::status_reasons::{
    REASON_BOOTSTRAP_DATA_INVALID, REASON_CLUSTER_MISCONFIGURED, REASON_FLOATING_IP_ASSIGN_FAILED,
    REASON_HCLOUD_UNREACHABLE, REASON_INSTANCE_CREATE_FAILED, REASON_INSTANCE_DELETE_FAILED,
    REASON_OWNER_NOT_FOUND, REASON_SERVER_NAME_CONFLICT, REASON_SSH_KEY_UNAVAILABLE,
    REASON_STATUS_UPDATE_FAILED,
};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the Hetzner Cloud API client.
#[derive(Error, Debug, Clone)]
pub enum HcloudError {
    /// Hetzner answered with a non-success status and an error body.
    ///
    /// `code` is Hetzner's machine-readable error code (e.g. `uniqueness_error`,
    /// `not_found`, `rate_limit_exceeded`).
    #[error("Hetzner Cloud API error (HTTP {status}, {code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Hetzner error code from the response body
        code: String,
        /// Human-readable message from the response body
        message: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, connect, timeout).
    #[error("Hetzner Cloud request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Unexpected Hetzner Cloud response: {0}")]
    Decode(String),
}

impl HcloudError {
    /// HTTP status code, if a response was received.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// True when Hetzner reported the resource as missing (HTTP 404).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => {
                StatusCode::from_u16(*status).is_ok_and(is_retryable_http_status)
            }
            Self::Decode(_) => false,
        }
    }

    /// Condition reason and message for this error.
    #[must_use]
    pub fn status_reason(&self) -> (&'static str, String) {
        match self {
            Self::Api { status, .. } => map_hcloud_status_to_reason(*status),
            Self::Transport(_) => map_connection_error(),
            Self::Decode(msg) => (
                REASON_HCLOUD_UNREACHABLE,
                format!("Unexpected Hetzner Cloud response: {msg}"),
            ),
        }
    }
}

impl From<reqwest::Error> for HcloudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors from reading or writing Kubernetes resources.
#[derive(Error, Debug)]
pub enum AccessorError {
    /// The resource changed since it was read; the write was rejected (HTTP 409).
    ///
    /// The pass must be abandoned. The watch will deliver the newer version.
    #[error("{kind} {namespace}/{name} was modified concurrently, write rejected")]
    Conflict {
        /// Kind of the resource that was being written
        kind: String,
        /// Namespace of the resource
        namespace: String,
        /// Name of the resource
        name: String,
    },

    /// Any other Kubernetes API failure.
    #[error("Kubernetes API call failed: {0}")]
    Api(#[from] kube::Error),
}

/// Errors from fetching the bootstrap payload.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The referenced secret does not exist yet.
    ///
    /// This is an expected transient state: the bootstrap provider has set
    /// `dataSecretName` but has not written the secret.
    #[error("Bootstrap data secret {namespace}/{name} not found")]
    NotFound {
        /// Namespace of the secret
        namespace: String,
        /// Name of the secret
        name: String,
    },

    /// The secret exists but its payload is unusable.
    #[error("Bootstrap data secret {namespace}/{name} is malformed: {reason}")]
    Malformed {
        /// Namespace of the secret
        namespace: String,
        /// Name of the secret
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Reading the secret failed.
    #[error(transparent)]
    Accessor(#[from] AccessorError),
}

/// Errors that fail a `HetznerCloudMachine` reconciliation pass.
#[derive(Error, Debug)]
pub enum MachineError {
    /// The owner reference names a `Machine` that does not exist.
    #[error("Owner Machine {namespace}/{name} not found")]
    OwnerMachineNotFound {
        /// Namespace of the missing Machine
        namespace: String,
        /// Name of the missing Machine
        name: String,
    },

    /// The owning `Machine` carries no cluster label.
    #[error("Machine {namespace}/{name} is missing the 'cluster.x-k8s.io/cluster-name' label")]
    ClusterLabelMissing {
        /// Namespace of the Machine
        namespace: String,
        /// Name of the Machine
        name: String,
    },

    /// The `Cluster` named by the Machine's label does not exist.
    #[error("Cluster {namespace}/{name} not found")]
    ClusterNotFound {
        /// Namespace of the missing Cluster
        namespace: String,
        /// Name of the missing Cluster
        name: String,
    },

    /// The `Cluster` has no `spec.infrastructureRef`.
    #[error("Cluster {namespace}/{name} has no infrastructureRef")]
    InfrastructureRefMissing {
        /// Namespace of the Cluster
        namespace: String,
        /// Name of the Cluster
        name: String,
    },

    /// The bootstrap secret exists but holds no usable payload.
    #[error("Bootstrap data secret {namespace}/{name} is malformed: {reason}")]
    BootstrapDataMalformed {
        /// Namespace of the secret
        namespace: String,
        /// Name of the secret
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Neither the machine nor the controller flags name an SSH key.
    #[error("No SSH key configured for HetznerCloudMachine {namespace}/{name}")]
    SshKeyNotConfigured {
        /// Namespace of the machine
        namespace: String,
        /// Name of the machine
        name: String,
    },

    /// Hetzner does not know an SSH key with the configured name.
    #[error("SSH key '{key}' not found in the Hetzner Cloud project")]
    SshKeyNotFound {
        /// Configured key name
        key: String,
    },

    /// Looking up the SSH key failed.
    #[error("Failed to look up SSH key '{key}': {source}")]
    SshKeyLookupFailed {
        /// Configured key name
        key: String,
        /// Underlying API error
        #[source]
        source: HcloudError,
    },

    /// A server with the machine's name exists but was not created for this machine.
    #[error("Server '{server_name}' (id {server_id}) already exists and does not belong to this machine")]
    ServerNameConflict {
        /// Server name
        server_name: String,
        /// Hetzner ID of the conflicting server
        server_id: i64,
    },

    /// Creating the server failed.
    #[error("Failed to create server '{server_name}': {source}")]
    ServerCreateFailed {
        /// Requested server name
        server_name: String,
        /// Underlying API error
        #[source]
        source: HcloudError,
    },

    /// Assigning the cluster floating IP to the server failed.
    #[error("Failed to assign floating IP {floating_ip_id} to server {server_id}: {source}")]
    FloatingIpAssignFailed {
        /// Floating IP ID from the `HetznerCloudCluster`
        floating_ip_id: i64,
        /// Target server ID
        server_id: i64,
        /// Underlying API error
        #[source]
        source: HcloudError,
    },

    /// Deleting the server failed.
    #[error("Failed to delete server {server_id}: {source}")]
    ServerDeleteFailed {
        /// Hetzner server ID
        server_id: i64,
        /// Underlying API error
        #[source]
        source: HcloudError,
    },

    /// Any other Hetzner Cloud API failure (e.g. listing servers).
    #[error(transparent)]
    Provider(#[from] HcloudError),

    /// Kubernetes read or write failure.
    #[error(transparent)]
    Accessor(#[from] AccessorError),
}

impl MachineError {
    /// Status condition reason for this error.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::OwnerMachineNotFound { .. } => REASON_OWNER_NOT_FOUND,
            Self::ClusterLabelMissing { .. }
            | Self::ClusterNotFound { .. }
            | Self::InfrastructureRefMissing { .. } => REASON_CLUSTER_MISCONFIGURED,
            Self::BootstrapDataMalformed { .. } => REASON_BOOTSTRAP_DATA_INVALID,
            Self::SshKeyNotConfigured { .. }
            | Self::SshKeyNotFound { .. }
            | Self::SshKeyLookupFailed { .. } => REASON_SSH_KEY_UNAVAILABLE,
            Self::ServerNameConflict { .. } => REASON_SERVER_NAME_CONFLICT,
            Self::ServerCreateFailed { .. } => REASON_INSTANCE_CREATE_FAILED,
            Self::FloatingIpAssignFailed { .. } => REASON_FLOATING_IP_ASSIGN_FAILED,
            Self::ServerDeleteFailed { .. } => REASON_INSTANCE_DELETE_FAILED,
            Self::Provider(err) => err.status_reason().0,
            Self::Accessor(_) => REASON_STATUS_UPDATE_FAILED,
        }
    }

    /// Coarse error category used as a metric label.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::OwnerMachineNotFound { .. }
            | Self::ClusterLabelMissing { .. }
            | Self::ClusterNotFound { .. }
            | Self::InfrastructureRefMissing { .. }
            | Self::SshKeyNotConfigured { .. }
            | Self::ServerNameConflict { .. } => "configuration",
            Self::BootstrapDataMalformed { .. } => "bootstrap",
            Self::SshKeyNotFound { .. }
            | Self::SshKeyLookupFailed { .. }
            | Self::ServerCreateFailed { .. }
            | Self::FloatingIpAssignFailed { .. }
            | Self::ServerDeleteFailed { .. }
            | Self::Provider(_) => "provider",
            Self::Accessor(AccessorError::Conflict { .. }) => "conflict",
            Self::Accessor(AccessorError::Api(_)) => "kubernetes",
        }
    }

    /// Returns true if the failure is expected to clear on its own.
    ///
    /// Configuration errors need a human; conflicts and transient provider
    /// failures do not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SshKeyLookupFailed { source, .. }
            | Self::ServerCreateFailed { source, .. }
            | Self::FloatingIpAssignFailed { source, .. }
            | Self::ServerDeleteFailed { source, .. }
            | Self::Provider(source) => source.is_transient(),
            Self::Accessor(_) => true,
            _ => false,
        }
    }
}
