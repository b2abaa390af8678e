// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `HetznerCloudMachine` controller.
//!
//! The controller receives an `Arc<Context>` built once at startup. It holds
//! the two external collaborators of a reconciliation pass and the settings
//! that fill in what a machine's spec leaves open:
//! - [`ResourceAccessor`] for Kubernetes reads and conditional writes
//! - [`ProviderApi`] for Hetzner Cloud calls
//! - [`ProvisioningSettings`] for defaults and requeue delays
//!
//! The per-key error backoff lives here too, because the controller's error
//! policy only receives the context.

use crate::accessor::ResourceAccessor;
use crate::constants::{
    DEFAULT_SERVER_IMAGE, DEFER_REQUEUE_DURATION_SECS, INFRA_CLUSTER_REQUEUE_DURATION_SECS,
};
use crate::hcloud::ProviderApi;
use crate::reconcilers::retry::ErrorBackoffTracker;
use std::sync::Arc;
use std::time::Duration;

/// Defaults and delays used while provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningSettings {
    /// Image used when `spec.image` is unset
    pub default_image: String,
    /// SSH key name used when `spec.sshKey` is unset
    pub default_ssh_key_name: Option<String>,
    /// Requeue delay while waiting on owner, cluster infrastructure or bootstrap data
    pub defer_requeue: Duration,
    /// Requeue delay while the `HetznerCloudCluster` does not exist yet
    pub infra_cluster_requeue: Duration,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            default_image: DEFAULT_SERVER_IMAGE.to_string(),
            default_ssh_key_name: None,
            defer_requeue: Duration::from_secs(DEFER_REQUEUE_DURATION_SECS),
            infra_cluster_requeue: Duration::from_secs(INFRA_CLUSTER_REQUEUE_DURATION_SECS),
        }
    }
}

/// Shared context passed to every reconciliation.
pub struct Context {
    /// Kubernetes reads and conditional writes
    pub accessor: Arc<dyn ResourceAccessor>,

    /// Hetzner Cloud API
    pub provider: Arc<dyn ProviderApi>,

    /// Provisioning defaults
    pub settings: ProvisioningSettings,

    /// Per-key backoff for failed passes
    pub error_backoff: ErrorBackoffTracker,
}

impl Context {
    #[must_use]
    pub fn new(
        accessor: Arc<dyn ResourceAccessor>,
        provider: Arc<dyn ProviderApi>,
        settings: ProvisioningSettings,
    ) -> Self {
        Self {
            accessor,
            provider,
            settings,
            error_backoff: ErrorBackoffTracker::new(),
        }
    }
}
