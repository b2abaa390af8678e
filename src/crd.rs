// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for Hetzner Cloud machines.
//!
//! This module defines the infrastructure resources owned by this provider and
//! read-only projections of the Cluster API resources it depends on.
//!
//! # Resource Types
//!
//! ## Owned by this provider
//!
//! - [`HetznerCloudMachine`] - A single Hetzner Cloud server backing a Cluster API `Machine`
//! - [`HetznerCloudCluster`] - Cluster-wide Hetzner settings (location, floating IP)
//!
//! ## Cluster API projections
//!
//! - [`Machine`] - Only the fields needed to find bootstrap data and the owning cluster
//! - [`Cluster`] - Only the infrastructure reference and readiness flag
//!
//! Unknown fields of the Cluster API resources are ignored on deserialization,
//! so these projections keep working across Cluster API releases.
//!
//! # Example: Declaring a machine
//!
//! ```rust,no_run
//! use capi_hetzner::crd::{HetznerCloudMachine, HetznerCloudMachineSpec};
//!
//! let machine = HetznerCloudMachine::new(
//!     "worker-0",
//!     HetznerCloudMachineSpec {
//!         r#type: "cx21".to_string(),
//!         ssh_key: Some("ops@example.com".to_string()),
//!         image: None,
//!         provider_id: None,
//!     },
//! );
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. This controller only reports `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

// ============================================================================
// HetznerCloudMachine
// ============================================================================

/// `HetznerCloudMachine` declares one Hetzner Cloud server.
///
/// The spec is written by whoever creates the machine (usually a Cluster API
/// `MachineDeployment` template). The only field this controller writes into
/// the spec is `providerID`, once the server exists.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha3",
    kind = "HetznerCloudMachine",
    namespaced,
    doc = "HetznerCloudMachine is the Hetzner Cloud server backing a Cluster API Machine."
)]
#[kube(status = "HetznerCloudMachineStatus")]
#[kube(
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"ProviderID","type":"string","jsonPath":".status.providerID"}"#,
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HetznerCloudMachineSpec {
    /// Hetzner server type (e.g., "cx21", "cpx31").
    pub r#type: String,

    /// Name of the Hetzner SSH key installed on the server.
    ///
    /// Falls back to the controller's `--ssh-key-name` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,

    /// Image to boot the server from.
    ///
    /// Falls back to the controller's `--image` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Provider ID of the server (`hcloud://<id>`), set once the server exists.
    #[serde(
        rename = "providerID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_id: Option<String>,
}

/// `HetznerCloudMachine` status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HetznerCloudMachineStatus {
    /// True once the backing server has been provisioned.
    #[serde(default)]
    pub ready: bool,

    /// Provider ID of the server (`hcloud://<id>`).
    #[serde(
        rename = "providerID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_id: Option<String>,

    /// Numeric Hetzner server ID.
    #[serde(
        rename = "hetznerServerID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hetzner_server_id: Option<String>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ============================================================================
// HetznerCloudCluster
// ============================================================================

/// `HetznerCloudCluster` holds the Hetzner settings shared by all machines of a cluster.
///
/// This controller only reads it; the floating IP is allocated elsewhere.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha3",
    kind = "HetznerCloudCluster",
    namespaced,
    doc = "HetznerCloudCluster holds the Hetzner Cloud location and floating IP of a Cluster API cluster."
)]
#[kube(status = "HetznerCloudClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct HetznerCloudClusterSpec {
    /// Hetzner location servers are created in (e.g., "nbg1", "fsn1").
    pub datacenter: String,
}

/// `HetznerCloudCluster` status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HetznerCloudClusterStatus {
    #[serde(default)]
    pub ready: bool,

    /// ID of the floating IP that fronts the control plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating_ip_id: Option<i64>,
}

// ============================================================================
// Cluster API projections
// ============================================================================

/// Projection of the Cluster API `Machine` spec.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Machine",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Name of the cluster this machine belongs to.
    #[serde(default)]
    pub cluster_name: String,

    #[serde(default)]
    pub bootstrap: Bootstrap,
}

/// Bootstrap section of a Cluster API `Machine`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    /// Secret holding the bootstrap payload. Unset until the bootstrap provider ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_secret_name: Option<String>,
}

/// Projection of the Cluster API `Cluster` spec.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Cluster",
    namespaced
)]
#[kube(status = "ClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<InfrastructureRef>,
}

/// Reference from a `Cluster` to its provider-specific infrastructure resource.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Projection of the Cluster API `Cluster` status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub infrastructure_ready: bool,
}
