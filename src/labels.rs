// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants.
//!
//! Cluster API labels identify which `Cluster` a `Machine` belongs to. The
//! Hetzner labels are stamped onto every server this controller creates so a
//! server can be traced back to (and adopted by) the machine that asked for it.

// ============================================================================
// Cluster API Labels
// ============================================================================

/// Label carried by Cluster API resources naming the owning `Cluster`
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";

// ============================================================================
// Hetzner Server Labels
// ============================================================================

/// Server label holding the UID of the `HetznerCloudMachine` that created it
pub const SERVER_MACHINE_UID_LABEL: &str = "capi-hetzner/machine-uid";

/// Server label holding the name of the `Cluster` the server belongs to
pub const SERVER_CLUSTER_LABEL: &str = "capi-hetzner/cluster";

/// Server label marking servers managed by this controller
pub const SERVER_MANAGED_BY_LABEL: &str = "capi-hetzner/managed-by";

/// Value for [`SERVER_MANAGED_BY_LABEL`]
pub const MANAGED_BY_CAPI_HETZNER: &str = "capi-hetzner";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer guarding removal of the remote server behind a `HetznerCloudMachine`
pub const FINALIZER_HETZNER_CLOUD_MACHINE: &str =
    "hetznercloudmachine.infrastructure.cluster.x-k8s.io";
