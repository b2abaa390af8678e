// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership resolution: `HetznerCloudMachine` → `Machine` → `Cluster` → `HetznerCloudCluster`.
//!
//! This is a pure lookup chain with no side effects. Missing links that are
//! expected while a cluster is being assembled (no owner yet, infrastructure
//! not ready, infra cluster not created yet) become [`Resolution::Defer`].
//! Links that should exist but don't are errors.

use crate::constants::{CLUSTER_API_GROUP, KIND_MACHINE};
use crate::context::Context;
use crate::crd::{Cluster, HetznerCloudCluster, HetznerCloudMachine, Machine};
use crate::labels::CLUSTER_NAME_LABEL;
use crate::provider_errors::MachineError;
use crate::status_reasons::{
    REASON_WAITING_FOR_CLUSTER_INFRASTRUCTURE, REASON_WAITING_FOR_HETZNER_CLUSTER,
    REASON_WAITING_FOR_OWNER,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::time::Duration;
use tracing::debug;

/// Resources that can name an owner of a given kind.
pub trait OwnerLookup {
    /// The first owner reference whose API group and kind match.
    fn owner_of_kind(&self, group: &str, kind: &str) -> Option<&OwnerReference>;
}

impl<K: Resource> OwnerLookup for K {
    fn owner_of_kind(&self, group: &str, kind: &str) -> Option<&OwnerReference> {
        self.meta()
            .owner_references
            .as_ref()?
            .iter()
            .find(|r| r.kind == kind && api_group(&r.api_version) == group)
    }
}

/// Resources that declare membership of a Cluster API `Cluster` by label.
pub trait ClusterMember {
    /// Value of the `cluster.x-k8s.io/cluster-name` label, if set and non-empty.
    fn member_of_cluster(&self) -> Option<&str>;
}

impl<K: Resource> ClusterMember for K {
    fn member_of_cluster(&self) -> Option<&str> {
        self.meta()
            .labels
            .as_ref()?
            .get(CLUSTER_NAME_LABEL)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Group part of an `apiVersion` (`cluster.x-k8s.io/v1beta1` → `cluster.x-k8s.io`).
fn api_group(api_version: &str) -> &str {
    api_version.split_once('/').map_or("", |(group, _)| group)
}

/// The resources a machine belongs to, all confirmed to exist.
#[derive(Debug, Clone)]
pub struct OwnershipChain {
    pub machine: Machine,
    pub cluster: Cluster,
    pub infra_cluster: HetznerCloudCluster,
}

/// Result of walking the ownership chain.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Every link exists and the cluster infrastructure is ready.
    Proceed(Box<OwnershipChain>),
    /// A link is not there yet; nothing is wrong, try again later.
    Defer {
        reason: &'static str,
        message: String,
        requeue_after: Duration,
    },
}

/// Walk the ownership chain of `machine`.
///
/// # Errors
///
/// - [`MachineError::OwnerMachineNotFound`] if the owner reference is dangling
/// - [`MachineError::ClusterLabelMissing`] if the owning `Machine` has no cluster label
/// - [`MachineError::ClusterNotFound`] if the labelled `Cluster` does not exist
/// - [`MachineError::InfrastructureRefMissing`] if the `Cluster` has no infrastructure reference
/// - [`MachineError::Accessor`] if any read fails
pub async fn resolve(
    ctx: &Context,
    machine: &HetznerCloudMachine,
) -> Result<Resolution, MachineError> {
    let namespace = machine.namespace().unwrap_or_default();
    let settings = &ctx.settings;

    let Some(owner) = machine.owner_of_kind(CLUSTER_API_GROUP, KIND_MACHINE) else {
        debug!(
            machine = %machine.name_any(),
            namespace = %namespace,
            "No Machine owner reference yet"
        );
        return Ok(Resolution::Defer {
            reason: REASON_WAITING_FOR_OWNER,
            message: "Waiting for the Machine controller to set an owner reference".to_string(),
            requeue_after: settings.defer_requeue,
        });
    };

    let owner_machine = ctx
        .accessor
        .get_owner_machine(&namespace, &owner.name)
        .await?
        .ok_or_else(|| MachineError::OwnerMachineNotFound {
            namespace: namespace.clone(),
            name: owner.name.clone(),
        })?;

    let cluster_name = owner_machine
        .member_of_cluster()
        .ok_or_else(|| MachineError::ClusterLabelMissing {
            namespace: namespace.clone(),
            name: owner_machine.name_any(),
        })?
        .to_string();

    let cluster = ctx
        .accessor
        .get_cluster(&namespace, &cluster_name)
        .await?
        .ok_or_else(|| MachineError::ClusterNotFound {
            namespace: namespace.clone(),
            name: cluster_name.clone(),
        })?;

    let infrastructure_ready = cluster
        .status
        .as_ref()
        .is_some_and(|s| s.infrastructure_ready);
    if !infrastructure_ready {
        debug!(cluster = %cluster_name, "Cluster infrastructure is not ready yet");
        return Ok(Resolution::Defer {
            reason: REASON_WAITING_FOR_CLUSTER_INFRASTRUCTURE,
            message: format!("Waiting for Cluster {cluster_name} infrastructure to become ready"),
            requeue_after: settings.defer_requeue,
        });
    }

    let infra_ref = cluster.spec.infrastructure_ref.as_ref().ok_or_else(|| {
        MachineError::InfrastructureRefMissing {
            namespace: namespace.clone(),
            name: cluster_name.clone(),
        }
    })?;
    let infra_namespace = infra_ref.namespace.clone().unwrap_or_else(|| namespace.clone());

    let Some(infra_cluster) = ctx
        .accessor
        .get_infra_cluster(&infra_namespace, &infra_ref.name)
        .await?
    else {
        debug!(
            infra_cluster = %infra_ref.name,
            namespace = %infra_namespace,
            "HetznerCloudCluster does not exist yet"
        );
        return Ok(Resolution::Defer {
            reason: REASON_WAITING_FOR_HETZNER_CLUSTER,
            message: format!(
                "Waiting for HetznerCloudCluster {infra_namespace}/{} to be created",
                infra_ref.name
            ),
            requeue_after: settings.infra_cluster_requeue,
        });
    };

    Ok(Resolution::Proceed(Box::new(OwnershipChain {
        machine: owner_machine,
        cluster,
        infra_cluster,
    })))
}
