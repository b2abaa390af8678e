// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed access to the Kubernetes resources the reconciler reads and writes.
//!
//! Reads return `Ok(None)` when the object does not exist. Writes are JSON
//! merge patches that carry the `resourceVersion` the caller observed, so the
//! API server rejects them with `409 Conflict` if anyone changed the object in
//! between. That rejection surfaces as [`AccessorError::Conflict`].

use crate::constants::KIND_HETZNER_CLOUD_MACHINE;
use crate::crd::{
    Cluster, HetznerCloudCluster, HetznerCloudMachine, HetznerCloudMachineStatus, Machine,
};
use crate::provider_errors::AccessorError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// Reads and optimistic-concurrency writes used by one reconciliation pass.
#[async_trait]
pub trait ResourceAccessor: Send + Sync {
    /// Fetch a `HetznerCloudMachine`.
    async fn get_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HetznerCloudMachine>, AccessorError>;

    /// Fetch the Cluster API `Machine` that owns a `HetznerCloudMachine`.
    async fn get_owner_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Machine>, AccessorError>;

    /// Fetch a Cluster API `Cluster`.
    async fn get_cluster(&self, namespace: &str, name: &str)
        -> Result<Option<Cluster>, AccessorError>;

    /// Fetch a `HetznerCloudCluster`.
    async fn get_infra_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HetznerCloudCluster>, AccessorError>;

    /// Fetch a `Secret`.
    async fn get_secret(&self, namespace: &str, name: &str)
        -> Result<Option<Secret>, AccessorError>;

    /// Set `spec.providerID`, conditional on the machine's `resourceVersion`.
    async fn patch_provider_id(
        &self,
        machine: &HetznerCloudMachine,
        provider_id: &str,
    ) -> Result<HetznerCloudMachine, AccessorError>;

    /// Replace the status subresource, conditional on the machine's `resourceVersion`.
    async fn patch_status(
        &self,
        machine: &HetznerCloudMachine,
        status: &HetznerCloudMachineStatus,
    ) -> Result<HetznerCloudMachine, AccessorError>;

    /// Replace `metadata.finalizers`, conditional on the machine's `resourceVersion`.
    async fn patch_finalizers(
        &self,
        machine: &HetznerCloudMachine,
        finalizers: &[String],
    ) -> Result<HetznerCloudMachine, AccessorError>;
}

/// [`ResourceAccessor`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeResourceAccessor {
    client: Client,
}

impl KubeResourceAccessor {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_opt<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, AccessorError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    fn machines(&self, machine: &HetznerCloudMachine) -> Api<HetznerCloudMachine> {
        Api::namespaced(
            self.client.clone(),
            &machine.namespace().unwrap_or_default(),
        )
    }
}

/// Merge-patch body with the `resourceVersion` precondition folded into `metadata`.
///
/// Objects read from the API server always carry a `resourceVersion`; the
/// precondition is only skipped for objects that never came from it.
#[must_use]
pub fn conditional_patch(machine: &HetznerCloudMachine, mut body: Value) -> Value {
    if let Some(rv) = machine.resource_version() {
        if let Some(obj) = body.as_object_mut() {
            let metadata = obj.entry("metadata").or_insert_with(|| json!({}));
            if let Some(meta) = metadata.as_object_mut() {
                meta.insert("resourceVersion".to_string(), Value::String(rv));
            }
        }
    }
    body
}

/// Map a patch failure, turning `409 Conflict` into [`AccessorError::Conflict`].
fn map_patch_error(err: kube::Error, machine: &HetznerCloudMachine) -> AccessorError {
    match err {
        kube::Error::Api(ref status) if status.code == 409 => AccessorError::Conflict {
            kind: KIND_HETZNER_CLOUD_MACHINE.to_string(),
            namespace: machine.namespace().unwrap_or_default(),
            name: machine.name_any(),
        },
        other => AccessorError::Api(other),
    }
}

#[async_trait]
impl ResourceAccessor for KubeResourceAccessor {
    async fn get_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HetznerCloudMachine>, AccessorError> {
        self.get_opt(namespace, name).await
    }

    async fn get_owner_machine(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Machine>, AccessorError> {
        self.get_opt(namespace, name).await
    }

    async fn get_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Cluster>, AccessorError> {
        self.get_opt(namespace, name).await
    }

    async fn get_infra_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HetznerCloudCluster>, AccessorError> {
        self.get_opt(namespace, name).await
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, AccessorError> {
        self.get_opt(namespace, name).await
    }

    async fn patch_provider_id(
        &self,
        machine: &HetznerCloudMachine,
        provider_id: &str,
    ) -> Result<HetznerCloudMachine, AccessorError> {
        let name = machine.name_any();
        let patch = conditional_patch(machine, json!({ "spec": { "providerID": provider_id } }));
        debug!(name = %name, provider_id = provider_id, "Patching HetznerCloudMachine spec.providerID");

        self.machines(machine)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_patch_error(e, machine))
    }

    async fn patch_status(
        &self,
        machine: &HetznerCloudMachine,
        status: &HetznerCloudMachineStatus,
    ) -> Result<HetznerCloudMachine, AccessorError> {
        let name = machine.name_any();
        let patch = conditional_patch(machine, json!({ "status": status }));
        debug!(name = %name, ready = status.ready, "Patching HetznerCloudMachine status");

        self.machines(machine)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_patch_error(e, machine))
    }

    async fn patch_finalizers(
        &self,
        machine: &HetznerCloudMachine,
        finalizers: &[String],
    ) -> Result<HetznerCloudMachine, AccessorError> {
        let name = machine.name_any();
        let patch = conditional_patch(machine, json!({ "metadata": { "finalizers": finalizers } }));
        debug!(name = %name, finalizers = ?finalizers, "Patching HetznerCloudMachine finalizers");

        self.machines(machine)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_patch_error(e, machine))
    }
}
