// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for `HetznerCloudMachine` resources.
//!
//! The finalizer is added before the first billable side effect and removed
//! only after the remote server is gone, so deleting a machine can never
//! leak a server. All writes go through the [`ResourceAccessor`] and carry
//! the observed `resourceVersion`.
//!
//! # Example
//!
//! ```rust,ignore
//! use capi_hetzner::reconcilers::finalizers::{ensure_finalizer, handle_deletion};
//! use capi_hetzner::labels::FINALIZER_HETZNER_CLOUD_MACHINE;
//!
//! async fn reconcile(ctx: &Context, machine: HetznerCloudMachine) -> Result<(), MachineError> {
//!     if machine.metadata.deletion_timestamp.is_some() {
//!         return handle_deletion(ctx, &machine, FINALIZER_HETZNER_CLOUD_MACHINE).await;
//!     }
//!     let machine = ensure_finalizer(ctx.accessor.as_ref(), &machine, FINALIZER_HETZNER_CLOUD_MACHINE).await?;
//!     // Create the server...
//!     Ok(())
//! }
//! ```

use crate::accessor::ResourceAccessor;
use crate::context::Context;
use crate::crd::HetznerCloudMachine;
use crate::provider_errors::{AccessorError, MachineError};
use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tracing::info;

/// Cleanup that must finish before a resource's finalizer is removed.
#[async_trait]
pub trait FinalizerCleanup {
    /// Release whatever the resource holds outside the cluster.
    ///
    /// # Errors
    ///
    /// Any error keeps the finalizer in place; deletion is retried on the
    /// next pass.
    async fn cleanup(&self, ctx: &Context) -> Result<(), MachineError>;
}

/// True if `finalizer` is present on `resource`.
#[must_use]
pub fn has_finalizer<K: Resource>(resource: &K, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Add a finalizer if not already present.
///
/// Returns the machine as it is after the call: the patched object when a
/// write happened, otherwise a copy of the input.
///
/// # Errors
///
/// Returns [`AccessorError::Conflict`] if the machine changed since it was read.
pub async fn ensure_finalizer(
    accessor: &dyn ResourceAccessor,
    machine: &HetznerCloudMachine,
    finalizer: &str,
) -> Result<HetznerCloudMachine, AccessorError> {
    if has_finalizer(machine, finalizer) {
        return Ok(machine.clone());
    }

    info!(
        "Adding finalizer {} to HetznerCloudMachine {}/{}",
        finalizer,
        machine.namespace().unwrap_or_default(),
        machine.name_any()
    );

    let mut finalizers = machine.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    accessor.patch_finalizers(machine, &finalizers).await
}

/// Remove a finalizer if present.
///
/// # Errors
///
/// Returns [`AccessorError::Conflict`] if the machine changed since it was read.
pub async fn remove_finalizer(
    accessor: &dyn ResourceAccessor,
    machine: &HetznerCloudMachine,
    finalizer: &str,
) -> Result<(), AccessorError> {
    if !has_finalizer(machine, finalizer) {
        return Ok(());
    }

    info!(
        "Removing finalizer {} from HetznerCloudMachine {}/{}",
        finalizer,
        machine.namespace().unwrap_or_default(),
        machine.name_any()
    );

    let finalizers: Vec<String> = machine
        .finalizers()
        .iter()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect();
    accessor.patch_finalizers(machine, &finalizers).await?;
    Ok(())
}

/// Run cleanup and then release the finalizer.
///
/// Does nothing if the finalizer is already gone. On cleanup failure the
/// finalizer stays and the error is returned.
///
/// # Errors
///
/// Returns the cleanup error, or [`MachineError::Accessor`] if removing the
/// finalizer fails.
pub async fn handle_deletion(
    ctx: &Context,
    machine: &HetznerCloudMachine,
    finalizer: &str,
) -> Result<(), MachineError> {
    let namespace = machine.namespace().unwrap_or_default();
    let name = machine.name_any();

    if !has_finalizer(machine, finalizer) {
        info!("HetznerCloudMachine {}/{} has no finalizer, nothing to clean up", namespace, name);
        return Ok(());
    }

    info!("HetznerCloudMachine {}/{} is being deleted, running cleanup", namespace, name);
    machine.cleanup(ctx).await?;

    remove_finalizer(ctx.accessor.as_ref(), machine, finalizer).await?;
    info!("Finalizer released for HetznerCloudMachine {}/{}", namespace, name);
    Ok(())
}
