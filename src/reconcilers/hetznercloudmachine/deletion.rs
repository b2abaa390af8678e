// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Removal of the remote server when a `HetznerCloudMachine` is deleted.

use super::provisioning::{is_owned_by, known_server_id};
use crate::constants::KIND_HETZNER_CLOUD_MACHINE;
use crate::context::Context;
use crate::crd::HetznerCloudMachine;
use crate::labels::FINALIZER_HETZNER_CLOUD_MACHINE;
use crate::metrics;
use crate::provider_errors::MachineError;
use crate::reconcilers::finalizers::{handle_deletion, FinalizerCleanup};
use crate::reconcilers::ReconcileOutcome;
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

#[async_trait]
impl FinalizerCleanup for HetznerCloudMachine {
    async fn cleanup(&self, ctx: &Context) -> Result<(), MachineError> {
        let server_id = match known_server_id(self) {
            Some(id) => Some(id),
            None => {
                // A create may have succeeded without its ID being persisted.
                let uid = self.uid().unwrap_or_default();
                ctx.provider
                    .find_server_by_name(&self.name_any())
                    .await?
                    .filter(|server| is_owned_by(server, &uid))
                    .map(|server| server.id)
            }
        };

        let Some(server_id) = server_id else {
            debug!(
                machine = %self.name_any(),
                "No server recorded or found for machine, nothing to delete"
            );
            return Ok(());
        };

        match ctx.provider.delete_server(server_id).await {
            Ok(()) => {
                metrics::record_server_deleted(KIND_HETZNER_CLOUD_MACHINE);
                info!("Deleted server {} for HetznerCloudMachine {}", server_id, self.name_any());
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!("Server {} already deleted", server_id);
                Ok(())
            }
            Err(source) => Err(MachineError::ServerDeleteFailed { server_id, source }),
        }
    }
}

/// Delete the server behind `machine` and release its finalizer.
///
/// # Errors
///
/// Returns [`MachineError::ServerDeleteFailed`] or any lookup error; the
/// finalizer is kept in that case.
pub async fn reconcile_delete(
    ctx: &Context,
    machine: &HetznerCloudMachine,
) -> Result<ReconcileOutcome, MachineError> {
    handle_deletion(ctx, machine, FINALIZER_HETZNER_CLOUD_MACHINE).await?;
    ctx.error_backoff.reset(&format!(
        "{}/{}",
        machine.namespace().unwrap_or_default(),
        machine.name_any()
    ));
    Ok(ReconcileOutcome::Done)
}
