// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `HetznerCloudMachine` reconciliation.
//!
//! One pass runs these steps in order, stopping at the first that is not
//! satisfied:
//!
//! 1. Load the machine; a vanished machine is done
//! 2. Deleting → delete the server, release the finalizer ([`deletion`])
//! 3. Walk the ownership chain ([`ownership`])
//! 4. Already provisioned → re-assert status only ([`provisioning::reassert_provisioned`])
//! 5. Wait for bootstrap data ([`readiness`], [`bootstrap`])
//! 6. Create or adopt the server ([`provisioning::provision`])
//!
//! Waiting states requeue after a short delay and are reported as a
//! `Ready=False` condition. Errors are reported the same way and returned to
//! the controller, whose error policy backs off.

pub mod bootstrap;
pub mod deletion;
pub mod ownership;
pub mod provisioning;
pub mod readiness;







use crate::constants::KIND_HETZNER_CLOUD_MACHINE;
use crate::context::Context;
use crate::crd::HetznerCloudMachine;
use crate::metrics;
use crate::provider_errors::{AccessorError, BootstrapError, MachineError};
use crate::reconcilers::status::report_condition;
use crate::reconcilers::ReconcileOutcome;
use crate::status_reasons::REASON_WAITING_FOR_BOOTSTRAP_DATA;
use ownership::Resolution;
use readiness::Readiness;
use kube::ResourceExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Reconcile the `HetznerCloudMachine` `namespace/name`.
///
/// # Errors
///
/// Returns a [`MachineError`] for configuration problems, provider failures
/// and rejected writes. Nothing the pass did before the error is undone.
pub async fn reconcile_hetznercloudmachine(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, MachineError> {
    let Some(machine) = ctx.accessor.get_machine(namespace, name).await? else {
        debug!("HetznerCloudMachine {}/{} no longer exists", namespace, name);
        // Nothing will run this key again, so its failure history goes too.
        ctx.error_backoff.reset(&format!("{namespace}/{name}"));
        return Ok(ReconcileOutcome::Done);
    };

    if machine.metadata.deletion_timestamp.is_some() {
        return deletion::reconcile_delete(ctx, &machine).await;
    }

    let result = reconcile_existing(ctx, &machine).await;
    match &result {
        // The newer version of the object is already queued.
        Err(MachineError::Accessor(AccessorError::Conflict { .. })) => {}
        Err(e) => report_failure(ctx, &machine, e).await,
        Ok(_) => {}
    }
    result
}

/// Report a failed pass as `Ready=False` on the latest copy of the machine.
///
/// The pass may already have written the machine (the finalizer is added
/// before the first provider call), so the copy it started from is stale.
async fn report_failure(ctx: &Context, machine: &HetznerCloudMachine, err: &MachineError) {
    let namespace = machine.namespace().unwrap_or_default();
    let name = machine.name_any();
    let latest = match ctx.accessor.get_machine(&namespace, &name).await {
        Ok(Some(latest)) => latest,
        Ok(None) => return,
        Err(e) => {
            warn!(
                "Failed to re-read HetznerCloudMachine {}/{} to report {}: {}",
                namespace,
                name,
                err.reason(),
                e
            );
            return;
        }
    };

    if provisioning::known_provider_id(&latest).is_some() {
        debug!(
            machine = %name,
            reason = err.reason(),
            "Not downgrading Ready on a provisioned machine"
        );
        return;
    }
    report_condition(ctx.accessor.as_ref(), &latest, err.reason(), &err.to_string()).await;
}

async fn reconcile_existing(
    ctx: &Context,
    machine: &HetznerCloudMachine,
) -> Result<ReconcileOutcome, MachineError> {
    let namespace = machine.namespace().unwrap_or_default();

    let chain = match ownership::resolve(ctx, machine).await? {
        Resolution::Proceed(chain) => chain,
        Resolution::Defer {
            reason,
            message,
            requeue_after,
        } => return defer(ctx, machine, reason, &message, requeue_after).await,
    };

    if let Some(provider_id) = provisioning::known_provider_id(machine) {
        debug!(
            machine = %machine.name_any(),
            provider_id = %provider_id,
            "Machine already provisioned, skipping provider calls"
        );
        provisioning::reassert_provisioned(ctx, machine, provider_id).await?;
        return Ok(ReconcileOutcome::Done);
    }

    let secret_name = match readiness::check(&chain.machine) {
        Readiness::Ready { secret_name } => secret_name,
        Readiness::WaitingForBootstrapData => {
            return defer(
                ctx,
                machine,
                REASON_WAITING_FOR_BOOTSTRAP_DATA,
                "Waiting for the bootstrap provider to set Machine.spec.bootstrap.dataSecretName",
                ctx.settings.defer_requeue,
            )
            .await;
        }
    };

    let bootstrap = match bootstrap::fetch(ctx.accessor.as_ref(), &namespace, secret_name).await {
        Ok(data) => data,
        Err(BootstrapError::NotFound { namespace, name }) => {
            return defer(
                ctx,
                machine,
                REASON_WAITING_FOR_BOOTSTRAP_DATA,
                &format!("Waiting for bootstrap data secret {namespace}/{name} to be created"),
                ctx.settings.defer_requeue,
            )
            .await;
        }
        Err(BootstrapError::Malformed {
            namespace,
            name,
            reason,
        }) => {
            return Err(MachineError::BootstrapDataMalformed {
                namespace,
                name,
                reason,
            })
        }
        Err(BootstrapError::Accessor(e)) => return Err(e.into()),
    };

    provisioning::provision(ctx, machine, &chain, &bootstrap).await?;
    Ok(ReconcileOutcome::Done)
}

async fn defer(
    ctx: &Context,
    machine: &HetznerCloudMachine,
    reason: &'static str,
    message: &str,
    requeue_after: Duration,
) -> Result<ReconcileOutcome, MachineError> {
    info!(
        "HetznerCloudMachine {}/{} waiting ({}): {}, requeue in {:?}",
        machine.namespace().unwrap_or_default(),
        machine.name_any(),
        reason,
        message,
        requeue_after
    );
    metrics::record_reconciliation_requeue(KIND_HETZNER_CLOUD_MACHINE, reason);
    // A provisioned machine keeps Ready=True while a dependency flaps.
    if provisioning::known_provider_id(machine).is_none() {
        report_condition(ctx.accessor.as_ref(), machine, reason, message).await;
    }
    Ok(ReconcileOutcome::RequeueAfter(requeue_after))
}

/// Log a failed pass. Transient failures are expected to clear on retry.
pub fn log_failure(namespace: &str, name: &str, err: &MachineError) {
    if err.is_transient() {
        warn!(
            "Reconciling HetznerCloudMachine {}/{} failed, will retry: {}",
            namespace, name, err
        );
    } else {
        error!(
            "Reconciling HetznerCloudMachine {}/{} failed ({}): {}",
            namespace,
            name,
            err.reason(),
            err
        );
    }
}
