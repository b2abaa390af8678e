// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Idempotent server provisioning.
//!
//! A machine is either *unprovisioned* (no provider ID anywhere) or
//! *provisioned*. Once a provider ID is known no create call is issued again.
//! Between the create call and the provider ID being persisted there is a
//! window in which a pass can fail; the next pass closes it by finding the
//! server by name and adopting it if its machine-uid label matches.

use super::bootstrap::BootstrapData;
use super::ownership::OwnershipChain;
use crate::context::Context;
use crate::constants::{KIND_HETZNER_CLOUD_MACHINE, PROVIDER_ID_PREFIX};
use crate::crd::HetznerCloudMachine;
use crate::hcloud::{CreateServerRequest, Server};
use crate::labels::{
    FINALIZER_HETZNER_CLOUD_MACHINE, MANAGED_BY_CAPI_HETZNER, SERVER_CLUSTER_LABEL,
    SERVER_MACHINE_UID_LABEL, SERVER_MANAGED_BY_LABEL,
};
use crate::metrics;
use crate::provider_errors::{BootstrapError, MachineError};
use crate::reconcilers::finalizers::ensure_finalizer;
use crate::reconcilers::status::MachineStatusUpdater;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Format a Hetzner server ID as a provider ID (`hcloud://<id>`).
#[must_use]
pub fn format_provider_id(server_id: i64) -> String {
    format!("{PROVIDER_ID_PREFIX}{server_id}")
}

/// Parse a provider ID back into a Hetzner server ID.
///
/// Accepts `hcloud://<id>` and the bare numeric IDs written by earlier releases.
#[must_use]
pub fn parse_provider_id(provider_id: &str) -> Option<i64> {
    provider_id
        .strip_prefix(PROVIDER_ID_PREFIX)
        .unwrap_or(provider_id)
        .parse()
        .ok()
        .filter(|id| *id > 0)
}

/// The provider ID recorded on the machine, from status first, then spec.
#[must_use]
pub fn known_provider_id(machine: &HetznerCloudMachine) -> Option<&str> {
    machine
        .status
        .as_ref()
        .and_then(|s| s.provider_id.as_deref())
        .filter(|id| !id.is_empty())
        .or_else(|| machine.spec.provider_id.as_deref().filter(|id| !id.is_empty()))
}

/// The Hetzner server ID recorded on the machine, if any can be derived.
#[must_use]
pub fn known_server_id(machine: &HetznerCloudMachine) -> Option<i64> {
    let status = machine.status.as_ref();
    status
        .and_then(|s| s.hetzner_server_id.as_deref())
        .and_then(|id| id.parse().ok())
        .or_else(|| {
            status
                .and_then(|s| s.provider_id.as_deref())
                .and_then(parse_provider_id)
        })
        .or_else(|| machine.spec.provider_id.as_deref().and_then(parse_provider_id))
}

/// Labels stamped on every server this controller creates.
#[must_use]
pub fn server_labels(machine_uid: &str, cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (SERVER_MACHINE_UID_LABEL.to_string(), machine_uid.to_string()),
        (SERVER_CLUSTER_LABEL.to_string(), cluster_name.to_string()),
        (
            SERVER_MANAGED_BY_LABEL.to_string(),
            MANAGED_BY_CAPI_HETZNER.to_string(),
        ),
    ])
}

/// True if `server` was created for the machine with `machine_uid`.
#[must_use]
pub fn is_owned_by(server: &Server, machine_uid: &str) -> bool {
    !machine_uid.is_empty() && server.label(SERVER_MACHINE_UID_LABEL) == Some(machine_uid)
}

/// Re-assert the provisioned status of a machine whose provider ID is known.
///
/// Makes no provider calls. Adds the finalizer if the machine lacks it (a
/// restored or migrated machine), so that deleting it still removes the
/// server. Writes status only if it differs.
///
/// # Errors
///
/// Returns [`MachineError::Accessor`] if a write fails.
pub async fn reassert_provisioned(
    ctx: &Context,
    machine: &HetznerCloudMachine,
    provider_id: &str,
) -> Result<(), MachineError> {
    let machine = ensure_finalizer(
        ctx.accessor.as_ref(),
        machine,
        FINALIZER_HETZNER_CLOUD_MACHINE,
    )
    .await?;

    let mut updater = MachineStatusUpdater::new(&machine);
    updater.mark_provisioned(provider_id, parse_provider_id(provider_id));

    if updater.apply(ctx.accessor.as_ref(), &machine).await?.is_some() {
        info!(
            "Re-asserted provisioned status of HetznerCloudMachine {}/{} ({})",
            machine.namespace().unwrap_or_default(),
            machine.name_any(),
            provider_id
        );
    }
    Ok(())
}

/// Provision the server behind an unprovisioned machine.
///
/// # Errors
///
/// Any failure leaves the provider ID unset. Nothing is rolled back: a server
/// that was created stays and is adopted by the next pass.
pub async fn provision(
    ctx: &Context,
    machine: &HetznerCloudMachine,
    chain: &OwnershipChain,
    bootstrap: &BootstrapData,
) -> Result<(), MachineError> {
    let namespace = machine.namespace().unwrap_or_default();
    let name = machine.name_any();
    let uid = machine.uid().unwrap_or_default();

    let user_data = bootstrap.as_user_data().map_err(|e| match e {
        BootstrapError::Malformed {
            namespace,
            name,
            reason,
        } => MachineError::BootstrapDataMalformed {
            namespace,
            name,
            reason,
        },
        other => MachineError::BootstrapDataMalformed {
            namespace: namespace.clone(),
            name: name.clone(),
            reason: other.to_string(),
        },
    })?;

    let machine = ensure_finalizer(
        ctx.accessor.as_ref(),
        machine,
        FINALIZER_HETZNER_CLOUD_MACHINE,
    )
    .await?;

    let ssh_key_id = resolve_ssh_key(ctx, &machine).await?;

    let server = match ctx.provider.find_server_by_name(&name).await? {
        Some(existing) if is_owned_by(&existing, &uid) => {
            info!(
                "Adopting existing server {} ({}) for HetznerCloudMachine {}/{}",
                existing.name, existing.id, namespace, name
            );
            metrics::record_server_adopted(KIND_HETZNER_CLOUD_MACHINE);
            existing
        }
        Some(existing) => {
            return Err(MachineError::ServerNameConflict {
                server_name: existing.name,
                server_id: existing.id,
            });
        }
        None => {
            let request = CreateServerRequest {
                name: name.clone(),
                server_type: machine.spec.r#type.clone(),
                image: machine
                    .spec
                    .image
                    .clone()
                    .filter(|i| !i.is_empty())
                    .unwrap_or_else(|| ctx.settings.default_image.clone()),
                location: Some(chain.infra_cluster.spec.datacenter.clone())
                    .filter(|l| !l.is_empty()),
                user_data: Some(user_data.to_string()),
                ssh_keys: vec![ssh_key_id],
                labels: server_labels(&uid, &chain.cluster.name_any()),
                start_after_create: true,
            };
            debug!(
                server = %request.name,
                server_type = %request.server_type,
                image = %request.image,
                location = ?request.location,
                "Creating server"
            );

            let created = ctx.provider.create_server(&request).await.map_err(|source| {
                MachineError::ServerCreateFailed {
                    server_name: name.clone(),
                    source,
                }
            })?;
            metrics::record_server_created(&request.server_type);
            info!(
                "Created server {} ({}) for HetznerCloudMachine {}/{}",
                created.name, created.id, namespace, name
            );
            created
        }
    };

    attach_floating_ip(ctx, chain, &server).await?;

    let provider_id = format_provider_id(server.id);
    let machine = ctx.accessor.patch_provider_id(&machine, &provider_id).await?;

    let mut updater = MachineStatusUpdater::new(&machine);
    updater.mark_provisioned(&provider_id, Some(server.id));
    updater.apply(ctx.accessor.as_ref(), &machine).await?;

    info!(
        "HetznerCloudMachine {}/{} provisioned as {}",
        namespace, name, provider_id
    );
    Ok(())
}

/// Resolve the configured SSH key name to its Hetzner ID.
async fn resolve_ssh_key(ctx: &Context, machine: &HetznerCloudMachine) -> Result<i64, MachineError> {
    let key = machine
        .spec
        .ssh_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| ctx.settings.default_ssh_key_name.clone())
        .ok_or_else(|| MachineError::SshKeyNotConfigured {
            namespace: machine.namespace().unwrap_or_default(),
            name: machine.name_any(),
        })?;

    let found = ctx
        .provider
        .get_ssh_key(&key)
        .await
        .map_err(|source| MachineError::SshKeyLookupFailed {
            key: key.clone(),
            source,
        })?;

    found
        .map(|k| k.id)
        .ok_or(MachineError::SshKeyNotFound { key })
}

/// Route the cluster's floating IP to `server`, if the cluster has one.
async fn attach_floating_ip(
    ctx: &Context,
    chain: &OwnershipChain,
    server: &Server,
) -> Result<(), MachineError> {
    let Some(floating_ip_id) = chain
        .infra_cluster
        .status
        .as_ref()
        .and_then(|s| s.floating_ip_id)
    else {
        return Ok(());
    };

    if server.has_floating_ip(floating_ip_id) {
        debug!(
            floating_ip = floating_ip_id,
            server = server.id,
            "Floating IP already assigned"
        );
        return Ok(());
    }

    ctx.provider
        .assign_floating_ip(floating_ip_id, server.id)
        .await
        .map_err(|source| MachineError::FloatingIpAssignFailed {
            floating_ip_id,
            server_id: server.id,
            source,
        })?;
    info!("Assigned floating IP {} to server {}", floating_ip_id, server.id);
    Ok(())
}
