// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `HetznerCloudMachine` resources.
//!
//! Conditions follow the standard Kubernetes format:
//! - `type`: The aspect of the resource being reported (always `Ready` here)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase), see [`crate::status_reasons`]
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! Status changes of a pass are collected in a [`MachineStatusUpdater`] and
//! written in a single conditional patch, and only when something changed.
//!
//! # Example
//!
//! ```rust,no_run
//! use capi_hetzner::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "False",
//!     "WaitingForBootstrapData",
//!     "Machine has no bootstrap data secret yet",
//! );
//! ```

use crate::accessor::ResourceAccessor;
use crate::crd::{Condition, HetznerCloudMachine, HetznerCloudMachineStatus};
use crate::provider_errors::AccessorError;
use crate::reconcilers::status_changed;
use crate::status_reasons::{CONDITION_TYPE_READY, REASON_INSTANCE_PROVISIONED};
use chrono::Utc;
use kube::ResourceExt;
use tracing::{debug, warn};

/// Condition status value for a satisfied condition.
pub const STATUS_TRUE: &str = "True";

/// Condition status value for an unsatisfied condition.
pub const STATUS_FALSE: &str = "False";

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Example
///
/// ```rust,no_run
/// # use capi_hetzner::reconcilers::status::create_condition;
/// let condition = create_condition("Ready", "True", "InstanceProvisioned", "Server 42 is running");
/// assert_eq!(condition.r#type, "Ready");
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// `lastTransitionTime` is preserved when the status value does not change.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|curr_cond| {
            curr_cond.r#type == new_cond.r#type
                && curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Collects the status changes of one pass and applies them in a single patch.
///
/// Starts from the machine's current status, so fields a pass does not touch
/// (most importantly `providerID`) are written back unchanged.
pub struct MachineStatusUpdater {
    namespace: String,
    name: String,
    current_status: Option<HetznerCloudMachineStatus>,
    new_status: HetznerCloudMachineStatus,
}

impl MachineStatusUpdater {
    #[must_use]
    pub fn new(machine: &HetznerCloudMachine) -> Self {
        let current_status = machine.status.clone();
        let new_status = current_status.clone().unwrap_or_default();

        Self {
            namespace: machine.namespace().unwrap_or_default(),
            name: machine.name_any(),
            current_status,
            new_status,
        }
    }

    /// Update or add a condition (in-memory only).
    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    /// Set `Ready=False` with the given reason (in-memory only).
    pub fn set_not_ready(&mut self, reason: &str, message: &str) {
        self.set_condition(CONDITION_TYPE_READY, STATUS_FALSE, reason, message);
    }

    /// Record a provisioned server (in-memory only).
    ///
    /// `server_id` is the numeric Hetzner ID when it could be derived from the
    /// provider ID; an unparseable provider ID leaves `hetznerServerID` as it was.
    pub fn mark_provisioned(&mut self, provider_id: &str, server_id: Option<i64>) {
        self.new_status.ready = true;
        self.new_status.provider_id = Some(provider_id.to_string());
        if let Some(id) = server_id {
            self.new_status.hetzner_server_id = Some(id.to_string());
        }
        self.set_condition(
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            REASON_INSTANCE_PROVISIONED,
            &format!("Server {provider_id} is provisioned"),
        );
    }

    /// Returns true if the collected status differs semantically from the current one.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.ready != self.new_status.ready
                    || status_changed(&current.provider_id, &self.new_status.provider_id)
                    || status_changed(
                        &current.hetzner_server_id,
                        &self.new_status.hetzner_server_id,
                    )
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    /// The status that [`apply`](Self::apply) would write.
    #[must_use]
    pub fn status(&self) -> &HetznerCloudMachineStatus {
        &self.new_status
    }

    /// Write the collected status if it changed.
    ///
    /// Returns the updated machine, or `None` when the write was skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AccessorError::Conflict`] if the machine changed since it was
    /// read, or [`AccessorError::Api`] for any other API failure.
    pub async fn apply(
        &self,
        accessor: &dyn ResourceAccessor,
        machine: &HetznerCloudMachine,
    ) -> Result<Option<HetznerCloudMachine>, AccessorError> {
        if !self.has_changes() {
            debug!(
                "HetznerCloudMachine {}/{} status unchanged, skipping update",
                self.namespace, self.name
            );
            return Ok(None);
        }

        let updated = accessor.patch_status(machine, &self.new_status).await?;

        debug!(
            "Updated HetznerCloudMachine {}/{} status: ready={}, {} condition(s)",
            self.namespace,
            self.name,
            self.new_status.ready,
            self.new_status.conditions.len()
        );

        Ok(Some(updated))
    }
}

/// Report a waiting or failure reason as `Ready=False`.
///
/// Best effort: a failed write is logged and otherwise ignored, since the
/// pass outcome does not depend on it.
pub async fn report_condition(
    accessor: &dyn ResourceAccessor,
    machine: &HetznerCloudMachine,
    reason: &str,
    message: &str,
) {
    let mut updater = MachineStatusUpdater::new(machine);
    updater.set_not_ready(reason, message);

    if let Err(e) = updater.apply(accessor, machine).await {
        warn!(
            "Failed to report condition {} on HetznerCloudMachine {}/{}: {}",
            reason,
            machine.namespace().unwrap_or_default(),
            machine.name_any(),
            e
        );
    }
}
