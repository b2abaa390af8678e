// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for `HetznerCloudMachine` resources.
//!
//! The controller is level-triggered: every pass reads the current state of
//! the machine and the resources it depends on, and moves the remote server a
//! step closer to what is declared. A pass may run any number of times for
//! the same object, concurrently with passes for other objects, and possibly
//! on stale data.
//!
//! # Reconciliation Architecture
//!
//! 1. **Resolve** - Walk `HetznerCloudMachine` → `Machine` → `Cluster` → `HetznerCloudCluster`
//! 2. **Gate** - Wait until the bootstrap provider has produced a payload
//! 3. **Provision** - Create (or adopt) the server, exactly once per machine
//! 4. **Status** - Record the provider ID and report readiness
//!
//! # Available Reconcilers
//!
//! - [`reconcile_hetznercloudmachine`] - Drives one `HetznerCloudMachine` pass,
//!   including the finalizer-guarded deletion path
//!
//! # Example: Running a pass
//!
//! ```rust,no_run
//! use capi_hetzner::context::Context;
//! use capi_hetzner::reconcilers::{reconcile_hetznercloudmachine, ReconcileOutcome};
//!
//! async fn run_once(ctx: &Context) {
//!     match reconcile_hetznercloudmachine(ctx, "default", "worker-0").await {
//!         Ok(ReconcileOutcome::Done) => {}
//!         Ok(ReconcileOutcome::RequeueAfter(delay)) => println!("retry in {delay:?}"),
//!         Err(e) => eprintln!("pass failed: {e}"),
//!     }
//! }
//! ```

pub mod finalizers;
pub mod hetznercloudmachine;
pub mod retry;
pub mod status;


pub use hetznercloudmachine::reconcile_hetznercloudmachine;

use std::time::Duration;

/// What the controller should do after a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing left to do until the object (or something it watches) changes.
    Done,
    /// A dependency is not ready yet; try again after the delay.
    RequeueAfter(Duration),
}

impl ReconcileOutcome {
    /// Returns true if the pass asked to be retried.
    #[must_use]
    pub fn is_requeue(&self) -> bool {
        matches!(self, Self::RequeueAfter(_))
    }
}

/// Check if a status value has actually changed compared to the current status.
///
/// Status patches trigger watch events, so writing an unchanged status on
/// every pass would keep the controller busy forever. Callers compare first
/// and skip the write when nothing changed.
///
/// # Example
///
/// ```rust
/// use capi_hetzner::reconcilers::status_changed;
///
/// let current = Some("hcloud://42".to_string());
/// assert!(!status_changed(&current, &Some("hcloud://42".to_string())));
/// assert!(status_changed(&current, &None));
/// ```
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}

#[cfg(test)]
mod mod_tests;
