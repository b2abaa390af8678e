// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gate on the bootstrap provider having produced a payload.

use crate::crd::Machine;

/// Whether the owning `Machine` references bootstrap data yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<'a> {
    /// `spec.bootstrap.dataSecretName` is set.
    Ready { secret_name: &'a str },
    /// The bootstrap provider has not run yet.
    WaitingForBootstrapData,
}

/// Check `Machine.spec.bootstrap.dataSecretName`. An empty name counts as unset.
#[must_use]
pub fn check(machine: &Machine) -> Readiness<'_> {
    match machine.spec.bootstrap.data_secret_name.as_deref() {
        Some(name) if !name.is_empty() => Readiness::Ready { secret_name: name },
        _ => Readiness::WaitingForBootstrapData,
    }
}
