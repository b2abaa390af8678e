// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types for the Hetzner Cloud REST API.
//!
//! Only the fields this controller reads or writes are modelled. Unknown
//! response fields are ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An SSH key registered in the Hetzner Cloud project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub fingerprint: String,
}

/// A Hetzner Cloud server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub name: String,
    /// Lifecycle state reported by Hetzner (`initializing`, `starting`, `running`, ...)
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub public_net: PublicNet,
}

impl Server {
    /// Value of a server label, if set.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// True if the floating IP is already routed to this server.
    #[must_use]
    pub fn has_floating_ip(&self, floating_ip_id: i64) -> bool {
        self.public_net.floating_ips.contains(&floating_ip_id)
    }
}

/// Public networking of a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicNet {
    /// IDs of floating IPs assigned to the server.
    #[serde(default)]
    pub floating_ips: Vec<i64>,
}

/// Body of `POST /servers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub server_type: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Cloud-init payload passed to the server on first boot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    /// SSH key IDs to install for root.
    pub ssh_keys: Vec<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub start_after_create: bool,
}

/// An asynchronous Hetzner action (server create, floating IP assign, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub status: String,
}

// ============================================================================
// Response envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SshKeysResponse {
    pub ssh_keys: Vec<SshKey>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServersResponse {
    pub servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateServerResponse {
    pub server: Server,
    #[serde(default)]
    pub action: Option<Action>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionResponse {
    pub action: Action,
}

/// Error envelope returned on every non-2xx response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
