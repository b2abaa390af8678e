// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hetzner Cloud API access.
//!
//! The reconciler only talks to Hetzner through the [`ProviderApi`] trait.
//! [`HcloudClient`] implements it over the public REST API with bearer-token
//! authentication. Tests substitute an in-memory fake.
//!
//! Calls are never retried here. A failed call fails the reconciliation pass
//! and the controller's error backoff decides when to run it again.
//!
//! # Example
//!
//! ```rust,no_run
//! use capi_hetzner::hcloud::{HcloudClient, ProviderApi};
//!
//! # async fn example() -> Result<(), capi_hetzner::provider_errors::HcloudError> {
//! let client = HcloudClient::new("https://api.hetzner.cloud/v1", "token")?;
//! if let Some(key) = client.get_ssh_key("ops@example.com").await? {
//!     println!("ssh key id {}", key.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod types;

pub use client::HcloudClient;
pub use types::{Action, CreateServerRequest, PublicNet, Server, SshKey};

use crate::provider_errors::HcloudError;
use async_trait::async_trait;

/// Operations the reconciler needs from the cloud provider.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Look up an SSH key by its exact name.
    async fn get_ssh_key(&self, name: &str) -> Result<Option<SshKey>, HcloudError>;

    /// Look up a server by its exact name. Server names are unique per project.
    async fn find_server_by_name(&self, name: &str) -> Result<Option<Server>, HcloudError>;

    /// Create a server. This is the billable, non-idempotent call.
    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server, HcloudError>;

    /// Route a floating IP to a server.
    async fn assign_floating_ip(&self, floating_ip_id: i64, server_id: i64)
        -> Result<(), HcloudError>;

    /// Delete a server. A missing server is reported as an `Api` error with status 404.
    async fn delete_server(&self, server_id: i64) -> Result<(), HcloudError>;
}
