// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # capi-hetzner - Cluster API infrastructure provider for Hetzner Cloud
//!
//! capi-hetzner is a Kubernetes controller written in Rust that turns
//! `HetznerCloudMachine` resources into Hetzner Cloud servers for Cluster API
//! workload clusters.
//!
//! ## Overview
//!
//! For every `HetznerCloudMachine` the controller:
//!
//! - Walks the ownership chain `HetznerCloudMachine → Machine → Cluster → HetznerCloudCluster`
//! - Waits until cluster infrastructure and bootstrap data are ready
//! - Creates (or adopts) exactly one server and attaches the cluster floating IP
//! - Records `hcloud://<id>` as the machine's provider ID and marks it ready
//! - Deletes the server when the machine is deleted
//!
//! ## Modules
//!
//! - [`crd`] - `HetznerCloudMachine` / `HetznerCloudCluster` and the Cluster API types read
//! - [`reconcilers`] - Reconciliation logic
//! - [`accessor`] - Kubernetes reads and conditional writes
//! - [`hcloud`] - Hetzner Cloud API client
//! - [`context`] - Shared controller context
//! - [`config`] - Command-line and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use capi_hetzner::crd::{HetznerCloudMachine, HetznerCloudMachineSpec};
//!
//! let machine = HetznerCloudMachine::new(
//!     "worker-0",
//!     HetznerCloudMachineSpec {
//!         r#type: "cx21".to_string(),
//!         ssh_key: Some("ops@example.com".to_string()),
//!         image: None,
//!         provider_id: None,
//!     },
//! );
//! ```

pub mod accessor;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod hcloud;
pub mod http_errors;
pub mod labels;
pub mod metrics;
pub mod provider_errors;
pub mod reconcilers;
pub mod status_reasons;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod config_tests;
