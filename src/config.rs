// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration.
//!
//! Flags are parsed with `clap`. The Hetzner Cloud token is read from the
//! `HC_ACCESS_TOKEN` environment variable and must be present before any
//! controller starts.

use crate::constants::{
    DEFAULT_HCLOUD_ENDPOINT, DEFAULT_SERVER_IMAGE, HCLOUD_TOKEN_ENV, METRICS_SERVER_BIND_ADDRESS,
    METRICS_SERVER_PORT,
};
use crate::context::ProvisioningSettings;
use clap::Parser;
use std::net::SocketAddr;
use thiserror::Error;

/// Cluster API infrastructure provider for Hetzner Cloud
#[derive(Parser, Debug, Clone)]
#[command(name = "capi-hetzner", version, about, long_about = None)]
pub struct Cli {
    /// Address the Prometheus metrics endpoint listens on
    #[arg(long, default_value_t = default_metrics_address())]
    pub metrics_bind_address: SocketAddr,

    /// SSH key installed on servers whose HetznerCloudMachine sets no sshKey
    #[arg(long)]
    pub ssh_key_name: Option<String>,

    /// Image used for servers whose HetznerCloudMachine sets no image
    #[arg(long, default_value = DEFAULT_SERVER_IMAGE)]
    pub image: String,

    /// Only watch HetznerCloudMachines in this namespace (default: all namespaces)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Hetzner Cloud API endpoint
    #[arg(long, default_value = DEFAULT_HCLOUD_ENDPOINT)]
    pub hcloud_endpoint: String,
}

fn default_metrics_address() -> SocketAddr {
    SocketAddr::new(
        METRICS_SERVER_BIND_ADDRESS
            .parse()
            .unwrap_or(std::net::Ipv4Addr::UNSPECIFIED.into()),
        METRICS_SERVER_PORT,
    )
}

/// Startup configuration errors. Any of these stops the process.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The API token environment variable is unset or empty.
    #[error("environment variable {0} must be set to a Hetzner Cloud API token")]
    MissingToken(&'static str),

    /// A flag was given an empty value.
    #[error("--{flag} must not be empty")]
    EmptyFlag {
        /// Flag name without leading dashes
        flag: &'static str,
    },
}

/// Validated controller configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub metrics_bind_address: SocketAddr,
    pub namespace: Option<String>,
    pub hcloud_endpoint: String,
    pub hcloud_token: String,
    pub settings: ProvisioningSettings,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("metrics_bind_address", &self.metrics_bind_address)
            .field("namespace", &self.namespace)
            .field("hcloud_endpoint", &self.hcloud_endpoint)
            .field("hcloud_token", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ControllerConfig {
    /// Validate CLI flags and read the token through `env`.
    ///
    /// `env` is `std::env::var(..).ok()` in production.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if the token is unset or blank,
    /// and [`ConfigError::EmptyFlag`] for blank `--image`, `--ssh-key-name`,
    /// `--namespace` or `--hcloud-endpoint` values.
    pub fn from_args<F>(cli: Cli, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hcloud_token = env(HCLOUD_TOKEN_ENV)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken(HCLOUD_TOKEN_ENV))?;

        if cli.image.trim().is_empty() {
            return Err(ConfigError::EmptyFlag { flag: "image" });
        }
        if cli.hcloud_endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyFlag {
                flag: "hcloud-endpoint",
            });
        }
        if cli.ssh_key_name.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyFlag {
                flag: "ssh-key-name",
            });
        }
        if cli.namespace.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::EmptyFlag { flag: "namespace" });
        }

        Ok(Self {
            metrics_bind_address: cli.metrics_bind_address,
            namespace: cli.namespace,
            hcloud_endpoint: cli.hcloud_endpoint,
            hcloud_token,
            settings: ProvisioningSettings {
                default_image: cli.image,
                default_ssh_key_name: cli.ssh_key_name,
                ..ProvisioningSettings::default()
            },
        })
    }
}
