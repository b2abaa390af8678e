// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bootstrap payload retrieval.
//!
//! The bootstrap provider writes the cloud-init document for a machine into a
//! `Secret` under the `value` key. The bytes are handed to Hetzner unmodified.

use crate::accessor::ResourceAccessor;
use crate::constants::BOOTSTRAP_DATA_SECRET_KEY;
use crate::provider_errors::BootstrapError;
use tracing::debug;

/// Raw bootstrap payload together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapData {
    namespace: String,
    secret_name: String,
    payload: Vec<u8>,
}

impl BootstrapData {
    /// The payload as Hetzner `user_data`, which is a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Malformed`] if the payload is not UTF-8.
    pub fn as_user_data(&self) -> Result<&str, BootstrapError> {
        std::str::from_utf8(&self.payload).map_err(|e| BootstrapError::Malformed {
            namespace: self.namespace.clone(),
            name: self.secret_name.clone(),
            reason: format!("payload is not valid UTF-8: {e}"),
        })
    }
}

/// Read the bootstrap payload from `namespace/secret_name`.
///
/// # Errors
///
/// - [`BootstrapError::NotFound`] if the secret does not exist (yet)
/// - [`BootstrapError::Malformed`] if the secret has no `value` key
/// - [`BootstrapError::Accessor`] if the read fails
pub async fn fetch(
    accessor: &dyn ResourceAccessor,
    namespace: &str,
    secret_name: &str,
) -> Result<BootstrapData, BootstrapError> {
    let secret = accessor
        .get_secret(namespace, secret_name)
        .await?
        .ok_or_else(|| BootstrapError::NotFound {
            namespace: namespace.to_string(),
            name: secret_name.to_string(),
        })?;

    let payload = secret
        .data
        .and_then(|mut data| data.remove(BOOTSTRAP_DATA_SECRET_KEY))
        .ok_or_else(|| BootstrapError::Malformed {
            namespace: namespace.to_string(),
            name: secret_name.to_string(),
            reason: format!("missing key '{BOOTSTRAP_DATA_SECRET_KEY}'"),
        })?
        .0;

    debug!(
        secret = %secret_name,
        namespace = %namespace,
        bytes = payload.len(),
        "Fetched bootstrap data"
    );

    Ok(BootstrapData {
        namespace: namespace.to_string(),
        secret_name: secret_name.to_string(),
        payload,
    })
}
