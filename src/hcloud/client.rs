// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `reqwest`-based Hetzner Cloud API client.

use super::types::{
    ActionResponse, CreateServerRequest, CreateServerResponse, ErrorResponse, Server,
    ServersResponse, SshKey, SshKeysResponse,
};
use super::ProviderApi;
use crate::constants::HCLOUD_REQUEST_TIMEOUT_SECS;
use crate::metrics::record_provider_call;
use crate::provider_errors::HcloudError;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Client for the Hetzner Cloud REST API.
#[derive(Clone)]
pub struct HcloudClient {
    http: HttpClient,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for HcloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HcloudClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HcloudClient {
    /// Create a client for `base_url` (e.g. `https://api.hetzner.cloud/v1`).
    ///
    /// Every request is bounded by a client-level timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid base URL or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, HcloudError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(HCLOUD_REQUEST_TIMEOUT_SECS))
            .build()?;
        Self::with_http_client(http, base_url, token)
    }

    /// Create a client around an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid base URL.
    pub fn with_http_client(
        http: HttpClient,
        base_url: &str,
        token: impl Into<String>,
    ) -> Result<Self, HcloudError> {
        let parsed = Url::parse(base_url).map_err(|e| {
            HcloudError::Transport(format!("invalid Hetzner Cloud endpoint '{base_url}': {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(HcloudError::Transport(format!(
                "invalid Hetzner Cloud endpoint '{base_url}': not a base URL"
            )));
        }

        Ok(Self {
            http,
            base_url: parsed,
            token: token.into(),
        })
    }

    /// Build an endpoint URL by appending path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, HcloudError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                HcloudError::Transport(format!("endpoint {} is not a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Same as [`Self::url`] with a `name` query filter.
    fn url_filtered_by_name(&self, collection: &str, name: &str) -> Result<Url, HcloudError> {
        let mut url = self.url(&[collection])?;
        url.query_pairs_mut().append_pair("name", name);
        Ok(url)
    }

    /// Send an authenticated request and turn non-2xx responses into [`HcloudError::Api`].
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, HcloudError> {
        let started = Instant::now();
        let result = request.bearer_auth(&self.token).send().await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                record_provider_call(operation, "transport", started.elapsed());
                warn!(operation = operation, error = %err, "Hetzner Cloud request failed");
                return Err(err.into());
            }
        };

        let status = response.status();
        if status.is_success() {
            record_provider_call(operation, "success", started.elapsed());
            debug!(operation = operation, status = %status, elapsed = ?started.elapsed(), "Hetzner Cloud request succeeded");
            return Ok(response);
        }

        record_provider_call(operation, status.as_str(), started.elapsed());
        let text = response.text().await.unwrap_or_default();
        let err = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => HcloudError::Api {
                status: status.as_u16(),
                code: body.error.code,
                message: body.error.message,
            },
            Err(_) => HcloudError::Api {
                status: status.as_u16(),
                code: "unknown".to_string(),
                message: text,
            },
        };
        warn!(operation = operation, status = %status, error = %err, "Hetzner Cloud API returned an error");
        Err(err)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HcloudError> {
        response.json::<T>().await.map_err(|e| HcloudError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProviderApi for HcloudClient {
    async fn get_ssh_key(&self, name: &str) -> Result<Option<SshKey>, HcloudError> {
        let url = self.url_filtered_by_name("ssh_keys", name)?;
        let response = self.execute("get_ssh_key", self.http.get(url)).await?;
        let body: SshKeysResponse = Self::decode(response).await?;
        Ok(body.ssh_keys.into_iter().find(|key| key.name == name))
    }

    async fn find_server_by_name(&self, name: &str) -> Result<Option<Server>, HcloudError> {
        let url = self.url_filtered_by_name("servers", name)?;
        let response = self.execute("find_server", self.http.get(url)).await?;
        let body: ServersResponse = Self::decode(response).await?;
        Ok(body.servers.into_iter().find(|server| server.name == name))
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server, HcloudError> {
        let url = self.url(&["servers"])?;
        let response = self
            .execute("create_server", self.http.post(url).json(request))
            .await?;
        let body: CreateServerResponse = Self::decode(response).await?;
        if let Some(action) = &body.action {
            debug!(
                server_id = body.server.id,
                action_id = action.id,
                action_status = %action.status,
                "Server create action started"
            );
        }
        Ok(body.server)
    }

    async fn assign_floating_ip(
        &self,
        floating_ip_id: i64,
        server_id: i64,
    ) -> Result<(), HcloudError> {
        let id = floating_ip_id.to_string();
        let url = self.url(&["floating_ips", &id, "actions", "assign"])?;
        let response = self
            .execute(
                "assign_floating_ip",
                self.http.post(url).json(&json!({ "server": server_id })),
            )
            .await?;
        let body: ActionResponse = Self::decode(response).await?;
        debug!(
            floating_ip_id = floating_ip_id,
            server_id = server_id,
            action_id = body.action.id,
            "Floating IP assign action started"
        );
        Ok(())
    }

    async fn delete_server(&self, server_id: i64) -> Result<(), HcloudError> {
        let id = server_id.to_string();
        let url = self.url(&["servers", &id])?;
        self.execute("delete_server", self.http.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
