//! Client for the server registry and the servers it lists.
//!
//! `health_check` and `update_servers` speak to both through [`FleetApi`];
//! every call carries the shared `secret`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use fnrelay_config::FleetConfig;

/// One entry of the registry's server list.
///
/// Fields the functions do not use are kept in `extra` so the list can be
/// returned exactly as fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: Value,
    pub base_url: String,
    #[serde(default)]
    pub active_status: bool,
    #[serde(default)]
    pub release_update_status: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn list_servers(&self) -> Result<Vec<ServerRecord>>;

    /// Status code of the server's ping endpoint.
    async fn ping(&self, server: &ServerRecord) -> Result<u16>;

    /// Ask a revived server to install the current release.
    async fn trigger_update(&self, server: &ServerRecord) -> Result<u16>;

    /// Ask an active server to roll to the latest release.
    async fn update_release(&self, server: &ServerRecord) -> Result<u16>;

    /// Record a server as up (`true`) or down in the registry.
    async fn set_server_status(&self, server: &ServerRecord, status: bool) -> Result<u16>;

    /// Tell the registry a rollout could not reach `server`.
    async fn report_release_failure(&self, server: &ServerRecord) -> Result<u16>;
}

pub struct HttpFleetApi {
    client: Client,
    registry_url: String,
    secret: String,
    ping_timeout: Duration,
}

impl HttpFleetApi {
    pub fn new(config: &FleetConfig) -> Result<Self> {
        let secret = config
            .secret_key
            .clone()
            .context("SECRET_KEY is not configured")?;
        Ok(Self {
            client: Client::new(),
            registry_url: config.registry_url.trim_end_matches('/').to_string(),
            secret,
            ping_timeout: Duration::from_secs(config.ping_timeout_secs),
        })
    }

    fn server_url(server: &ServerRecord, path: &str) -> String {
        format!("{}{path}", server.base_url.trim_end_matches('/'))
    }

    async fn post(&self, url: String, body: Value) -> Result<u16> {
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        debug!(url = %url, status, body = %text, "Fleet call answered");
        Ok(status)
    }
}

#[async_trait]
impl FleetApi for HttpFleetApi {
    async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        let url = format!("{}/api/core/servers", self.registry_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Server registry returned {status}");
        }
        response
            .json()
            .await
            .context("Server registry returned an unexpected server list")
    }

    async fn ping(&self, server: &ServerRecord) -> Result<u16> {
        let url = Self::server_url(server, "/api/core/ping/");
        let response = self
            .client
            .get(&url)
            .timeout(self.ping_timeout)
            .json(&json!({ "secret": self.secret }))
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        Ok(response.status().as_u16())
    }

    async fn trigger_update(&self, server: &ServerRecord) -> Result<u16> {
        self.post(
            Self::server_url(server, "/api/core/update/"),
            json!({ "secret": self.secret, "server_id": server.id }),
        )
        .await
    }

    async fn update_release(&self, server: &ServerRecord) -> Result<u16> {
        self.post(
            Self::server_url(server, "/api/core/update_release/"),
            json!({ "secret": self.secret }),
        )
        .await
    }

    async fn set_server_status(&self, server: &ServerRecord, status: bool) -> Result<u16> {
        self.post(
            format!("{}/api/core/update_server_status/", self.registry_url),
            json!({ "secret": self.secret, "server_id": server.id, "status": status }),
        )
        .await
    }

    async fn report_release_failure(&self, server: &ServerRecord) -> Result<u16> {
        self.post(
            format!("{}/api/core/release_update_failure/", self.registry_url),
            json!({ "secret": self.secret, "server_id": server.id }),
        )
        .await
    }
}
