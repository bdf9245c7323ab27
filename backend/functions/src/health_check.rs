//! `health_check`: revive inactive servers that answer their ping.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use fnrelay_core::{Function, FunctionError, FunctionResponse, IncomingRequest};

use crate::fleet::{FleetApi, ServerRecord};

pub struct HealthCheck {
    fleet: Arc<dyn FleetApi>,
}

impl HealthCheck {
    pub fn new(fleet: Arc<dyn FleetApi>) -> Self {
        Self { fleet }
    }

    /// Ping one inactive server; when it answers, bring its release up to
    /// date if needed and mark it active.
    async fn revive(&self, server: &ServerRecord) -> Result<()> {
        let status = self.fleet.ping(server).await?;
        if status != 200 {
            info!(server_id = %server.id, status, "Server still unreachable");
            return Ok(());
        }

        if !server.release_update_status {
            let status = self.fleet.trigger_update(server).await?;
            info!(server_id = %server.id, status, "Triggered release update");
        }
        let status = self.fleet.set_server_status(server, true).await?;
        info!(server_id = %server.id, status, "Server marked active");
        Ok(())
    }
}

#[async_trait]
impl Function for HealthCheck {
    fn name(&self) -> &str {
        "health_check"
    }

    #[instrument(skip_all, fields(method = %request.method()))]
    async fn handle(&self, request: IncomingRequest) -> FunctionResponse {
        if !request.is_post() {
            return FunctionError::MethodNotAllowed.into_response();
        }

        let servers = match self.fleet.list_servers().await {
            Ok(servers) => servers,
            Err(e) => return FunctionError::Upstream(format!("{e:#}")).into_response(),
        };

        for server in servers.iter().filter(|s| !s.active_status) {
            if let Err(e) = self.revive(server).await {
                warn!(server_id = %server.id, error = %e, "Health check failed for server");
            }
        }

        FunctionResponse::ok_serialized(&servers)
    }
}
