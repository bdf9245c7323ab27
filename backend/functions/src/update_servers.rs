//! `update_servers`: roll the latest release out to the fleet.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use fnrelay_core::{Function, FunctionError, FunctionResponse, IncomingRequest};

use crate::fleet::{FleetApi, ServerRecord};

pub struct UpdateServers {
    fleet: Arc<dyn FleetApi>,
}

impl UpdateServers {
    pub fn new(fleet: Arc<dyn FleetApi>) -> Self {
        Self { fleet }
    }

    async fn roll_out(&self, server: &ServerRecord) -> Result<()> {
        if !server.active_status {
            let status = self.fleet.report_release_failure(server).await?;
            info!(server_id = %server.id, status, "Reported release failure for inactive server");
            return Ok(());
        }

        let status = self.fleet.update_release(server).await?;
        if status != 200 {
            warn!(server_id = %server.id, status, "Release update rejected, marking server down");
            self.fleet.set_server_status(server, false).await?;
        } else {
            info!(server_id = %server.id, "Release update accepted");
        }
        Ok(())
    }
}

#[async_trait]
impl Function for UpdateServers {
    fn name(&self) -> &str {
        "update_servers"
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

        for server in &servers {
            if let Err(e) = self.roll_out(server).await {
                warn!(server_id = %server.id, error = %e, "Release rollout failed for server");
            }
        }

        FunctionResponse::ok_serialized(&servers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::fake::FakeFleet;

    #[tokio::test]
    async fn rejects_non_post() {
        let f = UpdateServers::new(Arc::new(FakeFleet::default()));
        let res = f.handle(IncomingRequest::new("PATCH", "/")).await;
        assert_eq!(res.status, 405);
    }

    #[tokio::test]
    async fn rolls_out_and_reports_failures() {
        let fleet = Arc::new(FakeFleet {
            servers: vec![
                FakeFleet::server(1, "http://ok", true, true),
                FakeFleet::server(2, "http://broken", true, true),
                FakeFleet::server(3, "http://offline", false, true),
                FakeFleet::server(4, "http://gone", true, true),
            ],
            statuses: [("http://broken".to_string(), 500)].into_iter().collect(),
            unreachable: vec!["http://gone".into()],
            ..FakeFleet::default()
        });
        let f = UpdateServers::new(fleet.clone());

        let res = f.handle(IncomingRequest::new("POST", "/")).await;

        assert_eq!(res.status, 200);
        let ids: Vec<_> = res
            .as_json()
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, [1, 2, 3, 4]);
        assert_eq!(
            fleet.calls().await,
            [
                "update_release 1",
                "update_release 2",
                "status 2 false",
                "release_failure 3",
                "update_release 4",
            ]
        );
    }
}
