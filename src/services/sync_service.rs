// src/services/sync_service.rs
// Outbound calls to the dashboard API: state sync and route persistence.
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    models::route::Route,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Full,
    Incremental,
}

#[async_trait]
pub trait SyncClient: Send + Sync {
    async fn sync_to_server(&self, payload: &Value, mode: SyncMode) -> FleetResult<Value>;
    async fn persist_route(&self, route: &Route) -> FleetResult<()>;
}

pub struct HttpSyncClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SyncClient for HttpSyncClient {
    async fn sync_to_server(&self, payload: &Value, mode: SyncMode) -> FleetResult<Value> {
        tracing::debug!("Syncing to {} ({:?})", self.base_url, mode);

        let body = json!({
            "mode": mode,
            "data": payload,
            "timestamp": Utc::now().to_rfc3339(),
        });
        let response = self.client.post(self.url("/api/sync")).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                service: "sync".to_string(),
                status: status.as_u16(),
            });
        }

        // Some deployments answer 204 with no body
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn persist_route(&self, route: &Route) -> FleetResult<()> {
        tracing::debug!("Persisting route {}", route.id);

        let response = self.client.post(self.url("/api/routes")).json(route).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                service: "routes".to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Stand-in for tests and standalone demos with no API base.
pub struct OfflineSyncClient;

#[async_trait]
impl SyncClient for OfflineSyncClient {
    async fn sync_to_server(&self, _payload: &Value, _mode: SyncMode) -> FleetResult<Value> {
        Err(AppError::ServiceUnavailable("sync is offline".to_string()))
    }

    async fn persist_route(&self, _route: &Route) -> FleetResult<()> {
        Err(AppError::ServiceUnavailable("sync is offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::{RoutePriority, RouteStatus};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn route() -> Route {
        Route {
            id: "route_1".into(),
            driver_id: "D1".into(),
            bin_ids: vec!["B1".into()],
            bin_details: vec![],
            priority: RoutePriority::High,
            status: RouteStatus::Pending,
            assigned_by: Some("admin".into()),
            notes: None,
            estimated_distance_km: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            updated_at: Utc::now(),
            persisted: false,
        }
    }

    #[tokio::test]
    async fn test_sync_posts_mode_and_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sync"))
            .and(body_partial_json(json!({ "mode": "full", "data": { "bins": [] } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpSyncClient::new(server.uri());
        let reply = client.sync_to_server(&json!({ "bins": [] }), SyncMode::Full).await.unwrap();
        assert_eq!(reply["ok"], true);
    }

    #[tokio::test]
    async fn test_persist_route_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/routes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = HttpSyncClient::new(server.uri()).persist_route(&route()).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_persist_route_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/routes"))
            .and(body_partial_json(json!({ "id": "route_1", "status": "pending" })))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        assert!(HttpSyncClient::new(server.uri()).persist_route(&route()).await.is_ok());
    }
}
