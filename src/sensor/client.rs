// src/sensor/client.rs
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing;

use super::decode::{decode_device, DevicePayload};
use crate::errors::FleetError;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Findy not configured")]
    NotConfigured,

    #[error("Sensor API request failed: {0}")]
    Http(String),

    #[error("Sensor API responded with status {0}")]
    Status(u16),

    #[error("Sensor API rejected the request: {0}")]
    Rejected(String),

    #[error("Malformed sensor payload: {0}")]
    Malformed(String),
}

impl From<SensorError> for FleetError {
    fn from(error: SensorError) -> Self {
        match error {
            SensorError::NotConfigured => FleetError::SensorNotConfigured,
            other => FleetError::SensorUnavailable(other.to_string()),
        }
    }
}

#[async_trait]
pub trait SensorClient: Send + Sync {
    async fn get_device(&self, imei: &str) -> Result<DevicePayload, SensorError>;
}

#[derive(Debug, Clone)]
pub struct FindyConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct FindyClient {
    config: FindyConfig,
    client: reqwest::Client,
}

impl FindyClient {
    pub fn new(config: FindyConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn device_url(&self, imei: &str) -> String {
        format!("{}/devices/{}", self.config.base_url.trim_end_matches('/'), imei)
    }
}

#[async_trait]
impl SensorClient for FindyClient {
    async fn get_device(&self, imei: &str) -> Result<DevicePayload, SensorError> {
        tracing::debug!("Fetching sensor device {}", imei);

        let response = self
            .client
            .get(self.device_url(imei))
            .header("x-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| SensorError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SensorError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SensorError::Malformed(e.to_string()))?;

        decode_device(body)
    }
}

/// Stand-in used when no vendor credentials are configured.
pub struct UnconfiguredSensorClient;

#[async_trait]
impl SensorClient for UnconfiguredSensorClient {
    async fn get_device(&self, _imei: &str) -> Result<DevicePayload, SensorError> {
        Err(SensorError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> FindyClient {
        FindyClient::new(FindyConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn test_get_device_decodes_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/8600001"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "device": { "imei": "8600001", "measurement": { "a": { "value": 1, "dataType": { "name": "Battery" } } } }
            })))
            .mount(&server)
            .await;

        let device = client_for(&server).get_device("8600001").await.unwrap();
        assert_eq!(device.imei.as_deref(), Some("8600001"));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).get_device("1").await;
        assert!(matches!(result, Err(SensorError::Status(503))));
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        let err = UnconfiguredSensorClient.get_device("1").await.unwrap_err();
        assert_eq!(err.to_string(), "Findy not configured");
        assert!(matches!(FleetError::from(err), FleetError::SensorNotConfigured));
    }
}
