// src/services/error_log_service.rs
// Client error log kept by the dashboard API, fetched for the error panel.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    logging::NoiseFilter,
};

const ERRORS_PATH: &str = "/api/errors/client";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientErrorEntry {
    #[serde(default)]
    pub id: Option<Value>,
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorListBody {
    List(Vec<ClientErrorEntry>),
    Wrapped { errors: Vec<ClientErrorEntry> },
}

pub struct ErrorLogClient {
    origins: Vec<String>,
    client: reqwest::Client,
    filter: NoiseFilter,
}

impl ErrorLogClient {
    /// `origins` are tried in order; the configured API base goes first.
    pub fn new(origins: Vec<String>, filter: NoiseFilter) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let mut deduped: Vec<String> = Vec::new();
        for origin in origins {
            let origin = origin.trim().trim_end_matches('/').to_string();
            if !origin.is_empty() && !deduped.contains(&origin) {
                deduped.push(origin);
            }
        }
        Self {
            origins: deduped,
            client,
            filter,
        }
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// Recent client errors with known-benign noise removed.
    pub async fn fetch(&self, limit: usize, user_id: Option<&str>) -> FleetResult<Vec<ClientErrorEntry>> {
        let limit = limit.to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(user_id) = user_id {
            query.push(("userId", user_id));
        }

        for origin in &self.origins {
            let url = format!("{}{}", origin, ERRORS_PATH);
            let response = match self.client.get(&url).query(&query).send().await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    tracing::debug!("Error log origin {} answered {}", url, response.status());
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Error log origin {} failed: {}", url, e);
                    continue;
                }
            };

            let entries = match response.json::<ErrorListBody>().await {
                Ok(ErrorListBody::List(entries)) | Ok(ErrorListBody::Wrapped { errors: entries }) => entries,
                Err(e) => {
                    tracing::warn!("Error log at {} returned an unreadable body: {}", origin, e);
                    continue;
                }
            };

            let total = entries.len();
            let kept: Vec<ClientErrorEntry> = entries
                .into_iter()
                .filter(|entry| !self.filter.is_suppressed(&entry.message))
                .collect();
            tracing::debug!("Error log: {} of {} entries kept from {}", kept.len(), total, origin);
            return Ok(kept);
        }

        Err(AppError::ServiceUnavailable("client error log".to_string()))
    }

    pub async fn clear(&self) -> FleetResult<()> {
        for origin in &self.origins {
            let url = format!("{}{}", origin, ERRORS_PATH);
            match self.client.delete(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Client error log cleared at {}", origin);
                    return Ok(());
                }
                Ok(response) => tracing::debug!("Error log clear at {} answered {}", url, response.status()),
                Err(e) => tracing::debug!("Error log clear at {} failed: {}", url, e),
            }
        }
        Err(AppError::ServiceUnavailable("client error log".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_filters_noise() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ERRORS_PATH))
            .and(query_param("limit", "50"))
            .and(query_param("userId", "u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [
                    { "message": "Findy not configured" },
                    { "message": "Unexpected crash: X", "userId": "u1" }
                ]
            })))
            .mount(&server)
            .await;

        let client = ErrorLogClient::new(vec![server.uri()], NoiseFilter::default());
        let entries = client.fetch(50, Some("u1")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Unexpected crash: X");
        assert_eq!(entries[0].user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_falls_through_to_next_origin() {
        let broken = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&broken)
            .await;
        let working = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ERRORS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "message": "boom" }])))
            .mount(&working)
            .await;

        let client = ErrorLogClient::new(vec![broken.uri(), working.uri()], NoiseFilter::default());
        assert_eq!(client.fetch(10, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ErrorLogClient::new(vec![server.uri()], NoiseFilter::default());
        assert!(matches!(client.clear().await, Err(AppError::ServiceUnavailable(_))));
    }

    #[test]
    fn test_origins_deduplicated() {
        let client = ErrorLogClient::new(
            vec!["http://a/".into(), "http://a".into(), " ".into(), "http://b".into()],
            NoiseFilter::default(),
        );
        assert_eq!(client.origins(), &["http://a".to_string(), "http://b".to_string()]);
    }
}
