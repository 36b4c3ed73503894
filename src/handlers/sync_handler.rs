// src/handlers/sync_handler.rs
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing;

use crate::{
    errors::FleetError as AppError,
    services::{StoreSnapshot, SyncMode},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default = "default_mode")]
    pub mode: SyncMode,
    /// Incremental changes to send. A full sync always sends the whole store.
    #[serde(default)]
    pub data: Option<Value>,
}

fn default_mode() -> SyncMode {
    SyncMode::Full
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub mode: SyncMode,
    /// True when the server answered a full sync with a snapshot that replaced the store.
    pub reloaded: bool,
    pub server: Value,
}

pub async fn sync(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    let payload = match (request.mode, request.data) {
        (SyncMode::Incremental, Some(data)) => data,
        _ => serde_json::to_value(state.store.snapshot().await)?,
    };

    let server = state
        .sync_client
        .sync_to_server(&payload, request.mode)
        .await
        .map_err(|e| AppError::SyncFailed(e.to_string()))?;

    let mut reloaded = false;
    if request.mode == SyncMode::Full {
        if let Some(data) = server.get("data") {
            match serde_json::from_value::<StoreSnapshot>(data.clone()) {
                Ok(snapshot) => {
                    state.store.load(snapshot).await;
                    reloaded = true;
                }
                Err(e) => tracing::debug!("Full sync answer carries no store snapshot: {}", e),
            }
        }
    }

    Ok(Json(SyncResponse {
        mode: request.mode,
        reloaded,
        server,
    }))
}
