// src/handlers/error_handler.rs
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    errors::FleetError as AppError,
    state::AppState,
    views::{self, error_panel},
};

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub limit: Option<usize>,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

pub async fn error_panel(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ErrorQuery>,
) -> Html<String> {
    let server = state
        .error_log
        .fetch(query.limit.unwrap_or(DEFAULT_LIMIT), query.user_id.as_deref())
        .await
        .map_err(|e| e.to_string());
    let local = state.recent_errors.entries();
    Html(views::page("Errors", &error_panel::error_panel(&server, &local)))
}

/// Clears both the remote client log and the errors kept in memory.
pub async fn clear_errors(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
    state.recent_errors.clear();
    state.error_log.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}
