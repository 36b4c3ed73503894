// src/handlers/report_handler.rs
// Printable reports and the JSON export download.
use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tracing;

use crate::{errors::FleetError as AppError, reports, state::AppState};

pub async fn bin_report(
    State(state): State<Arc<AppState>>,
    Path(bin_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let report = reports::bin_report(&state.store, &bin_id, &state.config.operator).await?;
    Ok(Html(reports::render(&report)))
}

pub async fn driver_report(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let report = reports::driver_report(&state.store, &driver_id, &state.config.operator).await?;
    Ok(Html(reports::render(&report)))
}

pub async fn system_report(State(state): State<Arc<AppState>>) -> Html<String> {
    let report = reports::system_report(&state.store, &state.fleet_service, &state.config.operator).await;
    Html(reports::render(&report))
}

pub async fn export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let document = reports::export_document(&state.store, &state.fleet_service, &state.config.operator).await;
    let body = document.to_json()?;
    tracing::info!("Export {} generated by {}", document.export_id, document.exported_by);
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.file_name()),
            ),
        ],
        body,
    ))
}
