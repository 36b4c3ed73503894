// src/handlers/dashboard_handler.rs
use axum::{
    extract::{Path, State},
    response::Html,
};
use std::sync::Arc;

use crate::{
    errors::FleetError as AppError,
    state::AppState,
    views::{self, bin_modal, overview::Overview},
};

pub async fn overview(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let data = state.store.snapshot().await;
    let complaints = state.registration_service.complaint_queue().await?;
    let body = views::overview::overview(&Overview {
        bins: &data.bins,
        drivers: &data.drivers,
        routes: &data.routes,
        complaints: &complaints,
        fuel_levels: &data.fuel_levels,
    });
    Ok(Html(views::page("BinFleet", &body)))
}

/// Renders from stored values only; the page fetches the live sensor section itself.
pub async fn bin_modal(
    State(state): State<Arc<AppState>>,
    Path(bin_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let bin = state
        .store
        .get_bin(&bin_id)
        .await
        .ok_or_else(|| AppError::bin_not_found(&bin_id))?;
    let cached = state.sensor_service.cached_view(&bin_id).await?;
    let active_route = state
        .store
        .list_routes()
        .await
        .into_iter()
        .find(|r| r.status.is_active() && r.bin_ids.contains(&bin_id));

    let body = bin_modal::bin_modal(&bin, &cached, active_route.as_ref());
    Ok(Html(views::page(&format!("Bin {}", bin.id), &body)))
}

pub async fn bin_sensor(
    State(state): State<Arc<AppState>>,
    Path(bin_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let view = state.sensor_service.refresh_bin(&bin_id).await?;
    Ok(Html(bin_modal::sensor_section(&view)))
}
