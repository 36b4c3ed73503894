// src/handlers/route_handler.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use std::sync::Arc;
use tracing;

use crate::{
    errors::FleetError as AppError,
    models::{
        collection::{Collection, CollectionRequest},
        route::{AssignmentRequest, Route, RouteRequest, RouteStatusUpdate},
    },
    services::{DispatchOperations, OptimizeRequest, OptimizedRoute},
    state::AppState,
    views::{self, dispatch},
};

pub async fn assignment_form(
    State(state): State<Arc<AppState>>,
    Path(bin_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let bin = state
        .store
        .get_bin(&bin_id)
        .await
        .ok_or_else(|| AppError::bin_not_found(&bin_id))?;
    let candidates = state.dispatch_service.rank_drivers_for_bin(&bin_id).await?;
    let body = dispatch::assignment_modal(&bin, &candidates);
    Ok(Html(views::page(&format!("Assign {}", bin.id), &body)))
}

pub async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(bin_id): Path<String>,
    Json(payload): Json<AssignmentRequest>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    let route = state
        .dispatch_service
        .assign_driver_to_bin(&bin_id, payload, &state.config.operator)
        .await?;
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn route_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let bins = state.store.list_bins().await;
    let drivers = state.store.list_drivers().await;
    Html(views::page("New route", &dispatch::route_modal(&bins, &drivers)))
}

pub async fn create_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RouteRequest>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    let route = state
        .dispatch_service
        .create_route(payload, &state.config.operator)
        .await?;
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn update_route_status(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<String>,
    Json(payload): Json<RouteStatusUpdate>,
) -> Result<Json<Route>, AppError> {
    let route = state
        .dispatch_service
        .update_route_status(&route_id, payload)
        .await?;
    Ok(Json(route))
}

pub async fn driver_routes(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let routes = state
        .dispatch_service
        .active_routes_for_driver(&driver_id)
        .await?;
    let driver = state
        .store
        .get_driver(&driver_id)
        .await
        .ok_or_else(|| AppError::driver_not_found(&driver_id))?;
    let body = dispatch::driver_routes(&driver, &routes);
    Ok(Html(views::page(&format!("Routes for {}", driver.name), &body)))
}

pub async fn record_collection(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), AppError> {
    let collection = state.dispatch_service.record_collection(payload).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// Always answers 200: optimizer failures come back as an empty fallback route.
pub async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OptimizeRequest>,
) -> Json<OptimizedRoute> {
    let result = state.optimizer.optimize(payload).await;
    tracing::debug!(
        "Optimized route: {} stop(s), fallback {}",
        result.route.len(),
        result.fallback
    );
    Json(result)
}
