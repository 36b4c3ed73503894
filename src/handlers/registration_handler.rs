// src/handlers/registration_handler.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    errors::FleetError as AppError,
    models::{
        complaint::{Complaint, ComplaintRequest, Issue, IssueRequest},
        driver::{Driver, DriverLocationUpdate, DriverRegistration, Location, Vehicle, VehicleRegistration},
    },
    services::RegistrationOperations,
    state::AppState,
    views::{self, forms},
};

#[derive(Debug, Deserialize)]
pub struct ComplaintFormQuery {
    pub bin_id: Option<String>,
}

pub async fn complaint_form(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ComplaintFormQuery>,
) -> Html<String> {
    let bins = state.store.list_bins().await;
    let body = forms::complaint_form(&bins, query.bin_id.as_deref());
    Html(views::page("File a complaint", &body))
}

pub async fn submit_complaint(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ComplaintRequest>,
) -> Result<(StatusCode, Json<Complaint>), AppError> {
    let complaint = state.registration_service.submit_complaint(payload).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

pub async fn issue_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let bins = state.store.list_bins().await;
    let vehicles = state.store.list_vehicles().await;
    Html(views::page("Report an issue", &forms::issue_form(&bins, &vehicles)))
}

pub async fn report_issue(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IssueRequest>,
) -> Result<(StatusCode, Json<Issue>), AppError> {
    let issue = state.registration_service.report_issue(payload).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn driver_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let vehicles = state.store.list_vehicles().await;
    Html(views::page("Register driver", &forms::driver_form(&vehicles)))
}

pub async fn register_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DriverRegistration>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let driver = state.registration_service.register_driver(payload).await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Json(location): Json<Location>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .registration_service
        .update_driver_location(DriverLocationUpdate { driver_id, location })
        .await?;
    Ok(Json(driver))
}

pub async fn vehicle_form() -> Html<String> {
    Html(views::page("Register vehicle", &forms::vehicle_form()))
}

pub async fn register_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VehicleRegistration>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let vehicle = state.registration_service.register_vehicle(payload).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}
