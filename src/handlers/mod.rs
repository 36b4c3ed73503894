// src/handlers/mod.rs
pub mod dashboard_handler;
pub mod error_handler;
pub mod fleet_handler;
pub mod registration_handler;
pub mod report_handler;
pub mod route_handler;
pub mod sync_handler;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(dashboard_handler::overview))
        .route("/bins/:id/modal", get(dashboard_handler::bin_modal))
        .route("/bins/:id/sensor", get(dashboard_handler::bin_sensor))
        .route(
            "/bins/:id/assign",
            get(route_handler::assignment_form).post(route_handler::assign_driver),
        )
        .route("/routes/new", get(route_handler::route_form))
        .route("/routes", post(route_handler::create_route))
        .route("/routes/:id/status", post(route_handler::update_route_status))
        .route("/drivers/:id/routes", get(route_handler::driver_routes))
        .route("/collections", post(route_handler::record_collection))
        .route("/optimize", post(route_handler::optimize))
        .route("/complaints", post(registration_handler::submit_complaint))
        .route("/complaints/new", get(registration_handler::complaint_form))
        .route("/issues", post(registration_handler::report_issue))
        .route("/issues/new", get(registration_handler::issue_form))
        .route("/drivers", post(registration_handler::register_driver))
        .route("/drivers/new", get(registration_handler::driver_form))
        .route("/drivers/:id/location", post(registration_handler::update_location))
        .route("/vehicles", post(registration_handler::register_vehicle))
        .route("/vehicles/new", get(registration_handler::vehicle_form))
        .route("/reports/bins/:id", get(report_handler::bin_report))
        .route("/reports/drivers/:id", get(report_handler::driver_report))
        .route("/reports/system", get(report_handler::system_report))
        .route("/export", get(report_handler::export))
        .route(
            "/fleet/:tab",
            get(fleet_handler::fleet_tab).post(fleet_handler::create_record),
        )
        .route(
            "/errors",
            get(error_handler::error_panel).delete(error_handler::clear_errors),
        )
        .route("/sync", post(sync_handler::sync))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
