// src/handlers/fleet_handler.rs
// One GET and one POST per fleet sub-tab, dispatched on the tab slug.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    models::fleet::{GeofenceRequest, GeofenceShape},
    state::AppState,
    utils::geo::LatLng,
    views::{
        self,
        fleet_panels::{self, FleetTab},
    },
};

/// Geofence body as posted by the dashboard form, or with a ready-made `shape`.
#[derive(Debug, Default, Deserialize)]
pub struct GeofenceForm {
    #[serde(default)]
    pub name: String,
    pub shape: Option<GeofenceShape>,
    pub kind: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_m: Option<f64>,
    #[serde(default)]
    pub vertices: Vec<String>,
    pub alert_on_enter: Option<bool>,
    pub alert_on_exit: Option<bool>,
}

fn parse_vertex(line: &str) -> FleetResult<LatLng> {
    let mut parts = line.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lng), None) => {
            let lat = lat
                .parse()
                .map_err(|_| AppError::validation_error("vertices", format!("Bad latitude in \"{}\"", line)))?;
            let lng = lng
                .parse()
                .map_err(|_| AppError::validation_error("vertices", format!("Bad longitude in \"{}\"", line)))?;
            Ok(LatLng::new(lat, lng))
        }
        _ => Err(AppError::validation_error(
            "vertices",
            format!("Expected \"lat,lng\", got \"{}\"", line),
        )),
    }
}

impl GeofenceForm {
    pub fn into_request(self) -> FleetResult<GeofenceRequest> {
        let shape = match (self.shape, self.kind.as_deref()) {
            (Some(shape), _) => shape,
            (None, Some("polygon")) => GeofenceShape::Polygon {
                vertices: self
                    .vertices
                    .iter()
                    .map(|line| parse_vertex(line))
                    .collect::<FleetResult<Vec<_>>>()?,
            },
            (None, Some("circle") | None) => match (self.lat, self.lng, self.radius_m) {
                (Some(lat), Some(lng), Some(radius_m)) => GeofenceShape::Circle {
                    center: LatLng::new(lat, lng),
                    radius_m,
                },
                _ => {
                    return Err(AppError::validation_error(
                        "shape",
                        "A circle needs a centre latitude, longitude and radius",
                    ))
                }
            },
            (None, Some(other)) => {
                return Err(AppError::validation_error(
                    "kind",
                    format!("Unknown geofence shape {}", other),
                ))
            }
        };
        Ok(GeofenceRequest {
            name: self.name,
            shape,
            alert_on_enter: self.alert_on_enter.unwrap_or(true),
            alert_on_exit: self.alert_on_exit.unwrap_or(true),
        })
    }
}

fn body<T: DeserializeOwned>(payload: Value) -> FleetResult<T> {
    serde_json::from_value(payload).map_err(|e| AppError::bad_request(e.to_string()))
}

pub async fn fleet_tab(
    State(state): State<Arc<AppState>>,
    Path(tab): Path<String>,
) -> Result<Html<String>, AppError> {
    let tab: FleetTab = tab.parse()?;
    let snapshot = state.fleet_service.snapshot().await;
    let drivers = state.store.list_drivers().await;
    let vehicles = state.store.list_vehicles().await;
    let body = fleet_panels::fleet_panel(tab, &snapshot, &drivers, &vehicles);
    Ok(Html(views::page(tab.title(), &body)))
}

pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Path(tab): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let fleet = &state.fleet_service;
    let record = match tab.parse::<FleetTab>()? {
        FleetTab::Geofences => {
            let form: GeofenceForm = body(payload)?;
            serde_json::to_value(fleet.create_geofence(form.into_request()?).await?)?
        }
        FleetTab::Assets => serde_json::to_value(fleet.create_asset(body(payload)?).await?)?,
        FleetTab::Dispatch => serde_json::to_value(fleet.create_dispatch(body(payload)?).await?)?,
        FleetTab::Inspections => serde_json::to_value(fleet.create_inspection(body(payload)?).await?)?,
        FleetTab::Fuel => serde_json::to_value(fleet.record_fuel(body(payload)?).await?)?,
        FleetTab::Energy => serde_json::to_value(fleet.track_ev(body(payload)?).await?)?,
    };
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_circle_form() {
        let form: GeofenceForm = serde_json::from_value(json!({
            "name": "Depot", "kind": "circle", "lat": 5.6, "lng": -0.18, "radius_m": 250,
            "alert_on_enter": true, "alert_on_exit": false
        }))
        .unwrap();
        let request = form.into_request().unwrap();
        assert!(matches!(request.shape, GeofenceShape::Circle { radius_m, .. } if radius_m == 250.0));
        assert!(!request.alert_on_exit);
    }

    #[test]
    fn test_polygon_vertices_parsed() {
        let form: GeofenceForm = serde_json::from_value(json!({
            "name": "Market", "kind": "polygon",
            "vertices": ["5.60, -0.19", "5.61,-0.19", "5.61,-0.18"]
        }))
        .unwrap();
        match form.into_request().unwrap().shape {
            GeofenceShape::Polygon { vertices } => {
                assert_eq!(vertices.len(), 3);
                assert_eq!(vertices[0], LatLng::new(5.60, -0.19));
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_vertex_rejected() {
        let form = GeofenceForm {
            name: "X".into(),
            kind: Some("polygon".into()),
            vertices: vec!["5.6".into()],
            ..GeofenceForm::default()
        };
        assert!(matches!(form.into_request(), Err(AppError::ValidationFailed(_))));
    }

    #[test]
    fn test_circle_needs_radius() {
        let form = GeofenceForm {
            name: "X".into(),
            lat: Some(5.6),
            lng: Some(-0.18),
            ..GeofenceForm::default()
        };
        assert!(form.into_request().is_err());
    }
}
