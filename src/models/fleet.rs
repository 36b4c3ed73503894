// src/models/fleet.rs
// Records behind the fleet sub-tabs: geofencing, assets, dispatch, inspections, fuel, energy.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::route::RoutePriority;
use crate::utils::geo::{self, LatLng};

/// State of charge below which an EV is flagged.
pub const LOW_CHARGE_PERCENT: f64 = 20.0;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GeofenceShape {
    Circle { center: LatLng, radius_m: f64 },
    Polygon { vertices: Vec<LatLng> },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Geofence {
    pub id: String,
    pub name: String,
    pub shape: GeofenceShape,
    pub alert_on_enter: bool,
    pub alert_on_exit: bool,
    pub created_at: DateTime<Utc>,
}

impl Geofence {
    pub fn contains(&self, point: LatLng) -> bool {
        match &self.shape {
            GeofenceShape::Circle { center, radius_m } => {
                geo::haversine_km(*center, point) * 1000.0 <= *radius_m
            }
            GeofenceShape::Polygon { vertices } => geo::polygon_contains(vertices, point),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeofenceRequest {
    pub name: String,
    pub shape: GeofenceShape,
    #[serde(default = "default_true")]
    pub alert_on_enter: bool,
    #[serde(default = "default_true")]
    pub alert_on_exit: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AssetStatus {
    InService,
    Spare,
    Repair,
    Disposed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub asset_type: String,       // e.g. "container", "compactor", "tablet"
    pub serial_number: Option<String>,
    pub assigned_to: Option<String>,
    pub status: AssetStatus,
    pub purchase_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetRequest {
    pub name: String,
    pub asset_type: String,
    pub serial_number: Option<String>,
    pub assigned_to: Option<String>,
    pub purchase_value: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Dispatched,
    Acknowledged,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Dispatch {
    pub id: String,
    pub driver_id: String,
    pub vehicle_id: Option<String>,
    pub destination: String,
    pub location: Option<LatLng>,
    pub priority: RoutePriority,
    pub status: DispatchStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub driver_id: String,
    pub vehicle_id: Option<String>,
    pub destination: String,
    pub location: Option<LatLng>,
    pub priority: Option<RoutePriority>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InspectionKind {
    PreTrip,
    PostTrip,
}

/// Driver Vehicle Inspection Report.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Inspection {
    pub id: String,
    pub vehicle_id: String,
    pub driver_id: String,
    pub kind: InspectionKind,
    pub odometer_km: Option<f64>,
    pub defects: Vec<String>,
    pub safe_to_operate: bool,
    pub work_order_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InspectionRequest {
    pub vehicle_id: String,
    pub driver_id: String,
    pub kind: InspectionKind,
    pub odometer_km: Option<f64>,
    #[serde(default)]
    pub defects: Vec<String>,
    pub safe_to_operate: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkOrderStatus {
    Open,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MaintenanceWorkOrder {
    pub id: String,
    pub vehicle_id: String,
    pub inspection_id: String,
    pub description: String,
    pub status: WorkOrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FuelTransaction {
    pub id: String,
    pub vehicle_id: String,
    pub driver_id: Option<String>,
    pub liters: f64,
    pub price_per_liter: f64,
    pub total_cost: f64,
    pub odometer_km: Option<f64>,
    pub station: Option<String>,
    /// Tank level after fuelling, as a percentage, when the driver reported it.
    pub tank_level_after: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FuelTransactionRequest {
    pub vehicle_id: String,
    pub driver_id: Option<String>,
    pub liters: f64,
    pub price_per_liter: f64,
    pub odometer_km: Option<f64>,
    pub station: Option<String>,
    pub tank_level_after: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvVehicle {
    pub id: String,
    pub vehicle_id: String,
    pub battery_capacity_kwh: f64,
    pub state_of_charge: f64,
    pub range_km: Option<f64>,
    pub charging: bool,
    pub updated_at: DateTime<Utc>,
}

impl EvVehicle {
    pub fn is_low_charge(&self) -> bool {
        self.state_of_charge < LOW_CHARGE_PERCENT
    }

    pub fn energy_remaining_kwh(&self) -> f64 {
        self.battery_capacity_kwh * self.state_of_charge / 100.0
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvVehicleRequest {
    pub vehicle_id: String,
    pub battery_capacity_kwh: f64,
    pub state_of_charge: f64,
    pub range_km: Option<f64>,
    #[serde(default)]
    pub charging: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence(shape: GeofenceShape) -> Geofence {
        Geofence {
            id: "geo_1".into(),
            name: "Depot".into(),
            shape,
            alert_on_enter: true,
            alert_on_exit: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_circle_geofence() {
        let depot = fence(GeofenceShape::Circle {
            center: LatLng::new(5.6037, -0.1870),
            radius_m: 500.0,
        });
        assert!(depot.contains(LatLng::new(5.6040, -0.1872)));
        assert!(!depot.contains(LatLng::new(5.65, -0.1870)));
    }

    #[test]
    fn test_shape_wire_format() {
        let json = serde_json::json!({
            "kind": "polygon",
            "vertices": [{"lat": 0.0, "lng": 0.0}, {"lat": 0.0, "lng": 1.0}, {"lat": 1.0, "lng": 1.0}]
        });
        let shape: GeofenceShape = serde_json::from_value(json).unwrap();
        assert!(matches!(shape, GeofenceShape::Polygon { ref vertices } if vertices.len() == 3));
    }

    #[test]
    fn test_ev_low_charge() {
        let ev = EvVehicle {
            id: "ev_1".into(),
            vehicle_id: "veh_1".into(),
            battery_capacity_kwh: 200.0,
            state_of_charge: 15.0,
            range_km: None,
            charging: false,
            updated_at: Utc::now(),
        };
        assert!(ev.is_low_charge());
        assert_eq!(ev.energy_remaining_kwh(), 30.0);
    }
}
