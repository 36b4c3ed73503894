// src/models/driver.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::geo::LatLng;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MovementStatus {
    Offline,     // Not on shift
    Stationary,  // On shift, not moving
    Moving,      // On shift, moving without a route
    OnRoute,     // Working a route
    OnBreak,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleType {
    RearLoader,
    SideLoader,
    FrontLoader,
    Compactor,
    Pickup,
    Van,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Diesel,
    Petrol,
    Cng,
    Electric,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleStatus {
    Available,
    InService,
    Maintenance,
    Retired,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Vehicle {
    pub id: String,
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    pub fuel_type: FuelType,
    pub capacity_kg: f32,  // Maximum payload in kilograms
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,  // Accuracy in meters
    pub heading: Option<f64>,   // Direction in degrees (0-360)
    pub speed: Option<f64>,     // Speed in km/h
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Location {
    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub license_number: Option<String>,
    pub vehicle_id: Option<String>,
    pub status: MovementStatus,
    pub current_location: Option<Location>,
    pub rating: f32,            // Average rating (0-5)
    pub total_collections: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone_number: None,
            license_number: None,
            vehicle_id: None,
            status: MovementStatus::Stationary,
            current_location: None,
            rating: 0.0,
            total_collections: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Usable position, if the driver has reported a valid one.
    pub fn position(&self) -> Option<LatLng> {
        self.current_location
            .as_ref()
            .map(Location::lat_lng)
            .filter(LatLng::is_valid)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverRegistration {
    pub name: String,
    pub phone_number: Option<String>,
    pub license_number: Option<String>,
    pub vehicle_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleRegistration {
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    pub fuel_type: FuelType,
    pub capacity_kg: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverLocationUpdate {
    pub driver_id: String,
    pub location: Location,
}

/// A driver as offered in the assignment modal, ranked against one bin.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DriverCandidate {
    pub driver_id: String,
    pub name: String,
    pub distance_km: f64,
    pub has_location: bool,
    pub rating: f32,
    pub fuel_level: Option<f64>,
    pub active_routes: usize,
    pub status: MovementStatus,
    pub recommended: bool,
}
