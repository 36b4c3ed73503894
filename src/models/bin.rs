// src/models/bin.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensor::calibration::Calibration;
use crate::utils::geo::LatLng;

/// Fill level at or above which a bin is treated as critical.
pub const CRITICAL_FILL_LEVEL: f64 = 85.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BinStatus {
    Active,      // In service, nothing scheduled
    Assigned,    // On a pending or running route
    Critical,    // Full enough to need priority collection
    Collected,   // Emptied, waiting for the next sensor report
    Offline,     // Sensor silent
    Maintenance,
}

impl BinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinStatus::Active => "active",
            BinStatus::Assigned => "assigned",
            BinStatus::Critical => "critical",
            BinStatus::Collected => "collected",
            BinStatus::Offline => "offline",
            BinStatus::Maintenance => "maintenance",
        }
    }
}

/// Last known sensor values. Every field is optional; absent means "never reported".
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SensorData {
    pub battery: Option<f64>,
    pub temperature: Option<f64>,
    pub signal: Option<f64>,
    pub tilt: Option<f64>,
    pub distance_cm: Option<f64>,
    pub name: Option<String>,
    pub last_reading_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bin {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
    pub fill_level: f64,
    pub sensor_imei: Option<String>,
    #[serde(default)]
    pub sensor_data: SensorData,
    pub status: BinStatus,
    pub capacity_liters: f64,
    pub sensor_distance_empty_cm: Option<f64>,
    pub sensor_distance_full_cm: Option<f64>,
    pub last_collected_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Bin {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lng,
            address: None,
            fill_level: 0.0,
            sensor_imei: None,
            sensor_data: SensorData::default(),
            status: BinStatus::Active,
            capacity_liters: 240.0,
            sensor_distance_empty_cm: None,
            sensor_distance_full_cm: None,
            last_collected_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn position(&self) -> Option<LatLng> {
        let p = LatLng::new(self.lat, self.lng);
        p.is_valid().then_some(p)
    }

    pub fn is_critical(&self) -> bool {
        self.fill_level >= CRITICAL_FILL_LEVEL
    }

    /// Per-bin calibration where stored, the supplied defaults otherwise.
    pub fn calibration(&self, defaults: Calibration) -> Calibration {
        Calibration::new(
            self.sensor_distance_empty_cm.unwrap_or(defaults.empty_cm),
            self.sensor_distance_full_cm.unwrap_or(defaults.full_cm),
        )
        .unwrap_or(defaults)
    }

    /// Status a bin should return to when it is not on a route.
    pub fn idle_status(&self) -> BinStatus {
        if self.is_critical() {
            BinStatus::Critical
        } else {
            BinStatus::Active
        }
    }

    /// Status a bin takes when it is put on a route.
    pub fn assigned_status(&self) -> BinStatus {
        if self.is_critical() {
            BinStatus::Critical
        } else {
            BinStatus::Assigned
        }
    }
}
