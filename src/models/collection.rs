use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fill level a sensor must report after a pickup for it to count as verified.
pub const VERIFIED_MAX_FILL: f64 = 25.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    SensorVerified,
    PendingSensor,
    SensorRejected,
    NoSensor,
}

impl Verification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verification::SensorVerified => "sensor_verified",
            Verification::PendingSensor => "pending_sensor",
            Verification::SensorRejected => "sensor_rejected",
            Verification::NoSensor => "no_sensor",
        }
    }

    /// Outcome of a pending collection once the sensor reports again.
    pub fn from_post_collection_fill(fill: f64) -> Self {
        if fill <= VERIFIED_MAX_FILL {
            Verification::SensorVerified
        } else {
            Verification::SensorRejected
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Collection {
    pub id: String,
    pub bin_id: String,
    pub driver_id: String,
    pub route_id: Option<String>,
    pub fill_before: f64,
    pub fill_after: f64,
    pub weight_kg: Option<f64>,
    pub temperature: Option<f64>,
    pub verification: Verification,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub bin_id: String,
    pub driver_id: String,
    pub route_id: Option<String>,
    pub weight_kg: Option<f64>,
    pub fill_after: Option<f64>,
}
