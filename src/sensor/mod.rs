//! Sensor vendor integration: payload decoding, best-effort field extraction, calibration.

pub mod calibration;
pub mod client;
pub mod decode;
pub mod extract;

pub use calibration::Calibration;
pub use client::{FindyClient, FindyConfig, SensorClient, SensorError, UnconfiguredSensorClient};
pub use decode::DevicePayload;
pub use extract::{
    Confidence, ExtractedReadings, ExtractorConfig, FieldReading, MeasurementExtractor, SensorField,
};
