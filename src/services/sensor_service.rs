// src/services/sensor_service.rs
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    models::bin::{Bin, BinStatus},
    sensor::{
        Calibration, Confidence, ExtractedReadings, FieldReading, MeasurementExtractor, SensorClient,
        SensorError, SensorField,
    },
    services::data_service::DataStore,
};

/// Rendered in place of any value that is not known.
pub const UNAVAILABLE: &str = "—";

/// What the bin modal shows in its sensor section.
#[derive(Debug, Clone, Serialize)]
pub struct BinSensorView {
    pub bin_id: String,
    pub imei: Option<String>,
    pub device_name: Option<String>,
    /// True when at least one value came from a live vendor report.
    pub live: bool,
    pub readings: ExtractedReadings,
    pub last_report: Option<DateTime<Utc>>,
    pub degraded_reason: Option<String>,
}

impl BinSensorView {
    pub fn fill_percent(&self) -> Option<f64> {
        self.readings.fill.as_ref().map(|r| r.value)
    }

    /// Display string for one field, `UNAVAILABLE` when unknown.
    pub fn display(&self, field: SensorField) -> String {
        match self.readings.get(field) {
            Some(reading) => format_reading(field, reading),
            None => UNAVAILABLE.to_string(),
        }
    }
}

pub fn format_reading(field: SensorField, reading: &FieldReading) -> String {
    let value = match field {
        SensorField::Fill | SensorField::Battery => format!("{:.0}%", reading.value),
        SensorField::Temperature => format!("{:.1}°C", reading.value),
        SensorField::Signal => format!("{:.0}", reading.value),
        SensorField::Tilt => format!("{:.0}°", reading.value),
    };
    match &reading.label {
        Some(label) if field != SensorField::Fill => format!("{} ({})", value, label),
        _ => value,
    }
}

fn stored(value: f64, source: &str) -> FieldReading {
    FieldReading {
        value,
        label: None,
        confidence: Confidence::Stored,
        source: source.to_string(),
        distance_cm: None,
        timestamp: None,
    }
}

/// Readings as last stored on the bin.
pub fn stored_readings(bin: &Bin) -> ExtractedReadings {
    let data = &bin.sensor_data;
    ExtractedReadings {
        fill: Some(FieldReading {
            distance_cm: data.distance_cm,
            timestamp: data.last_reading_at,
            ..stored(bin.fill_level, "stored")
        }),
        battery: data.battery.map(|v| stored(v, "stored")),
        temperature: data.temperature.map(|v| stored(v, "stored")),
        signal: data.signal.map(|v| stored(v, "stored")),
        tilt: data.tilt.map(|v| stored(v, "stored")),
    }
}

pub struct SensorService {
    store: Arc<DataStore>,
    client: Arc<dyn SensorClient>,
    extractor: MeasurementExtractor,
    defaults: Calibration,
}

impl SensorService {
    pub fn new(
        store: Arc<DataStore>,
        client: Arc<dyn SensorClient>,
        extractor: MeasurementExtractor,
        defaults: Calibration,
    ) -> Self {
        Self {
            store,
            client,
            extractor,
            defaults,
        }
    }

    /// Cached view, no vendor call.
    pub async fn cached_view(&self, bin_id: &str) -> FleetResult<BinSensorView> {
        let bin = self
            .store
            .get_bin(bin_id)
            .await
            .ok_or_else(|| AppError::bin_not_found(bin_id))?;
        Ok(Self::fallback_view(&bin, None))
    }

    fn fallback_view(bin: &Bin, reason: Option<String>) -> BinSensorView {
        BinSensorView {
            bin_id: bin.id.clone(),
            imei: bin.sensor_imei.clone(),
            device_name: bin.sensor_data.name.clone(),
            live: false,
            readings: stored_readings(bin),
            last_report: bin.sensor_data.last_reading_at,
            degraded_reason: reason,
        }
    }

    /// Fetches the bin's device and folds whatever could be recovered into the store.
    /// Vendor failures degrade to the stored values and never surface as errors.
    pub async fn refresh_bin(&self, bin_id: &str) -> FleetResult<BinSensorView> {
        let bin = self
            .store
            .get_bin(bin_id)
            .await
            .ok_or_else(|| AppError::bin_not_found(bin_id))?;

        let Some(imei) = bin.sensor_imei.clone().filter(|s| !s.trim().is_empty()) else {
            tracing::debug!("Bin {} has no sensor, using stored values", bin_id);
            return Ok(Self::fallback_view(&bin, Some("no sensor attached".to_string())));
        };

        let device = match self.client.get_device(&imei).await {
            Ok(device) => device,
            Err(SensorError::NotConfigured) => {
                tracing::warn!("Findy not configured");
                return Ok(Self::fallback_view(&bin, Some(SensorError::NotConfigured.to_string())));
            }
            Err(e) => {
                tracing::warn!("Sensor refresh failed for bin {}: {}", bin_id, e);
                return Ok(Self::fallback_view(&bin, Some(e.to_string())));
            }
        };

        let live = self
            .extractor
            .extract(&device.measurement, bin.calibration(self.defaults));
        if live.is_empty() {
            tracing::warn!("No usable readings in device {} for bin {}", imei, bin_id);
        }

        let mut readings = stored_readings(&bin);
        for field in SensorField::ALL {
            if let Some(reading) = live.get(field) {
                readings.set(field, Some(reading.clone()));
            }
        }

        let last_report = device.last_report.or_else(|| {
            SensorField::ALL
                .iter()
                .filter_map(|f| live.get(*f).and_then(|r| r.timestamp))
                .max()
        });

        self.apply_readings(&bin, &live, device.name.clone(), last_report).await?;

        Ok(BinSensorView {
            bin_id: bin.id.clone(),
            imei: Some(imei),
            device_name: device.name.or(bin.sensor_data.name.clone()),
            live: !live.is_empty(),
            readings,
            last_report,
            degraded_reason: None,
        })
    }

    async fn apply_readings(
        &self,
        bin: &Bin,
        live: &ExtractedReadings,
        device_name: Option<String>,
        last_report: Option<DateTime<Utc>>,
    ) -> FleetResult<()> {
        if live.is_empty() {
            return Ok(());
        }
        let fill = live.fill.as_ref().map(|r| r.value);
        let on_route = self.store.bin_on_active_route(&bin.id).await;

        let updated = self
            .store
            .update_bin(&bin.id, |b| {
                let data = &mut b.sensor_data;
                if let Some(r) = &live.battery {
                    data.battery = Some(r.value);
                }
                if let Some(r) = &live.temperature {
                    data.temperature = Some(r.value);
                }
                if let Some(r) = &live.signal {
                    data.signal = Some(r.value);
                }
                if let Some(r) = &live.tilt {
                    data.tilt = Some(r.value);
                }
                if let Some(r) = &live.fill {
                    data.distance_cm = r.distance_cm.or(data.distance_cm);
                }
                if device_name.is_some() {
                    data.name = device_name;
                }
                data.last_reading_at = last_report.or(Some(Utc::now()));

                if let Some(fill) = fill {
                    b.fill_level = fill;
                    b.status = match b.status {
                        BinStatus::Maintenance => BinStatus::Maintenance,
                        _ if on_route => b.assigned_status(),
                        _ => b.idle_status(),
                    };
                }
            })
            .await?;

        tracing::info!(
            "Bin {} refreshed from sensor: fill {:.0}%, status {}",
            updated.id,
            updated.fill_level,
            updated.status.as_str()
        );

        if let Some(fill) = fill {
            self.store.resolve_pending_collections(&bin.id, fill).await;
        }
        Ok(())
    }

    /// Refreshes every bin with a sensor concurrently. Returns the views that could be built.
    pub async fn refresh_all(&self) -> Vec<BinSensorView> {
        let bins: Vec<Bin> = self
            .store
            .list_bins()
            .await
            .into_iter()
            .filter(|b| b.sensor_imei.is_some())
            .collect();
        tracing::info!("Refreshing {} sensor-equipped bin(s)", bins.len());

        let results = join_all(bins.iter().map(|b| self.refresh_bin(&b.id))).await;
        results
            .into_iter()
            .filter_map(|r| match r {
                Ok(view) => Some(view),
                Err(e) => {
                    tracing::warn!("Bin refresh skipped: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{DevicePayload, UnconfiguredSensorClient};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct StaticClient(Value);

    #[async_trait]
    impl SensorClient for StaticClient {
        async fn get_device(&self, imei: &str) -> Result<DevicePayload, SensorError> {
            Ok(DevicePayload {
                imei: Some(imei.to_string()),
                name: Some("Ultrasonic 1".to_string()),
                measurement: self.0.clone(),
                last_report: None,
            })
        }
    }

    async fn store_with_bin(imei: Option<&str>) -> Arc<DataStore> {
        let store = Arc::new(DataStore::new());
        let mut bin = Bin::new("BIN-001", 5.6, -0.18);
        bin.fill_level = 60.0;
        bin.sensor_imei = imei.map(str::to_string);
        bin.sensor_distance_empty_cm = Some(200.0);
        bin.sensor_distance_full_cm = Some(0.0);
        bin.sensor_data.battery = Some(77.0);
        store.upsert_bin(bin).await;
        store
    }

    fn service(store: Arc<DataStore>, client: Arc<dyn SensorClient>) -> SensorService {
        SensorService::new(store, client, MeasurementExtractor::default(), Calibration::default())
    }

    #[tokio::test]
    async fn test_distance_reading_becomes_fill() {
        let store = store_with_bin(Some("860000")).await;
        let client = Arc::new(StaticClient(json!({
            "ultrasonic": {
                "value": 150,
                "dataType": { "name": "Distance", "datatypeID": 488 },
                "timestamp": "2026-03-01T08:00:00Z",
                "reportID": 91
            }
        })));
        let view = service(store.clone(), client).refresh_bin("BIN-001").await.unwrap();

        assert!(view.live);
        assert_eq!(view.display(SensorField::Fill), "25%");
        let bin = store.get_bin("BIN-001").await.unwrap();
        assert_eq!(bin.fill_level, 25.0);
        assert_eq!(bin.sensor_data.distance_cm, Some(150.0));
    }

    #[tokio::test]
    async fn test_emptier_reading_keeps_routed_bin_assigned() {
        use crate::models::route::{Route, RoutePriority, RouteStatus};

        let store = store_with_bin(Some("860000")).await;
        store
            .update_bin("BIN-001", |b| {
                b.fill_level = 90.0;
                b.status = BinStatus::Critical;
            })
            .await
            .unwrap();
        let now = Utc::now();
        store
            .insert_route(Route {
                id: "route_1".into(),
                driver_id: "D1".into(),
                bin_ids: vec!["BIN-001".into()],
                bin_details: vec![],
                priority: RoutePriority::Urgent,
                status: RouteStatus::Pending,
                assigned_by: None,
                notes: None,
                estimated_distance_km: None,
                created_at: now,
                started_at: None,
                completed_at: None,
                cancelled_at: None,
                updated_at: now,
                persisted: false,
            })
            .await;

        let client = Arc::new(StaticClient(json!({
            "ultrasonic": { "value": 150, "dataType": { "name": "Distance" } }
        })));
        service(store.clone(), client).refresh_bin("BIN-001").await.unwrap();

        let bin = store.get_bin("BIN-001").await.unwrap();
        assert_eq!(bin.fill_level, 25.0);
        assert_eq!(bin.status, BinStatus::Assigned);
    }

    #[tokio::test]
    async fn test_vendor_failure_falls_back_to_stored() {
        let store = store_with_bin(Some("860000")).await;
        let view = service(store, Arc::new(UnconfiguredSensorClient))
            .refresh_bin("BIN-001")
            .await
            .unwrap();

        assert!(!view.live);
        assert_eq!(view.display(SensorField::Fill), "60%");
        assert_eq!(view.display(SensorField::Battery), "77%");
        assert_eq!(view.display(SensorField::Temperature), UNAVAILABLE);
        assert_eq!(view.degraded_reason.as_deref(), Some("Findy not configured"));
    }

    #[tokio::test]
    async fn test_unknown_bin() {
        let store = Arc::new(DataStore::new());
        let result = service(store, Arc::new(UnconfiguredSensorClient)).refresh_bin("nope").await;
        assert!(matches!(result, Err(AppError::BinNotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_all_skips_bins_without_sensor() {
        let store = store_with_bin(None).await;
        let mut other = Bin::new("BIN-002", 5.61, -0.19);
        other.sensor_imei = Some("1".into());
        store.upsert_bin(other).await;

        let views = service(store, Arc::new(StaticClient(json!({})))).refresh_all().await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].bin_id, "BIN-002");
    }

    #[test]
    fn test_temperature_label_in_display() {
        let reading = FieldReading {
            value: 48.0,
            label: Some("PCB".into()),
            confidence: Confidence::High,
            source: "PCB Temperature".into(),
            distance_cm: None,
            timestamp: None,
        };
        assert_eq!(format_reading(SensorField::Temperature, &reading), "48.0°C (PCB)");
    }
}
