// src/services/fleet_service.rs
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    models::{
        driver::VehicleStatus,
        fleet::{
            Asset, AssetRequest, AssetStatus, Dispatch, DispatchRequest, DispatchStatus, EvVehicle,
            EvVehicleRequest, FuelTransaction, FuelTransactionRequest, Geofence, GeofenceRequest,
            GeofenceShape, Inspection, InspectionRequest, MaintenanceWorkOrder, WorkOrderStatus,
        },
        route::RoutePriority,
    },
    services::{
        data_service::DataStore,
        sync_service::{SyncClient, SyncMode},
    },
    utils::{
        geo::LatLng,
        id_generator::{IdGenerator, IdType},
    },
    ValidationError,
};

/// Called after a record is appended. Failures are logged and never undo the append.
#[async_trait]
pub trait SaveHook: Send + Sync {
    async fn save(&self, collection: &str, record: Value) -> FleetResult<()>;
}

/// Pushes each new record to the server as an incremental sync.
pub struct SyncSaveHook {
    sync: Arc<dyn SyncClient>,
}

impl SyncSaveHook {
    pub fn new(sync: Arc<dyn SyncClient>) -> Self {
        Self { sync }
    }
}

#[async_trait]
impl SaveHook for SyncSaveHook {
    async fn save(&self, collection: &str, record: Value) -> FleetResult<()> {
        let mut payload = serde_json::Map::new();
        payload.insert(collection.to_string(), Value::Array(vec![record]));
        self.sync
            .sync_to_server(&Value::Object(payload), SyncMode::Incremental)
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub geofences: Vec<Geofence>,
    pub assets: Vec<Asset>,
    pub dispatches: Vec<Dispatch>,
    pub inspections: Vec<Inspection>,
    pub work_orders: Vec<MaintenanceWorkOrder>,
    pub fuel_transactions: Vec<FuelTransaction>,
    pub ev_vehicles: Vec<EvVehicle>,
}

pub struct FleetService {
    store: Arc<DataStore>,
    save_hook: Option<Arc<dyn SaveHook>>,
    geofences: RwLock<Vec<Geofence>>,
    assets: RwLock<Vec<Asset>>,
    dispatches: RwLock<Vec<Dispatch>>,
    inspections: RwLock<Vec<Inspection>>,
    work_orders: RwLock<Vec<MaintenanceWorkOrder>>,
    fuel_transactions: RwLock<Vec<FuelTransaction>>,
    ev_vehicles: RwLock<Vec<EvVehicle>>,
}

fn required(errors: &mut Vec<ValidationError>, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!("{} is required", label),
        });
    }
}

fn invalid(errors: &mut Vec<ValidationError>, field: &str, message: &str) {
    errors.push(ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    });
}

impl FleetService {
    pub fn new(store: Arc<DataStore>, save_hook: Option<Arc<dyn SaveHook>>) -> Self {
        Self {
            store,
            save_hook,
            geofences: RwLock::new(Vec::new()),
            assets: RwLock::new(Vec::new()),
            dispatches: RwLock::new(Vec::new()),
            inspections: RwLock::new(Vec::new()),
            work_orders: RwLock::new(Vec::new()),
            fuel_transactions: RwLock::new(Vec::new()),
            ev_vehicles: RwLock::new(Vec::new()),
        }
    }

    async fn persist<T: Serialize>(&self, collection: &str, record: &T) {
        let Some(hook) = &self.save_hook else {
            return;
        };
        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Could not serialize {} record: {}", collection, e);
                return;
            }
        };
        if let Err(e) = hook.save(collection, value).await {
            tracing::warn!("Saving {} record failed, kept in memory: {}", collection, e);
        }
    }

    pub async fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            geofences: self.list_geofences().await,
            assets: self.list_assets().await,
            dispatches: self.list_dispatches().await,
            inspections: self.list_inspections().await,
            work_orders: self.list_work_orders().await,
            fuel_transactions: self.list_fuel_transactions().await,
            ev_vehicles: self.list_ev_vehicles().await,
        }
    }

    // Geofencing

    pub async fn create_geofence(&self, request: GeofenceRequest) -> FleetResult<Geofence> {
        let mut errors = Vec::new();
        required(&mut errors, "name", &request.name, "Name");
        match &request.shape {
            GeofenceShape::Circle { center, radius_m } => {
                if !center.is_valid() {
                    invalid(&mut errors, "center", "Center coordinates are invalid");
                }
                if !(radius_m.is_finite() && *radius_m > 0.0) {
                    invalid(&mut errors, "radius_m", "Radius must be positive");
                }
            }
            GeofenceShape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    invalid(&mut errors, "vertices", "A polygon needs at least three points");
                }
                if vertices.iter().any(|v| !v.is_valid()) {
                    invalid(&mut errors, "vertices", "Polygon contains invalid coordinates");
                }
            }
        }
        AppError::check(errors)?;

        let geofence = Geofence {
            id: IdGenerator::generate(IdType::Geofence),
            name: request.name.trim().to_string(),
            shape: request.shape,
            alert_on_enter: request.alert_on_enter,
            alert_on_exit: request.alert_on_exit,
            created_at: Utc::now(),
        };
        self.geofences.write().await.push(geofence.clone());
        tracing::info!("Geofence {} created: {}", geofence.id, geofence.name);
        self.persist("geofences", &geofence).await;
        Ok(geofence)
    }

    pub async fn list_geofences(&self) -> Vec<Geofence> {
        self.geofences.read().await.clone()
    }

    pub async fn geofences_containing(&self, point: LatLng) -> Vec<Geofence> {
        self.geofences
            .read()
            .await
            .iter()
            .filter(|g| g.contains(point))
            .cloned()
            .collect()
    }

    // Assets

    pub async fn create_asset(&self, request: AssetRequest) -> FleetResult<Asset> {
        let mut errors = Vec::new();
        required(&mut errors, "name", &request.name, "Name");
        required(&mut errors, "asset_type", &request.asset_type, "Asset type");
        if request.purchase_value.is_some_and(|v| v < 0.0) {
            invalid(&mut errors, "purchase_value", "Purchase value cannot be negative");
        }
        AppError::check(errors)?;

        let asset = Asset {
            id: IdGenerator::generate(IdType::Asset),
            name: request.name.trim().to_string(),
            asset_type: request.asset_type.trim().to_string(),
            serial_number: request.serial_number.filter(|s| !s.trim().is_empty()),
            assigned_to: request.assigned_to.filter(|s| !s.trim().is_empty()),
            status: AssetStatus::InService,
            purchase_value: request.purchase_value,
            created_at: Utc::now(),
        };
        self.assets.write().await.push(asset.clone());
        tracing::info!("Asset {} registered", asset.id);
        self.persist("assets", &asset).await;
        Ok(asset)
    }

    pub async fn list_assets(&self) -> Vec<Asset> {
        self.assets.read().await.clone()
    }

    // Dispatch

    pub async fn create_dispatch(&self, request: DispatchRequest) -> FleetResult<Dispatch> {
        let mut errors = Vec::new();
        required(&mut errors, "destination", &request.destination, "Destination");
        if request.location.is_some_and(|l| !l.is_valid()) {
            invalid(&mut errors, "location", "Location coordinates are invalid");
        }
        AppError::check(errors)?;

        if self.store.get_driver(&request.driver_id).await.is_none() {
            return Err(AppError::driver_not_found(&request.driver_id));
        }

        let dispatch = Dispatch {
            id: IdGenerator::generate(IdType::Dispatch),
            driver_id: request.driver_id,
            vehicle_id: request.vehicle_id.filter(|s| !s.trim().is_empty()),
            destination: request.destination.trim().to_string(),
            location: request.location,
            priority: request.priority.unwrap_or(RoutePriority::Medium),
            status: DispatchStatus::Dispatched,
            notes: request.notes.filter(|s| !s.trim().is_empty()),
            created_at: Utc::now(),
        };
        self.dispatches.write().await.push(dispatch.clone());
        tracing::info!("Dispatch {} sent to driver {}", dispatch.id, dispatch.driver_id);
        self.persist("dispatches", &dispatch).await;
        Ok(dispatch)
    }

    pub async fn list_dispatches(&self) -> Vec<Dispatch> {
        self.dispatches.read().await.clone()
    }

    // Inspections (DVIR)

    /// Records the inspection and opens one work order per listed defect. An inspection that
    /// is not safe to operate takes the vehicle out of service.
    pub async fn create_inspection(&self, request: InspectionRequest) -> FleetResult<Inspection> {
        let mut errors = Vec::new();
        required(&mut errors, "vehicle_id", &request.vehicle_id, "Vehicle");
        required(&mut errors, "driver_id", &request.driver_id, "Driver");
        if request.odometer_km.is_some_and(|km| km < 0.0) {
            invalid(&mut errors, "odometer_km", "Odometer cannot be negative");
        }
        AppError::check(errors)?;

        let defects: Vec<String> = request
            .defects
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        let safe_to_operate = request.safe_to_operate.unwrap_or(defects.is_empty());
        let inspection_id = IdGenerator::generate(IdType::Inspection);
        let now = Utc::now();

        let work_orders: Vec<MaintenanceWorkOrder> = defects
            .iter()
            .map(|defect| MaintenanceWorkOrder {
                id: IdGenerator::generate(IdType::WorkOrder),
                vehicle_id: request.vehicle_id.clone(),
                inspection_id: inspection_id.clone(),
                description: defect.clone(),
                status: WorkOrderStatus::Open,
                created_at: now,
            })
            .collect();

        let inspection = Inspection {
            id: inspection_id,
            vehicle_id: request.vehicle_id,
            driver_id: request.driver_id,
            kind: request.kind,
            odometer_km: request.odometer_km,
            defects,
            safe_to_operate,
            work_order_ids: work_orders.iter().map(|w| w.id.clone()).collect(),
            created_at: now,
        };

        self.inspections.write().await.push(inspection.clone());
        self.work_orders.write().await.extend(work_orders.iter().cloned());

        if !safe_to_operate {
            if let Some(mut vehicle) = self.store.get_vehicle(&inspection.vehicle_id).await {
                vehicle.status = VehicleStatus::Maintenance;
                self.store.upsert_vehicle(vehicle).await;
                tracing::warn!("Vehicle {} failed inspection, moved to maintenance", inspection.vehicle_id);
            }
        }

        tracing::info!(
            "Inspection {} recorded with {} work order(s)",
            inspection.id,
            inspection.work_order_ids.len()
        );
        self.persist("inspections", &inspection).await;
        for order in &work_orders {
            self.persist("work_orders", order).await;
        }
        Ok(inspection)
    }

    pub async fn list_inspections(&self) -> Vec<Inspection> {
        self.inspections.read().await.clone()
    }

    pub async fn list_work_orders(&self) -> Vec<MaintenanceWorkOrder> {
        self.work_orders.read().await.clone()
    }

    // Fuel

    pub async fn record_fuel(&self, request: FuelTransactionRequest) -> FleetResult<FuelTransaction> {
        let mut errors = Vec::new();
        required(&mut errors, "vehicle_id", &request.vehicle_id, "Vehicle");
        if !(request.liters.is_finite() && request.liters > 0.0) {
            invalid(&mut errors, "liters", "Liters must be positive");
        }
        if !(request.price_per_liter.is_finite() && request.price_per_liter >= 0.0) {
            invalid(&mut errors, "price_per_liter", "Price cannot be negative");
        }
        if request.tank_level_after.is_some_and(|l| !(0.0..=100.0).contains(&l)) {
            invalid(&mut errors, "tank_level_after", "Tank level is a percentage");
        }
        AppError::check(errors)?;

        let transaction = FuelTransaction {
            id: IdGenerator::generate(IdType::FuelTransaction),
            vehicle_id: request.vehicle_id,
            driver_id: request.driver_id.filter(|s| !s.trim().is_empty()),
            liters: request.liters,
            price_per_liter: request.price_per_liter,
            total_cost: (request.liters * request.price_per_liter * 100.0).round() / 100.0,
            odometer_km: request.odometer_km,
            station: request.station.filter(|s| !s.trim().is_empty()),
            tank_level_after: request.tank_level_after,
            created_at: Utc::now(),
        };

        if let (Some(driver_id), Some(level)) = (&transaction.driver_id, transaction.tank_level_after) {
            self.store.set_fuel_level(driver_id, level).await;
        }

        self.fuel_transactions.write().await.push(transaction.clone());
        tracing::info!("Fuel transaction {} recorded: {:.1} L", transaction.id, transaction.liters);
        self.persist("fuel_transactions", &transaction).await;
        Ok(transaction)
    }

    pub async fn list_fuel_transactions(&self) -> Vec<FuelTransaction> {
        self.fuel_transactions.read().await.clone()
    }

    // Energy (EV tracking)

    /// Creates or replaces the EV record for a vehicle.
    pub async fn track_ev(&self, request: EvVehicleRequest) -> FleetResult<EvVehicle> {
        let mut errors = Vec::new();
        required(&mut errors, "vehicle_id", &request.vehicle_id, "Vehicle");
        if !(request.battery_capacity_kwh.is_finite() && request.battery_capacity_kwh > 0.0) {
            invalid(&mut errors, "battery_capacity_kwh", "Battery capacity must be positive");
        }
        if !(0.0..=100.0).contains(&request.state_of_charge) {
            invalid(&mut errors, "state_of_charge", "State of charge is a percentage");
        }
        AppError::check(errors)?;

        let mut ev_vehicles = self.ev_vehicles.write().await;
        let id = ev_vehicles
            .iter()
            .find(|e| e.vehicle_id == request.vehicle_id)
            .map(|e| e.id.clone())
            .unwrap_or_else(|| IdGenerator::generate(IdType::EvVehicle));

        let record = EvVehicle {
            id,
            vehicle_id: request.vehicle_id,
            battery_capacity_kwh: request.battery_capacity_kwh,
            state_of_charge: request.state_of_charge,
            range_km: request.range_km,
            charging: request.charging,
            updated_at: Utc::now(),
        };
        ev_vehicles.retain(|e| e.vehicle_id != record.vehicle_id);
        ev_vehicles.push(record.clone());
        drop(ev_vehicles);

        if record.is_low_charge() && !record.charging {
            tracing::warn!("EV {} is low on charge: {:.0}%", record.vehicle_id, record.state_of_charge);
        }
        self.persist("ev_vehicles", &record).await;
        Ok(record)
    }

    pub async fn list_ev_vehicles(&self) -> Vec<EvVehicle> {
        self.ev_vehicles.read().await.clone()
    }

    pub async fn low_charge_vehicles(&self) -> Vec<EvVehicle> {
        self.ev_vehicles
            .read()
            .await
            .iter()
            .filter(|e| e.is_low_charge())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::driver::{Driver, FuelType, Vehicle, VehicleType};
    use crate::models::fleet::InspectionKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHook(Mutex<Vec<String>>);

    #[async_trait]
    impl SaveHook for RecordingHook {
        async fn save(&self, collection: &str, _record: Value) -> FleetResult<()> {
            self.0.lock().unwrap().push(collection.to_string());
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait]
    impl SaveHook for FailingHook {
        async fn save(&self, _collection: &str, _record: Value) -> FleetResult<()> {
            Err(AppError::ServiceUnavailable("offline".into()))
        }
    }

    async fn store() -> Arc<DataStore> {
        let store = Arc::new(DataStore::new());
        store.upsert_driver(Driver::new("D1", "Kofi")).await;
        store
            .upsert_vehicle(Vehicle {
                id: "veh_1".into(),
                license_plate: "GR-1234-20".into(),
                vehicle_type: VehicleType::Compactor,
                fuel_type: FuelType::Diesel,
                capacity_kg: 8000.0,
                status: VehicleStatus::Available,
                created_at: Utc::now(),
            })
            .await;
        store
    }

    #[tokio::test]
    async fn test_inspection_generates_work_orders() {
        let store = store().await;
        let hook = Arc::new(RecordingHook::default());
        let service = FleetService::new(store.clone(), Some(hook.clone()));

        let inspection = service
            .create_inspection(InspectionRequest {
                vehicle_id: "veh_1".into(),
                driver_id: "D1".into(),
                kind: InspectionKind::PreTrip,
                odometer_km: Some(10230.0),
                defects: vec!["Brake light out".into(), " ".into(), "Hydraulic leak".into()],
                safe_to_operate: None,
            })
            .await
            .unwrap();

        assert_eq!(inspection.defects.len(), 2);
        assert!(!inspection.safe_to_operate);
        let orders = service.list_work_orders().await;
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.inspection_id == inspection.id));
        assert_ne!(orders[0].id, orders[1].id);
        assert_eq!(store.get_vehicle("veh_1").await.unwrap().status, VehicleStatus::Maintenance);
        assert_eq!(
            *hook.0.lock().unwrap(),
            vec!["inspections", "work_orders", "work_orders"]
        );
    }

    #[tokio::test]
    async fn test_fuel_updates_driver_level() {
        let store = store().await;
        let service = FleetService::new(store.clone(), None);
        let tx = service
            .record_fuel(FuelTransactionRequest {
                vehicle_id: "veh_1".into(),
                driver_id: Some("D1".into()),
                liters: 40.0,
                price_per_liter: 14.255,
                odometer_km: None,
                station: None,
                tank_level_after: Some(90.0),
            })
            .await
            .unwrap();
        assert_eq!(tx.total_cost, 570.2);
        assert_eq!(store.fuel_level("D1").await, Some(90.0));
    }

    #[tokio::test]
    async fn test_save_hook_failure_keeps_record() {
        let service = FleetService::new(store().await, Some(Arc::new(FailingHook)));
        let asset = service
            .create_asset(AssetRequest {
                name: "240L container".into(),
                asset_type: "container".into(),
                serial_number: None,
                assigned_to: None,
                purchase_value: Some(85.0),
            })
            .await
            .unwrap();
        assert_eq!(service.list_assets().await[0].id, asset.id);
    }

    #[tokio::test]
    async fn test_ev_tracking_replaces_record() {
        let service = FleetService::new(store().await, None);
        let request = |soc: f64| EvVehicleRequest {
            vehicle_id: "veh_1".into(),
            battery_capacity_kwh: 200.0,
            state_of_charge: soc,
            range_km: None,
            charging: false,
        };
        let first = service.track_ev(request(80.0)).await.unwrap();
        let second = service.track_ev(request(15.0)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(service.list_ev_vehicles().await.len(), 1);
        assert_eq!(service.low_charge_vehicles().await.len(), 1);
        assert!(service.track_ev(request(120.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_geofence_validation_and_containment() {
        let service = FleetService::new(store().await, None);
        let bad = service
            .create_geofence(GeofenceRequest {
                name: "".into(),
                shape: GeofenceShape::Polygon { vertices: vec![LatLng::new(5.6, -0.2)] },
                alert_on_enter: true,
                alert_on_exit: true,
            })
            .await;
        assert!(matches!(bad, Err(AppError::ValidationFailed(ref e)) if e.len() == 2));

        service
            .create_geofence(GeofenceRequest {
                name: "Depot".into(),
                shape: GeofenceShape::Circle { center: LatLng::new(5.6, -0.2), radius_m: 500.0 },
                alert_on_enter: true,
                alert_on_exit: false,
            })
            .await
            .unwrap();
        assert_eq!(service.geofences_containing(LatLng::new(5.601, -0.2)).await.len(), 1);
        assert!(service.geofences_containing(LatLng::new(5.7, -0.2)).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_requires_known_driver() {
        let service = FleetService::new(store().await, None);
        let result = service
            .create_dispatch(DispatchRequest {
                driver_id: "ghost".into(),
                vehicle_id: None,
                destination: "Landfill gate".into(),
                location: None,
                priority: None,
                notes: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::DriverNotFound(_))));
    }
}
