// src/services/data_service.rs
// In-memory store for bins, drivers, routes and the records hanging off them.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    models::{
        bin::{Bin, BinStatus},
        collection::{Collection, Verification},
        complaint::{Complaint, Issue},
        driver::{Driver, Vehicle},
        route::Route,
    },
};

/// Everything the store holds, in a serializable form. Used for seeding, export and sync.
///
/// `bins` and `drivers` are required, so an object without them never reads as an empty store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub bins: Vec<Bin>,
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub complaints: Vec<Complaint>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub fuel_levels: HashMap<String, f64>,
}

#[derive(Default)]
pub struct DataStore {
    bins: RwLock<HashMap<String, Bin>>,
    drivers: RwLock<HashMap<String, Driver>>,
    vehicles: RwLock<HashMap<String, Vehicle>>,
    routes: RwLock<HashMap<String, Route>>,
    collections: RwLock<Vec<Collection>>,
    complaints: RwLock<Vec<Complaint>>,
    issues: RwLock<Vec<Issue>>,
    // Fuel level per driver id, percent
    fuel_levels: RwLock<HashMap<String, f64>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        store.load(snapshot).await;
        store
    }

    /// Replaces the store contents wholesale, as a full sync from the server does.
    pub async fn load(&self, snapshot: StoreSnapshot) {
        tracing::info!(
            "Loading store snapshot: {} bins, {} drivers, {} routes",
            snapshot.bins.len(),
            snapshot.drivers.len(),
            snapshot.routes.len()
        );
        *self.bins.write().await = snapshot.bins.into_iter().map(|b| (b.id.clone(), b)).collect();
        *self.drivers.write().await = snapshot.drivers.into_iter().map(|d| (d.id.clone(), d)).collect();
        *self.vehicles.write().await = snapshot.vehicles.into_iter().map(|v| (v.id.clone(), v)).collect();
        *self.routes.write().await = snapshot.routes.into_iter().map(|r| (r.id.clone(), r)).collect();
        *self.collections.write().await = snapshot.collections;
        *self.complaints.write().await = snapshot.complaints;
        *self.issues.write().await = snapshot.issues;
        *self.fuel_levels.write().await = snapshot.fuel_levels;
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            bins: self.list_bins().await,
            drivers: self.list_drivers().await,
            vehicles: self.list_vehicles().await,
            routes: self.list_routes().await,
            collections: self.list_collections().await,
            complaints: self.list_complaints().await,
            issues: self.list_issues().await,
            fuel_levels: self.fuel_levels.read().await.clone(),
        }
    }

    // Bins

    pub async fn upsert_bin(&self, bin: Bin) {
        tracing::debug!("Storing bin {}", bin.id);
        self.bins.write().await.insert(bin.id.clone(), bin);
    }

    pub async fn get_bin(&self, bin_id: &str) -> Option<Bin> {
        self.bins.read().await.get(bin_id).cloned()
    }

    pub async fn list_bins(&self) -> Vec<Bin> {
        let mut bins: Vec<Bin> = self.bins.read().await.values().cloned().collect();
        bins.sort_by(|a, b| a.id.cmp(&b.id));
        bins
    }

    pub async fn update_bin<F>(&self, bin_id: &str, update: F) -> FleetResult<Bin>
    where
        F: FnOnce(&mut Bin),
    {
        let mut bins = self.bins.write().await;
        let bin = bins.get_mut(bin_id).ok_or_else(|| AppError::bin_not_found(bin_id))?;
        update(bin);
        bin.updated_at = Utc::now();
        Ok(bin.clone())
    }

    pub async fn set_bin_status(&self, bin_id: &str, status: BinStatus) -> FleetResult<Bin> {
        self.update_bin(bin_id, |bin| bin.status = status).await
    }

    // Drivers and vehicles

    pub async fn upsert_driver(&self, driver: Driver) {
        tracing::debug!("Storing driver {}", driver.id);
        self.drivers.write().await.insert(driver.id.clone(), driver);
    }

    pub async fn get_driver(&self, driver_id: &str) -> Option<Driver> {
        self.drivers.read().await.get(driver_id).cloned()
    }

    pub async fn list_drivers(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self.drivers.read().await.values().cloned().collect();
        drivers.sort_by(|a, b| a.id.cmp(&b.id));
        drivers
    }

    pub async fn update_driver<F>(&self, driver_id: &str, update: F) -> FleetResult<Driver>
    where
        F: FnOnce(&mut Driver),
    {
        let mut drivers = self.drivers.write().await;
        let driver = drivers
            .get_mut(driver_id)
            .ok_or_else(|| AppError::driver_not_found(driver_id))?;
        update(driver);
        driver.updated_at = Utc::now();
        Ok(driver.clone())
    }

    pub async fn upsert_vehicle(&self, vehicle: Vehicle) {
        self.vehicles.write().await.insert(vehicle.id.clone(), vehicle);
    }

    /// Inserts the vehicle unless another one already carries its plate.
    pub async fn insert_vehicle_unique(&self, vehicle: Vehicle) -> FleetResult<()> {
        let mut vehicles = self.vehicles.write().await;
        if vehicles.values().any(|v| v.license_plate == vehicle.license_plate) {
            return Err(AppError::Conflict(format!(
                "Vehicle {} already registered",
                vehicle.license_plate
            )));
        }
        vehicles.insert(vehicle.id.clone(), vehicle);
        Ok(())
    }

    pub async fn get_vehicle(&self, vehicle_id: &str) -> Option<Vehicle> {
        self.vehicles.read().await.get(vehicle_id).cloned()
    }

    pub async fn list_vehicles(&self) -> Vec<Vehicle> {
        let mut vehicles: Vec<Vehicle> = self.vehicles.read().await.values().cloned().collect();
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        vehicles
    }

    pub async fn set_fuel_level(&self, driver_id: &str, level: f64) {
        self.fuel_levels
            .write()
            .await
            .insert(driver_id.to_string(), level.clamp(0.0, 100.0));
    }

    pub async fn fuel_level(&self, driver_id: &str) -> Option<f64> {
        self.fuel_levels.read().await.get(driver_id).copied()
    }

    // Routes

    pub async fn insert_route(&self, route: Route) {
        tracing::debug!("Storing route {}", route.id);
        self.routes.write().await.insert(route.id.clone(), route);
    }

    pub async fn get_route(&self, route_id: &str) -> Option<Route> {
        self.routes.read().await.get(route_id).cloned()
    }

    /// Newest first.
    pub async fn list_routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.routes.read().await.values().cloned().collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        routes
    }

    pub async fn update_route<F>(&self, route_id: &str, update: F) -> FleetResult<Route>
    where
        F: FnOnce(&mut Route) -> FleetResult<()>,
    {
        let mut routes = self.routes.write().await;
        let route = routes
            .get_mut(route_id)
            .ok_or_else(|| AppError::route_not_found(route_id))?;
        update(route)?;
        route.updated_at = Utc::now();
        Ok(route.clone())
    }

    pub async fn routes_for_driver(&self, driver_id: &str) -> Vec<Route> {
        self.list_routes()
            .await
            .into_iter()
            .filter(|r| r.driver_id == driver_id)
            .collect()
    }

    pub async fn active_routes_for_driver(&self, driver_id: &str) -> Vec<Route> {
        self.routes_for_driver(driver_id)
            .await
            .into_iter()
            .filter(|r| r.status.is_active())
            .collect()
    }

    /// Whether any pending or in-progress route lists the bin.
    pub async fn bin_on_active_route(&self, bin_id: &str) -> bool {
        self.routes
            .read()
            .await
            .values()
            .any(|r| r.status.is_active() && r.bin_ids.iter().any(|id| id == bin_id))
    }

    // Collections

    pub async fn add_collection(&self, collection: Collection) {
        tracing::debug!("Recording collection {} for bin {}", collection.id, collection.bin_id);
        self.collections.write().await.push(collection);
    }

    pub async fn list_collections(&self) -> Vec<Collection> {
        self.collections.read().await.clone()
    }

    pub async fn collections_for_bin(&self, bin_id: &str) -> Vec<Collection> {
        let mut items: Vec<Collection> = self
            .collections
            .read()
            .await
            .iter()
            .filter(|c| c.bin_id == bin_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.collected_at.cmp(&a.collected_at));
        items
    }

    pub async fn collections_for_driver(&self, driver_id: &str) -> Vec<Collection> {
        let mut items: Vec<Collection> = self
            .collections
            .read()
            .await
            .iter()
            .filter(|c| c.driver_id == driver_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.collected_at.cmp(&a.collected_at));
        items
    }

    /// Settles every `pending_sensor` collection of a bin against a fresh fill reading.
    pub async fn resolve_pending_collections(&self, bin_id: &str, fill: f64) -> usize {
        let mut collections = self.collections.write().await;
        let mut resolved = 0;
        for collection in collections
            .iter_mut()
            .filter(|c| c.bin_id == bin_id && c.verification == Verification::PendingSensor)
        {
            collection.verification = Verification::from_post_collection_fill(fill);
            resolved += 1;
        }
        if resolved > 0 {
            tracing::info!("Resolved {} pending collection(s) for bin {} at {:.0}%", resolved, bin_id, fill);
        }
        resolved
    }

    // Complaints and issues

    pub async fn add_complaint(&self, complaint: Complaint) {
        self.complaints.write().await.push(complaint);
    }

    pub async fn list_complaints(&self) -> Vec<Complaint> {
        self.complaints.read().await.clone()
    }

    pub async fn add_issue(&self, issue: Issue) {
        self.issues.write().await.push(issue);
    }

    pub async fn list_issues(&self) -> Vec<Issue> {
        self.issues.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::{RoutePriority, RouteStatus};

    fn route(id: &str, driver_id: &str, status: RouteStatus) -> Route {
        Route {
            id: id.to_string(),
            driver_id: driver_id.to_string(),
            bin_ids: vec![],
            bin_details: vec![],
            priority: RoutePriority::Low,
            status,
            assigned_by: None,
            notes: None,
            estimated_distance_km: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            updated_at: Utc::now(),
            persisted: false,
        }
    }

    #[tokio::test]
    async fn test_update_missing_bin() {
        let store = DataStore::new();
        let err = store.update_bin("nope", |_| {}).await.unwrap_err();
        assert!(matches!(err, AppError::BinNotFound(_)));
    }

    #[tokio::test]
    async fn test_active_routes_filter() {
        let store = DataStore::new();
        store.insert_route(route("route_1", "D1", RouteStatus::Pending)).await;
        store.insert_route(route("route_2", "D1", RouteStatus::Completed)).await;
        store.insert_route(route("route_3", "D2", RouteStatus::InProgress)).await;

        let active = store.active_routes_for_driver("D1").await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "route_1");
        assert_eq!(store.routes_for_driver("D1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_pending_collections() {
        let store = DataStore::new();
        for (id, verification) in [("col_1", Verification::PendingSensor), ("col_2", Verification::NoSensor)] {
            store
                .add_collection(Collection {
                    id: id.to_string(),
                    bin_id: "B1".to_string(),
                    driver_id: "D1".to_string(),
                    route_id: None,
                    fill_before: 90.0,
                    fill_after: 0.0,
                    weight_kg: None,
                    temperature: None,
                    verification,
                    collected_at: Utc::now(),
                })
                .await;
        }
        assert_eq!(store.resolve_pending_collections("B1", 10.0).await, 1);
        let items = store.collections_for_bin("B1").await;
        assert!(items.iter().any(|c| c.verification == Verification::SensorVerified));
        assert!(items.iter().any(|c| c.verification == Verification::NoSensor));
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let store = DataStore::new();
        store.upsert_bin(Bin::new("B1", 5.6, -0.18)).await;
        store.upsert_driver(Driver::new("D1", "Ama")).await;
        store.set_fuel_level("D1", 140.0).await;

        let snapshot = store.snapshot().await;
        let restored = DataStore::from_snapshot(snapshot).await;
        assert!(restored.get_bin("B1").await.is_some());
        assert_eq!(restored.fuel_level("D1").await, Some(100.0));
    }

    #[test]
    fn test_acknowledgement_is_not_a_snapshot() {
        let ack = serde_json::json!({ "received": 2, "timestamp": "now" });
        assert!(serde_json::from_value::<StoreSnapshot>(ack).is_err());

        let minimal = serde_json::json!({ "bins": [], "drivers": [] });
        let snapshot: StoreSnapshot = serde_json::from_value(minimal).unwrap();
        assert!(snapshot.routes.is_empty());
    }
}
