// src/services/dispatch_service.rs
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    models::{
        bin::{Bin, BinStatus},
        collection::{Collection, CollectionRequest, Verification},
        driver::{DriverCandidate, MovementStatus},
        route::{AssignmentRequest, Route, RouteBinDetail, RoutePriority, RouteRequest, RouteStatus, RouteStatusUpdate},
    },
    services::{data_service::DataStore, sync_service::SyncClient},
    state::Operator,
    utils::{
        geo::{self, LatLng},
        id_generator::{IdGenerator, IdType},
    },
    ValidationError,
};

#[async_trait]
pub trait DispatchOperations: Send + Sync {
    async fn rank_drivers_for_bin(&self, bin_id: &str) -> Result<Vec<DriverCandidate>, AppError>;
    async fn assign_driver_to_bin(&self, bin_id: &str, request: AssignmentRequest, operator: &Operator) -> Result<Route, AppError>;
    async fn create_route(&self, request: RouteRequest, operator: &Operator) -> Result<Route, AppError>;
    async fn update_route_status(&self, route_id: &str, update: RouteStatusUpdate) -> Result<Route, AppError>;
    async fn active_routes_for_driver(&self, driver_id: &str) -> Result<Vec<Route>, AppError>;
    async fn record_collection(&self, request: CollectionRequest) -> Result<Collection, AppError>;
}

pub struct DispatchService {
    store: Arc<DataStore>,
    sync: Arc<dyn SyncClient>,
}

/// Orders candidates nearest first. Drivers without a position carry the unknown distance
/// and therefore land at the end; only the first located driver is recommended.
pub fn rank_candidates(mut candidates: Vec<DriverCandidate>) -> Vec<DriverCandidate> {
    candidates.sort_by(|a, b| {
        b.has_location
            .cmp(&a.has_location)
            .then_with(|| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(Ordering::Equal))
            .then_with(|| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal))
    });
    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.recommended = i == 0 && candidate.has_location;
    }
    candidates
}

/// Length of the path start -> stops in order, skipping stops without a usable position.
fn path_length_km(start: Option<LatLng>, stops: &[RouteBinDetail]) -> Option<f64> {
    let mut points: Vec<LatLng> = start.into_iter().collect();
    points.extend(
        stops
            .iter()
            .map(|d| LatLng::new(d.lat, d.lng))
            .filter(LatLng::is_valid),
    );
    if points.len() < 2 {
        return None;
    }
    Some(points.windows(2).map(|w| geo::haversine_km(w[0], w[1])).sum())
}

impl DispatchService {
    pub fn new(store: Arc<DataStore>, sync: Arc<dyn SyncClient>) -> Self {
        Self { store, sync }
    }

    fn detail(bin: &Bin) -> RouteBinDetail {
        RouteBinDetail {
            bin_id: bin.id.clone(),
            lat: bin.lat,
            lng: bin.lng,
            fill_level: bin.fill_level,
            address: bin.address.clone(),
        }
    }

    async fn build_route(
        &self,
        driver_id: &str,
        bins: &[Bin],
        priority: Option<RoutePriority>,
        notes: Option<String>,
        operator: &Operator,
    ) -> FleetResult<Route> {
        let driver = self
            .store
            .get_driver(driver_id)
            .await
            .ok_or_else(|| AppError::driver_not_found(driver_id))?;

        if bins.is_empty() {
            return Err(AppError::EmptyRoute);
        }

        let max_fill = bins.iter().map(|b| b.fill_level).fold(0.0, f64::max);
        let bin_details: Vec<RouteBinDetail> = bins.iter().map(Self::detail).collect();
        let now = Utc::now();

        let mut route = Route {
            id: IdGenerator::generate(IdType::Route),
            driver_id: driver.id.clone(),
            bin_ids: bins.iter().map(|b| b.id.clone()).collect(),
            estimated_distance_km: path_length_km(driver.position(), &bin_details),
            bin_details,
            priority: priority.unwrap_or_else(|| RoutePriority::from_fill(max_fill)),
            status: RouteStatus::Pending,
            assigned_by: Some(operator.id.clone()),
            notes: notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            updated_at: now,
            persisted: false,
        };

        // Server first, local store regardless
        match self.sync.persist_route(&route).await {
            Ok(()) => route.persisted = true,
            Err(e) => tracing::warn!("Route {} kept locally, persistence failed: {}", route.id, e),
        }
        self.store.insert_route(route.clone()).await;

        for bin in bins {
            let status = bin.assigned_status();
            self.store.set_bin_status(&bin.id, status).await?;
        }

        tracing::info!(
            "Route {} created for driver {} with {} bin(s), priority {}",
            route.id,
            route.driver_id,
            route.bin_ids.len(),
            route.priority.as_str()
        );
        Ok(route)
    }

    /// Returns the route's bins to idle, except those another active route still holds.
    async fn release_bins(&self, route: &Route) -> FleetResult<()> {
        for bin_id in &route.bin_ids {
            if self.store.bin_on_active_route(bin_id).await {
                tracing::debug!("Bin {} stays assigned, still on another active route", bin_id);
                continue;
            }
            match self.store.get_bin(bin_id).await {
                Some(bin) if matches!(bin.status, BinStatus::Assigned | BinStatus::Critical) => {
                    self.store.set_bin_status(bin_id, bin.idle_status()).await?;
                }
                Some(_) => {}
                None => tracing::warn!("Route {} references missing bin {}", route.id, bin_id),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DispatchOperations for DispatchService {
    async fn rank_drivers_for_bin(&self, bin_id: &str) -> Result<Vec<DriverCandidate>, AppError> {
        let bin = self
            .store
            .get_bin(bin_id)
            .await
            .ok_or_else(|| AppError::bin_not_found(bin_id))?;
        let target = bin.position();
        if target.is_none() {
            tracing::warn!("Bin {} has no usable coordinates, distances unknown", bin_id);
        }

        let mut candidates = Vec::new();
        for driver in self.store.list_drivers().await.into_iter().filter(|d| d.is_active) {
            let position = driver.position();
            candidates.push(DriverCandidate {
                distance_km: geo::distance_or_unknown(position, target),
                has_location: position.is_some() && target.is_some(),
                fuel_level: self.store.fuel_level(&driver.id).await,
                active_routes: self.store.active_routes_for_driver(&driver.id).await.len(),
                driver_id: driver.id,
                name: driver.name,
                rating: driver.rating,
                status: driver.status,
                recommended: false,
            });
        }
        Ok(rank_candidates(candidates))
    }

    async fn assign_driver_to_bin(&self, bin_id: &str, request: AssignmentRequest, operator: &Operator) -> Result<Route, AppError> {
        tracing::info!("Assigning driver {} to bin {}", request.driver_id, bin_id);

        let bin = self
            .store
            .get_bin(bin_id)
            .await
            .ok_or_else(|| AppError::bin_not_found(bin_id))?;

        self.build_route(&request.driver_id, &[bin], None, request.notes, operator)
            .await
    }

    async fn create_route(&self, request: RouteRequest, operator: &Operator) -> Result<Route, AppError> {
        let mut errors = Vec::new();
        if request.driver_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "driver_id".to_string(),
                message: "Select a driver".to_string(),
            });
        }
        if request.bin_ids.is_empty() {
            errors.push(ValidationError {
                field: "bin_ids".to_string(),
                message: "Select at least one bin".to_string(),
            });
        }
        AppError::check(errors)?;

        let mut bins = Vec::new();
        for bin_id in &request.bin_ids {
            match self.store.get_bin(bin_id).await {
                Some(bin) => bins.push(bin),
                None => return Err(AppError::bin_not_found(bin_id)),
            }
        }

        self.build_route(&request.driver_id, &bins, request.priority, request.notes, operator)
            .await
    }

    async fn update_route_status(&self, route_id: &str, update: RouteStatusUpdate) -> Result<Route, AppError> {
        tracing::info!("Updating route {} to {}", route_id, update.status.as_str());

        let next = update.status;
        let route = self
            .store
            .update_route(route_id, |route| {
                if !route.status.can_transition_to(next) {
                    return Err(AppError::InvalidRouteTransition {
                        from: route.status.as_str().to_string(),
                        to: next.as_str().to_string(),
                    });
                }
                let now = Utc::now();
                route.status = next;
                match next {
                    RouteStatus::InProgress => route.started_at = Some(now),
                    RouteStatus::Completed => route.completed_at = Some(now),
                    RouteStatus::Cancelled => route.cancelled_at = Some(now),
                    RouteStatus::Pending => {}
                }
                if let Some(notes) = update.notes.filter(|n| !n.trim().is_empty()) {
                    route.notes = Some(notes);
                }
                Ok(())
            })
            .await?;

        match route.status {
            RouteStatus::InProgress => {
                let _ = self
                    .store
                    .update_driver(&route.driver_id, |d| d.status = MovementStatus::OnRoute)
                    .await;
            }
            RouteStatus::Cancelled | RouteStatus::Completed => {
                self.release_bins(&route).await?;
                if self.store.active_routes_for_driver(&route.driver_id).await.is_empty() {
                    let _ = self
                        .store
                        .update_driver(&route.driver_id, |d| d.status = MovementStatus::Stationary)
                        .await;
                }
            }
            RouteStatus::Pending => {}
        }

        Ok(route)
    }

    async fn active_routes_for_driver(&self, driver_id: &str) -> Result<Vec<Route>, AppError> {
        if self.store.get_driver(driver_id).await.is_none() {
            return Err(AppError::driver_not_found(driver_id));
        }
        Ok(self.store.active_routes_for_driver(driver_id).await)
    }

    async fn record_collection(&self, request: CollectionRequest) -> Result<Collection, AppError> {
        let bin = self
            .store
            .get_bin(&request.bin_id)
            .await
            .ok_or_else(|| AppError::bin_not_found(&request.bin_id))?;
        if self.store.get_driver(&request.driver_id).await.is_none() {
            return Err(AppError::driver_not_found(&request.driver_id));
        }

        // Without a sensor there is nothing to verify against; with one, the next report decides.
        let verification = if bin.sensor_imei.is_none() {
            Verification::NoSensor
        } else {
            match request.fill_after {
                Some(fill) => Verification::from_post_collection_fill(fill),
                None => Verification::PendingSensor,
            }
        };
        let fill_after = request.fill_after.unwrap_or(0.0).clamp(0.0, 100.0);
        let now = Utc::now();

        let collection = Collection {
            id: IdGenerator::generate(IdType::Collection),
            bin_id: bin.id.clone(),
            driver_id: request.driver_id.clone(),
            route_id: request.route_id,
            fill_before: bin.fill_level,
            fill_after,
            weight_kg: request.weight_kg,
            temperature: bin.sensor_data.temperature,
            verification,
            collected_at: now,
        };
        self.store.add_collection(collection.clone()).await;

        self.store
            .update_bin(&bin.id, |b| {
                b.fill_level = fill_after;
                b.status = BinStatus::Collected;
                b.last_collected_at = Some(now);
            })
            .await?;
        self.store
            .update_driver(&request.driver_id, |d| d.total_collections += 1)
            .await?;

        tracing::info!(
            "Collection {} recorded for bin {} ({})",
            collection.id,
            collection.bin_id,
            collection.verification.as_str()
        );
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::driver::{Driver, Location};
    use crate::services::sync_service::OfflineSyncClient;

    fn candidate(id: &str, distance_km: f64, has_location: bool) -> DriverCandidate {
        DriverCandidate {
            driver_id: id.to_string(),
            name: id.to_string(),
            distance_km,
            has_location,
            rating: 4.0,
            fuel_level: None,
            active_routes: 0,
            status: MovementStatus::Stationary,
            recommended: false,
        }
    }

    fn located(id: &str, lat: f64, lng: f64) -> Driver {
        let mut driver = Driver::new(id, id);
        driver.current_location = Some(Location {
            latitude: lat,
            longitude: lng,
            accuracy: None,
            heading: None,
            speed: None,
            timestamp: Utc::now(),
        });
        driver
    }

    async fn service() -> (DispatchService, Arc<DataStore>) {
        let store = Arc::new(DataStore::new());
        let mut bin = Bin::new("B1", 5.60, -0.18);
        bin.fill_level = 50.0;
        store.upsert_bin(bin).await;
        store.upsert_driver(located("D1", 5.61, -0.18)).await;
        store.upsert_driver(Driver::new("D2", "No GPS")).await;
        (DispatchService::new(store.clone(), Arc::new(OfflineSyncClient)), store)
    }

    #[test]
    fn test_unlocated_driver_sorts_last_and_is_never_recommended() {
        let ranked = rank_candidates(vec![
            candidate("nogps", geo::UNKNOWN_DISTANCE_KM, false),
            candidate("far", 12.0, true),
            candidate("near", 1.5, true),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|c| c.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far", "nogps"]);
        assert!(ranked[0].recommended);
        assert!(!ranked[2].recommended);

        let only_unlocated = rank_candidates(vec![candidate("nogps", geo::UNKNOWN_DISTANCE_KM, false)]);
        assert!(!only_unlocated[0].recommended);
    }

    #[tokio::test]
    async fn test_rank_drivers_for_bin() {
        let (service, _) = service().await;
        let ranked = service.rank_drivers_for_bin("B1").await.unwrap();
        assert_eq!(ranked[0].driver_id, "D1");
        assert!(ranked[0].distance_km < 2.0);
        assert_eq!(ranked[1].distance_km, geo::UNKNOWN_DISTANCE_KM);
    }

    #[tokio::test]
    async fn test_assignment_falls_back_to_local_store() {
        let (service, store) = service().await;
        let route = service
            .assign_driver_to_bin("B1", AssignmentRequest { driver_id: "D1".into(), notes: None }, &Operator::default())
            .await
            .unwrap();

        assert_eq!(route.status, RouteStatus::Pending);
        assert!(!route.persisted);
        assert_eq!(store.get_bin("B1").await.unwrap().status, BinStatus::Assigned);
        assert_eq!(store.active_routes_for_driver("D1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_releases_bins() {
        let (service, store) = service().await;
        let route = service
            .create_route(
                RouteRequest { driver_id: "D1".into(), bin_ids: vec!["B1".into()], priority: None, notes: None },
                &Operator::default(),
            )
            .await
            .unwrap();
        assert_eq!(route.priority, RoutePriority::Medium);

        let cancelled = service
            .update_route_status(&route.id, RouteStatusUpdate { status: RouteStatus::Cancelled, notes: None })
            .await
            .unwrap();
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(store.get_bin("B1").await.unwrap().status, BinStatus::Active);

        let err = service
            .update_route_status(&route.id, RouteStatusUpdate { status: RouteStatus::InProgress, notes: None })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRouteTransition { .. }));
    }

    #[tokio::test]
    async fn test_bin_shared_by_two_routes_stays_assigned() {
        let (service, store) = service().await;
        let request = |driver: &str| RouteRequest {
            driver_id: driver.into(),
            bin_ids: vec!["B1".into()],
            priority: None,
            notes: None,
        };
        let first = service.create_route(request("D1"), &Operator::default()).await.unwrap();
        let second = service.create_route(request("D2"), &Operator::default()).await.unwrap();

        service
            .update_route_status(&first.id, RouteStatusUpdate { status: RouteStatus::Cancelled, notes: None })
            .await
            .unwrap();
        assert_eq!(store.get_route(&second.id).await.unwrap().status, RouteStatus::Pending);
        assert_eq!(store.get_bin("B1").await.unwrap().status, BinStatus::Assigned);

        service
            .update_route_status(&second.id, RouteStatusUpdate { status: RouteStatus::Cancelled, notes: None })
            .await
            .unwrap();
        assert_eq!(store.get_bin("B1").await.unwrap().status, BinStatus::Active);
    }

    #[tokio::test]
    async fn test_create_route_validation() {
        let (service, _) = service().await;
        let err = service
            .create_route(
                RouteRequest { driver_id: "".into(), bin_ids: vec![], priority: None, notes: None },
                &Operator::default(),
            )
            .await
            .unwrap_err();
        match err {
            AppError::ValidationFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_record_collection_without_sensor() {
        let (service, store) = service().await;
        let collection = service
            .record_collection(CollectionRequest {
                bin_id: "B1".into(),
                driver_id: "D1".into(),
                route_id: None,
                weight_kg: Some(42.0),
                fill_after: None,
            })
            .await
            .unwrap();

        assert_eq!(collection.verification, Verification::NoSensor);
        assert_eq!(collection.fill_before, 50.0);
        let bin = store.get_bin("B1").await.unwrap();
        assert_eq!(bin.status, BinStatus::Collected);
        assert_eq!(bin.fill_level, 0.0);
        assert_eq!(store.get_driver("D1").await.unwrap().total_collections, 1);
    }
}
