// src/services/optimizer_service.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    services::data_service::DataStore,
    utils::geo::{self, LatLng},
};

/// Urban collection speed used for duration estimates.
const AVERAGE_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub fill_level: Option<f64>,
}

impl Destination {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    pub route: Vec<Destination>,
    /// Kilometres
    pub distance: f64,
    /// Minutes
    pub duration: f64,
    pub performance: Value,
    #[serde(default)]
    pub fallback: bool,
}

/// Raw request body. Every part is optional and loosely typed; callers send all kinds of shapes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub start: Option<Value>,
    #[serde(default)]
    pub destinations: Option<Value>,
    #[serde(default)]
    pub constraints: Option<Value>,
    #[serde(default)]
    pub preferences: Option<Value>,
}

#[async_trait]
pub trait RouteOptimizer: Send + Sync {
    async fn optimize_route(
        &self,
        start: Option<LatLng>,
        destinations: Vec<Destination>,
        constraints: Value,
        preferences: Value,
    ) -> FleetResult<OptimizedRoute>;
}

/// Orders stops by repeatedly visiting the closest remaining one.
pub struct NearestStopOptimizer;

#[async_trait]
impl RouteOptimizer for NearestStopOptimizer {
    async fn optimize_route(
        &self,
        start: Option<LatLng>,
        destinations: Vec<Destination>,
        _constraints: Value,
        _preferences: Value,
    ) -> FleetResult<OptimizedRoute> {
        let started = Instant::now();
        if let Some(start) = start.filter(|s| !s.is_valid()) {
            return Err(AppError::InvalidCoordinates { lat: start.lat, lng: start.lng });
        }

        let mut remaining = destinations;
        let mut ordered = Vec::with_capacity(remaining.len());
        let mut current = start;
        let mut distance = 0.0;

        while !remaining.is_empty() {
            let next = match current {
                Some(here) => remaining
                    .iter()
                    .enumerate()
                    .map(|(i, d)| (i, geo::haversine_km(here, d.position())))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(i, km)| {
                        distance += km;
                        i
                    })
                    .unwrap_or(0),
                None => 0,
            };
            let stop = remaining.swap_remove(next);
            current = Some(stop.position());
            ordered.push(stop);
        }

        Ok(OptimizedRoute {
            route: ordered,
            distance,
            duration: distance / AVERAGE_SPEED_KMH * 60.0,
            performance: json!({
                "algorithm": "nearest-stop",
                "processing_time_ms": started.elapsed().as_millis() as u64,
            }),
            fallback: false,
        })
    }
}

fn number(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| map.get(*k))
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

/// Coordinates from `{lat,lng}`, `{latitude,longitude}` or a nested `location` object.
pub fn coordinates(value: &Value) -> Option<LatLng> {
    let map = value.as_object()?;
    if let (Some(lat), Some(lng)) = (number(map, &["lat", "latitude"]), number(map, &["lng", "lon", "longitude"])) {
        return Some(LatLng::new(lat, lng));
    }
    map.get("location").and_then(coordinates)
}

/// Coerces whatever arrived as `destinations` into a plain list.
pub fn coerce_destinations(raw: Option<&Value>) -> Vec<Value> {
    match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(map)) => {
            for key in ["bins", "destinations", "binIds"] {
                match map.get(key) {
                    Some(Value::Array(items)) => return items.clone(),
                    Some(_) => tracing::warn!("Optimizer input `{}` is not a list, ignoring it", key),
                    None => {}
                }
            }
            let value = Value::Object(map.clone());
            if coordinates(&value).is_some() {
                vec![value]
            } else {
                tracing::warn!("Optimizer destinations object has no coordinates, using none");
                Vec::new()
            }
        }
        Some(other) => {
            tracing::warn!("Optimizer destinations of unexpected type: {}", other);
            Vec::new()
        }
    }
}

/// Wraps an optimizer so that it only ever sees a clean destination list and never fails.
pub struct SanitizingOptimizer {
    inner: Arc<dyn RouteOptimizer>,
    store: Arc<DataStore>,
}

impl SanitizingOptimizer {
    pub fn new(inner: Arc<dyn RouteOptimizer>, store: Arc<DataStore>) -> Self {
        Self { inner, store }
    }

    async fn bin_destination(&self, bin_id: &str) -> Option<Destination> {
        match self.store.get_bin(bin_id).await {
            Some(bin) => Some(Destination {
                id: Some(bin.id.clone()),
                lat: bin.lat,
                lng: bin.lng,
                fill_level: Some(bin.fill_level),
            }),
            None => {
                tracing::warn!("Dropping unknown bin {} from optimizer input", bin_id);
                None
            }
        }
    }

    async fn resolve(&self, items: Vec<Value>) -> Vec<Destination> {
        let mut destinations = Vec::with_capacity(items.len());
        for item in items {
            match &item {
                Value::String(bin_id) => destinations.extend(self.bin_destination(bin_id).await),
                Value::Object(map) => {
                    let id = map
                        .get("id")
                        .or_else(|| map.get("binId"))
                        .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|n| n.to_string())));
                    match (coordinates(&item), id) {
                        (Some(position), id) => destinations.push(Destination {
                            id,
                            lat: position.lat,
                            lng: position.lng,
                            fill_level: number(map, &["fill_level", "fillLevel", "fill"]),
                        }),
                        // No coordinates: the id may still name a stored bin
                        (None, Some(bin_id)) => destinations.extend(self.bin_destination(&bin_id).await),
                        (None, None) => tracing::warn!("Dropping optimizer destination without coordinates"),
                    }
                }
                other => tracing::warn!("Dropping optimizer destination of unexpected type: {}", other),
            }
        }
        destinations
    }

    pub fn fallback(reason: &str, elapsed_ms: u64) -> OptimizedRoute {
        OptimizedRoute {
            route: Vec::new(),
            distance: 0.0,
            duration: 0.0,
            performance: json!({
                "algorithm": "fallback",
                "error": reason,
                "processing_time_ms": elapsed_ms,
            }),
            fallback: true,
        }
    }

    pub async fn optimize(&self, request: OptimizeRequest) -> OptimizedRoute {
        let started = Instant::now();
        let start = request.start.as_ref().and_then(coordinates);
        let destinations = self
            .resolve(coerce_destinations(request.destinations.as_ref()))
            .await;
        tracing::debug!("Optimizing route over {} destination(s)", destinations.len());

        let constraints = request.constraints.unwrap_or_else(|| json!({}));
        let preferences = request.preferences.unwrap_or_else(|| json!({}));

        match self
            .inner
            .optimize_route(start, destinations, constraints, preferences)
            .await
        {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!("Route optimizer failed, returning empty route: {}", e);
                Self::fallback(&e.to_string(), started.elapsed().as_millis() as u64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bin::Bin;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Vec<Destination>>>);

    #[async_trait]
    impl RouteOptimizer for Recording {
        async fn optimize_route(
            &self,
            _start: Option<LatLng>,
            destinations: Vec<Destination>,
            _constraints: Value,
            _preferences: Value,
        ) -> FleetResult<OptimizedRoute> {
            self.0.lock().unwrap().push(destinations.clone());
            Ok(OptimizedRoute {
                route: destinations,
                distance: 1.0,
                duration: 2.0,
                performance: json!({}),
                fallback: false,
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl RouteOptimizer for Failing {
        async fn optimize_route(
            &self,
            _start: Option<LatLng>,
            _destinations: Vec<Destination>,
            _constraints: Value,
            _preferences: Value,
        ) -> FleetResult<OptimizedRoute> {
            Err(AppError::OptimizerFailed("model not loaded".into()))
        }
    }

    async fn store() -> Arc<DataStore> {
        let store = Arc::new(DataStore::new());
        store.upsert_bin(Bin::new("B1", 5.60, -0.18)).await;
        store.upsert_bin(Bin::new("B2", 5.62, -0.17)).await;
        store
    }

    async fn run(destinations: Value) -> Vec<Destination> {
        let recording = Arc::new(Recording::default());
        let optimizer = SanitizingOptimizer::new(recording.clone(), store().await);
        optimizer
            .optimize(OptimizeRequest {
                destinations: Some(destinations),
                ..Default::default()
            })
            .await;
        let calls = recording.0.lock().unwrap();
        assert_eq!(calls.len(), 1);
        calls[0].clone()
    }

    #[tokio::test]
    async fn test_malformed_destinations_coerced() {
        assert!(run(Value::Null).await.is_empty());
        assert!(run(json!({})).await.is_empty());

        let from_bins = run(json!({ "bins": [{ "id": "B9", "lat": 5.6, "lng": -0.2 }] })).await;
        assert_eq!(from_bins.len(), 1);
        assert_eq!(from_bins[0].id.as_deref(), Some("B9"));

        let from_ids = run(json!({ "binIds": ["B1", "missing", "B2"] })).await;
        let ids: Vec<_> = from_ids.iter().filter_map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec!["B1", "B2"]);
    }

    #[tokio::test]
    async fn test_id_without_coordinates_resolved_from_store() {
        let resolved = run(json!({ "bins": [{ "id": "B1" }, { "binId": "B2" }, { "id": "missing" }] })).await;
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id.as_deref(), Some("B1"));
        assert_eq!(resolved[0].lat, 5.60);
        assert_eq!(resolved[1].id.as_deref(), Some("B2"));
        assert_eq!(resolved[1].lng, -0.17);
        assert!(resolved[1].fill_level.is_some());
    }

    #[tokio::test]
    async fn test_single_object_with_coordinates() {
        let single = run(json!({ "location": { "latitude": 5.61, "longitude": -0.19 } })).await;
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].lat, 5.61);
    }

    #[tokio::test]
    async fn test_failure_yields_fallback() {
        let optimizer = SanitizingOptimizer::new(Arc::new(Failing), store().await);
        let result = optimizer.optimize(OptimizeRequest::default()).await;
        assert!(result.fallback);
        assert!(result.route.is_empty());
        assert_eq!(result.distance, 0.0);
        assert_eq!(result.duration, 0.0);
        assert_eq!(result.performance["algorithm"], "fallback");
    }

    #[tokio::test]
    async fn test_nearest_stop_order() {
        let stops = vec![
            Destination { id: Some("far".into()), lat: 5.70, lng: -0.18, fill_level: None },
            Destination { id: Some("near".into()), lat: 5.61, lng: -0.18, fill_level: None },
        ];
        let result = NearestStopOptimizer
            .optimize_route(Some(LatLng::new(5.60, -0.18)), stops, json!({}), json!({}))
            .await
            .unwrap();
        let order: Vec<_> = result.route.iter().filter_map(|d| d.id.as_deref()).collect();
        assert_eq!(order, vec!["near", "far"]);
        assert!(result.distance > 10.0 && result.distance < 12.0);
        assert!(!result.fallback);
    }
}
