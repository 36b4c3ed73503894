// src/state.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    errors::{FleetError, FleetResult},
    logging::{NoiseFilter, RecentErrors},
    sensor::{Calibration, ExtractorConfig, FindyClient, FindyConfig, MeasurementExtractor, SensorClient, UnconfiguredSensorClient},
    services::{
        DataStore, DispatchService, ErrorLogClient, FleetService, HttpSyncClient, NearestStopOptimizer,
        RegistrationService, RouteOptimizer, SanitizingOptimizer, SensorService, StoreSnapshot, SyncClient,
        SyncSaveHook,
    },
};

/// The signed-in dashboard user; stamped on routes and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub id: String,
    pub name: String,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            id: "admin".to_string(),
            name: "Administrator".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_base: String,
    pub api_fallbacks: Vec<String>,
    pub findy: Option<FindyConfig>,
    pub operator: Operator,
    pub calibration: Calibration,
    pub extractor: ExtractorConfig,
    pub log_filter: String,
    pub seed_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            api_base: "http://localhost:3000".to_string(),
            api_fallbacks: vec!["http://localhost:8080".to_string()],
            findy: None,
            operator: Operator::default(),
            calibration: Calibration::default(),
            extractor: ExtractorConfig::default(),
            log_filter: "binfleet=info,tower_http=info".to_string(),
            seed_file: None,
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> FleetResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| FleetError::InvalidConfiguration(format!("{} must be a number, got '{}'", name, raw)))
}

impl AppConfig {
    pub fn from_env() -> FleetResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset and blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> FleetResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let findy = match (get("FINDY_BASE_URL"), get("FINDY_API_KEY")) {
            (Some(base_url), Some(api_key)) => Some(FindyConfig {
                base_url,
                api_key,
                timeout: Duration::from_secs(10),
            }),
            (Some(_), None) => return Err(FleetError::MissingEnvironmentVariable("FINDY_API_KEY".to_string())),
            (None, Some(_)) => return Err(FleetError::MissingEnvironmentVariable("FINDY_BASE_URL".to_string())),
            (None, None) => None,
        };

        let empty_cm = match get("BINFLEET_SENSOR_EMPTY_CM") {
            Some(raw) => parse_number("BINFLEET_SENSOR_EMPTY_CM", &raw)?,
            None => defaults.calibration.empty_cm,
        };
        let full_cm = match get("BINFLEET_SENSOR_FULL_CM") {
            Some(raw) => parse_number("BINFLEET_SENSOR_FULL_CM", &raw)?,
            None => defaults.calibration.full_cm,
        };
        let calibration = Calibration::new(empty_cm, full_cm).ok_or_else(|| {
            FleetError::InvalidConfiguration(format!(
                "sensor empty distance ({}) must exceed full distance ({})",
                empty_cm, full_cm
            ))
        })?;

        let mut extractor = ExtractorConfig::default();
        if let Some(raw) = get("BINFLEET_SENSOR_MAX_DEPTH") {
            let depth: usize = parse_number("BINFLEET_SENSOR_MAX_DEPTH", &raw)?;
            if depth == 0 {
                return Err(FleetError::InvalidConfiguration(
                    "BINFLEET_SENSOR_MAX_DEPTH must be at least 1".to_string(),
                ));
            }
            extractor.max_depth = depth;
        }

        let api_fallbacks = match get("BINFLEET_API_FALLBACKS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.api_fallbacks,
        };

        Ok(Self {
            bind_addr: get("BINFLEET_BIND").unwrap_or(defaults.bind_addr),
            api_base: get("BINFLEET_API_BASE").unwrap_or(defaults.api_base),
            api_fallbacks,
            findy,
            operator: Operator {
                id: get("BINFLEET_OPERATOR_ID").unwrap_or(defaults.operator.id),
                name: get("BINFLEET_OPERATOR_NAME").unwrap_or(defaults.operator.name),
            },
            calibration,
            extractor,
            log_filter: get("RUST_LOG").unwrap_or(defaults.log_filter),
            seed_file: get("BINFLEET_SEED_FILE").map(PathBuf::from),
        })
    }

    /// Origins tried for the client error log, configured base first.
    pub fn error_log_origins(&self) -> Vec<String> {
        std::iter::once(self.api_base.clone())
            .chain(self.api_fallbacks.iter().cloned())
            .collect()
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<DataStore>,
    pub sensor_service: Arc<SensorService>,
    pub dispatch_service: Arc<DispatchService>,
    pub registration_service: Arc<RegistrationService>,
    pub fleet_service: Arc<FleetService>,
    pub optimizer: Arc<SanitizingOptimizer>,
    pub error_log: Arc<ErrorLogClient>,
    pub sync_client: Arc<dyn SyncClient>,
    pub recent_errors: Arc<RecentErrors>,
}

impl AppState {
    pub async fn new(config: AppConfig, recent_errors: Arc<RecentErrors>) -> FleetResult<Self> {
        let store = Arc::new(DataStore::new());
        if let Some(path) = &config.seed_file {
            let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                FleetError::InvalidConfiguration(format!("cannot read seed file {}: {}", path.display(), e))
            })?;
            let snapshot: StoreSnapshot = serde_json::from_str(&raw)?;
            store.load(snapshot).await;
        }

        let sensor_client: Arc<dyn SensorClient> = match config.findy.clone() {
            Some(findy) => Arc::new(FindyClient::new(findy)),
            None => {
                tracing::warn!("FINDY_API_KEY not set, sensor refreshes will use stored values");
                Arc::new(UnconfiguredSensorClient)
            }
        };
        let sync_client: Arc<dyn SyncClient> = Arc::new(HttpSyncClient::new(config.api_base.clone()));

        Ok(Self::with_clients(
            config,
            store,
            sensor_client,
            sync_client,
            Arc::new(NearestStopOptimizer),
            recent_errors,
        ))
    }

    /// Wires the services around explicit collaborators.
    pub fn with_clients(
        config: AppConfig,
        store: Arc<DataStore>,
        sensor_client: Arc<dyn SensorClient>,
        sync_client: Arc<dyn SyncClient>,
        optimizer: Arc<dyn RouteOptimizer>,
        recent_errors: Arc<RecentErrors>,
    ) -> Self {
        let sensor_service = Arc::new(SensorService::new(
            store.clone(),
            sensor_client,
            MeasurementExtractor::new(config.extractor.clone()),
            config.calibration,
        ));
        let dispatch_service = Arc::new(DispatchService::new(store.clone(), sync_client.clone()));
        let registration_service = Arc::new(RegistrationService::new(store.clone()));
        let fleet_service = Arc::new(FleetService::new(
            store.clone(),
            Some(Arc::new(SyncSaveHook::new(sync_client.clone()))),
        ));
        let optimizer = Arc::new(SanitizingOptimizer::new(optimizer, store.clone()));
        let error_log = Arc::new(ErrorLogClient::new(config.error_log_origins(), NoiseFilter::default()));

        Self {
            config,
            store,
            sensor_service,
            dispatch_service,
            registration_service,
            fleet_service,
            optimizer,
            error_log,
            sync_client,
            recent_errors,
        }
    }
}
