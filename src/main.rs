use std::sync::Arc;

use binfleet::{
    handlers,
    logging::{self, ErrorSink, RecentErrors},
    state::{AppConfig, AppState},
    FleetError, FleetResult,
};

const RECENT_ERROR_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> FleetResult<()> {
    let config = AppConfig::from_env()?;

    let recent_errors = Arc::new(RecentErrors::new(RECENT_ERROR_CAPACITY));
    let sink: Arc<dyn ErrorSink> = recent_errors.clone();
    logging::init_tracing(&config.log_filter, Some(sink))?;

    let bind_addr = config.bind_addr.clone();
    let app_state = Arc::new(AppState::new(config, recent_errors).await?);

    // Warm the stored readings; bins keep their seeded values when the vendor is down.
    let sensors = app_state.sensor_service.clone();
    tokio::spawn(async move {
        let views = sensors.refresh_all().await;
        tracing::info!("Start-up sensor refresh finished for {} bin(s)", views.len());
    });

    let app = handlers::router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| FleetError::InvalidConfiguration(format!("cannot bind {}: {}", bind_addr, e)))?;
    tracing::info!("BinFleet dashboard listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| FleetError::InternalServer(e.to_string()))
}
