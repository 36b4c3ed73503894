// Bin and driver history reports.
use crate::{
    errors::{FleetError, FleetResult},
    models::{
        collection::{Collection, Verification},
        route::RouteStatus,
    },
    reports::template::{Metric, Report, Section, Table, Tone},
    services::DataStore,
    state::Operator,
    utils::html::{datetime, opt_text, percent, DASH},
};

fn fill_tone(fill: f64) -> Tone {
    if fill >= 85.0 {
        Tone::Critical
    } else if fill >= 60.0 {
        Tone::Warning
    } else {
        Tone::Good
    }
}

fn verified_share(collections: &[Collection]) -> Option<f64> {
    let settled: Vec<&Collection> = collections
        .iter()
        .filter(|c| matches!(c.verification, Verification::SensorVerified | Verification::SensorRejected))
        .collect();
    if settled.is_empty() {
        return None;
    }
    let verified = settled
        .iter()
        .filter(|c| c.verification == Verification::SensorVerified)
        .count();
    Some(100.0 * verified as f64 / settled.len() as f64)
}

fn weight(value: Option<f64>) -> String {
    value.map_or_else(|| DASH.to_string(), |kg| format!("{:.1} kg", kg))
}

pub async fn bin_report(store: &DataStore, bin_id: &str, operator: &Operator) -> FleetResult<Report> {
    let bin = store
        .get_bin(bin_id)
        .await
        .ok_or_else(|| FleetError::bin_not_found(bin_id))?;
    let collections = store.collections_for_bin(bin_id).await;
    let routes: Vec<_> = store
        .list_routes()
        .await
        .into_iter()
        .filter(|r| r.bin_ids.iter().any(|id| id == bin_id))
        .collect();
    let complaints: Vec<_> = store
        .list_complaints()
        .await
        .into_iter()
        .filter(|c| c.bin_id.as_deref() == Some(bin_id))
        .collect();

    let sensor = &bin.sensor_data;
    let details = Section::new("Bin details").metrics(vec![
        Metric::new("Fill level", format!("{:.0}%", bin.fill_level)).tone(fill_tone(bin.fill_level)),
        Metric::new("Status", bin.status.as_str()),
        Metric::new("Capacity", format!("{:.0} L", bin.capacity_liters)),
        Metric::new("Sensor", opt_text(bin.sensor_imei.as_deref())),
        Metric::new("Battery", percent(sensor.battery)),
        Metric::new(
            "Temperature",
            sensor
                .temperature
                .map_or_else(|| DASH.to_string(), |t| format!("{:.1}°C", t)),
        ),
        Metric::new("Last collected", datetime(bin.last_collected_at)),
    ]);

    let avg_fill_before = if collections.is_empty() {
        None
    } else {
        Some(collections.iter().map(|c| c.fill_before).sum::<f64>() / collections.len() as f64)
    };
    let summary = Section::new("Collection summary").metrics(vec![
        Metric::new("Collections", collections.len().to_string()),
        Metric::new("Avg fill at pickup", percent(avg_fill_before)),
        Metric::new("Sensor verified", percent(verified_share(&collections))),
        Metric::new(
            "Total weight",
            weight(Some(collections.iter().filter_map(|c| c.weight_kg).sum())),
        ),
    ]);

    let mut history = Table::new(
        &["Date", "Driver", "Fill before", "Fill after", "Weight", "Verification"],
        "No collections recorded for this bin",
    );
    for c in &collections {
        history.row(vec![
            datetime(Some(c.collected_at)),
            c.driver_id.clone(),
            format!("{:.0}%", c.fill_before),
            format!("{:.0}%", c.fill_after),
            weight(c.weight_kg),
            c.verification.as_str().to_string(),
        ]);
    }

    let mut route_table = Table::new(&["Route", "Driver", "Status", "Priority", "Created"], "Never routed");
    for r in &routes {
        route_table.row(vec![
            r.id.clone(),
            r.driver_id.clone(),
            r.status.as_str().to_string(),
            r.priority.as_str().to_string(),
            datetime(Some(r.created_at)),
        ]);
    }

    let mut complaint_table = Table::new(&["Reference", "Type", "Status", "Filed"], "No complaints");
    for c in &complaints {
        complaint_table.row(vec![
            c.reference.clone(),
            c.complaint_type.clone(),
            c.status.as_str().to_string(),
            datetime(Some(c.created_at)),
        ]);
    }

    Ok(Report::new(format!("Bin report: {}", bin.id))
        .subtitle(opt_text(bin.address.as_deref()))
        .generated_by(operator.name.clone())
        .section(details)
        .section(summary)
        .section(Section::new("Collection history").table(history))
        .section(Section::new("Routes").table(route_table))
        .section(Section::new("Complaints").table(complaint_table)))
}

pub async fn driver_report(store: &DataStore, driver_id: &str, operator: &Operator) -> FleetResult<Report> {
    let driver = store
        .get_driver(driver_id)
        .await
        .ok_or_else(|| FleetError::driver_not_found(driver_id))?;
    let routes = store.routes_for_driver(driver_id).await;
    let collections = store.collections_for_driver(driver_id).await;
    let fuel = store.fuel_level(driver_id).await;

    let count = |status: RouteStatus| routes.iter().filter(|r| r.status == status).count();
    let active = routes.iter().filter(|r| r.status.is_active()).count();

    let fuel_tone = match fuel {
        Some(level) if level < 20.0 => Tone::Critical,
        Some(level) if level < 40.0 => Tone::Warning,
        _ => Tone::Normal,
    };

    let details = Section::new("Driver details").metrics(vec![
        Metric::new("Name", driver.name.clone()),
        Metric::new("Phone", opt_text(driver.phone_number.as_deref())),
        Metric::new("Vehicle", opt_text(driver.vehicle_id.as_deref())),
        Metric::new("Rating", format!("{:.1}", driver.rating)),
        Metric::new("Fuel", percent(fuel)).tone(fuel_tone),
        Metric::new("Location", if driver.position().is_some() { "reported" } else { "unknown" }),
    ]);

    let performance = Section::new("Performance").metrics(vec![
        Metric::new("Collections", driver.total_collections.to_string()),
        Metric::new("Active routes", active.to_string()),
        Metric::new("Completed routes", count(RouteStatus::Completed).to_string()).tone(Tone::Good),
        Metric::new("Cancelled routes", count(RouteStatus::Cancelled).to_string()),
        Metric::new("Sensor verified", percent(verified_share(&collections))),
    ]);

    let mut route_table = Table::new(
        &["Route", "Bins", "Priority", "Status", "Created", "Completed"],
        "No routes assigned",
    );
    for r in &routes {
        route_table.row(vec![
            r.id.clone(),
            r.bin_ids.join(", "),
            r.priority.as_str().to_string(),
            r.status.as_str().to_string(),
            datetime(Some(r.created_at)),
            datetime(r.completed_at),
        ]);
    }

    let mut collection_table = Table::new(&["Date", "Bin", "Fill before", "Weight", "Verification"], "No collections");
    for c in &collections {
        collection_table.row(vec![
            datetime(Some(c.collected_at)),
            c.bin_id.clone(),
            format!("{:.0}%", c.fill_before),
            weight(c.weight_kg),
            c.verification.as_str().to_string(),
        ]);
    }

    Ok(Report::new(format!("Driver report: {}", driver.name))
        .subtitle(driver.id.clone())
        .generated_by(operator.name.clone())
        .section(details)
        .section(performance)
        .section(Section::new("Route history").table(route_table))
        .section(Section::new("Collections").table(collection_table)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{bin::Bin, driver::Driver};
    use chrono::Utc;

    #[tokio::test]
    async fn test_bin_report_with_no_history() {
        let store = DataStore::new();
        store.upsert_bin(Bin::new("B1", 5.6, -0.18)).await;

        let report = bin_report(&store, "B1", &Operator::default()).await.unwrap();
        assert_eq!(report.title, "Bin report: B1");
        assert_eq!(report.subtitle.as_deref(), Some(DASH));
        let html = crate::reports::render(&report);
        assert!(html.contains("No collections recorded for this bin"));
    }

    #[tokio::test]
    async fn test_driver_report_counts() {
        let store = DataStore::new();
        store.upsert_driver(Driver::new("D1", "Yaw")).await;
        store.set_fuel_level("D1", 12.0).await;
        store
            .add_collection(Collection {
                id: "col_1".into(),
                bin_id: "B1".into(),
                driver_id: "D1".into(),
                route_id: None,
                fill_before: 80.0,
                fill_after: 5.0,
                weight_kg: Some(30.0),
                temperature: None,
                verification: Verification::SensorVerified,
                collected_at: Utc::now(),
            })
            .await;

        let report = driver_report(&store, "D1", &Operator::default()).await.unwrap();
        let html = crate::reports::render(&report);
        assert!(html.contains("metric critical"));
        assert!(html.contains("100%"));
        assert!(html.contains("No routes assigned"));
    }

    #[tokio::test]
    async fn test_unknown_subjects() {
        let store = DataStore::new();
        assert!(matches!(
            bin_report(&store, "nope", &Operator::default()).await,
            Err(FleetError::BinNotFound(_))
        ));
        assert!(matches!(
            driver_report(&store, "nope", &Operator::default()).await,
            Err(FleetError::DriverNotFound(_))
        ));
    }
}
