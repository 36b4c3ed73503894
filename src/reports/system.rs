// System-wide analytics report and the full JSON export.
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    errors::FleetResult,
    models::{
        bin::BinStatus,
        collection::Verification,
        fleet::WorkOrderStatus,
        route::RouteStatus,
    },
    reports::template::{Metric, Report, Section, Table, Tone},
    services::{DataStore, FleetService, FleetSnapshot, StoreSnapshot},
    state::Operator,
    utils::html::{opt_text, percent},
};

pub async fn system_report(store: &DataStore, fleet: &FleetService, operator: &Operator) -> Report {
    let data = store.snapshot().await;
    let fleet = fleet.snapshot().await;

    let bins = &data.bins;
    let critical: Vec<_> = bins.iter().filter(|b| b.is_critical()).collect();
    let avg_fill = if bins.is_empty() {
        None
    } else {
        Some(bins.iter().map(|b| b.fill_level).sum::<f64>() / bins.len() as f64)
    };
    let offline = bins.iter().filter(|b| b.status == BinStatus::Offline).count();

    let bin_section = Section::new("Bins").metrics(vec![
        Metric::new("Total bins", bins.len().to_string()),
        Metric::new("Critical", critical.len().to_string()).tone(if critical.is_empty() {
            Tone::Good
        } else {
            Tone::Critical
        }),
        Metric::new("Average fill", percent(avg_fill)),
        Metric::new("Offline sensors", offline.to_string()).tone(if offline > 0 {
            Tone::Warning
        } else {
            Tone::Normal
        }),
    ]);

    let route_count = |status: RouteStatus| data.routes.iter().filter(|r| r.status == status).count();
    let on_route = data
        .drivers
        .iter()
        .filter(|d| data.routes.iter().any(|r| r.driver_id == d.id && r.status.is_active()))
        .count();
    let operations = Section::new("Operations").metrics(vec![
        Metric::new("Drivers", data.drivers.iter().filter(|d| d.is_active).count().to_string()),
        Metric::new("Drivers on route", on_route.to_string()),
        Metric::new("Pending routes", route_count(RouteStatus::Pending).to_string()),
        Metric::new("In progress", route_count(RouteStatus::InProgress).to_string()),
        Metric::new("Completed", route_count(RouteStatus::Completed).to_string()).tone(Tone::Good),
        Metric::new("Cancelled", route_count(RouteStatus::Cancelled).to_string()),
    ]);

    let verification = |v: Verification| data.collections.iter().filter(|c| c.verification == v).count();
    let collections = Section::new("Collections").metrics(vec![
        Metric::new("Total", data.collections.len().to_string()),
        Metric::new("Sensor verified", verification(Verification::SensorVerified).to_string()).tone(Tone::Good),
        Metric::new("Pending sensor", verification(Verification::PendingSensor).to_string()),
        Metric::new("Rejected", verification(Verification::SensorRejected).to_string()).tone(Tone::Warning),
        Metric::new("No sensor", verification(Verification::NoSensor).to_string()),
    ]);

    let open_work_orders = fleet
        .work_orders
        .iter()
        .filter(|w| w.status == WorkOrderStatus::Open)
        .count();
    let low_charge = fleet.ev_vehicles.iter().filter(|e| e.is_low_charge()).count();
    let fuel_spend: f64 = fleet.fuel_transactions.iter().map(|t| t.total_cost).sum();
    let fleet_section = Section::new("Fleet").metrics(vec![
        Metric::new("Vehicles", data.vehicles.len().to_string()),
        Metric::new("Open work orders", open_work_orders.to_string()).tone(if open_work_orders > 0 {
            Tone::Warning
        } else {
            Tone::Normal
        }),
        Metric::new("EVs low on charge", low_charge.to_string()).tone(if low_charge > 0 {
            Tone::Critical
        } else {
            Tone::Normal
        }),
        Metric::new("Fuel spend", format!("{:.2}", fuel_spend)),
        Metric::new("Geofences", fleet.geofences.len().to_string()),
        Metric::new("Assets", fleet.assets.len().to_string()),
    ]);

    let mut critical_table = Table::new(&["Bin", "Address", "Fill", "Status"], "No bins at critical fill");
    let mut sorted = critical.clone();
    sorted.sort_by(|a, b| b.fill_level.total_cmp(&a.fill_level));
    for bin in sorted {
        critical_table.row(vec![
            bin.id.clone(),
            opt_text(bin.address.as_deref()),
            format!("{:.0}%", bin.fill_level),
            bin.status.as_str().to_string(),
        ]);
    }

    let open_complaints: Vec<_> = data.complaints.iter().filter(|c| c.status.is_open()).collect();
    let mut complaint_table = Table::new(&["Reference", "Type", "Priority", "Bin"], "No open complaints");
    for c in &open_complaints {
        complaint_table.row(vec![
            c.reference.clone(),
            c.complaint_type.clone(),
            c.priority.as_str().to_string(),
            opt_text(c.bin_id.as_deref()),
        ]);
    }

    Report::new("System report")
        .subtitle(format!(
            "{} bins, {} drivers, {} open complaints",
            bins.len(),
            data.drivers.len(),
            open_complaints.len()
        ))
        .generated_by(operator.name.clone())
        .section(bin_section)
        .section(operations)
        .section(collections)
        .section(fleet_section)
        .section(Section::new("Critical bins").table(critical_table))
        .section(Section::new("Open complaints").table(complaint_table))
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub export_id: String,
    pub version: &'static str,
    pub exported_at: DateTime<Utc>,
    pub exported_by: String,
    pub data: StoreSnapshot,
    pub fleet: FleetSnapshot,
}

impl ExportDocument {
    pub fn file_name(&self) -> String {
        format!("binfleet-export-{}.json", self.exported_at.format("%Y-%m-%d"))
    }

    pub fn to_json(&self) -> FleetResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub async fn export_document(store: &DataStore, fleet: &FleetService, operator: &Operator) -> ExportDocument {
    ExportDocument {
        export_id: Uuid::new_v4().to_string(),
        version: "1.0",
        exported_at: Utc::now(),
        exported_by: operator.id.clone(),
        data: store.snapshot().await,
        fleet: fleet.snapshot().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bin::Bin;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_system_report_lists_critical_bins() {
        let store = Arc::new(DataStore::new());
        let mut full = Bin::new("B-FULL", 5.6, -0.18);
        full.fill_level = 92.0;
        store.upsert_bin(full).await;
        store.upsert_bin(Bin::new("B-EMPTY", 5.61, -0.18)).await;
        let fleet = FleetService::new(store.clone(), None);

        let report = system_report(&store, &fleet, &Operator::default()).await;
        let html = crate::reports::render(&report);
        assert!(html.contains("B-FULL"));
        assert!(!html.contains("B-EMPTY"));
        assert!(html.contains("No open complaints"));
    }

    #[tokio::test]
    async fn test_export_document() {
        let store = Arc::new(DataStore::new());
        store.upsert_bin(Bin::new("B1", 5.6, -0.18)).await;
        let fleet = FleetService::new(store.clone(), None);

        let doc = export_document(&store, &fleet, &Operator::default()).await;
        assert!(Uuid::parse_str(&doc.export_id).is_ok());
        assert!(doc.file_name().starts_with("binfleet-export-"));

        let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json["data"]["bins"][0]["id"], "B1");
        assert!(json["fleet"]["geofences"].as_array().unwrap().is_empty());
    }
}
