// Dashboard landing page: bins by fill level, drivers, active routes.
use std::collections::HashMap;

use crate::{
    models::{bin::Bin, complaint::Complaint, driver::Driver, route::Route},
    utils::html::{datetime, escape, opt_text, path_segment, percent},
    views::{badge, cell, wire_name},
};

pub struct Overview<'a> {
    pub bins: &'a [Bin],
    pub drivers: &'a [Driver],
    pub routes: &'a [Route],
    pub complaints: &'a [Complaint],
    pub fuel_levels: &'a HashMap<String, f64>,
}

fn bin_rows(bins: &[Bin]) -> String {
    let mut ordered: Vec<&Bin> = bins.iter().collect();
    ordered.sort_by(|a, b| b.fill_level.total_cmp(&a.fill_level));
    ordered
        .into_iter()
        .map(|bin| {
            let id = escape(&bin.id);
            let path = escape(&path_segment(&bin.id));
            format!(
                "<tr><td><a href=\"/bins/{path}/modal\">{id}</a></td><td>{address}</td><td>{fill:.0}%</td>\
                 <td>{status}</td><td>{collected}</td><td><a href=\"/bins/{path}/assign\">Assign</a></td></tr>",
                id = id,
                path = path,
                address = escape(&opt_text(bin.address.as_deref())),
                fill = bin.fill_level,
                status = badge(bin.status.as_str()),
                collected = escape(&datetime(bin.last_collected_at)),
            )
        })
        .collect()
}

fn driver_rows(drivers: &[Driver], routes: &[Route], fuel_levels: &HashMap<String, f64>) -> String {
    drivers
        .iter()
        .map(|driver| {
            let id = escape(&driver.id);
            let active = routes
                .iter()
                .filter(|r| r.driver_id == driver.id && r.status.is_active())
                .count();
            let fuel = fuel_levels.get(&driver.id).copied();
            format!(
                "<tr><td><a href=\"/reports/drivers/{id}\">{name}</a></td><td>{status}</td><td>{fuel}</td>\
                 <td><a href=\"/drivers/{id}/routes\">{active}</a></td><td>{located}</td></tr>",
                id = id,
                name = escape(&driver.name),
                status = badge(&wire_name(&driver.status)),
                fuel = escape(&percent(fuel)),
                active = active,
                located = if driver.position().is_some() { "yes" } else { "no" },
            )
        })
        .collect()
}

/// Expects complaints already in queue order.
fn complaint_rows(complaints: &[Complaint]) -> String {
    complaints
        .iter()
        .filter(|c| c.status.is_open())
        .map(|c| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&c.reference),
                escape(&c.complaint_type),
                escape(&opt_text(c.bin_id.as_deref())),
                badge(c.priority.as_str()),
                escape(&datetime(Some(c.created_at))),
            )
        })
        .collect()
}

pub fn overview(data: &Overview<'_>) -> String {
    let critical = data.bins.iter().filter(|b| b.is_critical()).count();
    let active_routes: Vec<&Route> = data.routes.iter().filter(|r| r.status.is_active()).collect();
    let open_complaints = data.complaints.iter().filter(|c| c.status.is_open()).count();

    let route_rows: String = active_routes
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&r.id),
                escape(&r.driver_id),
                escape(&r.bin_ids.join(", ")),
                badge(r.priority.as_str()),
                badge(r.status.as_str()),
            )
        })
        .collect();
    let routes = if route_rows.is_empty() {
        "<p class=\"muted\">No active routes</p>".to_string()
    } else {
        format!(
            "<table><thead><tr><th>Route</th><th>Driver</th><th>Bins</th><th>Priority</th><th>Status</th></tr></thead>\
             <tbody>{route_rows}</tbody></table>"
        )
    };

    format!(
        "<div class=\"grid\">{bins}{critical}{routes_count}{complaints}</div>\
         <p><a href=\"/complaints/new\">File complaint</a> · <a href=\"/issues/new\">Report issue</a> · \
         <a href=\"/drivers/new\">Register driver</a> · <a href=\"/vehicles/new\">Register vehicle</a></p>\
         <h2>Bins</h2><table><thead><tr><th>Bin</th><th>Address</th><th>Fill</th><th>Status</th><th>Last collected</th><th></th></tr></thead>\
         <tbody>{bin_rows}</tbody></table>\
         <h2>Drivers</h2><table><thead><tr><th>Driver</th><th>Status</th><th>Fuel</th><th>Active routes</th><th>Located</th></tr></thead>\
         <tbody>{driver_rows}</tbody></table>\
         <h2>Active routes</h2>{routes}{queue}",
        bins = cell("Bins", &data.bins.len().to_string()),
        critical = cell("Critical", &critical.to_string()),
        routes_count = cell("Active routes", &active_routes.len().to_string()),
        complaints = cell("Open complaints", &open_complaints.to_string()),
        bin_rows = bin_rows(data.bins),
        driver_rows = driver_rows(data.drivers, data.routes, data.fuel_levels),
        routes = routes,
        queue = match complaint_rows(data.complaints) {
            rows if rows.is_empty() => String::new(),
            rows => format!(
                "<h2>Complaints</h2><table><thead><tr><th>Reference</th><th>Type</th><th>Bin</th>\
                 <th>Priority</th><th>Filed</th></tr></thead><tbody>{rows}</tbody></table>"
            ),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_orders_bins_by_fill() {
        let mut full = Bin::new("B-FULL", 5.6, -0.18);
        full.fill_level = 95.0;
        let bins = vec![Bin::new("B-EMPTY", 5.6, -0.18), full];
        let drivers = vec![Driver::new("D1", "Kofi")];
        let fuel = HashMap::from([("D1".to_string(), 55.0)]);
        let html = overview(&Overview {
            bins: &bins,
            drivers: &drivers,
            routes: &[],
            complaints: &[],
            fuel_levels: &fuel,
        });
        assert!(html.find("B-FULL").unwrap() < html.find("B-EMPTY").unwrap());
        assert!(html.contains("<div class=\"label\">Critical</div><div>1</div>"));
        assert!(html.contains("<td>55%</td>"));
        assert!(html.contains("No active routes"));
    }

    #[test]
    fn test_closed_complaints_left_out_of_queue() {
        use crate::models::complaint::{TicketPriority, TicketStatus};
        use chrono::Utc;

        let complaint = |reference: &str, status| Complaint {
            id: reference.to_lowercase(),
            reference: reference.to_string(),
            complaint_type: "overflowing".to_string(),
            description: "Bin overflowing".to_string(),
            priority: TicketPriority::High,
            status,
            bin_id: Some("B1".to_string()),
            location: None,
            reporter_name: None,
            reporter_phone: None,
            image_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let complaints = vec![
            complaint("CMP-OPEN", TicketStatus::Open),
            complaint("CMP-DONE", TicketStatus::Closed),
        ];
        let html = overview(&Overview {
            bins: &[],
            drivers: &[],
            routes: &[],
            complaints: &complaints,
            fuel_levels: &HashMap::new(),
        });
        assert!(html.contains("<h2>Complaints</h2>"));
        assert!(html.contains("CMP-OPEN"));
        assert!(!html.contains("CMP-DONE"));
    }
}
