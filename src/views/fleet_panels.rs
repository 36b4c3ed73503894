// Fleet management sub-tabs. Each panel is a table of records plus a create form.
use std::str::FromStr;

use crate::{
    errors::FleetError,
    models::{
        driver::{Driver, Vehicle},
        fleet::GeofenceShape,
    },
    services::FleetSnapshot,
    utils::html::{datetime, escape, opt_text, percent, DASH},
    views::{badge, options, wire_name},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetTab {
    Geofences,
    Assets,
    Dispatch,
    Inspections,
    Fuel,
    Energy,
}

impl FleetTab {
    pub const ALL: [FleetTab; 6] = [
        FleetTab::Geofences,
        FleetTab::Assets,
        FleetTab::Dispatch,
        FleetTab::Inspections,
        FleetTab::Fuel,
        FleetTab::Energy,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            FleetTab::Geofences => "geofences",
            FleetTab::Assets => "assets",
            FleetTab::Dispatch => "dispatches",
            FleetTab::Inspections => "inspections",
            FleetTab::Fuel => "fuel",
            FleetTab::Energy => "ev",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FleetTab::Geofences => "Geofencing",
            FleetTab::Assets => "Assets",
            FleetTab::Dispatch => "Dispatch",
            FleetTab::Inspections => "Inspections",
            FleetTab::Fuel => "Fuel",
            FleetTab::Energy => "EV energy",
        }
    }
}

impl FromStr for FleetTab {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FleetTab::ALL
            .into_iter()
            .find(|tab| tab.slug() == s)
            .ok_or_else(|| FleetError::not_found(format!("Fleet tab {}", s)))
    }
}

/// Rows of escaped cells, or the empty message when there are none.
fn table(headers: &[&str], rows: Vec<Vec<String>>, empty: &str) -> String {
    if rows.is_empty() {
        return format!("<p class=\"muted\">{}</p>", escape(empty));
    }
    let head: String = headers.iter().map(|h| format!("<th>{}</th>", escape(h))).collect();
    let body: String = rows
        .into_iter()
        .map(|row| {
            let cells: String = row.into_iter().map(|c| format!("<td>{}</td>", c)).collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();
    format!("<table><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table>")
}

fn create_form(action: &str, fields: &str) -> String {
    format!(
        "<form data-json data-reload method=\"post\" action=\"{}\">{}\
         <button type=\"submit\">Save</button><span class=\"form-result\"></span></form>",
        escape(action),
        fields
    )
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn driver_options(drivers: &[Driver]) -> String {
    options(drivers.iter().map(|d| (d.id.as_str(), d.name.as_str())), None)
}

fn vehicle_options(vehicles: &[Vehicle]) -> String {
    options(
        vehicles.iter().map(|v| (v.id.as_str(), v.license_plate.as_str())),
        None,
    )
}

fn geofences(snapshot: &FleetSnapshot) -> String {
    let rows = snapshot
        .geofences
        .iter()
        .map(|g| {
            let area = match &g.shape {
                GeofenceShape::Circle { center, radius_m } => {
                    format!("circle {:.0} m around {:.5}, {:.5}", radius_m, center.lat, center.lng)
                }
                GeofenceShape::Polygon { vertices } => format!("polygon, {} vertices", vertices.len()),
            };
            vec![
                escape(&g.name),
                escape(&area),
                if g.alert_on_enter { "yes" } else { "no" }.to_string(),
                if g.alert_on_exit { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    let form = create_form(
        "/fleet/geofences",
        "<label>Name<input name=\"name\" required></label>\
         <label>Shape<select name=\"kind\"><option value=\"circle\">Circle</option><option value=\"polygon\">Polygon</option></select></label>\
         <label>Centre latitude<input type=\"number\" step=\"any\" name=\"lat\"></label>\
         <label>Centre longitude<input type=\"number\" step=\"any\" name=\"lng\"></label>\
         <label>Radius (m)<input type=\"number\" step=\"any\" name=\"radius_m\"></label>\
         <label>Polygon vertices, one \"lat,lng\" per line<textarea data-lines name=\"vertices\"></textarea></label>\
         <label><input type=\"checkbox\" name=\"alert_on_enter\" checked> Alert on enter</label>\
         <label><input type=\"checkbox\" name=\"alert_on_exit\" checked> Alert on exit</label>",
    );
    table(&["Name", "Area", "Enter alert", "Exit alert"], rows, "No geofences defined") + &form
}

fn assets(snapshot: &FleetSnapshot, drivers: &[Driver]) -> String {
    let rows = snapshot
        .assets
        .iter()
        .map(|a| {
            vec![
                escape(&a.name),
                escape(&a.asset_type),
                escape(&opt_text(a.serial_number.as_deref())),
                escape(&opt_text(a.assigned_to.as_deref())),
                badge(&wire_name(&a.status)),
                a.purchase_value.map_or_else(|| DASH.to_string(), money),
            ]
        })
        .collect();
    let form = create_form(
        "/fleet/assets",
        &format!(
            "<label>Name<input name=\"name\" required></label>\
             <label>Type<input name=\"asset_type\" required></label>\
             <label>Serial number<input name=\"serial_number\"></label>\
             <label>Assigned to<select name=\"assigned_to\"><option value=\"\">Nobody</option>{}</select></label>\
             <label>Purchase value<input type=\"number\" step=\"any\" min=\"0\" name=\"purchase_value\"></label>",
            driver_options(drivers)
        ),
    );
    table(
        &["Name", "Type", "Serial", "Assigned to", "Status", "Value"],
        rows,
        "No assets registered",
    ) + &form
}

fn dispatch(snapshot: &FleetSnapshot, drivers: &[Driver], vehicles: &[Vehicle]) -> String {
    let rows = snapshot
        .dispatches
        .iter()
        .map(|d| {
            vec![
                escape(&d.destination),
                escape(&d.driver_id),
                escape(&opt_text(d.vehicle_id.as_deref())),
                badge(d.priority.as_str()),
                badge(&wire_name(&d.status)),
                escape(&datetime(Some(d.created_at))),
            ]
        })
        .collect();
    let form = create_form(
        "/fleet/dispatches",
        &format!(
            "<label>Driver<select name=\"driver_id\" required>{drivers}</select></label>\
             <label>Vehicle<select name=\"vehicle_id\"><option value=\"\">Driver's own</option>{vehicles}</select></label>\
             <label>Destination<input name=\"destination\" required></label>\
             <label>Priority<select name=\"priority\"><option value=\"\">Medium</option>{priorities}</select></label>\
             <label>Notes<textarea name=\"notes\"></textarea></label>",
            drivers = driver_options(drivers),
            vehicles = vehicle_options(vehicles),
            priorities = options([("low", "Low"), ("high", "High"), ("urgent", "Urgent")], None),
        ),
    );
    table(
        &["Destination", "Driver", "Vehicle", "Priority", "Status", "Created"],
        rows,
        "Nothing dispatched",
    ) + &form
}

fn inspections(snapshot: &FleetSnapshot, drivers: &[Driver], vehicles: &[Vehicle]) -> String {
    let rows = snapshot
        .inspections
        .iter()
        .map(|i| {
            vec![
                escape(&i.vehicle_id),
                escape(&i.driver_id),
                badge(&wire_name(&i.kind)),
                i.defects.len().to_string(),
                if i.safe_to_operate { badge("safe") } else { badge("unsafe") },
                escape(&datetime(Some(i.created_at))),
            ]
        })
        .collect();
    let work_orders = snapshot
        .work_orders
        .iter()
        .map(|w| {
            vec![
                escape(&w.vehicle_id),
                escape(&w.description),
                badge(&wire_name(&w.status)),
            ]
        })
        .collect();
    let form = create_form(
        "/fleet/inspections",
        &format!(
            "<label>Vehicle<select name=\"vehicle_id\" required>{vehicles}</select></label>\
             <label>Driver<select name=\"driver_id\" required>{drivers}</select></label>\
             <label>Kind<select name=\"kind\"><option value=\"pre-trip\">Pre-trip</option><option value=\"post-trip\">Post-trip</option></select></label>\
             <label>Odometer (km)<input type=\"number\" step=\"any\" name=\"odometer_km\"></label>\
             <label>Defects, one per line<textarea data-lines name=\"defects\"></textarea></label>",
            vehicles = vehicle_options(vehicles),
            drivers = driver_options(drivers),
        ),
    );
    table(
        &["Vehicle", "Driver", "Kind", "Defects", "Result", "Date"],
        rows,
        "No inspections recorded",
    ) + "<h3>Work orders</h3>"
        + &table(&["Vehicle", "Defect", "Status"], work_orders, "No work orders")
        + &form
}

fn fuel(snapshot: &FleetSnapshot, drivers: &[Driver], vehicles: &[Vehicle]) -> String {
    let rows = snapshot
        .fuel_transactions
        .iter()
        .map(|t| {
            vec![
                escape(&t.vehicle_id),
                escape(&opt_text(t.driver_id.as_deref())),
                format!("{:.1} L", t.liters),
                money(t.total_cost),
                escape(&opt_text(t.station.as_deref())),
                escape(&percent(t.tank_level_after)),
                escape(&datetime(Some(t.created_at))),
            ]
        })
        .collect();
    let form = create_form(
        "/fleet/fuel",
        &format!(
            "<label>Vehicle<select name=\"vehicle_id\" required>{vehicles}</select></label>\
             <label>Driver<select name=\"driver_id\"><option value=\"\">None</option>{drivers}</select></label>\
             <label>Liters<input type=\"number\" step=\"any\" min=\"0\" name=\"liters\" required></label>\
             <label>Price per liter<input type=\"number\" step=\"any\" min=\"0\" name=\"price_per_liter\" required></label>\
             <label>Odometer (km)<input type=\"number\" step=\"any\" name=\"odometer_km\"></label>\
             <label>Station<input name=\"station\"></label>\
             <label>Tank level after (%)<input type=\"number\" step=\"any\" min=\"0\" max=\"100\" name=\"tank_level_after\"></label>",
            vehicles = vehicle_options(vehicles),
            drivers = driver_options(drivers),
        ),
    );
    table(
        &["Vehicle", "Driver", "Volume", "Cost", "Station", "Tank after", "Date"],
        rows,
        "No fuel transactions",
    ) + &form
}

fn energy(snapshot: &FleetSnapshot, vehicles: &[Vehicle]) -> String {
    let rows = snapshot
        .ev_vehicles
        .iter()
        .map(|ev| {
            let charge = if ev.is_low_charge() {
                format!("{} {}", escape(&percent(Some(ev.state_of_charge))), badge("critical"))
            } else {
                escape(&percent(Some(ev.state_of_charge)))
            };
            vec![
                escape(&ev.vehicle_id),
                charge,
                format!("{:.1} kWh", ev.energy_remaining_kwh()),
                ev.range_km.map_or_else(|| DASH.to_string(), |km| format!("{:.0} km", km)),
                if ev.charging { "charging" } else { DASH }.to_string(),
            ]
        })
        .collect();
    let form = create_form(
        "/fleet/ev",
        &format!(
            "<label>Vehicle<select name=\"vehicle_id\" required>{}</select></label>\
             <label>Battery capacity (kWh)<input type=\"number\" step=\"any\" min=\"0\" name=\"battery_capacity_kwh\" required></label>\
             <label>State of charge (%)<input type=\"number\" step=\"any\" min=\"0\" max=\"100\" name=\"state_of_charge\" required></label>\
             <label>Range (km)<input type=\"number\" step=\"any\" name=\"range_km\"></label>\
             <label><input type=\"checkbox\" name=\"charging\"> Charging</label>",
            vehicle_options(vehicles)
        ),
    );
    table(
        &["Vehicle", "Charge", "Energy left", "Range", "Charging"],
        rows,
        "No electric vehicles tracked",
    ) + &form
}

/// Tab strip plus the selected panel.
pub fn fleet_panel(tab: FleetTab, snapshot: &FleetSnapshot, drivers: &[Driver], vehicles: &[Vehicle]) -> String {
    let tabs: String = FleetTab::ALL
        .iter()
        .map(|t| {
            let label = if *t == tab {
                format!("<strong>{}</strong>", t.title())
            } else {
                t.title().to_string()
            };
            format!("<a href=\"/fleet/{}\">{}</a> ", t.slug(), label)
        })
        .collect();
    let body = match tab {
        FleetTab::Geofences => geofences(snapshot),
        FleetTab::Assets => assets(snapshot, drivers),
        FleetTab::Dispatch => dispatch(snapshot, drivers, vehicles),
        FleetTab::Inspections => inspections(snapshot, drivers, vehicles),
        FleetTab::Fuel => fuel(snapshot, drivers, vehicles),
        FleetTab::Energy => energy(snapshot, vehicles),
    };
    format!("<div class=\"tabs\">{tabs}</div><h2>{}</h2>{body}", tab.title())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fleet::EvVehicle;
    use chrono::Utc;

    #[test]
    fn test_tab_slugs_round_trip() {
        for tab in FleetTab::ALL {
            assert_eq!(tab.slug().parse::<FleetTab>().unwrap(), tab);
        }
        assert!("parking".parse::<FleetTab>().is_err());
    }

    #[test]
    fn test_empty_panels_show_messages() {
        let snapshot = FleetSnapshot::default();
        let html = fleet_panel(FleetTab::Geofences, &snapshot, &[], &[]);
        assert!(html.contains("No geofences defined"));
        assert!(html.contains("action=\"/fleet/geofences\""));
        assert!(html.contains("<strong>Geofencing</strong>"));

        let html = fleet_panel(FleetTab::Inspections, &snapshot, &[], &[]);
        assert!(html.contains("data-lines name=\"defects\""));
        assert!(html.contains("No work orders"));
    }

    #[test]
    fn test_low_charge_flagged() {
        let snapshot = FleetSnapshot {
            ev_vehicles: vec![EvVehicle {
                id: "ev_1".into(),
                vehicle_id: "V1".into(),
                battery_capacity_kwh: 200.0,
                state_of_charge: 10.0,
                range_km: None,
                charging: false,
                updated_at: Utc::now(),
            }],
            ..FleetSnapshot::default()
        };
        let html = fleet_panel(FleetTab::Energy, &snapshot, &[], &[]);
        assert!(html.contains("10% <span class=\"badge critical\">"));
        assert!(html.contains("20.0 kWh"));
    }
}
