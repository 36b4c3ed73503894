// Driver assignment and route creation modals.
use crate::{
    models::{
        bin::Bin,
        driver::{Driver, DriverCandidate},
        route::Route,
    },
    utils::html::{datetime, escape, path_segment, percent, DASH},
    views::{badge, options, wire_name},
};

const PRIORITIES: [(&str, &str); 4] = [
    ("low", "Low"),
    ("medium", "Medium"),
    ("high", "High"),
    ("urgent", "Urgent"),
];

fn distance(candidate: &DriverCandidate) -> String {
    if candidate.has_location {
        format!("{:.1} km", candidate.distance_km)
    } else {
        DASH.to_string()
    }
}

/// Ranked drivers for one bin. The first located driver carries the recommendation.
pub fn assignment_modal(bin: &Bin, candidates: &[DriverCandidate]) -> String {
    let id = escape(&bin.id);
    if candidates.is_empty() {
        return format!(
            "<div class=\"modal\"><h2>Assign driver to {id}</h2><p class=\"muted\">No active drivers available</p></div>"
        );
    }

    let rows: String = candidates
        .iter()
        .map(|c| {
            let name = if c.recommended {
                format!("{} {}", escape(&c.name), badge("recommended"))
            } else {
                escape(&c.name)
            };
            format!(
                "<tr><td><input type=\"radio\" name=\"driver_id\" value=\"{value}\"{checked} required></td>\
                 <td>{name}</td><td>{distance}</td><td>{rating:.1}</td><td>{fuel}</td><td>{routes}</td><td>{status}</td></tr>",
                value = escape(&c.driver_id),
                checked = if c.recommended { " checked" } else { "" },
                name = name,
                distance = escape(&distance(c)),
                rating = c.rating,
                fuel = escape(&percent(c.fuel_level)),
                routes = c.active_routes,
                status = badge(&wire_name(&c.status)),
            )
        })
        .collect();

    format!(
        "<div class=\"modal\"><h2>Assign driver to {id}</h2>\
         <p>Fill {fill:.0}% {status}</p>\
         <form data-json data-reload method=\"post\" action=\"/bins/{path}/assign\">\
         <table><thead><tr><th></th><th>Driver</th><th>Distance</th><th>Rating</th><th>Fuel</th><th>Active routes</th><th>Status</th></tr></thead>\
         <tbody>{rows}</tbody></table>\
         <label>Notes<textarea name=\"notes\"></textarea></label>\
         <button type=\"submit\">Assign</button><span class=\"form-result\"></span></form></div>",
        id = id,
        path = escape(&path_segment(&bin.id)),
        fill = bin.fill_level,
        status = badge(bin.status.as_str()),
        rows = rows,
    )
}

/// Multi-bin route builder. Critical bins are listed first and pre-selected.
pub fn route_modal(bins: &[Bin], drivers: &[Driver]) -> String {
    let mut ordered: Vec<&Bin> = bins.iter().collect();
    ordered.sort_by(|a, b| b.fill_level.total_cmp(&a.fill_level));

    let bin_rows: String = ordered
        .iter()
        .map(|bin| {
            format!(
                "<label><input type=\"checkbox\" data-list name=\"bin_ids\" value=\"{id}\"{checked}> \
                 {id} ({fill:.0}%) {status}</label>",
                id = escape(&bin.id),
                checked = if bin.is_critical() { " checked" } else { "" },
                fill = bin.fill_level,
                status = badge(bin.status.as_str()),
            )
        })
        .collect();

    let driver_options = options(
        drivers
            .iter()
            .filter(|d| d.is_active)
            .map(|d| (d.id.as_str(), d.name.as_str())),
        None,
    );

    format!(
        "<div class=\"modal\"><h2>New route</h2>\
         <form data-json method=\"post\" action=\"/routes\">\
         <fieldset><legend>Bins</legend>{bins}</fieldset>\
         <label>Driver<select name=\"driver_id\" required>{drivers}</select></label>\
         <label>Priority<select name=\"priority\"><option value=\"\">From fill level</option>{priorities}</select></label>\
         <label>Notes<textarea name=\"notes\"></textarea></label>\
         <button type=\"submit\">Create route</button><span class=\"form-result\"></span></form></div>",
        bins = if bin_rows.is_empty() {
            "<p class=\"muted\">No bins</p>".to_string()
        } else {
            bin_rows
        },
        drivers = driver_options,
        priorities = options(PRIORITIES, None),
    )
}

/// A driver's pending and in-progress routes.
pub fn driver_routes(driver: &Driver, routes: &[Route]) -> String {
    if routes.is_empty() {
        return format!(
            "<div><h3>{}</h3><p class=\"muted\">No active routes</p></div>",
            escape(&driver.name)
        );
    }
    let rows: String = routes
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&r.id),
                escape(&r.bin_ids.join(", ")),
                badge(r.priority.as_str()),
                badge(r.status.as_str()),
                escape(&datetime(Some(r.created_at))),
            )
        })
        .collect();
    format!(
        "<div><h3>{}</h3><table><thead><tr><th>Route</th><th>Bins</th><th>Priority</th><th>Status</th><th>Created</th></tr></thead>\
         <tbody>{}</tbody></table></div>",
        escape(&driver.name),
        rows
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::driver::MovementStatus;

    fn candidate(id: &str, has_location: bool, recommended: bool) -> DriverCandidate {
        DriverCandidate {
            driver_id: id.into(),
            name: format!("Driver {id}"),
            distance_km: if has_location { 1.34 } else { 999.0 },
            has_location,
            rating: 4.5,
            fuel_level: None,
            active_routes: 0,
            status: MovementStatus::Stationary,
            recommended,
        }
    }

    #[test]
    fn test_assignment_modal_marks_recommended() {
        let bin = Bin::new("B1", 5.6, -0.18);
        let html = assignment_modal(&bin, &[candidate("D1", true, true), candidate("D2", false, false)]);
        assert!(html.contains("value=\"D1\" checked"));
        assert!(html.contains("Driver D1 <span class=\"badge recommended\">"));
        assert!(html.contains("<td>1.3 km</td>"));
        assert!(html.contains("<td>—</td>"));
        assert!(html.contains("action=\"/bins/B1/assign\""));
    }

    #[test]
    fn test_assignment_modal_without_drivers() {
        let bin = Bin::new("B1", 5.6, -0.18);
        assert!(assignment_modal(&bin, &[]).contains("No active drivers available"));
    }

    #[test]
    fn test_route_modal_preselects_critical_bins() {
        let mut full = Bin::new("B-FULL", 5.6, -0.18);
        full.fill_level = 90.0;
        let empty = Bin::new("B-EMPTY", 5.6, -0.18);
        let html = route_modal(&[empty, full], &[Driver::new("D1", "Ama")]);
        assert!(html.contains("value=\"B-FULL\" checked"));
        assert!(!html.contains("value=\"B-EMPTY\" checked"));
        assert!(html.find("B-FULL").unwrap() < html.find("B-EMPTY").unwrap());
        assert!(html.contains("<option value=\"D1\">Ama</option>"));
    }
}
