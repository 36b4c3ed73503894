// Bin details modal. Renders from the store right away; the sensor section is swapped
// for a live one once the modal is on screen.
use crate::{
    models::{bin::Bin, route::Route},
    sensor::SensorField,
    services::BinSensorView,
    utils::html::{datetime, escape, opt_text, path_segment},
    views::{badge, cell},
};

const SENSOR_REFRESH_SCRIPT: &str = r#"
(() => {
  const section = document.querySelector('[data-sensor-src]');
  if (!section) return;
  fetch(section.dataset.sensorSrc)
    .then((res) => (res.ok ? res.text() : Promise.reject(res.status)))
    .then((html) => { section.innerHTML = html; })
    .catch(() => {});
})();
"#;

fn field_label(field: SensorField) -> &'static str {
    match field {
        SensorField::Fill => "Fill level",
        SensorField::Battery => "Battery",
        SensorField::Temperature => "Temperature",
        SensorField::Signal => "Signal",
        SensorField::Tilt => "Tilt",
    }
}

pub fn sensor_section(view: &BinSensorView) -> String {
    let cells: String = SensorField::ALL
        .iter()
        .map(|field| cell(field_label(*field), &view.display(*field)))
        .collect();

    let source = if view.live { "live" } else { "cached" };
    let note = view
        .degraded_reason
        .as_deref()
        .map(|reason| format!("<p class=\"muted\">Showing stored values: {}</p>", escape(reason)))
        .unwrap_or_default();

    format!(
        "<h3>Sensor {source}</h3><div class=\"grid\">{cells}</div>\
         <p class=\"muted\">Device {device} · IMEI {imei} · last report {last}</p>{note}",
        source = badge(source),
        cells = cells,
        device = escape(&opt_text(view.device_name.as_deref())),
        imei = escape(&opt_text(view.imei.as_deref())),
        last = escape(&datetime(view.last_report)),
        note = note,
    )
}

pub fn bin_modal(bin: &Bin, cached: &BinSensorView, active_route: Option<&Route>) -> String {
    let id = escape(&bin.id);
    let path = escape(&path_segment(&bin.id));
    let route = match active_route {
        Some(route) => format!(
            "<p>On route {} with driver {} {}</p>",
            escape(&route.id),
            escape(&route.driver_id),
            badge(route.status.as_str())
        ),
        None => "<p class=\"muted\">Not on a route</p>".to_string(),
    };

    format!(
        "<div class=\"modal\" id=\"bin-modal\">\
         <h2>Bin {id} {status}</h2><p>{address}</p>\
         <div class=\"grid\">{fill}{capacity}{position}{collected}</div>\
         {route}\
         <div data-sensor-src=\"/bins/{path}/sensor\">{sensor}</div>\
         <p><a href=\"/bins/{path}/assign\">Assign driver</a> · <a href=\"/reports/bins/{path}\" target=\"_blank\">Print report</a></p>\
         <script>{script}</script></div>",
        id = id,
        path = path,
        status = badge(bin.status.as_str()),
        address = escape(&opt_text(bin.address.as_deref())),
        fill = cell("Stored fill", &format!("{:.0}%", bin.fill_level)),
        capacity = cell("Capacity", &format!("{:.0} L", bin.capacity_liters)),
        position = cell("Position", &format!("{:.5}, {:.5}", bin.lat, bin.lng)),
        collected = cell("Last collected", &datetime(bin.last_collected_at)),
        route = route,
        sensor = sensor_section(cached),
        script = SENSOR_REFRESH_SCRIPT,
    )
}
