// Registration and reporting forms. Each posts JSON through FORM_SCRIPT.
use crate::{
    models::{bin::Bin, driver::Vehicle},
    utils::html::escape,
    views::options,
};

const COMPLAINT_TYPES: [(&str, &str); 5] = [
    ("overflowing", "Overflowing bin"),
    ("missed-collection", "Missed collection"),
    ("damaged-bin", "Damaged bin"),
    ("illegal-dumping", "Illegal dumping"),
    ("odour", "Odour"),
];

const TICKET_PRIORITIES: [(&str, &str); 4] = [
    ("low", "Low"),
    ("medium", "Medium"),
    ("high", "High"),
    ("urgent", "Urgent"),
];

const VEHICLE_TYPES: [(&str, &str); 6] = [
    ("rear-loader", "Rear loader"),
    ("side-loader", "Side loader"),
    ("front-loader", "Front loader"),
    ("compactor", "Compactor"),
    ("pickup", "Pickup"),
    ("van", "Van"),
];

const FUEL_TYPES: [(&str, &str); 4] = [
    ("diesel", "Diesel"),
    ("petrol", "Petrol"),
    ("cng", "CNG"),
    ("electric", "Electric"),
];

fn form(title: &str, action: &str, fields: &str, submit: &str) -> String {
    format!(
        "<div class=\"modal\"><h2>{title}</h2>\
         <form data-json data-reload method=\"post\" action=\"{action}\">{fields}\
         <button type=\"submit\">{submit}</button><span class=\"form-result\"></span></form></div>",
        title = escape(title),
        action = escape(action),
        fields = fields,
        submit = escape(submit),
    )
}

fn bin_options(bins: &[Bin]) -> String {
    options(bins.iter().map(|b| (b.id.as_str(), b.id.as_str())), None)
}

/// Complaint form. `bin_id` preselects the bin when opened from a bin modal.
pub fn complaint_form(bins: &[Bin], bin_id: Option<&str>) -> String {
    let bins = options(bins.iter().map(|b| (b.id.as_str(), b.id.as_str())), bin_id);
    let fields = format!(
        "<label>Type<select name=\"complaint_type\" required>{types}</select></label>\
         <label>Description<textarea name=\"description\" required></textarea></label>\
         <label>Priority<select name=\"priority\">{priorities}</select></label>\
         <label>Bin<select name=\"bin_id\"><option value=\"\">None</option>{bins}</select></label>\
         <label>Latitude<input type=\"number\" step=\"any\" name=\"lat\"></label>\
         <label>Longitude<input type=\"number\" step=\"any\" name=\"lng\"></label>\
         <label>Reporter<input name=\"reporter_name\"></label>\
         <label>Phone<input type=\"tel\" name=\"reporter_phone\"></label>\
         <label>Photo file name<input name=\"image_name\"></label>",
        types = options(COMPLAINT_TYPES, None),
        priorities = options(TICKET_PRIORITIES, Some("medium")),
        bins = bins,
    );
    form("File a complaint", "/complaints", &fields, "Submit complaint")
}

pub fn driver_form(vehicles: &[Vehicle]) -> String {
    let vehicles = options(
        vehicles
            .iter()
            .map(|v| (v.id.as_str(), v.license_plate.as_str())),
        None,
    );
    let fields = format!(
        "<label>Name<input name=\"name\" required></label>\
         <label>Phone<input type=\"tel\" name=\"phone_number\"></label>\
         <label>License number<input name=\"license_number\"></label>\
         <label>Vehicle<select name=\"vehicle_id\"><option value=\"\">Unassigned</option>{vehicles}</select></label>"
    );
    form("Register driver", "/drivers", &fields, "Register")
}

pub fn vehicle_form() -> String {
    let fields = format!(
        "<label>License plate<input name=\"license_plate\" required></label>\
         <label>Type<select name=\"vehicle_type\">{types}</select></label>\
         <label>Fuel<select name=\"fuel_type\">{fuels}</select></label>\
         <label>Capacity (kg)<input type=\"number\" step=\"any\" min=\"0\" name=\"capacity_kg\" required></label>",
        types = options(VEHICLE_TYPES, None),
        fuels = options(FUEL_TYPES, None),
    );
    form("Register vehicle", "/vehicles", &fields, "Register")
}

pub fn issue_form(bins: &[Bin], vehicles: &[Vehicle]) -> String {
    let vehicles = options(
        vehicles
            .iter()
            .map(|v| (v.id.as_str(), v.license_plate.as_str())),
        None,
    );
    let fields = format!(
        "<label>Issue<input name=\"issue_type\" required></label>\
         <label>Description<textarea name=\"description\" required></textarea></label>\
         <label>Priority<select name=\"priority\">{priorities}</select></label>\
         <label>Reported by<input name=\"reported_by\"></label>\
         <label>Bin<select name=\"bin_id\"><option value=\"\">None</option>{bins}</select></label>\
         <label>Vehicle<select name=\"vehicle_id\"><option value=\"\">None</option>{vehicles}</select></label>\
         <label>Photo file name<input name=\"image_name\"></label>",
        priorities = options(TICKET_PRIORITIES, Some("medium")),
        bins = bin_options(bins),
        vehicles = vehicles,
    );
    form("Report an issue", "/issues", &fields, "Report")
}
