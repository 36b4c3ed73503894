//! HTML fragments for the dashboard: modals, forms and fleet panels.

pub mod bin_modal;
pub mod dispatch;
pub mod error_panel;
pub mod fleet_panels;
pub mod forms;
pub mod overview;

use serde::Serialize;

use crate::utils::html::{escape, DASH};

/// Posts any `form[data-json]` as a JSON body and reports the outcome inline.
/// Checkboxes marked `data-list` collect into arrays, textareas marked `data-lines` split per line.
pub const FORM_SCRIPT: &str = r#"
document.addEventListener('submit', async (ev) => {
  const form = ev.target.closest('form[data-json]');
  if (!form) return;
  ev.preventDefault();
  const body = {};
  for (const el of form.elements) {
    if (!el.name) continue;
    if (el.dataset.list !== undefined) {
      body[el.name] = body[el.name] || [];
      if (el.checked) body[el.name].push(el.value);
      continue;
    }
    if (el.type === 'checkbox') { body[el.name] = el.checked; continue; }
    if (el.value === '') continue;
    if (el.dataset.lines !== undefined) {
      body[el.name] = el.value.split('\n').map((s) => s.trim()).filter(Boolean);
      continue;
    }
    body[el.name] = el.type === 'number' ? Number(el.value) : el.value;
  }
  const res = await fetch(form.action, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  const data = await res.json().catch(() => ({}));
  const out = form.querySelector('.form-result');
  if (out) out.textContent = res.ok ? 'Saved' : (data.message || 'Request failed');
  if (res.ok && form.dataset.reload !== undefined) location.reload();
});
"#;

const PAGE_STYLES: &str = r#"
body { font-family: "Segoe UI", Arial, sans-serif; margin: 0; color: #1f2933; background: #f5f7fa; }
nav { background: #2f855a; padding: 10px 20px; }
nav a { color: #fff; margin-right: 16px; text-decoration: none; font-weight: 600; }
main { padding: 20px; }
.modal { background: #fff; border-radius: 8px; padding: 20px; max-width: 720px; box-shadow: 0 2px 8px rgba(0,0,0,.1); }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(150px, 1fr)); gap: 10px; }
.cell { border: 1px solid #e4e7eb; border-radius: 6px; padding: 8px; }
.cell .label { font-size: 11px; color: #7b8794; text-transform: uppercase; }
table { width: 100%; border-collapse: collapse; background: #fff; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #e4e7eb; }
.badge { padding: 2px 8px; border-radius: 10px; font-size: 12px; background: #e4e7eb; }
.badge.critical, .badge.urgent { background: #fed7d7; }
.badge.assigned, .badge.high { background: #fefcbf; }
.badge.recommended { background: #c6f6d5; }
form label { display: block; margin: 8px 0 2px; font-size: 13px; }
.form-result { margin-left: 8px; font-size: 13px; }
.muted { color: #7b8794; }
"#;

/// Full page around a fragment.
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{title}</title><style>{styles}</style></head>\
         <body><nav><a href=\"/\">Overview</a><a href=\"/routes/new\">New route</a>\
         <a href=\"/fleet/geofences\">Fleet</a><a href=\"/reports/system\">System report</a>\
         <a href=\"/errors\">Errors</a><a href=\"/export\">Export</a></nav>\
         <main>{body}</main><script>{script}</script></body></html>",
        title = escape(title),
        styles = PAGE_STYLES,
        body = body,
        script = FORM_SCRIPT,
    )
}

pub fn badge(text: &str) -> String {
    let class: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    format!("<span class=\"badge {}\">{}</span>", class, escape(text))
}

pub fn cell(label: &str, value: &str) -> String {
    format!(
        "<div class=\"cell\"><div class=\"label\">{}</div><div>{}</div></div>",
        escape(label),
        escape(value)
    )
}

/// Wire name of a serde enum, e.g. `VehicleType::RearLoader` -> `rear-loader`.
pub fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => DASH.to_string(),
    }
}

/// `<option>` list; `selected` marks the matching value.
pub fn options<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>, selected: Option<&str>) -> String {
    items
        .into_iter()
        .map(|(value, label)| {
            format!(
                "<option value=\"{}\"{}>{}</option>",
                escape(value),
                if selected == Some(value) { " selected" } else { "" },
                escape(label)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_class_is_sanitised() {
        assert_eq!(
            badge("in-progress\" onclick=\"x"),
            "<span class=\"badge in-progressonclickx\">in-progress&quot; onclick=&quot;x</span>"
        );
    }

    #[test]
    fn test_wire_name() {
        use crate::models::driver::VehicleType;
        assert_eq!(wire_name(&VehicleType::RearLoader), "rear-loader");
    }

    #[test]
    fn test_options_selected() {
        let html = options([("a", "Alpha"), ("b", "Beta")], Some("b"));
        assert_eq!(
            html,
            "<option value=\"a\">Alpha</option><option value=\"b\" selected>Beta</option>"
        );
    }
}
