// HTML escaping and the few formatting helpers shared by views and reports.
use chrono::{DateTime, Utc};

/// Placeholder for unknown values.
pub const DASH: &str = "—";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encodes a value for use as one URL path segment. Only RFC 3986 unreserved
/// characters pass through.
pub fn path_segment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

pub fn opt_text(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => DASH.to_string(),
    }
}

pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| DASH.to_string(), |v| format!("{:.0}%", v))
}

pub fn datetime(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| DASH.to_string(), |v| v.format("%Y-%m-%d %H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<img src=x onerror="alert('x')">&"#),
            "&lt;img src=x onerror=&quot;alert(&#39;x&#39;)&quot;&gt;&amp;"
        );
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("BIN-001"), "BIN-001");
        assert_eq!(path_segment("BIN 1/#?"), "BIN%201%2F%23%3F");
        assert_eq!(path_segment("<é>"), "%3C%C3%A9%3E");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(percent(None), DASH);
        assert_eq!(percent(Some(24.6)), "25%");
        assert_eq!(opt_text(Some("  ")), DASH);
        assert_eq!(datetime(None), DASH);
    }
}
