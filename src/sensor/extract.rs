//! Best-effort field search over the vendor `measurement` tree.
//!
//! Leaves look like `{ value, dataType: { name, uri, datatypeID }, timestamp, reportID }` and can
//! sit at any depth. Nothing here is backed by vendor documentation: keyword sets, ranges and
//! the medium-confidence rule are guesses that held up against the payloads seen so far, which
//! is why all of them live in [`ExtractorConfig`].

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::calibration::Calibration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorField {
    Fill,
    Battery,
    Temperature,
    Signal,
    Tilt,
}

impl SensorField {
    pub const ALL: [SensorField; 5] = [
        SensorField::Fill,
        SensorField::Battery,
        SensorField::Temperature,
        SensorField::Signal,
        SensorField::Tilt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorField::Fill => "fill",
            SensorField::Battery => "battery",
            SensorField::Temperature => "temperature",
            SensorField::Signal => "signal",
            SensorField::Tilt => "tilt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Not from a live report: the value stored on the bin.
    Stored,
    /// Plausible timestamped reading whose name did not match.
    Medium,
    /// Name or datatype matched and the value is in range.
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReading {
    pub value: f64,
    pub label: Option<String>,
    pub confidence: Confidence,
    /// Datatype name, or the key path when the leaf had no name.
    pub source: String,
    /// Raw distance when the value was converted from an ultrasonic reading.
    pub distance_cm: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReadings {
    pub fill: Option<FieldReading>,
    pub battery: Option<FieldReading>,
    pub temperature: Option<FieldReading>,
    pub signal: Option<FieldReading>,
    pub tilt: Option<FieldReading>,
}

impl ExtractedReadings {
    pub fn get(&self, field: SensorField) -> Option<&FieldReading> {
        match field {
            SensorField::Fill => self.fill.as_ref(),
            SensorField::Battery => self.battery.as_ref(),
            SensorField::Temperature => self.temperature.as_ref(),
            SensorField::Signal => self.signal.as_ref(),
            SensorField::Tilt => self.tilt.as_ref(),
        }
    }

    pub fn set(&mut self, field: SensorField, reading: Option<FieldReading>) {
        let slot = match field {
            SensorField::Fill => &mut self.fill,
            SensorField::Battery => &mut self.battery,
            SensorField::Temperature => &mut self.temperature,
            SensorField::Signal => &mut self.signal,
            SensorField::Tilt => &mut self.tilt,
        };
        *slot = reading;
    }

    pub fn is_empty(&self) -> bool {
        SensorField::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub keywords: Vec<String>,
    pub exclude: Vec<String>,
    pub min: f64,
    pub max: f64,
    /// Whether unnamed timestamped readings may fill this slot.
    pub allow_medium: bool,
    /// `(keyword, label)` pairs; first keyword found in the datatype text names the reading.
    pub labels: Vec<(String, String)>,
}

impl FieldRule {
    fn new(keywords: &[&str], exclude: &[&str], min: f64, max: f64) -> Self {
        Self {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            min,
            max,
            allow_medium: false,
            labels: Vec::new(),
        }
    }

    fn with_medium(mut self) -> Self {
        self.allow_medium = true;
        self
    }

    fn with_labels(mut self, labels: &[(&str, &str)]) -> Self {
        self.labels = labels
            .iter()
            .map(|(k, l)| (k.to_string(), l.to_string()))
            .collect();
        self
    }

    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
            && !self.exclude.iter().any(|k| text.contains(k.as_str()))
    }

    fn in_range(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn label_for(&self, text: &str) -> Option<String> {
        self.labels
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, label)| label.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub max_depth: usize,
    pub fill: FieldRule,
    pub battery: FieldRule,
    pub temperature: FieldRule,
    pub signal: FieldRule,
    pub tilt: FieldRule,
    pub distance_keywords: Vec<String>,
    pub distance_datatype_ids: Vec<i64>,
    pub distance_min_cm: f64,
    pub distance_max_cm: f64,
    /// Names that never count as a medium-confidence candidate.
    pub medium_exclusions: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            fill: FieldRule::new(&["fill", "level"], &["battery", "memory", "signal", "temp"], 0.0, 100.0)
                .with_medium(),
            battery: FieldRule::new(&["battery", "batt"], &["volt", "temp"], 0.0, 100.0),
            temperature: FieldRule::new(&["temp", "pcb temperature"], &[], -40.0, 125.0).with_labels(&[
                ("pcb", "PCB"),
                ("ambient", "Ambient"),
                ("internal", "Internal"),
                ("external", "External"),
            ]),
            signal: FieldRule::new(&["signal", "rssi", "csq", "rsrp"], &[], -140.0, 100.0),
            tilt: FieldRule::new(&["tilt", "angle", "orientation"], &[], 0.0, 180.0),
            distance_keywords: vec!["distance".to_string(), "ultrasonic".to_string()],
            distance_datatype_ids: vec![488],
            distance_min_cm: 0.0,
            distance_max_cm: 1000.0,
            medium_exclusions: vec!["battery".to_string(), "memory".to_string()],
        }
    }
}

impl ExtractorConfig {
    pub fn rule(&self, field: SensorField) -> &FieldRule {
        match field {
            SensorField::Fill => &self.fill,
            SensorField::Battery => &self.battery,
            SensorField::Temperature => &self.temperature,
            SensorField::Signal => &self.signal,
            SensorField::Tilt => &self.tilt,
        }
    }
}

struct Leaf {
    path: String,
    value: f64,
    raw_name: String,
    // lowercased name + uri
    text: String,
    datatype_id: Option<i64>,
    has_timestamp: bool,
    has_report_id: bool,
    timestamp: Option<DateTime<Utc>>,
}

impl Leaf {
    fn from_map(map: &Map<String, Value>, path: &str) -> Option<Leaf> {
        let value = parse_numeric(map.get("value")?)?;
        let data_type = map
            .get("dataType")
            .or_else(|| map.get("datatype"))?
            .as_object()?;

        let raw_name = data_type
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let uri = data_type.get("uri").and_then(Value::as_str).unwrap_or_default();
        let datatype_id = ["datatypeID", "datatypeId", "id"]
            .iter()
            .find_map(|k| data_type.get(*k))
            .and_then(parse_numeric)
            .map(|v| v as i64);

        let timestamp_value = map.get("timestamp").filter(|v| !v.is_null());
        let has_report_id = ["reportID", "reportId"]
            .iter()
            .any(|k| map.get(*k).is_some_and(|v| !v.is_null()));

        Some(Leaf {
            path: path.to_string(),
            value,
            text: format!("{} {}", raw_name, uri).to_lowercase(),
            raw_name,
            datatype_id,
            has_timestamp: timestamp_value.is_some(),
            has_report_id,
            timestamp: timestamp_value.and_then(parse_timestamp),
        })
    }

    fn source(&self) -> String {
        if self.raw_name.is_empty() {
            self.path.clone()
        } else {
            self.raw_name.clone()
        }
    }
}

enum Hit {
    High(FieldReading),
    Medium(FieldReading),
}

#[derive(Debug, Clone, Default)]
pub struct MeasurementExtractor {
    config: ExtractorConfig,
}

impl MeasurementExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, measurement: &Value, calibration: Calibration) -> ExtractedReadings {
        let mut readings = ExtractedReadings::default();
        for field in SensorField::ALL {
            readings.set(field, self.find(field, measurement, calibration));
        }
        readings
    }

    /// First high-confidence hit wins; otherwise the newest medium candidate across all top-level keys.
    pub fn find(&self, field: SensorField, measurement: &Value, calibration: Calibration) -> Option<FieldReading> {
        let top: Vec<(String, &Value)> = match measurement {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("[{}]", i), v))
                .collect(),
            _ => return None,
        };

        let mut medium = Vec::new();
        for (key, node) in top {
            if let Some(reading) = self.walk(field, node, 1, &key, calibration, &mut medium) {
                return Some(reading);
            }
        }
        newest(medium)
    }

    fn walk(
        &self,
        field: SensorField,
        node: &Value,
        depth: usize,
        path: &str,
        calibration: Calibration,
        medium: &mut Vec<FieldReading>,
    ) -> Option<FieldReading> {
        if depth > self.config.max_depth {
            return None;
        }
        match node {
            Value::Object(map) => {
                if let Some(leaf) = Leaf::from_map(map, path) {
                    match self.classify(field, &leaf, calibration) {
                        Some(Hit::High(reading)) => return Some(reading),
                        Some(Hit::Medium(reading)) => medium.push(reading),
                        None => {}
                    }
                    return None;
                }
                for (key, child) in map {
                    let child_path = format!("{}.{}", path, key);
                    if let Some(reading) = self.walk(field, child, depth + 1, &child_path, calibration, medium) {
                        return Some(reading);
                    }
                }
                None
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    let child_path = format!("{}[{}]", path, i);
                    if let Some(reading) = self.walk(field, child, depth + 1, &child_path, calibration, medium) {
                        return Some(reading);
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn is_distance(&self, leaf: &Leaf) -> bool {
        leaf.datatype_id
            .is_some_and(|id| self.config.distance_datatype_ids.contains(&id))
            || self
                .config
                .distance_keywords
                .iter()
                .any(|k| leaf.text.contains(k.as_str()))
    }

    fn claimed_elsewhere(&self, field: SensorField, leaf: &Leaf) -> bool {
        self.config
            .medium_exclusions
            .iter()
            .any(|k| leaf.text.contains(k.as_str()))
            || SensorField::ALL
                .iter()
                .filter(|other| **other != field)
                .any(|other| self.config.rule(*other).matches(&leaf.text))
    }

    fn classify(&self, field: SensorField, leaf: &Leaf, calibration: Calibration) -> Option<Hit> {
        let rule = self.config.rule(field);

        if self.is_distance(leaf) {
            if field != SensorField::Fill {
                return None;
            }
            if leaf.value < self.config.distance_min_cm || leaf.value > self.config.distance_max_cm {
                return None;
            }
            let fill = calibration.fill_percent(leaf.value)?;
            return Some(Hit::High(FieldReading {
                value: fill,
                label: Some("Ultrasonic".to_string()),
                confidence: Confidence::High,
                source: leaf.source(),
                distance_cm: Some(leaf.value),
                timestamp: leaf.timestamp,
            }));
        }

        if !rule.in_range(leaf.value) {
            return None;
        }

        let reading = |confidence| FieldReading {
            value: leaf.value,
            label: rule.label_for(&leaf.text),
            confidence,
            source: leaf.source(),
            distance_cm: None,
            timestamp: leaf.timestamp,
        };

        if rule.matches(&leaf.text) {
            return Some(Hit::High(reading(Confidence::High)));
        }

        if rule.allow_medium
            && leaf.has_timestamp
            && leaf.has_report_id
            && !self.claimed_elsewhere(field, leaf)
        {
            return Some(Hit::Medium(reading(Confidence::Medium)));
        }

        None
    }
}

fn newest(candidates: Vec<FieldReading>) -> Option<FieldReading> {
    let mut best: Option<FieldReading> = None;
    for candidate in candidates {
        let newer = match &best {
            Some(current) => candidate.timestamp > current.timestamp,
            None => true,
        };
        if newer {
            best = Some(candidate);
        }
    }
    best
}

/// Numbers, numeric strings, and strings with a trailing unit ("48 °C").
pub fn parse_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<f64>().ok().or_else(|| {
                let end = s
                    .char_indices()
                    .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))))
                    .map(|(i, _)| i)
                    .unwrap_or(s.len());
                s[..end].parse::<f64>().ok()
            })
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            // Vendors mix epoch seconds and epoch milliseconds
            if raw > 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extractor() -> MeasurementExtractor {
        MeasurementExtractor::default()
    }

    #[test]
    fn test_nested_pcb_temperature() {
        let measurement = json!({
            "environment": {
                "board": {
                    "pcb": { "value": "48", "dataType": { "name": "PCB Temperature" } }
                }
            }
        });
        let reading = extractor()
            .find(SensorField::Temperature, &measurement, Calibration::default())
            .unwrap();
        assert_eq!(reading.value, 48.0);
        assert_eq!(reading.label.as_deref(), Some("PCB"));
        assert_eq!(reading.confidence, Confidence::High);
    }

    #[test]
    fn test_distance_datatype_converted_to_fill() {
        let measurement = json!({
            "sensors": [
                { "value": 150, "dataType": { "name": "Range", "datatypeID": 488 } }
            ]
        });
        let reading = extractor()
            .find(SensorField::Fill, &measurement, Calibration::default())
            .unwrap();
        assert_eq!(reading.value, 25.0);
        assert_eq!(reading.distance_cm, Some(150.0));
    }

    #[test]
    fn test_distance_uses_bin_calibration() {
        let measurement = json!({
            "d": { "value": "60", "dataType": { "name": "Ultrasonic distance" } }
        });
        let cal = Calibration::new(100.0, 20.0).unwrap();
        let reading = extractor().find(SensorField::Fill, &measurement, cal).unwrap();
        assert_eq!(reading.value, 50.0);
    }

    #[test]
    fn test_battery_level_does_not_become_fill() {
        let measurement = json!({
            "power": { "value": 87, "dataType": { "name": "Battery Level" }, "timestamp": 1_700_000_000, "reportID": 9 }
        });
        let ex = extractor();
        assert!(ex.find(SensorField::Fill, &measurement, Calibration::default()).is_none());
        let battery = ex.find(SensorField::Battery, &measurement, Calibration::default()).unwrap();
        assert_eq!(battery.value, 87.0);
    }

    #[test]
    fn test_medium_candidate_requires_timestamp_and_report() {
        let with_report = json!({
            "x": { "value": 42, "dataType": { "name": "Channel 3" }, "timestamp": "2026-01-02T10:00:00Z", "reportID": 77 }
        });
        let reading = extractor()
            .find(SensorField::Fill, &with_report, Calibration::default())
            .unwrap();
        assert_eq!(reading.value, 42.0);
        assert_eq!(reading.confidence, Confidence::Medium);

        let static_setting = json!({
            "x": { "value": 42, "dataType": { "name": "Channel 3" } }
        });
        assert!(extractor()
            .find(SensorField::Fill, &static_setting, Calibration::default())
            .is_none());
    }

    #[test]
    fn test_high_confidence_beats_earlier_medium() {
        let measurement = json!({
            "a": { "value": 10, "dataType": { "name": "Setting" }, "timestamp": 1_700_000_000, "reportID": 1 },
            "b": { "value": 66, "dataType": { "name": "Fill Level" } }
        });
        let reading = extractor()
            .find(SensorField::Fill, &measurement, Calibration::default())
            .unwrap();
        assert_eq!(reading.value, 66.0);
        assert_eq!(reading.confidence, Confidence::High);
    }

    #[test]
    fn test_newest_medium_candidate_wins() {
        let measurement = json!({
            "a": { "value": 10, "dataType": { "name": "c1" }, "timestamp": 1_700_000_000, "reportID": 1 },
            "b": { "value": 30, "dataType": { "name": "c2" }, "timestamp": 1_700_000_600, "reportID": 2 }
        });
        let reading = extractor()
            .find(SensorField::Fill, &measurement, Calibration::default())
            .unwrap();
        assert_eq!(reading.value, 30.0);
    }

    #[test]
    fn test_out_of_range_value_ignored() {
        let measurement = json!({
            "t": { "value": 900, "dataType": { "name": "Temperature" } }
        });
        assert!(extractor()
            .find(SensorField::Temperature, &measurement, Calibration::default())
            .is_none());
    }

    #[test]
    fn test_tilt_outside_zero_to_180_ignored() {
        let ex = extractor();
        let negative = json!({ "pos": { "value": -12, "dataType": { "name": "Tilt" } } });
        assert!(ex.find(SensorField::Tilt, &negative, Calibration::default()).is_none());

        let upright = json!({ "pos": { "value": 175, "dataType": { "name": "Tilt" } } });
        assert_eq!(
            ex.find(SensorField::Tilt, &upright, Calibration::default()).map(|r| r.value),
            Some(175.0)
        );
    }

    #[test]
    fn test_depth_limit() {
        let leaf = json!({ "value": 21, "dataType": { "name": "Temperature" } });
        let at_six = json!({ "a": { "b": { "c": { "d": { "e": { "f": leaf.clone() } } } } } });
        let at_seven = json!({ "a": { "b": { "c": { "d": { "e": { "f": { "g": leaf } } } } } } });
        let ex = extractor();
        assert!(ex.find(SensorField::Temperature, &at_six, Calibration::default()).is_some());
        assert!(ex.find(SensorField::Temperature, &at_seven, Calibration::default()).is_none());
    }

    #[test]
    fn test_extract_all_fields() {
        let measurement = json!({
            "level": { "value": 150, "dataType": { "name": "Distance", "datatypeID": 488 } },
            "power": { "value": "91", "dataType": { "name": "Battery" } },
            "env": { "t": { "value": 19.5, "dataType": { "name": "Ambient Temperature" } } },
            "radio": { "value": -87, "dataType": { "name": "RSSI" } },
            "pos": { "value": 3, "dataType": { "name": "Tilt angle" } }
        });
        let readings = extractor().extract(&measurement, Calibration::default());
        assert_eq!(readings.fill.as_ref().map(|r| r.value), Some(25.0));
        assert_eq!(readings.battery.as_ref().map(|r| r.value), Some(91.0));
        assert_eq!(readings.temperature.as_ref().and_then(|r| r.label.clone()), Some("Ambient".to_string()));
        assert_eq!(readings.signal.as_ref().map(|r| r.value), Some(-87.0));
        assert_eq!(readings.tilt.as_ref().map(|r| r.value), Some(3.0));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(&json!("48")), Some(48.0));
        assert_eq!(parse_numeric(&json!(" 48 °C")), Some(48.0));
        assert_eq!(parse_numeric(&json!("-3.5dB")), Some(-3.5));
        assert_eq!(parse_numeric(&json!("n/a")), None);
        assert_eq!(parse_numeric(&json!(true)), None);
    }
}
