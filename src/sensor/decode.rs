//! Typed decoding of the vendor device payload shapes seen so far.
//!
//! Two shapes are known: an envelope (`{ success, device | data, error | message }`) and a bare
//! device object carrying `measurement` directly. Anything else is rejected as malformed; the
//! heuristic field search in `extract` only ever sees the `measurement` subtree.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::SensorError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DevicePayload {
    pub imei: Option<String>,
    pub name: Option<String>,
    pub measurement: Value,
    pub last_report: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VendorPayload {
    Enveloped {
        success: bool,
        #[serde(default, alias = "data")]
        device: Option<RawDevice>,
        #[serde(default, alias = "message")]
        error: Option<String>,
    },
    Bare(RawDevice),
}

#[derive(Deserialize)]
struct RawDevice {
    #[serde(default, alias = "IMEI")]
    imei: Option<Value>,
    #[serde(default, alias = "deviceName")]
    name: Option<String>,
    #[serde(alias = "measurements")]
    measurement: Value,
    #[serde(default, alias = "lastReport", alias = "lastSeen")]
    last_report: Option<Value>,
}

impl From<RawDevice> for DevicePayload {
    fn from(raw: RawDevice) -> Self {
        let imei = raw.imei.and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let last_report = raw.last_report.and_then(|v| match v {
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        });
        DevicePayload {
            imei,
            name: raw.name,
            measurement: raw.measurement,
            last_report,
        }
    }
}

pub fn decode_device(payload: Value) -> Result<DevicePayload, SensorError> {
    let decoded: VendorPayload = serde_json::from_value(payload)
        .map_err(|_| SensorError::Malformed("unrecognised device payload shape".to_string()))?;

    match decoded {
        VendorPayload::Enveloped { success: false, error, .. } => Err(SensorError::Rejected(
            error.unwrap_or_else(|| "vendor reported failure".to_string()),
        )),
        VendorPayload::Enveloped { device: Some(device), .. } => Ok(device.into()),
        VendorPayload::Enveloped { device: None, .. } => {
            Err(SensorError::Malformed("success response without a device".to_string()))
        }
        VendorPayload::Bare(device) => Ok(device.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enveloped_device() {
        let payload = json!({
            "success": true,
            "device": {
                "imei": 356938035643809u64,
                "name": "Bin sensor 12",
                "measurement": { "d": { "value": 100, "dataType": { "datatypeID": 488 } } },
                "lastReport": "2026-03-01T08:00:00Z"
            }
        });
        let device = decode_device(payload).unwrap();
        assert_eq!(device.imei.as_deref(), Some("356938035643809"));
        assert_eq!(device.name.as_deref(), Some("Bin sensor 12"));
        assert!(device.last_report.is_some());
    }

    #[test]
    fn test_data_alias_and_bare_shape() {
        let enveloped = json!({ "success": true, "data": { "measurements": {} } });
        assert!(decode_device(enveloped).is_ok());

        let bare = json!({ "IMEI": "123", "measurement": {} });
        assert_eq!(decode_device(bare).unwrap().imei.as_deref(), Some("123"));
    }

    #[test]
    fn test_vendor_failure() {
        let payload = json!({ "success": false, "message": "device offline" });
        match decode_device(payload) {
            Err(SensorError::Rejected(reason)) => assert_eq!(reason, "device offline"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(decode_device(json!([1, 2])), Err(SensorError::Malformed(_))));
        assert!(matches!(
            decode_device(json!({ "success": true })),
            Err(SensorError::Malformed(_))
        ));
    }
}
