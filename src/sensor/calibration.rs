use serde::{Deserialize, Serialize};

pub const DEFAULT_EMPTY_CM: f64 = 200.0;
pub const DEFAULT_FULL_CM: f64 = 0.0;

/// Ultrasonic calibration: the distance the sensor reads over an empty bin and over a full one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub empty_cm: f64,
    pub full_cm: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            empty_cm: DEFAULT_EMPTY_CM,
            full_cm: DEFAULT_FULL_CM,
        }
    }
}

impl Calibration {
    /// `None` unless both ends are finite and `empty_cm > full_cm`.
    pub fn new(empty_cm: f64, full_cm: f64) -> Option<Self> {
        (empty_cm.is_finite() && full_cm.is_finite() && empty_cm > full_cm)
            .then_some(Self { empty_cm, full_cm })
    }

    /// `100 * (empty - d) / (empty - full)`, clamped to [0, 100].
    pub fn fill_percent(&self, distance_cm: f64) -> Option<f64> {
        if !distance_cm.is_finite() {
            return None;
        }
        let span = self.empty_cm - self.full_cm;
        if span <= 0.0 {
            return None;
        }
        let fill = 100.0 * (self.empty_cm - distance_cm) / span;
        Some(fill.clamp(0.0, 100.0))
    }
}
