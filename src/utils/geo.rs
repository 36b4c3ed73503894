use serde::{Deserialize, Serialize};

/// Distance reported for anything without a usable position. Sorts after every real distance.
pub const UNKNOWN_DISTANCE_KM: f64 = 999.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite, in range, and not the (0,0) placeholder some devices report before a fix.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
            && !(self.lat == 0.0 && self.lng == 0.0)
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two optional positions, `UNKNOWN_DISTANCE_KM` when either is missing or invalid.
pub fn distance_or_unknown(a: Option<LatLng>, b: Option<LatLng>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a.is_valid() && b.is_valid() => haversine_km(a, b),
        _ => UNKNOWN_DISTANCE_KM,
    }
}

/// Ray-casting point-in-polygon test. Vertices are taken in order; the ring is closed implicitly.
pub fn polygon_contains(vertices: &[LatLng], point: LatLng) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.lat > point.lat) != (vj.lat > point.lat) {
            let cross = (vj.lng - vi.lng) * (point.lat - vi.lat) / (vj.lat - vi.lat) + vi.lng;
            if point.lng < cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
