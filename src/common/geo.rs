use serde::{Deserialize, Serialize};

/// A WGS84 coordinate. Latitude and longitude are interpolated independently,
/// so no projection is involved anywhere in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Linear interpolation towards `other` by `t` in `[0, 1]`.
    pub fn lerp(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + t * (other.lat - self.lat),
            lng: self.lng + t * (other.lng - self.lng),
        }
    }
}

/// A point with a human readable name, used for route origins and destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl NamedPoint {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}
