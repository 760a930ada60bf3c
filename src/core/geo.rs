use serde::{Deserialize, Serialize};

/// Longitude range of the world in the default geographic SRS
pub const WORLD_MIN_LNG: f64 = -180.0;
pub const WORLD_MAX_LNG: f64 = 180.0;
/// Latitude range of the world in the default geographic SRS
pub const WORLD_MIN_LAT: f64 = -90.0;
pub const WORLD_MAX_LAT: f64 = 90.0;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        (WORLD_MIN_LAT..=WORLD_MAX_LAT).contains(&self.lat)
            && (WORLD_MIN_LNG..=WORLD_MAX_LNG).contains(&self.lng)
    }

    /// Clamps both axes into the world range
    pub fn clamped(&self) -> Self {
        Self::new(
            self.lat.clamp(WORLD_MIN_LAT, WORLD_MAX_LAT),
            self.lng.clamp(WORLD_MIN_LNG, WORLD_MAX_LNG),
        )
    }

    /// Formats the coordinate the way the status line shows it
    pub fn to_display_string(&self) -> String {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lng >= 0.0 { 'E' } else { 'W' };
        format!("{:.5}°{} {:.5}°{}", self.lat.abs(), ns, self.lng.abs(), ew)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
