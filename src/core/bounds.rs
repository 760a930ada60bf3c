use crate::core::geo::{LatLng, WORLD_MAX_LAT, WORLD_MAX_LNG, WORLD_MIN_LAT, WORLD_MIN_LNG};
use serde::{Deserialize, Serialize};

/// Geographic bounding box `(min_x, min_y, max_x, max_y)` in the request SRS.
/// X is longitude, Y is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GeoBounds {
    /// Creates bounds from individual coordinates
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The whole world in geographic coordinates
    pub fn world() -> Self {
        Self::new(WORLD_MIN_LNG, WORLD_MIN_LAT, WORLD_MAX_LNG, WORLD_MAX_LAT)
    }

    /// Creates bounds from a center point and size
    pub fn from_center_and_size(center: LatLng, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self::new(
            center.lng - half_width,
            center.lat - half_height,
            center.lng + half_width,
            center.lat + half_height,
        )
    }

    /// Gets the width of the bounds
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Gets the height of the bounds
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_y + self.max_y) / 2.0,
            (self.min_x + self.max_x) / 2.0,
        )
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lng >= self.min_x
            && point.lng <= self.max_x
            && point.lat >= self.min_y
            && point.lat <= self.max_y
    }

    /// Checks if these bounds lie entirely inside `other`
    pub fn is_within(&self, other: &GeoBounds) -> bool {
        self.min_x >= other.min_x
            && self.max_x <= other.max_x
            && self.min_y >= other.min_y
            && self.max_y <= other.max_y
    }

    /// Checks if the bounds are valid (min <= max, all finite)
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// Slides the box inside `limits` without changing its size. An axis that
    /// is larger than the limit is pinned to the limit instead.
    pub fn slid_within(&self, limits: &GeoBounds) -> GeoBounds {
        let (min_x, max_x) = slide_axis(self.min_x, self.max_x, limits.min_x, limits.max_x);
        let (min_y, max_y) = slide_axis(self.min_y, self.max_y, limits.min_y, limits.max_y);
        GeoBounds::new(min_x, min_y, max_x, max_y)
    }

    /// Formats as the `BBOX` request parameter
    pub fn to_bbox_param(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Parses `minx,miny,maxx,maxy`
    pub fn parse(text: &str) -> Option<GeoBounds> {
        let values: Vec<f64> = text
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            [min_x, min_y, max_x, max_y] => {
                let bounds = GeoBounds::new(*min_x, *min_y, *max_x, *max_y);
                bounds.is_valid().then_some(bounds)
            }
            _ => None,
        }
    }
}

fn slide_axis(min: f64, max: f64, lo: f64, hi: f64) -> (f64, f64) {
    let extent = max - min;
    if extent >= hi - lo {
        return (lo, hi);
    }
    if min < lo {
        (lo, lo + extent)
    } else if max > hi {
        (hi - extent, hi)
    } else {
        (min, max)
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::world()
    }
}
