use crate::core::{
    bounds::GeoBounds,
    constants::{
        CROSSHAIR_STEP, MAX_ZOOM, MIN_ZOOM, PAN_FRACTION, WORLD_HALF_HEIGHT_DEG, WORLD_WIDTH_DEG,
        ZOOM_STEP,
    },
    geo::LatLng,
};
use serde::{Deserialize, Serialize};

/// Direction of a single pan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Manages the current view of the map: center, zoom and the bounding box
/// derived from them. Pure math, no I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level, fractional, within [MIN_ZOOM, MAX_ZOOM]
    pub zoom: f64,
    /// Visible extent. Seeded from layer bounds, derived after the first move.
    bbox: GeoBounds,
    /// Set once the user pans or zooms
    navigated: bool,
}

impl Viewport {
    /// Creates a viewport whose bbox is derived from `center` and `zoom`
    pub fn new(center: LatLng, zoom: f64) -> Self {
        let mut viewport = Self {
            center: center.clamped(),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            bbox: GeoBounds::world(),
            navigated: true,
        };
        viewport.recompute_bbox();
        viewport
    }

    /// Creates a viewport showing `bounds` as-is until the first navigation.
    /// Center and zoom are chosen so the derived window covers the bounds.
    pub fn from_bounds(bounds: GeoBounds) -> Self {
        let world = GeoBounds::world();
        let seeded = if bounds.is_valid() {
            bounds.slid_within(&world)
        } else {
            log::warn!("invalid layer bounds {:?}, falling back to world", bounds);
            world
        };

        Self {
            center: seeded.center(),
            zoom: Self::zoom_for_bounds(&seeded),
            bbox: seeded,
            navigated: false,
        }
    }

    /// Largest zoom whose derived window still covers `bounds`
    pub fn zoom_for_bounds(bounds: &GeoBounds) -> f64 {
        let width = bounds.width();
        let height = bounds.height();
        if width <= 0.0 || height <= 0.0 {
            return MAX_ZOOM;
        }
        let by_width = (WORLD_WIDTH_DEG / width).log2();
        let by_height = (2.0 * WORLD_HALF_HEIGHT_DEG / height).log2();
        by_width.min(by_height).clamp(MIN_ZOOM, MAX_ZOOM)
    }

    /// Current bounding box
    pub fn bbox(&self) -> GeoBounds {
        self.bbox
    }

    /// Whether the user has moved the camera since the preview opened
    pub fn has_navigated(&self) -> bool {
        self.navigated
    }

    /// Scale factor for the current zoom level (1 at zoom 0, halved per level)
    pub fn scale(&self) -> f64 {
        1.0 / 2_f64.powf(self.zoom)
    }

    /// Derives the bbox from `(center, zoom)` and clamps it to the world,
    /// sliding rather than shrinking the window. The center follows the
    /// clamped box so repeated pans against an edge do not accumulate.
    pub fn recompute_bbox(&mut self) {
        let scale = self.scale();
        let width = WORLD_WIDTH_DEG * scale;
        let height = WORLD_HALF_HEIGHT_DEG * scale * 2.0;

        self.bbox = GeoBounds::from_center_and_size(self.center, width, height)
            .slid_within(&GeoBounds::world());
        self.center = self.bbox.center();
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.navigated = true;
        self.recompute_bbox();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    /// Shifts the center by a fraction of the current extent on one axis
    pub fn pan(&mut self, direction: PanDirection) {
        let dx = self.bbox.width() * PAN_FRACTION;
        let dy = self.bbox.height() * PAN_FRACTION;

        match direction {
            PanDirection::Up => self.center.lat += dy,
            PanDirection::Down => self.center.lat -= dy,
            PanDirection::Left => self.center.lng -= dx,
            PanDirection::Right => self.center.lng += dx,
        }
        self.navigated = true;
        self.recompute_bbox();
    }

    pub fn pan_up(&mut self) {
        self.pan(PanDirection::Up);
    }

    pub fn pan_down(&mut self) {
        self.pan(PanDirection::Down);
    }

    pub fn pan_left(&mut self) {
        self.pan(PanDirection::Left);
    }

    pub fn pan_right(&mut self) {
        self.pan(PanDirection::Right);
    }

    /// Converts a normalized image position to geographic coordinates.
    /// Image rows grow downward while latitude grows upward.
    pub fn geo_from_normalized(&self, x: f64, y: f64) -> LatLng {
        let lng = self.bbox.min_x + x * self.bbox.width();
        let lat = self.bbox.max_y - y * self.bbox.height();
        LatLng::new(lat, lng)
    }

    /// Integer pixel for a normalized position inside an image of the given size
    pub fn pixel_from_normalized(x: f64, y: f64, width: u32, height: u32) -> (u32, u32) {
        let to_pixel = |v: f64, extent: u32| -> u32 {
            if extent == 0 {
                return 0;
            }
            let p = (v.clamp(0.0, 1.0) * extent as f64).floor() as u32;
            p.min(extent - 1)
        };
        (to_pixel(x, width), to_pixel(y, height))
    }

    /// Normalized position of a pixel's center
    pub fn normalized_from_pixel(px: u32, py: u32, width: u32, height: u32) -> (f64, f64) {
        let to_norm = |p: u32, extent: u32| -> f64 {
            if extent == 0 {
                return 0.5;
            }
            ((p as f64 + 0.5) / extent as f64).clamp(0.0, 1.0)
        };
        (to_norm(px, width), to_norm(py, height))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0)
    }
}

/// User-movable reticle, as a normalized position within the last fetched
/// image. Always inside the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crosshair {
    x: f64,
    y: f64,
}

impl Crosshair {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// Crosshair at the middle of the image
    pub fn centered() -> Self {
        Self::new(0.5, 0.5)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Moves by whole steps; `(1, 0)` is one step right, `(0, 1)` one step down
    pub fn step(&mut self, dx: i32, dy: i32) {
        *self = Self::new(
            self.x + dx as f64 * CROSSHAIR_STEP,
            self.y + dy as f64 * CROSSHAIR_STEP,
        );
    }

    pub fn reset(&mut self) {
        *self = Self::centered();
    }

    /// Pixel position inside an image of the given size
    pub fn pixel(&self, width: u32, height: u32) -> (u32, u32) {
        Viewport::pixel_from_normalized(self.x, self.y, width, height)
    }
}

impl Default for Crosshair {
    fn default() -> Self {
        Self::centered()
    }
}
