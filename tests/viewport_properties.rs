//! Invariants of the view math that must hold for any center, zoom level
//! and navigation history:
//!
//! 1. The derived bbox always lies inside the world.
//! 2. Clamping slides the window; it never shrinks it.
//! 3. Zoom stays within its range under any zoom sequence.
//! 4. Pixel -> normalized -> pixel is the identity inside the image.
//! 5. A pixel's normalized center maps to a point within that pixel's
//!    geographic footprint.

use mapterm::constants::{MAX_ZOOM, MIN_ZOOM, WORLD_HALF_HEIGHT_DEG, WORLD_WIDTH_DEG};
use mapterm::core::PanDirection;
use mapterm::prelude::{GeoBounds, LatLng, Viewport};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

// ── Helpers ─────────────────────────────────────────────────────────────

fn center_strategy() -> impl Strategy<Value = LatLng> {
    // Deliberately wider than the world so clamping is exercised
    (-120.0f64..=120.0, -400.0f64..=400.0).prop_map(|(lat, lng)| LatLng::new(lat, lng))
}

fn zoom_strategy() -> impl Strategy<Value = f64> {
    MIN_ZOOM..=MAX_ZOOM
}

fn pan_strategy() -> impl Strategy<Value = PanDirection> {
    prop_oneof![
        Just(PanDirection::Up),
        Just(PanDirection::Down),
        Just(PanDirection::Left),
        Just(PanDirection::Right),
    ]
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Pan(PanDirection),
    ZoomIn,
    ZoomOut,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => pan_strategy().prop_map(Step::Pan),
        1 => Just(Step::ZoomIn),
        1 => Just(Step::ZoomOut),
    ]
}

fn assert_in_world(bbox: &GeoBounds) -> Result<(), TestCaseError> {
    prop_assert!(bbox.min_x >= -180.0 - EPS, "min_x {} outside world", bbox.min_x);
    prop_assert!(bbox.max_x <= 180.0 + EPS, "max_x {} outside world", bbox.max_x);
    prop_assert!(bbox.min_y >= -90.0 - EPS, "min_y {} outside world", bbox.min_y);
    prop_assert!(bbox.max_y <= 90.0 + EPS, "max_y {} outside world", bbox.max_y);
    Ok(())
}

fn assert_full_size(viewport: &Viewport) -> Result<(), TestCaseError> {
    let scale = 2f64.powf(-viewport.zoom);
    let bbox = viewport.bbox();
    prop_assert!((bbox.width() - WORLD_WIDTH_DEG * scale).abs() < 1e-6);
    prop_assert!((bbox.height() - 2.0 * WORLD_HALF_HEIGHT_DEG * scale).abs() < 1e-6);
    Ok(())
}

// ── Derived bbox ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn bbox_stays_inside_world(center in center_strategy(), zoom in zoom_strategy()) {
        let viewport = Viewport::new(center, zoom);
        assert_in_world(&viewport.bbox())?;
        assert_full_size(&viewport)?;
    }

    #[test]
    fn navigation_never_escapes_or_shrinks(
        center in center_strategy(),
        zoom in zoom_strategy(),
        steps in proptest::collection::vec(step_strategy(), 1..40),
    ) {
        let mut viewport = Viewport::new(center, zoom);
        for step in steps {
            match step {
                Step::Pan(direction) => viewport.pan(direction),
                Step::ZoomIn => viewport.zoom_in(),
                Step::ZoomOut => viewport.zoom_out(),
            }
            prop_assert!(viewport.zoom >= MIN_ZOOM && viewport.zoom <= MAX_ZOOM);
            assert_in_world(&viewport.bbox())?;
            assert_full_size(&viewport)?;
            // The center follows the clamped window
            let mid = viewport.bbox().center();
            prop_assert!((mid.lat - viewport.center.lat).abs() < 1e-6);
            prop_assert!((mid.lng - viewport.center.lng).abs() < 1e-6);
        }
    }
}

// ── Pixel / normalized / geographic ─────────────────────────────────────

fn pixel_in_image() -> impl Strategy<Value = (u32, u32, u32, u32)> {
    (1u32..=4096, 1u32..=4096)
        .prop_flat_map(|(w, h)| (0..w, 0..h, Just(w), Just(h)))
}

proptest! {
    #[test]
    fn pixel_round_trip_is_identity((px, py, w, h) in pixel_in_image()) {
        let (nx, ny) = Viewport::normalized_from_pixel(px, py, w, h);
        prop_assert!((0.0..=1.0).contains(&nx) && (0.0..=1.0).contains(&ny));
        prop_assert_eq!(Viewport::pixel_from_normalized(nx, ny, w, h), (px, py));
    }

    #[test]
    fn pixel_center_lands_in_its_footprint(
        center in center_strategy(),
        zoom in zoom_strategy(),
        (px, py, w, h) in pixel_in_image(),
    ) {
        let viewport = Viewport::new(center, zoom);
        let bbox = viewport.bbox();
        let (nx, ny) = Viewport::normalized_from_pixel(px, py, w, h);
        let point = viewport.geo_from_normalized(nx, ny);

        let cell_w = bbox.width() / w as f64;
        let cell_h = bbox.height() / h as f64;
        let left = bbox.min_x + px as f64 * cell_w;
        let top = bbox.max_y - py as f64 * cell_h;
        prop_assert!(point.lng >= left - EPS && point.lng <= left + cell_w + EPS);
        prop_assert!(point.lat <= top + EPS && point.lat >= top - cell_h - EPS);
    }
}
