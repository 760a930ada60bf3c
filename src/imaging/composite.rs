//! Overlay compositing on top of a decoded map image
//!
//! Every frame is drawn into a fresh copy of the base bitmap, so the decoded
//! image is never touched and the same inputs always produce the same bytes.

use crate::core::constants::{
    CROSSHAIR_CENTER_COLOR, CROSSHAIR_LINE_COLOR, FEATURE_INFO_BOX_SIZE, LEGEND_BACKDROP_INSET,
    LEGEND_PLACEHOLDER_SIZE, OVERLAY_PADDING, TOP_BAR_HEIGHT,
};
use crate::core::viewport::Crosshair;
use crate::imaging::decoder::RasterImage;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

const TOP_BAR_COLOR: [u8; 3] = [0, 0, 0];
const TOP_BAR_ALPHA: f32 = 0.45;
const LEGEND_BACKDROP_COLOR: [u8; 3] = [255, 255, 255];
const LEGEND_BACKDROP_ALPHA: f32 = 0.8;
const PLACEHOLDER_FILL: [u8; 3] = [128, 128, 128];
const PLACEHOLDER_ALPHA: f32 = 0.5;
const PLACEHOLDER_BORDER: [u8; 4] = [200, 200, 200, 255];
const FEATURE_INFO_FILL: [u8; 3] = [20, 20, 20];
const FEATURE_INFO_ALPHA: f32 = 0.75;
const FEATURE_INFO_BORDER: [u8; 4] = [255, 255, 255, 255];

/// Everything a composite is derived from
#[derive(Debug, Clone, Copy)]
pub struct CompositeInput<'a> {
    pub base: &'a RasterImage,
    pub crosshair: Crosshair,
    /// Crosshair lines and center marker
    pub show_overlay: bool,
    /// Legend region (bitmap or placeholder)
    pub show_legend: bool,
    pub legend: Option<&'a RasterImage>,
    pub show_feature_info: bool,
}

impl<'a> CompositeInput<'a> {
    /// Overlay and legend on, feature info off, centered crosshair
    pub fn new(base: &'a RasterImage) -> Self {
        Self {
            base,
            crosshair: Crosshair::centered(),
            show_overlay: true,
            show_legend: true,
            legend: None,
            show_feature_info: false,
        }
    }
}

/// Encoded composite ready for a terminal backend
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFrame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Set when encoding failed and `bytes` are the undecorated source image
    pub from_source: bool,
}

/// Draws the crosshair, top bar, legend and feature-info box
#[derive(Debug, Clone, Default)]
pub struct CompositeRenderer;

impl CompositeRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Composes and re-encodes to PNG. Never fails: an encoding error
    /// yields the original bytes of the base image instead.
    pub fn compose(&self, input: &CompositeInput<'_>) -> CompositeFrame {
        let canvas = self.compose_pixels(input);
        let (width, height) = canvas.dimensions();

        let mut out = Cursor::new(Vec::new());
        match DynamicImage::ImageRgba8(canvas).write_to(&mut out, ImageFormat::Png) {
            Ok(()) => CompositeFrame {
                bytes: out.into_inner(),
                width,
                height,
                from_source: false,
            },
            Err(e) => {
                log::warn!("composite encode failed, showing undecorated image: {}", e);
                CompositeFrame {
                    bytes: input.base.source().to_vec(),
                    width: input.base.width(),
                    height: input.base.height(),
                    from_source: true,
                }
            }
        }
    }

    /// Composes into a new bitmap without encoding
    pub fn compose_pixels(&self, input: &CompositeInput<'_>) -> RgbaImage {
        let mut canvas = input.base.pixels().clone();
        if canvas.width() == 0 || canvas.height() == 0 {
            return canvas;
        }

        if input.show_overlay {
            draw_crosshair(&mut canvas, &input.crosshair);
        }

        let (width, height) = canvas.dimensions();
        let bar_height = TOP_BAR_HEIGHT.min(height);
        blend_rect(&mut canvas, 0, 0, width, bar_height, TOP_BAR_COLOR, TOP_BAR_ALPHA);

        if input.show_legend {
            match input.legend {
                Some(legend) => draw_legend(&mut canvas, legend),
                None => draw_legend_placeholder(&mut canvas),
            }
        }

        if input.show_feature_info {
            draw_feature_info_box(&mut canvas);
        }

        canvas
    }
}

/// Linear blend of `overlay` onto `base`; the result is always opaque
pub fn blend(base: Rgba<u8>, overlay: [u8; 3], alpha: f32) -> Rgba<u8> {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |b: u8, o: u8| -> u8 { (b as f32 * (1.0 - a) + o as f32 * a).round() as u8 };
    Rgba([
        mix(base[0], overlay[0]),
        mix(base[1], overlay[1]),
        mix(base[2], overlay[2]),
        255,
    ])
}

fn draw_crosshair(canvas: &mut RgbaImage, crosshair: &Crosshair) {
    let (width, height) = canvas.dimensions();
    let (cx, cy) = crosshair.pixel(width, height);
    let line = Rgba(CROSSHAIR_LINE_COLOR);

    for y in (0..height).filter(|&y| y != cy) {
        canvas.put_pixel(cx, y, line);
    }
    for x in (0..width).filter(|&x| x != cx) {
        canvas.put_pixel(x, cy, line);
    }

    let center = Rgba(CROSSHAIR_CENTER_COLOR);
    for y in cy.saturating_sub(1)..=(cy + 1).min(height - 1) {
        for x in cx.saturating_sub(1)..=(cx + 1).min(width - 1) {
            canvas.put_pixel(x, y, center);
        }
    }
}

/// Bottom-left corner rectangle of the given size, clipped to the canvas
fn bottom_left(canvas: &RgbaImage, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x = OVERLAY_PADDING.min(canvas.width());
    let y = canvas.height().saturating_sub(OVERLAY_PADDING + height);
    (x, y, width, height)
}

fn draw_legend(canvas: &mut RgbaImage, legend: &RasterImage) {
    let box_w = legend.width() + 2 * LEGEND_BACKDROP_INSET;
    let box_h = legend.height() + 2 * LEGEND_BACKDROP_INSET;
    let (x, y, w, h) = bottom_left(canvas, box_w, box_h);
    blend_rect(canvas, x, y, w, h, LEGEND_BACKDROP_COLOR, LEGEND_BACKDROP_ALPHA);

    let (ox, oy) = (x + LEGEND_BACKDROP_INSET, y + LEGEND_BACKDROP_INSET);
    for (lx, ly, pixel) in legend.pixels().enumerate_pixels() {
        let (tx, ty) = (ox + lx, oy + ly);
        if tx >= canvas.width() || ty >= canvas.height() {
            continue;
        }
        let out = if pixel[3] == 255 {
            *pixel
        } else {
            // Transparent legend areas keep the backdrop
            let alpha = pixel[3] as f32 / 255.0;
            blend(*canvas.get_pixel(tx, ty), [pixel[0], pixel[1], pixel[2]], alpha)
        };
        canvas.put_pixel(tx, ty, out);
    }
}

fn draw_legend_placeholder(canvas: &mut RgbaImage) {
    let (w, h) = LEGEND_PLACEHOLDER_SIZE;
    let (x, y, w, h) = bottom_left(canvas, w, h);
    blend_rect(canvas, x, y, w, h, PLACEHOLDER_FILL, PLACEHOLDER_ALPHA);
    stroke_rect(canvas, x, y, w, h, Rgba(PLACEHOLDER_BORDER));
}

fn draw_feature_info_box(canvas: &mut RgbaImage) {
    let (max_w, max_h) = FEATURE_INFO_BOX_SIZE;
    let w = max_w.min(canvas.width().saturating_sub(2 * OVERLAY_PADDING));
    let h = max_h.min(canvas.height().saturating_sub(2 * OVERLAY_PADDING));
    if w == 0 || h == 0 {
        return;
    }
    let x = canvas.width() - OVERLAY_PADDING - w;
    let y = canvas.height() - OVERLAY_PADDING - h;
    blend_rect(canvas, x, y, w, h, FEATURE_INFO_FILL, FEATURE_INFO_ALPHA);
    stroke_rect(canvas, x, y, w, h, Rgba(FEATURE_INFO_BORDER));
}

fn blend_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: [u8; 3], alpha: f32) {
    let x_end = x.saturating_add(w).min(canvas.width());
    let y_end = y.saturating_add(h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            let blended = blend(*canvas.get_pixel(px, py), color, alpha);
            canvas.put_pixel(px, py, blended);
        }
    }
}

fn stroke_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    if w == 0 || h == 0 {
        return;
    }
    let x_last = x.saturating_add(w - 1);
    let y_last = y.saturating_add(h - 1);
    let (cw, ch) = canvas.dimensions();
    for px in x..=x_last.min(cw.saturating_sub(1)) {
        for py in [y, y_last] {
            if px < cw && py < ch {
                canvas.put_pixel(px, py, color);
            }
        }
    }
    for py in y..=y_last.min(ch.saturating_sub(1)) {
        for px in [x, x_last] {
            if px < cw && py < ch {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Rgba<u8> = Rgba([0, 100, 200, 255]);

    fn base_image(width: u32, height: u32) -> RasterImage {
        let pixels = RgbaImage::from_pixel(width, height, BASE);
        RasterImage::from_pixels(pixels, b"original".to_vec())
    }

    fn legend_image() -> RasterImage {
        let pixels = RgbaImage::from_pixel(20, 20, Rgba([9, 8, 7, 255]));
        RasterImage::from_pixels(pixels, Vec::new())
    }

    #[test]
    fn test_blend_is_linear_and_opaque() {
        let out = blend(Rgba([0, 100, 200, 10]), [200, 100, 0], 0.5);
        assert_eq!(out, Rgba([100, 100, 100, 255]));
        assert_eq!(blend(BASE, [1, 2, 3], 0.0), BASE);
        assert_eq!(blend(BASE, [1, 2, 3], 1.0), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_crosshair_lines_and_center() {
        let base = base_image(200, 160);
        let mut input = CompositeInput::new(&base);
        input.show_legend = false;
        let canvas = CompositeRenderer::new().compose_pixels(&input);

        // Centered crosshair lands on (100, 80)
        assert_eq!(*canvas.get_pixel(100, 40), Rgba(CROSSHAIR_LINE_COLOR));
        assert_eq!(*canvas.get_pixel(30, 80), Rgba(CROSSHAIR_LINE_COLOR));
        assert_eq!(*canvas.get_pixel(100, 80), Rgba(CROSSHAIR_CENTER_COLOR));
        assert_eq!(*canvas.get_pixel(101, 81), Rgba(CROSSHAIR_CENTER_COLOR));
        assert_eq!(*canvas.get_pixel(103, 80), Rgba(CROSSHAIR_LINE_COLOR));
        assert_eq!(*canvas.get_pixel(30, 40), BASE);
    }

    #[test]
    fn test_top_bar_is_translucent() {
        let base = base_image(50, 50);
        let mut input = CompositeInput::new(&base);
        input.show_overlay = false;
        input.show_legend = false;
        let canvas = CompositeRenderer::new().compose_pixels(&input);
        let bar = *canvas.get_pixel(5, 2);
        assert_ne!(bar, BASE);
        assert_ne!(bar, Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(5, TOP_BAR_HEIGHT), BASE);
    }

    #[test]
    fn test_hiding_overlay_keeps_legend_and_feature_info() {
        let base = base_image(200, 160);
        let legend = legend_image();
        let mut input = CompositeInput::new(&base);
        input.legend = Some(&legend);
        input.show_feature_info = true;

        let renderer = CompositeRenderer::new();
        let with_overlay = renderer.compose_pixels(&input);
        input.show_overlay = false;
        let without_overlay = renderer.compose_pixels(&input);

        assert_eq!(*with_overlay.get_pixel(100, 40), Rgba(CROSSHAIR_LINE_COLOR));
        assert_eq!(*without_overlay.get_pixel(100, 40), BASE);

        // Legend copied at padding + inset from the bottom-left corner
        let legend_y = 160 - OVERLAY_PADDING - 26 + LEGEND_BACKDROP_INSET;
        let legend_x = OVERLAY_PADDING + LEGEND_BACKDROP_INSET;
        assert_eq!(*without_overlay.get_pixel(legend_x, legend_y), Rgba([9, 8, 7, 255]));

        // Feature-info border at its top-left corner
        let (fw, fh) = FEATURE_INFO_BOX_SIZE;
        let (fx, fy) = (200 - OVERLAY_PADDING - fw, 160 - OVERLAY_PADDING - fh);
        assert_eq!(*without_overlay.get_pixel(fx, fy), Rgba(FEATURE_INFO_BORDER));
        assert_eq!(
            with_overlay.get_pixel(fx, fy),
            without_overlay.get_pixel(fx, fy)
        );
    }

    #[test]
    fn test_placeholder_without_legend() {
        let base = base_image(100, 100);
        let mut input = CompositeInput::new(&base);
        input.show_overlay = false;
        let canvas = CompositeRenderer::new().compose_pixels(&input);
        let (_, h) = LEGEND_PLACEHOLDER_SIZE;
        let corner = (OVERLAY_PADDING, 100 - OVERLAY_PADDING - h);
        assert_eq!(*canvas.get_pixel(corner.0, corner.1), Rgba(PLACEHOLDER_BORDER));
    }

    #[test]
    fn test_compose_is_deterministic_and_leaves_base_untouched() {
        let base = base_image(64, 48);
        let legend = legend_image();
        let mut input = CompositeInput::new(&base);
        input.crosshair = Crosshair::new(0.25, 0.75);
        input.legend = Some(&legend);
        input.show_feature_info = true;

        let renderer = CompositeRenderer::new();
        let first = renderer.compose(&input);
        let second = renderer.compose(&input);
        assert_eq!(first, second);
        assert!(!first.from_source);
        assert_eq!((first.width, first.height), (64, 48));
        assert!(base.pixels().pixels().all(|p| *p == BASE));
    }

    #[test]
    fn test_tiny_images_do_not_panic() {
        let legend = legend_image();
        for (w, h) in [(1, 1), (3, 2), (10, 40)] {
            let base = base_image(w, h);
            let mut input = CompositeInput::new(&base);
            input.crosshair = Crosshair::new(1.0, 1.0);
            input.legend = Some(&legend);
            input.show_feature_info = true;
            let frame = CompositeRenderer::new().compose(&input);
            assert_eq!((frame.width, frame.height), (w, h));
        }
    }
}
