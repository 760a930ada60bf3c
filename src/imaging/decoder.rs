use crate::{MapError, Result};
use image::{ImageFormat, RgbaImage};

/// A decoded raster, immutable once produced.
///
/// The source bytes are kept alongside the pixels so that compositing can
/// fall back to them if re-encoding fails.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
    source: Vec<u8>,
}

impl RasterImage {
    pub fn from_pixels(pixels: RgbaImage, source: Vec<u8>) -> Self {
        Self { pixels, source }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Decodes PNG, JPEG or GIF bytes into an RGBA bitmap
pub fn decode(bytes: Vec<u8>) -> Result<RasterImage> {
    if bytes.is_empty() {
        return Err(MapError::Decode("empty image payload".to_string()));
    }

    let format = image::guess_format(&bytes)?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif
    ) {
        return Err(MapError::Decode(format!(
            "unsupported image format {:?}",
            format
        )));
    }

    let pixels = image::load_from_memory_with_format(&bytes, format)?.to_rgba8();
    log::debug!(
        "decoded {:?} image {}x{}",
        format,
        pixels.width(),
        pixels.height()
    );
    Ok(RasterImage::from_pixels(pixels, bytes))
}
