//! Terminal image backends
//!
//! Every backend turns encoded image bytes into a string that, written to the
//! terminal, shows the image in a `width` x `height` cell area.

use super::capabilities::NativeProtocol;
use super::subprocess::ConverterCommand;
use crate::core::constants::{ASCII_ALPHA_THRESHOLD, ASCII_RAMP, DEFAULT_CELL_SIZE};
use crate::imaging::decoder::decode;
use crate::prelude::Duration;
use crate::{MapError, Result};
use std::io::Write;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Native,
    SixelSubprocess,
    GeneralSubprocess,
    Ascii,
}

impl std::fmt::Display for RendererKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RendererKind::Native => "native",
            RendererKind::SixelSubprocess => "sixel",
            RendererKind::GeneralSubprocess => "general",
            RendererKind::Ascii => "ascii",
        };
        f.write_str(name)
    }
}

/// Common contract for all terminal backends
pub trait Renderer: Send {
    /// Renders encoded image bytes into a `width` x `height` cell area
    fn render(&self, bytes: &[u8], width: u16, height: u16) -> Result<String>;

    fn kind(&self) -> RendererKind;
}

/// Converters that only take file arguments get the image through a
/// temporary file that lives until the command returns
fn image_tempfile(bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("mapterm-")
        .suffix(".png")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

fn size_arg(width: u16, height: u16) -> String {
    format!("--size={}x{}", width.max(1), height.max(1))
}

/// Native terminal protocol, emitted by the general converter
pub struct NativeRenderer {
    protocol: NativeProtocol,
    binary: String,
    timeout: Duration,
}

impl NativeRenderer {
    pub fn new(protocol: NativeProtocol, binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            protocol,
            binary: binary.into(),
            timeout,
        }
    }

    fn run(&self, file: &NamedTempFile, format: &str, width: u16, height: u16) -> Result<String> {
        ConverterCommand::new(&self.binary, self.timeout)
            .arg(format!("--format={}", format))
            .arg(size_arg(width, height))
            .arg(file.path().to_string_lossy())
            .run()
    }
}

impl Renderer for NativeRenderer {
    fn render(&self, bytes: &[u8], width: u16, height: u16) -> Result<String> {
        let file = image_tempfile(bytes)?;
        match self.run(&file, self.protocol.converter_format(), width, height) {
            Ok(out) => Ok(out),
            Err(e) => {
                log::warn!(
                    "{} output failed ({}), retrying with symbols",
                    self.protocol.converter_format(),
                    e
                );
                self.run(&file, "symbols", width, height)
            }
        }
    }

    fn kind(&self) -> RendererKind {
        RendererKind::Native
    }
}

/// Sixel converter fed through stdin
pub struct SixelRenderer {
    binary: String,
    timeout: Duration,
}

impl SixelRenderer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Renderer for SixelRenderer {
    fn render(&self, bytes: &[u8], width: u16, height: u16) -> Result<String> {
        let (cell_w, cell_h) = DEFAULT_CELL_SIZE;
        ConverterCommand::new(&self.binary, self.timeout)
            .arg(format!("--width={}", width.max(1) as u32 * cell_w))
            .arg(format!("--height={}", height.max(1) as u32 * cell_h))
            .stdin(bytes.to_vec())
            .run()
    }

    fn kind(&self) -> RendererKind {
        RendererKind::SixelSubprocess
    }
}

/// General converter with explicit size and color depth
pub struct GeneralRenderer {
    binary: String,
    timeout: Duration,
}

impl GeneralRenderer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Renderer for GeneralRenderer {
    fn render(&self, bytes: &[u8], width: u16, height: u16) -> Result<String> {
        let file = image_tempfile(bytes)?;
        ConverterCommand::new(&self.binary, self.timeout)
            .arg(size_arg(width, height))
            .arg("--colors=256")
            .arg(file.path().to_string_lossy())
            .run()
    }

    fn kind(&self) -> RendererKind {
        RendererKind::GeneralSubprocess
    }
}

/// Built-in character-ramp renderer, the last resort
#[derive(Debug, Clone, Default)]
pub struct AsciiRenderer;

impl AsciiRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Character grid for an image of `image_w` x `image_h` pixels. Cells are
    /// treated as twice as tall as wide so the aspect ratio survives.
    pub fn grid_size(image_w: u32, image_h: u32, width: u16, height: u16) -> (u32, u32) {
        if image_w == 0 || image_h == 0 || width == 0 || height == 0 {
            return (0, 0);
        }
        let (iw, ih) = (image_w as f64, image_h as f64);
        let step = (iw / width as f64).max(ih / (2.0 * height as f64));
        let cols = ((iw / step).floor() as u32).clamp(1, width as u32);
        let rows = ((ih / (2.0 * step)).floor() as u32).clamp(1, height as u32);
        (cols, rows)
    }

    /// Ramp character for one RGBA pixel
    pub fn cell_char(pixel: [u8; 4]) -> char {
        if pixel[3] < ASCII_ALPHA_THRESHOLD {
            return ' ';
        }
        let luminance =
            0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        let ramp: Vec<char> = ASCII_RAMP.chars().collect();
        let index = ((luminance / 255.0) * (ramp.len() - 1) as f64).round() as usize;
        ramp[index.min(ramp.len() - 1)]
    }
}

impl Renderer for AsciiRenderer {
    fn render(&self, bytes: &[u8], width: u16, height: u16) -> Result<String> {
        let image = decode(bytes.to_vec())
            .map_err(|e| MapError::Render(format!("ascii renderer: {}", e)))?;
        let pixels = image.pixels();
        let (iw, ih) = pixels.dimensions();
        let (cols, rows) = Self::grid_size(iw, ih, width, height);

        let mut out = String::with_capacity(((cols + 1) * rows) as usize);
        for row in 0..rows {
            if row > 0 {
                out.push('\n');
            }
            // Nearest pixel at the cell center
            let py = (((row as f64 + 0.5) * ih as f64 / rows as f64) as u32).min(ih - 1);
            for col in 0..cols {
                let px = (((col as f64 + 0.5) * iw as f64 / cols as f64) as u32).min(iw - 1);
                out.push(Self::cell_char(pixels.get_pixel(px, py).0));
            }
        }
        Ok(out)
    }

    fn kind(&self) -> RendererKind {
        RendererKind::Ascii
    }
}
