//! # mapterm
//!
//! A terminal map-preview engine for WMS-style map servers.
//!
//! The crate issues GetMap / GetFeatureInfo / GetLegendGraphic requests,
//! composites a crosshair, legend and feature-info overlay onto the returned
//! raster, and renders the result into a terminal through whichever graphics
//! backend is available (native protocol, Sixel, a general converter, or
//! built-in ASCII art).

pub mod core;
pub mod fetch;
pub mod imaging;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod runtime;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{PreviewConfig, RenderConfig, ServiceConfig},
    controller::{FetchStatus, PreviewController, PreviewMode},
    bounds::GeoBounds,
    geo::LatLng,
    metadata::{GroupMetadata, LayerMetadata, MetadataProvider, SublayerMetadata},
    viewport::{Crosshair, Viewport},
};

pub use crate::fetch::pipeline::{FetchEvent, FetchPipeline};

pub use crate::imaging::{
    composite::{CompositeFrame, CompositeInput, CompositeRenderer},
    decoder::RasterImage,
};

pub use crate::input::events::{Action, PreviewInput};

pub use crate::layers::group::{GroupMode, LayerGroupController, LayerSelection, LayerToggle};

pub use crate::rendering::{
    capabilities::Capabilities,
    protocol::ProtocolAdapter,
    renderers::{Renderer, RendererKind},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Coarse classification of failures. Everything except `Setup` is
/// recoverable and only ever shown to the user in place of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection failure, timeout, non-2xx status, service exception
    Network,
    /// Malformed or unsupported image bytes
    Decode,
    /// Request rejected before it was sent
    Validation,
    /// Terminal rendering backend failed
    Backend,
    /// Startup problems (metadata files, configuration, no async runtime)
    Setup,
}

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Service exception: {0}")]
    ServiceException(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl MapError {
    /// Which bucket of the error taxonomy this error falls into
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::Network(_)
            | MapError::Timeout
            | MapError::HttpStatus { .. }
            | MapError::ServiceException(_) => ErrorKind::Network,
            MapError::Decode(_) => ErrorKind::Decode,
            MapError::Validation(_) => ErrorKind::Validation,
            MapError::Render(_) | MapError::Io(_) => ErrorKind::Backend,
            MapError::Serialization(_) | MapError::Metadata(_) | MapError::Runtime(_) => {
                ErrorKind::Setup
            }
        }
    }

    /// Whether the preview can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Setup
    }
}

impl From<image::ImageError> for MapError {
    fn from(err: image::ImageError) -> Self {
        MapError::Decode(err.to_string())
    }
}

/// Error type alias for convenience
pub type Error = MapError;

/// Route `log` output to a file. The terminal itself is the drawing surface,
/// so logging to stderr would tear the picture.
#[cfg(feature = "debug")]
pub fn init_file_logger(path: &std::path::Path, filter: &str) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    env_logger::Builder::new()
        .parse_filters(filter)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| MapError::Io(std::io::Error::new(std::io::ErrorKind::AlreadyExists, e)))
}
