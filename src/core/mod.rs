pub mod bounds;
pub mod config;
pub mod constants;
pub mod controller;
pub mod geo;
pub mod metadata;
pub mod viewport;

// Re-exports for convenience
pub use bounds::GeoBounds;
pub use controller::{FetchStatus, PreviewController, PreviewMode};
pub use geo::LatLng;
pub use viewport::{Crosshair, PanDirection, Viewport};
