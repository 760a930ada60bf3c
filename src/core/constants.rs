//! Core constants for the preview pipeline.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Lowest zoom level; the whole world is visible.
pub const MIN_ZOOM: f64 = 0.0;

/// Highest zoom level.
pub const MAX_ZOOM: f64 = 20.0;

/// Zoom change applied by `zoom_in/zoom_out`.
pub const ZOOM_STEP: f64 = 0.5;

/// Fraction of the current bbox extent moved per pan step.
pub const PAN_FRACTION: f64 = 0.125;

/// World width in degrees at zoom 0.
pub const WORLD_WIDTH_DEG: f64 = 360.0;

/// Half the world height in degrees; the visible height at zoom 0 is twice this.
pub const WORLD_HALF_HEIGHT_DEG: f64 = 90.0;

/// Normalized distance the crosshair moves per key press.
pub const CROSSHAIR_STEP: f64 = 0.02;

/// Output size of GetLegendGraphic requests, regardless of the map size.
pub const LEGEND_SIZE: (u32, u32) = (20, 20);

/// Default per-request timeout for the map server, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default bound on external converter runtime, in seconds.
pub const DEFAULT_SUBPROCESS_TIMEOUT_SECS: u64 = 5;

/// Text shown in place of an empty feature-info response.
pub const NO_FEATURES_MESSAGE: &str = "No features found at this location";

/// Brightness ramp for the ASCII renderer, darkest first.
pub const ASCII_RAMP: &str = " .:-=+*#%@";

/// Pixels with alpha below this are drawn blank by the ASCII renderer.
pub const ASCII_ALPHA_THRESHOLD: u8 = 128;

/// Crosshair line color (RGBA, opaque).
pub const CROSSHAIR_LINE_COLOR: [u8; 4] = [255, 64, 64, 255];

/// Crosshair center marker color (RGBA, opaque).
pub const CROSSHAIR_CENTER_COLOR: [u8; 4] = [255, 255, 0, 255];

/// Height of the translucent annotation bar across the top, in pixels.
pub const TOP_BAR_HEIGHT: u32 = 14;

/// Padding between overlay boxes and the image edge, in pixels.
pub const OVERLAY_PADDING: u32 = 8;

/// Inner padding between a legend backdrop and the legend bitmap.
pub const LEGEND_BACKDROP_INSET: u32 = 3;

/// Size of the legend placeholder box drawn before a legend arrives.
pub const LEGEND_PLACEHOLDER_SIZE: (u32, u32) = (26, 26);

/// Maximum size of the feature-info backdrop box.
pub const FEATURE_INFO_BOX_SIZE: (u32, u32) = (180, 90);

/// Fallback pixel size of one terminal cell when the terminal does not report it.
pub const DEFAULT_CELL_SIZE: (u32, u32) = (8, 16);
