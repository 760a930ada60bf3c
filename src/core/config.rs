//! Configuration for the map server connection and the terminal renderers
//!
//! Like the engine's other tuning knobs, image-size limits come from a small
//! set of profiles that resolve to concrete options.

use crate::core::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SUBPROCESS_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and request parameters for the map service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server root, e.g. `http://localhost:8080/geoserver`
    pub base_url: String,
    /// Workspace used to build a workspace-scoped endpoint
    pub workspace: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Service version string
    pub version: String,
    /// Spatial reference identifier sent with every request
    pub srs: String,
    /// Image format for GetMap and GetLegendGraphic
    pub format: String,
    /// Format for GetFeatureInfo responses
    pub info_format: String,
    pub feature_count: u32,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// The service endpoint requests are sent to
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.workspace.as_deref().filter(|w| !w.is_empty()) {
            Some(workspace) => format!("{}/{}/wms", base, workspace),
            None => format!("{}/wms", base),
        }
    }

    /// Credentials for basic authentication, if a username is configured
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.username
            .as_deref()
            .map(|user| (user, self.password.as_deref()))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/geoserver".to_string(),
            workspace: None,
            username: None,
            password: None,
            version: "1.1.1".to_string(),
            srs: "EPSG:4326".to_string(),
            format: "image/png".to_string(),
            info_format: "text/plain".to_string(),
            feature_count: 10,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Forces a particular terminal backend instead of detecting one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RendererChoice {
    #[default]
    Auto,
    Native,
    Sixel,
    General,
    Ascii,
}

impl std::str::FromStr for RendererChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" | "kitty" | "iterm" => Ok(Self::Native),
            "sixel" => Ok(Self::Sixel),
            "general" | "chafa" => Ok(Self::General),
            "ascii" => Ok(Self::Ascii),
            other => Err(format!("unknown renderer '{}'", other)),
        }
    }
}

/// Terminal output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub renderer: RendererChoice,
    /// Upper bound on how long an external converter may run
    #[serde(with = "duration_secs")]
    pub subprocess_timeout: Duration,
    /// Sixel converter reading image bytes on stdin
    pub sixel_binary: String,
    /// General-purpose terminal image converter
    pub general_binary: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            renderer: RendererChoice::Auto,
            subprocess_timeout: Duration::from_secs(DEFAULT_SUBPROCESS_TIMEOUT_SECS),
            sixel_binary: "img2sixel".to_string(),
            general_binary: "chafa".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreviewProfile {
    #[default]
    Balanced,
    LowBandwidth,
    HighDetail,
    Custom(ImageSizeLimits),
}

impl PreviewProfile {
    pub fn resolve(&self) -> ImageSizeLimits {
        match self {
            Self::Balanced => ImageSizeLimits {
                max_width: 1280,
                max_height: 960,
                min_width: 64,
                min_height: 48,
            },
            Self::LowBandwidth => ImageSizeLimits {
                max_width: 640,
                max_height: 480,
                min_width: 64,
                min_height: 48,
            },
            Self::HighDetail => ImageSizeLimits {
                max_width: 2560,
                max_height: 1920,
                min_width: 64,
                min_height: 48,
            },
            Self::Custom(limits) => limits.clone(),
        }
    }
}

impl std::str::FromStr for PreviewProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "low" | "low-bandwidth" => Ok(Self::LowBandwidth),
            "high" | "high-detail" => Ok(Self::HighDetail),
            other => Err(format!("unknown profile '{}'", other)),
        }
    }
}

/// Bounds on the GetMap output size
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSizeLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl ImageSizeLimits {
    /// Clamps a requested size, keeping its aspect ratio when scaling down
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        let (mut w, mut h) = (width.max(1) as f64, height.max(1) as f64);
        let shrink = (self.max_width as f64 / w)
            .min(self.max_height as f64 / h)
            .min(1.0);
        w *= shrink;
        h *= shrink;
        (
            (w.round() as u32).max(self.min_width),
            (h.round() as u32).max(self.min_height),
        )
    }
}

/// Everything the preview needs to run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreviewConfig {
    pub service: ServiceConfig,
    pub render: RenderConfig,
    pub profile: PreviewProfile,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
