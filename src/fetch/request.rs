//! Typed parameter sets for the three service operations
//!
//! Each request renders to the list of query pairs appended to the service
//! endpoint. Parameter names follow the 1.1.1 conventions (`SRS`, `X`, `Y`).

use crate::{
    core::{bounds::GeoBounds, config::ServiceConfig, constants::LEGEND_SIZE},
    layers::group::LayerSelection,
    MapError, Result,
};

pub type QueryPairs = Vec<(&'static str, String)>;

/// GetMap for the current view
#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    pub selection: LayerSelection,
    pub bbox: GeoBounds,
    pub width: u32,
    pub height: u32,
}

impl MapRequest {
    pub fn new(selection: LayerSelection, bbox: GeoBounds, width: u32, height: u32) -> Self {
        Self {
            selection,
            bbox,
            width,
            height,
        }
    }

    /// Rejects requests the server would refuse anyway
    pub fn validate(&self) -> Result<()> {
        if self.selection.layers.is_empty() {
            return Err(MapError::Validation("No layers enabled".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(MapError::Validation(format!(
                "invalid image size {}x{}",
                self.width, self.height
            )));
        }
        if !self.bbox.is_valid() {
            return Err(MapError::Validation(format!(
                "invalid bounding box {}",
                self.bbox.to_bbox_param()
            )));
        }
        Ok(())
    }

    pub fn query_pairs(&self, service: &ServiceConfig) -> QueryPairs {
        let mut pairs = common_pairs(service, "GetMap");
        pairs.extend([
            ("LAYERS", self.selection.layers.clone()),
            ("STYLES", self.selection.styles.clone()),
            ("FORMAT", service.format.clone()),
            ("SRS", service.srs.clone()),
            ("WIDTH", self.width.to_string()),
            ("HEIGHT", self.height.to_string()),
            ("BBOX", self.bbox.to_bbox_param()),
        ]);
        pairs
    }
}

/// GetFeatureInfo at one pixel of the current view
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfoRequest {
    pub map: MapRequest,
    pub x: u32,
    pub y: u32,
}

impl FeatureInfoRequest {
    pub fn new(map: MapRequest, x: u32, y: u32) -> Self {
        Self { map, x, y }
    }

    pub fn validate(&self) -> Result<()> {
        self.map.validate()?;
        if self.x >= self.map.width || self.y >= self.map.height {
            return Err(MapError::Validation(format!(
                "query pixel ({}, {}) outside {}x{} image",
                self.x, self.y, self.map.width, self.map.height
            )));
        }
        Ok(())
    }

    pub fn query_pairs(&self, service: &ServiceConfig) -> QueryPairs {
        let mut pairs = self.map.query_pairs(service);
        if let Some(request) = pairs.iter_mut().find(|(k, _)| *k == "REQUEST") {
            request.1 = "GetFeatureInfo".to_string();
        }
        pairs.extend([
            ("QUERY_LAYERS", self.map.selection.layers.clone()),
            ("INFO_FORMAT", service.info_format.clone()),
            ("FEATURE_COUNT", service.feature_count.to_string()),
            ("X", self.x.to_string()),
            ("Y", self.y.to_string()),
        ]);
        pairs
    }
}

/// GetLegendGraphic for one layer, always at the fixed legend size
#[derive(Debug, Clone, PartialEq)]
pub struct LegendRequest {
    pub layer: String,
    /// Empty means the server default style
    pub style: String,
}

impl LegendRequest {
    pub fn new(layer: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            style: style.into(),
        }
    }

    pub fn query_pairs(&self, service: &ServiceConfig) -> QueryPairs {
        let (width, height) = LEGEND_SIZE;
        let mut pairs = common_pairs(service, "GetLegendGraphic");
        pairs.push(("LAYER", self.layer.clone()));
        if !self.style.is_empty() {
            pairs.push(("STYLE", self.style.clone()));
        }
        pairs.extend([
            ("FORMAT", service.format.clone()),
            ("WIDTH", width.to_string()),
            ("HEIGHT", height.to_string()),
        ]);
        pairs
    }
}

fn common_pairs(service: &ServiceConfig, request: &str) -> QueryPairs {
    vec![
        ("SERVICE", "WMS".to_string()),
        ("VERSION", service.version.clone()),
        ("REQUEST", request.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(pairs: &'a QueryPairs, key: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn map_request() -> MapRequest {
        MapRequest::new(
            LayerSelection {
                layers: "roads,labels".to_string(),
                styles: "line,".to_string(),
            },
            GeoBounds::new(-45.0, -22.5, 45.0, 22.5),
            800,
            400,
        )
    }

    #[test]
    fn test_get_map_pairs() {
        let service = ServiceConfig::default();
        let pairs = map_request().query_pairs(&service);
        assert_eq!(value(&pairs, "REQUEST"), Some("GetMap"));
        assert_eq!(value(&pairs, "LAYERS"), Some("roads,labels"));
        assert_eq!(value(&pairs, "STYLES"), Some("line,"));
        assert_eq!(value(&pairs, "SRS"), Some("EPSG:4326"));
        assert_eq!(value(&pairs, "BBOX"), Some("-45,-22.5,45,22.5"));
        assert_eq!(value(&pairs, "WIDTH"), Some("800"));
    }

    #[test]
    fn test_feature_info_pairs() {
        let service = ServiceConfig::default();
        let request = FeatureInfoRequest::new(map_request(), 10, 20);
        assert!(request.validate().is_ok());
        let pairs = request.query_pairs(&service);
        assert_eq!(value(&pairs, "REQUEST"), Some("GetFeatureInfo"));
        assert_eq!(value(&pairs, "QUERY_LAYERS"), Some("roads,labels"));
        assert_eq!(value(&pairs, "X"), Some("10"));
        assert_eq!(value(&pairs, "Y"), Some("20"));
        assert_eq!(value(&pairs, "INFO_FORMAT"), Some("text/plain"));
    }

    #[test]
    fn test_feature_info_outside_image_rejected() {
        let request = FeatureInfoRequest::new(map_request(), 800, 0);
        assert!(matches!(request.validate(), Err(MapError::Validation(_))));
    }

    #[test]
    fn test_legend_uses_fixed_size() {
        let service = ServiceConfig::default();
        let pairs = LegendRequest::new("topp:states", "").query_pairs(&service);
        assert_eq!(value(&pairs, "WIDTH"), Some("20"));
        assert_eq!(value(&pairs, "HEIGHT"), Some("20"));
        assert_eq!(value(&pairs, "STYLE"), None);

        let pairs = LegendRequest::new("topp:states", "pophatch").query_pairs(&service);
        assert_eq!(value(&pairs, "STYLE"), Some("pophatch"));
    }

    #[test]
    fn test_empty_layers_rejected() {
        let mut request = map_request();
        request.selection.layers.clear();
        assert!(request.validate().is_err());
    }
}
