//! Layer metadata supplied by the resource browser
//!
//! The preview does not discover layers itself. Whatever opens it must hand
//! over the layer's bounds, its styles and, for layer groups, the group mode
//! and per-sublayer style information.

use crate::{
    core::bounds::GeoBounds,
    layers::group::GroupMode,
    prelude::HashMap,
    MapError, Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One sublayer of a layer group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SublayerMetadata {
    pub name: String,
    /// Empty means the server default
    #[serde(default)]
    pub default_style: String,
    #[serde(default)]
    pub styles: Vec<String>,
}

/// Composition of a layer group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub mode: GroupMode,
    #[serde(default)]
    pub sublayers: Vec<SublayerMetadata>,
}

/// Everything the preview needs to know about one layer or layer group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub name: String,
    #[serde(default)]
    pub workspace: Option<String>,
    pub bounds: GeoBounds,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub group: Option<GroupMetadata>,
}

impl LayerMetadata {
    /// A plain (non-group) layer
    pub fn layer(name: impl Into<String>, bounds: GeoBounds, styles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            workspace: None,
            bounds,
            styles,
            group: None,
        }
    }

    /// Name as sent in `LAYERS`, prefixed with the workspace when known
    pub fn qualified_name(&self) -> String {
        match self.workspace.as_deref() {
            Some(ws) if !ws.is_empty() && !self.name.contains(':') => {
                format!("{}:{}", ws, self.name)
            }
            _ => self.name.clone(),
        }
    }
}

/// Source of layer metadata
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn layer_metadata(&self, layer: &str) -> Result<LayerMetadata>;
}

/// In-memory provider, usually loaded from a JSON document
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    layers: HashMap<String, LayerMetadata>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metadata: LayerMetadata) {
        self.layers.insert(metadata.name.clone(), metadata);
    }

    /// Parses either a single layer object or an array of them
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let entries: Vec<LayerMetadata> = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };

        let mut provider = Self::new();
        for entry in entries {
            if !entry.bounds.is_valid() {
                return Err(MapError::Metadata(format!(
                    "layer '{}' has invalid bounds",
                    entry.name
                )));
            }
            provider.insert(entry);
        }
        Ok(provider)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadata {
    async fn layer_metadata(&self, layer: &str) -> Result<LayerMetadata> {
        self.layers
            .get(layer)
            .or_else(|| {
                // Accept a workspace-qualified name for an unqualified entry
                layer
                    .split_once(':')
                    .and_then(|(_, bare)| self.layers.get(bare))
            })
            .cloned()
            .ok_or_else(|| MapError::Metadata(format!("unknown layer '{}'", layer)))
    }
}
