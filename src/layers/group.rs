//! Sublayer visibility and style selection for layer groups
//!
//! A layer group is one map resource made of several named layers. Depending
//! on its mode it is either requested as one merged unit, or each sublayer
//! can be switched on and off and given its own style.

use crate::{core::metadata::LayerMetadata, MapError, Result};
use serde::{Deserialize, Serialize};

/// How the server treats a layer group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupMode {
    /// Flattened into one layer
    Single,
    /// Named tree; sublayers are individually addressable
    Named,
    /// Plain container, requested as one unit
    Container,
    /// Earth-observation group; sublayers are individually addressable
    Eo,
}

impl GroupMode {
    /// Only named and EO groups allow per-sublayer enable/disable and styles
    pub fn allows_toggles(&self) -> bool {
        matches!(self, GroupMode::Named | GroupMode::Eo)
    }
}

impl std::fmt::Display for GroupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupMode::Single => write!(f, "SINGLE"),
            GroupMode::Named => write!(f, "NAMED"),
            GroupMode::Container => write!(f, "CONTAINER"),
            GroupMode::Eo => write!(f, "EO"),
        }
    }
}

impl std::str::FromStr for GroupMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SINGLE" => Ok(GroupMode::Single),
            "NAMED" => Ok(GroupMode::Named),
            "CONTAINER" | "CONTAINER_TREE" => Ok(GroupMode::Container),
            "EO" => Ok(GroupMode::Eo),
            other => Err(format!("unknown group mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleDirection {
    Previous,
    Next,
}

/// Position within a style list that includes an implicit "server default"
/// slot before the first entry. `None` is that slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleCursor {
    available: Vec<String>,
    current: Option<usize>,
}

impl StyleCursor {
    /// Starts at `initial` if it is one of `available`, otherwise at the
    /// default slot. A non-empty unknown initial style is added to the list.
    pub fn new(mut available: Vec<String>, initial: &str) -> Self {
        if initial.is_empty() {
            return Self {
                available,
                current: None,
            };
        }
        let current = match available.iter().position(|s| s == initial) {
            Some(index) => index,
            None => {
                available.insert(0, initial.to_string());
                0
            }
        };
        Self {
            available,
            current: Some(current),
        }
    }

    /// Selected style name; empty string means the server default
    pub fn current_style(&self) -> &str {
        self.current
            .and_then(|i| self.available.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_default(&self) -> bool {
        self.current.is_none()
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    /// Steps through `[default, s0, s1, ..., sN]` circularly
    pub fn cycle(&mut self, direction: StyleDirection) {
        let len = self.available.len();
        if len == 0 {
            self.current = None;
            return;
        }
        self.current = match (direction, self.current) {
            (StyleDirection::Next, None) => Some(0),
            (StyleDirection::Next, Some(i)) if i + 1 >= len => None,
            (StyleDirection::Next, Some(i)) => Some(i + 1),
            (StyleDirection::Previous, None) => Some(len - 1),
            (StyleDirection::Previous, Some(0)) => None,
            (StyleDirection::Previous, Some(i)) => Some(i - 1),
        };
    }
}

/// Visibility and style of one sublayer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerToggle {
    pub name: String,
    pub enabled: bool,
    style: StyleCursor,
}

impl LayerToggle {
    pub fn new(name: impl Into<String>, default_style: &str, available: Vec<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            style: StyleCursor::new(available, default_style),
        }
    }

    /// Empty string means the server default
    pub fn current_style(&self) -> &str {
        self.style.current_style()
    }

    pub fn available_styles(&self) -> &[String] {
        self.style.available()
    }

    pub fn cycle_style(&mut self, direction: StyleDirection) {
        self.style.cycle(direction);
    }
}

/// Parallel CSV lists for the `LAYERS` and `STYLES` request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSelection {
    pub layers: String,
    pub styles: String,
}

/// Tracks which sublayers of the previewed resource are enabled and which
/// style each uses, and derives the request layer/style lists from that.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroupController {
    resource: String,
    mode: Option<GroupMode>,
    toggles: Vec<LayerToggle>,
    resource_style: StyleCursor,
}

impl LayerGroupController {
    /// Controller for a plain layer or for a group requested as one unit
    pub fn single(resource: impl Into<String>, styles: Vec<String>) -> Self {
        Self {
            resource: resource.into(),
            mode: None,
            toggles: Vec::new(),
            resource_style: StyleCursor::new(styles, ""),
        }
    }

    pub fn group(
        resource: impl Into<String>,
        mode: GroupMode,
        toggles: Vec<LayerToggle>,
        styles: Vec<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            mode: Some(mode),
            toggles,
            resource_style: StyleCursor::new(styles, ""),
        }
    }

    /// Seeds toggles from collaborator metadata
    pub fn from_metadata(metadata: &LayerMetadata) -> Self {
        let resource = metadata.qualified_name();
        match &metadata.group {
            Some(group) => {
                let toggles = group
                    .sublayers
                    .iter()
                    .map(|sub| LayerToggle::new(&sub.name, &sub.default_style, sub.styles.clone()))
                    .collect();
                Self::group(resource, group.mode, toggles, metadata.styles.clone())
            }
            None => Self::single(resource, metadata.styles.clone()),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn mode(&self) -> Option<GroupMode> {
        self.mode
    }

    /// Whether per-sublayer controls are exposed at all
    pub fn is_toggle_capable(&self) -> bool {
        self.mode.is_some_and(|m| m.allows_toggles()) && !self.toggles.is_empty()
    }

    pub fn toggles(&self) -> &[LayerToggle] {
        &self.toggles
    }

    /// Replaces all toggles, e.g. when an edit is cancelled
    pub fn restore_toggles(&mut self, toggles: Vec<LayerToggle>) {
        self.toggles = toggles;
    }

    pub fn enabled_count(&self) -> usize {
        self.toggles.iter().filter(|t| t.enabled).count()
    }

    /// Flips sublayer `index`, returning its new state
    pub fn toggle(&mut self, index: usize) -> Result<bool> {
        if !self.is_toggle_capable() {
            return Err(MapError::Validation(format!(
                "layer '{}' cannot toggle sublayers",
                self.resource
            )));
        }
        let toggle = self.toggle_mut(index)?;
        toggle.enabled = !toggle.enabled;
        log::debug!("sublayer '{}' enabled={}", toggle.name, toggle.enabled);
        Ok(toggle.enabled)
    }

    /// Cycles the style of sublayer `index`, returning the new style name
    pub fn cycle_style(&mut self, index: usize, direction: StyleDirection) -> Result<String> {
        if !self.is_toggle_capable() {
            return Err(MapError::Validation(format!(
                "layer '{}' has no per-sublayer styles",
                self.resource
            )));
        }
        let toggle = self.toggle_mut(index)?;
        toggle.cycle_style(direction);
        Ok(toggle.current_style().to_string())
    }

    /// Style of the resource as a whole; used when it is requested as one unit
    pub fn resource_style(&self) -> &str {
        self.resource_style.current_style()
    }

    /// Cycles the style of the resource as a whole. Toggle-capable groups
    /// request their sublayers individually, so there it is an error.
    pub fn cycle_resource_style(&mut self, direction: StyleDirection) -> Result<String> {
        if self.is_toggle_capable() {
            return Err(MapError::Validation(format!(
                "layer '{}' is styled per sublayer",
                self.resource
            )));
        }
        self.resource_style.cycle(direction);
        Ok(self.resource_style.current_style().to_string())
    }

    /// Style for the legend of the whole resource
    pub fn legend_style(&self) -> &str {
        if self.is_toggle_capable() {
            ""
        } else {
            self.resource_style()
        }
    }

    /// The `LAYERS`/`STYLES` lists to request. Errors when a toggle-capable
    /// group has every sublayer disabled; that request is never sent.
    pub fn effective_layer_list(&self) -> Result<LayerSelection> {
        if !self.is_toggle_capable() {
            return Ok(LayerSelection {
                layers: self.resource.clone(),
                styles: self.resource_style().to_string(),
            });
        }

        let enabled: Vec<&LayerToggle> = self.toggles.iter().filter(|t| t.enabled).collect();
        if enabled.is_empty() {
            return Err(MapError::Validation("No layers enabled".to_string()));
        }

        Ok(LayerSelection {
            layers: enabled
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
            styles: enabled
                .iter()
                .map(|t| t.current_style())
                .collect::<Vec<_>>()
                .join(","),
        })
    }

    fn toggle_mut(&mut self, index: usize) -> Result<&mut LayerToggle> {
        let count = self.toggles.len();
        self.toggles.get_mut(index).ok_or_else(|| {
            MapError::Validation(format!("sublayer {} out of range ({})", index, count))
        })
    }
}
