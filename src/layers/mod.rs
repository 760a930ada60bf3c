pub mod group;

pub use group::{GroupMode, LayerGroupController, LayerSelection, LayerToggle, StyleCursor, StyleDirection};
