//! Prelude module for common mapterm types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapterm::prelude::*;`

pub use crate::core::{
    config::{PreviewConfig, PreviewProfile, RenderConfig, RendererChoice, ServiceConfig},
    controller::{FetchStatus, PreviewController, PreviewMode},
    bounds::GeoBounds,
    geo::LatLng,
    metadata::{GroupMetadata, LayerMetadata, MetadataProvider, StaticMetadata, SublayerMetadata},
    viewport::{Crosshair, Viewport},
};

pub use crate::layers::group::{
    GroupMode, LayerGroupController, LayerSelection, LayerToggle, StyleCursor, StyleDirection,
};

pub use crate::fetch::{
    pipeline::{FetchEvent, FetchPipeline},
    request::{FeatureInfoRequest, LegendRequest, MapRequest},
};

pub use crate::imaging::{
    composite::{CompositeFrame, CompositeInput, CompositeRenderer},
    decoder::{decode, RasterImage},
};

pub use crate::input::events::{Action, PreviewInput};

pub use crate::rendering::{
    capabilities::{Capabilities, NativeProtocol, TerminalEnv},
    protocol::ProtocolAdapter,
    renderers::{AsciiRenderer, Renderer, RendererKind},
};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::{Error as MapError, ErrorKind, Result};

pub use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use std::{future::Future, pin::Pin};
