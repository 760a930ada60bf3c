//! The preview state machine
//!
//! All state changes happen synchronously in [`PreviewController::handle_action`]
//! and [`PreviewController::apply_event`]. Network work is only ever started
//! here and finished by draining the fetch pipeline from the same loop.

use crate::core::config::{ImageSizeLimits, PreviewConfig};
use crate::core::constants::DEFAULT_CELL_SIZE;
use crate::core::metadata::LayerMetadata;
use crate::core::viewport::{Crosshair, PanDirection, Viewport};
use crate::fetch::pipeline::{FetchEvent, FetchPipeline};
use crate::fetch::request::{FeatureInfoRequest, LegendRequest, MapRequest};
use crate::imaging::composite::{CompositeFrame, CompositeInput, CompositeRenderer};
use crate::imaging::decoder::{decode, RasterImage};
use crate::input::events::{Action, PreviewInput};
use crate::layers::group::{LayerGroupController, LayerToggle};
use crate::Result;

/// Whether the sublayer panel is open
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewMode {
    Viewing,
    LayerPanelOpen {
        cursor: usize,
        /// Toggles as they were when the panel opened, restored on cancel
        snapshot: Vec<LayerToggle>,
    },
}

/// State of the most recent map request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Pending,
    Error(String),
}

#[derive(Debug, Default)]
struct LegendCache {
    image: Option<RasterImage>,
    requested: bool,
}

pub struct PreviewController {
    viewport: Viewport,
    crosshair: Crosshair,
    layers: LayerGroupController,
    pipeline: FetchPipeline,
    compositor: CompositeRenderer,
    limits: ImageSizeLimits,
    mode: PreviewMode,
    status: FetchStatus,
    display_cells: (u16, u16),
    image_size: (u32, u32),
    base: Option<RasterImage>,
    legend: LegendCache,
    show_overlay: bool,
    show_legend: bool,
    show_feature_info: bool,
    feature_info: Option<String>,
    /// Composite of the current base image; empty while a fetch is pending
    frame: Option<CompositeFrame>,
    /// What was on screen when the pending fetch started
    previous_frame: Option<CompositeFrame>,
    quit: bool,
}

impl PreviewController {
    /// Opens a preview of `metadata`; the view starts fitted to its bounds.
    /// Nothing is fetched until [`refresh`](Self::refresh) is called.
    pub fn new(metadata: &LayerMetadata, config: PreviewConfig) -> Self {
        let limits = config.profile.resolve();
        let display_cells = (80, 24);
        let mut controller = Self {
            viewport: Viewport::from_bounds(metadata.bounds),
            crosshair: Crosshair::centered(),
            layers: LayerGroupController::from_metadata(metadata),
            pipeline: FetchPipeline::new(config.service),
            compositor: CompositeRenderer::new(),
            limits,
            mode: PreviewMode::Viewing,
            status: FetchStatus::Idle,
            display_cells,
            image_size: (0, 0),
            base: None,
            legend: LegendCache::default(),
            show_overlay: true,
            show_legend: true,
            show_feature_info: false,
            feature_info: None,
            frame: None,
            previous_frame: None,
            quit: false,
        };
        controller.set_display_cells(display_cells.0, display_cells.1);
        controller
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn crosshair(&self) -> Crosshair {
        self.crosshair
    }

    pub fn layers(&self) -> &LayerGroupController {
        &self.layers
    }

    pub fn pipeline(&self) -> &FetchPipeline {
        &self.pipeline
    }

    pub fn mode(&self) -> &PreviewMode {
        &self.mode
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Pending
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Pixel size requested from the server
    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    /// Cell area the map is drawn into
    pub fn display_cells(&self) -> (u16, u16) {
        self.display_cells
    }

    pub fn base_image(&self) -> Option<&RasterImage> {
        self.base.as_ref()
    }

    pub fn legend(&self) -> Option<&RasterImage> {
        self.legend.image.as_ref()
    }

    pub fn feature_info(&self) -> Option<&str> {
        self.feature_info
            .as_deref()
            .filter(|_| self.show_feature_info)
    }

    pub fn overlay_visible(&self) -> bool {
        self.show_overlay
    }

    /// The frame to show: the newest composite, else the one kept while
    /// a fetch is in flight. `None` means nothing has loaded yet.
    pub fn displayed_frame(&self) -> Option<&CompositeFrame> {
        self.frame.as_ref().or(self.previous_frame.as_ref())
    }

    /// Frame held on screen while a map fetch is pending
    pub fn previous_frame(&self) -> Option<&CompositeFrame> {
        self.previous_frame.as_ref()
    }

    /// Sets the cell area available for the map and derives the requested
    /// image size from it
    pub fn set_display_cells(&mut self, cols: u16, rows: u16) {
        let (cell_w, cell_h) = DEFAULT_CELL_SIZE;
        self.display_cells = (cols.max(1), rows.max(1));
        self.image_size = self.limits.fit(
            self.display_cells.0 as u32 * cell_w,
            self.display_cells.1 as u32 * cell_h,
        );
    }

    pub fn handle_input(&mut self, input: PreviewInput) {
        let panel_open = matches!(self.mode, PreviewMode::LayerPanelOpen { .. });
        if let Some(action) = input.to_action(panel_open) {
            self.handle_action(action);
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        log::debug!("action {:?}", action);
        match action {
            Action::PanUp => self.move_camera(|v| v.pan(PanDirection::Up)),
            Action::PanDown => self.move_camera(|v| v.pan(PanDirection::Down)),
            Action::PanLeft => self.move_camera(|v| v.pan(PanDirection::Left)),
            Action::PanRight => self.move_camera(|v| v.pan(PanDirection::Right)),
            Action::ZoomIn => self.move_camera(Viewport::zoom_in),
            Action::ZoomOut => self.move_camera(Viewport::zoom_out),
            Action::MoveCrosshair { dx, dy } => {
                self.crosshair.step(dx, dy);
                // The shown feature info no longer describes the crosshair
                self.clear_feature_info();
                self.recomposite();
            }
            Action::QueryFeature => self.query_feature(),
            Action::Refresh => self.refresh(),
            Action::ToggleOverlay => {
                self.show_overlay = !self.show_overlay;
                self.recomposite();
            }
            Action::ToggleLegend => {
                self.show_legend = !self.show_legend;
                self.recomposite();
            }
            Action::ToggleFeatureInfo => {
                self.show_feature_info = !self.show_feature_info && self.feature_info.is_some();
                self.recomposite();
            }
            Action::CycleStyle(direction) => match self.layers.cycle_resource_style(direction) {
                Ok(style) => {
                    log::info!("style -> {:?}", style);
                    self.refresh();
                }
                // Sublayer styles of a group are edited in the layer panel
                Err(e) => log::debug!("{}", e),
            },
            Action::OpenLayerPanel => self.open_layer_panel(),
            Action::PanelUp => self.move_panel_cursor(-1),
            Action::PanelDown => self.move_panel_cursor(1),
            Action::PanelToggle => self.panel_edit(|layers, i| layers.toggle(i).map(|_| ())),
            Action::PanelCycleStyle(direction) => {
                self.panel_edit(|layers, i| layers.cycle_style(i, direction).map(|_| ()))
            }
            Action::PanelApply => {
                if matches!(self.mode, PreviewMode::LayerPanelOpen { .. }) {
                    self.mode = PreviewMode::Viewing;
                    self.refresh();
                }
            }
            Action::PanelCancel => self.close_layer_panel(),
            Action::Resize { cols, rows } => {
                self.set_display_cells(cols, rows);
                self.refresh();
            }
            Action::Quit => self.quit = true,
        }
    }

    /// Issues a map fetch for the current view. The displayed frame becomes
    /// the previous frame and stays on screen until the answer arrives.
    pub fn refresh(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.previous_frame = Some(frame);
        }
        match self.start_map_fetch() {
            Ok(sequence) => {
                log::debug!("map fetch #{} pending", sequence);
                self.status = FetchStatus::Pending;
            }
            Err(e) => {
                log::warn!("map fetch not sent: {}", e);
                // Whatever is still in flight was asked for a view the user
                // has since left
                self.pipeline.invalidate_map();
                self.status = FetchStatus::Error(e.to_string());
                self.restore_previous_frame();
            }
        }
    }

    /// Drains finished requests; returns whether anything changed
    pub fn poll(&mut self) -> bool {
        let events = self.pipeline.try_recv_events();
        let mut changed = false;
        for event in events {
            changed |= self.apply_event(event);
        }
        changed
    }

    /// Waits up to `timeout` for one finished request and applies it
    pub fn poll_timeout(&mut self, timeout: std::time::Duration) -> bool {
        match self.pipeline.recv_event_timeout(timeout) {
            Some(event) => self.apply_event(event) | self.poll(),
            None => false,
        }
    }

    /// Applies one completion; stale completions are dropped. Returns
    /// whether visible state changed.
    pub fn apply_event(&mut self, event: FetchEvent) -> bool {
        log::trace!("{} response received", event.label());
        match event {
            FetchEvent::Map { sequence, result } => {
                if !self.pipeline.is_current_map(sequence) {
                    log::warn!("discarding stale map response #{}", sequence);
                    return false;
                }
                self.finish_map_fetch(result);
                true
            }
            FetchEvent::FeatureInfo { sequence, result } => {
                if !self.pipeline.is_current_feature_info(sequence) {
                    log::warn!("discarding stale feature info #{}", sequence);
                    return false;
                }
                let text = result.unwrap_or_else(|e| format!("Feature query failed: {}", e));
                self.feature_info = Some(text);
                self.show_feature_info = true;
                self.recomposite();
                true
            }
            FetchEvent::Legend { result } => {
                match result.and_then(decode) {
                    Ok(image) => {
                        self.legend.image = Some(image);
                        self.recomposite();
                    }
                    Err(e) => log::warn!("legend unavailable: {}", e),
                }
                true
            }
        }
    }

    /// One-line summary: zoom, crosshair position, fetch state, style and
    /// feature info when shown
    pub fn status_text(&self) -> String {
        let position = self
            .viewport
            .geo_from_normalized(self.crosshair.x(), self.crosshair.y());
        let mut parts = vec![
            format!("z{:.1}", self.viewport.zoom),
            position.to_display_string(),
        ];
        match &self.status {
            FetchStatus::Idle => {}
            FetchStatus::Pending => parts.push("Loading…".to_string()),
            FetchStatus::Error(message) => parts.push(format!("Error: {}", message)),
        }
        if self.layers.is_toggle_capable() {
            parts.push(format!(
                "layers: {}/{}",
                self.layers.enabled_count(),
                self.layers.toggles().len()
            ));
        }
        if let Ok(selection) = self.layers.effective_layer_list() {
            let requested = selection.styles.split(',').any(|s| !s.is_empty());
            parts.push(format!(
                "style: {}",
                if requested { selection.styles.as_str() } else { "default" }
            ));
        }
        if let Some(info) = self.feature_info() {
            parts.push(info.lines().collect::<Vec<_>>().join(" "));
        }
        parts.join(" | ")
    }

    fn move_camera(&mut self, op: impl FnOnce(&mut Viewport)) {
        op(&mut self.viewport);
        self.crosshair.reset();
        self.clear_feature_info();
        self.recomposite();
        self.refresh();
    }

    fn clear_feature_info(&mut self) {
        self.show_feature_info = false;
        self.feature_info = None;
        self.pipeline.invalidate_feature_info();
    }

    fn start_map_fetch(&mut self) -> Result<u64> {
        let selection = self.layers.effective_layer_list()?;
        let (width, height) = self.image_size;
        let request = MapRequest::new(selection, self.viewport.bbox(), width, height);
        self.pipeline.request_map(request)
    }

    fn finish_map_fetch(&mut self, result: Result<Vec<u8>>) {
        match result.and_then(decode) {
            Ok(image) => {
                self.base = Some(image);
                self.status = FetchStatus::Idle;
                self.previous_frame = None;
                self.recomposite();

                if !self.legend.requested {
                    self.legend.requested = true;
                    let request =
                        LegendRequest::new(self.layers.resource(), self.layers.legend_style());
                    if let Err(e) = self.pipeline.request_legend(request) {
                        log::warn!("legend not requested: {}", e);
                    }
                }
            }
            Err(e) => {
                // Whatever was on screen stays there
                log::warn!("map fetch failed: {}", e);
                self.status = FetchStatus::Error(e.to_string());
                self.restore_previous_frame();
            }
        }
    }

    fn query_feature(&mut self) {
        let result = self.layers.effective_layer_list().and_then(|selection| {
            let (width, height) = self.image_size;
            let (x, y) = self.crosshair.pixel(width, height);
            let map = MapRequest::new(selection, self.viewport.bbox(), width, height);
            self.pipeline
                .request_feature_info(FeatureInfoRequest::new(map, x, y))
        });
        if let Err(e) = result {
            self.status = FetchStatus::Error(e.to_string());
        }
    }

    fn open_layer_panel(&mut self) {
        if !self.layers.is_toggle_capable() {
            log::debug!("layer panel unavailable for {}", self.layers.resource());
            return;
        }
        if matches!(self.mode, PreviewMode::Viewing) {
            self.mode = PreviewMode::LayerPanelOpen {
                cursor: 0,
                snapshot: self.layers.toggles().to_vec(),
            };
        }
    }

    fn close_layer_panel(&mut self) {
        let mode = std::mem::replace(&mut self.mode, PreviewMode::Viewing);
        if let PreviewMode::LayerPanelOpen { snapshot, .. } = mode {
            self.layers.restore_toggles(snapshot);
        }
    }

    fn move_panel_cursor(&mut self, delta: isize) {
        let count = self.layers.toggles().len();
        if let PreviewMode::LayerPanelOpen { cursor, .. } = &mut self.mode {
            let next = (*cursor as isize + delta).clamp(0, count.saturating_sub(1) as isize);
            *cursor = next as usize;
        }
    }

    fn panel_edit(&mut self, edit: impl FnOnce(&mut LayerGroupController, usize) -> Result<()>) {
        if let PreviewMode::LayerPanelOpen { cursor, .. } = self.mode {
            if let Err(e) = edit(&mut self.layers, cursor) {
                log::warn!("layer panel: {}", e);
            }
        }
    }

    /// Puts the frame held during a fetch back on screen
    fn restore_previous_frame(&mut self) {
        if let Some(frame) = self.previous_frame.take() {
            self.frame = Some(frame);
        }
    }

    /// Re-draws overlays onto the base image. While a fetch is pending the
    /// held previous frame is what gets updated.
    fn recomposite(&mut self) {
        let Some(base) = self.base.as_ref() else {
            return;
        };
        let input = CompositeInput {
            base,
            crosshair: self.crosshair,
            show_overlay: self.show_overlay,
            show_legend: self.show_legend,
            legend: self.legend.image.as_ref(),
            show_feature_info: self.show_feature_info,
        };
        let frame = self.compositor.compose(&input);
        if self.is_loading() {
            self.previous_frame = Some(frame);
        } else {
            self.frame = Some(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounds::GeoBounds;
    use crate::core::config::ServiceConfig;
    use crate::core::metadata::{GroupMetadata, SublayerMetadata};
    use crate::layers::group::{GroupMode, StyleDirection};
    use crate::MapError;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 80, 160, 255])))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn group_metadata(sublayers: &[&str]) -> LayerMetadata {
        LayerMetadata {
            name: "basemap".to_string(),
            workspace: Some("topp".to_string()),
            bounds: GeoBounds::new(-10.0, 35.0, 30.0, 60.0),
            styles: Vec::new(),
            group: Some(GroupMetadata {
                mode: GroupMode::Named,
                sublayers: sublayers
                    .iter()
                    .map(|name| SublayerMetadata {
                        name: name.to_string(),
                        default_style: String::new(),
                        styles: vec!["a".to_string(), "b".to_string()],
                    })
                    .collect(),
            }),
        }
    }

    fn controller(metadata: &LayerMetadata) -> PreviewController {
        // Unroutable; these tests never wait for the network
        let config = PreviewConfig {
            service: ServiceConfig::new("http://127.0.0.1:9"),
            ..PreviewConfig::default()
        };
        PreviewController::new(metadata, config)
    }

    #[test]
    fn test_disabling_only_sublayer_blocks_fetch() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.handle_action(Action::OpenLayerPanel);
        preview.handle_action(Action::PanelToggle);
        preview.handle_action(Action::PanelApply);

        assert_eq!(*preview.mode(), PreviewMode::Viewing);
        match preview.status() {
            FetchStatus::Error(message) => {
                assert!(message.to_lowercase().contains("no layers enabled"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(preview.pipeline().in_flight(), 0);
    }

    #[test]
    fn test_panel_cancel_restores_toggles() {
        let mut preview = controller(&group_metadata(&["roads", "water"]));
        preview.handle_action(Action::OpenLayerPanel);
        preview.handle_action(Action::PanelDown);
        preview.handle_action(Action::PanelToggle);
        preview.handle_action(Action::PanelCycleStyle(StyleDirection::Next));
        assert!(!preview.layers().toggles()[1].enabled);
        assert_eq!(preview.layers().toggles()[1].current_style(), "a");

        preview.handle_action(Action::PanelCancel);
        assert_eq!(*preview.mode(), PreviewMode::Viewing);
        assert!(preview.layers().toggles()[1].enabled);
        assert_eq!(preview.layers().toggles()[1].current_style(), "");
        assert_eq!(preview.pipeline().in_flight(), 0);
    }

    #[test]
    fn test_panel_only_for_toggle_capable_groups() {
        let plain = LayerMetadata::layer("topp:states", GeoBounds::world(), Vec::new());
        let mut preview = controller(&plain);
        preview.handle_action(Action::OpenLayerPanel);
        assert_eq!(*preview.mode(), PreviewMode::Viewing);

        let mut container = group_metadata(&["a"]);
        if let Some(group) = container.group.as_mut() {
            group.mode = GroupMode::Container;
        }
        let mut preview = controller(&container);
        preview.handle_action(Action::OpenLayerPanel);
        assert_eq!(*preview.mode(), PreviewMode::Viewing);
    }

    #[test]
    fn test_crosshair_moves_without_fetching() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.handle_action(Action::MoveCrosshair { dx: 2, dy: -1 });
        assert!((preview.crosshair().x() - 0.54).abs() < 1e-9);
        assert!((preview.crosshair().y() - 0.48).abs() < 1e-9);
        assert_eq!(preview.pipeline().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_map_completion_composites_and_requests_legend_once() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.refresh();
        assert!(preview.is_loading());
        assert!(preview.displayed_frame().is_none());

        assert!(preview.apply_event(FetchEvent::Map {
            sequence: 1,
            result: Ok(png(64, 32)),
        }));
        assert_eq!(*preview.status(), FetchStatus::Idle);
        let frame = preview.displayed_frame().unwrap().clone();
        assert_eq!((frame.width, frame.height), (64, 32));
        // map + legend
        assert_eq!(preview.pipeline().in_flight(), 2);

        preview.refresh();
        assert!(preview.apply_event(FetchEvent::Map {
            sequence: 2,
            result: Ok(png(64, 32)),
        }));
        // No second legend request
        assert_eq!(preview.pipeline().in_flight(), 3);
    }

    #[tokio::test]
    async fn test_stale_map_response_is_discarded() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.refresh();
        preview.handle_action(Action::PanLeft);

        assert!(!preview.apply_event(FetchEvent::Map {
            sequence: 1,
            result: Ok(png(16, 16)),
        }));
        assert!(preview.base_image().is_none());
        assert!(preview.is_loading());
    }

    #[tokio::test]
    async fn test_error_keeps_previous_frame() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.refresh();
        preview.apply_event(FetchEvent::Map {
            sequence: 1,
            result: Ok(png(32, 32)),
        });
        let shown = preview.displayed_frame().cloned();

        preview.handle_action(Action::ZoomIn);
        preview.apply_event(FetchEvent::Map {
            sequence: 2,
            result: Err(MapError::HttpStatus {
                status: 500,
                body: "boom".to_string(),
            }),
        });

        match preview.status() {
            FetchStatus::Error(message) => {
                assert!(message.contains("500") && message.contains("boom"))
            }
            other => panic!("expected error, got {:?}", other),
        }
        assert_eq!(preview.displayed_frame().cloned(), shown);
    }

    #[tokio::test]
    async fn test_camera_move_resets_crosshair_and_hides_feature_info() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.handle_action(Action::MoveCrosshair { dx: 3, dy: 3 });
        preview.handle_action(Action::QueryFeature);
        assert!(preview.apply_event(FetchEvent::FeatureInfo {
            sequence: 2,
            result: Ok("name = roads".to_string()),
        }));
        assert_eq!(preview.feature_info(), Some("name = roads"));
        assert!(preview.status_text().contains("name = roads"));

        preview.handle_action(Action::PanRight);
        assert_eq!(preview.crosshair(), Crosshair::centered());
        assert_eq!(preview.feature_info(), None);
    }

    #[tokio::test]
    async fn test_emptied_selection_makes_in_flight_map_stale() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.refresh();
        assert!(preview.is_loading());

        preview.handle_action(Action::OpenLayerPanel);
        preview.handle_action(Action::PanelToggle);
        preview.handle_action(Action::PanelApply);
        assert!(matches!(preview.status(), FetchStatus::Error(_)));

        // The answer to the request made before the layer was disabled
        assert!(!preview.apply_event(FetchEvent::Map {
            sequence: 1,
            result: Ok(png(8, 8)),
        }));
        assert!(preview.base_image().is_none());
        assert!(matches!(preview.status(), FetchStatus::Error(_)));
    }

    #[test]
    fn test_style_keys_leave_named_group_requests_alone() {
        let mut metadata = group_metadata(&["roads"]);
        metadata.styles = vec!["dark".to_string()];
        let mut preview = controller(&metadata);

        preview.handle_action(Action::CycleStyle(StyleDirection::Next));
        assert_eq!(preview.pipeline().in_flight(), 0);
        assert_eq!(*preview.status(), FetchStatus::Idle);
        let status = preview.status_text();
        assert!(status.contains("style: default"), "{}", status);
        assert!(!status.contains("dark"), "{}", status);
        assert!(status.contains("layers: 1/1"), "{}", status);

        // Sublayer styles are what the status line reports
        preview.handle_action(Action::OpenLayerPanel);
        preview.handle_action(Action::PanelCycleStyle(StyleDirection::Next));
        preview.handle_action(Action::PanelCancel);
        assert!(preview.status_text().contains("style: default"));
    }

    #[test]
    fn test_plain_layer_status_shows_requested_style() {
        let plain = LayerMetadata::layer(
            "topp:states",
            GeoBounds::world(),
            vec!["population".to_string()],
        );
        let mut preview = controller(&plain);
        assert!(preview.status_text().contains("style: default"));
        // Cycling refetches; outside a runtime that fails without panicking
        preview.handle_action(Action::CycleStyle(StyleDirection::Next));
        assert_eq!(preview.layers().resource_style(), "population");
        assert!(preview.status_text().contains("style: population"));
    }

    #[tokio::test]
    async fn test_previous_frame_is_shown_while_pending() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.refresh();
        assert!(preview.previous_frame().is_none());
        preview.apply_event(FetchEvent::Map {
            sequence: 1,
            result: Ok(png(32, 32)),
        });
        let first = preview.displayed_frame().cloned().unwrap();
        assert!(preview.previous_frame().is_none());

        preview.refresh();
        assert!(preview.is_loading());
        assert_eq!(preview.previous_frame(), Some(&first));
        assert_eq!(preview.displayed_frame(), Some(&first));

        // Overlay edits while loading update the held frame
        preview.handle_action(Action::ToggleOverlay);
        let held = preview.previous_frame().cloned().unwrap();
        assert_ne!(held, first);
        assert_eq!(preview.displayed_frame(), Some(&held));

        preview.apply_event(FetchEvent::Map {
            sequence: 2,
            result: Ok(png(48, 24)),
        });
        assert!(preview.previous_frame().is_none());
        let shown = preview.displayed_frame().unwrap();
        assert_eq!((shown.width, shown.height), (48, 24));
    }

    #[tokio::test]
    async fn test_decode_error_restores_held_frame() {
        let mut preview = controller(&group_metadata(&["roads"]));
        preview.refresh();
        preview.apply_event(FetchEvent::Map {
            sequence: 1,
            result: Ok(png(32, 32)),
        });
        let first = preview.displayed_frame().cloned();

        preview.refresh();
        preview.apply_event(FetchEvent::Map {
            sequence: 2,
            result: Ok(b"not an image".to_vec()),
        });
        assert!(matches!(preview.status(), FetchStatus::Error(_)));
        assert!(preview.previous_frame().is_none());
        assert_eq!(preview.displayed_frame().cloned(), first);
    }

    #[test]
    fn test_refresh_without_runtime_is_a_visible_error() {
        let plain = LayerMetadata::layer("topp:states", GeoBounds::world(), Vec::new());
        let mut preview = controller(&plain);
        preview.refresh();
        match preview.status() {
            FetchStatus::Error(message) => assert!(message.contains("runtime"), "{}", message),
            other => panic!("expected error, got {:?}", other),
        }
        assert_eq!(preview.pipeline().in_flight(), 0);
    }

    #[test]
    fn test_resize_changes_requested_size() {
        let mut preview = controller(&group_metadata(&[]));
        preview.set_display_cells(40, 10);
        assert_eq!(preview.image_size(), (320, 160));
    }
}
