use crate::layers::group::StyleDirection;
use serde::{Deserialize, Serialize};

/// Keyboard key codes, independent of the terminal backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Space,
    Tab,
    Char(char),
}

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl KeyModifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt
    }
}

/// Input events the preview reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewInput {
    KeyPress {
        key: KeyCode,
        modifiers: KeyModifiers,
    },
    /// Terminal resized to `cols` x `rows` cells
    Resize { cols: u16, rows: u16 },
}

impl PreviewInput {
    pub fn key(key: KeyCode) -> Self {
        PreviewInput::KeyPress {
            key,
            modifiers: KeyModifiers::default(),
        }
    }

    pub fn char(c: char) -> Self {
        Self::key(KeyCode::Char(c))
    }

    /// Maps the input to an action for the current mode, if it has one
    pub fn to_action(&self, panel_open: bool) -> Option<Action> {
        let (key, modifiers) = match *self {
            PreviewInput::Resize { cols, rows } => return Some(Action::Resize { cols, rows }),
            PreviewInput::KeyPress { key, modifiers } => (key, modifiers),
        };

        if modifiers.ctrl && key == KeyCode::Char('c') {
            return Some(Action::Quit);
        }

        if panel_open {
            return match key {
                KeyCode::ArrowUp | KeyCode::Char('k') => Some(Action::PanelUp),
                KeyCode::ArrowDown | KeyCode::Char('j') => Some(Action::PanelDown),
                KeyCode::Space => Some(Action::PanelToggle),
                KeyCode::ArrowLeft => Some(Action::PanelCycleStyle(StyleDirection::Previous)),
                KeyCode::ArrowRight => Some(Action::PanelCycleStyle(StyleDirection::Next)),
                KeyCode::Enter => Some(Action::PanelApply),
                KeyCode::Escape | KeyCode::Char('q') | KeyCode::Char('L') => {
                    Some(Action::PanelCancel)
                }
                _ => None,
            };
        }

        // Modified arrows steer the crosshair instead of the camera
        if modifiers.any() {
            if let Some(action) = crosshair_for_arrow(key) {
                return Some(action);
            }
        }

        match key {
            KeyCode::ArrowUp => Some(Action::PanUp),
            KeyCode::ArrowDown => Some(Action::PanDown),
            KeyCode::ArrowLeft => Some(Action::PanLeft),
            KeyCode::ArrowRight => Some(Action::PanRight),
            KeyCode::Char('h') => Some(Action::MoveCrosshair { dx: -1, dy: 0 }),
            KeyCode::Char('j') => Some(Action::MoveCrosshair { dx: 0, dy: 1 }),
            KeyCode::Char('k') => Some(Action::MoveCrosshair { dx: 0, dy: -1 }),
            KeyCode::Char('l') => Some(Action::MoveCrosshair { dx: 1, dy: 0 }),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::ZoomIn),
            KeyCode::Char('-') | KeyCode::Char('_') => Some(Action::ZoomOut),
            KeyCode::Enter => Some(Action::QueryFeature),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('o') => Some(Action::ToggleOverlay),
            KeyCode::Char('g') => Some(Action::ToggleLegend),
            KeyCode::Char('i') => Some(Action::ToggleFeatureInfo),
            KeyCode::Char('[') => Some(Action::CycleStyle(StyleDirection::Previous)),
            KeyCode::Char(']') => Some(Action::CycleStyle(StyleDirection::Next)),
            KeyCode::Char('L') => Some(Action::OpenLayerPanel),
            KeyCode::Char('q') | KeyCode::Escape => Some(Action::Quit),
            _ => None,
        }
    }
}

fn crosshair_for_arrow(key: KeyCode) -> Option<Action> {
    let (dx, dy) = match key {
        KeyCode::ArrowUp => (0, -1),
        KeyCode::ArrowDown => (0, 1),
        KeyCode::ArrowLeft => (-1, 0),
        KeyCode::ArrowRight => (1, 0),
        _ => return None,
    };
    Some(Action::MoveCrosshair { dx, dy })
}

/// Everything the controller can be asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PanUp,
    PanDown,
    PanLeft,
    PanRight,
    ZoomIn,
    ZoomOut,
    /// Moves the crosshair by whole steps; positive `dy` is down
    MoveCrosshair { dx: i32, dy: i32 },
    /// Feature query at the crosshair
    QueryFeature,
    Refresh,
    ToggleOverlay,
    ToggleLegend,
    ToggleFeatureInfo,
    /// Style of the whole resource
    CycleStyle(StyleDirection),
    OpenLayerPanel,
    PanelUp,
    PanelDown,
    PanelToggle,
    PanelCycleStyle(StyleDirection),
    PanelApply,
    PanelCancel,
    Resize { cols: u16, rows: u16 },
    Quit,
}

/// One-line key help for the current mode
pub fn help_text(panel_open: bool) -> &'static str {
    if panel_open {
        "↑/↓ select  space toggle  ←/→ style  enter apply  esc cancel"
    } else {
        "arrows pan  +/- zoom  hjkl crosshair  enter query  [/] style  L layers  o overlay  g legend  i info  r refresh  q quit"
    }
}
