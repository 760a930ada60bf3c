pub mod events;

// Re-export the essential types
pub use events::{help_text, Action, KeyCode, KeyModifiers, PreviewInput};
