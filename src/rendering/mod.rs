pub mod capabilities;
pub mod protocol;
pub mod renderers;
pub mod subprocess;

// Re-export main types
pub use capabilities::{Capabilities, NativeProtocol, TerminalEnv};
pub use protocol::ProtocolAdapter;
pub use renderers::{AsciiRenderer, Renderer, RendererKind};
