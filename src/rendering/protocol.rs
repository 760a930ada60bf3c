use super::capabilities::Capabilities;
use super::renderers::{
    AsciiRenderer, GeneralRenderer, NativeRenderer, Renderer, RendererKind, SixelRenderer,
};
use crate::core::config::{RenderConfig, RendererChoice};
use crate::{MapError, Result};

/// Renders composites through an ordered chain of backends.
///
/// The chain is fixed at construction from the detected capabilities:
/// native, then Sixel, then the general converter, then ASCII. A backend
/// whose capability is missing is left out; a backend that fails at render
/// time falls through to the next one.
pub struct ProtocolAdapter {
    chain: Vec<Box<dyn Renderer>>,
}

impl ProtocolAdapter {
    pub fn new(capabilities: &Capabilities, config: &RenderConfig) -> Self {
        let mut chain: Vec<Box<dyn Renderer>> = Vec::new();
        let timeout = config.subprocess_timeout;
        let choice = config.renderer;
        let wants = |tier: RendererChoice| choice == RendererChoice::Auto || choice == tier;

        if let Some(protocol) = capabilities.native.filter(|_| wants(RendererChoice::Native)) {
            chain.push(Box::new(NativeRenderer::new(
                protocol,
                &config.general_binary,
                timeout,
            )));
        }
        if capabilities.sixel && wants(RendererChoice::Sixel) {
            chain.push(Box::new(SixelRenderer::new(&config.sixel_binary, timeout)));
        }
        if capabilities.general && wants(RendererChoice::General) {
            chain.push(Box::new(GeneralRenderer::new(&config.general_binary, timeout)));
        }
        chain.push(Box::new(AsciiRenderer::new()));

        if choice != RendererChoice::Auto && chain.len() == 1 && choice != RendererChoice::Ascii {
            log::warn!("requested renderer {:?} is not available, using ascii", choice);
        }
        Self::with_chain(chain)
    }

    /// Detects capabilities from the running process
    pub fn detect(config: &RenderConfig) -> Self {
        Self::new(&Capabilities::detect(config), config)
    }

    pub fn with_chain(chain: Vec<Box<dyn Renderer>>) -> Self {
        log::debug!(
            "renderer chain: {:?}",
            chain.iter().map(|r| r.kind()).collect::<Vec<_>>()
        );
        Self { chain }
    }

    pub fn chain_kinds(&self) -> Vec<RendererKind> {
        self.chain.iter().map(|r| r.kind()).collect()
    }

    /// Kind of the first backend that will be tried
    pub fn primary(&self) -> Option<RendererKind> {
        self.chain.first().map(|r| r.kind())
    }

    /// Tries each backend in order and returns the first success together
    /// with the backend that produced it
    pub fn render(&self, bytes: &[u8], width: u16, height: u16) -> Result<(String, RendererKind)> {
        let mut last_error = None;
        for renderer in &self.chain {
            match renderer.render(bytes, width, height) {
                Ok(output) => return Ok((output, renderer.kind())),
                Err(e) => {
                    log::warn!("{} renderer failed: {}", renderer.kind(), e);
                    last_error = Some(e);
                }
            }
        }
        let err = last_error.unwrap_or_else(|| MapError::Render("no renderers".to_string()));
        log::error!("all renderers failed: {}", err);
        Err(err)
    }
}
