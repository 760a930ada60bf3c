//! One-shot detection of what the terminal can display

use crate::core::config::RenderConfig;
use crate::prelude::HashMap;
use std::path::{Path, PathBuf};

/// Escape-sequence image protocol spoken natively by the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeProtocol {
    Kitty,
    Iterm,
}

impl NativeProtocol {
    /// Value for the general converter's `--format` flag
    pub fn converter_format(&self) -> &'static str {
        match self {
            NativeProtocol::Kitty => "kitty",
            NativeProtocol::Iterm => "iterm",
        }
    }
}

/// Snapshot of the process environment relevant to detection
#[derive(Debug, Clone, Default)]
pub struct TerminalEnv {
    vars: HashMap<String, String>,
    path: Vec<PathBuf>,
}

impl TerminalEnv {
    pub fn from_process() -> Self {
        let vars = ["TERM", "TERM_PROGRAM", "KITTY_WINDOW_ID", "ITERM_SESSION_ID", "LC_TERMINAL"]
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();
        let path = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self { vars, path }
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.path = dirs;
        self
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Full path of `binary` in the first PATH directory that has it
    pub fn find_binary(&self, binary: &str) -> Option<PathBuf> {
        let candidate = Path::new(binary);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        self.path
            .iter()
            .map(|dir| dir.join(binary))
            .find(|full| is_executable(full))
    }

    pub fn native_protocol(&self) -> Option<NativeProtocol> {
        if self.var("KITTY_WINDOW_ID").is_some()
            || self.var("TERM").is_some_and(|t| t.contains("kitty"))
        {
            return Some(NativeProtocol::Kitty);
        }
        match self.var("TERM_PROGRAM") {
            Some("kitty") | Some("ghostty") | Some("WezTerm") => Some(NativeProtocol::Kitty),
            Some("iTerm.app") => Some(NativeProtocol::Iterm),
            _ if self.var("LC_TERMINAL") == Some("iTerm2") => Some(NativeProtocol::Iterm),
            _ => None,
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// What each rendering tier needs, detected once at startup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Native protocol; requires the general converter to emit it
    pub native: Option<NativeProtocol>,
    /// Sixel converter found on PATH
    pub sixel: bool,
    /// General converter found on PATH
    pub general: bool,
}

impl Capabilities {
    pub fn detect(config: &RenderConfig) -> Self {
        Self::detect_in(&TerminalEnv::from_process(), config)
    }

    pub fn detect_in(env: &TerminalEnv, config: &RenderConfig) -> Self {
        let general = env.find_binary(&config.general_binary).is_some();
        let sixel = env.find_binary(&config.sixel_binary).is_some();
        let native = env.native_protocol().filter(|_| general);

        let caps = Self {
            native,
            sixel,
            general,
        };
        log::info!("terminal capabilities: {:?}", caps);
        caps
    }

    /// Nothing but the built-in ASCII renderer
    pub fn ascii_only() -> Self {
        Self::default()
    }
}
