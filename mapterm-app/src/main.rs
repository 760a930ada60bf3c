//! mapterm: preview a WMS layer in the terminal
//!
//! Layout:
//!   rows 0..rows-2 : map image
//!   row rows-2     : status line
//!   row rows-1     : key help

use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode as TermKey, KeyEvent, KeyEventKind, KeyModifiers as TermMods},
    style::{self, Stylize},
    terminal::{self, ClearType},
    ExecutableCommand, QueueableCommand,
};
use mapterm::input::{help_text, KeyCode, KeyModifiers};
use mapterm::prelude::*;
use mapterm::runtime::spawners::tokio_impl::TokioSpawner;

const STATUS_ROWS: u16 = 2;
const TICK: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "mapterm", about = "Preview WMS layers and layer groups in the terminal")]
struct Cli {
    /// Server root, e.g. http://localhost:8080/geoserver
    #[arg(long, env = "MAPTERM_URL", default_value = "http://localhost:8080/geoserver")]
    url: String,

    #[arg(long, env = "MAPTERM_WORKSPACE")]
    workspace: Option<String>,

    #[arg(long, env = "MAPTERM_USER")]
    user: Option<String>,

    #[arg(long, env = "MAPTERM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Layer or layer group to preview
    #[arg(long)]
    layer: String,

    /// JSON file describing the layer (bounds, styles, group composition)
    #[arg(long, env = "MAPTERM_METADATA")]
    metadata: Option<PathBuf>,

    /// Layer bounds as minx,miny,maxx,maxy when no metadata file is given
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: Option<GeoBounds>,

    /// Available styles when no metadata file is given
    #[arg(long, value_delimiter = ',')]
    styles: Vec<String>,

    /// auto, native, sixel, general or ascii
    #[arg(long, env = "MAPTERM_RENDERER", default_value = "auto")]
    renderer: RendererChoice,

    /// balanced, low or high
    #[arg(long, default_value = "balanced")]
    profile: PreviewProfile,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Converter timeout in seconds
    #[arg(long, default_value_t = 5)]
    render_timeout: u64,

    /// Write logs here; the terminal itself is the canvas
    #[arg(long, env = "MAPTERM_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_filter: String,
}

impl Cli {
    fn preview_config(&self) -> PreviewConfig {
        let service = ServiceConfig {
            workspace: self.workspace.clone(),
            username: self.user.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout),
            ..ServiceConfig::new(&self.url)
        };
        let render = RenderConfig {
            renderer: self.renderer,
            subprocess_timeout: Duration::from_secs(self.render_timeout),
            ..RenderConfig::default()
        };
        PreviewConfig {
            service,
            render,
            profile: self.profile.clone(),
        }
    }

    fn metadata_provider(&self) -> Result<StaticMetadata> {
        if let Some(path) = &self.metadata {
            return StaticMetadata::from_file(path)
                .with_context(|| format!("failed to load metadata from {}", path.display()));
        }

        let bounds = self.bbox.unwrap_or_else(|| {
            log::warn!("no --bbox given for {}, using world bounds", self.layer);
            GeoBounds::world()
        });
        let mut metadata = LayerMetadata::layer(&self.layer, bounds, self.styles.clone());
        metadata.workspace = self.workspace.clone();
        let mut provider = StaticMetadata::new();
        provider.insert(metadata);
        Ok(provider)
    }
}

fn parse_bbox(text: &str) -> std::result::Result<GeoBounds, String> {
    GeoBounds::parse(text).ok_or_else(|| format!("expected minx,miny,maxx,maxy, got '{}'", text))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        mapterm::init_file_logger(path, &cli.log_filter)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    // Fetch tasks are spawned from the synchronous event loop below
    mapterm::runtime::init_runtime(Box::new(TokioSpawner::on(runtime.handle().clone())));

    let provider = cli.metadata_provider()?;
    let metadata = runtime
        .block_on(provider.layer_metadata(&cli.layer))
        .with_context(|| {
            format!(
                "no metadata for layer {} (known: {})",
                cli.layer,
                provider.layer_names().join(", ")
            )
        })?;
    log::info!(
        "previewing {} bounds={}",
        metadata.qualified_name(),
        metadata.bounds.to_bbox_param()
    );

    let config = cli.preview_config();
    let adapter = ProtocolAdapter::detect(&config.render);
    if let Some(kind) = adapter.primary() {
        log::info!("rendering with {} backend", kind);
    }
    let mut controller = PreviewController::new(&metadata, config);

    let mut guard = RawGuard::enter().context("failed to set up terminal")?;
    let result = run(&mut controller, &adapter);
    guard.cleanup();
    result
}

/// Restores the terminal however the loop exits
struct RawGuard {
    cleaned: bool,
}

impl RawGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        stdout().execute(terminal::EnterAlternateScreen)?;
        stdout().execute(cursor::Hide)?;
        Ok(Self { cleaned: false })
    }

    fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let mut out = stdout();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Last terminal rendering, reused while the composite is unchanged
#[derive(Default)]
struct Screen {
    frame: Option<CompositeFrame>,
    cells: (u16, u16),
    output: Option<std::result::Result<(String, RendererKind), String>>,
}

impl Screen {
    fn render(
        &mut self,
        adapter: &ProtocolAdapter,
        frame: &CompositeFrame,
        cells: (u16, u16),
    ) -> &std::result::Result<(String, RendererKind), String> {
        let stale = self.frame.as_ref() != Some(frame) || self.cells != cells;
        if stale || self.output.is_none() {
            let rendered = adapter
                .render(&frame.bytes, cells.0, cells.1)
                .map_err(|e| e.to_string());
            self.frame = Some(frame.clone());
            self.cells = cells;
            self.output = Some(rendered);
        }
        self.output.get_or_insert_with(|| Err("nothing rendered".to_string()))
    }
}

fn run(controller: &mut PreviewController, adapter: &ProtocolAdapter) -> Result<()> {
    let (cols, rows) = terminal::size()?;
    controller.set_display_cells(cols, rows.saturating_sub(STATUS_ROWS));
    controller.refresh();

    let mut screen = Screen::default();
    let mut dirty = true;
    while !controller.should_quit() {
        if dirty {
            draw(controller, adapter, &mut screen)?;
            dirty = false;
        }

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(input) = translate_key(key) {
                        controller.handle_input(input);
                        dirty = true;
                    }
                }
                Event::Resize(cols, rows) => {
                    controller.handle_input(PreviewInput::Resize {
                        cols,
                        rows: rows.saturating_sub(STATUS_ROWS),
                    });
                    dirty = true;
                }
                _ => {}
            }
        }

        if controller.poll() {
            dirty = true;
        }
    }
    Ok(())
}

fn translate_key(key: KeyEvent) -> Option<PreviewInput> {
    let code = match key.code {
        TermKey::Up => KeyCode::ArrowUp,
        TermKey::Down => KeyCode::ArrowDown,
        TermKey::Left => KeyCode::ArrowLeft,
        TermKey::Right => KeyCode::ArrowRight,
        TermKey::Enter => KeyCode::Enter,
        TermKey::Esc => KeyCode::Escape,
        TermKey::Tab => KeyCode::Tab,
        TermKey::Char(' ') => KeyCode::Space,
        TermKey::Char(c) => KeyCode::Char(c),
        _ => return None,
    };
    Some(PreviewInput::KeyPress {
        key: code,
        modifiers: KeyModifiers {
            shift: key.modifiers.contains(TermMods::SHIFT),
            ctrl: key.modifiers.contains(TermMods::CONTROL),
            alt: key.modifiers.contains(TermMods::ALT),
        },
    })
}

fn draw(
    controller: &PreviewController,
    adapter: &ProtocolAdapter,
    screen: &mut Screen,
) -> io::Result<()> {
    let mut out = stdout();
    let (cols, rows) = terminal::size()?;
    let cells = controller.display_cells();
    out.queue(terminal::Clear(ClearType::All))?;
    out.queue(cursor::MoveTo(0, 0))?;

    match controller.displayed_frame() {
        Some(frame) => match screen.render(adapter, frame, cells) {
            Ok((output, kind)) => match kind {
                // Escape-sequence protocols are written as one blob
                RendererKind::Native | RendererKind::SixelSubprocess => {
                    out.queue(style::Print(output))?;
                }
                RendererKind::GeneralSubprocess | RendererKind::Ascii => {
                    for (row, line) in output.lines().take(cells.1 as usize).enumerate() {
                        out.queue(cursor::MoveTo(0, row as u16))?;
                        out.queue(style::Print(line))?;
                    }
                }
            },
            Err(message) => {
                out.queue(style::Print(format!("Render failed: {}", message).red()))?;
            }
        },
        None => {
            let placeholder = match controller.status() {
                FetchStatus::Error(message) => format!("Error: {}", message),
                _ => "Loading…".to_string(),
            };
            let row = cells.1 / 2;
            let col = cols.saturating_sub(placeholder.chars().count() as u16) / 2;
            out.queue(cursor::MoveTo(col, row))?;
            out.queue(style::Print(placeholder))?;
        }
    }

    let panel_open = if let PreviewMode::LayerPanelOpen { cursor: selected, .. } = controller.mode() {
        draw_layer_panel(&mut out, controller, *selected)?;
        true
    } else {
        false
    };

    let status = truncate(&controller.status_text(), cols);
    out.queue(cursor::MoveTo(0, rows.saturating_sub(2)))?;
    out.queue(terminal::Clear(ClearType::CurrentLine))?;
    let status = match controller.status() {
        FetchStatus::Error(_) => status.red(),
        FetchStatus::Pending => status.yellow(),
        FetchStatus::Idle => status.reset(),
    };
    out.queue(style::Print(status))?;

    out.queue(cursor::MoveTo(0, rows.saturating_sub(1)))?;
    out.queue(terminal::Clear(ClearType::CurrentLine))?;
    out.queue(style::Print(truncate(help_text(panel_open), cols).dark_grey()))?;
    out.flush()
}

fn draw_layer_panel(
    out: &mut io::Stdout,
    controller: &PreviewController,
    selected: usize,
) -> io::Result<()> {
    let layers = controller.layers();
    out.queue(cursor::MoveTo(1, 1))?;
    out.queue(style::Print(format!(" Layers of {} ", layers.resource()).black().on_white()))?;
    for (i, toggle) in layers.toggles().iter().enumerate() {
        let style_name = match toggle.current_style() {
            "" => "default",
            name => name,
        };
        let line = format!(
            "{} [{}] {}  ({})",
            if i == selected { '>' } else { ' ' },
            if toggle.enabled { 'x' } else { ' ' },
            toggle.name,
            style_name
        );
        out.queue(cursor::MoveTo(1, 2 + i as u16))?;
        if i == selected {
            out.queue(style::Print(line.reverse()))?;
        } else {
            out.queue(style::Print(line.on_black()))?;
        }
    }
    Ok(())
}

fn truncate(text: &str, cols: u16) -> String {
    text.chars().take(cols as usize).collect()
}
