//! Tabstack Driver
//!
//! Headless host for the tabstack engine.
//!
//! Responsibilities:
//! - Load configuration and set up logging
//! - Read JSON-lines commands from stdin or a script file
//! - Drive the switcher: touches, tab changes, visibility, container size
//! - Tick running animations on a 16ms timer (live) or a virtual clock (script)
//! - Save and restore the switcher state

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tabstack_core::{SwitcherSnapshot, TabId, TabSpec, TabSwitcher, TouchEvent};
use tabstack_protocol::{encode_response, parse_command, Command, PlacementInfo, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Events that the driver event loop processes.
enum DriverEvent {
    /// A command read from stdin.
    Command(Command),
    /// A line that could not be parsed.
    Invalid(String),
    /// Animation tick (16ms intervals during animation).
    AnimationTick,
    /// Stdin was closed.
    InputClosed,
    /// Shutdown signal.
    Shutdown,
}

/// Animation tick interval in milliseconds (~60 FPS).
const ANIMATION_TICK_MS: u64 = 16;

/// Name of the default state file inside the data directory.
const STATE_FILE_NAME: &str = "switcher-state.json";

#[derive(Parser)]
#[command(name = "tabstack")]
#[command(author, version, about = "Headless driver for the tabstack card-stack tab switcher")]
struct Args {
    /// Configuration file, instead of the standard locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a script of commands on a virtual clock, then exit
    #[arg(long)]
    script: Option<PathBuf>,

    /// State file used by save and restore
    #[arg(long)]
    state: Option<PathBuf>,
}

/// Where the driver's time comes from.
enum Clock {
    /// Wall clock since startup.
    Live(Instant),
    /// Advanced only by `advance` commands and touch timestamps.
    Virtual(u64),
}

/// Persisted driver state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    /// Timestamp when state was saved.
    saved_at: String,
    /// Container size at save time.
    width: f32,
    height: f32,
    snapshot: SwitcherSnapshot,
}

/// Driver state.
struct AppState {
    switcher: TabSwitcher,
    /// User configuration.
    config: Config,
    clock: Clock,
    /// Explicitly configured state file.
    state_file: Option<PathBuf>,
    width: f32,
    height: f32,
}

impl AppState {
    /// Create new state with config.
    fn new_with_config(config: Config, clock: Clock, state_file: Option<PathBuf>) -> Result<Self> {
        let mut switcher = TabSwitcher::with_pool(config.switcher_config())
            .context("Invalid switcher configuration")?;
        let (width, height) = (config.layout.width, config.layout.height);
        switcher.on_layout(width, height);
        switcher.set_add_button_shown(config.behavior.show_add_button);
        let state_file = state_file.or_else(|| config.behavior.state_file.clone());
        Ok(Self {
            switcher,
            config,
            clock,
            state_file,
            width,
            height,
        })
    }

    fn now_ms(&self) -> u64 {
        match &self.clock {
            Clock::Live(started) => started.elapsed().as_millis() as u64,
            Clock::Virtual(now) => *now,
        }
    }

    fn is_animating(&self) -> bool {
        self.switcher.is_animating()
    }

    /// Advance animations by one tick. Returns whether anything is still running.
    fn tick_animations(&mut self, delta_ms: u64) -> bool {
        self.switcher.tick(delta_ms);
        self.is_animating()
    }

    /// Move the virtual clock forward in animation ticks.
    fn advance(&mut self, ms: u64) {
        let mut remaining = ms;
        while remaining > 0 {
            let step = remaining.min(ANIMATION_TICK_MS);
            self.switcher.tick(step);
            remaining -= step;
        }
        if let Clock::Virtual(now) = &mut self.clock {
            *now += ms;
        }
    }

    fn frame(&self) -> Response {
        Response::Frame {
            time_ms: self.now_ms(),
            shown: self.switcher.is_shown(),
            animating: self.is_animating(),
            placements: self
                .switcher
                .placements()
                .iter()
                .map(PlacementInfo::from)
                .collect(),
        }
    }

    /// Handle a command, turning failures into error responses.
    fn handle_command(&mut self, cmd: Command) -> Response {
        match self.execute(cmd) {
            Ok(response) => response,
            Err(e) => {
                warn!("Command failed: {:#}", e);
                Response::error(format!("{:#}", e))
            }
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Response> {
        match cmd {
            Command::Touch {
                action,
                x,
                y,
                time_ms,
                pointer_id,
            } => {
                let time_ms = match time_ms {
                    Some(time_ms) => {
                        let now = self.now_ms();
                        if matches!(self.clock, Clock::Virtual(_)) && time_ms > now {
                            self.advance(time_ms - now);
                        }
                        time_ms
                    }
                    None => self.now_ms(),
                };
                let event = TouchEvent::new(pointer_id, action, x, y, time_ms);
                let consumed = self.switcher.on_touch(&event);
                debug!("Touch {:?} at ({}, {}) consumed: {}", action, x, y, consumed);
                Ok(Response::Ok)
            }
            Command::AddTab {
                title,
                icon,
                closeable,
                index,
                style,
                parameters,
            } => {
                let mut spec = TabSpec::new(title).closeable(closeable);
                spec.icon = icon;
                spec.parameters = parameters;
                let id = self.switcher.add_tab(spec, index, style)?;
                Ok(Response::TabAdded { id: id.0 })
            }
            Command::RemoveTab { id, style } => {
                self.switcher.remove_tab(TabId(id), style)?;
                Ok(Response::Ok)
            }
            Command::SelectTab { id } => {
                self.switcher.select_tab(TabId(id))?;
                Ok(Response::Ok)
            }
            Command::Clear => {
                self.switcher.clear();
                Ok(Response::Ok)
            }
            Command::ShowSwitcher => {
                self.switcher.show_switcher();
                Ok(Response::Ok)
            }
            Command::HideSwitcher => {
                self.switcher.hide_switcher();
                Ok(Response::Ok)
            }
            Command::ToggleSwitcher => {
                self.switcher.toggle_switcher();
                Ok(Response::Ok)
            }
            Command::ShowAddButton { shown } => {
                self.switcher.set_add_button_shown(shown);
                Ok(Response::Ok)
            }
            Command::Resize { width, height } => {
                if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
                    anyhow::bail!("Invalid container size {}x{}", width, height);
                }
                self.width = width;
                self.height = height;
                self.switcher.on_layout(width, height);
                Ok(Response::Ok)
            }
            Command::Advance { ms } => {
                if !matches!(self.clock, Clock::Virtual(_)) {
                    anyhow::bail!("advance is only available in script mode");
                }
                self.advance(ms);
                Ok(self.frame())
            }
            Command::Query => Ok(self.frame()),
            Command::Events => Ok(Response::Events {
                events: self.switcher.drain_events(),
            }),
            Command::Save => {
                self.save_state()?;
                Ok(Response::Ok)
            }
            Command::Restore => {
                self.restore_state()?;
                Ok(Response::Ok)
            }
            Command::Stop => Ok(Response::Ok),
        }
    }

    /// Get the path for the state file.
    fn state_file_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "tabstack")
                .map(|dirs| dirs.data_dir().join(STATE_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(STATE_FILE_NAME))
        })
    }

    /// Save the switcher state to disk.
    fn save_state(&self) -> Result<()> {
        let saved_at = {
            let now = std::time::SystemTime::now();
            match now.duration_since(std::time::UNIX_EPOCH) {
                Ok(d) => format!("{}", d.as_secs()),
                Err(_) => "0".to_string(),
            }
        };
        let state = StateFile {
            saved_at,
            width: self.width,
            height: self.height,
            snapshot: self.switcher.save_state(),
        };

        let state_path = self.state_file_path();
        if let Some(parent) = state_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(&state_path, json)
            .with_context(|| format!("Failed to write state file: {}", state_path.display()))?;
        info!("Switcher state saved to {:?}", state_path);
        Ok(())
    }

    /// Replace the switcher state with the saved one.
    fn restore_state(&mut self) -> Result<()> {
        let state_path = self.state_file_path();
        let state = load_state(&state_path)?;
        if state.width > 0.0 && state.height > 0.0 {
            self.width = state.width;
            self.height = state.height;
            self.switcher.on_layout(state.width, state.height);
        }
        self.switcher
            .restore_state(state.snapshot)
            .with_context(|| format!("Failed to restore {}", state_path.display()))?;
        info!(
            "Restored {} tab(s) saved at {}",
            self.switcher.model().tab_count(),
            state.saved_at
        );
        Ok(())
    }
}

/// Load saved state from disk.
fn load_state(path: &Path) -> Result<StateFile> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))
}

/// Map a configured level name to a tracing level.
fn log_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // default fallback for invalid values
    }
}

/// Replay a script. Every command gets one response line.
fn run_script(state: &mut AppState, script: &str, out: &mut impl Write) -> Result<()> {
    for (number, line) in script.lines().enumerate() {
        let response = match parse_command(line) {
            None => continue,
            Some(Ok(cmd)) => {
                let stop = matches!(cmd, Command::Stop);
                let response = state.handle_command(cmd);
                out.write_all(encode_response(&response)?.as_bytes())?;
                if stop {
                    info!("Script stopped at line {}", number + 1);
                    break;
                }
                continue;
            }
            Some(Err(e)) => Response::error(format!("line {}: {}", number + 1, e)),
        };
        out.write_all(encode_response(&response)?.as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Read commands from stdin and forward them to the event loop.
async fn read_commands(event_tx: mpsc::Sender<DriverEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                None => continue,
                Some(Ok(cmd)) => DriverEvent::Command(cmd),
                Some(Err(e)) => DriverEvent::Invalid(e.to_string()),
            },
            Ok(None) => DriverEvent::InputClosed,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                DriverEvent::InputClosed
            }
        };
        let closed = matches!(event, DriverEvent::InputClosed);
        if event_tx.send(event).await.is_err() || closed {
            break;
        }
    }
}

/// Start the animation timer if it is not already running.
fn start_animation_timer(
    animation_tx: mpsc::Sender<DriverEvent>,
    animation_running: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    animation_running.store(true, Ordering::SeqCst);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(ANIMATION_TICK_MS));
        loop {
            interval.tick().await;
            if !animation_running.load(Ordering::SeqCst) {
                break;
            }
            if animation_tx.send(DriverEvent::AnimationTick).await.is_err() {
                break; // Channel closed
            }
        }
    })
}

async fn run_live(mut state: AppState, autosave: bool) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel::<DriverEvent>(100);

    tokio::spawn(read_commands(event_tx.clone()));

    // Install Ctrl+C handler so terminal kill triggers graceful shutdown
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DriverEvent::Shutdown).await;
            }
        });
    }

    let mut stdout = tokio::io::stdout();
    let mut animation_timer_handle: Option<tokio::task::JoinHandle<()>> = None;
    let animation_running = Arc::new(AtomicBool::new(false));

    info!("Ready. Reading commands from stdin.");

    while let Some(event) = event_rx.recv().await {
        match event {
            DriverEvent::Command(cmd) => {
                let stop = matches!(cmd, Command::Stop);
                let response = state.handle_command(cmd);
                stdout.write_all(encode_response(&response)?.as_bytes()).await?;
                stdout.flush().await?;
                if stop {
                    info!("Stop requested");
                    break;
                }
                if state.is_animating() && !animation_running.load(Ordering::SeqCst) {
                    animation_timer_handle = Some(start_animation_timer(
                        event_tx.clone(),
                        animation_running.clone(),
                    ));
                }
            }
            DriverEvent::Invalid(message) => {
                let response = Response::error(message);
                stdout.write_all(encode_response(&response)?.as_bytes()).await?;
                stdout.flush().await?;
            }
            DriverEvent::AnimationTick => {
                let still_animating = state.tick_animations(ANIMATION_TICK_MS);

                // Stop animation timer if all animations complete
                if !still_animating {
                    animation_running.store(false, Ordering::SeqCst);
                    if let Some(handle) = animation_timer_handle.take() {
                        handle.abort();
                    }
                    debug!("All animations complete");
                }
            }
            DriverEvent::InputClosed => {
                info!("Input closed");
                break;
            }
            DriverEvent::Shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Clean up timer if running
    if let Some(handle) = animation_timer_handle {
        handle.abort();
    }

    if autosave {
        if let Err(e) = state.save_state() {
            warn!("Failed to save switcher state: {}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (needed for log level)
    let loaded = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });

    // Initialize logging with configured log level; stdout carries the protocol
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(&config.behavior.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Validate and clamp config values
    let config_warnings = config.validate();
    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("Tabstack driver starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: form_factor={:?}, container={}x{}, log_level={}",
        config.layout.form_factor, config.layout.width, config.layout.height, config.behavior.log_level
    );

    if let Some(script_path) = &args.script {
        let script = tokio::fs::read_to_string(script_path)
            .await
            .with_context(|| format!("Failed to read script: {}", script_path.display()))?;
        let mut state = AppState::new_with_config(config, Clock::Virtual(0), args.state.clone())?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        run_script(&mut state, &script, &mut out)?;
        info!("Script finished");
        return Ok(());
    }

    let autosave = args.state.is_some() || config.behavior.state_file.is_some();
    let mut state = AppState::new_with_config(config, Clock::Live(Instant::now()), args.state.clone())?;
    if autosave && state.state_file_path().exists() {
        if let Err(e) = state.restore_state() {
            warn!("Failed to restore switcher state: {:#}", e);
        }
    }
    run_live(state, autosave).await?;

    info!("Tabstack driver shutting down.");
    Ok(())
}
