//! Configuration management for the tabstack driver.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. the platform config directory (`tabstack/config.toml`)
//! 2. `~/.config/tabstack/config.toml`
//! 3. `./tabstack.toml` (current directory, for development)
//!
//! An explicit `--config` path replaces the search.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tabstack_core::{AnimationDurations, AxisMode, FormFactor, Insets, LayoutTraits, SwitcherConfig};

/// Main configuration structure for the driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Layout configuration.
    pub layout: LayoutConfig,
    /// Gesture thresholds.
    pub gestures: GestureConfig,
    /// Animation timing.
    pub animation: AnimationConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
}

/// Layout-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Preset the layout starts from.
    pub form_factor: FormFactor,

    /// Overrides the axis mode of the preset.
    #[serde(default)]
    pub axis_mode: Option<AxisMode>,

    /// Overrides the number of individually visible stacked cards.
    #[serde(default)]
    pub stacked_tab_count: Option<usize>,

    /// Overrides the offset between stacked cards in pixels.
    #[serde(default)]
    pub stacked_tab_spacing: Option<f32>,

    /// Padding around the tab container in pixels.
    #[serde(default)]
    pub padding: f32,

    /// Height of the toolbar above the container in pixels.
    #[serde(default)]
    pub toolbar_height: f32,

    /// Initial container width in pixels.
    #[serde(default = "default_width")]
    pub width: f32,

    /// Initial container height in pixels.
    #[serde(default = "default_height")]
    pub height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            form_factor: FormFactor::default(),
            axis_mode: None,
            stacked_tab_count: None,
            stacked_tab_spacing: None,
            padding: 0.0,
            toolbar_height: 0.0,
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Gesture thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Distance in pixels before a touch becomes a drag.
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: f32,

    /// Minimum velocity in px/s for a released drag to fling.
    #[serde(default = "default_min_fling_velocity")]
    pub min_fling_velocity: f32,

    /// Minimum orthogonal velocity in px/s that closes a swiped tab.
    #[serde(default = "default_min_swipe_velocity")]
    pub min_swipe_velocity: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold: default_drag_threshold(),
            min_fling_velocity: default_min_fling_velocity(),
            min_swipe_velocity: default_min_swipe_velocity(),
        }
    }
}

/// Animation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Whether animations play at all. Disabled, every transition is instant.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Multiplier applied to every animation duration.
    #[serde(default = "default_duration_scale")]
    pub duration_scale: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_scale: default_duration_scale(),
        }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether the add button is shown at startup.
    #[serde(default)]
    pub show_add_button: bool,

    /// Path of the state file used by `save` and `restore`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            show_add_button: false,
            state_file: None,
        }
    }
}

// Default value functions for serde
fn default_width() -> f32 {
    1080.0
}

fn default_height() -> f32 {
    1920.0
}

fn default_drag_threshold() -> f32 {
    8.0
}

fn default_min_fling_velocity() -> f32 {
    500.0
}

fn default_min_swipe_velocity() -> f32 {
    1000.0
}

fn default_duration_scale() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MAX_STACKED_TAB_COUNT: usize = 8;
const MIN_CONTAINER_SIZE: f32 = 100.0;
const DURATION_SCALE_RANGE: (f32, f32) = (0.1, 10.0);

/// A configuration value that was out of range and has been corrected.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values and report what was changed.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let level = self.behavior.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level '{}', using 'info'", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        if let Some(count) = self.layout.stacked_tab_count {
            let clamped = count.clamp(1, MAX_STACKED_TAB_COUNT);
            if clamped != count {
                warnings.push(ConfigWarning::new(
                    "layout.stacked_tab_count",
                    format!("{} is out of range, clamped to {}", count, clamped),
                ));
                self.layout.stacked_tab_count = Some(clamped);
            }
        }

        if let Some(spacing) = self.layout.stacked_tab_spacing {
            if !spacing.is_finite() || spacing < 0.0 {
                warnings.push(ConfigWarning::new(
                    "layout.stacked_tab_spacing",
                    format!("{} is invalid, using the preset", spacing),
                ));
                self.layout.stacked_tab_spacing = None;
            }
        }

        for (field, value) in [
            ("layout.padding", &mut self.layout.padding),
            ("layout.toolbar_height", &mut self.layout.toolbar_height),
            ("gestures.drag_threshold", &mut self.gestures.drag_threshold),
        ] {
            if !value.is_finite() || *value < 0.0 {
                warnings.push(ConfigWarning::new(
                    field,
                    format!("{} must be non-negative, using 0", value),
                ));
                *value = 0.0;
            }
        }

        for (field, value, fallback) in [
            ("layout.width", &mut self.layout.width, default_width()),
            ("layout.height", &mut self.layout.height, default_height()),
        ] {
            if !value.is_finite() || *value < MIN_CONTAINER_SIZE {
                warnings.push(ConfigWarning::new(
                    field,
                    format!(
                        "{} is below the minimum of {}, using {}",
                        value, MIN_CONTAINER_SIZE, fallback
                    ),
                ));
                *value = fallback;
            }
        }

        for (field, value, fallback) in [
            (
                "gestures.min_fling_velocity",
                &mut self.gestures.min_fling_velocity,
                default_min_fling_velocity(),
            ),
            (
                "gestures.min_swipe_velocity",
                &mut self.gestures.min_swipe_velocity,
                default_min_swipe_velocity(),
            ),
        ] {
            if !value.is_finite() || *value <= 0.0 {
                warnings.push(ConfigWarning::new(
                    field,
                    format!("{} must be positive, using {}", value, fallback),
                ));
                *value = fallback;
            }
        }

        let (min_scale, max_scale) = DURATION_SCALE_RANGE;
        let scale = self.animation.duration_scale;
        if !scale.is_finite() {
            warnings.push(ConfigWarning::new(
                "animation.duration_scale",
                "not a number, using 1",
            ));
            self.animation.duration_scale = default_duration_scale();
        } else if !(min_scale..=max_scale).contains(&scale) {
            let clamped = scale.clamp(min_scale, max_scale);
            warnings.push(ConfigWarning::new(
                "animation.duration_scale",
                format!("{} is out of range, clamped to {}", scale, clamped),
            ));
            self.animation.duration_scale = clamped;
        }

        warnings
    }

    /// Build the engine configuration.
    pub fn switcher_config(&self) -> SwitcherConfig {
        let mut traits = LayoutTraits::for_form_factor(self.layout.form_factor);
        if let Some(axis_mode) = self.layout.axis_mode {
            traits.axis_mode = axis_mode;
        }
        if let Some(count) = self.layout.stacked_tab_count {
            traits.stacked_tab_count = count;
        }
        if let Some(spacing) = self.layout.stacked_tab_spacing {
            traits.stacked_tab_spacing = spacing;
        }

        let mut config = match self.layout.form_factor {
            FormFactor::Phone => SwitcherConfig::phone(),
            FormFactor::Tablet => SwitcherConfig::tablet(),
        };
        config.traits = traits;
        config.padding = Insets::uniform(self.layout.padding);
        config.toolbar_height = self.layout.toolbar_height;
        config.drag.drag_threshold = self.gestures.drag_threshold;
        config.drag.min_fling_velocity = self.gestures.min_fling_velocity;
        config.drag.min_swipe_velocity = self.gestures.min_swipe_velocity;
        config.durations = if self.animation.enabled {
            scale_durations(config.durations, self.animation.duration_scale)
        } else {
            scale_durations(config.durations, 0.0)
        };
        config
    }
}

fn scale_durations(durations: AnimationDurations, scale: f32) -> AnimationDurations {
    let scale = |ms: u64| (ms as f32 * scale).round() as u64;
    AnimationDurations {
        show_switcher: scale(durations.show_switcher),
        hide_switcher: scale(durations.hide_switcher),
        add_tab: scale(durations.add_tab),
        peek: scale(durations.peek),
        remove_tab: scale(durations.remove_tab),
        relocate: scale(durations.relocate),
        relocate_delay_step: scale(durations.relocate_delay_step),
        revert_overshoot: scale(durations.revert_overshoot),
        revert_swipe: scale(durations.revert_swipe),
        clear: scale(durations.clear),
        clear_delay_step: scale(durations.clear_delay_step),
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("", "", "tabstack") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("tabstack").join("config.toml"));
    }

    paths.push(PathBuf::from("tabstack.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
