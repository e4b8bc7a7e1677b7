//! Kinetic configuration system
//!
//! This crate provides centralized configuration for the animation and gesture
//! engine, loading tuned defaults from `kinetic.toml` with environment variable
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading or writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`KineticConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized back to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct KineticConfig {
    /// Gesture classification thresholds
    pub gesture: GestureConfig,
    /// Viewport/scroll tracking settings
    pub viewport: ViewportConfig,
    /// Enter/exit transition defaults
    pub transition: TransitionConfig,
    /// Frame scheduler defaults
    pub scheduler: SchedulerConfig,
    /// Adaptive quality policy
    pub quality: QualityConfig,
    /// Headless demo settings
    pub demo: DemoConfig,
}

/// Gesture thresholds. Distances are logical pixels, velocities px/ms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum dominant-axis travel for a swipe
    pub swipe_threshold_px: f32,
    /// Minimum release velocity for a swipe (px/ms)
    pub swipe_velocity_threshold: f32,
    /// Movement allowed before a pending long-press is cancelled
    pub move_tolerance_px: f32,
    /// Hold time before a long-press fires
    pub long_press_ms: f64,
    /// Lower bound for pinch scale
    pub min_scale: f32,
    /// Upper bound for pinch scale
    pub max_scale: f32,
    /// Pull distance at which a refresh triggers
    pub pull_threshold_px: f32,
    /// Damping applied to raw pull distance (must be < 1)
    pub pull_resistance: f32,
    /// Pull distance cap as a multiple of the threshold
    pub pull_max_factor: f32,
}

/// Viewport and scroll tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Minimum time between two recomputations (~60 Hz ceiling by default)
    pub min_interval_ms: f64,
    /// Duration of the smooth scroll performed when snapping
    pub snap_duration_ms: f64,
    /// Easing name used for snap scrolling
    pub snap_easing: String,
}

/// Transition orchestrator defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransitionConfig {
    /// Default duration for enter/exit transitions
    pub duration_ms: f64,
    /// Default easing name
    pub easing: String,
}

/// Frame scheduler defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Duration used when a tween is configured with an invalid duration
    pub default_duration_ms: f64,
    /// Default easing name for tweens
    pub easing: String,
}

/// Cost knobs for a single quality tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierProfileConfig {
    /// Recommended particle count for decorative effects
    pub particle_count: u32,
    /// Shader complexity in [0, 1]
    pub shader_complexity: f32,
    /// Multiplier applied to animation durations
    pub duration_multiplier: f32,
}

/// Adaptive quality configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    /// Heap usage ratio above which the tier is downgraded
    pub memory_pressure_ratio: f32,
    pub low: TierProfileConfig,
    pub medium: TierProfileConfig,
    pub high: TierProfileConfig,
}

/// Headless demo configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Scenario to run (swipe, pinch, long-press, pull, scroll, transition, all)
    pub scenario: Option<String>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold_px: 50.0,
            swipe_velocity_threshold: 0.5,
            move_tolerance_px: 10.0,
            long_press_ms: 500.0,
            min_scale: 0.5,
            max_scale: 4.0,
            pull_threshold_px: 100.0,
            pull_resistance: 0.6,
            pull_max_factor: 1.5,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 16.0,
            snap_duration_ms: 400.0,
            snap_easing: "ease-out-cubic".to_string(),
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: 600.0,
            easing: "ease-in-out-cubic".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 1000.0,
            easing: "ease-out-cubic".to_string(),
        }
    }
}

impl Default for TierProfileConfig {
    fn default() -> Self {
        Self::HIGH
    }
}

impl TierProfileConfig {
    pub const LOW: Self = Self {
        particle_count: 20,
        shader_complexity: 0.25,
        duration_multiplier: 0.6,
    };
    pub const MEDIUM: Self = Self {
        particle_count: 50,
        shader_complexity: 0.6,
        duration_multiplier: 0.85,
    };
    pub const HIGH: Self = Self {
        particle_count: 100,
        shader_complexity: 1.0,
        duration_multiplier: 1.0,
    };

    fn sanitized(self, tier: &str, fallback: Self) -> Self {
        Self {
            particle_count: self.particle_count,
            shader_complexity: unit_or(
                &format!("quality.{tier}.shader_complexity"),
                self.shader_complexity,
                fallback.shader_complexity,
            ),
            duration_multiplier: non_negative_or(
                &format!("quality.{tier}.duration_multiplier"),
                self.duration_multiplier,
                fallback.duration_multiplier,
            ),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            memory_pressure_ratio: 0.8,
            low: TierProfileConfig::LOW,
            medium: TierProfileConfig::MEDIUM,
            high: TierProfileConfig::HIGH,
        }
    }
}

impl KineticConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `kinetic.toml` in the current directory, or
    /// return the defaults if it is missing or malformed.
    pub fn load_or_default() -> Self {
        match Self::load_from_file("kinetic.toml") {
            Ok(config) => config,
            Err(ConfigError::Io { .. }) => Self::default(),
            Err(err) => {
                warn!("ignoring kinetic.toml: {err}");
                Self::default()
            }
        }
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Some(v) = env_parse::<f32>("KINETIC_SWIPE_THRESHOLD") {
            self.gesture.swipe_threshold_px = v;
        }
        if let Some(v) = env_parse::<f32>("KINETIC_SWIPE_VELOCITY") {
            self.gesture.swipe_velocity_threshold = v;
        }
        if let Some(v) = env_parse::<f32>("KINETIC_MOVE_TOLERANCE") {
            self.gesture.move_tolerance_px = v;
        }
        if let Some(v) = env_parse::<f64>("KINETIC_LONG_PRESS_MS") {
            self.gesture.long_press_ms = v;
        }
        if let Some(v) = env_parse::<f32>("KINETIC_PULL_THRESHOLD") {
            self.gesture.pull_threshold_px = v;
        }
        if let Some(v) = env_parse::<f32>("KINETIC_PULL_RESISTANCE") {
            self.gesture.pull_resistance = v;
        }

        if let Some(v) = env_parse::<f64>("KINETIC_SCROLL_INTERVAL_MS") {
            self.viewport.min_interval_ms = v;
        }

        if let Some(v) = env_parse::<f64>("KINETIC_TRANSITION_MS") {
            self.transition.duration_ms = v;
        }
        if let Ok(easing) = std::env::var("KINETIC_TRANSITION_EASING") {
            self.transition.easing = easing;
        }

        if let Ok(scenario) = std::env::var("KINETIC_DEMO_SCENARIO") {
            self.demo.scenario = Some(scenario);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from kinetic.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }

    /// Replace values that would break the engine (non-finite, negative,
    /// out-of-range) with their defaults, logging each replacement.
    pub fn sanitized(mut self) -> Self {
        let d = GestureConfig::default();
        let g = &mut self.gesture;
        g.swipe_threshold_px =
            positive_or("gesture.swipe_threshold_px", g.swipe_threshold_px, d.swipe_threshold_px);
        g.swipe_velocity_threshold = positive_or(
            "gesture.swipe_velocity_threshold",
            g.swipe_velocity_threshold,
            d.swipe_velocity_threshold,
        );
        g.move_tolerance_px =
            non_negative_or("gesture.move_tolerance_px", g.move_tolerance_px, d.move_tolerance_px);
        g.long_press_ms =
            positive_or_f64("gesture.long_press_ms", g.long_press_ms, d.long_press_ms);
        g.min_scale = positive_or("gesture.min_scale", g.min_scale, d.min_scale);
        g.max_scale = positive_or("gesture.max_scale", g.max_scale, d.max_scale);
        if g.min_scale > g.max_scale {
            warn!(
                min = g.min_scale,
                max = g.max_scale,
                "gesture scale bounds inverted, using defaults"
            );
            g.min_scale = d.min_scale;
            g.max_scale = d.max_scale;
        }
        g.pull_threshold_px =
            positive_or("gesture.pull_threshold_px", g.pull_threshold_px, d.pull_threshold_px);
        if !(g.pull_resistance > 0.0 && g.pull_resistance < 1.0) {
            warn!(value = g.pull_resistance, "gesture.pull_resistance must be in (0, 1), using default");
            g.pull_resistance = d.pull_resistance;
        }
        if !(g.pull_max_factor.is_finite() && g.pull_max_factor >= 1.0) {
            warn!(value = g.pull_max_factor, "gesture.pull_max_factor must be >= 1, using default");
            g.pull_max_factor = d.pull_max_factor;
        }

        let d = ViewportConfig::default();
        self.viewport.min_interval_ms =
            non_negative_or_f64("viewport.min_interval_ms", self.viewport.min_interval_ms, d.min_interval_ms);
        self.viewport.snap_duration_ms =
            positive_or_f64("viewport.snap_duration_ms", self.viewport.snap_duration_ms, d.snap_duration_ms);

        let d = TransitionConfig::default();
        self.transition.duration_ms =
            positive_or_f64("transition.duration_ms", self.transition.duration_ms, d.duration_ms);

        let d = SchedulerConfig::default();
        self.scheduler.default_duration_ms = positive_or_f64(
            "scheduler.default_duration_ms",
            self.scheduler.default_duration_ms,
            d.default_duration_ms,
        );

        let q = &mut self.quality;
        q.memory_pressure_ratio =
            unit_or("quality.memory_pressure_ratio", q.memory_pressure_ratio, 0.8);
        q.low = q.low.sanitized("low", TierProfileConfig::LOW);
        q.medium = q.medium.sanitized("medium", TierProfileConfig::MEDIUM);
        q.high = q.high.sanitized("high", TierProfileConfig::HIGH);

        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

fn positive_or(field: &str, value: f32, default: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(field, value, default, "invalid config value, using default");
        default
    }
}

fn non_negative_or(field: &str, value: f32, default: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(field, value, default, "invalid config value, using default");
        default
    }
}

fn unit_or(field: &str, value: f32, default: f32) -> f32 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        warn!(field, value, default, "config value outside [0, 1], using default");
        default
    }
}

fn positive_or_f64(field: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(field, value, default, "invalid config value, using default");
        default
    }
}

fn non_negative_or_f64(field: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(field, value, default, "invalid config value, using default");
        default
    }
}
