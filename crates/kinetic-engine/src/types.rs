//! Core types shared across the engine.
//!
//! - `SurfaceId` / `TransitionId`: unique identifiers
//! - `Point`: a position in logical pixels
//! - `AnimationConfig`: timing for one animation invocation
//! - `MotionStatus`: the observable status every component publishes

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::easing::EasingId;
use crate::error::{MotionError, Result};

/// Identifier of a target surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    /// Generate a new unique surface ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of one transition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub u64);

impl TransitionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A position in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn delta_to(self, other: Point) -> (f32, f32) {
        (other.x - self.x, other.y - self.y)
    }
}

/// How many times an animation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepeatCount {
    /// Run a fixed number of iterations (at least one).
    Count { count: u32 },
    /// Run until cancelled.
    Infinite,
}

impl Default for RepeatCount {
    fn default() -> Self {
        Self::Count { count: 1 }
    }
}

/// Direction of playback per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayDirection {
    #[default]
    Normal,
    Reverse,
    /// Forward on even iterations, backward on odd ones.
    Alternate,
}

impl PlayDirection {
    /// Determine if a specific iteration should play in reverse.
    pub fn is_reversed(&self, iteration: u32) -> bool {
        match self {
            Self::Normal => false,
            Self::Reverse => true,
            Self::Alternate => iteration % 2 == 1,
        }
    }
}

/// Timing for one animation invocation.
///
/// Values are fixed once an animation starts; per-call options are applied
/// by building a new config from the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Duration of one iteration in milliseconds.
    pub duration_ms: f64,
    /// Delay before the first iteration in milliseconds.
    pub delay_ms: f64,
    pub easing: EasingId,
    /// Extra delay per item index for staggered groups.
    pub stagger_ms: f64,
    pub repeat: RepeatCount,
    pub direction: PlayDirection,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 1000.0,
            delay_ms: 0.0,
            easing: EasingId::EaseOutCubic,
            stagger_ms: 0.0,
            repeat: RepeatCount::default(),
            direction: PlayDirection::Normal,
        }
    }
}

/// Where an animation is on its timeline at a given elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSample {
    /// Direction-adjusted progress within the current iteration, in [0, 1].
    pub progress: f32,
    /// Zero-based iteration index.
    pub iteration: u32,
    /// Still inside the delay.
    pub pending: bool,
    /// All iterations have completed.
    pub finished: bool,
}

impl AnimationConfig {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_easing(mut self, easing: EasingId) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_stagger(mut self, stagger_ms: f64) -> Self {
        self.stagger_ms = stagger_ms;
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatCount) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_direction(mut self, direction: PlayDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Delay for the `index`-th item of a staggered group.
    pub fn delay_for(&self, index: usize) -> f64 {
        self.delay_ms + self.stagger_ms * index as f64
    }

    /// Config for the `index`-th item of a staggered group.
    pub fn staggered(&self, index: usize) -> Self {
        Self {
            delay_ms: self.delay_for(index),
            stagger_ms: 0.0,
            ..*self
        }
    }

    /// Scale duration, delay and stagger (quality tiers, reduced motion).
    pub fn scaled(&self, multiplier: f32) -> Self {
        let m = f64::from(multiplier.max(0.0));
        Self {
            duration_ms: self.duration_ms * m,
            delay_ms: self.delay_ms * m,
            stagger_ms: self.stagger_ms * m,
            ..*self
        }
    }

    /// Report the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !(self.duration_ms.is_finite() && self.duration_ms >= 0.0) {
            return Err(MotionError::InvalidConfig {
                field: "duration_ms",
                reason: format!("{} is not a finite non-negative duration", self.duration_ms),
            });
        }
        if !(self.delay_ms.is_finite() && self.delay_ms >= 0.0) {
            return Err(MotionError::InvalidConfig {
                field: "delay_ms",
                reason: format!("{} is not a finite non-negative delay", self.delay_ms),
            });
        }
        if !(self.stagger_ms.is_finite() && self.stagger_ms >= 0.0) {
            return Err(MotionError::InvalidConfig {
                field: "stagger_ms",
                reason: format!("{} is not a finite non-negative stagger", self.stagger_ms),
            });
        }
        if self.repeat == (RepeatCount::Count { count: 0 }) {
            return Err(MotionError::InvalidConfig {
                field: "repeat",
                reason: "repeat count must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Replace invalid fields with safe values, logging each replacement.
    ///
    /// A zero duration is valid (the animation jumps to its end on the
    /// first frame).
    pub fn sanitized(self, default_duration_ms: f64) -> Self {
        let mut config = self;
        if !(config.duration_ms.is_finite() && config.duration_ms >= 0.0) {
            tracing::warn!(
                duration_ms = config.duration_ms,
                default_duration_ms,
                "invalid animation duration, using default"
            );
            config.duration_ms = default_duration_ms;
        }
        if !(config.delay_ms.is_finite() && config.delay_ms >= 0.0) {
            tracing::warn!(delay_ms = config.delay_ms, "invalid animation delay, using 0");
            config.delay_ms = 0.0;
        }
        if !(config.stagger_ms.is_finite() && config.stagger_ms >= 0.0) {
            tracing::warn!(stagger_ms = config.stagger_ms, "invalid stagger, using 0");
            config.stagger_ms = 0.0;
        }
        if config.repeat == (RepeatCount::Count { count: 0 }) {
            tracing::warn!("repeat count 0, running once");
            config.repeat = RepeatCount::Count { count: 1 };
        }
        config
    }

    /// Sample the timeline at `elapsed_ms` since start.
    pub fn sample(&self, elapsed_ms: f64) -> TimelineSample {
        let start_progress = if self.direction.is_reversed(0) { 1.0 } else { 0.0 };
        let active = elapsed_ms - self.delay_ms;
        if active < 0.0 {
            return TimelineSample {
                progress: start_progress,
                iteration: 0,
                pending: true,
                finished: false,
            };
        }

        let iterations = if self.duration_ms > 0.0 {
            active / self.duration_ms
        } else {
            f64::INFINITY
        };

        let finished_at = match self.repeat {
            RepeatCount::Count { count } => Some(count.max(1)),
            RepeatCount::Infinite => None,
        };

        if let Some(total) = finished_at {
            if iterations >= f64::from(total) {
                let last = total - 1;
                let progress = if self.direction.is_reversed(last) { 0.0 } else { 1.0 };
                return TimelineSample {
                    progress,
                    iteration: last,
                    pending: false,
                    finished: true,
                };
            }
        }

        if !iterations.is_finite() {
            // Zero-duration infinite loop: hold the start value.
            return TimelineSample {
                progress: start_progress,
                iteration: 0,
                pending: false,
                finished: false,
            };
        }

        let iteration = iterations.floor() as u32;
        let local = iterations.fract() as f32;
        let progress = if self.direction.is_reversed(iteration) {
            1.0 - local
        } else {
            local
        };

        TimelineSample {
            progress,
            iteration,
            pending: false,
            finished: false,
        }
    }
}

/// Observable status published by every component instance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionStatus {
    /// Progress of the current animation or effect in [0, 1].
    pub progress: f32,
    /// The component holds a live session, transition or subscription.
    pub is_active: bool,
    /// Visual state is changing this frame.
    pub is_animating: bool,
}
