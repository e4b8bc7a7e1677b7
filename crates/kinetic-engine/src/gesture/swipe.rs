use kinetic_config::GestureConfig;

use super::{GestureEvent, SwipeDirection};
use crate::types::Point;

/// Durations are floored to this so a zero-length drag cannot divide by zero.
const MIN_DURATION_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeThresholds {
    /// Dominant-axis travel in pixels.
    pub distance_px: f32,
    /// Release velocity in px/ms.
    pub velocity: f32,
}

impl Default for SwipeThresholds {
    fn default() -> Self {
        Self {
            distance_px: 50.0,
            velocity: 0.5,
        }
    }
}

impl From<&GestureConfig> for SwipeThresholds {
    fn from(config: &GestureConfig) -> Self {
        Self {
            distance_px: config.swipe_threshold_px,
            velocity: config.swipe_velocity_threshold,
        }
    }
}

/// Classify a completed single-pointer drag.
///
/// Horizontal iff `|dx| > |dy|`. Emits a swipe when the dominant-axis
/// distance OR the velocity exceeds its threshold; `None` otherwise.
pub fn classify_swipe(start: Point, end: Point, duration_ms: f64, thresholds: SwipeThresholds) -> Option<GestureEvent> {
    let (dx, dy) = start.delta_to(end);
    if !(dx.is_finite() && dy.is_finite()) {
        return None;
    }

    let (direction, distance) = if dx.abs() > dy.abs() {
        let dir = if dx > 0.0 { SwipeDirection::Right } else { SwipeDirection::Left };
        (dir, dx.abs())
    } else {
        let dir = if dy > 0.0 { SwipeDirection::Down } else { SwipeDirection::Up };
        (dir, dy.abs())
    };

    let duration = duration_ms.max(MIN_DURATION_MS);
    let velocity = (f64::from(distance) / duration) as f32;

    if distance > thresholds.distance_px || velocity > thresholds.velocity {
        Some(GestureEvent::Swipe {
            direction,
            distance,
            velocity,
            start,
            end,
        })
    } else {
        None
    }
}
