use kinetic_config::GestureConfig;

use super::GestureEvent;
use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Armed {
    position: Point,
    start_ms: f64,
}

/// Hold timer polled from the frame loop.
///
/// Armed on pointer-down; disarmed by movement beyond the tolerance, by
/// release, or by firing. Fires at most once per arm.
#[derive(Debug, Clone, PartialEq)]
pub struct LongPressTimer {
    duration_ms: f64,
    tolerance_px: f32,
    armed: Option<Armed>,
    fired: bool,
}

impl Default for LongPressTimer {
    fn default() -> Self {
        Self::new(500.0, 10.0)
    }
}

impl LongPressTimer {
    pub fn new(duration_ms: f64, tolerance_px: f32) -> Self {
        Self {
            duration_ms: duration_ms.max(0.0),
            tolerance_px: tolerance_px.max(0.0),
            armed: None,
            fired: false,
        }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.long_press_ms, config.move_tolerance_px)
    }

    pub fn arm(&mut self, position: Point, now_ms: f64) {
        self.armed = Some(Armed {
            position,
            start_ms: now_ms,
        });
        self.fired = false;
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Fired since the last arm.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Pointer moved; disarms when it leaves the tolerance radius.
    pub fn on_move(&mut self, position: Point) {
        if let Some(armed) = self.armed {
            if armed.position.distance_to(position) > self.tolerance_px {
                tracing::trace!("long-press cancelled by movement");
                self.armed = None;
            }
        }
    }

    /// Hold progress in [0, 1], 0 when disarmed.
    pub fn progress(&self, now_ms: f64) -> f32 {
        match self.armed {
            Some(armed) if self.duration_ms > 0.0 => {
                crate::math::clamp01(((now_ms - armed.start_ms) / self.duration_ms) as f32)
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }

    pub fn poll(&mut self, now_ms: f64) -> Option<GestureEvent> {
        let armed = self.armed?;
        let held = now_ms - armed.start_ms;
        if held < self.duration_ms {
            return None;
        }
        self.armed = None;
        self.fired = true;
        Some(GestureEvent::LongPress {
            position: armed.position,
            duration_ms: held,
        })
    }
}
