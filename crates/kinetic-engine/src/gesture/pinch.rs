use kinetic_config::GestureConfig;

use super::{GestureEvent, PinchPhase};
use crate::math::clamp;
use crate::types::Point;

/// Below this start distance the two points are treated as coincident.
const MIN_START_DISTANCE_PX: f32 = 1e-3;

/// Two-finger scale recognizer.
///
/// The scale a pinch ends at becomes the starting scale of the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct PinchTracker {
    min_scale: f32,
    max_scale: f32,
    /// Committed scale from previous pinches.
    scale: f32,
    /// Scale reported by the previous update of the current pinch.
    last_scale: f32,
    start_distance: f32,
    center: Point,
    active: bool,
}

impl Default for PinchTracker {
    fn default() -> Self {
        Self::new(0.5, 4.0)
    }
}

impl PinchTracker {
    pub fn new(min_scale: f32, max_scale: f32) -> Self {
        let (min_scale, max_scale) = if min_scale <= max_scale {
            (min_scale, max_scale)
        } else {
            (max_scale, min_scale)
        };
        Self {
            min_scale,
            max_scale,
            scale: clamp(1.0, min_scale, max_scale),
            last_scale: 1.0,
            start_distance: 0.0,
            center: Point::ZERO,
            active: false,
        }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.min_scale, config.max_scale)
    }

    pub fn scale(&self) -> f32 {
        if self.active { self.last_scale } else { self.scale }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Both points are down.
    pub fn begin(&mut self, a: Point, b: Point) {
        self.start_distance = a.distance_to(b);
        self.last_scale = self.scale;
        self.center = a.midpoint(b);
        self.active = true;
    }

    /// One of the points moved. `None` when the start distance was zero.
    pub fn update(&mut self, a: Point, b: Point) -> Option<GestureEvent> {
        if !self.active || self.start_distance.is_nan() || self.start_distance <= MIN_START_DISTANCE_PX {
            return None;
        }
        let ratio = a.distance_to(b) / self.start_distance;
        if !ratio.is_finite() {
            return None;
        }
        let scale = clamp(ratio * self.scale, self.min_scale, self.max_scale);
        let delta_scale = scale - self.last_scale;
        self.last_scale = scale;
        self.center = a.midpoint(b);
        Some(GestureEvent::Pinch {
            scale,
            delta_scale,
            center: self.center,
            phase: PinchPhase::Changed,
        })
    }

    /// A point lifted: commit and report the final scale.
    pub fn end(&mut self) -> Option<GestureEvent> {
        if !std::mem::replace(&mut self.active, false) {
            return None;
        }
        let delta_scale = self.last_scale - self.scale;
        self.scale = self.last_scale;
        Some(GestureEvent::Pinch {
            scale: self.scale,
            delta_scale,
            center: self.center,
            phase: PinchPhase::Ended,
        })
    }

    /// Abandon the current pinch without committing it.
    pub fn cancel(&mut self) {
        self.active = false;
        self.last_scale = self.scale;
    }

    pub fn reset_scale(&mut self) {
        self.cancel();
        self.scale = clamp(1.0, self.min_scale, self.max_scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn scale_of(event: Option<GestureEvent>) -> f32 {
        match event {
            Some(GestureEvent::Pinch { scale, .. }) => scale,
            other => panic!("expected pinch, got {other:?}"),
        }
    }

    #[test]
    fn test_scale_and_center() {
        let mut pinch = PinchTracker::default();
        pinch.begin(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let event = pinch.update(Point::new(-50.0, 0.0), Point::new(150.0, 0.0));
        match event {
            Some(GestureEvent::Pinch {
                scale,
                delta_scale,
                center,
                phase,
            }) => {
                assert!(approx_eq(scale, 2.0));
                assert!(approx_eq(delta_scale, 1.0));
                assert_eq!(center, Point::new(50.0, 0.0));
                assert_eq!(phase, PinchPhase::Changed);
            }
            other => panic!("expected pinch, got {other:?}"),
        }
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut pinch = PinchTracker::new(0.5, 3.0);
        pinch.begin(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!(approx_eq(scale_of(pinch.update(Point::ZERO, Point::new(100.0, 0.0))), 3.0));
        assert!(approx_eq(scale_of(pinch.update(Point::ZERO, Point::new(1.0, 0.0))), 0.5));
    }

    #[test]
    fn test_final_scale_carries_over() {
        let mut pinch = PinchTracker::default();
        pinch.begin(Point::ZERO, Point::new(100.0, 0.0));
        pinch.update(Point::ZERO, Point::new(200.0, 0.0));
        let ended = pinch.end();
        assert!(matches!(ended, Some(GestureEvent::Pinch { phase: PinchPhase::Ended, .. })));
        assert!(approx_eq(pinch.scale(), 2.0));

        pinch.begin(Point::ZERO, Point::new(100.0, 0.0));
        assert!(approx_eq(scale_of(pinch.update(Point::ZERO, Point::new(150.0, 0.0))), 3.0));
        assert!(pinch.end().is_some());
        assert!(pinch.end().is_none());
    }

    #[test]
    fn test_zero_start_distance_emits_nothing() {
        let mut pinch = PinchTracker::default();
        pinch.begin(Point::new(5.0, 5.0), Point::new(5.0, 5.0));
        assert!(pinch.update(Point::ZERO, Point::new(50.0, 0.0)).is_none());
        assert!(approx_eq(pinch.scale(), 1.0));
    }

    #[test]
    fn test_cancel_does_not_commit() {
        let mut pinch = PinchTracker::default();
        pinch.begin(Point::ZERO, Point::new(100.0, 0.0));
        pinch.update(Point::ZERO, Point::new(300.0, 0.0));
        pinch.cancel();
        assert!(approx_eq(pinch.scale(), 1.0));
        assert!(pinch.end().is_none());
    }
}
