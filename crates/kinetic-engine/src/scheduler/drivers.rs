//! Small animation drivers built on [`FrameScheduler`].
//!
//! - `Counter`: counts a number up with grouping and fixed precision
//! - `MagneticHover`: pulls a surface toward the pointer and eases it back
//! - `AmbientLoop`: float / pulse / shake loops as pure functions of time
//! - `ProgressRing`: stroke dash offset for a circular progress indicator

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;

use crate::math::{clamp01, lerp};
use crate::surface::{Rect, SurfaceRef, VisualState};
use crate::types::{AnimationConfig, Point};

use super::{FrameHandle, FrameScheduler, FrameTick, TweenSpec};

/// Frame length the smoothing factors are tuned against.
const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;

/// Format `value` with `decimals` digits and comma thousands separators.
pub fn format_count(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        grouped.insert(0, '-');
    }
    grouped
}

/// Count-up number display.
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub from: f64,
    pub to: f64,
    pub decimals: usize,
    pub prefix: String,
    pub suffix: String,
}

impl Counter {
    pub fn new(to: f64) -> Self {
        Self {
            from: 0.0,
            to,
            decimals: 0,
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    pub fn starting_at(mut self, from: f64) -> Self {
        self.from = from;
        self
    }

    pub fn decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn value_at(&self, eased: f32) -> f64 {
        self.from + (self.to - self.from) * f64::from(eased)
    }

    pub fn text_at(&self, eased: f32) -> String {
        format!(
            "{}{}{}",
            self.prefix,
            format_count(self.value_at(eased), self.decimals),
            self.suffix
        )
    }

    /// Count up over `config`, reporting the formatted text every frame.
    pub fn start<F>(self, scheduler: &FrameScheduler, config: AnimationConfig, mut on_text: F) -> FrameHandle
    where
        F: FnMut(&str) + 'static,
    {
        let spec = TweenSpec::new(0.0, 1.0).with_config(config);
        scheduler.animate(spec, move |frame| on_text(&self.text_at(frame.eased)), || {})
    }
}

/// Offset toward the pointer while hovered, eased back to rest on leave.
#[derive(Debug, Clone, PartialEq)]
pub struct MagneticHover {
    /// Fraction of the pointer's distance from center that is followed.
    pub strength: f32,
    /// Longest offset in pixels.
    pub max_offset: f32,
    /// Fraction of the remaining distance covered per 60 Hz frame.
    pub smoothing: f32,
    offset: Point,
    target: Point,
}

impl Default for MagneticHover {
    fn default() -> Self {
        Self::new(0.3, 24.0)
    }
}

impl MagneticHover {
    pub fn new(strength: f32, max_offset: f32) -> Self {
        Self {
            strength,
            max_offset: max_offset.max(0.0),
            smoothing: 0.15,
            offset: Point::ZERO,
            target: Point::ZERO,
        }
    }

    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = clamp01(smoothing);
        self
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn target(&self) -> Point {
        self.target
    }

    /// Retarget from a pointer position over a surface's bounds.
    pub fn pointer_move(&mut self, pointer: Point, bounds: Rect) {
        let (dx, dy) = bounds.center().delta_to(pointer);
        let mut target = Point::new(dx * self.strength, dy * self.strength);
        let len = Point::ZERO.distance_to(target);
        if len > self.max_offset && len > 0.0 {
            let k = self.max_offset / len;
            target = Point::new(target.x * k, target.y * k);
        }
        self.target = target;
    }

    pub fn pointer_leave(&mut self) {
        self.target = Point::ZERO;
    }

    /// Advance by `delta_ms`. Returns `true` once resting on the target.
    pub fn step(&mut self, delta_ms: f64) -> bool {
        let frames = (delta_ms.max(0.0) / REFERENCE_FRAME_MS) as f32;
        let k = 1.0 - (1.0 - self.smoothing).powf(frames);
        self.offset = Point::new(
            lerp(self.offset.x, self.target.x, k),
            lerp(self.offset.y, self.target.y, k),
        );

        let settled = self.offset.distance_to(self.target) < 0.05;
        if settled {
            self.offset = self.target;
        }
        settled
    }

    /// Write the offset into `surface` every frame until it goes away.
    pub fn attach(hover: Rc<RefCell<MagneticHover>>, scheduler: &FrameScheduler, surface: SurfaceRef) -> FrameHandle {
        scheduler.start_with(move |handle| {
            move |tick: &FrameTick| {
                let offset = {
                    let mut hover = hover.borrow_mut();
                    hover.step(tick.delta_ms);
                    hover.offset()
                };
                let written = surface.with_live(|s| {
                    let mut state = s.visual();
                    state.translate_x = offset.x;
                    state.translate_y = offset.y;
                    s.apply(&state);
                });
                if written.is_none() {
                    handle.cancel();
                }
            }
        })
    }
}

/// Ambient decorative loops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmbientLoop {
    /// Bob vertically.
    Float { amplitude_px: f32, period_ms: f64 },
    /// Breathe between two scales.
    Pulse {
        min_scale: f32,
        max_scale: f32,
        period_ms: f64,
    },
    /// Horizontal shake decaying to rest over `duration_ms`.
    Shake {
        amplitude_px: f32,
        period_ms: f64,
        duration_ms: f64,
    },
}

fn phase(elapsed_ms: f64, period_ms: f64) -> f32 {
    if period_ms.is_nan() || period_ms <= 0.0 || !elapsed_ms.is_finite() {
        return 0.0;
    }
    (elapsed_ms / period_ms).fract() as f32 * TAU
}

impl AmbientLoop {
    /// Total running time, `None` for endless loops.
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            Self::Shake { duration_ms, .. } => Some(duration_ms.max(0.0)),
            Self::Float { .. } | Self::Pulse { .. } => None,
        }
    }

    /// State at `elapsed_ms` layered over `base`.
    pub fn sample(&self, elapsed_ms: f64, base: &VisualState) -> VisualState {
        let mut state = *base;
        match *self {
            Self::Float {
                amplitude_px,
                period_ms,
            } => {
                state.translate_y -= amplitude_px * phase(elapsed_ms, period_ms).sin();
            }
            Self::Pulse {
                min_scale,
                max_scale,
                period_ms,
            } => {
                let t = (1.0 - phase(elapsed_ms, period_ms).cos()) / 2.0;
                state.scale *= lerp(min_scale, max_scale, t);
            }
            Self::Shake {
                amplitude_px,
                period_ms,
                duration_ms,
            } => {
                if duration_ms > 0.0 && elapsed_ms < duration_ms {
                    let decay = 1.0 - (elapsed_ms / duration_ms) as f32;
                    state.translate_x += amplitude_px * phase(elapsed_ms, period_ms).sin() * decay;
                }
            }
        }
        state
    }

    /// Run on `surface`; its state at the first frame is the base.
    ///
    /// A shake finishes by restoring the base.
    pub fn start(self, scheduler: &FrameScheduler, surface: SurfaceRef) -> FrameHandle {
        let mut base: Option<VisualState> = None;
        scheduler.start_with(move |handle| {
            move |tick: &FrameTick| {
                let Some(current) = surface.visual() else {
                    handle.cancel();
                    return;
                };
                let base = *base.get_or_insert(current);
                let done = self.duration_ms().is_some_and(|d| tick.elapsed_ms >= d);
                let state = if done { base } else { self.sample(tick.elapsed_ms, &base) };
                surface.apply(&state);
                if done {
                    handle.finish();
                }
            }
        })
    }
}

/// Circular progress indicator geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRing {
    pub radius: f32,
    pub stroke_width: f32,
}

impl ProgressRing {
    pub fn new(radius: f32, stroke_width: f32) -> Self {
        Self {
            radius: radius.max(0.0),
            stroke_width: stroke_width.max(0.0),
        }
    }

    /// Radius of the stroke's center line.
    pub fn normalized_radius(&self) -> f32 {
        (self.radius - self.stroke_width / 2.0).max(0.0)
    }

    pub fn circumference(&self) -> f32 {
        TAU * self.normalized_radius()
    }

    /// Dash offset that reveals `progress` of the ring.
    pub fn dash_offset(&self, progress: f32) -> f32 {
        self.circumference() * (1.0 - clamp01(progress))
    }

    /// Animate from `from` to `to` progress, reporting dash offsets.
    pub fn animate<F>(
        self,
        scheduler: &FrameScheduler,
        from: f32,
        to: f32,
        config: AnimationConfig,
        mut on_offset: F,
    ) -> FrameHandle
    where
        F: FnMut(f32) + 'static,
    {
        let spec = TweenSpec::new(clamp01(from), clamp01(to)).with_config(config);
        scheduler.animate(spec, move |frame| on_offset(self.dash_offset(frame.value)), || {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EasingId;
    use crate::surface::{MemorySurface, Surface, VisualProperty};

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0.0, 0), "0");
        assert_eq!(format_count(999.0, 0), "999");
        assert_eq!(format_count(1000.0, 0), "1,000");
        assert_eq!(format_count(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_count(-4500.0, 0), "-4,500");
        assert_eq!(format_count(-0.001, 1), "0.0");
        assert_eq!(format_count(f64::NAN, 2), "0");
    }

    #[test]
    fn test_counter_reaches_target_text() {
        let scheduler = FrameScheduler::new();
        let text = Rc::new(RefCell::new(String::new()));
        let t = text.clone();
        let counter = Counter::new(2500.0).prefix("$").suffix("+");
        counter.start(
            &scheduler,
            AnimationConfig::new(100.0).with_easing(EasingId::Linear),
            move |s| *t.borrow_mut() = s.to_string(),
        );

        scheduler.tick(0.0);
        assert_eq!(*text.borrow(), "$0+");
        scheduler.tick(50.0);
        assert_eq!(*text.borrow(), "$1,250+");
        scheduler.tick(100.0);
        assert_eq!(*text.borrow(), "$2,500+");
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_magnetic_hover_clamps_and_returns() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut hover = MagneticHover::new(0.5, 10.0);

        hover.pointer_move(Point::new(60.0, 50.0), bounds);
        assert!(approx_eq(hover.target().x, 5.0));

        hover.pointer_move(Point::new(200.0, 50.0), bounds);
        assert!(approx_eq(hover.target().x, 10.0));

        for _ in 0..200 {
            hover.step(REFERENCE_FRAME_MS);
        }
        assert_eq!(hover.offset(), hover.target());

        hover.pointer_leave();
        let mut settled = false;
        for _ in 0..200 {
            settled = hover.step(REFERENCE_FRAME_MS);
        }
        assert!(settled);
        assert_eq!(hover.offset(), Point::ZERO);
    }

    #[test]
    fn test_magnetic_hover_zero_delta_does_not_move() {
        let mut hover = MagneticHover::default();
        hover.pointer_move(Point::new(100.0, 0.0), Rect::new(0.0, 0.0, 10.0, 10.0));
        hover.step(0.0);
        assert_eq!(hover.offset(), Point::ZERO);
    }

    #[test]
    fn test_magnetic_hover_attach_writes_translation() {
        let scheduler = FrameScheduler::new();
        let surface = MemorySurface::shared(Rect::new(0.0, 0.0, 100.0, 100.0));
        let hover = Rc::new(RefCell::new(MagneticHover::new(1.0, 50.0).with_smoothing(1.0)));
        let handle = MagneticHover::attach(hover.clone(), &scheduler, SurfaceRef::new(&surface));

        hover.borrow_mut().pointer_move(Point::new(70.0, 50.0), Rect::new(0.0, 0.0, 100.0, 100.0));
        scheduler.tick(0.0);
        scheduler.tick(REFERENCE_FRAME_MS);
        assert!(approx_eq(surface.borrow().visual().translate_x, 20.0));

        drop(surface);
        scheduler.tick(2.0 * REFERENCE_FRAME_MS);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_ambient_float_and_pulse() {
        let base = VisualState::IDENTITY;
        let float = AmbientLoop::Float {
            amplitude_px: 10.0,
            period_ms: 1000.0,
        };
        assert!(approx_eq(float.sample(0.0, &base).translate_y, 0.0));
        assert!(approx_eq(float.sample(250.0, &base).translate_y, -10.0));
        assert!(float.duration_ms().is_none());

        let pulse = AmbientLoop::Pulse {
            min_scale: 1.0,
            max_scale: 1.2,
            period_ms: 1000.0,
        };
        assert!(approx_eq(pulse.sample(0.0, &base).scale, 1.0));
        assert!(approx_eq(pulse.sample(500.0, &base).scale, 1.2));
    }

    #[test]
    fn test_ambient_zero_period_is_static() {
        let float = AmbientLoop::Float {
            amplitude_px: 10.0,
            period_ms: 0.0,
        };
        assert_eq!(float.sample(123.0, &VisualState::IDENTITY), VisualState::IDENTITY);
    }

    #[test]
    fn test_shake_finishes_at_base() {
        let scheduler = FrameScheduler::new();
        let surface = MemorySurface::shared(Rect::default());
        surface.borrow_mut().apply(&VisualState::IDENTITY.with(VisualProperty::TranslateX, 3.0));
        let shake = AmbientLoop::Shake {
            amplitude_px: 8.0,
            period_ms: 100.0,
            duration_ms: 300.0,
        };
        let handle = shake.start(&scheduler, SurfaceRef::new(&surface));

        scheduler.tick(0.0);
        scheduler.tick(25.0);
        assert!(surface.borrow().visual().translate_x > 3.0);
        scheduler.tick(300.0);
        assert_eq!(surface.borrow().visual().translate_x, 3.0);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_progress_ring_offsets() {
        let ring = ProgressRing::new(52.0, 4.0);
        let c = ring.circumference();
        assert!(approx_eq(c, TAU * 50.0));
        assert!(approx_eq(ring.dash_offset(0.0), c));
        assert!(approx_eq(ring.dash_offset(0.25), c * 0.75));
        assert!(approx_eq(ring.dash_offset(2.0), 0.0));
    }

    #[test]
    fn test_progress_ring_animate() {
        let scheduler = FrameScheduler::new();
        let ring = ProgressRing::new(10.0, 0.0);
        let last = Rc::new(std::cell::Cell::new(-1.0));
        let l = last.clone();
        ring.animate(
            &scheduler,
            0.0,
            1.0,
            AnimationConfig::new(100.0).with_easing(EasingId::Linear),
            move |offset| l.set(offset),
        );
        scheduler.tick(0.0);
        assert!(approx_eq(last.get(), ring.circumference()));
        scheduler.tick(100.0);
        assert!(approx_eq(last.get(), 0.0));
    }
}
