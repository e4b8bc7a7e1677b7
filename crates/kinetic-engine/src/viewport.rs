//! Viewport intersection and scroll progress tracking.
//!
//! Host scroll and resize signals only mark the tracker dirty. Geometry is
//! recomputed on [`ScrollTracker::flush`], at most once per call and never
//! more often than `min_interval_ms`, so a burst of scroll events costs one
//! pass. Observations are published through a [`Dispatcher`].

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use kinetic_config::ViewportConfig;

use crate::dispatch::{Dispatcher, Subscription};
use crate::math::{clamp01, map_range};
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::surface::{Rect, SurfaceRef};
use crate::types::SurfaceId;

/// Smallest element height used as a denominator.
const MIN_HEIGHT_PX: f32 = 1e-3;

/// Portion of the viewport a scrubbed element's top travels through.
///
/// Fractions of the viewport height: `start = 1.0, end = 0.0` scrubs from
/// the element's top entering at the bottom edge to reaching the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrubWindow {
    pub start: f32,
    pub end: f32,
}

impl Default for ScrubWindow {
    fn default() -> Self {
        Self { start: 1.0, end: 0.0 }
    }
}

/// How an element's progress is derived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrackMode {
    /// 0 before entering, 1 once fully scrolled past.
    #[default]
    Reveal,
    Scrub(ScrubWindow),
}

/// Host viewport signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewportSignal {
    Scroll { offset_y: f32 },
    /// Also sent on orientation changes.
    Resize { width: f32, height: f32 },
}

/// Derived geometric relationship of one element to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollObservation {
    pub element_id: SurfaceId,
    /// In [0, 1], never NaN.
    pub progress: f32,
    /// Scroll speed in px/ms since the previous recomputation.
    pub velocity: f32,
    pub in_view: bool,
}

impl ScrollObservation {
    fn offscreen(element_id: SurfaceId, velocity: f32) -> Self {
        Self {
            element_id,
            progress: 0.0,
            velocity,
            in_view: false,
        }
    }
}

/// Compute one observation from viewport-relative geometry.
pub fn observe(
    element_id: SurfaceId,
    top: f32,
    height: f32,
    viewport_height: f32,
    mode: TrackMode,
    velocity: f32,
) -> ScrollObservation {
    let vh = viewport_height;
    if !(top.is_finite() && height.is_finite() && vh.is_finite()) || vh <= 0.0 {
        return ScrollObservation::offscreen(element_id, velocity);
    }

    let height = height.max(0.0);
    let bottom = top + height;
    let progress = match mode {
        TrackMode::Reveal => clamp01((vh - top) / (vh + height.max(MIN_HEIGHT_PX))),
        TrackMode::Scrub(window) => clamp01(map_range(top, window.start * vh, window.end * vh, 0.0, 1.0)),
    };

    ScrollObservation {
        element_id,
        progress,
        velocity,
        in_view: bottom > 0.0 && top < vh,
    }
}

#[derive(Debug)]
struct Tracked {
    surface: SurfaceRef,
    mode: TrackMode,
    last: Option<ScrollObservation>,
}

/// Maintains a [`ScrollObservation`] per registered element.
#[derive(Debug)]
pub struct ScrollTracker {
    elements: Vec<Tracked>,
    scroll_y: f32,
    viewport_width: f32,
    viewport_height: f32,
    min_interval_ms: f64,
    dirty: bool,
    /// Velocity published by the previous recomputation. While non-zero the
    /// tracker keeps recomputing so a stopped scroll decays to 0.
    last_velocity: f32,
    /// Time and scroll offset of the previous recomputation.
    last_flush: Option<(f64, f32)>,
    observations: Dispatcher<ScrollObservation>,
}

impl ScrollTracker {
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            elements: Vec::new(),
            scroll_y: 0.0,
            viewport_width,
            viewport_height,
            min_interval_ms: 16.0,
            dirty: true,
            last_velocity: 0.0,
            last_flush: None,
            observations: Dispatcher::new(),
        }
    }

    pub fn from_config(config: &ViewportConfig, viewport_width: f32, viewport_height: f32) -> Self {
        Self::new(viewport_width, viewport_height).with_min_interval(config.min_interval_ms)
    }

    pub fn with_min_interval(mut self, min_interval_ms: f64) -> Self {
        self.min_interval_ms = if min_interval_ms.is_finite() {
            min_interval_ms.max(0.0)
        } else {
            0.0
        };
        self
    }

    /// Track `surface`; its bounds are read in document coordinates.
    pub fn register(&mut self, surface: SurfaceRef, mode: TrackMode) -> SurfaceId {
        let id = surface.id();
        self.elements.retain(|t| t.surface.id() != id);
        self.elements.push(Tracked {
            surface,
            mode,
            last: None,
        });
        self.dirty = true;
        id
    }

    pub fn unregister(&mut self, id: SurfaceId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|t| t.surface.id() != id);
        before != self.elements.len()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn viewport(&self) -> (f32, f32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    /// Record a host signal. Nothing is recomputed until the next flush.
    pub fn on_signal(&mut self, signal: ViewportSignal) {
        match signal {
            ViewportSignal::Scroll { offset_y } => self.scroll_y = offset_y,
            ViewportSignal::Resize { width, height } => {
                self.viewport_width = width;
                self.viewport_height = height;
            }
        }
        self.dirty = true;
    }

    /// Recompute pending geometry and publish it. Returns the number of
    /// observations published (0 when clean or throttled).
    pub fn flush(&mut self, now_ms: f64) -> usize {
        let Some(observations) = self.recompute(now_ms) else {
            return 0;
        };
        for obs in &observations {
            self.observations.emit(obs);
        }
        observations.len()
    }

    fn recompute(&mut self, now_ms: f64) -> Option<Vec<ScrollObservation>> {
        if !self.dirty && self.last_velocity == 0.0 {
            return None;
        }
        if let Some((last_ms, _)) = self.last_flush {
            if now_ms - last_ms < self.min_interval_ms {
                return None;
            }
        }

        let velocity = match self.last_flush {
            Some((last_ms, last_y)) if now_ms > last_ms => {
                let v = (self.scroll_y - last_y).abs() / (now_ms - last_ms) as f32;
                if v.is_finite() { v } else { 0.0 }
            }
            _ => 0.0,
        };
        self.last_flush = Some((now_ms, self.scroll_y));
        self.last_velocity = velocity;
        self.dirty = false;

        let scroll_y = self.scroll_y;
        let vh = self.viewport_height;
        let mut observations = Vec::with_capacity(self.elements.len());
        self.elements.retain_mut(|tracked| {
            let Some(Rect { y, height, .. }) = tracked.surface.bounds() else {
                tracing::debug!(element = ?tracked.surface.id(), "tracked surface gone, unregistering");
                return false;
            };
            let obs = observe(tracked.surface.id(), y - scroll_y, height, vh, tracked.mode, velocity);
            tracked.last = Some(obs);
            observations.push(obs);
            true
        });
        tracing::trace!(count = observations.len(), velocity, "viewport recomputed");
        Some(observations)
    }

    /// Latest observation for `id`, if it has been computed.
    pub fn observation(&self, id: SurfaceId) -> Option<ScrollObservation> {
        self.elements
            .iter()
            .find(|t| t.surface.id() == id)
            .and_then(|t| t.last)
    }

    pub fn observations(&self) -> &Dispatcher<ScrollObservation> {
        &self.observations
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ScrollObservation) + 'static,
    {
        self.observations.subscribe(callback)
    }

    /// Feed signals from a shared host dispatcher into `tracker`.
    pub fn listen(tracker: &Rc<RefCell<Self>>, signals: &Dispatcher<ViewportSignal>) -> Subscription {
        let weak = Rc::downgrade(tracker);
        signals.subscribe(move |signal| {
            if let Some(tracker) = weak.upgrade() {
                tracker.borrow_mut().on_signal(*signal);
            }
        })
    }

    /// Flush once per frame. Subscribers are notified after the tracker is
    /// released, so they may read it.
    pub fn drive(tracker: &Rc<RefCell<Self>>, scheduler: &FrameScheduler) -> FrameHandle {
        let weak = Rc::downgrade(tracker);
        scheduler.start_with(move |handle| {
            move |tick: &crate::scheduler::FrameTick| {
                let Some(tracker) = weak.upgrade() else {
                    handle.cancel();
                    return;
                };
                let (observations, dispatcher) = {
                    let mut t = tracker.borrow_mut();
                    (t.recompute(tick.now_ms), t.observations.clone())
                };
                for obs in observations.iter().flatten() {
                    dispatcher.emit(obs);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use std::cell::Cell;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_reveal_progress() {
        let obs = observe(SurfaceId(1), 0.0, 400.0, 800.0, TrackMode::Reveal, 0.0);
        assert!(approx_eq(obs.progress, 0.667));
        assert!(obs.in_view);

        let below = observe(SurfaceId(1), 900.0, 400.0, 800.0, TrackMode::Reveal, 0.0);
        assert_eq!(below.progress, 0.0);
        assert!(!below.in_view);
    }

    #[test]
    fn test_zero_height_element() {
        let obs = observe(SurfaceId(1), 400.0, 0.0, 800.0, TrackMode::Reveal, 0.0);
        assert!(approx_eq(obs.progress, 0.5));
        assert!(!obs.progress.is_nan());
    }

    #[test]
    fn test_non_finite_geometry_is_offscreen() {
        let obs = observe(SurfaceId(1), f32::NAN, 100.0, 800.0, TrackMode::Reveal, 2.0);
        assert_eq!(obs.progress, 0.0);
        assert!(!obs.in_view);

        let zero_vh = observe(SurfaceId(1), 0.0, 100.0, 0.0, TrackMode::Reveal, 0.0);
        assert_eq!(zero_vh.progress, 0.0);
    }

    #[test]
    fn test_scrub_window() {
        let mode = TrackMode::Scrub(ScrubWindow::default());
        assert_eq!(observe(SurfaceId(1), 800.0, 100.0, 800.0, mode, 0.0).progress, 0.0);
        assert!(approx_eq(observe(SurfaceId(1), 400.0, 100.0, 800.0, mode, 0.0).progress, 0.5));
        assert_eq!(observe(SurfaceId(1), -50.0, 100.0, 800.0, mode, 0.0).progress, 1.0);

        let degenerate = TrackMode::Scrub(ScrubWindow { start: 0.5, end: 0.5 });
        assert_eq!(observe(SurfaceId(1), 100.0, 100.0, 800.0, degenerate, 0.0).progress, 0.0);
    }

    #[test]
    fn test_flush_coalesces_and_throttles() {
        let surface = MemorySurface::shared(Rect::new(0.0, 1000.0, 100.0, 400.0));
        let mut tracker = ScrollTracker::new(1024.0, 800.0);
        let id = tracker.register(SurfaceRef::new(&surface), TrackMode::Reveal);

        let published = Rc::new(Cell::new(0));
        let p = published.clone();
        let _sub = tracker.subscribe(move |_| p.set(p.get() + 1));

        assert_eq!(tracker.flush(0.0), 1);
        assert_eq!(tracker.observation(id).unwrap().velocity, 0.0);
        assert!(!tracker.observation(id).unwrap().in_view);

        for y in [100.0, 200.0, 300.0, 400.0] {
            tracker.on_signal(ViewportSignal::Scroll { offset_y: y });
        }
        // Too soon after the previous pass.
        assert_eq!(tracker.flush(8.0), 0);
        assert_eq!(tracker.flush(20.0), 1);
        assert_eq!(published.get(), 2);

        let obs = tracker.observation(id).unwrap();
        assert!(approx_eq(obs.velocity, 20.0));
        assert!(obs.in_view);

        // No signal since: one more pass publishes the stopped velocity.
        assert_eq!(tracker.flush(100.0), 1);
        assert_eq!(tracker.observation(id).unwrap().velocity, 0.0);
        assert_eq!(published.get(), 3);

        // Clean and at rest: nothing to publish.
        assert_eq!(tracker.flush(200.0), 0);
    }

    #[test]
    fn test_velocity_decays_when_scrolling_stops() {
        let surface = MemorySurface::shared(Rect::new(0.0, 600.0, 100.0, 400.0));
        let tracker = Rc::new(RefCell::new(ScrollTracker::new(1024.0, 800.0)));
        let id = tracker
            .borrow_mut()
            .register(SurfaceRef::new(&surface), TrackMode::Reveal);
        let scheduler = FrameScheduler::new();
        let _driver = ScrollTracker::drive(&tracker, &scheduler);

        scheduler.tick(0.0);
        tracker.borrow_mut().on_signal(ViewportSignal::Scroll { offset_y: 160.0 });
        scheduler.tick(16.0);
        assert!(approx_eq(tracker.borrow().observation(id).unwrap().velocity, 10.0));

        // Inside the throttle window the last velocity stands.
        scheduler.tick(24.0);
        assert!(approx_eq(tracker.borrow().observation(id).unwrap().velocity, 10.0));

        scheduler.tick(40.0);
        let obs = tracker.borrow().observation(id).unwrap();
        assert_eq!(obs.velocity, 0.0);
        assert!(obs.in_view);
    }

    #[test]
    fn test_resize_marks_dirty() {
        let surface = MemorySurface::shared(Rect::new(0.0, 0.0, 100.0, 400.0));
        let mut tracker = ScrollTracker::new(1024.0, 800.0).with_min_interval(0.0);
        let id = tracker.register(SurfaceRef::new(&surface), TrackMode::Reveal);
        tracker.flush(0.0);

        tracker.on_signal(ViewportSignal::Resize {
            width: 400.0,
            height: 400.0,
        });
        assert_eq!(tracker.flush(1.0), 1);
        assert!(approx_eq(tracker.observation(id).unwrap().progress, 0.5));
        assert_eq!(tracker.viewport(), (400.0, 400.0));
    }

    #[test]
    fn test_dead_surfaces_are_dropped() {
        let surface = MemorySurface::shared(Rect::new(0.0, 0.0, 100.0, 100.0));
        let mut tracker = ScrollTracker::new(1024.0, 800.0);
        tracker.register(SurfaceRef::new(&surface), TrackMode::Reveal);
        drop(surface);
        assert_eq!(tracker.flush(0.0), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_listen_and_drive() {
        let surface = MemorySurface::shared(Rect::new(0.0, 800.0, 100.0, 400.0));
        let tracker = Rc::new(RefCell::new(ScrollTracker::new(1024.0, 800.0)));
        let id = tracker
            .borrow_mut()
            .register(SurfaceRef::new(&surface), TrackMode::Reveal);

        let signals: Dispatcher<ViewportSignal> = Dispatcher::new();
        let _listener = ScrollTracker::listen(&tracker, &signals);
        let scheduler = FrameScheduler::new();
        let _driver = ScrollTracker::drive(&tracker, &scheduler);

        // Subscribers may read the tracker during delivery.
        let reader = tracker.clone();
        let seen = Rc::new(Cell::new(0.0));
        let s = seen.clone();
        let _sub = tracker
            .borrow()
            .subscribe(move |obs| s.set(reader.borrow().observation(obs.element_id).map_or(-1.0, |o| o.progress)));

        scheduler.tick(0.0);
        signals.emit(&ViewportSignal::Scroll { offset_y: 800.0 });
        scheduler.tick(16.0);
        assert!(approx_eq(seen.get(), 0.667));
        assert!(tracker.borrow().observation(id).unwrap().in_view);
    }
}
