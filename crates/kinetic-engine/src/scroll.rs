//! Horizontal scroll-within-vertical-scroll and scroll snapping.

use std::cell::RefCell;
use std::rc::Rc;

use kinetic_config::ViewportConfig;

use crate::easing::EasingId;
use crate::math::{clamp01, lerp};
use crate::scheduler::{FrameHandle, FrameScheduler, FrameTick};
use crate::surface::{SurfaceRef, VisualProperty};
use crate::types::MotionStatus;

/// Maps vertical scroll progress onto a horizontal translation of wider
/// inner content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalScroll {
    pub content_width: f32,
    pub container_width: f32,
}

impl HorizontalScroll {
    pub fn new(content_width: f32, container_width: f32) -> Self {
        Self {
            content_width,
            container_width,
        }
    }

    /// Distance the content can travel; 0 when it fits.
    pub fn max_offset(&self) -> f32 {
        let travel = self.content_width - self.container_width;
        if travel.is_finite() { travel.max(0.0) } else { 0.0 }
    }

    pub fn offset(&self, progress: f32) -> f32 {
        clamp01(progress) * self.max_offset()
    }

    /// Translation to apply to the content (never positive).
    pub fn translate_x(&self, progress: f32) -> f32 {
        let offset = self.offset(progress);
        if offset == 0.0 { 0.0 } else { -offset }
    }

    pub fn apply(&self, content: &SurfaceRef, progress: f32) -> bool {
        content.set_property(VisualProperty::TranslateX, self.translate_x(progress))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SnapFlight {
    from: f32,
    index: usize,
    start_ms: f64,
}

/// Snap-to-nearest-point scrolling with one smooth scroll in flight at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollSnap {
    points: Vec<f32>,
    current_index: usize,
    duration_ms: f64,
    easing: EasingId,
    flight: Option<SnapFlight>,
    offset: f32,
}

impl ScrollSnap {
    pub fn new(points: Vec<f32>) -> Self {
        Self {
            points,
            current_index: 0,
            duration_ms: 400.0,
            easing: EasingId::EaseOutCubic,
            flight: None,
            offset: 0.0,
        }
    }

    pub fn from_config(config: &ViewportConfig, points: Vec<f32>) -> Self {
        Self::new(points)
            .with_duration(config.snap_duration_ms)
            .with_easing(EasingId::parse_or_linear(&config.snap_easing))
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = if duration_ms.is_finite() && duration_ms >= 0.0 {
            duration_ms
        } else {
            tracing::warn!(duration_ms, "invalid snap duration, using 400ms");
            400.0
        };
        self
    }

    pub fn with_easing(mut self, easing: EasingId) -> Self {
        self.easing = easing;
        self
    }

    pub fn points(&self) -> &[f32] {
        &self.points
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Offset last reported by [`tick`](Self::tick) or passed to a release.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn is_animating(&self) -> bool {
        self.flight.is_some()
    }

    /// Index of the snap point nearest `offset`; ties go to the lower index.
    pub fn nearest(&self, offset: f32) -> Option<usize> {
        if !offset.is_finite() {
            return None;
        }
        let mut best: Option<(usize, f32)> = None;
        for (i, point) in self.points.iter().enumerate() {
            let d = (point - offset).abs();
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Drag released at `offset`: start snapping to the nearest point.
    ///
    /// Ignored (returns `None`) while a snap is in flight.
    pub fn release(&mut self, offset: f32, now_ms: f64) -> Option<usize> {
        if self.flight.is_some() {
            tracing::trace!("snap in flight, release ignored");
            return None;
        }
        let index = self.nearest(offset)?;
        self.begin(offset, index, now_ms);
        Some(index)
    }

    /// Programmatic snap from `offset` to `index`.
    pub fn snap_to(&mut self, index: usize, offset: f32, now_ms: f64) -> bool {
        if self.flight.is_some() || index >= self.points.len() || !offset.is_finite() {
            return false;
        }
        self.begin(offset, index, now_ms);
        true
    }

    fn begin(&mut self, from: f32, index: usize, now_ms: f64) {
        self.offset = from;
        self.flight = Some(SnapFlight {
            from,
            index,
            start_ms: now_ms,
        });
    }

    /// Scroll offset for this frame while a snap is in flight.
    pub fn tick(&mut self, now_ms: f64) -> Option<f32> {
        let flight = self.flight?;
        let to = self.points[flight.index];
        let progress = if self.duration_ms > 0.0 {
            clamp01(((now_ms - flight.start_ms) / self.duration_ms) as f32)
        } else {
            1.0
        };

        if progress >= 1.0 {
            self.offset = to;
            self.current_index = flight.index;
            self.flight = None;
        } else {
            self.offset = lerp(flight.from, to, self.easing.evaluate(progress));
        }
        Some(self.offset)
    }

    pub fn status(&self) -> MotionStatus {
        let progress = match self.flight {
            Some(f) => {
                let to = self.points[f.index];
                let span = to - f.from;
                if span == 0.0 { 1.0 } else { clamp01((self.offset - f.from) / span) }
            }
            None => 1.0,
        };
        MotionStatus {
            progress,
            is_active: self.flight.is_some(),
            is_animating: self.flight.is_some(),
        }
    }

    /// Report offsets to `on_offset` every frame a snap is in flight.
    pub fn drive<F>(snap: &Rc<RefCell<Self>>, scheduler: &FrameScheduler, mut on_offset: F) -> FrameHandle
    where
        F: FnMut(f32) + 'static,
    {
        let weak = Rc::downgrade(snap);
        scheduler.start_with(move |handle| {
            move |tick: &FrameTick| {
                let Some(snap) = weak.upgrade() else {
                    handle.cancel();
                    return;
                };
                let offset = snap.borrow_mut().tick(tick.now_ms);
                if let Some(offset) = offset {
                    on_offset(offset);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemorySurface, Rect, Surface};

    #[test]
    fn test_horizontal_translation() {
        let h = HorizontalScroll::new(3000.0, 1000.0);
        assert_eq!(h.max_offset(), 2000.0);
        assert_eq!(h.translate_x(0.5), -1000.0);
        assert_eq!(h.translate_x(2.0), -2000.0);
    }

    #[test]
    fn test_horizontal_no_negative_overscroll() {
        let h = HorizontalScroll::new(800.0, 1000.0);
        assert_eq!(h.max_offset(), 0.0);
        assert_eq!(h.translate_x(1.0), 0.0);

        let surface = MemorySurface::shared(Rect::default());
        assert!(h.apply(&SurfaceRef::new(&surface), 0.7));
        assert_eq!(surface.borrow().visual().translate_x, 0.0);
    }

    #[test]
    fn test_nearest_ties_go_low() {
        let snap = ScrollSnap::new(vec![0.0, 100.0, 200.0]);
        assert_eq!(snap.nearest(40.0), Some(0));
        assert_eq!(snap.nearest(50.0), Some(0));
        assert_eq!(snap.nearest(151.0), Some(2));
        assert_eq!(snap.nearest(f32::NAN), None);
        assert_eq!(ScrollSnap::new(Vec::new()).nearest(0.0), None);
    }

    #[test]
    fn test_release_runs_single_snap() {
        let mut snap = ScrollSnap::new(vec![0.0, 100.0, 200.0])
            .with_duration(100.0)
            .with_easing(EasingId::Linear);

        assert_eq!(snap.release(130.0, 0.0), Some(1));
        assert!(snap.is_animating());
        // Concurrent request is ignored.
        assert_eq!(snap.release(190.0, 10.0), None);

        assert_eq!(snap.tick(50.0), Some(115.0));
        assert_eq!(snap.tick(100.0), Some(100.0));
        assert!(!snap.is_animating());
        assert_eq!(snap.current_index(), 1);
        assert_eq!(snap.tick(120.0), None);

        assert_eq!(snap.release(190.0, 200.0), Some(2));
    }

    #[test]
    fn test_snap_to_and_status() {
        let mut snap = ScrollSnap::new(vec![0.0, 100.0]).with_duration(0.0);
        assert!(!snap.snap_to(5, 0.0, 0.0));
        assert!(snap.snap_to(1, 0.0, 0.0));
        assert!(snap.status().is_active);
        assert_eq!(snap.tick(0.0), Some(100.0));
        assert_eq!(snap.status().progress, 1.0);
        assert!(!snap.status().is_animating);
    }

    #[test]
    fn test_drive_reports_offsets() {
        let scheduler = FrameScheduler::new();
        let snap = Rc::new(RefCell::new(
            ScrollSnap::new(vec![0.0, 300.0])
                .with_duration(100.0)
                .with_easing(EasingId::Linear),
        ));
        let offsets = Rc::new(RefCell::new(Vec::new()));
        let o = offsets.clone();
        let _handle = ScrollSnap::drive(&snap, &scheduler, move |v| o.borrow_mut().push(v));

        snap.borrow_mut().release(200.0, 0.0);
        scheduler.tick(50.0);
        scheduler.tick(100.0);
        scheduler.tick(150.0);
        assert_eq!(*offsets.borrow(), vec![250.0, 300.0]);
    }
}
