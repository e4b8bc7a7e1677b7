//! Finite property tweens driven by the frame scheduler.

use crate::math::lerp;
use crate::surface::{SurfaceRef, VisualProperty};
use crate::types::{AnimationConfig, TimelineSample};

use super::{FrameHandle, FrameScheduler, FrameTick};

/// A numeric tween from `from` to `to` over an [`AnimationConfig`] timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSpec {
    pub from: f32,
    pub to: f32,
    pub config: AnimationConfig,
}

/// One sampled frame of a tween.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenFrame {
    /// Interpolated value.
    pub value: f32,
    /// Linear timeline progress in [0, 1], direction applied.
    pub progress: f32,
    /// Progress after easing.
    pub eased: f32,
    pub iteration: u32,
    /// This is the last frame.
    pub finished: bool,
}

impl TweenSpec {
    pub fn new(from: f32, to: f32) -> Self {
        Self {
            from,
            to,
            config: AnimationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AnimationConfig) -> Self {
        self.config = config;
        self
    }

    /// Sample the tween at `elapsed_ms` since its first frame.
    pub fn frame_at(&self, elapsed_ms: f64) -> TweenFrame {
        let TimelineSample {
            progress,
            iteration,
            finished,
            ..
        } = self.config.sample(elapsed_ms);
        let eased = self.config.easing.evaluate(progress);
        TweenFrame {
            value: lerp(self.from, self.to, eased),
            progress,
            eased,
            iteration,
            finished,
        }
    }
}

impl FrameScheduler {
    /// Drive `on_update` with the tween's value every frame until the
    /// timeline ends, then call `on_complete` once.
    ///
    /// Invalid timing falls back to the scheduler defaults. A cancelled tween
    /// never completes; neither does one with an infinite repeat.
    pub fn animate<U, C>(&self, spec: TweenSpec, mut on_update: U, on_complete: C) -> FrameHandle
    where
        U: FnMut(&TweenFrame) + 'static,
        C: FnOnce() + 'static,
    {
        let spec = TweenSpec {
            config: spec.config.sanitized(self.defaults().duration_ms),
            ..spec
        };
        let mut on_complete = Some(on_complete);

        self.start_with(move |handle| {
            move |tick: &FrameTick| {
                let frame = spec.frame_at(tick.elapsed_ms);
                on_update(&frame);
                if frame.finished && handle.is_active() {
                    handle.finish();
                    if let Some(done) = on_complete.take() {
                        done();
                    }
                }
            }
        })
    }

    /// Tween one visual property of `surface`.
    ///
    /// Every frame checks liveness first; once the surface is gone the tick
    /// does nothing and the tween stops without completing.
    pub fn animate_surface<C>(
        &self,
        surface: SurfaceRef,
        property: VisualProperty,
        spec: TweenSpec,
        on_complete: C,
    ) -> FrameHandle
    where
        C: FnOnce() + 'static,
    {
        let spec = TweenSpec {
            config: spec.config.sanitized(self.defaults().duration_ms),
            ..spec
        };
        let mut on_complete = Some(on_complete);

        self.start_with(move |handle| {
            move |tick: &FrameTick| {
                let frame = spec.frame_at(tick.elapsed_ms);
                if !surface.set_property(property, frame.value) {
                    tracing::debug!(surface = ?surface.id(), ?property, "surface gone, stopping tween");
                    handle.cancel();
                    return;
                }
                if frame.finished {
                    handle.finish();
                    if let Some(done) = on_complete.take() {
                        done();
                    }
                }
            }
        })
    }
}
