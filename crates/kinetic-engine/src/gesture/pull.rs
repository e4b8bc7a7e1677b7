use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use kinetic_config::GestureConfig;

use super::GestureEvent;
use crate::types::MotionStatus;

/// Future returned by a refresh callback.
pub type RefreshFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

type RefreshCallback = Box<dyn FnMut() -> RefreshFuture>;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct PullState {
    /// Pointer y at arm time, `None` when not armed.
    origin_y: Option<f32>,
    distance: f32,
    refreshing: bool,
}

impl PullState {
    fn settle(&mut self) {
        self.origin_y = None;
        self.distance = 0.0;
        self.refreshing = false;
    }
}

/// Outcome of releasing a pull.
pub struct PullRelease {
    pub event: GestureEvent,
    /// Present when the refresh callback was invoked.
    pub task: Option<RefreshTask>,
}

impl std::fmt::Debug for PullRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullRelease")
            .field("event", &self.event)
            .field("refreshing", &self.task.is_some())
            .finish()
    }
}

/// Pull-to-refresh recognizer with a single outstanding refresh.
pub struct PullToRefresh {
    threshold_px: f32,
    resistance: f32,
    max_factor: f32,
    state: Rc<RefCell<PullState>>,
    on_refresh: RefreshCallback,
}

impl std::fmt::Debug for PullToRefresh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullToRefresh")
            .field("threshold_px", &self.threshold_px)
            .field("resistance", &self.resistance)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl PullToRefresh {
    /// `on_refresh` is invoked once per triggered release; the pull stays in
    /// the refreshing state until the returned future settles.
    pub fn new<F, Fut>(mut on_refresh: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self {
            threshold_px: 100.0,
            resistance: 0.6,
            max_factor: 1.5,
            state: Rc::new(RefCell::new(PullState::default())),
            on_refresh: Box::new(move || Box::pin(on_refresh())),
        }
    }

    pub fn with_config<F, Fut>(config: &GestureConfig, on_refresh: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self::new(on_refresh)
            .with_threshold(config.pull_threshold_px)
            .with_resistance(config.pull_resistance)
            .with_max_factor(config.pull_max_factor)
    }

    pub fn with_threshold(mut self, threshold_px: f32) -> Self {
        if threshold_px.is_finite() && threshold_px > 0.0 {
            self.threshold_px = threshold_px;
        } else {
            tracing::warn!(threshold_px, "invalid pull threshold, keeping {}", self.threshold_px);
        }
        self
    }

    /// Damping factor, must be in (0, 1).
    pub fn with_resistance(mut self, resistance: f32) -> Self {
        if resistance > 0.0 && resistance < 1.0 {
            self.resistance = resistance;
        } else {
            tracing::warn!(resistance, "pull resistance must be in (0, 1), keeping {}", self.resistance);
        }
        self
    }

    pub fn with_max_factor(mut self, max_factor: f32) -> Self {
        if max_factor.is_finite() && max_factor >= 1.0 {
            self.max_factor = max_factor;
        } else {
            tracing::warn!(max_factor, "pull cap below the threshold, keeping {}", self.max_factor);
        }
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold_px
    }

    pub fn max_distance(&self) -> f32 {
        self.threshold_px * self.max_factor
    }

    pub fn distance(&self) -> f32 {
        self.state.borrow().distance
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.borrow().refreshing
    }

    pub fn is_armed(&self) -> bool {
        self.state.borrow().origin_y.is_some()
    }

    /// Pulled far enough to have visibly engaged.
    pub fn is_engaged(&self) -> bool {
        let state = self.state.borrow();
        state.origin_y.is_some() && state.distance > 0.0
    }

    /// Damped, capped distance for a raw downward drag.
    pub fn damped(&self, raw_delta: f32) -> f32 {
        if !raw_delta.is_finite() {
            return 0.0;
        }
        (raw_delta.max(0.0) * self.resistance).min(self.max_distance())
    }

    /// Pointer-down. Arms only when the container is at its top edge and no
    /// refresh is outstanding.
    pub fn arm(&mut self, scroll_top: f32, pointer_y: f32) -> bool {
        let mut state = self.state.borrow_mut();
        if state.refreshing {
            tracing::trace!("pull ignored while refreshing");
            return false;
        }
        if scroll_top > 0.0 {
            return false;
        }
        state.origin_y = Some(pointer_y);
        state.distance = 0.0;
        true
    }

    /// Pointer moved while armed; reports progress once the pull engages.
    pub fn drag(&mut self, pointer_y: f32) -> Option<GestureEvent> {
        let origin = self.state.borrow().origin_y?;
        let distance = self.damped(pointer_y - origin);
        let mut state = self.state.borrow_mut();
        if distance == 0.0 && state.distance == 0.0 {
            return None;
        }
        state.distance = distance;
        Some(GestureEvent::PullToRefresh {
            distance,
            triggered: false,
        })
    }

    /// Pointer released while armed.
    ///
    /// At or past the threshold the refresh callback runs and the returned
    /// task settles the pull; below it the pull snaps back to 0.
    pub fn release(&mut self) -> Option<PullRelease> {
        let distance = {
            let mut state = self.state.borrow_mut();
            state.origin_y.take()?;
            state.distance
        };

        if distance >= self.threshold_px {
            self.state.borrow_mut().refreshing = true;
            tracing::debug!(distance, "pull triggered refresh");
            let future = (self.on_refresh)();
            Some(PullRelease {
                event: GestureEvent::PullToRefresh {
                    distance,
                    triggered: true,
                },
                task: Some(RefreshTask {
                    future,
                    state: self.state.clone(),
                    settled: false,
                }),
            })
        } else {
            self.state.borrow_mut().settle();
            Some(PullRelease {
                event: GestureEvent::PullToRefresh {
                    distance: 0.0,
                    triggered: false,
                },
                task: None,
            })
        }
    }

    /// Abandon an armed pull without refreshing.
    pub fn cancel(&mut self) {
        let mut state = self.state.borrow_mut();
        if !state.refreshing {
            state.settle();
        }
    }

    pub fn status(&self) -> MotionStatus {
        let state = self.state.borrow();
        MotionStatus {
            progress: crate::math::clamp01(state.distance / self.threshold_px),
            is_active: state.origin_y.is_some() || state.refreshing,
            is_animating: state.distance > 0.0,
        }
    }
}

/// The outstanding refresh.
///
/// Resolves with the callback's result, unchanged. Settling (or dropping the
/// task before it settles) resets the pull distance and clears refreshing.
pub struct RefreshTask {
    future: RefreshFuture,
    state: Rc<RefCell<PullState>>,
    settled: bool,
}

impl std::fmt::Debug for RefreshTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTask")
            .field("settled", &self.settled)
            .finish()
    }
}

impl Future for RefreshTask {
    type Output = anyhow::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.settled {
            return Poll::Ready(Ok(()));
        }
        match this.future.as_mut().poll(cx) {
            Poll::Ready(result) => {
                this.settled = true;
                this.state.borrow_mut().settle();
                if let Err(err) = &result {
                    tracing::debug!(%err, "refresh callback failed");
                }
                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        if !self.settled {
            self.state.borrow_mut().settle();
        }
    }
}
