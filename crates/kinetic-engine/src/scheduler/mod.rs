//! Per-frame callback scheduling.
//!
//! The host calls [`FrameScheduler::tick`] once per rendering frame with a
//! monotonic timestamp. Every started task runs at most once per tick until
//! its [`FrameHandle`] is cancelled or it finishes. Tasks started while a
//! tick is running first run on the following tick.

mod drivers;
mod tween;

pub use drivers::{AmbientLoop, Counter, MagneticHover, ProgressRing, format_count};
pub use tween::{TweenFrame, TweenSpec};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kinetic_config::SchedulerConfig;

use crate::easing::EasingId;
use crate::types::AnimationConfig;

/// Timing passed to a task on every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Host timestamp of this frame.
    pub now_ms: f64,
    /// Time since the task's first frame (0 on that frame).
    pub elapsed_ms: f64,
    /// Time since the task's previous frame (0 on the first).
    pub delta_ms: f64,
    /// Scheduler frame counter.
    pub frame: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Active,
    Cancelled,
    Finished,
}

/// Revocation handle for a scheduled task.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    state: Rc<Cell<TaskState>>,
}

impl FrameHandle {
    fn new() -> Self {
        Self {
            state: Rc::new(Cell::new(TaskState::Active)),
        }
    }

    /// Stop the task. No further invocations happen after this returns,
    /// including when called from inside the task's own callback.
    pub fn cancel(&self) {
        if self.state.get() == TaskState::Active {
            self.state.set(TaskState::Cancelled);
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.get() == TaskState::Active
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.get() == TaskState::Cancelled
    }

    /// Ran to its natural end.
    pub fn is_finished(&self) -> bool {
        self.state.get() == TaskState::Finished
    }

    pub(crate) fn finish(&self) {
        if self.state.get() == TaskState::Active {
            self.state.set(TaskState::Finished);
        }
    }
}

struct Task {
    handle: FrameHandle,
    first_ms: Option<f64>,
    last_ms: Option<f64>,
    callback: Box<dyn FnMut(&FrameTick)>,
}

struct SchedulerInner {
    tasks: Vec<Task>,
    frame: u64,
    defaults: AnimationConfig,
}

/// Single-threaded frame loop shared by every animation driver.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::with_defaults(AnimationConfig::default())
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FrameScheduler")
            .field("tasks", &inner.tasks.len())
            .field("frame", &inner.frame)
            .finish()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler whose tweens fall back to `defaults` for invalid timing.
    pub fn with_defaults(defaults: AnimationConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                tasks: Vec::new(),
                frame: 0,
                defaults,
            })),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        let defaults = AnimationConfig::new(config.default_duration_ms)
            .with_easing(EasingId::parse_or_linear(&config.easing))
            .sanitized(AnimationConfig::default().duration_ms);
        Self::with_defaults(defaults)
    }

    /// Default timing for drivers started without an explicit config.
    pub fn defaults(&self) -> AnimationConfig {
        self.inner.borrow().defaults
    }

    /// Run `callback` once per frame until the returned handle is cancelled.
    pub fn start<F>(&self, callback: F) -> FrameHandle
    where
        F: FnMut(&FrameTick) + 'static,
    {
        self.start_with(move |_| callback)
    }

    /// Like [`start`](Self::start), handing the task its own handle so it can
    /// stop itself.
    pub fn start_with<B, F>(&self, build: B) -> FrameHandle
    where
        B: FnOnce(FrameHandle) -> F,
        F: FnMut(&FrameTick) + 'static,
    {
        let handle = FrameHandle::new();
        let callback = build(handle.clone());
        self.inner.borrow_mut().tasks.push(Task {
            handle: handle.clone(),
            first_ms: None,
            last_ms: None,
            callback: Box::new(callback),
        });
        handle
    }

    /// Advance one frame.
    ///
    /// Must not be called from inside a task; a nested call only sees tasks
    /// started by the running tick.
    pub fn tick(&self, now_ms: f64) {
        let (mut running, frame) = {
            let mut inner = self.inner.borrow_mut();
            inner.frame += 1;
            (std::mem::take(&mut inner.tasks), inner.frame)
        };

        for task in running.iter_mut() {
            if !task.handle.is_active() {
                continue;
            }
            let first = *task.first_ms.get_or_insert(now_ms);
            let delta_ms = task.last_ms.map_or(0.0, |last| (now_ms - last).max(0.0));
            task.last_ms = Some(now_ms);

            let tick = FrameTick {
                now_ms,
                elapsed_ms: (now_ms - first).max(0.0),
                delta_ms,
                frame,
            };
            (task.callback)(&tick);
        }

        running.retain(|task| task.handle.is_active());

        let mut inner = self.inner.borrow_mut();
        let started_during_tick = std::mem::take(&mut inner.tasks);
        inner.tasks = running;
        inner.tasks.extend(started_during_tick);
        tracing::trace!(frame, active = inner.tasks.len(), "frame tick");
    }

    /// Tasks that will run on the next tick.
    pub fn active_count(&self) -> usize {
        self.inner
            .borrow()
            .tasks
            .iter()
            .filter(|t| t.handle.is_active())
            .count()
    }

    pub fn frame(&self) -> u64 {
        self.inner.borrow().frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_once_per_tick_with_elapsed() {
        let scheduler = FrameScheduler::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let _handle = scheduler.start(move |tick| s.borrow_mut().push((tick.elapsed_ms, tick.delta_ms)));

        scheduler.tick(100.0);
        scheduler.tick(116.0);
        scheduler.tick(150.0);
        assert_eq!(*seen.borrow(), vec![(0.0, 0.0), (16.0, 16.0), (50.0, 34.0)]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let scheduler = FrameScheduler::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let handle = scheduler.start(move |_| c.set(c.get() + 1));

        scheduler.tick(0.0);
        handle.cancel();
        handle.cancel();
        scheduler.tick(16.0);
        assert_eq!(calls.get(), 1);
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_cancel_inside_own_callback() {
        let scheduler = FrameScheduler::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let handle = scheduler.start_with(move |me| {
            move |_: &FrameTick| {
                c.set(c.get() + 1);
                me.cancel();
                me.cancel();
            }
        });

        scheduler.tick(0.0);
        scheduler.tick(16.0);
        assert_eq!(calls.get(), 1);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_started_during_tick_runs_next_tick() {
        let scheduler = FrameScheduler::new();
        let late = Rc::new(Cell::new(0));
        let spawned: Rc<RefCell<Option<FrameHandle>>> = Rc::new(RefCell::new(None));

        let sched = scheduler.clone();
        let l = late.clone();
        let slot = spawned.clone();
        let _outer = scheduler.start(move |_| {
            if slot.borrow().is_none() {
                let l = l.clone();
                *slot.borrow_mut() = Some(sched.start(move |_| l.set(l.get() + 1)));
            }
        });

        scheduler.tick(0.0);
        assert_eq!(late.get(), 0);
        scheduler.tick(16.0);
        assert_eq!(late.get(), 1);
        assert_eq!(scheduler.active_count(), 2);
    }

    #[test]
    fn test_independent_tasks_are_isolated() {
        let scheduler = FrameScheduler::new();
        let a = Rc::new(Cell::new(0));
        let b = Rc::new(Cell::new(0));
        let ac = a.clone();
        let bc = b.clone();
        let first = scheduler.start(move |_| ac.set(ac.get() + 1));
        let _second = scheduler.start(move |_| bc.set(bc.get() + 1));

        scheduler.tick(0.0);
        first.cancel();
        scheduler.tick(16.0);
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn test_from_config_sanitizes_defaults() {
        let config = SchedulerConfig {
            default_duration_ms: -5.0,
            easing: "nope".to_string(),
        };
        let scheduler = FrameScheduler::from_config(&config);
        assert_eq!(scheduler.defaults().duration_ms, 1000.0);
        assert_eq!(scheduler.defaults().easing, EasingId::Linear);
    }
}
