//! Enter/exit transitions for whole surfaces.
//!
//! This module provides:
//! - `TransitionKind`: the built-in presets (fade, slide, scale, layered)
//! - `TransitionConfig`: per-call options
//! - `TransitionOrchestrator`: runs at most one transition per surface
//! - `TransitionCompletion`: a future that resolves when a transition settles
//!
//! A transition registers its keyframe curve under a unique name, samples it
//! on every scheduler frame and releases the registration when it completes,
//! is cancelled, or its surface is unmounted.
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = TransitionOrchestrator::new(registry, scheduler.clone());
//! let done = orchestrator.transition_in(&panel, TransitionConfig::new(TransitionKind::Fade));
//! // host loop: scheduler.tick(now) ...
//! assert_eq!(pollster::block_on(done), TransitionOutcome::Completed);
//! ```

mod presets;

pub use presets::{
    DEFAULT_SLIDE_DISTANCE, SlideFrom, TransitionDirection, TransitionKind, content_keyframes, overlay_keyframes,
};

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use serde::{Deserialize, Serialize};

use crate::easing::EasingId;
use crate::events::{EngineEvent, EventQueue, TransitionEvent};
use crate::keyframes::{KeyframeLease, KeyframeRegistry};
use crate::scheduler::{FrameHandle, FrameScheduler, FrameTick};
use crate::surface::{SurfaceRef, VisualState};
use crate::types::{AnimationConfig, MotionStatus, PlayDirection, RepeatCount, SurfaceId, TransitionId};

/// Per-call transition options.
#[derive(Debug, Clone)]
pub struct TransitionConfig {
    pub kind: TransitionKind,
    /// `None` uses the orchestrator's defaults.
    pub timing: Option<AnimationConfig>,
    /// Travel for slide kinds, in pixels.
    pub slide_distance: f32,
    /// Second surface driven by Curtain, Morph and Liquid.
    pub overlay: Option<SurfaceRef>,
}

impl TransitionConfig {
    pub fn new(kind: TransitionKind) -> Self {
        Self {
            kind,
            timing: None,
            slide_distance: DEFAULT_SLIDE_DISTANCE,
            overlay: None,
        }
    }

    pub fn with_timing(mut self, timing: AnimationConfig) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_slide_distance(mut self, slide_distance: f32) -> Self {
        self.slide_distance = slide_distance;
        self
    }

    pub fn with_overlay(mut self, overlay: SurfaceRef) -> Self {
        self.overlay = Some(overlay);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// How a transition settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// Ran its full duration.
    Completed,
    /// Cancelled or unmounted before the end.
    Cancelled,
    /// Ran its full duration without touching the target, which was detached.
    Skipped,
}

struct Running {
    id: TransitionId,
    surface_id: SurfaceId,
    kind: TransitionKind,
    direction: TransitionDirection,
    state: TransitionState,
    outcome: Option<TransitionOutcome>,
    progress: f32,
    /// The target was not live at some frame.
    skipped: bool,
    target: SurfaceRef,
    overlay: Option<SurfaceRef>,
    frame: Option<FrameHandle>,
    leases: Vec<KeyframeLease>,
    wakers: Vec<Waker>,
}

type Shared = Rc<RefCell<Running>>;

#[derive(Default)]
struct OrchestratorInner {
    /// Transitions in flight, per surface. Settling removes the entry.
    surfaces: HashMap<SurfaceId, Shared>,
    events: EventQueue,
}

/// Runs enter/exit transitions, one at a time per surface.
#[derive(Clone)]
pub struct TransitionOrchestrator {
    registry: KeyframeRegistry,
    scheduler: FrameScheduler,
    defaults: AnimationConfig,
    duration_multiplier: Rc<std::cell::Cell<f32>>,
    inner: Rc<RefCell<OrchestratorInner>>,
}

impl std::fmt::Debug for TransitionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionOrchestrator")
            .field("surfaces", &self.inner.borrow().surfaces.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl TransitionOrchestrator {
    pub fn new(registry: KeyframeRegistry, scheduler: FrameScheduler) -> Self {
        Self::from_config(&kinetic_config::TransitionConfig::default(), registry, scheduler)
    }

    pub fn from_config(
        config: &kinetic_config::TransitionConfig,
        registry: KeyframeRegistry,
        scheduler: FrameScheduler,
    ) -> Self {
        let defaults = AnimationConfig::new(config.duration_ms)
            .with_easing(EasingId::parse_or_linear(&config.easing))
            .sanitized(kinetic_config::TransitionConfig::default().duration_ms);
        Self {
            registry,
            scheduler,
            defaults,
            duration_multiplier: Rc::new(std::cell::Cell::new(1.0)),
            inner: Rc::new(RefCell::new(OrchestratorInner::default())),
        }
    }

    pub fn defaults(&self) -> AnimationConfig {
        self.defaults
    }

    pub fn registry(&self) -> &KeyframeRegistry {
        &self.registry
    }

    /// Scale the duration of transitions started from now on. 0 makes them
    /// settle on their first frame.
    pub fn set_duration_multiplier(&self, multiplier: f32) {
        let multiplier = if multiplier.is_finite() { multiplier.max(0.0) } else { 1.0 };
        self.duration_multiplier.set(multiplier);
    }

    pub fn transition_in(&self, target: &SurfaceRef, config: TransitionConfig) -> TransitionCompletion {
        self.run(target, config, TransitionDirection::In)
    }

    pub fn transition_out(&self, target: &SurfaceRef, config: TransitionConfig) -> TransitionCompletion {
        self.run(target, config, TransitionDirection::Out)
    }

    fn run(&self, target: &SurfaceRef, config: TransitionConfig, direction: TransitionDirection) -> TransitionCompletion {
        let surface_id = target.id();
        let in_flight = self
            .inner
            .borrow()
            .surfaces
            .get(&surface_id)
            .filter(|shared| shared.borrow().state == TransitionState::Running)
            .cloned();
        if let Some(shared) = in_flight {
            tracing::debug!(surface = ?surface_id, ?direction, "transition already running, joining it");
            return self.completion(shared);
        }

        let mut timing = config
            .timing
            .unwrap_or(self.defaults)
            .sanitized(self.defaults.duration_ms)
            .scaled(self.duration_multiplier.get());
        let single = RepeatCount::Count { count: 1 };
        if timing.repeat != single || timing.direction != PlayDirection::Normal {
            tracing::warn!(
                repeat = ?timing.repeat,
                direction = ?timing.direction,
                "transitions run one forward iteration"
            );
            timing.repeat = single;
            timing.direction = PlayDirection::Normal;
        }
        let live = target.is_live();

        let mut leases = Vec::new();
        let mut content = None;
        let mut overlay_curve = None;
        if live {
            let lease = self.registry.acquire_unique(
                "kinetic-transition",
                content_keyframes(config.kind, direction, config.slide_distance),
            );
            target.with_live(|s| s.set_keyframes(Some(lease.name())));
            content = self.registry.get(lease.name());
            leases.push(lease);

            if let (Some(overlay), Some(curve)) = (&config.overlay, overlay_keyframes(config.kind, direction)) {
                let lease = self.registry.acquire_unique("kinetic-overlay", curve);
                overlay.with_live(|s| s.set_keyframes(Some(lease.name())));
                overlay_curve = self.registry.get(lease.name());
                leases.push(lease);
            }
        }

        let shared: Shared = Rc::new(RefCell::new(Running {
            id: TransitionId::new(),
            surface_id,
            kind: config.kind,
            direction,
            state: TransitionState::Running,
            outcome: None,
            progress: 0.0,
            skipped: !live,
            target: target.clone(),
            overlay: config.overlay.clone(),
            frame: None,
            leases,
            wakers: Vec::new(),
        }));

        let transition_id = shared.borrow().id;
        {
            let mut inner = self.inner.borrow_mut();
            inner.surfaces.insert(surface_id, shared.clone());
            inner.events.push_transition(TransitionEvent::Started {
                transition_id,
                surface_id,
                kind: config.kind,
                direction,
            });
        }
        tracing::debug!(
            surface = ?surface_id,
            kind = config.kind.name(),
            direction = direction.name(),
            duration_ms = timing.duration_ms,
            live,
            "transition started"
        );

        let weak_shared = Rc::downgrade(&shared);
        let weak_inner = Rc::downgrade(&self.inner);
        let target = target.clone();
        let overlay = config.overlay;
        let frame = self.scheduler.start(move |tick: &FrameTick| {
            let Some(shared) = weak_shared.upgrade() else {
                return;
            };
            let sample = timing.sample(tick.elapsed_ms);
            let eased = timing.easing.evaluate(sample.progress);
            {
                let mut running = shared.borrow_mut();
                if running.state != TransitionState::Running {
                    return;
                }
                running.progress = sample.progress;
                if !running.skipped {
                    if let Some(curve) = &content {
                        let base = target.visual().unwrap_or(VisualState::IDENTITY);
                        if !target.apply(&curve.sample(eased, &base)) {
                            tracing::debug!(surface = ?running.surface_id, "target detached mid-transition");
                            running.skipped = true;
                        }
                    }
                }
                if let (Some(overlay), Some(curve)) = (&overlay, &overlay_curve) {
                    if let Some(base) = overlay.visual() {
                        overlay.apply(&curve.sample(eased, &base));
                    }
                }
            }
            if sample.finished {
                let outcome = if shared.borrow().skipped {
                    TransitionOutcome::Skipped
                } else {
                    TransitionOutcome::Completed
                };
                settle(&weak_inner, &shared, outcome);
            }
        });
        shared.borrow_mut().frame = Some(frame);

        self.completion(shared)
    }

    fn completion(&self, shared: Shared) -> TransitionCompletion {
        TransitionCompletion {
            shared,
            orchestrator: Rc::downgrade(&self.inner),
        }
    }

    /// Cancel whatever runs on `surface_id` and forget the surface.
    pub fn unmount(&self, surface_id: SurfaceId) {
        let shared = self.inner.borrow_mut().surfaces.remove(&surface_id);
        if let Some(shared) = shared {
            settle(&Rc::downgrade(&self.inner), &shared, TransitionOutcome::Cancelled);
        }
    }

    pub fn state(&self, surface_id: SurfaceId) -> TransitionState {
        self.inner
            .borrow()
            .surfaces
            .get(&surface_id)
            .map_or(TransitionState::Idle, |shared| shared.borrow().state)
    }

    pub fn status(&self, surface_id: SurfaceId) -> MotionStatus {
        let inner = self.inner.borrow();
        let Some(shared) = inner.surfaces.get(&surface_id) else {
            return MotionStatus::default();
        };
        let running = shared.borrow();
        let is_active = running.state == TransitionState::Running;
        MotionStatus {
            progress: running.progress,
            is_active,
            is_animating: is_active && !running.skipped,
        }
    }

    /// Surfaces the orchestrator holds state for.
    pub fn tracked_count(&self) -> usize {
        self.inner.borrow().surfaces.len()
    }

    /// Surfaces with a transition in flight.
    pub fn running_count(&self) -> usize {
        self.inner
            .borrow()
            .surfaces
            .values()
            .filter(|s| s.borrow().state == TransitionState::Running)
            .count()
    }

    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.inner.borrow_mut().events.drain().collect()
    }
}

/// Settle `shared` once: stop its frame task, release its curves, record
/// the lifecycle event and wake every waiting completion.
fn settle(orchestrator: &Weak<RefCell<OrchestratorInner>>, shared: &Shared, outcome: TransitionOutcome) {
    let (event, wakers, leases, target, overlay) = {
        let mut running = shared.borrow_mut();
        if running.state != TransitionState::Running {
            return;
        }
        running.state = match outcome {
            TransitionOutcome::Cancelled => TransitionState::Cancelled,
            TransitionOutcome::Completed | TransitionOutcome::Skipped => TransitionState::Completed,
        };
        running.outcome = Some(outcome);
        if let Some(frame) = running.frame.take() {
            match outcome {
                TransitionOutcome::Cancelled => frame.cancel(),
                _ => frame.finish(),
            }
        }
        if outcome != TransitionOutcome::Cancelled {
            running.progress = 1.0;
        }

        let (transition_id, surface_id, kind, direction) =
            (running.id, running.surface_id, running.kind, running.direction);
        let event = match outcome {
            TransitionOutcome::Cancelled => TransitionEvent::Cancelled {
                transition_id,
                surface_id,
                kind,
                direction,
            },
            _ => TransitionEvent::Completed {
                transition_id,
                surface_id,
                kind,
                direction,
            },
        };
        (
            event,
            std::mem::take(&mut running.wakers),
            std::mem::take(&mut running.leases),
            running.target.clone(),
            running.overlay.clone(),
        )
    };

    let had_curves = !leases.is_empty();
    drop(leases);
    if had_curves {
        target.with_live(|s| s.set_keyframes(None));
        if let Some(overlay) = overlay {
            overlay.with_live(|s| s.set_keyframes(None));
        }
    }

    if let Some(inner) = orchestrator.upgrade() {
        let mut inner = inner.borrow_mut();
        let surface_id = event.surface_id();
        if inner.surfaces.get(&surface_id).is_some_and(|s| Rc::ptr_eq(s, shared)) {
            inner.surfaces.remove(&surface_id);
        }
        inner.events.push_transition(event);
    }
    tracing::debug!(surface = ?target.id(), ?outcome, "transition settled");

    for waker in wakers {
        waker.wake();
    }
}

/// Resolves when the transition it was returned for settles.
///
/// Completions returned for a re-entrant call share the in-flight
/// transition: [`direction`](Self::direction) reports that transition's
/// direction and [`cancel`](Self::cancel) cancels it.
pub struct TransitionCompletion {
    shared: Shared,
    orchestrator: Weak<RefCell<OrchestratorInner>>,
}

impl std::fmt::Debug for TransitionCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let running = self.shared.borrow();
        f.debug_struct("TransitionCompletion")
            .field("id", &running.id)
            .field("state", &running.state)
            .field("direction", &running.direction)
            .finish()
    }
}

impl TransitionCompletion {
    pub fn id(&self) -> TransitionId {
        self.shared.borrow().id
    }

    pub fn state(&self) -> TransitionState {
        self.shared.borrow().state
    }

    pub fn direction(&self) -> TransitionDirection {
        self.shared.borrow().direction
    }

    pub fn kind(&self) -> TransitionKind {
        self.shared.borrow().kind
    }

    pub fn outcome(&self) -> Option<TransitionOutcome> {
        self.shared.borrow().outcome
    }

    /// Stop the transition where it is. No-op once settled.
    pub fn cancel(&self) {
        settle(&self.orchestrator, &self.shared, TransitionOutcome::Cancelled);
    }
}

impl Future for TransitionCompletion {
    type Output = TransitionOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut running = self.shared.borrow_mut();
        if let Some(outcome) = running.outcome {
            return Poll::Ready(outcome);
        }
        if !running.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            running.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
