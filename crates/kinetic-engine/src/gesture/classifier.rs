use std::rc::Rc;

use kinetic_config::GestureConfig;

use super::{
    FeedbackSink, GestureEvent, GestureKind, GestureSession, LongPressTimer, PinchTracker, PointerEvent,
    PointerKind, PullToRefresh, RefreshTask, SessionPhase, SwipeThresholds, classify_swipe,
};
use crate::dispatch::{Dispatcher, Subscription};
use crate::events::{EngineEvent, EventQueue};
use crate::types::{MotionStatus, SurfaceId};

/// Gesture state machine for one surface.
///
/// Owns at most one [`GestureSession`]. Events are queued for
/// [`drain_events`](Self::drain_events) and fanned out to subscribers as they
/// resolve. Subscribers run inside `handle`/`tick` and must not call back
/// into the same classifier.
pub struct GestureClassifier {
    surface_id: SurfaceId,
    swipe: SwipeThresholds,
    long_press: LongPressTimer,
    pinch: PinchTracker,
    pull: Option<PullToRefresh>,
    feedback: Option<Rc<dyn FeedbackSink>>,
    scroll_top: f32,
    session: Option<GestureSession>,
    last_phase: SessionPhase,
    refresh: Option<RefreshTask>,
    events: EventQueue,
    dispatcher: Dispatcher<GestureEvent>,
}

impl std::fmt::Debug for GestureClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureClassifier")
            .field("surface_id", &self.surface_id)
            .field("session", &self.session)
            .field("last_phase", &self.last_phase)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl GestureClassifier {
    pub fn new(surface_id: SurfaceId) -> Self {
        Self::from_config(surface_id, &GestureConfig::default())
    }

    pub fn from_config(surface_id: SurfaceId, config: &GestureConfig) -> Self {
        Self {
            surface_id,
            swipe: SwipeThresholds::from(config),
            long_press: LongPressTimer::from_config(config),
            pinch: PinchTracker::from_config(config),
            pull: None,
            feedback: None,
            scroll_top: 0.0,
            session: None,
            last_phase: SessionPhase::Idle,
            refresh: None,
            events: EventQueue::new(),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn with_pull_to_refresh(mut self, pull: PullToRefresh) -> Self {
        self.pull = Some(pull);
        self
    }

    pub fn with_feedback(mut self, feedback: Rc<dyn FeedbackSink>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// Scroll position of the container, consulted when a pull could arm.
    pub fn set_scroll_top(&mut self, scroll_top: f32) {
        self.scroll_top = scroll_top;
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    /// Phase of the live session, or of the last one once it is gone.
    pub fn phase(&self) -> SessionPhase {
        self.session.as_ref().map_or(self.last_phase, |s| s.phase)
    }

    pub fn pull(&self) -> Option<&PullToRefresh> {
        self.pull.as_ref()
    }

    pub fn scale(&self) -> f32 {
        self.pinch.scale()
    }

    pub fn handle(&mut self, event: PointerEvent) {
        match event.kind {
            PointerKind::Down => self.on_down(event),
            PointerKind::Move => self.on_move(event),
            PointerKind::Up => self.on_up(event),
            PointerKind::Cancel => self.on_cancel(event),
        }
    }

    /// Poll timers. Call once per frame while a session is live.
    pub fn tick(&mut self, now_ms: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.phase != SessionPhase::Tracking || session.is_multi_touch() {
            return;
        }
        if let Some(event) = self.long_press.poll(now_ms) {
            session.phase = SessionPhase::Resolved(GestureKind::LongPress);
            if let Some(pull) = self.pull.as_mut() {
                pull.cancel();
            }
            if let Some(feedback) = &self.feedback {
                feedback.long_press();
            }
            self.emit(event);
        }
    }

    fn on_down(&mut self, event: PointerEvent) {
        let Some(session) = self.session.as_mut() else {
            let session = GestureSession::new(event.pointer_id, event.position, event.timestamp_ms);
            self.long_press.arm(event.position, event.timestamp_ms);
            if let Some(pull) = self.pull.as_mut() {
                pull.arm(self.scroll_top, event.position.y);
            }
            tracing::trace!(surface = ?self.surface_id, pointer = event.pointer_id, "session started");
            self.session = Some(session);
            return;
        };

        if session.contains(event.pointer_id) || session.active_pointers() >= 2 {
            return;
        }
        if session.is_multi_touch() || session.phase != SessionPhase::Tracking {
            // A finger re-joining a finished pinch, or a pointer landing on a
            // resolved session, starts nothing.
            return;
        }

        session.add_pointer(event.pointer_id, event.position);
        self.long_press.disarm();
        if let Some(pull) = self.pull.as_mut() {
            pull.cancel();
        }
        if let Some((a, b)) = session.pair() {
            self.pinch.begin(a, b);
        }
    }

    fn on_move(&mut self, event: PointerEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.contains(event.pointer_id) {
            return;
        }
        session.move_pointer(event.pointer_id, event.position, event.timestamp_ms);

        if session.is_multi_touch() {
            if session.active_pointers() == 2 {
                if let Some((a, b)) = session.pair() {
                    if let Some(pinch) = self.pinch.update(a, b) {
                        self.emit(pinch);
                    }
                }
            }
            return;
        }

        if session.phase != SessionPhase::Tracking {
            return;
        }
        self.long_press.on_move(event.position);
        let progress = self.pull.as_mut().and_then(|pull| pull.drag(event.position.y));
        if let Some(progress) = progress {
            self.emit(progress);
        }
    }

    fn on_up(&mut self, event: PointerEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.remove_pointer(event.pointer_id) {
            return;
        }

        if session.is_multi_touch() {
            let ended = self.pinch.end();
            if ended.is_some() {
                session.phase = SessionPhase::Resolved(GestureKind::Pinch);
            } else if session.phase == SessionPhase::Tracking {
                session.phase = SessionPhase::Cancelled;
            }
            let all_up = session.active_pointers() == 0;
            if let Some(ended) = ended {
                self.emit(ended);
            }
            if all_up {
                self.finish_session();
            }
            return;
        }

        session.move_pointer(event.pointer_id, event.position, event.timestamp_ms);
        self.long_press.disarm();

        if session.phase == SessionPhase::Tracking {
            let engaged = self.pull.as_ref().is_some_and(|p| p.is_engaged());
            if engaged {
                let release = self.pull.as_mut().and_then(|p| p.release());
                if let Some(release) = release {
                    session.phase = SessionPhase::Resolved(GestureKind::PullToRefresh);
                    if release.task.is_some() {
                        self.refresh = release.task;
                    }
                    self.emit(release.event);
                }
            } else {
                if let Some(pull) = self.pull.as_mut() {
                    pull.cancel();
                }
                let duration = session.duration_ms();
                match classify_swipe(session.start_position, session.last_position, duration, self.swipe) {
                    Some(swipe) => {
                        session.phase = SessionPhase::Resolved(GestureKind::Swipe);
                        self.emit(swipe);
                    }
                    None => session.phase = SessionPhase::Cancelled,
                }
            }
        }
        self.finish_session();
    }

    fn on_cancel(&mut self, event: PointerEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.contains(event.pointer_id) {
            return;
        }
        session.phase = SessionPhase::Cancelled;
        self.long_press.disarm();
        self.pinch.cancel();
        if let Some(pull) = self.pull.as_mut() {
            pull.cancel();
        }
        tracing::trace!(surface = ?self.surface_id, "session cancelled");
        self.finish_session();
    }

    fn finish_session(&mut self) {
        if let Some(session) = self.session.take() {
            self.last_phase = session.phase;
        }
    }

    fn emit(&mut self, event: GestureEvent) {
        tracing::debug!(surface = ?self.surface_id, ?event, "gesture");
        self.events.push_gesture(self.surface_id, event);
        self.dispatcher.emit(&event);
    }

    /// The refresh started by the last triggered pull, if not yet taken.
    pub fn take_refresh(&mut self) -> Option<RefreshTask> {
        self.refresh.take()
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain().collect()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&GestureEvent) + 'static,
    {
        self.dispatcher.subscribe(callback)
    }

    pub fn status(&self) -> MotionStatus {
        let pull = self.pull.as_ref().map(|p| p.status());
        let is_active = self.session.is_some() || pull.is_some_and(|s| s.is_active);
        let is_animating = self.pinch.is_active() || pull.is_some_and(|s| s.is_animating);
        MotionStatus {
            progress: pull.map_or(0.0, |s| s.progress),
            is_active,
            is_animating,
        }
    }
}
