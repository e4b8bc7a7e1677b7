//! Scripted runs against in-memory surfaces.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{Context, Result, bail, ensure};
use kinetic_config::KineticConfig;
use kinetic_engine::events::EngineEvent;
use kinetic_engine::gesture::{GestureClassifier, GestureEvent, PointerEvent, PullToRefresh};
use kinetic_engine::keyframes::KeyframeRegistry;
use kinetic_engine::quality::{DeviceClass, DeviceSignals, QualityController};
use kinetic_engine::scheduler::{Counter, FrameScheduler};
use kinetic_engine::scroll::ScrollSnap;
use kinetic_engine::surface::{MemorySurface, Rect, Surface, SurfaceRef};
use kinetic_engine::transition::{TransitionConfig, TransitionKind, TransitionOrchestrator, TransitionOutcome};
use kinetic_engine::types::SurfaceId;
use kinetic_engine::viewport::{ScrollTracker, ScrubWindow, TrackMode, ViewportSignal};

const FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Swipe,
    Pinch,
    LongPress,
    Pull,
    Scroll,
    Transition,
    Counter,
}

impl Scenario {
    pub const ALL: [Scenario; 7] = [
        Self::Swipe,
        Self::Pinch,
        Self::LongPress,
        Self::Pull,
        Self::Scroll,
        Self::Transition,
        Self::Counter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Swipe => "swipe",
            Self::Pinch => "pinch",
            Self::LongPress => "long-press",
            Self::Pull => "pull",
            Self::Scroll => "scroll",
            Self::Transition => "transition",
            Self::Counter => "counter",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn run(self, config: &KineticConfig) -> Result<()> {
        match self {
            Self::Swipe => swipe(config),
            Self::Pinch => pinch(config),
            Self::LongPress => long_press(config),
            Self::Pull => pull(config),
            Self::Scroll => scroll(config),
            Self::Transition => transition(config),
            Self::Counter => counter(config),
        }
    }
}

fn log_events(events: &[EngineEvent]) {
    for event in events {
        tracing::info!(?event, "event");
    }
}

fn gestures(events: &[EngineEvent]) -> impl Iterator<Item = &GestureEvent> {
    events.iter().filter_map(EngineEvent::as_gesture)
}

fn swipe(config: &KineticConfig) -> Result<()> {
    let mut classifier = GestureClassifier::from_config(SurfaceId(1), &config.gesture);
    classifier.handle(PointerEvent::down(1, 20.0, 300.0, 0.0));
    for step in 1..=6 {
        let t = f64::from(step) * FRAME_MS;
        classifier.handle(PointerEvent::moved(1, 20.0 + 30.0 * step as f32, 302.0, t));
    }
    classifier.handle(PointerEvent::up(1, 200.0, 302.0, 7.0 * FRAME_MS));
    let events = classifier.drain_events();
    log_events(&events);
    ensure!(
        gestures(&events).any(|e| matches!(e, GestureEvent::Swipe { .. })),
        "scripted drag did not classify as a swipe"
    );
    Ok(())
}

fn pinch(config: &KineticConfig) -> Result<()> {
    let mut classifier = GestureClassifier::from_config(SurfaceId(2), &config.gesture);
    classifier.handle(PointerEvent::down(1, 100.0, 200.0, 0.0));
    classifier.handle(PointerEvent::down(2, 200.0, 200.0, 5.0));
    for step in 1..=4 {
        let spread = 25.0 * step as f32;
        let t = f64::from(step) * FRAME_MS;
        classifier.handle(PointerEvent::moved(1, 100.0 - spread, 200.0, t));
        classifier.handle(PointerEvent::moved(2, 200.0 + spread, 200.0, t));
    }
    classifier.handle(PointerEvent::up(2, 300.0, 200.0, 100.0));
    classifier.handle(PointerEvent::up(1, 0.0, 200.0, 110.0));
    log_events(&classifier.drain_events());
    tracing::info!(scale = classifier.scale(), "pinch committed");
    ensure!(classifier.scale() > 1.0, "spreading pinch left scale at {}", classifier.scale());
    Ok(())
}

fn long_press(config: &KineticConfig) -> Result<()> {
    let buzzes = Rc::new(Cell::new(0u32));
    let b = buzzes.clone();
    let mut classifier = GestureClassifier::from_config(SurfaceId(3), &config.gesture)
        .with_feedback(Rc::new(move || b.set(b.get() + 1)));

    classifier.handle(PointerEvent::down(1, 50.0, 50.0, 0.0));
    let mut now = 0.0;
    while now <= config.gesture.long_press_ms + 2.0 * FRAME_MS {
        classifier.tick(now);
        now += FRAME_MS;
    }
    classifier.handle(PointerEvent::up(1, 50.0, 50.0, now));
    log_events(&classifier.drain_events());
    tracing::info!(feedback = buzzes.get(), "long-press feedback fired");
    ensure!(buzzes.get() == 1, "long-press feedback fired {} times", buzzes.get());
    Ok(())
}

fn pull(config: &KineticConfig) -> Result<()> {
    let pull = PullToRefresh::with_config(&config.gesture, || async {
        tracing::info!("refreshing");
        Ok(())
    });
    let mut classifier = GestureClassifier::from_config(SurfaceId(4), &config.gesture).with_pull_to_refresh(pull);

    classifier.handle(PointerEvent::down(1, 160.0, 10.0, 0.0));
    for step in 1..=10 {
        let t = f64::from(step) * FRAME_MS;
        classifier.handle(PointerEvent::moved(1, 160.0, 10.0 + 25.0 * step as f32, t));
    }
    classifier.handle(PointerEvent::up(1, 160.0, 260.0, 11.0 * FRAME_MS));
    log_events(&classifier.drain_events());

    let task = classifier
        .take_refresh()
        .context("pull past the threshold did not start a refresh")?;
    pollster::block_on(task).context("refresh failed")?;
    tracing::info!("refresh finished");
    Ok(())
}

fn scroll(config: &KineticConfig) -> Result<()> {
    let scheduler = FrameScheduler::from_config(&config.scheduler);
    let tracker = Rc::new(RefCell::new(ScrollTracker::from_config(&config.viewport, 1280.0, 800.0)));

    let cards: Vec<Rc<RefCell<MemorySurface>>> = (0..3)
        .map(|i| MemorySurface::shared(Rect::new(0.0, 600.0 + 500.0 * i as f32, 1280.0, 400.0)))
        .collect();
    for (i, card) in cards.iter().enumerate() {
        let mode = if i == 1 {
            TrackMode::Scrub(ScrubWindow::default())
        } else {
            TrackMode::Reveal
        };
        tracker.borrow_mut().register(SurfaceRef::new(card), mode);
    }

    let _observations = tracker.borrow().subscribe(|obs| {
        tracing::info!(
            element = ?obs.element_id,
            progress = obs.progress,
            velocity = obs.velocity,
            in_view = obs.in_view,
            "observation"
        );
    });
    let driver = ScrollTracker::drive(&tracker, &scheduler);

    let mut now = 0.0;
    for step in 0..=10 {
        tracker.borrow_mut().on_signal(ViewportSignal::Scroll {
            offset_y: 120.0 * step as f32,
        });
        scheduler.tick(now);
        now += FRAME_MS * 4.0;
    }
    driver.cancel();

    let snap = Rc::new(RefCell::new(ScrollSnap::from_config(&config.viewport, vec![0.0, 800.0, 1600.0])));
    let Some(snap_index) = snap.borrow_mut().release(950.0, now) else {
        bail!("release did not start a snap");
    };
    tracing::info!(snap_index, "released scroll, snapping");
    let last = Rc::new(Cell::new(950.0f32));
    let l = last.clone();
    let _snap_driver = ScrollSnap::drive(&snap, &scheduler, move |offset| l.set(offset));
    while snap.borrow().is_animating() {
        scheduler.tick(now);
        now += FRAME_MS;
    }
    tracing::info!(offset = last.get(), index = snap.borrow().current_index(), "snap settled");
    Ok(())
}

fn transition(config: &KineticConfig) -> Result<()> {
    let scheduler = FrameScheduler::from_config(&config.scheduler);
    let registry = KeyframeRegistry::new();
    let orchestrator = TransitionOrchestrator::from_config(&config.transition, registry.clone(), scheduler.clone());

    let quality = QualityController::from_config(
        config.quality.clone(),
        DeviceSignals {
            device_class: DeviceClass::from_width(1280.0),
            ..DeviceSignals::default()
        },
    );
    orchestrator.set_duration_multiplier(quality.profile().duration_multiplier);
    tracing::info!(profile = ?quality.profile(), "quality");

    let panel = MemorySurface::shared(Rect::new(0.0, 0.0, 400.0, 300.0));
    let curtain = MemorySurface::shared(Rect::new(0.0, 0.0, 400.0, 300.0));
    let target = SurfaceRef::new(&panel);

    let fade_in = orchestrator.transition_in(&target, TransitionConfig::new(TransitionKind::Fade));
    let mut now = 0.0;
    while fade_in.outcome().is_none() && now < 10_000.0 {
        scheduler.tick(now);
        now += FRAME_MS;
    }
    let outcome = pollster::block_on(fade_in);
    tracing::info!(?outcome, opacity = panel.borrow().visual().opacity, "fade in");
    ensure!(outcome == TransitionOutcome::Completed, "fade in settled as {outcome:?}");

    let out = orchestrator.transition_out(
        &target,
        TransitionConfig::new(TransitionKind::Curtain).with_overlay(SurfaceRef::new(&curtain)),
    );
    while out.outcome().is_none() && now < 20_000.0 {
        scheduler.tick(now);
        now += FRAME_MS;
    }
    let outcome = pollster::block_on(out);
    tracing::info!(?outcome, live_curves = registry.len(), "curtain out");
    log_events(&orchestrator.drain_events());
    ensure!(registry.is_empty(), "{} keyframe curves outlived their transitions", registry.len());
    Ok(())
}

fn counter(config: &KineticConfig) -> Result<()> {
    let scheduler = FrameScheduler::from_config(&config.scheduler);
    let handle = Counter::new(12_500.0)
        .prefix("$")
        .start(&scheduler, scheduler.defaults(), |text| tracing::debug!(text, "counter"));
    let mut now = 0.0;
    while handle.is_active() {
        scheduler.tick(now);
        now += FRAME_MS;
    }
    tracing::info!(elapsed_ms = now, "counter done");
    Ok(())
}
