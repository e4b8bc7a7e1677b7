use anyhow::Result;
use kinetic_config::KineticConfig;
use kinetic_engine::easing::{EasingId, easing_fn};
use kinetic_engine::gesture::{GestureClassifier, GestureEvent, PointerEvent, PullToRefresh, SwipeDirection};
use kinetic_engine::keyframes::KeyframeRegistry;
use kinetic_engine::scheduler::{FrameScheduler, TweenSpec};
use kinetic_engine::surface::{MemorySurface, Rect, Surface, SurfaceRef};
use kinetic_engine::transition::{
    TransitionConfig, TransitionKind, TransitionOrchestrator, TransitionOutcome, TransitionState,
};
use kinetic_engine::types::{AnimationConfig, SurfaceId};
use kinetic_engine::viewport::{ScrollTracker, TrackMode, ViewportSignal};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn gestures(classifier: &mut GestureClassifier) -> Vec<GestureEvent> {
    classifier
        .drain_events()
        .into_iter()
        .filter_map(|e| e.as_gesture().copied())
        .collect()
}

#[test]
fn every_easing_is_anchored_at_both_ends() {
    for id in EasingId::ALL {
        let f = easing_fn(id);
        assert!(f(0.0).abs() < 1e-4, "{id:?} at 0");
        assert!((f(1.0) - 1.0).abs() < 1e-4, "{id:?} at 1");
    }
}

#[test]
fn tween_progress_is_monotonic_and_bounded() {
    let scheduler = FrameScheduler::new();
    let frames = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));

    let f = frames.clone();
    let c = completed.clone();
    let _handle = scheduler.animate(
        TweenSpec::new(0.0, 10.0).with_config(AnimationConfig::new(250.0).with_easing(EasingId::EaseInOutCubic)),
        move |frame| f.borrow_mut().push(frame.progress),
        move || c.set(true),
    );

    let mut now = 0.0;
    while !completed.get() && now < 1000.0 {
        scheduler.tick(now);
        now += 16.0;
    }

    let frames = frames.borrow();
    assert!(completed.get());
    assert!(frames.windows(2).all(|w| w[0] <= w[1]));
    assert!(frames.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(frames.last(), Some(&1.0));
}

#[test]
fn swipe_thresholds_from_config() -> Result<()> {
    let config: KineticConfig = toml::from_str("[gesture]\nswipe_threshold_px = 50.0\n")?;
    let mut classifier = GestureClassifier::from_config(SurfaceId(7), &config.gesture);

    classifier.handle(PointerEvent::down(1, 0.0, 0.0, 0.0));
    classifier.handle(PointerEvent::up(1, 60.0, 0.0, 100.0));
    assert!(matches!(
        gestures(&mut classifier).as_slice(),
        [GestureEvent::Swipe {
            direction: SwipeDirection::Right,
            ..
        }]
    ));

    classifier.handle(PointerEvent::down(1, 0.0, 0.0, 200.0));
    classifier.handle(PointerEvent::up(1, 30.0, 0.0, 300.0));
    assert!(gestures(&mut classifier).is_empty());
    Ok(())
}

#[test]
fn long_press_fires_exactly_once() {
    let mut classifier = GestureClassifier::new(SurfaceId(1));
    classifier.handle(PointerEvent::down(1, 40.0, 40.0, 0.0));
    for now in (0..=800).step_by(16) {
        classifier.tick(f64::from(now));
    }
    classifier.handle(PointerEvent::up(1, 40.0, 40.0, 816.0));
    let events = gestures(&mut classifier);
    assert_eq!(events.iter().filter(|e| matches!(e, GestureEvent::LongPress { .. })).count(), 1);
    assert_eq!(events.len(), 1);

    classifier.handle(PointerEvent::down(1, 0.0, 0.0, 1000.0));
    classifier.handle(PointerEvent::moved(1, 15.0, 0.0, 1200.0));
    classifier.tick(1600.0);
    assert!(gestures(&mut classifier).is_empty());
}

#[test]
fn pull_to_refresh_calls_back_once_and_resets_on_failure() -> Result<()> {
    let calls = Rc::new(Cell::new(0));
    let k = calls.clone();
    let pull = PullToRefresh::new(move || {
        k.set(k.get() + 1);
        async { Err(anyhow::anyhow!("network down")) }
    });
    assert!((pull.damped(200.0) - 120.0).abs() < 1e-3);
    assert_eq!(pull.damped(250.0), 150.0);

    let mut classifier = GestureClassifier::new(SurfaceId(2)).with_pull_to_refresh(pull);

    // Raw 400 px is damped to 240 and capped at 150.
    classifier.handle(PointerEvent::down(1, 0.0, 0.0, 0.0));
    classifier.handle(PointerEvent::moved(1, 0.0, 400.0, 100.0));
    classifier.handle(PointerEvent::up(1, 0.0, 400.0, 120.0));
    assert_eq!(calls.get(), 1);
    assert!(matches!(
        gestures(&mut classifier).last(),
        Some(GestureEvent::PullToRefresh { distance, triggered: true }) if *distance == 150.0
    ));

    let Some(task) = classifier.take_refresh() else {
        anyhow::bail!("triggered pull produced no refresh task");
    };
    let err = pollster::block_on(task).unwrap_err();
    assert_eq!(err.to_string(), "network down");
    assert!(classifier.pull().is_some_and(|p| !p.is_refreshing()));

    // Below the threshold: no callback.
    classifier.handle(PointerEvent::down(1, 0.0, 0.0, 500.0));
    classifier.handle(PointerEvent::moved(1, 0.0, 100.0, 600.0));
    classifier.handle(PointerEvent::up(1, 0.0, 100.0, 650.0));
    assert_eq!(calls.get(), 1);
    assert!(classifier.take_refresh().is_none());
    Ok(())
}

#[test]
fn viewport_reveal_progress() {
    let scheduler = FrameScheduler::new();
    let surface = MemorySurface::shared(Rect::new(0.0, 1000.0, 300.0, 400.0));
    let tracker = Rc::new(RefCell::new(ScrollTracker::new(1280.0, 800.0)));
    let id = tracker.borrow_mut().register(SurfaceRef::new(&surface), TrackMode::Reveal);

    let seen = Rc::new(Cell::new(0.0f32));
    let s = seen.clone();
    let _sub = tracker.borrow().subscribe(move |obs| s.set(obs.progress));
    let _frame = ScrollTracker::drive(&tracker, &scheduler);

    tracker.borrow_mut().on_signal(ViewportSignal::Scroll { offset_y: 1000.0 });
    scheduler.tick(0.0);

    assert!((seen.get() - 0.667).abs() < 1e-3);
    let obs = tracker.borrow().observation(id);
    assert!(obs.is_some_and(|o| o.in_view));
}

#[test]
fn cancel_twice_equals_cancel_once() {
    let scheduler = FrameScheduler::new();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let handle = scheduler.start(move |_| c.set(c.get() + 1));
    scheduler.tick(0.0);
    handle.cancel();
    handle.cancel();
    scheduler.tick(16.0);
    assert_eq!(calls.get(), 1);

    let registry = KeyframeRegistry::new();
    let orchestrator = TransitionOrchestrator::new(registry.clone(), scheduler.clone());
    let surface = MemorySurface::shared(Rect::new(0.0, 0.0, 10.0, 10.0));
    let done = orchestrator.transition_in(&SurfaceRef::new(&surface), TransitionConfig::new(TransitionKind::Scale));
    scheduler.tick(32.0);
    done.cancel();
    done.cancel();
    assert_eq!(done.state(), TransitionState::Cancelled);
    assert_eq!(
        orchestrator.drain_events().iter().filter(|e| e.is_cancelled()).count(),
        1
    );
    assert!(registry.is_empty());
}

#[test]
fn reentrant_transition_registers_once() {
    let scheduler = FrameScheduler::new();
    let registry = KeyframeRegistry::new();
    let orchestrator = TransitionOrchestrator::new(registry.clone(), scheduler.clone());
    let surface = MemorySurface::shared(Rect::new(0.0, 0.0, 10.0, 10.0));
    let target = SurfaceRef::new(&surface);
    let config = TransitionConfig::new(TransitionKind::Fade).with_timing(AnimationConfig::new(120.0));

    let first = orchestrator.transition_in(&target, config.clone());
    let again = orchestrator.transition_in(&target, config);
    assert_eq!(registry.registration_count(), 1);

    let mut now = 0.0;
    while first.outcome().is_none() {
        scheduler.tick(now);
        now += 16.0;
    }
    assert!(now > 120.0);
    assert_eq!(pollster::block_on(again), TransitionOutcome::Completed);
    assert_eq!(surface.borrow().visual().opacity, 1.0);
    assert!(registry.is_empty());
}

#[test]
fn drained_transition_events_survive_json() -> Result<()> {
    let scheduler = FrameScheduler::new();
    let orchestrator = TransitionOrchestrator::new(KeyframeRegistry::new(), scheduler.clone());
    let surface = MemorySurface::shared(Rect::new(0.0, 0.0, 10.0, 10.0));
    let target = SurfaceRef::new(&surface);

    let done = orchestrator.transition_in(
        &target,
        TransitionConfig::new(TransitionKind::Morph).with_timing(AnimationConfig::new(32.0)),
    );
    scheduler.tick(0.0);
    scheduler.tick(32.0);
    assert_eq!(done.outcome(), Some(TransitionOutcome::Completed));

    let events = orchestrator.drain_events();
    assert_eq!(events.len(), 2);
    let json = serde_json::to_string(&events)?;
    let parsed: Vec<kinetic_engine::EngineEvent> = serde_json::from_str(&json)?;
    assert_eq!(parsed, events);
    Ok(())
}
