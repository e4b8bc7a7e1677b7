//! Headless animation and gesture engine.
//!
//! This crate provides:
//! - **Timeline math**: easing curves, interpolation, animation timing
//! - **Keyframes**: named curves shared through a reference-counted registry
//! - **Frame scheduling**: per-frame tasks, tweens and ambient drivers
//! - **Viewport tracking**: reveal and scrub progress for registered surfaces
//! - **Gestures**: swipe, pinch, long-press and pull-to-refresh recognition
//! - **Transitions**: enter/exit presets resolved as futures
//! - **Adaptive quality**: effect budgets from device signals
//!
//! # Architecture
//!
//! ```text
//! host frame loop ──▶ FrameScheduler::tick
//!                       ├── tweens / drivers ──▶ SurfaceRef::apply
//!                       ├── TransitionOrchestrator (KeyframeRegistry)
//!                       └── ScrollTracker::flush ──▶ observations
//!
//! host pointer input ──▶ GestureClassifier::handle ──▶ EventQueue / Dispatcher
//! host environment   ──▶ QualityController::update ──▶ QualityProfile
//! ```
//!
//! Everything is single-threaded; the host owns its surfaces and the engine
//! holds them weakly.

pub mod dispatch;
pub mod easing;
pub mod error;
pub mod events;
pub mod gesture;
pub mod keyframes;
pub mod math;
pub mod quality;
pub mod scheduler;
pub mod scroll;
pub mod surface;
pub mod transition;
pub mod types;
pub mod viewport;

pub use dispatch::{Dispatcher, Subscription};
pub use easing::EasingId;
pub use error::{MotionError, Result};
pub use events::{EngineEvent, EventQueue, TransitionEvent};
pub use gesture::{GestureClassifier, GestureEvent, PointerEvent, PullToRefresh};
pub use keyframes::{Keyframe, KeyframeAnimation, KeyframeLease, KeyframeRegistry};
pub use quality::{DeviceClass, DeviceSignals, QualityController, QualityProfile, QualityTier};
pub use scheduler::{FrameHandle, FrameScheduler, FrameTick, TweenSpec};
pub use scroll::{HorizontalScroll, ScrollSnap};
pub use surface::{MemorySurface, Rect, Surface, SurfaceRef, VisualProperty, VisualState};
pub use transition::{
    TransitionCompletion, TransitionConfig, TransitionKind, TransitionOrchestrator, TransitionOutcome,
};
pub use types::{AnimationConfig, MotionStatus, Point, SurfaceId};
pub use viewport::{ScrollTracker, TrackMode, ViewportSignal};
