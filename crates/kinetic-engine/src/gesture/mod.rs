//! Pointer gesture recognition.
//!
//! This module provides:
//! - `PointerEvent`: the raw input the host feeds in
//! - `GestureEvent`: classified swipe / pinch / long-press / pull events
//! - `GestureSession`: per-touch-group state from pointer-down to release
//! - `GestureClassifier`: one per surface, owns the session and recognizers
//!
//! Recognition runs entirely inside the host's pointer callbacks and
//! [`GestureClassifier::tick`]; nothing runs in the background.

mod classifier;
mod long_press;
mod pinch;
mod pull;
mod swipe;

pub use classifier::GestureClassifier;
pub use long_press::LongPressTimer;
pub use pinch::PinchTracker;
pub use pull::{PullRelease, PullToRefresh, RefreshFuture, RefreshTask};
pub use swipe::{SwipeThresholds, classify_swipe};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Point;

/// Raw pointer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Cancel,
}

/// One pointer or touch sample from the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pointer_id: u32,
    pub position: Point,
    pub timestamp_ms: f64,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, pointer_id: u32, x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self {
            kind,
            pointer_id,
            position: Point::new(x, y),
            timestamp_ms,
        }
    }

    pub fn down(pointer_id: u32, x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self::new(PointerKind::Down, pointer_id, x, y, timestamp_ms)
    }

    pub fn moved(pointer_id: u32, x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self::new(PointerKind::Move, pointer_id, x, y, timestamp_ms)
    }

    pub fn up(pointer_id: u32, x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self::new(PointerKind::Up, pointer_id, x, y, timestamp_ms)
    }

    pub fn cancel(pointer_id: u32, timestamp_ms: f64) -> Self {
        Self::new(PointerKind::Cancel, pointer_id, 0.0, 0.0, timestamp_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinchPhase {
    /// Both points are down and moving.
    Changed,
    /// One of the points lifted; `scale` is final.
    Ended,
}

/// A classified gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureEvent {
    Swipe {
        direction: SwipeDirection,
        /// Travel along the dominant axis in pixels.
        distance: f32,
        /// px/ms
        velocity: f32,
        start: Point,
        end: Point,
    },
    Pinch {
        scale: f32,
        delta_scale: f32,
        center: Point,
        phase: PinchPhase,
    },
    LongPress {
        position: Point,
        duration_ms: f64,
    },
    PullToRefresh {
        distance: f32,
        triggered: bool,
    },
}

impl GestureEvent {
    pub fn kind(&self) -> GestureKind {
        match self {
            Self::Swipe { .. } => GestureKind::Swipe,
            Self::Pinch { .. } => GestureKind::Pinch,
            Self::LongPress { .. } => GestureKind::LongPress,
            Self::PullToRefresh { .. } => GestureKind::PullToRefresh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Swipe,
    Pinch,
    LongPress,
    PullToRefresh,
}

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Tracking,
    Resolved(GestureKind),
    Cancelled,
}

/// State of one touch group, from first pointer-down to last release.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    pub start_position: Point,
    pub start_time: f64,
    pub last_position: Point,
    pub last_time: f64,
    /// Most pointers seen down at once.
    pub pointer_count: usize,
    pub phase: SessionPhase,
    primary: u32,
    pointers: BTreeMap<u32, Point>,
}

impl GestureSession {
    pub fn new(pointer_id: u32, position: Point, timestamp_ms: f64) -> Self {
        let mut pointers = BTreeMap::new();
        pointers.insert(pointer_id, position);
        Self {
            start_position: position,
            start_time: timestamp_ms,
            last_position: position,
            last_time: timestamp_ms,
            pointer_count: 1,
            phase: SessionPhase::Tracking,
            primary: pointer_id,
            pointers,
        }
    }

    /// A second pointer joined at some point; swipe is no longer possible.
    pub fn is_multi_touch(&self) -> bool {
        self.pointer_count > 1
    }

    pub fn primary(&self) -> u32 {
        self.primary
    }

    pub fn contains(&self, pointer_id: u32) -> bool {
        self.pointers.contains_key(&pointer_id)
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Positions of the first two active pointers.
    pub fn pair(&self) -> Option<(Point, Point)> {
        let mut it = self.pointers.values();
        Some((*it.next()?, *it.next()?))
    }

    pub fn duration_ms(&self) -> f64 {
        (self.last_time - self.start_time).max(0.0)
    }

    pub(crate) fn add_pointer(&mut self, pointer_id: u32, position: Point) {
        self.pointers.insert(pointer_id, position);
        self.pointer_count = self.pointer_count.max(self.pointers.len());
    }

    pub(crate) fn move_pointer(&mut self, pointer_id: u32, position: Point, timestamp_ms: f64) {
        if let Some(p) = self.pointers.get_mut(&pointer_id) {
            *p = position;
        }
        if pointer_id == self.primary {
            self.last_position = position;
            self.last_time = timestamp_ms;
        }
    }

    pub(crate) fn remove_pointer(&mut self, pointer_id: u32) -> bool {
        self.pointers.remove(&pointer_id).is_some()
    }
}

/// Side effect fired once per successful long-press (haptics, sound).
pub trait FeedbackSink {
    fn long_press(&self);
}

impl<F: Fn()> FeedbackSink for F {
    fn long_press(&self) {
        self()
    }
}
