//! Engine events for lifecycle callbacks.
//!
//! Components push events onto an [`EventQueue`] while handling input or
//! ticking; the host drains them after each update to react to gestures and
//! transition lifecycle changes.
//!
//! # Usage
//!
//! ```ignore
//! classifier.handle(event);
//!
//! for event in classifier.drain_events() {
//!     match event {
//!         EngineEvent::Gesture { event: GestureEvent::Swipe { direction, .. }, .. } => {
//!             println!("swiped {:?}", direction);
//!         }
//!         EngineEvent::Transition(TransitionEvent::Completed { surface_id, .. }) => {
//!             println!("transition done on {:?}", surface_id);
//!         }
//!         _ => {}
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::gesture::GestureEvent;
use crate::transition::{TransitionDirection, TransitionKind};
use crate::types::{SurfaceId, TransitionId};

/// Event emitted when a transition changes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionEvent {
    /// Transition has started.
    Started {
        transition_id: TransitionId,
        surface_id: SurfaceId,
        kind: TransitionKind,
        direction: TransitionDirection,
    },
    /// Transition ran its full duration.
    Completed {
        transition_id: TransitionId,
        surface_id: SurfaceId,
        kind: TransitionKind,
        direction: TransitionDirection,
    },
    /// Transition was cancelled or its surface unmounted.
    Cancelled {
        transition_id: TransitionId,
        surface_id: SurfaceId,
        kind: TransitionKind,
        direction: TransitionDirection,
    },
}

impl TransitionEvent {
    pub fn surface_id(&self) -> SurfaceId {
        match self {
            Self::Started { surface_id, .. }
            | Self::Completed { surface_id, .. }
            | Self::Cancelled { surface_id, .. } => *surface_id,
        }
    }

    pub fn transition_id(&self) -> TransitionId {
        match self {
            Self::Started { transition_id, .. }
            | Self::Completed { transition_id, .. }
            | Self::Cancelled { transition_id, .. } => *transition_id,
        }
    }
}

/// Wrapper enum for every event the engine queues.
///
/// Adjacently tagged: `{"kind": "transition", "data": {...}}`. Transition
/// payloads carry their own `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A classified gesture on a surface.
    Gesture {
        surface_id: SurfaceId,
        event: GestureEvent,
    },
    /// A transition lifecycle event.
    Transition(TransitionEvent),
}

impl EngineEvent {
    pub fn surface_id(&self) -> SurfaceId {
        match self {
            Self::Gesture { surface_id, .. } => *surface_id,
            Self::Transition(e) => e.surface_id(),
        }
    }

    pub fn as_gesture(&self) -> Option<&GestureEvent> {
        match self {
            Self::Gesture { event, .. } => Some(event),
            Self::Transition(_) => None,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Self::Transition(TransitionEvent::Started { .. }))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Transition(TransitionEvent::Completed { .. }))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transition(TransitionEvent::Cancelled { .. }))
    }
}

impl From<TransitionEvent> for EngineEvent {
    fn from(event: TransitionEvent) -> Self {
        Self::Transition(event)
    }
}

/// Queue for collecting events during update cycles.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<EngineEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_gesture(&mut self, surface_id: SurfaceId, event: GestureEvent) {
        self.events.push_back(EngineEvent::Gesture { surface_id, event });
    }

    pub fn push_transition(&mut self, event: TransitionEvent) {
        self.events.push_back(EngineEvent::Transition(event));
    }

    pub fn push(&mut self, event: EngineEvent) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    /// Drain all events from the queue.
    pub fn drain(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.events.drain(..)
    }

    pub fn peek(&self) -> Option<&EngineEvent> {
        self.events.front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Get events for a specific surface.
    pub fn events_for_surface(&self, surface_id: SurfaceId) -> Vec<&EngineEvent> {
        self.events
            .iter()
            .filter(|e| e.surface_id() == surface_id)
            .collect()
    }
}
