//! World event bus.
//!
//! Handlers subscribe to an [`EventKind`] with
//! [`World::on`](crate::world::World::on) and are called with the world and
//! the [`Event`] each time one of that kind is emitted. Handlers of one kind
//! run in subscription order.
//!
//! Handlers get `&mut World`, so they can do anything a level callback can:
//! play sounds, switch levels, register shapes.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::shape::ShapeId;
use crate::math::Vector2;
use crate::resources::input::{Key, MouseButton};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseDown,
    MouseUp,
    KeyDown,
    KeyUp,
    Collision,
    LevelChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MouseDown {
        button: MouseButton,
        position: Vector2,
    },
    MouseUp {
        button: MouseButton,
        position: Vector2,
    },
    KeyDown {
        key: Key,
    },
    KeyUp {
        key: Key,
    },
    /// Two shapes touched and were separated this tick.
    Collision {
        a: ShapeId,
        b: ShapeId,
    },
    /// A level finished loading. `from` is `None` for the first load.
    LevelChanged {
        from: Option<usize>,
        to: usize,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MouseDown { .. } => EventKind::MouseDown,
            Event::MouseUp { .. } => EventKind::MouseUp,
            Event::KeyDown { .. } => EventKind::KeyDown,
            Event::KeyUp { .. } => EventKind::KeyUp,
            Event::Collision { .. } => EventKind::Collision,
            Event::LevelChanged { .. } => EventKind::LevelChanged,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&mut World, &Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: FxHashMap<EventKind, SmallVec<[EventHandler; 2]>>,
}

impl EventBus {
    pub fn on(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Snapshot of the handlers for `kind`, safe to call while mutating the world.
    pub fn handlers(&self, kind: EventKind) -> SmallVec<[EventHandler; 2]> {
        self.handlers.get(&kind).cloned().unwrap_or_default()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, SmallVec::len)
    }

    pub fn clear(&mut self, kind: EventKind) {
        self.handlers.remove(&kind);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .handlers
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        counts.sort_by_key(|(kind, _)| *kind as u8);
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
