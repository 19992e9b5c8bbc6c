//! LIFO list of pending events.

use serde::{Deserialize, Serialize};

use crate::event::{EventId, GameEvent};

/// Pending events; the last element is the top of the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStack {
    events: Vec<GameEvent>,
}

impl EventStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn pop(&mut self) -> Option<GameEvent> {
        self.events.pop()
    }

    /// The next event to resolve.
    pub fn top(&self) -> Option<&GameEvent> {
        self.events.last()
    }

    /// Finds an open event by id.
    pub fn find(&self, id: EventId) -> Option<&GameEvent> {
        self.events.iter().find(|e| *e.id() == id)
    }

    pub(crate) fn find_mut(&mut self, id: EventId) -> Option<&mut GameEvent> {
        self.events.iter_mut().find(|e| *e.id() == id)
    }

    /// Number of open events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }
}
