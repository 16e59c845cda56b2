use crate::model::Guid;
use ahash::AHashMap;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredKind {
    HideMenu,
    RestoreFocus,
}

/// Work the UI schedules to run after the current event has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredAction {
    HideMenu,
    RestoreFocus(Guid),
}

impl DeferredAction {
    pub fn kind(&self) -> DeferredKind {
        match self {
            DeferredAction::HideMenu => DeferredKind::HideMenu,
            DeferredAction::RestoreFocus(_) => DeferredKind::RestoreFocus,
        }
    }
}

/// Handle of a scheduled action. Stale once a newer action of the same kind is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: DeferredKind,
    pub generation: u64,
}

/// Pending deferred actions. An action only runs if its ticket is still the latest of its kind.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    generations: AHashMap<DeferredKind, u64>,
    pending: VecDeque<(Ticket, DeferredAction)>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, action: DeferredAction) -> Ticket {
        let ticket = self.bump(action.kind());
        self.pending.push_back((ticket, action));
        ticket
    }

    /// Invalidates every pending action of `kind`.
    pub fn supersede(&mut self, kind: DeferredKind) {
        self.bump(kind);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generations.get(&ticket.kind).copied() == Some(ticket.generation)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Empties the queue, returning the actions that are still valid in schedule order.
    pub fn drain_current(&mut self) -> Vec<DeferredAction> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter(|(ticket, _)| self.is_current(*ticket))
            .map(|(_, action)| action)
            .collect()
    }

    fn bump(&mut self, kind: DeferredKind) -> Ticket {
        let generation = self.generations.entry(kind).or_insert(0);
        *generation += 1;
        Ticket {
            kind,
            generation: *generation,
        }
    }
}
