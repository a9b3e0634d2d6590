//! Page events and the document-level listener registry.
//!
//! Listeners are tracked by kind and phase only; the tool that registered
//! them receives the events from its host. A [`Subscription`] owns a set of
//! registrations and removes them when dropped, so every exit path from a
//! state that listens also stops listening.

use log::trace;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// `KeyboardEvent.key` value that cancels a selection.
pub const ESCAPE_KEY: &str = "Escape";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    Click,
    KeyDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    PointerMove { x: f32, y: f32 },
    Click { x: f32, y: f32 },
    KeyDown { key: String },
}

impl PageEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PageEvent::PointerMove { .. } => EventKind::PointerMove,
            PageEvent::Click { .. } => EventKind::Click,
            PageEvent::KeyDown { .. } => EventKind::KeyDown,
        }
    }

    pub fn key(key: &str) -> Self {
        PageEvent::KeyDown {
            key: key.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

/// What a listener did to an event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventOutcome {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl EventOutcome {
    /// `preventDefault()` plus `stopPropagation()`.
    pub fn consumed() -> Self {
        EventOutcome {
            default_prevented: true,
            propagation_stopped: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

#[derive(Debug)]
struct Registration {
    id: ListenerId,
    kind: EventKind,
    phase: Phase,
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    registrations: Vec<Registration>,
}

pub type SharedRegistry = Rc<RefCell<ListenerRegistry>>;

impl ListenerRegistry {
    pub fn add(&mut self, kind: EventKind, phase: Phase) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration { id, kind, phase });
        id
    }

    /// Returns false if `id` was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|registration| registration.id != id);
        before != self.registrations.len()
    }

    pub fn has(&self, kind: EventKind, phase: Phase) -> bool {
        self.registrations
            .iter()
            .any(|registration| registration.kind == kind && registration.phase == phase)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Registrations that live exactly as long as this guard.
#[derive(Debug)]
#[must_use = "dropping the subscription removes its listeners"]
pub struct Subscription {
    registry: Weak<RefCell<ListenerRegistry>>,
    ids: Vec<ListenerId>,
}

impl Subscription {
    pub fn subscribe(registry: &SharedRegistry, kinds: &[EventKind], phase: Phase) -> Self {
        let ids = {
            let mut registry = registry.borrow_mut();
            kinds.iter().map(|kind| registry.add(*kind, phase)).collect()
        };
        trace!("subscribed to {kinds:?} ({phase:?})");
        Subscription {
            registry: Rc::downgrade(registry),
            ids,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The page may already be gone; then there is nothing to detach from.
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.borrow_mut();
            for id in self.ids.drain(..) {
                registry.remove(id);
            }
        }
        trace!("subscription disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_detaches_on_drop() {
        let registry: SharedRegistry = Rc::default();
        let subscription = Subscription::subscribe(
            &registry,
            &[EventKind::PointerMove, EventKind::Click, EventKind::KeyDown],
            Phase::Capture,
        );
        assert_eq!(registry.borrow().len(), 3);
        assert!(registry.borrow().has(EventKind::Click, Phase::Capture));
        assert!(!registry.borrow().has(EventKind::Click, Phase::Bubble));
        drop(subscription);
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn test_drop_leaves_other_listeners() {
        let registry: SharedRegistry = Rc::default();
        let other = registry.borrow_mut().add(EventKind::Click, Phase::Bubble);
        drop(Subscription::subscribe(&registry, &[EventKind::Click], Phase::Capture));
        assert_eq!(registry.borrow().len(), 1);
        assert!(registry.borrow_mut().remove(other));
        assert!(!registry.borrow_mut().remove(other));
    }

    #[test]
    fn test_drop_after_registry_is_gone() {
        let registry: SharedRegistry = Rc::default();
        let subscription = Subscription::subscribe(&registry, &[EventKind::KeyDown], Phase::Capture);
        drop(registry);
        drop(subscription);
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(PageEvent::Click { x: 1.0, y: 2.0 }.kind(), EventKind::Click);
        assert_eq!(PageEvent::key(ESCAPE_KEY).kind(), EventKind::KeyDown);
    }
}
