//! Event Bus
//!
//! Synchronous publish/subscribe channel between the ledgers, the arbitrator
//! and whatever presentation layer sits on top. Events are a closed enum, so a
//! subscriber matching on [`GameEvent`] is checked for exhaustiveness by the
//! compiler instead of comparing event-name strings.
//!
//! Delivery happens inside `publish`, in subscription order. The handler list
//! is snapshotted before dispatch, so handlers may subscribe, unsubscribe or
//! publish again while an event is being delivered.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::debug;
use questline_data::QuestDef;

/// The kinds of event a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    InventoryChanged,
    QuestAccepted,
    QuestProgress,
    QuestCompleted,
    DialogueStarted,
    DialogueEnded,
    Notice,
}

impl EventKind {
    /// Canonical event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::InventoryChanged => "inventory:changed",
            EventKind::QuestAccepted => "quest:accepted",
            EventKind::QuestProgress => "quest:progress",
            EventKind::QuestCompleted => "quest:completed",
            EventKind::DialogueStarted => "dialogue:started",
            EventKind::DialogueEnded => "dialogue:ended",
            EventKind::Notice => "notice",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of an `inventory:changed` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryChange {
    /// New count for one item; zero means the item is gone.
    Item { id: String, qty: u32 },
    Cleared,
}

/// Events published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    InventoryChanged(InventoryChange),
    QuestAccepted { id: String, definition: QuestDef },
    QuestProgress { id: String, progress: u32, required: u32 },
    QuestCompleted { id: String, definition: QuestDef },
    DialogueStarted { npc: String },
    DialogueEnded { npc: String },
    /// Short toast-style message for the player.
    Notice { text: String },
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::InventoryChanged(_) => EventKind::InventoryChanged,
            GameEvent::QuestAccepted { .. } => EventKind::QuestAccepted,
            GameEvent::QuestProgress { .. } => EventKind::QuestProgress,
            GameEvent::QuestCompleted { .. } => EventKind::QuestCompleted,
            GameEvent::DialogueStarted { .. } => EventKind::DialogueStarted,
            GameEvent::DialogueEnded { .. } => EventKind::DialogueEnded,
            GameEvent::Notice { .. } => EventKind::Notice,
        }
    }
}

type Handler = Rc<dyn Fn(&GameEvent)>;

struct Registration {
    id: u64,
    /// `None` receives every event.
    kind: Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<Registration>>,
}

impl BusInner {
    fn remove(&self, id: u64) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|r| r.id != id);
        handlers.len() != before
    }
}

/// Shared handle to one bus. Clones publish to and subscribe on the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for one kind of event.
    pub fn subscribe(&self, kind: EventKind, handler: impl Fn(&GameEvent) + 'static) -> Subscription {
        self.register(Some(kind), Rc::new(handler))
    }

    /// Register `handler` for every event.
    pub fn subscribe_all(&self, handler: impl Fn(&GameEvent) + 'static) -> Subscription {
        self.register(None, Rc::new(handler))
    }

    fn register(&self, kind: Option<EventKind>, handler: Handler) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.handlers.borrow_mut().push(Registration { id, kind, handler });
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every matching handler before returning.
    pub fn publish(&self, event: GameEvent) {
        let kind = event.kind();
        let snapshot: Vec<Handler> = self
            .inner
            .handlers
            .borrow()
            .iter()
            .filter(|r| r.kind.is_none_or(|k| k == kind))
            .map(|r| Rc::clone(&r.handler))
            .collect();
        debug!("publishing {kind} to {} handler(s)", snapshot.len());
        for handler in snapshot {
            handler(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle keeps the handler registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Remove the handler. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.bus.upgrade().is_some_and(|bus| bus.remove(self.id))
    }
}
