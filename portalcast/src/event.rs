//! Game events and the string-keyed event bus used by collaborators.
//!
//! Inside the engine events are a closed enum, matched exhaustively. The
//! string name of an event only matters at the [`EventBus`] boundary, where
//! game-logic code subscribes by name.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::deferred::Deferred;
use crate::world::EntityId;

pub const ENTITY_CHANGED_ZONE: &str = "entity_changed_zone";
pub const ENTITY_DELETED: &str = "entity_deleted";

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// An entity moved from one region to another.
    EntityChangedZone {
        entity_id: EntityId,
        old_zone: EntityId,
        new_zone: EntityId,
    },
    /// An entity was marked for deletion; its components are still readable.
    EntityDeleted { entity_id: EntityId },
    /// Anything else game logic wants to announce.
    Named {
        name: String,
        entity_id: Option<EntityId>,
    },
}

impl GameEvent {
    pub fn named(name: impl Into<String>, entity_id: Option<EntityId>) -> Self {
        GameEvent::Named {
            name: name.into(),
            entity_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GameEvent::EntityChangedZone { .. } => ENTITY_CHANGED_ZONE,
            GameEvent::EntityDeleted { .. } => ENTITY_DELETED,
            GameEvent::Named { name, .. } => name,
        }
    }

    /// The entity the event is about, if any.
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            GameEvent::EntityChangedZone { entity_id, .. } => Some(*entity_id),
            GameEvent::EntityDeleted { entity_id } => Some(*entity_id),
            GameEvent::Named { entity_id, .. } => *entity_id,
        }
    }
}

/// Identifies a subscription made with [`EventBus::listen`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Handler = Rc<RefCell<dyn FnMut(&GameEvent)>>;

/// Name-keyed publish/subscribe for code outside the engine.
///
/// Methods take `&self` so handlers can hold an `Rc<EventBus>` and subscribe
/// or unsubscribe from inside a callback. Such changes are held back until
/// the outermost `fire` returns.
pub struct EventBus {
    next_id: Cell<u64>,
    handlers: RefCell<BTreeMap<String, BTreeMap<ListenerId, Handler>>>,
    depth: Cell<u32>,
    pending_addition: RefCell<Vec<(String, ListenerId, Handler)>>,
    pending_forget: RefCell<Deferred<ListenerId>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            handlers: RefCell::new(BTreeMap::new()),
            depth: Cell::new(0),
            pending_addition: RefCell::new(Vec::new()),
            pending_forget: RefCell::new(Deferred::new()),
        }
    }

    fn processing(&self) -> bool {
        self.depth.get() > 0
    }

    pub fn listen(&self, name: impl Into<String>, f: impl FnMut(&GameEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let handler: Handler = Rc::new(RefCell::new(f));
        let name = name.into();

        if self.processing() {
            self.pending_addition.borrow_mut().push((name, id, handler));
        } else {
            self.handlers
                .borrow_mut()
                .entry(name)
                .or_default()
                .insert(id, handler);
        }
        id
    }

    pub fn forget(&self, id: ListenerId) {
        if self.processing() {
            self.pending_addition
                .borrow_mut()
                .retain(|(_, pending, _)| *pending != id);
            self.pending_forget.borrow_mut().mark(id);
        } else {
            self.forget_now(id);
        }
    }

    fn forget_now(&self, id: ListenerId) {
        let mut handlers = self.handlers.borrow_mut();
        for listeners in handlers.values_mut() {
            listeners.remove(&id);
        }
        handlers.retain(|_, listeners| !listeners.is_empty());
    }

    /// Call every listener subscribed to `event.name()`, in subscription order.
    pub fn fire(&self, event: &GameEvent) {
        let listeners: Vec<(ListenerId, Handler)> = self
            .handlers
            .borrow()
            .get(event.name())
            .map(|l| l.iter().map(|(id, h)| (*id, Rc::clone(h))).collect())
            .unwrap_or_default();

        self.depth.set(self.depth.get() + 1);
        for (id, handler) in listeners {
            if self.pending_forget.borrow().is_marked(&id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut f) => f(event),
                Err(_) => log::warn!(
                    "Listener {id:?} re-entered while handling '{}'; skipped",
                    event.name()
                ),
            };
        }
        self.depth.set(self.depth.get() - 1);

        if !self.processing() {
            self.apply_pending();
        }
    }

    fn apply_pending(&self) {
        let forgotten = self.pending_forget.borrow_mut().take();
        for id in forgotten {
            self.forget_now(id);
        }

        let added: Vec<_> = self.pending_addition.borrow_mut().drain(..).collect();
        let mut handlers = self.handlers.borrow_mut();
        for (name, id, handler) in added {
            handlers.entry(name).or_default().insert(id, handler);
        }
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.handlers.borrow().get(name).map(|l| l.len()).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
