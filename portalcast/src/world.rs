use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::deferred::Deferred;
use crate::entities::{Component, ComponentKind};
use crate::error::{Result, StructuralError};
use crate::event::{EventBus, GameEvent};
use crate::system::{Outgoing, System, SystemContext};

/// Unique identifier for an entity. Ids increase monotonically and are never
/// reused within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying integer ID (useful for debugging or serialization).
    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct RegisteredSystem {
    kind: ComponentKind,
    system: Box<dyn System>,
}

/// Routes components to the system that owns their kind and drives those
/// systems once per tick.
///
/// - Ids come from [`next_id`](Self::next_id)
/// - Each [`ComponentKind`] is owned by exactly one registered [`System`]
/// - Events are dispatched synchronously to every system
/// - Deleted entities stay readable until [`purge_entities`](Self::purge_entities)
/// - Broadcasts are also forwarded to an attached [`EventBus`], if any
pub struct EntityManager {
    next_id: u64,
    systems: Vec<RegisteredSystem>,
    pending_delete: Deferred<EntityId>,
    bus: Option<Rc<EventBus>>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            systems: Vec::new(),
            pending_delete: Deferred::new(),
            bus: None,
        }
    }

    /// Forward every broadcast event to `bus` after the systems have seen it.
    pub fn attach_event_bus(&mut self, bus: Rc<EventBus>) {
        self.bus = Some(bus);
    }

    /// Allocate a fresh entity id.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register the system that owns components of `kind`.
    ///
    /// Systems update in registration order. Registering a kind twice replaces
    /// the earlier system in its original slot.
    pub fn add_system(&mut self, kind: ComponentKind, system: Box<dyn System>) {
        if let Some(slot) = self.systems.iter_mut().find(|s| s.kind == kind) {
            log::warn!("Replacing system registered for {kind:?}");
            slot.system = system;
        } else {
            log::debug!("Registered system for {kind:?}");
            self.systems.push(RegisteredSystem { kind, system });
        }
    }

    fn slot(&self, kind: ComponentKind) -> Option<&RegisteredSystem> {
        self.systems.iter().find(|s| s.kind == kind)
    }

    fn slot_mut(&mut self, kind: ComponentKind) -> Option<&mut RegisteredSystem> {
        self.systems.iter_mut().find(|s| s.kind == kind)
    }

    /// Borrow the system registered for `kind` as its concrete type.
    pub fn system<T: System>(&self, kind: ComponentKind) -> Option<&T> {
        self.slot(kind)?.system.as_any().downcast_ref::<T>()
    }

    pub fn system_mut<T: System>(&mut self, kind: ComponentKind) -> Option<&mut T> {
        self.slot_mut(kind)?.system.as_any_mut().downcast_mut::<T>()
    }

    /// False if the entity has no such component, or if no system owns `kind`.
    pub fn has_component(&self, id: EntityId, kind: ComponentKind) -> bool {
        self.slot(kind)
            .map(|s| s.system.has_component(id))
            .unwrap_or(false)
    }

    /// Hand a component to the system that owns its kind.
    pub fn add_component(&mut self, component: Component) -> Result<()> {
        let kind = component.kind();
        let slot = self
            .slot_mut(kind)
            .ok_or(StructuralError::NoSystem(kind))?;

        log::trace!("Adding {kind:?} component for entity {}", component.entity_id());
        slot.system.add_component(component)
    }

    /// True while `id` is waiting to be purged.
    pub fn is_pending_deletion(&self, id: EntityId) -> bool {
        self.pending_delete.is_marked(&id)
    }

    /// Mark an entity for deletion and announce it.
    ///
    /// Listeners scoped to the entity hear first, then every system gets the
    /// broadcast. Components remain in place until the next purge.
    pub fn delete_entity(&mut self, id: EntityId) {
        if !self.pending_delete.mark(id) {
            return;
        }

        let event = GameEvent::EntityDeleted { entity_id: id };
        self.fire_event(&event, &BTreeSet::from([id]));
        self.broadcast_event(&event);
    }

    /// Remove every pending entity from every system.
    pub fn purge_entities(&mut self) {
        for id in self.pending_delete.take() {
            log::trace!("Purging entity {id}");
            for slot in &mut self.systems {
                slot.system.remove_entity(id);
            }
        }
    }

    /// Update every system in registration order.
    ///
    /// Events a system raises are dispatched before the next system updates.
    pub fn update(&mut self) {
        for i in 0..self.systems.len() {
            let mut ctx = SystemContext::new();
            self.systems[i].system.update(&mut ctx);
            self.flush(ctx);
        }
    }

    /// Deliver an event to every system, immediately.
    pub fn broadcast_event(&mut self, event: &GameEvent) {
        let mut contexts = Vec::with_capacity(self.systems.len());
        for slot in &mut self.systems {
            let mut ctx = SystemContext::new();
            slot.system.handle_event(event, &mut ctx);
            contexts.push(ctx);
        }
        if let Some(bus) = &self.bus {
            bus.fire(event);
        }
        for ctx in contexts {
            self.flush(ctx);
        }
    }

    /// Deliver an event to listeners scoped to `entities`, immediately.
    pub fn fire_event(&mut self, event: &GameEvent, entities: &BTreeSet<EntityId>) {
        let mut contexts = Vec::with_capacity(self.systems.len());
        for slot in &mut self.systems {
            let mut ctx = SystemContext::new();
            slot.system.handle_targeted_event(event, entities, &mut ctx);
            contexts.push(ctx);
        }
        for ctx in contexts {
            self.flush(ctx);
        }
    }

    /// Apply what a system asked for, once the pass that produced it is over.
    fn flush(&mut self, ctx: SystemContext) {
        let mut queue: VecDeque<Outgoing> = ctx.outgoing.into();

        while let Some(out) = queue.pop_front() {
            match out {
                Outgoing::Broadcast(event) => self.broadcast_event(&event),
                Outgoing::Targeted(event, entities) => self.fire_event(&event, &entities),
                Outgoing::Delete(id) => self.delete_entity(id),
            }
        }
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}
