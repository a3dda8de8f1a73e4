//! The `System` trait and the context handed to systems while they run.

use std::any::Any;
use std::collections::BTreeSet;

use crate::entities::Component;
use crate::error::Result;
use crate::event::GameEvent;
use crate::world::EntityId;

/// Side effects a system requests while it is being updated or is handling
/// an event.
///
/// Nothing here takes effect until the system returns control to the
/// [`EntityManager`](crate::world::EntityManager): raised events are then
/// dispatched in the order they were raised, and deletions are marked
/// pending until the next purge.
#[derive(Debug, Default)]
pub struct SystemContext {
    pub(crate) outgoing: Vec<Outgoing>,
}

#[derive(Debug)]
pub(crate) enum Outgoing {
    Broadcast(GameEvent),
    Targeted(GameEvent, BTreeSet<EntityId>),
    Delete(EntityId),
}

impl SystemContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise an event for every registered system.
    pub fn broadcast(&mut self, event: GameEvent) {
        self.outgoing.push(Outgoing::Broadcast(event));
    }

    /// Raise an event for listeners scoped to `entities`.
    pub fn fire(&mut self, event: GameEvent, entities: BTreeSet<EntityId>) {
        self.outgoing.push(Outgoing::Targeted(event, entities));
    }

    /// Ask for an entity to be deleted. It stays readable until the next purge.
    pub fn delete_entity(&mut self, id: EntityId) {
        self.outgoing.push(Outgoing::Delete(id));
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }
}

/// A system owns every component of one [`ComponentKind`](crate::entities::ComponentKind).
pub trait System: Any {
    /// Called once per tick, in registration order.
    fn update(&mut self, _ctx: &mut SystemContext) {}

    /// Called for every broadcast event.
    fn handle_event(&mut self, _event: &GameEvent, _ctx: &mut SystemContext) {}

    /// Called for events aimed at specific entities.
    fn handle_targeted_event(
        &mut self,
        _event: &GameEvent,
        _entities: &BTreeSet<EntityId>,
        _ctx: &mut SystemContext,
    ) {
    }

    fn has_component(&self, id: EntityId) -> bool;

    /// Take ownership of a component. Errors are fatal construction defects.
    fn add_component(&mut self, component: Component) -> Result<()>;

    /// Drop everything this system holds for `id`. Unknown ids are ignored.
    fn remove_entity(&mut self, id: EntityId);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
