//! Per-entity scripted behaviour, driven by the entity manager.
//!
//! A [`Behaviour`] is game logic attached to an entity. It runs once per tick
//! and hears the events the engine dispatches. Behaviours never touch other
//! systems directly; anything they want done goes through the
//! [`SystemContext`] they are handed.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::entities::{Component, ComponentKind};
use crate::error::{Result, StructuralError};
use crate::event::GameEvent;
use crate::system::{System, SystemContext};
use crate::world::EntityId;

/// Game logic attached to one entity.
pub trait Behaviour {
    /// Called before the first `update` after the behaviour is attached.
    fn start(&mut self, _entity: EntityId, _ctx: &mut SystemContext) {}

    /// Called once per tick.
    fn update(&mut self, _entity: EntityId, _ctx: &mut SystemContext) {}

    /// Called for broadcast events, and for targeted events that name this entity.
    fn handle_event(&mut self, _entity: EntityId, _event: &GameEvent, _ctx: &mut SystemContext) {}
}

/// Behaviour component. An entity may carry several; they run in the order
/// they were added.
pub struct CBehaviour {
    entity_id: EntityId,
    behaviour: Box<dyn Behaviour>,
    has_started: bool,
}

impl CBehaviour {
    pub fn new(entity_id: EntityId, behaviour: Box<dyn Behaviour>) -> Self {
        Self {
            entity_id,
            behaviour,
            has_started: false,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }
}

impl fmt::Debug for CBehaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CBehaviour")
            .field("entity_id", &self.entity_id)
            .field("has_started", &self.has_started)
            .finish_non_exhaustive()
    }
}

/// Owns every [`CBehaviour`], keyed by entity so dispatch order is stable.
#[derive(Default)]
pub struct BehaviourSystem {
    behaviours: BTreeMap<EntityId, Vec<CBehaviour>>,
}

impl BehaviourSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of behaviours attached to `id`.
    pub fn count(&self, id: EntityId) -> usize {
        self.behaviours.get(&id).map(Vec::len).unwrap_or(0)
    }
}

impl System for BehaviourSystem {
    fn update(&mut self, ctx: &mut SystemContext) {
        for (id, list) in &mut self.behaviours {
            for c in list.iter_mut() {
                if !c.has_started {
                    c.behaviour.start(*id, ctx);
                    c.has_started = true;
                }
                c.behaviour.update(*id, ctx);
            }
        }
    }

    fn handle_event(&mut self, event: &GameEvent, ctx: &mut SystemContext) {
        for (id, list) in &mut self.behaviours {
            for c in list.iter_mut() {
                c.behaviour.handle_event(*id, event, ctx);
            }
        }
    }

    fn handle_targeted_event(
        &mut self,
        event: &GameEvent,
        entities: &BTreeSet<EntityId>,
        ctx: &mut SystemContext,
    ) {
        for id in entities {
            if let Some(list) = self.behaviours.get_mut(id) {
                for c in list.iter_mut() {
                    c.behaviour.handle_event(*id, event, ctx);
                }
            }
        }
    }

    fn has_component(&self, id: EntityId) -> bool {
        self.behaviours.contains_key(&id)
    }

    fn add_component(&mut self, component: Component) -> Result<()> {
        match component {
            Component::Behaviour(c) => {
                log::trace!("Attaching behaviour to entity {}", c.entity_id);
                self.behaviours.entry(c.entity_id).or_default().push(c);
                Ok(())
            }
            other => Err(StructuralError::WrongSystem {
                expected: ComponentKind::Behaviour,
                actual: other.kind(),
            }
            .into()),
        }
    }

    fn remove_entity(&mut self, id: EntityId) {
        self.behaviours.remove(&id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
