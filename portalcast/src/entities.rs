//! Component kinds and the closed set of components the engine routes.
//!
//! Every component belongs to exactly one [`ComponentKind`], and each kind is
//! owned by one registered [`System`](crate::system::System).

use crate::behaviour::CBehaviour;
use crate::render::CRender;
use crate::world::EntityId;

/// Which system owns a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Render,
    Behaviour,
}

/// A component on its way to the system that will own it.
#[derive(Debug)]
pub enum Component {
    Render(CRender),
    Behaviour(CBehaviour),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Render(_) => ComponentKind::Render,
            Component::Behaviour(_) => ComponentKind::Behaviour,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        match self {
            Component::Render(c) => c.entity_id(),
            Component::Behaviour(c) => c.entity_id(),
        }
    }
}

impl From<CRender> for Component {
    fn from(c: CRender) -> Self {
        Component::Render(c)
    }
}

impl From<CBehaviour> for Component {
    fn from(c: CBehaviour) -> Self {
        Component::Behaviour(c)
    }
}
