//! Engine error types.
//!
//! Every failure the core can report is either a malformed scene graph
//! ([`StructuralError`]) or a caller passing a value outside its contract
//! ([`ContractViolation`]). Neither is retried or recovered locally.

use thiserror::Error;

use crate::entities::ComponentKind;
use crate::render::CRenderKind;
use crate::world::EntityId;

/// Malformed construction data for the scene graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("root region already set")]
    DuplicateRoot,

    #[error("could not find parent component with id {0}")]
    UnknownParent(EntityId),

    #[error("cannot add component of kind {child} to component of kind {parent}")]
    HostMismatch { parent: CRenderKind, child: CRenderKind },

    #[error("component of kind {0} has no parent and is not a root region or overlay")]
    Parentless(CRenderKind),

    #[error("no system registered for component kind {0:?}")]
    NoSystem(ComponentKind),

    #[error("system for kind {expected:?} was handed a component of kind {actual:?}")]
    WrongSystem {
        expected: ComponentKind,
        actual: ComponentKind,
    },

    #[error("entity {0} is not a region")]
    UnknownRegion(EntityId),
}

/// A numeric argument outside the range the callee accepts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("tween value of {0} is out of range [0, 1]")]
    FractionOutOfRange(f64),

    #[error("index {index} out of bounds for buffer of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
}

pub type Result<T> = std::result::Result<T, EngineError>;
