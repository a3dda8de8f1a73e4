//! Portalcast - a small 2.5D portal renderer.
//!
//! A level is a tree of regions joined through portals. Entities carry
//! components owned by systems; the render system keeps the region tree and
//! draws it with a CPU column caster.

pub mod assets;
pub mod audio;
pub mod behaviour;
pub mod camera;
pub mod deferred;
pub mod effects;
pub mod engine;
pub mod entities;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod math;
pub mod render;
pub mod scene;
pub mod system;
pub mod time;
pub mod world;

pub use crate::assets::TextureStore;
pub use crate::audio::AudioService;
pub use crate::behaviour::{Behaviour, BehaviourSystem, CBehaviour};
pub use crate::camera::Camera;
pub use crate::engine::{Engine, EngineConfig};
pub use crate::entities::{Component, ComponentKind};
pub use crate::error::{ContractViolation, EngineError, Result, StructuralError};
pub use crate::event::{EventBus, GameEvent, ListenerId};
pub use crate::math::{LineSegment, Matrix, Point, Size, Vec2f};
pub use crate::render::{CRender, CRenderKind, RenderSystem};
pub use crate::scene::{PolyPath, RegionStyle, SceneBuilder};
pub use crate::system::{System, SystemContext};
pub use crate::time::{TimeService, TimerId, Tween};
pub use crate::world::{EntityId, EntityManager};
