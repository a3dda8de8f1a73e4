//! Portal scene graph, its owning system and the software rasterizer.

mod animation;
mod components;
mod graph;
mod rasterizer;
mod sprite;
mod system;

pub use animation::{Animation, AnimationFrame, FrameRect, DEFAULT_VIEWS};
pub use components::{
    CBoundary, CFloorDecal, CJoin, COverlay, CRegion, CRender, CRenderKind, CWall, CWallDecal,
    OverlayKind, DEFAULT_TEXTURE,
};
pub use graph::RenderGraph;
pub use rasterizer::{RasterSettings, Rasterizer};
pub use sprite::{CSprite, IDLE_ANIMATION};
pub use system::RenderSystem;
