//! Render components: the nodes of the portal scene graph.

use std::fmt;

use crate::math::{LineSegment, Matrix, Point, Size};
use crate::world::EntityId;

use super::sprite::CSprite;

/// Texture name meaning "not specified"; loses to any other name when two
/// joins are merged.
pub const DEFAULT_TEXTURE: &str = "default";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CRenderKind {
    Region,
    Wall,
    Join,
    Sprite,
    FloorDecal,
    WallDecal,
    Overlay,
}

impl CRenderKind {
    /// Whether a component of this kind may have a `child` kind attached to it.
    pub fn can_host(self, child: CRenderKind) -> bool {
        use CRenderKind::*;
        match self {
            Region => matches!(child, Region | Wall | Join | Sprite | FloorDecal),
            Wall | Join => child == WallDecal,
            Sprite | FloorDecal | WallDecal | Overlay => false,
        }
    }
}

impl fmt::Display for CRenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CRenderKind::Region => "REGION",
            CRenderKind::Wall => "WALL",
            CRenderKind::Join => "JOIN",
            CRenderKind::Sprite => "SPRITE",
            CRenderKind::FloorDecal => "FLOOR_DECAL",
            CRenderKind::WallDecal => "WALL_DECAL",
            CRenderKind::Overlay => "OVERLAY",
        };
        f.write_str(s)
    }
}

/// A subspace of the map with its own floor and ceiling.
///
/// Child regions, sprites and floor decals are owned here. Boundaries are
/// owned by the graph's flat list and only referenced by id.
#[derive(Clone, Debug)]
pub struct CRegion {
    pub entity_id: EntityId,
    pub parent_id: Option<EntityId>,
    pub has_ceiling: bool,
    pub floor_height: f64,
    pub ceiling_height: f64,
    pub floor_texture: String,
    pub ceiling_texture: String,
    pub children: Vec<CRegion>,
    pub boundaries: Vec<EntityId>,
    pub sprites: Vec<CSprite>,
    pub floor_decals: Vec<CFloorDecal>,
}

impl CRegion {
    pub fn new(entity_id: EntityId, parent_id: Option<EntityId>) -> Self {
        Self {
            entity_id,
            parent_id,
            has_ceiling: true,
            floor_height: 0.0,
            ceiling_height: 100.0,
            floor_texture: DEFAULT_TEXTURE.to_string(),
            ceiling_texture: DEFAULT_TEXTURE.to_string(),
            children: Vec::new(),
            boundaries: Vec::new(),
            sprites: Vec::new(),
            floor_decals: Vec::new(),
        }
    }

    pub fn sprite(&self, id: EntityId) -> Option<&CSprite> {
        self.sprites.iter().find(|s| s.entity_id == id)
    }

    pub fn sprite_mut(&mut self, id: EntityId) -> Option<&mut CSprite> {
        self.sprites.iter_mut().find(|s| s.entity_id == id)
    }
}

#[derive(Clone, Debug)]
pub struct CWall {
    pub entity_id: EntityId,
    pub parent_id: Option<EntityId>,
    pub lseg: LineSegment,
    pub texture: String,
    /// The region this wall bounds. Set when the wall is attached.
    pub region: Option<EntityId>,
    pub decals: Vec<CWallDecal>,
}

impl CWall {
    pub fn new(entity_id: EntityId, parent_id: EntityId, lseg: LineSegment) -> Self {
        Self {
            entity_id,
            parent_id: Some(parent_id),
            lseg,
            texture: DEFAULT_TEXTURE.to_string(),
            region: None,
            decals: Vec::new(),
        }
    }
}

/// A portal between two regions.
///
/// Both sides of a portal are authored separately, one per region, sharing a
/// `join_id`. Connecting regions pairs them up and fills in `region_a` and
/// `region_b`.
#[derive(Clone, Debug)]
pub struct CJoin {
    pub entity_id: EntityId,
    pub parent_id: Option<EntityId>,
    pub lseg: LineSegment,
    pub join_id: EntityId,
    pub top_texture: String,
    pub bottom_texture: String,
    pub region_a: Option<EntityId>,
    pub region_b: Option<EntityId>,
    pub decals: Vec<CWallDecal>,
}

impl CJoin {
    pub fn new(entity_id: EntityId, parent_id: EntityId, lseg: LineSegment, join_id: EntityId) -> Self {
        Self {
            entity_id,
            parent_id: Some(parent_id),
            lseg,
            join_id,
            top_texture: DEFAULT_TEXTURE.to_string(),
            bottom_texture: DEFAULT_TEXTURE.to_string(),
            region_a: None,
            region_b: None,
            decals: Vec::new(),
        }
    }

    /// Take the other side's textures wherever they are not the default.
    pub fn merge_in(&mut self, top_texture: &str, bottom_texture: &str) {
        if top_texture != DEFAULT_TEXTURE {
            self.top_texture = top_texture.to_string();
        }
        if bottom_texture != DEFAULT_TEXTURE {
            self.bottom_texture = bottom_texture.to_string();
        }
    }

    /// The region across the portal from `from`, if the portal is connected.
    pub fn other_side(&self, from: EntityId) -> Option<EntityId> {
        match (self.region_a, self.region_b) {
            (Some(a), Some(b)) if a == from && b != from => Some(b),
            (Some(a), Some(b)) if b == from && a != from => Some(a),
            _ => None,
        }
    }
}

/// A wall or a join, stored in the graph's flat boundary list.
#[derive(Clone, Debug)]
pub enum CBoundary {
    Wall(CWall),
    Join(CJoin),
}

impl CBoundary {
    pub fn entity_id(&self) -> EntityId {
        match self {
            CBoundary::Wall(w) => w.entity_id,
            CBoundary::Join(j) => j.entity_id,
        }
    }

    pub fn lseg(&self) -> &LineSegment {
        match self {
            CBoundary::Wall(w) => &w.lseg,
            CBoundary::Join(j) => &j.lseg,
        }
    }

    pub fn decals(&self) -> &[CWallDecal] {
        match self {
            CBoundary::Wall(w) => &w.decals,
            CBoundary::Join(j) => &j.decals,
        }
    }

    pub fn decals_mut(&mut self) -> &mut Vec<CWallDecal> {
        match self {
            CBoundary::Wall(w) => &mut w.decals,
            CBoundary::Join(j) => &mut j.decals,
        }
    }
}

/// A texture laid flat on a region's floor.
///
/// `transform` maps decal-local space, where the decal covers
/// `[0, size.x] x [0, size.y]`, into world space.
#[derive(Clone, Debug)]
pub struct CFloorDecal {
    pub entity_id: EntityId,
    pub parent_id: Option<EntityId>,
    pub texture: String,
    pub size: Size,
    pub transform: Matrix,
}

/// A texture stuck to a wall or join.
///
/// `pos.x` is the distance along the boundary from its first point and
/// `pos.y` the height of the decal's bottom edge above the floor.
#[derive(Clone, Debug)]
pub struct CWallDecal {
    pub entity_id: EntityId,
    pub parent_id: Option<EntityId>,
    pub texture: String,
    pub size: Size,
    pub pos: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayKind {
    Image { texture: String, size: Size },
    Colour { colour: [u8; 4], size: Size },
}

/// Screen-space element drawn over the scene.
///
/// Position and size are in viewport units, measured from the top-left
/// corner of the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct COverlay {
    pub entity_id: EntityId,
    pub pos: Point,
    pub z_index: i32,
    pub kind: OverlayKind,
}

impl COverlay {
    pub fn size(&self) -> Size {
        match &self.kind {
            OverlayKind::Image { size, .. } | OverlayKind::Colour { size, .. } => *size,
        }
    }
}

/// Every kind of component the render system owns.
#[derive(Clone, Debug)]
pub enum CRender {
    Region(CRegion),
    Wall(CWall),
    Join(CJoin),
    Sprite(CSprite),
    FloorDecal(CFloorDecal),
    WallDecal(CWallDecal),
    Overlay(COverlay),
}

impl CRender {
    pub fn kind(&self) -> CRenderKind {
        match self {
            CRender::Region(_) => CRenderKind::Region,
            CRender::Wall(_) => CRenderKind::Wall,
            CRender::Join(_) => CRenderKind::Join,
            CRender::Sprite(_) => CRenderKind::Sprite,
            CRender::FloorDecal(_) => CRenderKind::FloorDecal,
            CRender::WallDecal(_) => CRenderKind::WallDecal,
            CRender::Overlay(_) => CRenderKind::Overlay,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        match self {
            CRender::Region(c) => c.entity_id,
            CRender::Wall(c) => c.entity_id,
            CRender::Join(c) => c.entity_id,
            CRender::Sprite(c) => c.entity_id,
            CRender::FloorDecal(c) => c.entity_id,
            CRender::WallDecal(c) => c.entity_id,
            CRender::Overlay(c) => c.entity_id,
        }
    }

    /// Overlays never have a parent.
    pub fn parent_id(&self) -> Option<EntityId> {
        match self {
            CRender::Region(c) => c.parent_id,
            CRender::Wall(c) => c.parent_id,
            CRender::Join(c) => c.parent_id,
            CRender::Sprite(c) => c.parent_id,
            CRender::FloorDecal(c) => c.parent_id,
            CRender::WallDecal(c) => c.parent_id,
            CRender::Overlay(_) => None,
        }
    }

    pub(crate) fn set_parent_id(&mut self, parent: EntityId) {
        let slot = match self {
            CRender::Region(c) => &mut c.parent_id,
            CRender::Wall(c) => &mut c.parent_id,
            CRender::Join(c) => &mut c.parent_id,
            CRender::Sprite(c) => &mut c.parent_id,
            CRender::FloorDecal(c) => &mut c.parent_id,
            CRender::WallDecal(c) => &mut c.parent_id,
            CRender::Overlay(_) => return,
        };
        *slot = Some(parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(top: &str, bottom: &str) -> CJoin {
        let mut j = CJoin::new(
            EntityId::new(1),
            EntityId::new(2),
            LineSegment::default(),
            EntityId::new(9),
        );
        j.top_texture = top.to_string();
        j.bottom_texture = bottom.to_string();
        j
    }

    #[test]
    fn regions_host_geometry_and_boundaries_host_decals() {
        use CRenderKind::*;
        assert!(Region.can_host(Sprite));
        assert!(Region.can_host(Join));
        assert!(!Region.can_host(WallDecal));
        assert!(!Region.can_host(Overlay));
        assert!(Wall.can_host(WallDecal));
        assert!(Join.can_host(WallDecal));
        assert!(!Sprite.can_host(WallDecal));
    }

    #[test]
    fn merge_prefers_non_default() {
        let mut a = join(DEFAULT_TEXTURE, "slime");
        a.merge_in("brick", DEFAULT_TEXTURE);
        assert_eq!(a.top_texture, "brick");
        assert_eq!(a.bottom_texture, "slime");

        let mut b = join(DEFAULT_TEXTURE, DEFAULT_TEXTURE);
        b.merge_in(DEFAULT_TEXTURE, DEFAULT_TEXTURE);
        assert_eq!(b.top_texture, DEFAULT_TEXTURE);
    }

    #[test]
    fn other_side_needs_two_distinct_regions() {
        let mut j = join(DEFAULT_TEXTURE, DEFAULT_TEXTURE);
        let (r1, r2) = (EntityId::new(10), EntityId::new(11));
        assert_eq!(j.other_side(r1), None);

        j.region_a = Some(r1);
        j.region_b = Some(r2);
        assert_eq!(j.other_side(r1), Some(r2));
        assert_eq!(j.other_side(r2), Some(r1));

        j.region_b = Some(r1);
        assert_eq!(j.other_side(r1), None);
    }

    #[test]
    fn kinds_print_in_upper_case() {
        assert_eq!(CRenderKind::FloorDecal.to_string(), "FLOOR_DECAL");
    }
}
