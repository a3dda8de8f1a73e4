//! Construction requests for building a scene.
//!
//! A map loader turns its input into calls on [`SceneBuilder`]. Every call
//! allocates a fresh entity id and routes the new component through the
//! entity manager, so the same validation applies as for any other
//! component.

use crate::behaviour::{Behaviour, CBehaviour};
use crate::entities::Component;
use crate::error::Result;
use crate::math::{distance, transform_segment, LineSegment, Matrix, Point, Size};
use crate::render::{
    Animation, AnimationFrame, CFloorDecal, CJoin, COverlay, CRegion, CRender, CSprite, CWall, FrameRect,
    CWallDecal, OverlayKind, DEFAULT_TEXTURE, IDLE_ANIMATION,
};
use crate::world::{EntityId, EntityManager};

/// An open or closed polyline, in the coordinates of `transform`.
#[derive(Clone, Debug, Default)]
pub struct PolyPath {
    pub points: Vec<Point>,
    pub closed: bool,
    pub transform: Matrix,
}

impl PolyPath {
    pub fn open(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: false,
            transform: Matrix::IDENTITY,
        }
    }

    pub fn closed(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: true,
            transform: Matrix::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Matrix) -> Self {
        self.transform = transform;
        self
    }

    /// World-space segments between consecutive points. A closed path also
    /// joins its last point back to its first.
    pub fn segments(&self) -> Vec<LineSegment> {
        let n = self.points.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let j = if i == 0 {
                if !self.closed || n < 2 {
                    continue;
                }
                n - 1
            } else {
                i - 1
            };
            let lseg = LineSegment::new(self.points[j], self.points[i]);
            out.push(transform_segment(&lseg, &self.transform));
        }
        out
    }
}

/// Position and facing from an authored triangle.
///
/// The apex is the vertex opposite the shortest edge. The result sits at the
/// triangle's centroid and faces the apex.
pub fn transform_from_triangle(points: &[Point; 3]) -> Matrix {
    let centroid = (points[0] + points[1] + points[2]) / 3.0;

    let apex = (0..3)
        .min_by(|&i, &j| {
            let edge = |k: usize| distance(points[(k + 1) % 3], points[(k + 2) % 3]);
            edge(i).total_cmp(&edge(j))
        })
        .map(|i| points[i])
        .unwrap_or(centroid);

    let v = apex - centroid;
    Matrix::new(v.y.atan2(v.x), centroid)
}

/// Floor, ceiling and textures for a new region.
#[derive(Clone, Debug)]
pub struct RegionStyle {
    pub floor_height: f64,
    pub ceiling_height: f64,
    pub has_ceiling: bool,
    pub floor_texture: String,
    pub ceiling_texture: String,
}

impl Default for RegionStyle {
    fn default() -> Self {
        Self {
            floor_height: 0.0,
            ceiling_height: 100.0,
            has_ceiling: true,
            floor_texture: DEFAULT_TEXTURE.to_string(),
            ceiling_texture: DEFAULT_TEXTURE.to_string(),
        }
    }
}

impl RegionStyle {
    pub fn heights(mut self, floor: f64, ceiling: f64) -> Self {
        self.floor_height = floor;
        self.ceiling_height = ceiling;
        self
    }

    pub fn textures(mut self, floor: impl Into<String>, ceiling: impl Into<String>) -> Self {
        self.floor_texture = floor.into();
        self.ceiling_texture = ceiling.into();
        self
    }

    pub fn open_sky(mut self) -> Self {
        self.has_ceiling = false;
        self
    }
}

pub struct SceneBuilder<'a> {
    entities: &'a mut EntityManager,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(entities: &'a mut EntityManager) -> Self {
        Self { entities }
    }

    fn add(&mut self, c: CRender) -> Result<EntityId> {
        let id = c.entity_id();
        self.entities.add_component(Component::Render(c))?;
        Ok(id)
    }

    fn region(&mut self, parent: Option<EntityId>, style: &RegionStyle) -> Result<EntityId> {
        let mut region = CRegion::new(self.entities.next_id(), parent);
        region.floor_height = style.floor_height;
        region.ceiling_height = style.ceiling_height;
        region.has_ceiling = style.has_ceiling;
        region.floor_texture = style.floor_texture.clone();
        region.ceiling_texture = style.ceiling_texture.clone();
        self.add(CRender::Region(region))
    }

    pub fn add_root_region(&mut self, style: &RegionStyle) -> Result<EntityId> {
        self.region(None, style)
    }

    pub fn add_region(&mut self, parent: EntityId, style: &RegionStyle) -> Result<EntityId> {
        self.region(Some(parent), style)
    }

    /// One wall per segment of `path`.
    pub fn add_walls(&mut self, region: EntityId, path: &PolyPath, texture: &str) -> Result<Vec<EntityId>> {
        path.segments()
            .into_iter()
            .map(|lseg| {
                let mut wall = CWall::new(self.entities.next_id(), region, lseg);
                wall.texture = texture.to_string();
                self.add(CRender::Wall(wall))
            })
            .collect()
    }

    /// Allocate an id that both sides of a portal will share.
    pub fn new_join_id(&mut self) -> EntityId {
        self.entities.next_id()
    }

    /// One side of a portal. Author the other side in the neighbouring
    /// region with the same `join_id`.
    pub fn add_join(
        &mut self,
        region: EntityId,
        lseg: LineSegment,
        join_id: EntityId,
        top_texture: &str,
        bottom_texture: &str,
    ) -> Result<EntityId> {
        let mut join = CJoin::new(self.entities.next_id(), region, lseg, join_id);
        join.top_texture = top_texture.to_string();
        join.bottom_texture = bottom_texture.to_string();
        self.add(CRender::Join(join))
    }

    /// A sprite showing its whole texture from every direction.
    pub fn add_sprite(&mut self, region: EntityId, texture: &str, size: Size, transform: &Matrix) -> Result<EntityId> {
        self.add_sprite_with(region, |id, parent| {
            let mut sprite = CSprite::new(id, parent, size, texture).with_animation(
                IDLE_ANIMATION,
                Animation::still(AnimationFrame::uniform(FrameRect::FULL)),
            );
            sprite.set_transform(transform);
            sprite
        })
    }

    /// A sprite built by `make`, which is handed the new entity id and the region id.
    pub fn add_sprite_with(
        &mut self,
        region: EntityId,
        make: impl FnOnce(EntityId, EntityId) -> CSprite,
    ) -> Result<EntityId> {
        let id = self.entities.next_id();
        self.add(CRender::Sprite(make(id, region)))
    }

    pub fn add_floor_decal(&mut self, region: EntityId, texture: &str, size: Size, transform: Matrix) -> Result<EntityId> {
        let decal = CFloorDecal {
            entity_id: self.entities.next_id(),
            parent_id: Some(region),
            texture: texture.to_string(),
            size,
            transform,
        };
        self.add(CRender::FloorDecal(decal))
    }

    /// A decal on wall or join `boundary`, `pos` measured along the
    /// boundary and up from the floor.
    pub fn add_wall_decal(&mut self, boundary: EntityId, texture: &str, size: Size, pos: Point) -> Result<EntityId> {
        let decal = CWallDecal {
            entity_id: self.entities.next_id(),
            parent_id: Some(boundary),
            texture: texture.to_string(),
            size,
            pos,
        };
        self.add(CRender::WallDecal(decal))
    }

    pub fn add_overlay(&mut self, pos: Point, z_index: i32, kind: OverlayKind) -> Result<EntityId> {
        let overlay = COverlay {
            entity_id: self.entities.next_id(),
            pos,
            z_index,
            kind,
        };
        self.add(CRender::Overlay(overlay))
    }

    /// Attach game logic to an existing entity.
    pub fn add_behaviour(&mut self, entity: EntityId, behaviour: Box<dyn Behaviour>) -> Result<()> {
        self.entities
            .add_component(Component::Behaviour(CBehaviour::new(entity, behaviour)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn closed_paths_wrap_around() {
        let segs = PolyPath::closed(square()).segments();
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[0].a, Point::new(0.0, 10.0));
        assert_eq!(segs[0].b, Point::new(0.0, 0.0));
        assert_eq!(segs[1].a, Point::new(0.0, 0.0));

        assert_eq!(PolyPath::open(square()).segments().len(), 3);
        assert!(PolyPath::closed(vec![Point::ZERO]).segments().is_empty());
    }

    #[test]
    fn path_transform_moves_segments() {
        let segs = PolyPath::open(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)])
            .with_transform(Matrix::new(0.0, Point::new(5.0, 5.0)))
            .segments();
        assert_eq!(segs[0].a, Point::new(5.0, 5.0));
        assert_eq!(segs[0].b, Point::new(6.0, 5.0));
    }

    #[test]
    fn triangle_faces_its_apex() {
        let m = transform_from_triangle(&[
            Point::new(0.0, 10.0),
            Point::new(-1.0, 0.0),
            Point::new(1.0, 0.0),
        ]);
        assert!((m.a() - FRAC_PI_2).abs() < 1e-9);
        assert!((m.tx() - 0.0).abs() < 1e-9);
        assert!((m.ty() - 10.0 / 3.0).abs() < 1e-9);
    }
}
