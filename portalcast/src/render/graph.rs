//! The portal scene graph.
//!
//! Regions form a tree rooted at a single root region. Walls and joins live
//! in one flat list at the top of the graph and regions refer to them by id,
//! so a boundary can be found without knowing which region it bounds.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, StructuralError};
use crate::world::EntityId;

use super::components::{CBoundary, CJoin, COverlay, CRegion, CRender, CRenderKind};
use super::sprite::CSprite;

#[derive(Debug, Default)]
pub struct RenderGraph {
    pub root_region: Option<CRegion>,
    pub boundaries: Vec<CBoundary>,
    pub overlays: BTreeMap<EntityId, COverlay>,
}

fn find_in(region: &CRegion, id: EntityId) -> Option<&CRegion> {
    if region.entity_id == id {
        return Some(region);
    }
    region.children.iter().find_map(|c| find_in(c, id))
}

fn find_in_mut(region: &mut CRegion, id: EntityId) -> Option<&mut CRegion> {
    if region.entity_id == id {
        return Some(region);
    }
    region.children.iter_mut().find_map(|c| find_in_mut(c, id))
}

fn walk<'a>(region: &'a CRegion, out: &mut Vec<&'a CRegion>) {
    out.push(region);
    for child in &region.children {
        walk(child, out);
    }
}

fn walk_mut(region: &mut CRegion, f: &mut dyn FnMut(&mut CRegion)) {
    f(region);
    for child in &mut region.children {
        walk_mut(child, f);
    }
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_region(&self, id: EntityId) -> Option<&CRegion> {
        self.root_region.as_ref().and_then(|r| find_in(r, id))
    }

    pub fn find_region_mut(&mut self, id: EntityId) -> Option<&mut CRegion> {
        self.root_region.as_mut().and_then(|r| find_in_mut(r, id))
    }

    /// Every region, parents before children, siblings in insertion order.
    pub fn regions(&self) -> Vec<&CRegion> {
        let mut out = Vec::new();
        if let Some(root) = &self.root_region {
            walk(root, &mut out);
        }
        out
    }

    pub fn for_each_region_mut(&mut self, mut f: impl FnMut(&mut CRegion)) {
        if let Some(root) = &mut self.root_region {
            walk_mut(root, &mut f);
        }
    }

    pub fn boundary(&self, id: EntityId) -> Option<&CBoundary> {
        self.boundaries.iter().find(|b| b.entity_id() == id)
    }

    pub fn boundary_mut(&mut self, id: EntityId) -> Option<&mut CBoundary> {
        self.boundaries.iter_mut().find(|b| b.entity_id() == id)
    }

    pub fn join(&self, id: EntityId) -> Option<&CJoin> {
        match self.boundary(id)? {
            CBoundary::Join(j) => Some(j),
            CBoundary::Wall(_) => None,
        }
    }

    /// Find a sprite anywhere in the region tree.
    pub fn find_sprite(&self, id: EntityId) -> Option<&CSprite> {
        self.regions().into_iter().find_map(|r| r.sprite(id))
    }

    /// The region that currently owns sprite `id`.
    pub fn sprite_region(&self, id: EntityId) -> Option<EntityId> {
        self.regions()
            .into_iter()
            .find(|r| r.sprite(id).is_some())
            .map(|r| r.entity_id)
    }

    /// Attach `child` beneath the component `parent`, of kind `parent_kind`.
    pub(crate) fn attach(
        &mut self,
        parent: EntityId,
        parent_kind: CRenderKind,
        child: CRender,
    ) -> Result<()> {
        let child_kind = child.kind();
        if !parent_kind.can_host(child_kind) {
            return Err(StructuralError::HostMismatch {
                parent: parent_kind,
                child: child_kind,
            }
            .into());
        }

        let unknown = || StructuralError::UnknownParent(parent);

        if let CRender::WallDecal(decal) = child {
            self.boundary_mut(parent)
                .ok_or_else(unknown)?
                .decals_mut()
                .push(decal);
            return Ok(());
        }

        let region = self
            .root_region
            .as_mut()
            .and_then(|r| find_in_mut(r, parent))
            .ok_or_else(unknown)?;

        match child {
            CRender::Region(r) => region.children.push(r),
            CRender::Wall(mut w) => {
                w.region = Some(parent);
                region.boundaries.push(w.entity_id);
                self.boundaries.push(CBoundary::Wall(w));
            }
            CRender::Join(j) => {
                region.boundaries.push(j.entity_id);
                self.boundaries.push(CBoundary::Join(j));
            }
            CRender::Sprite(s) => region.sprites.push(s),
            CRender::FloorDecal(d) => region.floor_decals.push(d),
            CRender::WallDecal(_) | CRender::Overlay(_) => {
                return Err(StructuralError::HostMismatch {
                    parent: parent_kind,
                    child: child_kind,
                }
                .into())
            }
        }
        Ok(())
    }

    /// Take component `id` of kind `kind` out of its parent's collection.
    ///
    /// Returns `None` if the parent does not hold it.
    pub(crate) fn detach(&mut self, parent: EntityId, id: EntityId, kind: CRenderKind) -> Option<CRender> {
        if kind == CRenderKind::WallDecal {
            let decals = self.boundary_mut(parent)?.decals_mut();
            let i = decals.iter().position(|d| d.entity_id == id)?;
            return Some(CRender::WallDecal(decals.remove(i)));
        }

        let region = self
            .root_region
            .as_mut()
            .and_then(|r| find_in_mut(r, parent))?;

        match kind {
            CRenderKind::Region => {
                let i = region.children.iter().position(|c| c.entity_id == id)?;
                Some(CRender::Region(region.children.remove(i)))
            }
            CRenderKind::Wall | CRenderKind::Join => {
                region.boundaries.retain(|b| *b != id);
                self.take_boundary(id).map(|b| match b {
                    CBoundary::Wall(w) => CRender::Wall(w),
                    CBoundary::Join(j) => CRender::Join(j),
                })
            }
            CRenderKind::Sprite => {
                let i = region.sprites.iter().position(|s| s.entity_id == id)?;
                Some(CRender::Sprite(region.sprites.remove(i)))
            }
            CRenderKind::FloorDecal => {
                let i = region.floor_decals.iter().position(|d| d.entity_id == id)?;
                Some(CRender::FloorDecal(region.floor_decals.remove(i)))
            }
            CRenderKind::WallDecal | CRenderKind::Overlay => None,
        }
    }

    /// Remove a boundary from the flat list only.
    pub(crate) fn take_boundary(&mut self, id: EntityId) -> Option<CBoundary> {
        let i = self.boundaries.iter().position(|b| b.entity_id() == id)?;
        Some(self.boundaries.remove(i))
    }

    /// Pair up the two sides of every portal.
    ///
    /// Regions are visited in pre-order. Each join looks for a join with the
    /// same `join_id` among the regions visited strictly before its own; the
    /// first one found becomes its twin. Twins agree on `region_a` (the later
    /// region) and `region_b` (the earlier one) and on merged textures. A join
    /// without a twin bounds its own region on both sides.
    ///
    /// Returns the number of twin pairs found.
    pub(crate) fn connect_regions(&mut self) -> usize {
        let order: Vec<(EntityId, Vec<EntityId>)> = self
            .regions()
            .into_iter()
            .map(|r| (r.entity_id, r.boundaries.clone()))
            .collect();

        let index: HashMap<EntityId, usize> = self
            .boundaries
            .iter()
            .enumerate()
            .map(|(i, b)| (b.entity_id(), i))
            .collect();

        let join_id_of = |boundaries: &[CBoundary], id: &EntityId| -> Option<EntityId> {
            match &boundaries[*index.get(id)?] {
                CBoundary::Join(j) => Some(j.join_id),
                CBoundary::Wall(_) => None,
            }
        };

        let mut pairs = 0;

        for (i, (region_id, boundary_ids)) in order.iter().enumerate() {
            for bid in boundary_ids {
                let Some(join_id) = join_id_of(&self.boundaries, bid) else {
                    continue;
                };

                let twin = order[..i].iter().find_map(|(earlier, earlier_ids)| {
                    earlier_ids
                        .iter()
                        .find(|e| join_id_of(&self.boundaries, e) == Some(join_id))
                        .map(|e| (*earlier, index[e]))
                });

                let me = index[bid];

                match twin {
                    Some((earlier, other)) => {
                        pairs += 1;
                        let (top, bottom) = self.join_textures(other);
                        if let CBoundary::Join(j) = &mut self.boundaries[me] {
                            j.region_a = Some(*region_id);
                            j.region_b = Some(earlier);
                            j.merge_in(&top, &bottom);
                        }
                        let (top, bottom) = self.join_textures(me);
                        if let CBoundary::Join(j) = &mut self.boundaries[other] {
                            j.region_a = Some(*region_id);
                            j.region_b = Some(earlier);
                            j.merge_in(&top, &bottom);
                        }
                    }
                    None => {
                        if let CBoundary::Join(j) = &mut self.boundaries[me] {
                            j.region_a = Some(*region_id);
                            j.region_b = Some(*region_id);
                        }
                    }
                }
            }
        }

        pairs
    }

    fn join_textures(&self, i: usize) -> (String, String) {
        match &self.boundaries[i] {
            CBoundary::Join(j) => (j.top_texture.clone(), j.bottom_texture.clone()),
            CBoundary::Wall(_) => Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::math::{LineSegment, Point};
    use crate::render::components::{CWall, CWallDecal, DEFAULT_TEXTURE};

    fn id(n: u64) -> EntityId {
        EntityId::new(n)
    }

    fn lseg() -> LineSegment {
        LineSegment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0))
    }

    fn graph_with_two_rooms() -> RenderGraph {
        let mut g = RenderGraph::new();
        g.root_region = Some(CRegion::new(id(1), None));
        g.attach(id(1), CRenderKind::Region, CRender::Region(CRegion::new(id(2), Some(id(1)))))
            .unwrap();
        g.attach(id(1), CRenderKind::Region, CRender::Region(CRegion::new(id(3), Some(id(1)))))
            .unwrap();
        g
    }

    #[test]
    fn preorder_walk_visits_parents_first() {
        let mut g = graph_with_two_rooms();
        g.attach(id(2), CRenderKind::Region, CRender::Region(CRegion::new(id(4), Some(id(2)))))
            .unwrap();

        let ids: Vec<_> = g.regions().iter().map(|r| r.entity_id.to_u64()).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
    }

    #[test]
    fn walls_are_listed_flat_and_referenced_by_region() {
        let mut g = graph_with_two_rooms();
        g.attach(id(2), CRenderKind::Region, CRender::Wall(CWall::new(id(10), id(2), lseg())))
            .unwrap();

        assert_eq!(g.boundaries.len(), 1);
        assert_eq!(g.find_region(id(2)).unwrap().boundaries, vec![id(10)]);
        match g.boundary(id(10)).unwrap() {
            CBoundary::Wall(w) => assert_eq!(w.region, Some(id(2))),
            CBoundary::Join(_) => panic!("expected a wall"),
        }

        let detached = g.detach(id(2), id(10), CRenderKind::Wall).unwrap();
        assert_eq!(detached.entity_id(), id(10));
        assert!(g.boundaries.is_empty());
        assert!(g.find_region(id(2)).unwrap().boundaries.is_empty());
    }

    #[test]
    fn wall_decals_attach_to_boundaries() {
        let mut g = graph_with_two_rooms();
        g.attach(id(2), CRenderKind::Region, CRender::Wall(CWall::new(id(10), id(2), lseg())))
            .unwrap();
        let decal = CWallDecal {
            entity_id: id(11),
            parent_id: Some(id(10)),
            texture: "poster".into(),
            size: Point::new(2.0, 2.0),
            pos: Point::new(1.0, 1.0),
        };
        g.attach(id(10), CRenderKind::Wall, CRender::WallDecal(decal)).unwrap();
        assert_eq!(g.boundary(id(10)).unwrap().decals().len(), 1);

        let err = g
            .attach(id(10), CRenderKind::Wall, CRender::Region(CRegion::new(id(12), Some(id(10)))))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::from(StructuralError::HostMismatch {
                parent: CRenderKind::Wall,
                child: CRenderKind::Region
            })
        );
    }

    #[test]
    fn twins_agree_on_regions_and_textures() {
        let mut g = graph_with_two_rooms();
        let mut a = CJoin::new(id(20), id(2), lseg(), id(99));
        a.top_texture = "brick".into();
        let mut b = CJoin::new(id(21), id(3), lseg(), id(99));
        b.bottom_texture = "slime".into();
        g.attach(id(2), CRenderKind::Region, CRender::Join(a)).unwrap();
        g.attach(id(3), CRenderKind::Region, CRender::Join(b)).unwrap();

        assert_eq!(g.connect_regions(), 1);

        for jid in [20, 21] {
            let j = g.join(id(jid)).unwrap();
            assert_eq!(j.region_a, Some(id(3)));
            assert_eq!(j.region_b, Some(id(2)));
            assert_eq!(j.top_texture, "brick");
            assert_eq!(j.bottom_texture, "slime");
        }
    }

    #[test]
    fn lonely_join_bounds_its_own_region() {
        let mut g = graph_with_two_rooms();
        g.attach(id(2), CRenderKind::Region, CRender::Join(CJoin::new(id(20), id(2), lseg(), id(7))))
            .unwrap();

        assert_eq!(g.connect_regions(), 0);
        let j = g.join(id(20)).unwrap();
        assert_eq!(j.region_a, Some(id(2)));
        assert_eq!(j.region_b, Some(id(2)));
        assert_eq!(j.top_texture, DEFAULT_TEXTURE);
    }
}
