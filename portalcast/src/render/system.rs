use std::any::Any;
use std::collections::HashMap;

use image::RgbaImage;

use crate::assets::TextureStore;
use crate::camera::Camera;
use crate::entities::{Component, ComponentKind};
use crate::error::{Result, StructuralError};
use crate::event::GameEvent;
use crate::hierarchy::Hierarchy;
use crate::system::{System, SystemContext};
use crate::world::EntityId;

use super::components::{COverlay, CRender, CRenderKind};
use super::graph::RenderGraph;
use super::rasterizer::{RasterSettings, Rasterizer};
use super::sprite::CSprite;

/// Owns the scene graph and draws it.
///
/// Other systems never touch the graph; they announce zone changes with
/// [`GameEvent::EntityChangedZone`] and the render system moves the entity.
pub struct RenderSystem {
    graph: RenderGraph,
    kinds: HashMap<EntityId, CRenderKind>,
    hierarchy: Hierarchy,
    regions_connected: bool,
    rasterizer: Rasterizer,
    camera: Option<Camera>,
    frame: RgbaImage,
    frame_duration: f64,
}

impl RenderSystem {
    pub fn new(settings: RasterSettings, frame_rate: f64) -> Self {
        Self {
            graph: RenderGraph::new(),
            kinds: HashMap::new(),
            hierarchy: Hierarchy::new(),
            regions_connected: false,
            rasterizer: Rasterizer::new(settings),
            camera: None,
            frame: RgbaImage::new(settings.width, settings.height),
            frame_duration: if frame_rate > 0.0 { 1.0 / frame_rate } else { 0.0 },
        }
    }

    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn kind_of(&self, id: EntityId) -> Option<CRenderKind> {
        self.kinds.get(&id).copied()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn textures(&self) -> &TextureStore {
        self.rasterizer.textures()
    }

    pub fn textures_mut(&mut self) -> &mut TextureStore {
        self.rasterizer.textures_mut()
    }

    pub fn sprite(&self, id: EntityId) -> Option<&CSprite> {
        self.graph.find_sprite(id)
    }

    pub fn overlay_mut(&mut self, id: EntityId) -> Option<&mut COverlay> {
        self.graph.overlays.get_mut(&id)
    }

    pub fn sprite_mut(&mut self, id: EntityId) -> Option<&mut CSprite> {
        let region = self.graph.sprite_region(id)?;
        self.graph.find_region_mut(region)?.sprite_mut(id)
    }

    /// Add a render component to the graph.
    ///
    /// The graph is left untouched if the component is rejected.
    pub fn add_render(&mut self, c: CRender) -> Result<()> {
        let id = c.entity_id();
        let kind = c.kind();

        match c.parent_id() {
            None => match c {
                CRender::Region(region) => {
                    if self.graph.root_region.is_some() {
                        return Err(StructuralError::DuplicateRoot.into());
                    }
                    log::debug!("Root region set to {id}");
                    self.graph.root_region = Some(region);
                }
                CRender::Overlay(overlay) => {
                    if self.graph.overlays.contains_key(&id) {
                        log::warn!("Overlay {id} already present; keeping the first");
                        return Ok(());
                    }
                    self.graph.overlays.insert(id, overlay);
                }
                _ => return Err(StructuralError::Parentless(kind).into()),
            },
            Some(parent) => {
                let parent_kind = self
                    .kinds
                    .get(&parent)
                    .copied()
                    .ok_or(StructuralError::UnknownParent(parent))?;

                self.graph.attach(parent, parent_kind, c)?;
                self.hierarchy.set_parent(id, Some(parent));
            }
        }

        log::trace!("Added {kind} {id}");
        self.kinds.insert(id, kind);
        Ok(())
    }

    /// Pair up portal twins across the whole graph.
    ///
    /// Only the first call per loaded scene does anything. Returns whether
    /// this call did the work.
    pub fn connect_regions(&mut self) -> bool {
        if self.regions_connected {
            log::warn!("Regions already connected; ignoring repeated connect_regions");
            return false;
        }
        let pairs = self.graph.connect_regions();
        self.regions_connected = true;
        log::debug!("Connected regions: {pairs} portal pairs");
        true
    }

    pub fn regions_connected(&self) -> bool {
        self.regions_connected
    }

    fn is_descendant_of(&self, id: EntityId, ancestor: EntityId) -> bool {
        let mut current = id;
        while let Some(parent) = self.hierarchy.get_parent(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Move an entity's render component from one region to another.
    ///
    /// The same component value is reattached, so sprite animation state
    /// carries over. Entities without a render component are ignored, as are
    /// components not actually held by `old_zone`. Walls and joins belong to
    /// their region's outline and are rejected.
    pub fn cross_regions(&mut self, entity: EntityId, old_zone: EntityId, new_zone: EntityId) -> Result<()> {
        let Some(kind) = self.kind_of(entity) else {
            return Ok(());
        };

        for zone in [old_zone, new_zone] {
            if self.kind_of(zone) != Some(CRenderKind::Region) {
                return Err(StructuralError::UnknownRegion(zone).into());
            }
        }
        if old_zone == new_zone {
            return Ok(());
        }
        // Joins name the regions on both sides; moving one would leave those stale.
        if !CRenderKind::Region.can_host(kind) || matches!(kind, CRenderKind::Wall | CRenderKind::Join) {
            return Err(StructuralError::HostMismatch {
                parent: CRenderKind::Region,
                child: kind,
            }
            .into());
        }
        if kind == CRenderKind::Region && (new_zone == entity || self.is_descendant_of(new_zone, entity)) {
            return Err(StructuralError::UnknownRegion(new_zone).into());
        }

        let Some(mut c) = self.graph.detach(old_zone, entity, kind) else {
            log::trace!("Entity {entity} not held by region {old_zone}; nothing to move");
            return Ok(());
        };

        c.set_parent_id(new_zone);
        self.graph.attach(new_zone, CRenderKind::Region, c)?;
        self.hierarchy.set_parent(entity, Some(new_zone));

        log::debug!("Entity {entity} crossed from region {old_zone} to {new_zone}");
        Ok(())
    }

    /// Draw the current frame.
    pub fn render(&mut self) -> &RgbaImage {
        self.rasterizer
            .render(&self.graph, self.camera.as_ref(), &mut self.frame);
        &self.frame
    }

    /// The most recently drawn frame.
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }
}

impl System for RenderSystem {
    fn update(&mut self, _ctx: &mut SystemContext) {
        let dt = self.frame_duration;
        self.graph.for_each_region_mut(|region| {
            for sprite in &mut region.sprites {
                sprite.update(dt);
            }
        });
    }

    fn handle_event(&mut self, event: &GameEvent, _ctx: &mut SystemContext) {
        if let GameEvent::EntityChangedZone {
            entity_id,
            old_zone,
            new_zone,
        } = *event
        {
            if let Some(camera) = self.camera.as_mut() {
                if camera.follow == Some(entity_id) {
                    camera.region = new_zone;
                }
            }
            if let Err(e) = self.cross_regions(entity_id, old_zone, new_zone) {
                log::error!("Failed to move entity {entity_id} between regions: {e}");
            }
        }
    }

    fn has_component(&self, id: EntityId) -> bool {
        self.kinds.contains_key(&id)
    }

    fn add_component(&mut self, component: Component) -> Result<()> {
        match component {
            Component::Render(c) => self.add_render(c),
            other => Err(StructuralError::WrongSystem {
                expected: ComponentKind::Render,
                actual: other.kind(),
            }
            .into()),
        }
    }

    fn remove_entity(&mut self, id: EntityId) {
        let Some(kind) = self.kind_of(id) else {
            return;
        };

        match self.hierarchy.get_parent(id) {
            Some(parent) => {
                self.graph.detach(parent, id, kind);
            }
            None => match kind {
                CRenderKind::Region => {
                    if self.graph.root_region.as_ref().map(|r| r.entity_id) == Some(id) {
                        log::debug!("Root region {id} removed");
                        self.graph.root_region = None;
                        self.regions_connected = false;
                    }
                }
                CRenderKind::Overlay => {
                    self.graph.overlays.remove(&id);
                }
                _ => {}
            },
        }

        for removed in self.hierarchy.remove_subtree(id) {
            if let Some(k) = self.kinds.remove(&removed) {
                if removed != id && matches!(k, CRenderKind::Wall | CRenderKind::Join) {
                    self.graph.take_boundary(removed);
                }
                log::trace!("Removed {k} {removed}");
            }
        }
        debug_assert!(!self.hierarchy.contains(id));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
