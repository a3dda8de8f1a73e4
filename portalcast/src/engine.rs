use std::collections::BTreeSet;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::audio::{AudioService, DEFAULT_AUDIBLE_RANGE};
use crate::behaviour::BehaviourSystem;
use crate::camera::Camera;
use crate::entities::ComponentKind;
use crate::error::{Result, StructuralError};
use crate::event::{EventBus, GameEvent};
use crate::math::Size;
use crate::render::{RasterSettings, RenderSystem};
use crate::scene::SceneBuilder;
use crate::time::TimeService;
use crate::world::{EntityId, EntityManager};

/// Runtime settings for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub frame_rate: f64,
    pub raster_width: u32,
    pub raster_height: u32,
    /// Screen size in the units overlays are placed in.
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Horizontal field of view for new cameras, in radians.
    pub field_of_view: f64,
    pub max_portal_depth: usize,
    pub audible_range: f64,
    pub master_volume: f64,
    pub music_volume: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            raster_width: 320,
            raster_height: 240,
            viewport_width: 10.0 * 320.0 / 240.0,
            viewport_height: 10.0,
            field_of_view: std::f64::consts::FRAC_PI_3,
            max_portal_depth: 16,
            audible_range: DEFAULT_AUDIBLE_RANGE,
            master_volume: 0.5,
            music_volume: 0.5,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Override the size of the rendered frame in pixels.
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.raster_width = width;
        self.raster_height = height;
        self
    }

    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    #[must_use]
    pub fn with_field_of_view(mut self, fov: f64) -> Self {
        self.field_of_view = fov;
        self
    }

    #[must_use]
    pub fn with_max_portal_depth(mut self, depth: usize) -> Self {
        self.max_portal_depth = depth;
        self
    }

    #[must_use]
    pub fn with_volumes(mut self, master: f64, music: f64) -> Self {
        self.master_volume = master;
        self.music_volume = music;
        self
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse engine config")
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize engine config")
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn raster_settings(&self) -> RasterSettings {
        RasterSettings {
            width: self.raster_width,
            height: self.raster_height,
            viewport: Size::new(self.viewport_width, self.viewport_height),
            max_portal_depth: self.max_portal_depth,
            ..RasterSettings::default()
        }
    }
}

/// Owns every engine service and drives them one frame at a time.
///
/// The host decides when frames happen; each [`tick`](Self::tick) advances
/// the simulation by exactly one frame of the configured frame rate.
pub struct Engine {
    config: EngineConfig,
    entities: EntityManager,
    time: Rc<TimeService>,
    events: Rc<EventBus>,
    audio: Option<AudioService>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let time = Rc::new(TimeService::new(config.frame_rate)?);
        let events = Rc::new(EventBus::new());

        let mut entities = EntityManager::new();
        entities.add_system(
            ComponentKind::Render,
            Box::new(RenderSystem::new(config.raster_settings(), config.frame_rate)),
        );
        entities.add_system(ComponentKind::Behaviour, Box::new(BehaviourSystem::new()));
        entities.attach_event_bus(Rc::clone(&events));

        log::debug!(
            "Engine created at {} fps, {}x{} frame",
            config.frame_rate,
            config.raster_width,
            config.raster_height
        );

        Ok(Self {
            config,
            entities,
            time,
            events,
            audio: None,
        })
    }

    /// Open the default output device. Without one the service stays silent.
    #[must_use]
    pub fn with_audio(mut self) -> Self {
        self.set_audio(AudioService::new());
        self
    }

    /// Install an audio service, applying the configured range and volumes.
    pub fn set_audio(&mut self, mut audio: AudioService) {
        audio.set_audible_range(self.config.audible_range);
        audio.set_master_volume(self.config.master_volume);
        audio.set_music_volume(self.config.music_volume);
        self.audio = Some(audio);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.entities
    }

    /// Shared handle, for callbacks that schedule further work.
    pub fn time(&self) -> &Rc<TimeService> {
        &self.time
    }

    pub fn events(&self) -> &Rc<EventBus> {
        &self.events
    }

    pub fn audio(&self) -> Option<&AudioService> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut AudioService> {
        self.audio.as_mut()
    }

    pub fn render_system(&self) -> Result<&RenderSystem> {
        self.entities
            .system::<RenderSystem>(ComponentKind::Render)
            .ok_or_else(|| StructuralError::NoSystem(ComponentKind::Render).into())
    }

    pub fn render_system_mut(&mut self) -> Result<&mut RenderSystem> {
        self.entities
            .system_mut::<RenderSystem>(ComponentKind::Render)
            .ok_or_else(|| StructuralError::NoSystem(ComponentKind::Render).into())
    }

    pub fn scene_builder(&mut self) -> SceneBuilder<'_> {
        SceneBuilder::new(&mut self.entities)
    }

    /// A camera in `region` with the configured field of view.
    pub fn new_camera(&self, region: EntityId) -> Camera {
        Camera::new(region).with_fov(self.config.field_of_view)
    }

    pub fn set_camera(&mut self, camera: Camera) -> Result<()> {
        self.render_system_mut()?.set_camera(camera);
        Ok(())
    }

    /// Resolve portals once the whole scene has been built.
    pub fn connect_regions(&mut self) -> Result<bool> {
        Ok(self.render_system_mut()?.connect_regions())
    }

    pub fn delete_entity(&mut self, id: EntityId) {
        self.entities.delete_entity(id);
    }

    /// Announce to every system and bus listener.
    pub fn broadcast(&mut self, event: &GameEvent) {
        self.entities.broadcast_event(event);
    }

    /// Announce to listeners scoped to `targets`.
    pub fn fire_event(&mut self, event: &GameEvent, targets: &BTreeSet<EntityId>) {
        self.entities.fire_event(event, targets);
    }

    /// Tell the render system an entity has moved into another region.
    pub fn change_zone(&mut self, entity: EntityId, old_zone: EntityId, new_zone: EntityId) {
        self.broadcast(&GameEvent::EntityChangedZone {
            entity_id: entity,
            old_zone,
            new_zone,
        });
    }

    /// Advance one frame and draw it.
    pub fn tick(&mut self) -> Result<&RgbaImage> {
        self.entities.update();
        self.time.update();
        self.entities.purge_entities();

        let listener = self.render_system()?.camera().map(|c| c.pos);
        if let (Some(audio), Some(pos)) = (self.audio.as_mut(), listener) {
            audio.set_listener_pos(pos);
        }

        Ok(self.render_system_mut()?.render())
    }
}
