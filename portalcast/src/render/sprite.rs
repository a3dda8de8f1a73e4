use std::collections::HashMap;
use std::f64::consts::PI;

use crate::math::{Matrix, Point, Size};
use crate::world::EntityId;

use super::animation::{Animation, FrameRect};

/// Animation a sprite falls back to when none has been played.
pub const IDLE_ANIMATION: &str = "idle";

/// Billboard drawn standing on its region's floor.
#[derive(Clone, Debug)]
pub struct CSprite {
    pub entity_id: EntityId,
    pub parent_id: Option<EntityId>,
    pub texture: String,
    pub size: Size,
    pub pos: Point,
    /// Facing, in radians. Decides which view of a directional sprite is shown.
    pub angle: f64,
    pub animations: HashMap<String, Animation>,
    current_animation: Option<String>,
}

impl CSprite {
    pub fn new(entity_id: EntityId, parent_id: EntityId, size: Size, texture: impl Into<String>) -> Self {
        Self {
            entity_id,
            parent_id: Some(parent_id),
            texture: texture.into(),
            size,
            pos: Point::ZERO,
            angle: 0.0,
            animations: HashMap::new(),
            current_animation: None,
        }
    }

    pub fn with_animation(mut self, name: impl Into<String>, animation: Animation) -> Self {
        self.animations.insert(name.into(), animation);
        self
    }

    pub fn set_transform(&mut self, m: &Matrix) {
        self.pos = m.translation();
        self.angle = m.a();
    }

    /// Make `name` the active animation and restart it. Returns false if the
    /// sprite has no such animation.
    pub fn play_animation(&mut self, name: &str) -> bool {
        match self.animations.get_mut(name) {
            Some(anim) => {
                anim.reset();
                self.current_animation = Some(name.to_string());
                true
            }
            None => {
                log::warn!("Sprite {} has no animation '{name}'", self.entity_id);
                false
            }
        }
    }

    pub fn current_animation_name(&self) -> &str {
        self.current_animation.as_deref().unwrap_or(IDLE_ANIMATION)
    }

    pub fn current_animation(&self) -> Option<&Animation> {
        self.animations.get(self.current_animation_name())
    }

    pub fn update(&mut self, dt: f64) {
        let name = self.current_animation_name().to_string();
        if let Some(anim) = self.animations.get_mut(&name) {
            anim.update(dt);
        }
    }

    /// Texture rectangle to draw when seen from `cam_pos`.
    pub fn texture_region(&self, cam_pos: Point) -> FrameRect {
        let v = self.pos - cam_pos;
        self.current_animation()
            .and_then(|a| a.current_frame())
            .map(|f| *f.part(PI - v.y.atan2(v.x) + self.angle))
            .unwrap_or(FrameRect::FULL)
    }
}
