//! First-person camera for the portal renderer.

use std::f64::consts::FRAC_PI_3;

use crate::math::{Matrix, Point, Vec2f};
use crate::world::EntityId;

/// Where the scene is viewed from.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub pos: Point,
    /// Facing, in radians from the +x axis.
    pub angle: f64,
    /// Eye height above the current region's floor.
    pub height: f64,
    /// Horizontal field of view, in radians.
    pub fov: f64,
    /// Region the camera stands in. Rays start here.
    pub region: EntityId,
    /// Entity the camera rides along with, if any. Zone changes for this
    /// entity move the camera to the new region.
    pub follow: Option<EntityId>,
}

impl Camera {
    pub fn new(region: EntityId) -> Self {
        Self {
            pos: Point::ZERO,
            angle: 0.0,
            height: 50.0,
            fov: FRAC_PI_3,
            region,
            follow: None,
        }
    }

    pub fn with_fov(mut self, fov: f64) -> Self {
        self.fov = fov;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn following(mut self, entity: EntityId) -> Self {
        self.follow = Some(entity);
        self
    }

    pub fn set_transform(&mut self, m: &Matrix) {
        self.pos = m.translation();
        self.angle = m.a();
    }

    pub fn direction(&self) -> Vec2f {
        Vec2f::new(self.angle.cos(), self.angle.sin())
    }

    /// Unit vector to the camera's right.
    pub fn right(&self) -> Vec2f {
        Vec2f::new(self.angle.sin(), -self.angle.cos())
    }

    /// Half-width of the view plane at unit distance.
    pub fn half_view(&self) -> f64 {
        (0.5 * self.fov).tan()
    }
}
