//! CPU column caster that turns the render graph into an image.
//!
//! Each screen column casts one ray from the camera through the camera's
//! region. The nearest boundary hit decides what the column shows: a wall
//! ends the ray, a join draws its upper and lower steps and the ray carries
//! on into the region on the far side.

use std::ops::Range;

use image::{Rgba, RgbaImage};

use crate::assets::TextureStore;
use crate::camera::Camera;
use crate::math::{line_segment_intersect, LineSegment, Point, Size};
use crate::world::EntityId;

use super::components::{CBoundary, CRegion, CWallDecal, OverlayKind};
use super::graph::RenderGraph;

/// World units covered by one repeat of a wall, floor or ceiling texture.
const TEXTURE_SPAN: f64 = 100.0;
/// Length of the segment used to stand in for a ray.
const FAR: f64 = 1.0e5;
const NEAR: f64 = 1.0e-6;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Clone, Copy, Debug)]
pub struct RasterSettings {
    pub width: u32,
    pub height: u32,
    /// Size of the screen in the units overlays are placed in.
    pub viewport: Size,
    /// How many portals a single ray may pass through.
    pub max_portal_depth: usize,
    pub sky: Rgba<u8>,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            viewport: Size::new(10.0 * 320.0 / 240.0, 10.0),
            max_portal_depth: 16,
            sky: Rgba([110, 150, 210, 255]),
        }
    }
}

/// Per-frame projection constants.
struct View<'a> {
    camera: &'a Camera,
    half_h: f64,
    focal: f64,
    eye_z: f64,
}

impl View<'_> {
    /// Screen row of world height `z` seen at forward distance `d`.
    fn project(&self, z: f64, d: f64) -> f64 {
        self.half_h - (z - self.eye_z) * self.focal / d
    }

    /// World height seen at row centre `yc` on a surface at distance `d`.
    fn unproject(&self, yc: f64, d: f64) -> f64 {
        self.eye_z + (self.half_h - yc) * d / self.focal
    }
}

pub struct Rasterizer {
    settings: RasterSettings,
    textures: TextureStore,
}

impl Rasterizer {
    pub fn new(settings: RasterSettings) -> Self {
        Self {
            settings,
            textures: TextureStore::new(),
        }
    }

    pub fn settings(&self) -> &RasterSettings {
        &self.settings
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureStore {
        &mut self.textures
    }

    /// Draw one frame into `target`, resizing it if needed.
    ///
    /// Without a camera, or with the camera outside the graph, only the
    /// overlays are drawn.
    pub fn render(&self, graph: &RenderGraph, camera: Option<&Camera>, target: &mut RgbaImage) {
        let (w, h) = (self.settings.width, self.settings.height);
        if target.dimensions() != (w, h) {
            *target = RgbaImage::new(w, h);
        }
        for p in target.pixels_mut() {
            *p = BACKGROUND;
        }

        let mut zbuffer = vec![f64::INFINITY; w as usize];

        match camera.and_then(|c| graph.find_region(c.region).map(|r| (c, r))) {
            Some((camera, start)) => {
                let view = View {
                    camera,
                    half_h: 0.5 * h as f64,
                    focal: 0.5 * w as f64 / camera.half_view(),
                    eye_z: start.floor_height + camera.height,
                };

                for col in 0..w {
                    self.cast_column(graph, &view, start, col, target, &mut zbuffer);
                }
                self.draw_sprites(graph, &view, target, &zbuffer);
            }
            None => log::trace!("No camera region to draw from"),
        }

        self.draw_overlays(graph, target);
    }

    fn ray(&self, camera: &Camera, col: u32) -> Point {
        let sx = 2.0 * (col as f64 + 0.5) / self.settings.width as f64 - 1.0;
        camera.direction() + camera.right() * (sx * camera.half_view())
    }

    fn rows(&self, a: f64, b: f64) -> Range<u32> {
        let h = self.settings.height as f64;
        let lo = a.round().clamp(0.0, h) as u32;
        let hi = b.round().clamp(0.0, h) as u32;
        lo..hi.max(lo)
    }

    fn cast_column(
        &self,
        graph: &RenderGraph,
        view: &View,
        start: &CRegion,
        col: u32,
        target: &mut RgbaImage,
        zbuffer: &mut [f64],
    ) {
        let camera = view.camera;
        let ray = self.ray(camera, col);
        let ray_seg = LineSegment::new(camera.pos, camera.pos + ray * FAR);
        let dir = camera.direction();

        let mut region = start;
        let mut top = 0.0;
        let mut bottom = self.settings.height as f64;
        let mut entered_through: Option<EntityId> = None;
        let mut min_t = NEAR;

        for crossings in 0..=self.settings.max_portal_depth {
            let mut nearest: Option<(f64, &CBoundary, Point)> = None;

            for bid in &region.boundaries {
                let Some(b) = graph.boundary(*bid) else {
                    continue;
                };
                if let (CBoundary::Join(j), Some(via)) = (b, entered_through) {
                    if j.join_id == via {
                        continue;
                    }
                }
                let Some(p) = line_segment_intersect(&ray_seg, b.lseg()) else {
                    continue;
                };
                let t = (p - camera.pos).dot(dir);
                if t < min_t {
                    continue;
                }
                if nearest.map_or(true, |(nt, _, _)| t < nt) {
                    nearest = Some((t, b, p));
                }
            }

            let Some((t, boundary, hit)) = nearest else {
                // Open to infinity: flats run to the horizon.
                self.draw_ceiling(view, region, ray, col, self.rows(top, view.half_h.min(bottom)), target);
                self.draw_floor(view, region, ray, col, self.rows(view.half_h.max(top), bottom), target);
                return;
            };

            let ceil_y = view.project(region.ceiling_height, t);
            let floor_y = view.project(region.floor_height, t);
            self.draw_ceiling(view, region, ray, col, self.rows(top, ceil_y.min(bottom)), target);
            self.draw_floor(view, region, ray, col, self.rows(floor_y.max(top), bottom), target);

            let along = boundary.lseg().signed_distance(hit);
            let decals = boundary.decals();

            let (join, texture) = match boundary {
                CBoundary::Wall(w) => (None, w.texture.as_str()),
                CBoundary::Join(j) => (Some(j), j.bottom_texture.as_str()),
            };

            let next = join
                .and_then(|j| j.other_side(region.entity_id))
                .and_then(|id| graph.find_region(id));

            let (Some(join), Some(next)) = (join, next) else {
                // Walls, and joins that lead nowhere, end the ray.
                let rows = self.rows(ceil_y.max(top), floor_y.min(bottom));
                self.draw_surface(view, region, texture, decals, along, t, col, rows, target);
                zbuffer[col as usize] = t;
                return;
            };

            let next_ceil_y = view.project(next.ceiling_height, t);
            let next_floor_y = view.project(next.floor_height, t);

            if next.ceiling_height < region.ceiling_height {
                let rows = self.rows(ceil_y.max(top), next_ceil_y.min(bottom));
                self.draw_surface(view, region, &join.top_texture, decals, along, t, col, rows, target);
            }
            if next.floor_height > region.floor_height {
                let rows = self.rows(next_floor_y.max(top), floor_y.min(bottom));
                self.draw_surface(view, region, &join.bottom_texture, decals, along, t, col, rows, target);
            }

            top = top.max(ceil_y.max(next_ceil_y));
            bottom = bottom.min(floor_y.min(next_floor_y));

            if top >= bottom || crossings == self.settings.max_portal_depth {
                zbuffer[col as usize] = t;
                return;
            }

            region = next;
            entered_through = Some(join.join_id);
            min_t = t;
        }
    }

    fn draw_floor(
        &self,
        view: &View,
        region: &CRegion,
        ray: Point,
        col: u32,
        rows: Range<u32>,
        target: &mut RgbaImage,
    ) {
        let height = view.eye_z - region.floor_height;
        for y in rows {
            let dy = y as f64 + 0.5 - view.half_h;
            if dy <= 0.0 || height <= 0.0 {
                continue;
            }
            let d = height * view.focal / dy;
            let p = view.camera.pos + ray * d;
            target.put_pixel(col, y, self.floor_colour(region, p));
        }
    }

    fn floor_colour(&self, region: &CRegion, p: Point) -> Rgba<u8> {
        for decal in region.floor_decals.iter().rev() {
            let local = decal.transform.inverse() * p;
            if (0.0..decal.size.x).contains(&local.x) && (0.0..decal.size.y).contains(&local.y) {
                let c = self
                    .textures
                    .sample(&decal.texture, local.x / decal.size.x, local.y / decal.size.y);
                if c[3] > 0 {
                    return c;
                }
            }
        }
        self.textures
            .sample(&region.floor_texture, p.x / TEXTURE_SPAN, p.y / TEXTURE_SPAN)
    }

    fn draw_ceiling(
        &self,
        view: &View,
        region: &CRegion,
        ray: Point,
        col: u32,
        rows: Range<u32>,
        target: &mut RgbaImage,
    ) {
        let height = region.ceiling_height - view.eye_z;
        for y in rows {
            if !region.has_ceiling {
                target.put_pixel(col, y, self.settings.sky);
                continue;
            }
            let dy = view.half_h - (y as f64 + 0.5);
            if dy <= 0.0 || height <= 0.0 {
                continue;
            }
            let d = height * view.focal / dy;
            let p = view.camera.pos + ray * d;
            let c = self
                .textures
                .sample(&region.ceiling_texture, p.x / TEXTURE_SPAN, p.y / TEXTURE_SPAN);
            target.put_pixel(col, y, c);
        }
    }

    /// Vertical slice of a wall or portal step at forward distance `t`.
    #[allow(clippy::too_many_arguments)]
    fn draw_surface(
        &self,
        view: &View,
        region: &CRegion,
        texture: &str,
        decals: &[CWallDecal],
        along: f64,
        t: f64,
        col: u32,
        rows: Range<u32>,
        target: &mut RgbaImage,
    ) {
        for y in rows {
            let z = view.unproject(y as f64 + 0.5, t);
            let above_floor = z - region.floor_height;

            let decal = decals.iter().rev().find_map(|d| {
                let u = (along - d.pos.x) / d.size.x;
                let v = 1.0 - (above_floor - d.pos.y) / d.size.y;
                if (0.0..1.0).contains(&u) && (0.0..1.0).contains(&v) {
                    Some(self.textures.sample(&d.texture, u, v)).filter(|c| c[3] > 0)
                } else {
                    None
                }
            });

            let c = decal.unwrap_or_else(|| {
                self.textures.sample(
                    texture,
                    along / TEXTURE_SPAN,
                    (region.ceiling_height - z) / TEXTURE_SPAN,
                )
            });
            target.put_pixel(col, y, c);
        }
    }

    fn draw_sprites(&self, graph: &RenderGraph, view: &View, target: &mut RgbaImage, zbuffer: &[f64]) {
        let camera = view.camera;
        let dir = camera.direction();
        let right = camera.right();
        let w = self.settings.width as f64;

        let mut visible = Vec::new();
        for region in graph.regions() {
            for sprite in &region.sprites {
                let rel = sprite.pos - camera.pos;
                let forward = rel.dot(dir);
                if forward > NEAR {
                    visible.push((forward, rel.dot(right), region.floor_height, sprite));
                }
            }
        }
        // Far to near.
        visible.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (forward, side, floor, sprite) in visible {
            let centre = (side / forward / camera.half_view() + 1.0) * 0.5 * w;
            let half_w = 0.5 * sprite.size.x * view.focal / forward;
            let top_y = view.project(floor + sprite.size.y, forward);
            let bottom_y = view.project(floor, forward);
            if bottom_y <= top_y {
                continue;
            }
            let rect = sprite.texture_region(camera.pos);

            let x0 = (centre - half_w).round().clamp(0.0, w) as u32;
            let x1 = (centre + half_w).round().clamp(0.0, w) as u32;

            for x in x0..x1 {
                if forward >= zbuffer[x as usize] {
                    continue;
                }
                let fu = (x as f64 + 0.5 - (centre - half_w)) / (2.0 * half_w);
                for y in self.rows(top_y, bottom_y) {
                    let fv = (y as f64 + 0.5 - top_y) / (bottom_y - top_y);
                    let c = self.textures.sample(
                        &sprite.texture,
                        rect.x + fu.clamp(0.0, 0.999_999) * rect.w,
                        rect.y + fv.clamp(0.0, 0.999_999) * rect.h,
                    );
                    if c[3] > 0 {
                        target.put_pixel(x, y, c);
                    }
                }
            }
        }
    }

    fn draw_overlays(&self, graph: &RenderGraph, target: &mut RgbaImage) {
        let (w, h) = (self.settings.width as f64, self.settings.height as f64);
        let vp = self.settings.viewport;

        let mut overlays: Vec<_> = graph.overlays.values().collect();
        overlays.sort_by_key(|o| (o.z_index, o.entity_id));

        for overlay in overlays {
            let size = overlay.size();
            let x0 = overlay.pos.x / vp.x * w;
            let y0 = overlay.pos.y / vp.y * h;
            let pw = size.x / vp.x * w;
            let ph = size.y / vp.y * h;
            if pw <= 0.0 || ph <= 0.0 {
                continue;
            }

            let xs = x0.round().clamp(0.0, w) as u32..(x0 + pw).round().clamp(0.0, w) as u32;
            for x in xs {
                for y in self.rows(y0, y0 + ph) {
                    let c = match &overlay.kind {
                        OverlayKind::Colour { colour, .. } => Rgba(*colour),
                        OverlayKind::Image { texture, .. } => self.textures.sample(
                            texture,
                            (x as f64 + 0.5 - x0) / pw,
                            (y as f64 + 0.5 - y0) / ph,
                        ),
                    };
                    let dst = *target.get_pixel(x, y);
                    target.put_pixel(x, y, blend(dst, c));
                }
            }
        }
    }
}

/// Source-over blend of `src` onto an opaque `dst`.
fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = src[3] as u32;
    let mix = |d: u8, s: u8| ((s as u32 * a + d as u32 * (255 - a) + 127) / 255) as u8;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), 255])
}
