//! Walks a camera through a three-room level and writes frames as PNGs.
//!
//! Usage: `portal_demo [config.json] [output-dir]`

use std::cell::Cell;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use portalcast::effects::colour_transition;
use portalcast::math::{LineSegment, Matrix, Point, Size};
use portalcast::render::{Animation, CSprite, OverlayKind, IDLE_ANIMATION};
use portalcast::scene::{PolyPath, RegionStyle};
use portalcast::{Behaviour, Engine, EngineConfig, EntityId, GameEvent, SystemContext};

const FRAMES: u32 = 240;
const SAVE_EVERY: u32 = 30;
const WALK_SPEED: f64 = 600.0;
const PULSE: &str = "beacon_pulse";

struct Level {
    hall: EntityId,
    gallery: EntityId,
    alcove: EntityId,
    flash: EntityId,
}

/// Announces a pulse every `period` ticks.
struct Beacon {
    period: u32,
    ticks: u32,
}

impl Behaviour for Beacon {
    fn start(&mut self, entity: EntityId, _ctx: &mut SystemContext) {
        log::info!("Beacon {entity} armed");
    }

    fn update(&mut self, entity: EntityId, ctx: &mut SystemContext) {
        self.ticks += 1;
        if self.ticks % self.period == 0 {
            ctx.broadcast(GameEvent::named(PULSE, Some(entity)));
        }
    }
}

fn brick_texture() -> RgbaImage {
    RgbaImage::from_fn(64, 64, |x, y| {
        let row = y / 16;
        let offset = if row % 2 == 0 { 0 } else { 16 };
        if y % 16 == 0 || (x + offset) % 32 == 0 {
            Rgba([90, 90, 90, 255])
        } else {
            Rgba([150, 60 + (row * 8) as u8, 40, 255])
        }
    })
}

fn checker_texture(a: Rgba<u8>, b: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(32, 32, |x, y| if (x / 16 + y / 16) % 2 == 0 { a } else { b })
}

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn build_level(engine: &mut Engine) -> Result<Level> {
    let textures = engine.render_system_mut()?.textures_mut();
    textures.insert("brick", brick_texture());
    textures.insert("tiles", checker_texture(Rgba([200, 200, 190, 255]), Rgba([60, 60, 70, 255])));
    textures.insert("grass", checker_texture(Rgba([40, 120, 40, 255]), Rgba([50, 140, 50, 255])));

    let mut scene = engine.scene_builder();
    let indoor = RegionStyle::default().textures("tiles", "brick");

    // Hall, x in [-500, 500], open to the gallery on its east side.
    let hall = scene.add_root_region(&indoor)?;
    scene.add_walls(
        hall,
        &PolyPath::open(vec![p(500.0, 500.0), p(-500.0, 500.0), p(-500.0, -500.0), p(500.0, -500.0)]),
        "brick",
    )?;

    // Gallery, x in [500, 1500], open sky and a raised floor.
    let gallery = scene.add_region(hall, &RegionStyle::default().heights(20.0, 160.0).textures("grass", "brick").open_sky())?;
    scene.add_walls(gallery, &PolyPath::open(vec![p(500.0, -500.0), p(1500.0, -500.0), p(1500.0, 500.0)]), "brick")?;
    scene.add_walls(gallery, &PolyPath::open(vec![p(1500.0, 500.0), p(1000.0, 500.0)]), "brick")?;

    // Alcove north of the gallery, lower ceiling.
    let alcove = scene.add_region(gallery, &indoor.clone().heights(20.0, 80.0))?;
    scene.add_walls(
        alcove,
        &PolyPath::open(vec![p(1000.0, 500.0), p(1000.0, 900.0), p(600.0, 900.0), p(600.0, 500.0)]),
        "brick",
    )?;
    scene.add_walls(gallery, &PolyPath::open(vec![p(600.0, 500.0), p(500.0, 500.0)]), "brick")?;

    let hall_to_gallery = scene.new_join_id();
    let door = LineSegment::new(p(500.0, -500.0), p(500.0, 500.0));
    let hall_door = scene.add_join(hall, door, hall_to_gallery, "default", "default")?;
    scene.add_join(gallery, LineSegment::new(door.b, door.a), hall_to_gallery, "default", "brick")?;

    let gallery_to_alcove = scene.new_join_id();
    let arch = LineSegment::new(p(1000.0, 500.0), p(600.0, 500.0));
    scene.add_join(gallery, arch, gallery_to_alcove, "brick", "default")?;
    scene.add_join(alcove, LineSegment::new(arch.b, arch.a), gallery_to_alcove, "default", "default")?;

    scene.add_wall_decal(hall_door, "sign", Size::new(80.0, 30.0), p(460.0, 100.0))?;
    scene.add_floor_decal(hall, "rug", Size::new(200.0, 300.0), Matrix::new(0.0, p(-100.0, -150.0)))?;

    let lamp = scene.add_sprite_with(gallery, |id, region| {
        let mut lamp = CSprite::new(id, region, Size::new(40.0, 120.0), "lamp")
            .with_animation(IDLE_ANIMATION, Animation::from_grid(1, 4, 6.0, true));
        lamp.set_transform(&Matrix::new(0.0, p(1200.0, 200.0)));
        lamp
    })?;
    scene.add_behaviour(lamp, Box::new(Beacon { period: 45, ticks: 0 }))?;

    let flash = scene.add_overlay(
        p(0.0, 0.0),
        10,
        OverlayKind::Colour {
            colour: [255, 255, 255, 0],
            size: Size::new(10.0 * 320.0 / 240.0, 10.0),
        },
    )?;

    Ok(Level {
        hall,
        gallery,
        alcove,
        flash,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("portalcast=info,portal_demo=info"))
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    let out_dir = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("frames"));
    fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut engine = Engine::new(config)?.with_audio();
    let level = build_level(&mut engine)?;
    engine.connect_regions()?;

    // The camera rides along with a body that has no render component.
    let player = engine.entities_mut().next_id();
    let mut camera = engine.new_camera(level.hall).following(player);
    camera.set_transform(&Matrix::new(0.0, p(-400.0, 0.0)));
    engine.set_camera(camera)?;

    let tint = Rc::new(Cell::new(Rgba([255, 255, 255, 0])));
    {
        let time = Rc::clone(engine.time());
        let tint = Rc::clone(&tint);
        engine.events().listen(PULSE, move |event| {
            log::info!("Pulse from {:?} at {:.2}s", event.entity_id(), time.now());
            let tint = Rc::clone(&tint);
            time.add_tween(
                "flash",
                colour_transition(Rgba([255, 240, 200, 120]), Rgba([255, 240, 200, 0]), 0.5, move |c| {
                    tint.set(c)
                }),
            );
        });
    }

    let step = WALK_SPEED / engine.config().frame_rate;
    let mut zone = level.hall;

    for frame in 0..FRAMES {
        let render = engine.render_system_mut()?;
        if let Some(overlay) = render.overlay_mut(level.flash) {
            overlay.kind = OverlayKind::Colour {
                colour: tint.get().0,
                size: overlay.size(),
            };
        }

        let pos = match render.camera_mut() {
            Some(cam) => {
                // Walk east into the gallery, then turn north to face the alcove.
                if cam.pos.x < 800.0 {
                    cam.pos.x += step;
                } else {
                    cam.angle = (cam.angle + 0.02).min(std::f64::consts::FRAC_PI_2);
                    cam.pos.y = (cam.pos.y + 0.5 * step).min(650.0);
                }
                cam.pos
            }
            None => break,
        };

        let next_zone = if pos.y > 500.0 {
            level.alcove
        } else if pos.x > 500.0 {
            level.gallery
        } else {
            level.hall
        };
        if next_zone != zone {
            engine.change_zone(player, zone, next_zone);
            zone = next_zone;
        }

        let image = engine.tick()?;
        if frame % SAVE_EVERY == 0 {
            let path = out_dir.join(format!("frame_{frame:04}.png"));
            image
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
    }

    log::info!("Done after {} frames ({:.1}s of game time)", engine.time().frame(), engine.time().now());
    Ok(())
}
