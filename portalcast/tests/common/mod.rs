#![allow(dead_code)]

use portalcast::math::{LineSegment, Point};
use portalcast::scene::{PolyPath, RegionStyle};
use portalcast::{Camera, Engine, EngineConfig, EntityId};

/// Room A spans x in [-500, 500], room B spans x in [500, 1500]. Both are
/// 1000 deep along y and meet at a portal on x = 500.
pub struct TwoRooms {
    pub engine: Engine,
    pub room_a: EntityId,
    pub room_b: EntityId,
    pub join_a: EntityId,
    pub join_b: EntityId,
    pub far_wall: EntityId,
}

pub fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

pub fn engine() -> Engine {
    Engine::new(EngineConfig::default()).unwrap()
}

pub fn room_style() -> RegionStyle {
    RegionStyle::default().textures("floor_a", "ceiling_a")
}

/// A single closed room with the camera at its centre, facing +x.
pub fn one_room() -> (Engine, EntityId) {
    let mut engine = engine();
    let room = {
        let mut scene = engine.scene_builder();
        let room = scene.add_root_region(&room_style()).unwrap();
        let square = PolyPath::closed(vec![p(-500.0, -500.0), p(500.0, -500.0), p(500.0, 500.0), p(-500.0, 500.0)]);
        scene.add_walls(room, &square, "wall").unwrap();
        room
    };
    engine.connect_regions().unwrap();
    let camera = engine.new_camera(room);
    engine.set_camera(camera).unwrap();
    (engine, room)
}

pub fn two_rooms() -> TwoRooms {
    let mut engine = engine();
    let (room_a, room_b, join_a, join_b, far_wall) = {
        let mut scene = engine.scene_builder();

        let room_a = scene.add_root_region(&room_style()).unwrap();
        scene
            .add_walls(
                room_a,
                &PolyPath::open(vec![p(500.0, 500.0), p(-500.0, 500.0), p(-500.0, -500.0), p(500.0, -500.0)]),
                "wall",
            )
            .unwrap();

        let room_b = scene
            .add_region(room_a, &RegionStyle::default().textures("floor_b", "ceiling_b"))
            .unwrap();
        scene
            .add_walls(room_b, &PolyPath::open(vec![p(500.0, -500.0), p(1500.0, -500.0)]), "wall")
            .unwrap();
        let far_wall = scene
            .add_walls(room_b, &PolyPath::open(vec![p(1500.0, -500.0), p(1500.0, 500.0)]), "far")
            .unwrap()[0];
        scene
            .add_walls(room_b, &PolyPath::open(vec![p(1500.0, 500.0), p(500.0, 500.0)]), "wall")
            .unwrap();

        let portal = scene.new_join_id();
        let join_a = scene
            .add_join(room_a, LineSegment::new(p(500.0, -500.0), p(500.0, 500.0)), portal, "default", "default")
            .unwrap();
        let join_b = scene
            .add_join(room_b, LineSegment::new(p(500.0, 500.0), p(500.0, -500.0)), portal, "brick", "default")
            .unwrap();

        (room_a, room_b, join_a, join_b, far_wall)
    };

    let camera = Camera::new(room_a);
    engine.set_camera(camera).unwrap();

    TwoRooms {
        engine,
        room_a,
        room_b,
        join_a,
        join_b,
        far_wall,
    }
}
