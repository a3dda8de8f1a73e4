mod common;

use common::{one_room, p, two_rooms};
use image::{Rgba, RgbaImage};
use portalcast::assets::placeholder_colour;
use portalcast::math::{Matrix, Size};
use portalcast::render::OverlayKind;
use portalcast::scene::PolyPath;

// Camera at the origin facing +x, eye 50 above the floor, 320x240 frame:
// the wall ahead spans rows 92 to 148 of the centre column.
const CENTRE: (u32, u32) = (160, 120);

fn pixel(frame: &RgbaImage, (x, y): (u32, u32)) -> Rgba<u8> {
    *frame.get_pixel(x, y)
}

#[test]
fn single_room_shows_wall_floor_and_ceiling() {
    let (mut engine, _) = one_room();
    let frame = engine.tick().unwrap();

    assert_eq!(frame.dimensions(), (320, 240));
    assert_eq!(pixel(frame, CENTRE), placeholder_colour("wall"));
    assert_eq!(pixel(frame, (160, 0)), placeholder_colour("ceiling_a"));
    assert_eq!(pixel(frame, (160, 239)), placeholder_colour("floor_a"));
}

#[test]
fn open_sky_replaces_the_ceiling() {
    let mut engine = common::engine();
    let room = {
        let mut scene = engine.scene_builder();
        let room = scene
            .add_root_region(&common::room_style().open_sky())
            .unwrap();
        let square = PolyPath::closed(vec![p(-500.0, -500.0), p(500.0, -500.0), p(500.0, 500.0), p(-500.0, 500.0)]);
        scene.add_walls(room, &square, "wall").unwrap();
        room
    };
    let camera = engine.new_camera(room);
    engine.set_camera(camera).unwrap();

    let graph = engine.render_system().unwrap().graph();
    assert!(!graph.find_region(room).unwrap().has_ceiling);

    let frame = engine.tick().unwrap();
    assert_eq!(pixel(frame, (160, 0)), portalcast::render::RasterSettings::default().sky);
    assert_eq!(pixel(frame, CENTRE), placeholder_colour("wall"));
}

#[test]
fn portal_is_opaque_until_regions_are_connected() {
    let mut rooms = two_rooms();

    let frame = rooms.engine.tick().unwrap();
    assert_eq!(pixel(frame, CENTRE), placeholder_colour("default"));

    rooms.engine.connect_regions().unwrap();
    let frame = rooms.engine.tick().unwrap();
    assert_eq!(pixel(frame, CENTRE), placeholder_colour("far"));
    // Near flats still belong to the camera's own room.
    assert_eq!(pixel(frame, (160, 239)), placeholder_colour("floor_a"));
}

#[test]
fn sprites_are_drawn_in_front_of_walls_and_hidden_behind_them() {
    let (mut engine, room) = one_room();
    {
        let mut scene = engine.scene_builder();
        scene
            .add_sprite(room, "guard", Size::new(50.0, 100.0), &Matrix::new(0.0, p(200.0, 0.0)))
            .unwrap();
        scene
            .add_sprite(room, "lurker", Size::new(50.0, 100.0), &Matrix::new(0.0, p(700.0, 0.0)))
            .unwrap();
    }

    let frame = engine.tick().unwrap();
    let guard = placeholder_colour("guard");
    assert_eq!(pixel(frame, CENTRE), guard);
    assert_eq!(pixel(frame, (60, 120)), placeholder_colour("wall"));
    assert!(frame.pixels().all(|c| *c != placeholder_colour("lurker")));
}

#[test]
fn decals_cover_floor_and_wall() {
    let (mut engine, room) = one_room();
    let east_wall = {
        let render = engine.render_system().unwrap();
        render
            .graph()
            .find_region(room)
            .unwrap()
            .boundaries[2]
    };
    {
        let mut scene = engine.scene_builder();
        scene
            .add_floor_decal(room, "rug", Size::new(50.0, 100.0), Matrix::new(0.0, p(100.0, -50.0)))
            .unwrap();
        scene
            .add_wall_decal(east_wall, "poster", Size::new(40.0, 40.0), p(480.0, 30.0))
            .unwrap();
    }

    let frame = engine.tick().unwrap();
    assert_eq!(pixel(frame, (160, 239)), placeholder_colour("rug"));
    assert_eq!(pixel(frame, CENTRE), placeholder_colour("poster"));
    assert_eq!(pixel(frame, (160, 95)), placeholder_colour("wall"));
}

#[test]
fn overlays_stack_by_z_index() {
    let (mut engine, _) = one_room();
    {
        let mut scene = engine.scene_builder();
        let size = Size::new(1.0, 1.0);
        scene
            .add_overlay(p(0.0, 0.0), 5, OverlayKind::Colour { colour: [0, 0, 255, 255], size })
            .unwrap();
        scene
            .add_overlay(p(0.0, 0.0), 1, OverlayKind::Colour { colour: [255, 0, 0, 255], size })
            .unwrap();
    }

    let frame = engine.tick().unwrap();
    assert_eq!(pixel(frame, (5, 5)), Rgba([0, 0, 255, 255]));
    assert_eq!(pixel(frame, (160, 239)), placeholder_colour("floor_a"));
}
