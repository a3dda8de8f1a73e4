mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{p, two_rooms};
use portalcast::math::{Matrix, Size};
use portalcast::render::{Animation, CRegion, CRender, CSprite, CWall, IDLE_ANIMATION};
use portalcast::{Component, ComponentKind, EngineError, LineSegment, StructuralError};

#[test]
fn connected_portal_twins_share_regions_and_textures() {
    let mut rooms = two_rooms();
    assert!(rooms.engine.connect_regions().unwrap());

    let graph = rooms.engine.render_system().unwrap().graph();
    for id in [rooms.join_a, rooms.join_b] {
        let join = graph.join(id).unwrap();
        assert_eq!(join.region_a, Some(rooms.room_b));
        assert_eq!(join.region_b, Some(rooms.room_a));
        assert_eq!(join.top_texture, "brick");
        assert_eq!(join.bottom_texture, "default");
    }
    assert_eq!(graph.join(rooms.join_a).unwrap().other_side(rooms.room_a), Some(rooms.room_b));
}

#[test]
fn second_connect_is_ignored() {
    let mut rooms = two_rooms();
    assert!(rooms.engine.connect_regions().unwrap());
    assert!(!rooms.engine.connect_regions().unwrap());
    assert!(rooms.engine.render_system().unwrap().regions_connected());
}

#[test]
fn rejected_components_leave_the_graph_untouched() {
    let mut rooms = two_rooms();
    let boundaries_before = rooms.engine.render_system().unwrap().graph().boundaries.len();
    let em = rooms.engine.entities_mut();

    let ghost = em.next_id();
    let orphan = em.next_id();
    let lseg = LineSegment::new(p(0.0, 0.0), p(1.0, 0.0));
    let err = em
        .add_component(Component::Render(CRender::Wall(CWall::new(orphan, ghost, lseg))))
        .unwrap_err();
    assert_eq!(err, EngineError::from(StructuralError::UnknownParent(ghost)));

    let wall = rooms.far_wall;
    let err = em
        .add_component(Component::Render(CRender::Region(CRegion::new(orphan, Some(wall)))))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Structural(StructuralError::HostMismatch { .. })
    ));

    let err = em
        .add_component(Component::Render(CRender::Region(CRegion::new(orphan, None))))
        .unwrap_err();
    assert_eq!(err, EngineError::from(StructuralError::DuplicateRoot));

    let mut sprite = CSprite::new(orphan, rooms.room_a, Size::new(10.0, 10.0), "x");
    sprite.parent_id = None;
    let err = em
        .add_component(Component::Render(CRender::Sprite(sprite)))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Structural(StructuralError::Parentless(_))
    ));

    assert!(!em.has_component(orphan, ComponentKind::Render));
    let render = rooms.engine.render_system().unwrap();
    assert_eq!(render.graph().boundaries.len(), boundaries_before);
    assert!(render.kind_of(orphan).is_none());
    assert!(!render.hierarchy().contains(orphan));
}

#[test]
fn zone_change_moves_the_same_sprite_between_regions() {
    let mut rooms = two_rooms();
    rooms.engine.connect_regions().unwrap();

    let guard = rooms
        .engine
        .scene_builder()
        .add_sprite_with(rooms.room_a, |id, parent| {
            CSprite::new(id, parent, Size::new(50.0, 100.0), "guard")
                .with_animation(IDLE_ANIMATION, Animation::from_grid(8, 1, 0.0, false))
                .with_animation("run", Animation::from_grid(1, 4, 10.0, true))
        })
        .unwrap();

    {
        let render = rooms.engine.render_system_mut().unwrap();
        let sprite = render.sprite_mut(guard).unwrap();
        sprite.set_transform(&Matrix::new(0.0, p(400.0, 0.0)));
        assert!(sprite.play_animation("run"));
        sprite.animations.get_mut("run").unwrap().seek(2).unwrap();
    }
    let follower = rooms.engine.new_camera(rooms.room_a).following(guard);
    rooms.engine.set_camera(follower).unwrap();

    rooms.engine.change_zone(guard, rooms.room_a, rooms.room_b);

    let render = rooms.engine.render_system().unwrap();
    let graph = render.graph();
    assert_eq!(graph.sprite_region(guard), Some(rooms.room_b));
    assert!(graph.find_region(rooms.room_a).unwrap().sprite(guard).is_none());

    let sprite = graph.find_region(rooms.room_b).unwrap().sprite(guard).unwrap();
    assert_eq!(sprite.parent_id, Some(rooms.room_b));
    assert_eq!(sprite.pos, p(400.0, 0.0));
    assert_eq!(sprite.current_animation_name(), "run");
    assert_eq!(sprite.current_animation().unwrap().current_frame_index(), 2);

    assert_eq!(render.hierarchy().get_parent(guard), Some(rooms.room_b));
    assert_eq!(render.camera().unwrap().region, rooms.room_b);
}

#[test]
fn zone_change_into_an_unknown_region_is_logged_not_applied() {
    let mut rooms = two_rooms();
    let guard = rooms
        .engine
        .scene_builder()
        .add_sprite(rooms.room_a, "guard", Size::new(50.0, 100.0), &Matrix::IDENTITY)
        .unwrap();

    let err = rooms
        .engine
        .render_system_mut()
        .unwrap()
        .cross_regions(guard, rooms.room_a, rooms.far_wall)
        .unwrap_err();
    assert_eq!(err, EngineError::from(StructuralError::UnknownRegion(rooms.far_wall)));

    rooms.engine.change_zone(guard, rooms.room_a, rooms.far_wall);
    let graph = rooms.engine.render_system().unwrap().graph();
    assert_eq!(graph.sprite_region(guard), Some(rooms.room_a));
}

#[test]
fn a_region_cannot_move_into_its_own_subtree() {
    let mut rooms = two_rooms();
    let (a, b) = (rooms.room_a, rooms.room_b);
    let render = rooms.engine.render_system_mut().unwrap();

    let inner = render.hierarchy().get_children(a);
    assert!(inner.contains(&b));

    let err = render.cross_regions(a, a, b).unwrap_err();
    assert!(matches!(err, EngineError::Structural(_)));
}

#[test]
fn boundaries_stay_with_their_region() {
    let mut rooms = two_rooms();
    let (a, b) = (rooms.room_a, rooms.room_b);
    let render = rooms.engine.render_system_mut().unwrap();

    for boundary in [rooms.join_a, rooms.far_wall] {
        let from = render.hierarchy().get_parent(boundary).unwrap();
        let to = if from == a { b } else { a };
        let err = render.cross_regions(boundary, from, to).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Structural(StructuralError::HostMismatch { .. })
        ));
        assert_eq!(render.hierarchy().get_parent(boundary), Some(from));
        assert!(render.graph().find_region(from).unwrap().boundaries.contains(&boundary));
    }
}

#[test]
fn zone_changes_reach_bus_listeners_too() {
    let mut rooms = two_rooms();
    let guard = rooms
        .engine
        .scene_builder()
        .add_sprite(rooms.room_a, "guard", Size::new(50.0, 100.0), &Matrix::IDENTITY)
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    rooms
        .engine
        .events()
        .listen(portalcast::event::ENTITY_CHANGED_ZONE, move |e| log.borrow_mut().push(e.entity_id()));

    rooms.engine.change_zone(guard, rooms.room_a, rooms.room_b);
    assert_eq!(*seen.borrow(), vec![Some(guard)]);
}
