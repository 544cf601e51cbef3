//! Level state machine integration tests: map parsing, transitions,
//! lifecycle events and level changes requested from collision callbacks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lifeengine::components::shape::{Shape, ShapeProps};
use lifeengine::events::bus::{Event, EventKind};
use lifeengine::level::{Level, Map};
use lifeengine::resources::gameconfig::WorldConfig;
use lifeengine::resources::input::{Key, MouseButton};
use lifeengine::world::BORDER_NAME;
use lifeengine::{EngineError, Vector2, World};

const CELL: f64 = 10.0;
const NO_BUTTONS: [MouseButton; 0] = [];

fn make_world() -> World {
    World::new(WorldConfig {
        width: 300.0,
        height: 300.0,
        cell_width: CELL,
        cell_height: CELL,
        ..Default::default()
    })
    .unwrap()
}

fn wall(world: &mut World, position: Vector2, w: f64, h: f64) {
    world.register(Shape::new(ShapeProps {
        name: Some("wall".into()),
        x: position.x,
        y: position.y,
        width: w,
        height: h,
        rotation_lock: true,
        ..Default::default()
    }));
}

fn player(world: &mut World, position: Vector2, w: f64, h: f64) {
    let id = world.register(Shape::new(ShapeProps {
        name: Some("player".into()),
        x: position.x,
        y: position.y,
        width: w,
        height: h,
        physics: true,
        is_body: true,
        rotation_lock: true,
        ..Default::default()
    }));
    world.context_mut().set_shape("player", id);
}

fn boxed_level(name: &str) -> Level {
    Level::new(name)
        .with_map(Map::new(["###", "#@#", "###"]))
        .with_item('#', wall)
        .with_item('@', player)
}

fn record_level_changes(world: &mut World) -> Arc<Mutex<Vec<(Option<usize>, usize)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    world.on(EventKind::LevelChanged, move |_, event| {
        if let Event::LevelChanged { from, to } = event {
            sink.lock().unwrap().push((*from, *to));
        }
    });
    seen
}

#[test]
fn test_three_by_three_map_places_player_and_eight_walls() {
    let mut world = make_world();
    let init_saw_player = Arc::new(Mutex::new(None));
    let saw = Arc::clone(&init_saw_player);
    world.add_level(boxed_level("box").on_init(move |world| {
        let id = world.context().get_shape("player");
        *saw.lock().unwrap() = id.and_then(|id| world.shape(id)).map(|s| s.position);
    }));
    world.start().unwrap();

    let player = world.context().get_shape("player").unwrap();
    assert_eq!(world.shape(player).unwrap().position, Vector2::new(CELL, CELL));
    assert_eq!(world.find_all_by_name("wall").len(), 8);
    assert_eq!(world.shape_count(), 9);
    // Init runs after the map is built.
    assert_eq!(*init_saw_player.lock().unwrap(), Some(Vector2::new(CELL, CELL)));
}

#[test]
fn test_unmapped_symbols_are_empty_space() {
    let mut world = make_world();
    world.add_level(
        Level::new("sparse")
            .with_map(Map::new(["#?#", "x x"]))
            .with_item('#', wall),
    );
    world.start().unwrap();
    assert_eq!(world.shape_count(), 2);
}

#[test]
fn test_switch_out_of_range_changes_nothing() {
    let mut world = make_world();
    world.add_level(boxed_level("a"));
    world.start().unwrap();
    let before = world.shape_ids();

    let result = world.switch_to_level(5);
    assert!(matches!(result, Err(EngineError::OutOfRange { index: 5, len: 1 })));
    assert_eq!(world.current_level(), Some(0));
    assert_eq!(world.shape_ids(), before);
}

#[test]
fn test_transition_keeps_borders_and_drops_previous_shapes() {
    let mut world = make_world();
    let borders = world.create_borders();
    world.add_level(boxed_level("a"));
    world.add_level(
        Level::new("b")
            .with_map(Map::new(["#  #"]))
            .with_item('#', wall),
    );
    world.start().unwrap();
    let old_player = world.context().get_shape("player").unwrap();
    assert_eq!(world.shape_count(), 4 + 9);

    world.switch_to_level(1).unwrap();
    assert_eq!(world.current_level_name(), Some("b"));
    assert!(!world.contains(old_player));
    assert!(world.context().get_shape("player").is_none());
    assert_eq!(world.find_all_by_name("wall").len(), 2);
    assert_eq!(world.find_all_by_name(BORDER_NAME), borders);
    assert_eq!(world.shape_count(), 4 + 2);
}

#[test]
fn test_next_level_walks_forward_and_stops_at_last() {
    let mut world = make_world();
    let seen = record_level_changes(&mut world);
    world.add_level(boxed_level("a"));
    world.add_level(boxed_level("b"));

    assert!(world.next_level());
    assert_eq!(world.current_level(), Some(0));
    assert!(world.next_level());
    assert_eq!(world.current_level(), Some(1));
    assert!(!world.next_level());
    assert_eq!(world.current_level(), Some(1));
    assert_eq!(world.shape_count(), 9);

    assert!(world.restart_level());
    assert_eq!(world.shape_count(), 9);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(None, 0), (Some(0), 1), (Some(1), 1)]
    );
}

#[test]
fn test_finish_callback_requests_next_level_and_sound() {
    let mut world = make_world();
    let seen = record_level_changes(&mut world);
    let collisions = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&collisions);
    world.on(EventKind::Collision, move |_, _| *counter.lock().unwrap() += 1);

    world.add_level(
        Level::new("drop")
            .with_map(Map::new(["@", "F"]))
            .with_item('@', player)
            .with_item('F', |world, position, w, h| {
                let finish = Shape::new(ShapeProps {
                    x: position.x,
                    y: position.y,
                    width: w,
                    height: h,
                    ..Default::default()
                })
                .with_on_collision(|ctx, other| {
                    if ctx.is("player", other) {
                        ctx.commands().play_sound("ding");
                        ctx.commands().next_level();
                        // Folded into the first request.
                        ctx.commands().switch_to_level(0);
                    }
                });
                world.register(finish);
            })
            .on_init(|world| world.create_test_tone("ding", 880.0, Duration::from_millis(50))),
    );
    world.add_level(Level::new("after"));
    world.start().unwrap();

    // The player falls onto the finish line within a few ticks.
    for _ in 0..10 {
        world.tick(1.0 / 60.0);
        if world.current_level() == Some(1) {
            break;
        }
    }
    assert_eq!(world.current_level_name(), Some("after"));
    assert_eq!(world.shape_count(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![(None, 0), (Some(0), 1)]);
    // Both shapes were gone by the time events went out.
    assert_eq!(*collisions.lock().unwrap(), 0);
}

#[test]
fn test_level_tick_sees_input_and_pause_does_not_stop_it() {
    let mut world = make_world();
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&ticks);
    world.add_level(Level::new("input").on_tick(move |_, data| {
        sink.lock().unwrap().push(data.input.is_key_down(Key::Left));
    }));
    world.start().unwrap();
    world.set_paused(true);

    world.tick(0.1);
    world.set_input([Key::Left], NO_BUTTONS, Vector2::ZERO);
    world.tick(0.1);
    assert_eq!(*ticks.lock().unwrap(), vec![false, true]);
}

#[test]
fn test_map_from_json_drives_a_level() {
    let mut world = make_world();
    let map = Map::from_json(r#####"["#  #", "#@ #", "####"]"#####).unwrap();
    world.add_level(
        Level::new("json")
            .with_map(map)
            .with_item('#', wall)
            .with_item('@', player),
    );
    world.start().unwrap();
    assert_eq!(world.find_all_by_name("wall").len(), 8);
    let player = world.context().get_shape("player").unwrap();
    assert_eq!(world.shape(player).unwrap().position, Vector2::new(CELL, CELL));
}
