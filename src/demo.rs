//! Demo content: two small platformer levels.
//!
//! Both levels share the same map vocabulary:
//!
//! | symbol | item |
//! |--------|------|
//! | `#` | black wall |
//! | `'` | ground strip, tagged `ground` |
//! | `F` | finish line; touching it with the player changes level |
//! | `@` | player spawn |
//! | `o` | heavy gold ball (level one only) |
//!
//! The player is created by the `@` factory and stored in the level context
//! under [`PLAYER`], so callbacks recognise it by handle.

use std::f64::consts::TAU;
use std::time::Duration;

use log::{info, warn};

use crate::components::shape::{Color, Pattern, Shape, ShapeId, ShapeProps, ShapeType};
use crate::error::Result;
use crate::events::bus::{Event, EventKind};
use crate::level::{Level, LoopData, Map};
use crate::math::Vector2;
use crate::resources::assets::MemorySource;
use crate::resources::audioclip::{TONE_SAMPLE_RATE, encode_wav_pcm16};
use crate::resources::input::Key;
use crate::systems::render::Surface;
use crate::world::World;

/// Level context key of the player shape.
pub const PLAYER: &str = "player";
pub const PLAYER_SPEED: f64 = 320.0;
pub const JUMP_SPEED: f64 = 620.0;
pub const HELP_TEXT: &str = "Press Space to jump, Left/Right to move";

const JUMP_WAV: &str = "sounds/jump.wav";
const COMPLETE_WAV: &str = "sounds/level_complete.wav";

pub const LEVEL_ONE_MAP: [&str; 9] = [
    "#############################",
    "#                           #",
    "#                           #",
    "#  @ o                      #",
    "''''''F                     #",
    "#                           #",
    "#                           #",
    "#                           #",
    "'''''''''''''''''''''''''''''",
];

pub const LEVEL_TWO_MAP: [&str; 9] = [
    "#############################",
    "#      @                    #",
    "#      '''                  #",
    "#                           #",
    "#  '''                      #",
    "#          '''              #",
    "#                           #",
    "#             FFF           #",
    "'''''''''''''''''''''''''''''",
];

/// Install the demo into `world`: borders, levels, the test beep and its
/// triggers. Loads the first level.
pub fn install(world: &mut World) -> Result<()> {
    world.create_borders();
    for level in levels() {
        world.add_level(level);
    }

    world.create_test_tone("test_beep", 440.0, Duration::from_millis(500));
    world.on(EventKind::MouseDown, |world, _| play_beep(world));
    world.on(EventKind::KeyDown, |world, event| {
        if matches!(event, Event::KeyDown { key } if *key == Key::char('t')) {
            play_beep(world);
        }
    });
    world.on(EventKind::LevelChanged, |world, event| {
        if let Event::LevelChanged { to, .. } = event {
            info!(
                "Now playing level {} '{}'",
                to,
                world.current_level_name().unwrap_or("?")
            );
        }
    });

    world.start()
}

pub fn levels() -> Vec<Level> {
    vec![level_one(), level_two()]
}

pub fn level_one() -> Level {
    Level::new("one")
        .with_map(Map::new(LEVEL_ONE_MAP))
        .with_item('#', wall)
        .with_item('\'', |world, position, w, h| {
            ground(world, position, w, h, Color::BLACK)
        })
        .with_item('F', |world, position, w, h| {
            finish(world, position, w, h, Color::GREEN, None)
        })
        .with_item('@', spawn_player)
        .with_item('o', ball)
        .on_init(load_sounds)
        .on_tick(player_tick)
        .on_render(help_text)
}

pub fn level_two() -> Level {
    Level::new("two")
        .with_map(Map::new(LEVEL_TWO_MAP))
        .with_item('#', wall)
        .with_item('\'', |world, position, w, h| {
            ground(world, position, w, h, Color::LIGHT_GRAY)
        })
        .with_item('F', |world, position, w, h| {
            finish(world, position, w, h, Color::RED, Some(0))
        })
        .with_item('@', spawn_player)
        .on_init(load_sounds)
        .on_tick(player_tick)
        .on_render(help_text)
}

fn wall(world: &mut World, position: Vector2, w: f64, h: f64) {
    world.register(Shape::new(ShapeProps {
        name: Some("wall".into()),
        pattern: Pattern::Color(Color::BLACK),
        x: position.x,
        y: position.y,
        width: w,
        height: h,
        friction: 0.5,
        rotation_lock: true,
        ..Default::default()
    }));
}

fn ground(world: &mut World, position: Vector2, w: f64, h: f64, color: Color) {
    world.register(Shape::new(ShapeProps {
        tag: Some("ground".into()),
        pattern: Pattern::Color(color),
        x: position.x,
        y: position.y,
        width: w,
        height: h,
        friction: 0.5,
        rotation_lock: true,
        ..Default::default()
    }));
}

/// Finish line. `target` of `None` advances to the next level, otherwise
/// jumps to that level index.
fn finish(world: &mut World, position: Vector2, w: f64, h: f64, color: Color, target: Option<usize>) {
    let shape = Shape::new(ShapeProps {
        name: Some("finish".into()),
        pattern: Pattern::Color(color),
        x: position.x,
        y: position.y,
        width: w,
        height: h,
        ..Default::default()
    })
    .with_on_collision(move |ctx, other| {
        if !ctx.is(PLAYER, other) {
            return;
        }
        let commands = ctx.commands();
        commands.play_sound("level_complete");
        match target {
            Some(index) => commands.switch_to_level(index),
            None => commands.next_level(),
        }
    });
    world.register(shape);
}

fn spawn_player(world: &mut World, position: Vector2, w: f64, h: f64) {
    let id = world.register(Shape::new(ShapeProps {
        name: Some(PLAYER.into()),
        pattern: Pattern::Color(Color::WHITE),
        x: position.x,
        y: position.y,
        width: w * 0.75,
        height: h * 0.9,
        mass: 10.0,
        friction: 0.5,
        rotation_lock: true,
        physics: true,
        is_body: true,
        ..Default::default()
    }));
    world.context_mut().set_shape(PLAYER, id);
}

fn ball(world: &mut World, position: Vector2, w: f64, h: f64) {
    let shape = Shape::new(ShapeProps {
        shape_type: ShapeType::Circle,
        pattern: Pattern::Color(Color::GOLD),
        x: position.x + w * 0.5,
        y: position.y + h * 0.5,
        radius: w * 0.5,
        mass: 100.0,
        friction: 0.5,
        rebound: 0.5,
        physics: true,
        is_body: true,
        ..Default::default()
    })
    .with_on_collision(|ctx, other| {
        if ctx.is(PLAYER, other) {
            ctx.commands().play_sound("jump");
        }
    });
    world.register(shape);
}

/// Synthesized WAV files for the demo sounds.
pub fn sound_bank() -> MemorySource {
    MemorySource::new()
        .with(JUMP_WAV, encode_wav_pcm16(&chirp(440.0, 880.0, 0.12), TONE_SAMPLE_RATE))
        .with(
            COMPLETE_WAV,
            encode_wav_pcm16(&chirp(523.25, 1046.5, 0.4), TONE_SAMPLE_RATE),
        )
}

/// Linear frequency sweep with a short fade out.
fn chirp(from: f64, to: f64, seconds: f64) -> Vec<f32> {
    let rate = TONE_SAMPLE_RATE as f64;
    let frames = (seconds * rate) as usize;
    let mut phase = 0.0f64;
    (0..frames)
        .map(|i| {
            let t = i as f64 / frames as f64;
            phase += TAU * (from + (to - from) * t) / rate;
            let fade = ((1.0 - t) * 10.0).min(1.0);
            (phase.sin() * 0.4 * fade) as f32
        })
        .collect()
}

fn load_sounds(world: &mut World) {
    let bank = sound_bank();
    for (name, path) in [("jump", JUMP_WAV), ("level_complete", COMPLETE_WAV)] {
        if let Err(e) = world.load_sound(name, &bank, path) {
            warn!("Sound '{}' unavailable: {}", name, e);
        }
    }
}

fn play_beep(world: &mut World) {
    if let Err(e) = world.play_sound("test_beep") {
        warn!("{}", e);
    }
}

/// True when the player rests on something below it.
fn is_grounded(world: &World, player: ShapeId) -> bool {
    world.contacts().iter().any(|c| {
        (c.a == player && c.normal.y > 0.5) || (c.b == player && c.normal.y < -0.5)
    })
}

fn player_tick(world: &mut World, data: &LoopData) {
    let Some(player) = world.context().get_shape(PLAYER) else {
        return;
    };
    let grounded = is_grounded(world, player);

    let mut vx = 0.0;
    if data.input.is_key_down(Key::Left) {
        vx -= PLAYER_SPEED;
    }
    if data.input.is_key_down(Key::Right) {
        vx += PLAYER_SPEED;
    }
    let jump = grounded && data.input.is_key_just_pressed(Key::Space);

    {
        let Some(mut shape) = world.shape_mut(player) else {
            return;
        };
        shape.velocity.x = vx;
        if jump {
            shape.velocity.y = -JUMP_SPEED;
        }
    }

    if jump {
        if let Err(e) = world.play_sound("jump") {
            warn!("{}", e);
        }
    }
}

fn help_text(world: &World, surface: &mut dyn Surface) {
    let Some(shape) = world.context().get_shape(PLAYER).and_then(|id| world.shape(id)) else {
        return;
    };
    let position = shape.position + Vector2::new(10.0, -15.0);
    surface.draw_text(HELP_TEXT, position, 20.0, Color::WHITE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::gameconfig::WorldConfig;

    #[test]
    fn test_level_maps_are_rectangular() {
        for map in [LEVEL_ONE_MAP, LEVEL_TWO_MAP] {
            assert!(map.iter().all(|row| row.chars().count() == map[0].chars().count()));
        }
    }

    #[test]
    fn test_install_loads_level_one_with_player_and_sounds() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        install(&mut world).unwrap();

        assert_eq!(world.current_level_name(), Some("one"));
        let player = world.context().get_shape(PLAYER).unwrap();
        assert_eq!(world.shape(player).unwrap().position, Vector2::new(3.0 * 64.0, 3.0 * 64.0));
        assert_eq!(world.find_all_by_name("finish").len(), 1);
        assert!(world.audio_player().has_sound("jump"));
        assert!(world.audio_player().has_sound("level_complete"));
        assert!(world.audio_player().has_sound("test_beep"));
    }

    #[test]
    fn test_chirp_fades_out() {
        let samples = chirp(440.0, 880.0, 0.1);
        assert_eq!(samples.len(), (0.1 * TONE_SAMPLE_RATE as f64) as usize);
        assert!(samples.iter().all(|s| s.abs() <= 0.4));
        assert!(samples.last().unwrap().abs() < 0.05);
    }
}
