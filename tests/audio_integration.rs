//! Audio manager integration tests: registry errors, concurrent playback
//! and what actually reaches the sink.

use std::thread;
use std::time::{Duration, Instant};

use lifeengine::components::shape::{Shape, ShapeProps};
use lifeengine::events::audio::AudioMessage;
use lifeengine::resources::assets::{AssetSource, DirSource, MemorySource};
use lifeengine::resources::audio::AudioManager;
use lifeengine::resources::audioclip::encode_wav_pcm16;
use lifeengine::resources::gameconfig::WorldConfig;
use lifeengine::systems::audio::MemorySink;
use lifeengine::{EngineError, Vector2, World};

const RATE: u32 = 8_000;

fn memory_audio() -> (AudioManager, MemorySink) {
    let sink = MemorySink::new(RATE);
    let thread_sink = sink.clone();
    (AudioManager::with_sink(move || thread_sink).unwrap(), sink)
}

/// Poll until `pred` holds or `timeout` passes.
fn wait_for(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    pred()
}

#[test]
fn test_play_unloaded_sound_is_not_found() {
    let world = World::new(WorldConfig::default()).unwrap();
    assert!(matches!(
        world.play_sound("missing"),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn test_load_from_memory_then_play() {
    let world = World::new(WorldConfig::default()).unwrap();
    let source = MemorySource::new().with("x.wav", encode_wav_pcm16(&[0.25; 400], RATE));
    world.load_sound("x", &source, "x.wav").unwrap();
    assert!(world.play_sound("x").is_ok());
}

#[test]
fn test_undecodable_music_is_a_decode_error() {
    let world = World::new(WorldConfig::default()).unwrap();
    let source = MemorySource::new().with("music/background.mp3", vec![0xFF, 0xFB, 0x90, 0x00]);
    assert!(matches!(
        world.load_music("background", &source, "music/background.mp3"),
        Err(EngineError::Decode(_))
    ));
    assert!(world.play_music("background", true).is_err());
}

#[test]
fn test_load_from_directory() {
    let dir = std::env::temp_dir().join(format!("lifeengine-audio-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("beep.wav"), encode_wav_pcm16(&[0.5; 100], RATE)).unwrap();

    let source = DirSource::new(&dir);
    assert!(source.read("beep.wav").is_ok());
    let world = World::new(WorldConfig::default()).unwrap();
    world.load_sound("beep", &source, "beep.wav").unwrap();
    world.load_music("theme", &source, "beep.wav").unwrap();
    assert!(world.play_sound("beep").is_ok());
    assert!(world.play_music("theme", false).is_ok());
    assert!(matches!(
        world.load_sound("nope", &source, "nope.wav"),
        Err(EngineError::Io(_) | EngineError::NotFound(_))
    ));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_test_tone_reaches_the_sink() {
    let (audio, sink) = memory_audio();
    audio.create_test_tone("test_beep", 440.0, Duration::from_millis(100));
    audio.play_sound("test_beep").unwrap();

    assert!(wait_for(Duration::from_secs(2), || sink.peak() > 0.1));
    assert!(sink.peak() <= 1.0);
}

#[test]
fn test_fx_messages_report_start_and_finish() {
    let (audio, _sink) = memory_audio();
    audio.create_test_tone("blip", 660.0, Duration::from_millis(30));
    audio.play_sound("blip").unwrap();

    let mut messages = Vec::new();
    assert!(wait_for(Duration::from_secs(2), || {
        messages.extend(audio.poll_messages());
        messages.contains(&AudioMessage::FxFinished { id: "blip".into() })
    }));
    assert_eq!(messages[0], AudioMessage::FxPlayStarted { id: "blip".into() });
}

#[test]
fn test_concurrent_play_from_many_threads() {
    let (mut audio, sink) = memory_audio();
    audio.create_test_tone("hit", 330.0, Duration::from_millis(40));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let player = audio.player();
            thread::spawn(move || {
                for _ in 0..10 {
                    player.play_sound("hit").unwrap();
                    assert!(player.play_sound("missing").is_err());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut started = 0;
    assert!(wait_for(Duration::from_secs(2), || {
        started += audio
            .poll_messages()
            .iter()
            .filter(|m| matches!(m, AudioMessage::FxPlayStarted { .. }))
            .count();
        started == 80
    }));
    assert!(wait_for(Duration::from_secs(2), || sink.peak() > 0.0));
    audio.shutdown();
}

#[test]
fn test_loading_while_playing_from_another_thread() {
    let (audio, _sink) = memory_audio();
    audio.create_test_tone("a", 440.0, Duration::from_millis(20));
    let player = audio.player();
    let trigger = thread::spawn(move || {
        for _ in 0..50 {
            player.play_sound("a").unwrap();
        }
    });
    for i in 0..50 {
        audio.create_test_tone(&format!("tone{}", i), 200.0 + i as f64, Duration::from_millis(5));
    }
    trigger.join().unwrap();
    assert!(audio.player().has_sound("tone49"));
}

#[test]
fn test_music_loops_until_stopped() {
    let (audio, _sink) = memory_audio();
    let source = MemorySource::new().with("loop.wav", encode_wav_pcm16(&[0.2; 80], RATE));
    audio.load_music("loop", &source, "loop.wav").unwrap();
    audio.play_music("loop", true).unwrap();

    let mut messages = Vec::new();
    assert!(wait_for(Duration::from_secs(2), || {
        messages.extend(audio.poll_messages());
        messages.contains(&AudioMessage::MusicPlayStarted { id: "loop".into() })
    }));
    // Ten-millisecond clip, looped: still playing well after its length.
    thread::sleep(Duration::from_millis(100));
    messages.extend(audio.poll_messages());
    assert!(!messages.contains(&AudioMessage::MusicFinished { id: "loop".into() }));

    audio.stop_music("loop");
    assert!(wait_for(Duration::from_secs(2), || {
        messages.extend(audio.poll_messages());
        messages.contains(&AudioMessage::MusicStopped { id: "loop".into() })
    }));
}

#[test]
fn test_world_audio_reaches_memory_sink() {
    let sink = MemorySink::new(RATE);
    let thread_sink = sink.clone();
    let audio = AudioManager::with_sink(move || thread_sink).unwrap();
    let world = World::with_audio(WorldConfig::default(), audio);
    world.create_test_tone("test_beep", 440.0, Duration::from_millis(50));
    world.play_sound("test_beep").unwrap();
    assert!(wait_for(Duration::from_secs(2), || sink.peak() > 0.1));
}

#[test]
fn test_two_coins_in_one_tick_play_overlapping_voices() {
    let sink = MemorySink::new(RATE);
    let thread_sink = sink.clone();
    let audio = AudioManager::with_sink(move || thread_sink).unwrap();
    let mut world = World::with_audio(
        WorldConfig {
            gravity: Vector2::ZERO,
            ..Default::default()
        },
        audio,
    );
    let source = MemorySource::new().with("coin.wav", encode_wav_pcm16(&[0.4; 4_000], RATE));
    world.load_sound("coin", &source, "coin.wav").unwrap();

    world.register(Shape::new(ShapeProps {
        x: 100.0,
        y: 100.0,
        width: 20.0,
        height: 20.0,
        mass: 1.0,
        physics: true,
        is_body: true,
        rotation_lock: true,
        ..Default::default()
    }));
    for x in [95.0, 115.0] {
        let coin = Shape::rectangle(x, 105.0, 10.0, 10.0)
            .with_on_collision(|ctx, _| ctx.commands().play_sound("coin"));
        world.register(coin);
    }

    world.tick(1.0 / 60.0);
    assert_eq!(world.contacts().len(), 2);
    // One coin alone peaks at 0.4.
    assert!(wait_for(Duration::from_secs(2), || sink.peak() > 0.7));
}
