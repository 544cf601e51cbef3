//! Windowed host built on raylib.
//!
//! Only compiled with the `raylib` feature. Provides a [`Surface`] over a
//! raylib draw handle, an [`AudioSink`] over a raylib audio stream, input
//! polling into the world's key/button types and [`run_windowed`], the
//! frame loop tying them together.

use std::ffi::CString;
use std::path::Path;

use log::{error, info, warn};
use raylib::core::audio::{AudioStream, RaylibAudio};
use raylib::prelude::*;
use rustc_hash::FxHashMap;

use crate::components::shape::Color as ShapeColor;
use crate::error::{EngineError, Result};
use crate::math::Vector2 as Vec2d;
use crate::resources::audio::AudioManager;
use crate::resources::audioclip::AudioClip;
use crate::resources::input::{Key, MouseButton as EngineButton};
use crate::systems::audio::{AudioSink, NullSink, audio_thread};
use crate::systems::render::{Fill, Surface};
use crate::world::World;

fn to_rl(color: ShapeColor) -> Color {
    Color::new(color.r, color.g, color.b, color.a)
}

/// Textures by key, as referenced by image patterns.
#[derive(Default)]
pub struct TextureStore {
    textures: FxHashMap<String, Texture2D>,
}

impl TextureStore {
    pub fn load(
        &mut self,
        rl: &mut RaylibHandle,
        thread: &RaylibThread,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let texture = rl
            .load_texture(thread, &path.to_string_lossy())
            .map_err(|e| EngineError::Decode(format!("texture '{}': {}", path.display(), e)))?;
        info!("Loaded texture '{}' from '{}'", key, path.display());
        self.textures.insert(key.to_string(), texture);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Texture2D> {
        self.textures.get(key)
    }
}

/// [`Surface`] drawing through an open raylib frame.
pub struct RaylibSurface<'a, 'b> {
    d: &'a mut RaylibDrawHandle<'b>,
    textures: &'a TextureStore,
}

impl<'a, 'b> RaylibSurface<'a, 'b> {
    pub fn new(d: &'a mut RaylibDrawHandle<'b>, textures: &'a TextureStore) -> Self {
        Self { d, textures }
    }

    /// Draw `fill` into `dest`, rotated about the rectangle's center.
    fn fill_rect(&mut self, dest: Rectangle, fill: &Fill, rotation: f64) {
        let origin = Vector2::new(dest.width * 0.5, dest.height * 0.5);
        let dest = Rectangle::new(dest.x + origin.x, dest.y + origin.y, dest.width, dest.height);
        let degrees = rotation.to_degrees() as f32;
        match fill {
            Fill::Color(color) => self.d.draw_rectangle_pro(dest, origin, degrees, to_rl(*color)),
            Fill::Image(key) => match self.textures.get(key) {
                Some(tex) => {
                    let src = Rectangle::new(0.0, 0.0, tex.width as f32, tex.height as f32);
                    self.d
                        .draw_texture_pro(tex, src, dest, origin, degrees, Color::WHITE);
                }
                // Missing textures show as magenta.
                None => self.d.draw_rectangle_pro(dest, origin, degrees, Color::MAGENTA),
            },
        }
    }
}

impl Surface for RaylibSurface<'_, '_> {
    fn clear(&mut self, background: ShapeColor) {
        self.d.clear_background(to_rl(background));
    }

    fn draw_rectangle(&mut self, position: Vec2d, size: Vec2d, fill: &Fill, rotation: f64) {
        let dest = Rectangle::new(
            position.x as f32,
            position.y as f32,
            size.x as f32,
            size.y as f32,
        );
        self.fill_rect(dest, fill, rotation);
    }

    fn draw_circle(&mut self, center: Vec2d, radius: f64, fill: &Fill, rotation: f64) {
        match fill {
            Fill::Color(color) => self.d.draw_circle_v(
                Vector2::new(center.x as f32, center.y as f32),
                radius as f32,
                to_rl(*color),
            ),
            Fill::Image(_) => {
                let side = (radius * 2.0) as f32;
                let dest = Rectangle::new(
                    (center.x - radius) as f32,
                    (center.y - radius) as f32,
                    side,
                    side,
                );
                self.fill_rect(dest, fill, rotation);
            }
        }
    }

    fn draw_text(&mut self, text: &str, position: Vec2d, font_size: f64, color: ShapeColor) {
        self.d.draw_text(
            text,
            position.x as i32,
            position.y as i32,
            font_size as i32,
            to_rl(color),
        );
    }
}

const KEY_MAP: [(KeyboardKey, Key); 7] = [
    (KeyboardKey::KEY_LEFT, Key::Left),
    (KeyboardKey::KEY_RIGHT, Key::Right),
    (KeyboardKey::KEY_UP, Key::Up),
    (KeyboardKey::KEY_DOWN, Key::Down),
    (KeyboardKey::KEY_SPACE, Key::Space),
    (KeyboardKey::KEY_ENTER, Key::Enter),
    (KeyboardKey::KEY_ESCAPE, Key::Escape),
];

const LETTERS: [KeyboardKey; 26] = [
    KeyboardKey::KEY_A,
    KeyboardKey::KEY_B,
    KeyboardKey::KEY_C,
    KeyboardKey::KEY_D,
    KeyboardKey::KEY_E,
    KeyboardKey::KEY_F,
    KeyboardKey::KEY_G,
    KeyboardKey::KEY_H,
    KeyboardKey::KEY_I,
    KeyboardKey::KEY_J,
    KeyboardKey::KEY_K,
    KeyboardKey::KEY_L,
    KeyboardKey::KEY_M,
    KeyboardKey::KEY_N,
    KeyboardKey::KEY_O,
    KeyboardKey::KEY_P,
    KeyboardKey::KEY_Q,
    KeyboardKey::KEY_R,
    KeyboardKey::KEY_S,
    KeyboardKey::KEY_T,
    KeyboardKey::KEY_U,
    KeyboardKey::KEY_V,
    KeyboardKey::KEY_W,
    KeyboardKey::KEY_X,
    KeyboardKey::KEY_Y,
    KeyboardKey::KEY_Z,
];

const BUTTON_MAP: [(raylib::consts::MouseButton, EngineButton); 3] = [
    (raylib::consts::MouseButton::MOUSE_BUTTON_LEFT, EngineButton::Left),
    (raylib::consts::MouseButton::MOUSE_BUTTON_RIGHT, EngineButton::Right),
    (raylib::consts::MouseButton::MOUSE_BUTTON_MIDDLE, EngineButton::Middle),
];

/// Keys and buttons held right now, plus the mouse position.
pub fn poll_input(rl: &RaylibHandle) -> (Vec<Key>, Vec<EngineButton>, Vec2d) {
    let mut keys: Vec<Key> = KEY_MAP
        .iter()
        .filter(|(rl_key, _)| rl.is_key_down(*rl_key))
        .map(|(_, key)| *key)
        .collect();
    keys.extend(
        LETTERS
            .iter()
            .zip('a'..='z')
            .filter(|(rl_key, _)| rl.is_key_down(**rl_key))
            .map(|(_, c)| Key::char(c)),
    );
    let buttons = BUTTON_MAP
        .iter()
        .filter(|(rl_button, _)| rl.is_mouse_button_down(*rl_button))
        .map(|(_, button)| *button)
        .collect();
    let mouse = rl.get_mouse_position();
    (keys, buttons, Vec2d::new(mouse.x as f64, mouse.y as f64))
}

/// Decode audio data in any format raylib supports. `file_type` is the
/// extension with its dot, e.g. `".ogg"`. Needs no audio device.
pub fn decode_wave(file_type: &str, bytes: &[u8]) -> Result<AudioClip> {
    let c_type = CString::new(file_type)
        .map_err(|_| EngineError::Decode(format!("bad file type '{}'", file_type)))?;
    let size = i32::try_from(bytes.len())
        .map_err(|_| EngineError::Decode(format!("{} data too large", file_type)))?;

    let wave = unsafe { raylib::ffi::LoadWaveFromMemory(c_type.as_ptr(), bytes.as_ptr(), size) };
    if wave.data.is_null() || wave.frameCount == 0 || wave.channels == 0 {
        unsafe { raylib::ffi::UnloadWave(wave) };
        return Err(EngineError::Decode(format!(
            "raylib could not decode {} data",
            file_type
        )));
    }

    let count = wave.frameCount as usize * wave.channels as usize;
    let samples = unsafe {
        let raw = raylib::ffi::LoadWaveSamples(wave);
        let samples = if raw.is_null() {
            Vec::new()
        } else {
            std::slice::from_raw_parts(raw, count).to_vec()
        };
        raylib::ffi::UnloadWaveSamples(raw);
        raylib::ffi::UnloadWave(wave);
        samples
    };
    if samples.is_empty() {
        return Err(EngineError::Decode(format!("{} data has no samples", file_type)));
    }
    Ok(AudioClip::from_samples(
        samples,
        wave.sampleRate,
        wave.channels as u16,
    ))
}

/// Mixed blocks go out through a raylib audio stream, 16-bit mono.
pub struct RaylibSink<'a> {
    stream: AudioStream<'a>,
    sample_rate: u32,
    pcm: Vec<i16>,
}

impl<'a> RaylibSink<'a> {
    pub fn new(device: &'a RaylibAudio, sample_rate: u32, block_frames: usize) -> Self {
        device.set_audio_stream_buffer_size_default(block_frames as i32);
        let stream = device.new_audio_stream(sample_rate, 16, 1);
        stream.play();
        Self {
            stream,
            sample_rate,
            pcm: Vec::with_capacity(block_frames),
        }
    }
}

impl AudioSink for RaylibSink<'_> {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn ready(&mut self) -> bool {
        self.stream.is_processed()
    }

    fn write(&mut self, block: &[f32]) {
        self.pcm.clear();
        self.pcm.extend(
            block
                .iter()
                .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
        );
        self.stream.update(&self.pcm);
    }
}

/// Audio thread writing to the default output device. Falls back to a
/// silent sink when the device cannot be opened.
pub fn raylib_audio(sample_rate: u32) -> Result<AudioManager> {
    AudioManager::spawn(move |rx_cmd, tx_msg| match RaylibAudio::init_audio_device() {
        Ok(device) => {
            let block_frames = (sample_rate / 100).max(1) as usize;
            audio_thread(RaylibSink::new(&device, sample_rate, block_frames), rx_cmd, tx_msg);
        }
        Err(e) => {
            error!("Failed to initialize audio device: {}", e);
            warn!("Continuing without sound");
            audio_thread(NullSink::new(sample_rate), rx_cmd, tx_msg);
        }
    })
}

/// Open a window sized to the world and run until it is closed.
///
/// `setup` runs once after the window exists, so it can load textures.
pub fn run_windowed(
    world: &mut World,
    setup: impl FnOnce(&mut RaylibHandle, &RaylibThread, &mut TextureStore),
) {
    let config = world.config().clone();
    let (mut rl, thread) = raylib::init()
        .size(config.width as i32, config.height as i32)
        .title(&config.title)
        .build();
    rl.set_target_fps(config.target_fps);
    // Escape is game input, not a quit key.
    rl.set_exit_key(None);

    let mut textures = TextureStore::default();
    setup(&mut rl, &thread, &mut textures);

    while !rl.window_should_close() {
        let (keys, buttons, mouse) = poll_input(&rl);
        world.set_input(keys, buttons, mouse);
        world.tick(rl.get_frame_time() as f64);

        let mut d = rl.begin_drawing(&thread);
        let mut surface = RaylibSurface::new(&mut d, &textures);
        world.render(&mut surface);
    }
    info!("Window closed");
}
