//! World configuration.
//!
//! [`WorldConfig`] carries everything a [`World`](crate::world::World) is
//! built from: dimensions, physics constants, map cell size, background and
//! audio output rate. Defaults are safe to start with; an INI file can
//! override any subset of them.
//!
//! # Configuration File Format
//!
//! ```ini
//! [world]
//! width = 1920
//! height = 1080
//! title = Bought Nine Lifes
//! background = 65,105,225,255
//! cell_width = 64
//! cell_height = 64
//!
//! [physics]
//! gravity_x = 0
//! gravity_y = 980
//! air_resistance = 0
//! has_limits = false
//! paused = false
//!
//! [window]
//! target_fps = 60
//!
//! [audio]
//! sample_rate = 44100
//! ```

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use log::info;
use serde::{Deserialize, Serialize};

use crate::components::shape::Color;
use crate::error::{EngineError, Result};
use crate::math::Vector2;
use crate::resources::physics::PhysicsSettings;

const DEFAULT_WIDTH: f64 = 1920.0;
const DEFAULT_HEIGHT: f64 = 1080.0;
const DEFAULT_GRAVITY: (f64, f64) = (0.0, 980.0);
const DEFAULT_CELL_SIZE: f64 = 64.0;
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const DEFAULT_TITLE: &str = "Bought Nine Lifes";
pub const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub title: String,
    pub background: Color,
    pub gravity: Vector2,
    /// Fraction of velocity removed per second.
    pub air_resistance: f64,
    /// Keep dynamic shapes inside the world rectangle.
    pub has_limits: bool,
    pub paused: bool,
    /// Size of one map character in world units.
    pub cell_width: f64,
    pub cell_height: f64,
    pub target_fps: u32,
    /// Output rate of the audio mixer.
    pub sample_rate: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: DEFAULT_TITLE.to_string(),
            background: Color::ROYAL_BLUE,
            gravity: Vector2::new(DEFAULT_GRAVITY.0, DEFAULT_GRAVITY.1),
            air_resistance: 0.0,
            has_limits: false,
            paused: false,
            cell_width: DEFAULT_CELL_SIZE,
            cell_height: DEFAULT_CELL_SIZE,
            target_fps: DEFAULT_TARGET_FPS,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl WorldConfig {
    /// Load overrides from an INI file on top of the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path.as_ref())
            .map_err(|e| EngineError::Config(format!("Failed to load config file: {}", e)))?;
        let mut config = Self::default();
        config.apply(&ini)?;
        info!("Loaded config from {:?}: {:?}", path.as_ref(), config);
        Ok(config)
    }

    /// Same as [`load_from_file`](Self::load_from_file) for INI text.
    pub fn load_from_str(text: &str) -> Result<Self> {
        let mut ini = Ini::new();
        ini.read(text.to_string())
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;
        let mut config = Self::default();
        config.apply(&ini)?;
        Ok(config)
    }

    /// Write every setting to an INI file, creating it if needed.
    pub fn save_to_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let mut ini = Ini::new();
        ini.set("world", "width", Some(self.width.to_string()));
        ini.set("world", "height", Some(self.height.to_string()));
        ini.set("world", "title", Some(self.title.clone()));
        let Color { r, g, b, a } = self.background;
        ini.set("world", "background", Some(format!("{r},{g},{b},{a}")));
        ini.set("world", "cell_width", Some(self.cell_width.to_string()));
        ini.set("world", "cell_height", Some(self.cell_height.to_string()));
        ini.set("physics", "gravity_x", Some(self.gravity.x.to_string()));
        ini.set("physics", "gravity_y", Some(self.gravity.y.to_string()));
        ini.set("physics", "air_resistance", Some(self.air_resistance.to_string()));
        ini.set("physics", "has_limits", Some(self.has_limits.to_string()));
        ini.set("physics", "paused", Some(self.paused.to_string()));
        ini.set("window", "target_fps", Some(self.target_fps.to_string()));
        ini.set("audio", "sample_rate", Some(self.sample_rate.to_string()));
        ini.write(&path)
            .map_err(|e| EngineError::Config(format!("Failed to save config file: {}", e)))?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Physics constants derived from this configuration.
    pub fn physics(&self) -> PhysicsSettings {
        PhysicsSettings {
            gravity: self.gravity,
            air_resistance: self.air_resistance,
            has_limits: self.has_limits,
            width: self.width,
            height: self.height,
        }
    }

    fn apply(&mut self, ini: &Ini) -> Result<()> {
        // [world] section
        if let Some(width) = float(ini, "world", "width")? {
            self.width = width.max(0.0);
        }
        if let Some(height) = float(ini, "world", "height")? {
            self.height = height.max(0.0);
        }
        if let Some(title) = ini.get("world", "title") {
            self.title = title;
        }
        if let Some(background) = ini.get("world", "background") {
            self.background = parse_color(&background)?;
        }
        if let Some(cell_width) = float(ini, "world", "cell_width")? {
            self.cell_width = cell_width;
        }
        if let Some(cell_height) = float(ini, "world", "cell_height")? {
            self.cell_height = cell_height;
        }

        // [physics] section
        if let Some(x) = float(ini, "physics", "gravity_x")? {
            self.gravity.x = x;
        }
        if let Some(y) = float(ini, "physics", "gravity_y")? {
            self.gravity.y = y;
        }
        if let Some(air) = float(ini, "physics", "air_resistance")? {
            self.air_resistance = air;
        }
        if let Some(limits) = boolean(ini, "physics", "has_limits")? {
            self.has_limits = limits;
        }
        if let Some(paused) = boolean(ini, "physics", "paused")? {
            self.paused = paused;
        }

        // [window] / [audio] sections
        if let Some(fps) = uint(ini, "window", "target_fps")? {
            self.target_fps = fps as u32;
        }
        if let Some(rate) = uint(ini, "audio", "sample_rate")? {
            self.sample_rate = rate as u32;
        }
        Ok(())
    }
}

fn float(ini: &Ini, section: &str, key: &str) -> Result<Option<f64>> {
    ini.getfloat(section, key)
        .map_err(|e| EngineError::Config(format!("[{section}] {key}: {e}")))
}

fn boolean(ini: &Ini, section: &str, key: &str) -> Result<Option<bool>> {
    ini.getbool(section, key)
        .map_err(|e| EngineError::Config(format!("[{section}] {key}: {e}")))
}

fn uint(ini: &Ini, section: &str, key: &str) -> Result<Option<u64>> {
    ini.getuint(section, key)
        .map_err(|e| EngineError::Config(format!("[{section}] {key}: {e}")))
}

/// `r,g,b` or `r,g,b,a` with components in `0..=255`.
fn parse_color(text: &str) -> Result<Color> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|e| EngineError::Config(format!("bad color '{text}': {e}")))?;
    match parts.as_slice() {
        [r, g, b] => Ok(Color::rgba(*r, *g, *b, 255)),
        [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
        _ => Err(EngineError::Config(format!(
            "bad color '{text}': expected 3 or 4 components"
        ))),
    }
}
