//! Life Engine demo entry point.
//!
//! Runs the demo levels from [`lifeengine::demo`] either in a raylib window
//! (with the `raylib` feature) or headless, stepping a fixed number of frames
//! against a recording surface and a silent audio sink.
//!
//! # Running
//!
//! ```sh
//! cargo run --release --features raylib
//! cargo run --release -- --headless --frames 600
//! ```

// Do not create console on Windows
#![cfg_attr(
    all(target_os = "windows", feature = "raylib"),
    windows_subsystem = "windows"
)]

use std::path::PathBuf;

use clap::Parser;
use lifeengine::demo;
use lifeengine::resources::gameconfig::{DEFAULT_CONFIG_PATH, WorldConfig};
use lifeengine::systems::render::RecordingSurface;
use lifeengine::{Result, World};

/// Life Engine 2D
#[derive(Parser)]
#[command(version, about = "A small 2D platformer engine with a two-level demo.")]
struct Cli {
    /// INI file to read world settings from. Missing files fall back to defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Run without a window or audio device.
    #[arg(long)]
    headless: bool,

    /// Frames to simulate in headless mode.
    #[arg(long, default_value_t = 600)]
    frames: u64,
}

fn load_config(path: Option<PathBuf>) -> WorldConfig {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    match WorldConfig::load_from_file(&path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            if explicit {
                log::warn!("Could not load {}: {}; using defaults", path.display(), e);
            } else {
                log::debug!("No config at {}; using defaults", path.display());
            }
            WorldConfig::default()
        }
    }
}

fn run_headless(config: WorldConfig, frames: u64) -> Result<()> {
    let dt = 1.0 / config.target_fps.max(1) as f64;
    let mut world = World::new(config)?;
    demo::install(&mut world)?;

    let mut surface = RecordingSurface::default();
    for _ in 0..frames {
        world.tick(dt);
        world.render(&mut surface);
    }
    log::info!(
        "Headless run finished: {} frames, level {:?}, {} shapes, {} draw calls in last frame",
        surface.frames,
        world.current_level_name(),
        world.shape_count(),
        surface.calls.len()
    );
    Ok(())
}

#[cfg(feature = "raylib")]
fn run_window(config: WorldConfig) -> Result<()> {
    use lifeengine::raylib_backend::{raylib_audio, run_windowed};

    let audio = raylib_audio(config.sample_rate)?;
    let mut world = World::with_audio(config, audio);
    demo::install(&mut world)?;
    run_windowed(&mut world, |_, _, _| {});
    Ok(())
}

#[cfg(not(feature = "raylib"))]
fn run_window(config: WorldConfig) -> Result<()> {
    log::warn!("Built without the `raylib` feature; running headless");
    run_headless(config, 600)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config);

    if cli.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    log::info!("Hello, world! This is the Life Engine!");
    let outcome = if cli.headless {
        run_headless(config, cli.frames)
    } else {
        run_window(config)
    };
    if let Err(e) = outcome {
        log::error!("{e}");
        std::process::exit(1);
    }
}
