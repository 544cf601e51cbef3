//! Life Engine library.
//!
//! A small 2D platformer engine: rectangles and circles simulated with
//! gravity and impulse-based collision, tile-map levels driven by a level
//! state machine, an event bus, a threaded audio mixer and timer-driven
//! sprite animations.
//!
//! Shapes live in an ECS world; [`world::World`] wraps it together with the
//! levels, events and audio and is the main entry point.

pub mod components;
pub mod demo;
pub mod error;
pub mod events;
pub mod level;
pub mod math;
#[cfg(feature = "raylib")]
pub mod raylib_backend;
pub mod resources;
pub mod systems;
pub mod world;

pub use error::{EngineError, Result};
pub use math::Vector2;
pub use world::World;
