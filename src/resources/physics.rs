//! World-level physics constants.

use bevy_ecs::prelude::Resource;

use crate::math::Vector2;

/// Constants read by the movement system each tick.
#[derive(Resource, Debug, Clone, Copy)]
pub struct PhysicsSettings {
    /// Acceleration applied to every physics shape, units per second squared.
    pub gravity: Vector2,
    /// Fraction of velocity removed per second.
    pub air_resistance: f64,
    /// Clamp dynamic shapes inside `[0, width] x [0, height]`.
    pub has_limits: bool,
    pub width: f64,
    pub height: f64,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vector2::new(0.0, 980.0),
            air_resistance: 0.0,
            has_limits: false,
            width: 1920.0,
            height: 1080.0,
        }
    }
}
