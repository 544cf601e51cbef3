//! Integration of physics shapes.
//!
//! Every shape with `physics` set is accelerated by gravity, slowed by air
//! resistance and moved by its velocity (semi-implicit Euler). Shapes without
//! `physics` are never touched here; only explicit setters move them.
//!
//! When limits are on, shapes are stopped at the world rectangle: the
//! position is clamped so the whole shape stays inside and the velocity
//! component pointing out of the world is zeroed.

use bevy_ecs::prelude::*;

use crate::components::shape::{Shape, ShapeKind};
use crate::math::Vector2;
use crate::resources::physics::PhysicsSettings;
use crate::resources::worldtime::WorldTime;

pub fn movement_system(
    mut query: Query<&mut Shape>,
    time: Res<WorldTime>,
    physics: Res<PhysicsSettings>,
) {
    let dt = time.delta;
    if dt <= 0.0 {
        return;
    }
    for mut shape in query.iter_mut() {
        if !shape.physics {
            continue;
        }
        integrate(&mut shape, &physics, dt);
        if physics.has_limits {
            clamp_to_limits(&mut shape, physics.width, physics.height);
        }
    }
}

fn integrate(shape: &mut Shape, physics: &PhysicsSettings, dt: f64) {
    let mut velocity = shape.velocity + physics.gravity * dt;
    // Air resistance never reverses motion, however large dt gets.
    velocity *= (1.0 - physics.air_resistance * dt).max(0.0);
    shape.velocity = velocity;
    shape.position += velocity * dt;

    if shape.is_circle() && !shape.rotation_lock {
        shape.rotation += shape.angular_velocity * dt;
    }
}

/// Stop policy: clamp inside `[0, width] x [0, height]`, zero outward speed.
pub fn clamp_to_limits(shape: &mut Shape, width: f64, height: f64) {
    // Offset from `position` to the shape's top-left corner.
    let (offset, size) = match shape.kind() {
        ShapeKind::Rectangle { width, height } => (Vector2::ZERO, Vector2::new(width, height)),
        ShapeKind::Circle { radius } => (Vector2::splat(-radius), Vector2::splat(radius * 2.0)),
    };
    let min = -offset;
    let max = Vector2::new(width - size.x, height - size.y) - offset;

    let position = shape.position;
    if position.x < min.x {
        shape.position.x = min.x;
        shape.velocity.x = shape.velocity.x.max(0.0);
    } else if position.x > max.x {
        shape.position.x = max.x.max(min.x);
        shape.velocity.x = shape.velocity.x.min(0.0);
    }
    if position.y < min.y {
        shape.position.y = min.y;
        shape.velocity.y = shape.velocity.y.max(0.0);
    } else if position.y > max.y {
        shape.position.y = max.y.max(min.y);
        shape.velocity.y = shape.velocity.y.min(0.0);
    }
}
