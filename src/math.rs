//! 2D vector primitive.
//!
//! The engine works in `f64` world units with the y axis pointing down.

pub use glam::DVec2 as Vector2;

/// Shorthand constructor.
#[inline]
pub fn vec2(x: f64, y: f64) -> Vector2 {
    Vector2::new(x, y)
}

/// Unit vector in the direction of `v`, or `fallback` when `v` is zero.
#[inline]
pub fn normalize_or(v: Vector2, fallback: Vector2) -> Vector2 {
    let len = v.length();
    if len > f64::EPSILON { v / len } else { fallback }
}
