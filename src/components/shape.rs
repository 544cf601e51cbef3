//! The engine's physics/visual entity.
//!
//! A [`Shape`] is an axis-aligned rectangle or a circle. Two independent flags
//! decide how it takes part in the simulation:
//!
//! - `physics` - the movement system integrates gravity, air resistance and
//!   velocity into its position.
//! - `is_body` - the collision system considers it. A pair of shapes is only
//!   tested when at least one of them is a body.
//!
//! That gives visual-only shapes (neither flag), static obstacles
//! (`is_body` only, or no flag at all when paired with a body) and fully
//! dynamic shapes (both flags). Only dynamic shapes are ever moved by the
//! simulation; everything else changes position through the explicit setters.
//!
//! Shapes live as entities in the world's ECS storage and are referred to by
//! [`ShapeId`], a generational handle that stays safe to hold after the shape
//! is gone.

use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};

use crate::components::animation::FrameCursor;
use crate::events::collision::CollisionCtx;
use crate::math::Vector2;

/// Stable handle to a registered shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(Entity);

impl ShapeId {
    pub fn from_entity(entity: Entity) -> Self {
        Self(entity)
    }

    /// Underlying ECS entity.
    pub fn entity(&self) -> Entity {
        self.0
    }
}

/// Callback invoked with the *other* shape when this shape touches it.
///
/// Callbacks run after the collision pass, once per contact, and act on the
/// world through the deferred commands in [`CollisionCtx`].
pub type CollisionCallback = Arc<dyn Fn(&mut CollisionCtx<'_>, ShapeId) + Send + Sync>;

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    pub const GOLD: Color = Color::rgba(255, 215, 0, 255);
    pub const LIGHT_GRAY: Color = Color::rgba(200, 200, 200, 255);
    pub const ROYAL_BLUE: Color = Color::rgba(65, 105, 225, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// How a shape is filled when drawn.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Solid fill.
    Color(Color),
    /// Static image, by texture key.
    Image(String),
    /// Image whose frame is advanced by a running
    /// [`Animation`](crate::components::animation::Animation).
    Animated(FrameCursor),
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::Color(Color::BLACK)
    }
}

impl Pattern {
    /// Texture key currently shown, if the pattern is image based.
    pub fn image_key(&self) -> Option<String> {
        match self {
            Pattern::Color(_) => None,
            Pattern::Image(key) => Some(key.clone()),
            Pattern::Animated(cursor) => cursor.current_key().map(str::to_owned),
        }
    }
}

/// Requested geometry in [`ShapeProps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeType {
    #[default]
    Rectangle,
    Circle,
}

/// Geometry of a constructed shape.
///
/// Rectangles are positioned by their top-left corner, circles by their
/// center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Rectangle { width: f64, height: f64 },
    Circle { radius: f64 },
}

/// Construction record for [`Shape::new`].
///
/// Unset numbers are zero, unset flags are false, and the pattern defaults to
/// a solid color.
#[derive(Clone, Default)]
pub struct ShapeProps {
    pub name: Option<String>,
    pub tag: Option<String>,
    pub shape_type: ShapeType,
    pub pattern: Pattern,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub velocity: Vector2,
    pub mass: f64,
    pub friction: f64,
    pub rebound: f64,
    pub rotation_lock: bool,
    pub physics: bool,
    pub is_body: bool,
    pub on_collision: Option<CollisionCallback>,
}

#[derive(Component, Clone)]
pub struct Shape {
    kind: ShapeKind,
    pub pattern: Pattern,
    /// Top-left for rectangles, center for circles.
    pub position: Vector2,
    pub velocity: Vector2,
    pub mass: f64,
    pub friction: f64,
    /// Restitution: 0 is fully inelastic, 1 fully elastic.
    pub rebound: f64,
    /// Cosmetic rotation in radians. Collision geometry stays axis-aligned.
    pub rotation: f64,
    pub angular_velocity: f64,
    pub rotation_lock: bool,
    pub physics: bool,
    pub is_body: bool,
    pub name: Option<String>,
    pub tag: Option<String>,
    on_collision: Option<CollisionCallback>,
}

impl Shape {
    pub fn new(props: ShapeProps) -> Self {
        let kind = match props.shape_type {
            ShapeType::Rectangle => ShapeKind::Rectangle {
                width: non_negative(props.width, "width"),
                height: non_negative(props.height, "height"),
            },
            ShapeType::Circle => ShapeKind::Circle {
                radius: non_negative(props.radius, "radius"),
            },
        };
        Self {
            kind,
            pattern: props.pattern,
            position: Vector2::new(props.x, props.y),
            velocity: props.velocity,
            mass: props.mass,
            friction: props.friction,
            rebound: props.rebound,
            rotation: 0.0,
            angular_velocity: 0.0,
            rotation_lock: props.rotation_lock,
            physics: props.physics,
            is_body: props.is_body,
            name: props.name,
            tag: props.tag,
            on_collision: props.on_collision,
        }
    }

    /// Static, visual-only rectangle.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ShapeProps {
            shape_type: ShapeType::Rectangle,
            x,
            y,
            width,
            height,
            ..Default::default()
        })
    }

    /// Static, visual-only circle centered at `(cx, cy)`.
    pub fn circle(cx: f64, cy: f64, radius: f64) -> Self {
        Self::new(ShapeProps {
            shape_type: ShapeType::Circle,
            x: cx,
            y: cy,
            radius,
            ..Default::default()
        })
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn is_circle(&self) -> bool {
        matches!(self.kind, ShapeKind::Circle { .. })
    }

    /// Move horizontally without going through physics.
    pub fn set_x(&mut self, x: f64) {
        self.position.x = x;
    }

    /// Move vertically without going through physics.
    pub fn set_y(&mut self, y: f64) {
        self.position.y = y;
    }

    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
    }

    pub fn set_velocity(&mut self, velocity: Vector2) {
        self.velocity = velocity;
    }

    /// Bounding box size.
    pub fn size(&self) -> Vector2 {
        match self.kind {
            ShapeKind::Rectangle { width, height } => Vector2::new(width, height),
            ShapeKind::Circle { radius } => Vector2::splat(radius * 2.0),
        }
    }

    pub fn center(&self) -> Vector2 {
        match self.kind {
            ShapeKind::Rectangle { width, height } => {
                self.position + Vector2::new(width * 0.5, height * 0.5)
            }
            ShapeKind::Circle { .. } => self.position,
        }
    }

    /// Returns (min, max) of the bounding box in world space.
    pub fn aabb(&self) -> (Vector2, Vector2) {
        match self.kind {
            ShapeKind::Rectangle { width, height } => {
                (self.position, self.position + Vector2::new(width, height))
            }
            ShapeKind::Circle { radius } => (
                self.position - Vector2::splat(radius),
                self.position + Vector2::splat(radius),
            ),
        }
    }

    /// Zero-area shapes are accepted but never collide.
    pub fn is_degenerate(&self) -> bool {
        match self.kind {
            ShapeKind::Rectangle { width, height } => width <= 0.0 || height <= 0.0,
            ShapeKind::Circle { radius } => radius <= 0.0,
        }
    }

    /// Moved by integration and collision response.
    pub fn is_dynamic(&self) -> bool {
        self.physics && self.is_body
    }

    /// Zero for anything the simulation must not move. A dynamic shape with
    /// no mass set behaves as unit mass.
    pub fn inverse_mass(&self) -> f64 {
        if !self.is_dynamic() {
            0.0
        } else if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            1.0
        }
    }

    /// Inverse rotational inertia of a solid disc; zero for rectangles and
    /// locked shapes.
    pub fn inverse_inertia(&self) -> f64 {
        match self.kind {
            ShapeKind::Circle { radius } if !self.rotation_lock && radius > 0.0 => {
                let inv_mass = self.inverse_mass();
                if inv_mass == 0.0 {
                    0.0
                } else {
                    2.0 * inv_mass / (radius * radius)
                }
            }
            _ => 0.0,
        }
    }

    pub fn with_on_collision(
        mut self,
        callback: impl Fn(&mut CollisionCtx<'_>, ShapeId) + Send + Sync + 'static,
    ) -> Self {
        self.on_collision = Some(Arc::new(callback));
        self
    }

    pub fn on_collision(&self) -> Option<&CollisionCallback> {
        self.on_collision.as_ref()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("physics", &self.physics)
            .field("is_body", &self.is_body)
            .field("on_collision", &self.on_collision.is_some())
            .finish()
    }
}

fn non_negative(value: f64, what: &str) -> f64 {
    if value < 0.0 || value.is_nan() {
        log::warn!("Shape {what} {value} clamped to 0");
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props_default_is_static_colored_rectangle() {
        let shape = Shape::new(ShapeProps::default());
        assert_eq!(
            shape.kind(),
            ShapeKind::Rectangle {
                width: 0.0,
                height: 0.0
            }
        );
        assert!(!shape.physics);
        assert!(!shape.is_body);
        assert!(!shape.rotation_lock);
        assert!(matches!(shape.pattern, Pattern::Color(_)));
        assert!(shape.on_collision().is_none());
        assert!(shape.is_degenerate());
    }

    #[test]
    fn test_negative_dimensions_are_clamped() {
        let shape = Shape::new(ShapeProps {
            shape_type: ShapeType::Circle,
            radius: -3.0,
            ..Default::default()
        });
        assert_eq!(shape.kind(), ShapeKind::Circle { radius: 0.0 });
    }

    #[test]
    fn test_setters_move_static_shape() {
        let mut shape = Shape::rectangle(0.0, 0.0, 10.0, 10.0);
        shape.set_x(5.0);
        shape.set_y(7.0);
        assert_eq!(shape.position, Vector2::new(5.0, 7.0));
        assert_eq!(shape.center(), Vector2::new(10.0, 12.0));
    }

    #[test]
    fn test_circle_aabb_is_centered() {
        let shape = Shape::circle(10.0, 20.0, 5.0);
        let (min, max) = shape.aabb();
        assert_eq!(min, Vector2::new(5.0, 15.0));
        assert_eq!(max, Vector2::new(15.0, 25.0));
        assert_eq!(shape.size(), Vector2::new(10.0, 10.0));
    }

    #[test]
    fn test_inverse_mass_only_for_dynamic_shapes() {
        let mut shape = Shape::circle(0.0, 0.0, 1.0);
        assert_eq!(shape.inverse_mass(), 0.0);
        shape.physics = true;
        assert_eq!(shape.inverse_mass(), 0.0);
        shape.is_body = true;
        assert_eq!(shape.inverse_mass(), 1.0);
        shape.mass = 4.0;
        assert!((shape.inverse_mass() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_lock_removes_inertia() {
        let mut shape = Shape::new(ShapeProps {
            shape_type: ShapeType::Circle,
            radius: 2.0,
            physics: true,
            is_body: true,
            ..Default::default()
        });
        assert!(shape.inverse_inertia() > 0.0);
        shape.rotation_lock = true;
        assert_eq!(shape.inverse_inertia(), 0.0);
    }
}
