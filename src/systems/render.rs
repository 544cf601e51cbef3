//! Drawing of the shape collection.
//!
//! The engine does not own a window. A host hands the world something that
//! implements [`Surface`] and [`render_pass`] draws the background and every
//! shape into it, lowest [`DrawOrder`] first. Animated patterns are resolved
//! to the frame showing right now, so the surface only ever sees a solid
//! color or an image key.

use bevy_ecs::prelude::*;

use crate::components::draworder::DrawOrder;
use crate::components::shape::{Color, Pattern, Shape, ShapeKind};
use crate::math::Vector2;

/// What a shape is filled with at the moment it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Color(Color),
    Image(String),
}

impl From<&Pattern> for Fill {
    fn from(pattern: &Pattern) -> Self {
        match pattern {
            Pattern::Color(color) => Fill::Color(*color),
            // An animation with no frames draws nothing visible.
            _ => pattern
                .image_key()
                .map_or(Fill::Color(Color::rgba(0, 0, 0, 0)), Fill::Image),
        }
    }
}

/// Drawing backend.
pub trait Surface {
    fn clear(&mut self, background: Color);

    /// `position` is the top-left corner; `rotation` is in radians.
    fn draw_rectangle(&mut self, position: Vector2, size: Vector2, fill: &Fill, rotation: f64);

    fn draw_circle(&mut self, center: Vector2, radius: f64, fill: &Fill, rotation: f64);

    fn draw_text(&mut self, text: &str, position: Vector2, font_size: f64, color: Color);
}

/// Clear to `background` and draw all shapes in draw order.
pub fn render_pass(world: &mut World, background: Color, surface: &mut dyn Surface) {
    surface.clear(background);

    let mut to_draw: Vec<(DrawOrder, ShapeKind, Vector2, Fill, f64)> = {
        let mut q = world.query::<(&Shape, &DrawOrder)>();
        q.iter(world)
            .map(|(shape, order)| {
                (
                    *order,
                    shape.kind(),
                    shape.position,
                    Fill::from(&shape.pattern),
                    shape.rotation,
                )
            })
            .collect()
    };

    to_draw.sort_by_key(|(order, ..)| *order);

    for (_order, kind, position, fill, rotation) in to_draw.iter() {
        match *kind {
            ShapeKind::Rectangle { width, height } => {
                surface.draw_rectangle(*position, Vector2::new(width, height), fill, *rotation)
            }
            ShapeKind::Circle { radius } => surface.draw_circle(*position, radius, fill, *rotation),
        }
    }
}

/// One call received by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(Color),
    Rectangle { position: Vector2, size: Vector2, fill: Fill },
    Circle { center: Vector2, radius: f64, fill: Fill },
    Text { text: String, position: Vector2 },
}

/// Surface that remembers what it was asked to draw since the last clear.
///
/// Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
    pub frames: u64,
}

impl Surface for RecordingSurface {
    fn clear(&mut self, background: Color) {
        self.calls.clear();
        self.calls.push(DrawCall::Clear(background));
        self.frames += 1;
    }

    fn draw_rectangle(&mut self, position: Vector2, size: Vector2, fill: &Fill, _rotation: f64) {
        self.calls.push(DrawCall::Rectangle {
            position,
            size,
            fill: fill.clone(),
        });
    }

    fn draw_circle(&mut self, center: Vector2, radius: f64, fill: &Fill, _rotation: f64) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            fill: fill.clone(),
        });
    }

    fn draw_text(&mut self, text: &str, position: Vector2, _font_size: f64, _color: Color) {
        self.calls.push(DrawCall::Text {
            text: text.to_string(),
            position,
        });
    }
}
