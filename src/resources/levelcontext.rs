//! Per-level context.
//!
//! A [`LevelContext`] holds the mutable state a level needs between its
//! callbacks: the shapes it cares about (the player, a goal, ...), plain
//! values, flags, and the animations it started. The world owns exactly one
//! context, hands it to level callbacks through
//! [`World::context`](crate::world::World::context) and replaces it with a
//! fresh one on every level transition, so nothing leaks from one level into
//! the next.
//!
//! Dropping the context stops every animation it owns.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::components::animation::Animation;
use crate::components::shape::ShapeId;

#[derive(Debug, Default)]
pub struct LevelContext {
    /// Floating-point values addressed by string keys.
    pub scalars: FxHashMap<String, f64>,
    /// Integer values addressed by string keys.
    pub integers: FxHashMap<String, i32>,
    /// String values addressed by string keys.
    pub strings: FxHashMap<String, String>,
    /// Presence-only boolean flags; a key being present means "true".
    pub flags: FxHashSet<String>,
    /// Shapes of interest for the current level.
    pub shapes: FxHashMap<String, ShapeId>,
    animations: Vec<Animation>,
}

impl LevelContext {
    pub fn set_scalar(&mut self, key: impl Into<String>, value: f64) {
        self.scalars.insert(key.into(), value);
    }
    pub fn get_scalar(&self, key: &str) -> Option<f64> {
        self.scalars.get(key).copied()
    }
    pub fn set_integer(&mut self, key: impl Into<String>, value: i32) {
        self.integers.insert(key.into(), value);
    }
    pub fn get_integer(&self, key: &str) -> Option<i32> {
        self.integers.get(key).copied()
    }
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }
    pub fn get_string(&self, key: &str) -> Option<&String> {
        self.strings.get(key)
    }
    /// Mark a flag as present/true.
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.flags.insert(key.into());
    }
    /// Remove a flag (make it false/absent).
    pub fn clear_flag(&mut self, key: &str) {
        self.flags.remove(key);
    }
    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains(key)
    }
    pub fn set_shape(&mut self, key: impl Into<String>, shape: ShapeId) {
        self.shapes.insert(key.into(), shape);
    }
    pub fn get_shape(&self, key: &str) -> Option<ShapeId> {
        self.shapes.get(key).copied()
    }
    pub fn remove_shape(&mut self, key: &str) -> Option<ShapeId> {
        self.shapes.remove(key)
    }
    /// True when `shape` is the one stored under `key`.
    pub fn is_shape(&self, key: &str, shape: ShapeId) -> bool {
        self.get_shape(key) == Some(shape)
    }

    /// Take ownership of an animation for the lifetime of the level.
    pub fn add_animation(&mut self, animation: Animation) -> usize {
        self.animations.push(animation);
        self.animations.len() - 1
    }
    pub fn animation(&self, index: usize) -> Option<&Animation> {
        self.animations.get(index)
    }
    pub fn animation_mut(&mut self, index: usize) -> Option<&mut Animation> {
        self.animations.get_mut(index)
    }
    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::World;

    #[test]
    fn test_values_and_flags() {
        let mut cx = LevelContext::default();
        cx.set_scalar("speed", 2.5);
        cx.set_integer("coins", 3);
        cx.set_string("name", "one");
        cx.set_flag("won");
        assert_eq!(cx.get_scalar("speed"), Some(2.5));
        assert_eq!(cx.get_integer("coins"), Some(3));
        assert_eq!(cx.get_string("name").map(String::as_str), Some("one"));
        assert!(cx.has_flag("won"));
        cx.clear_flag("won");
        assert!(!cx.has_flag("won"));
        assert_eq!(cx.get_scalar("missing"), None);
    }

    #[test]
    fn test_shape_identity_lookup() {
        let mut world = World::new();
        let a = ShapeId::from_entity(world.spawn_empty().id());
        let b = ShapeId::from_entity(world.spawn_empty().id());
        let mut cx = LevelContext::default();
        cx.set_shape("player", a);
        assert!(cx.is_shape("player", a));
        assert!(!cx.is_shape("player", b));
        assert!(!cx.is_shape("goal", a));
        assert_eq!(cx.remove_shape("player"), Some(a));
        assert!(!cx.is_shape("player", a));
    }
}
