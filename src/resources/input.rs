//! Per-frame input snapshot.
//!
//! The engine does not poll devices itself. The host (the raylib backend, a
//! test, a replay) hands the world the set of keys and mouse buttons currently
//! held with [`World::set_input`](crate::world::World::set_input); the
//! snapshot derives which ones were just pressed or released compared to the
//! previous frame.

use rustc_hash::FxHashSet;

use crate::math::Vector2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Escape,
    /// Letter or digit key, stored uppercase.
    Char(char),
}

impl Key {
    /// Letter/digit key; letters are case-insensitive.
    pub fn char(c: char) -> Self {
        Key::Char(c.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Input state for the current frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys_down: FxHashSet<Key>,
    keys_pressed: FxHashSet<Key>,
    keys_released: FxHashSet<Key>,
    buttons_down: FxHashSet<MouseButton>,
    buttons_pressed: FxHashSet<MouseButton>,
    buttons_released: FxHashSet<MouseButton>,
    pub mouse_position: Vector2,
}

impl InputState {
    /// Replace the held keys/buttons and derive this frame's transitions.
    pub fn update(
        &mut self,
        keys: impl IntoIterator<Item = Key>,
        buttons: impl IntoIterator<Item = MouseButton>,
        mouse_position: Vector2,
    ) {
        let keys: FxHashSet<Key> = keys.into_iter().collect();
        self.keys_pressed = keys.difference(&self.keys_down).copied().collect();
        self.keys_released = self.keys_down.difference(&keys).copied().collect();
        self.keys_down = keys;

        let buttons: FxHashSet<MouseButton> = buttons.into_iter().collect();
        self.buttons_pressed = buttons.difference(&self.buttons_down).copied().collect();
        self.buttons_released = self.buttons_down.difference(&buttons).copied().collect();
        self.buttons_down = buttons;

        self.mouse_position = mouse_position;
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
    pub fn is_key_just_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }
    pub fn is_key_just_released(&self, key: Key) -> bool {
        self.keys_released.contains(&key)
    }
    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }
    pub fn is_mouse_just_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    pub fn just_pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys_pressed.iter().copied()
    }
    pub fn just_released_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys_released.iter().copied()
    }
    pub fn just_pressed_buttons(&self) -> impl Iterator<Item = MouseButton> + '_ {
        self.buttons_pressed.iter().copied()
    }
    pub fn just_released_buttons(&self) -> impl Iterator<Item = MouseButton> + '_ {
        self.buttons_released.iter().copied()
    }
}
