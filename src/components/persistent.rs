//! Persistent shape marker component.
//!
//! Shapes with the [`Persistent`] component are kept when the world switches
//! levels. The world borders installed by
//! [`World::create_borders`](crate::world::World::create_borders) carry it;
//! everything a level's map or `init` creates does not.

use bevy_ecs::prelude::Component;

/// Tag component used to mark shapes that survive level transitions.
#[derive(Component, Clone, Debug)]
pub struct Persistent;
