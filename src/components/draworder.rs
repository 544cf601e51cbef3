//! Draw order component.
//!
//! Every shape gets a [`DrawOrder`] when it is registered. Physics ignores it;
//! the render pass sorts by it so shapes are painted in registration order.

use bevy_ecs::prelude::Component;

/// Registration sequence number. Lower values are drawn first.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DrawOrder(pub u64);
