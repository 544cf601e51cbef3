//! ECS components attached to shape entities.
//!
//! Submodules overview:
//! - [`animation`] – timer-driven frame playback shown through a shape's pattern
//! - [`draworder`] – registration sequence used as paint order
//! - [`persistent`] – marker for shapes that survive level transitions
//! - [`shape`] – the physics/visual entity itself, its handle and construction record

pub mod animation;
pub mod draworder;
pub mod persistent;
pub mod shape;
