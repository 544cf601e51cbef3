//! Engine systems.
//!
//! This module groups the systems that advance the simulation and the code
//! that runs next to it: integration, collision, the audio thread and the
//! render pass.

pub mod audio;
pub mod collision;
pub mod movement;
pub mod render;
