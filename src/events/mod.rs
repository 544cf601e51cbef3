//! Messages passed between parts of the engine.
//!
//! - [`audio`] – commands to and reports from the audio thread
//! - [`bus`] – world events and their subscribers
//! - [`collision`] – what collision callbacks see and the commands they queue

pub mod audio;
pub mod bus;
pub mod collision;
