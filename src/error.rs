//! Engine error type.
//!
//! Only resource loading and explicit level switching can fail. Physics and
//! collision are total over their inputs, and playback or animation timer
//! problems are logged on their own threads instead of being returned.

use thiserror::Error;

/// Errors surfaced by [`World`](crate::world::World) and its subsystems.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A sound, music track or asset was requested but never loaded.
    #[error("not found: {0}")]
    NotFound(String),

    /// An explicit level switch named an index outside the loaded levels.
    #[error("level index {index} out of range (0..{len})")]
    OutOfRange { index: usize, len: usize },

    /// An audio resource could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Reading an asset failed for a reason other than it being missing.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be read or written.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
