//! Long-lived data used by the world and its systems.
//!
//! Overview
//! - `assets` – byte sources audio is loaded from
//! - `audio` – sound/music registries bridged to the background audio thread
//! - `audioclip` – decoded sample buffers, WAV decoding and test tones
//! - `gameconfig` – world configuration loaded from INI files
//! - `input` – per-frame keyboard and mouse snapshot
//! - `levelcontext` – state owned by the current level
//! - `physics` – gravity, air resistance and world limits
//! - `worldtime` – simulation time and delta
pub mod assets;
pub mod audio;
pub mod audioclip;
pub mod gameconfig;
pub mod input;
pub mod levelcontext;
pub mod physics;
pub mod worldtime;
