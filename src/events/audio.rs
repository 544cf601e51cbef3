use std::sync::Arc;

use crate::resources::audioclip::AudioClip;

/// Commands sent *to* the audio thread.
///
/// Clips travel with the command, so the audio thread never touches the
/// registries owned by [`AudioManager`](crate::resources::audio::AudioManager).
#[derive(Debug, Clone)]
pub enum AudioCmd {
    PlayFx { id: String, clip: Arc<AudioClip> },
    PlayMusic {
        id: String,
        clip: Arc<AudioClip>,
        looped: bool,
    },
    StopMusic { id: String },
    VolumeMusic { id: String, vol: f32 },
    StopAll,
    Shutdown,
}

/// Events sent *back* from the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioMessage {
    FxPlayStarted { id: String },
    FxFinished { id: String },
    /// Also sent when a looped track restarts.
    MusicPlayStarted { id: String },
    MusicStopped { id: String },
    MusicFinished { id: String }, // reached end for non looping
    MusicVolumeChanged { id: String, vol: f32 },
}
