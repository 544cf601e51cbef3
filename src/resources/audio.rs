//! Sound and music registry bridged to the background audio thread.
//!
//! [`AudioManager`] owns the audio thread (see [`crate::systems::audio`]) and
//! two registries of decoded clips keyed by name. Loading decodes on the
//! calling thread and inserts under a write lock; playing takes a read lock,
//! clones the clip's `Arc` and sends it to the audio thread without waiting.
//!
//! [`AudioPlayer`] is the cloneable, `Send + Sync` play-side handle. Hand it to
//! any thread that needs to trigger sounds.

use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::error::{EngineError, Result};
use crate::events::audio::{AudioCmd, AudioMessage};
use crate::resources::assets::AssetSource;
use crate::resources::audioclip::{AudioClip, TONE_SAMPLE_RATE};
use crate::systems::audio::{AudioSink, NullSink, audio_thread};

type ClipRegistry = RwLock<FxHashMap<String, Arc<AudioClip>>>;

struct AudioShared {
    sounds: ClipRegistry,
    music: ClipRegistry,
    tx_cmd: Sender<AudioCmd>,
}

impl AudioShared {
    fn lookup(registry: &ClipRegistry, name: &str) -> Option<Arc<AudioClip>> {
        registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn insert(registry: &ClipRegistry, name: String, clip: AudioClip) {
        let replaced = registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(clip))
            .is_some();
        if replaced {
            debug!("Replaced audio clip '{}'", name);
        }
    }

    /// Fire-and-forget: a closed channel means the audio thread is gone.
    fn send(&self, cmd: AudioCmd) {
        if let Err(e) = self.tx_cmd.send(cmd) {
            warn!("Audio thread not running, dropped {:?}", e.0);
        }
    }
}

/// Cloneable handle for triggering playback from any thread.
#[derive(Clone)]
pub struct AudioPlayer {
    shared: Arc<AudioShared>,
}

impl AudioPlayer {
    /// Start an independent playback of a loaded sound.
    ///
    /// Never blocks. Fails only when `name` was never loaded.
    pub fn play_sound(&self, name: &str) -> Result<()> {
        let clip = AudioShared::lookup(&self.shared.sounds, name)
            .ok_or_else(|| EngineError::NotFound(format!("sound '{}'", name)))?;
        self.shared.send(AudioCmd::PlayFx {
            id: name.to_string(),
            clip,
        });
        Ok(())
    }

    /// Start a music track from the beginning, replacing it if already playing.
    pub fn play_music(&self, name: &str, looped: bool) -> Result<()> {
        let clip = AudioShared::lookup(&self.shared.music, name)
            .ok_or_else(|| EngineError::NotFound(format!("music '{}'", name)))?;
        self.shared.send(AudioCmd::PlayMusic {
            id: name.to_string(),
            clip,
            looped,
        });
        Ok(())
    }

    pub fn stop_music(&self, name: &str) {
        self.shared.send(AudioCmd::StopMusic {
            id: name.to_string(),
        });
    }

    pub fn set_music_volume(&self, name: &str, vol: f32) {
        self.shared.send(AudioCmd::VolumeMusic {
            id: name.to_string(),
            vol,
        });
    }

    pub fn stop_all(&self) {
        self.shared.send(AudioCmd::StopAll);
    }

    pub fn has_sound(&self, name: &str) -> bool {
        AudioShared::lookup(&self.shared.sounds, name).is_some()
    }

    pub fn has_music(&self, name: &str) -> bool {
        AudioShared::lookup(&self.shared.music, name).is_some()
    }
}

pub struct AudioManager {
    player: AudioPlayer,
    rx_msg: Receiver<AudioMessage>,
    handle: Option<JoinHandle<()>>,
}

impl AudioManager {
    /// Spawn the audio thread running `run`.
    ///
    /// `run` owns the command receiver and the message sender; it is expected
    /// to end up in [`audio_thread`].
    pub fn spawn<F>(run: F) -> Result<Self>
    where
        F: FnOnce(Receiver<AudioCmd>, Sender<AudioMessage>) + Send + 'static,
    {
        let (tx_cmd, rx_cmd) = unbounded::<AudioCmd>();
        let (tx_msg, rx_msg) = unbounded::<AudioMessage>();

        let handle = std::thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || run(rx_cmd, tx_msg))?;

        Ok(Self {
            player: AudioPlayer {
                shared: Arc::new(AudioShared {
                    sounds: RwLock::default(),
                    music: RwLock::default(),
                    tx_cmd,
                }),
            },
            rx_msg,
            handle: Some(handle),
        })
    }

    /// Audio thread mixing into the sink built by `make_sink`, which runs on
    /// that thread.
    pub fn with_sink<S, F>(make_sink: F) -> Result<Self>
    where
        S: AudioSink,
        F: FnOnce() -> S + Send + 'static,
    {
        Self::spawn(move |rx_cmd, tx_msg| audio_thread(make_sink(), rx_cmd, tx_msg))
    }

    /// Audio thread mixing into a [`NullSink`]: everything works, nothing is heard.
    pub fn headless(sample_rate: u32) -> Result<Self> {
        Self::with_sink(move || NullSink::new(sample_rate))
    }

    /// Decode an asset and register it as a sound. Reloading a name
    /// replaces the previous clip. See [`AudioClip::decode`] for formats.
    pub fn load_sound(&self, name: &str, source: &dyn AssetSource, path: &str) -> Result<()> {
        let clip = AudioClip::decode(path, &source.read(path)?)?;
        info!("Loaded sound '{}' from '{}' ({:?})", name, path, clip.duration());
        AudioShared::insert(&self.player.shared.sounds, name.to_string(), clip);
        Ok(())
    }

    pub fn load_music(&self, name: &str, source: &dyn AssetSource, path: &str) -> Result<()> {
        let clip = AudioClip::decode(path, &source.read(path)?)?;
        info!("Loaded music '{}' from '{}' ({:?})", name, path, clip.duration());
        AudioShared::insert(&self.player.shared.music, name.to_string(), clip);
        Ok(())
    }

    /// Register an already decoded clip as a sound.
    pub fn insert_sound(&self, name: &str, clip: AudioClip) {
        AudioShared::insert(&self.player.shared.sounds, name.to_string(), clip);
    }

    /// Synthesize a sine tone and register it as a sound.
    pub fn create_test_tone(&self, name: &str, frequency: f64, duration: Duration) {
        let clip = AudioClip::sine(frequency, duration, TONE_SAMPLE_RATE);
        debug!("Created test tone '{}' at {} Hz for {:?}", name, frequency, duration);
        self.insert_sound(name, clip);
    }

    pub fn play_sound(&self, name: &str) -> Result<()> {
        self.player.play_sound(name)
    }

    pub fn play_music(&self, name: &str, looped: bool) -> Result<()> {
        self.player.play_music(name, looped)
    }

    pub fn stop_music(&self, name: &str) {
        self.player.stop_music(name);
    }

    pub fn player(&self) -> AudioPlayer {
        self.player.clone()
    }

    /// Non-blocking drain of everything the audio thread reported.
    pub fn poll_messages(&self) -> Vec<AudioMessage> {
        self.rx_msg.try_iter().collect()
    }

    /// Ask the audio thread to stop and wait for it.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.player.shared.tx_cmd.send(AudioCmd::Shutdown);
            if handle.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
    }
}

impl Drop for AudioManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AudioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = &self.player.shared;
        f.debug_struct("AudioManager")
            .field(
                "sounds",
                &shared.sounds.read().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .field(
                "music",
                &shared.music.read().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .field("running", &self.handle.is_some())
            .finish()
    }
}
