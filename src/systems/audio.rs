//! Audio thread and software mixer.
//!
//! [`audio_thread`] runs on its own OS thread for the life of an
//! [`AudioManager`](crate::resources::audio::AudioManager). It owns every
//! playing voice, reacts to [`AudioCmd`] messages, mixes the voices down to
//! mono in ~10 ms blocks and hands each block to an [`AudioSink`]. State
//! changes are reported back as [`AudioMessage`]s.
//!
//! Every `PlayFx` gets a fresh voice, so the same sound can overlap itself.
//! Music voices are keyed by id: playing a track that is already playing
//! restarts it.
//!
//! The sink is created on the audio thread itself, so device handles that
//! are not `Send` (raylib's audio stream) never cross threads.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info};

use crate::events::audio::{AudioCmd, AudioMessage};
use crate::resources::audioclip::AudioClip;

/// Upper bound on simultaneous voices; the oldest sound effect is dropped.
pub const MAX_VOICES: usize = 32;
const BLOCK_MILLIS: u64 = 10;

/// Destination for mixed mono samples in `[-1, 1]`.
pub trait AudioSink {
    fn sample_rate(&self) -> u32;

    /// True when the sink can take another block right now.
    fn ready(&mut self) -> bool;

    fn write(&mut self, block: &[f32]);
}

/// Tracks how many frames real time allows a sink to have consumed.
#[derive(Debug)]
struct Pacer {
    started: Instant,
    frames_written: u64,
    sample_rate: u32,
}

impl Pacer {
    fn new(sample_rate: u32) -> Self {
        Self {
            started: Instant::now(),
            frames_written: 0,
            sample_rate: sample_rate.max(1),
        }
    }

    fn ready(&self) -> bool {
        let due = self.started.elapsed().as_secs_f64() * self.sample_rate as f64;
        (self.frames_written as f64) <= due
    }

    fn advance(&mut self, frames: usize) {
        self.frames_written += frames as u64;
    }
}

/// Discards audio at real-time pace. Used when no device is available.
#[derive(Debug)]
pub struct NullSink {
    pacer: Pacer,
}

impl NullSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            pacer: Pacer::new(sample_rate),
        }
    }
}

impl AudioSink for NullSink {
    fn sample_rate(&self) -> u32 {
        self.pacer.sample_rate
    }
    fn ready(&mut self) -> bool {
        self.pacer.ready()
    }
    fn write(&mut self, block: &[f32]) {
        self.pacer.advance(block.len());
    }
}

/// Records everything written, at real-time pace.
///
/// The buffer is shared so the writer can inspect it from another thread.
#[derive(Debug, Clone)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<f32>>>,
    pacer: Arc<Mutex<Pacer>>,
}

impl MemorySink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            pacer: Arc::new(Mutex::new(Pacer::new(sample_rate))),
        }
    }

    /// Copy of all samples written so far.
    pub fn samples(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Largest absolute sample written so far.
    pub fn peak(&self) -> f32 {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

impl AudioSink for MemorySink {
    fn sample_rate(&self) -> u32 {
        self.pacer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample_rate
    }
    fn ready(&mut self) -> bool {
        self.pacer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ready()
    }
    fn write(&mut self, block: &[f32]) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(block);
        self.pacer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(block.len());
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum VoiceKind {
    Fx,
    Music { looped: bool },
}

/// One playing instance of a clip.
struct Voice {
    id: String,
    kind: VoiceKind,
    clip: Arc<AudioClip>,
    /// Position in source frames.
    cursor: f64,
    /// Source frames per output frame.
    step: f64,
    volume: f32,
}

impl Voice {
    fn new(id: String, kind: VoiceKind, clip: Arc<AudioClip>, output_rate: u32) -> Self {
        let step = clip.sample_rate() as f64 / output_rate.max(1) as f64;
        Self {
            id,
            kind,
            clip,
            cursor: 0.0,
            step,
            volume: 1.0,
        }
    }

    fn is_music(&self, id: &str) -> bool {
        matches!(self.kind, VoiceKind::Music { .. }) && self.id == id
    }

    /// Add this voice into `block`. Returns false once the clip is exhausted.
    fn mix_into(&mut self, block: &mut [f32]) -> bool {
        let frames = self.clip.frames();
        for out in block.iter_mut() {
            if self.cursor >= frames as f64 {
                match self.kind {
                    VoiceKind::Music { looped: true } if frames > 0 => self.cursor = 0.0,
                    _ => return false,
                }
            }
            let index = self.cursor as usize;
            let frac = (self.cursor - index as f64) as f32;
            let a = self.clip.mono_frame(index);
            let b = if index + 1 < frames {
                self.clip.mono_frame(index + 1)
            } else {
                a
            };
            *out += (a + (b - a) * frac) * self.volume;
            self.cursor += self.step;
        }
        self.cursor < frames as f64 || self.kind == VoiceKind::Music { looped: true }
    }
}

/// Mixer state owned by the audio thread.
#[derive(Default)]
struct Mixer {
    voices: Vec<Voice>,
}

impl Mixer {
    fn add(&mut self, voice: Voice) {
        if self.voices.len() >= MAX_VOICES {
            if let Some(oldest) = self.voices.iter().position(|v| v.kind == VoiceKind::Fx) {
                let dropped = self.voices.remove(oldest);
                debug!("Voice limit reached, dropping fx '{}'", dropped.id);
            }
        }
        self.voices.push(voice);
    }

    /// Mix one block and return the voices that ran out.
    fn mix(&mut self, block: &mut [f32]) -> Vec<Voice> {
        block.fill(0.0);
        let mut ended = Vec::new();
        let mut i = 0;
        while i < self.voices.len() {
            if self.voices[i].mix_into(block) {
                i += 1;
            } else {
                ended.push(self.voices.remove(i));
            }
        }
        for s in block.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
        ended
    }
}

/// Entry point of the dedicated audio thread.
///
/// Blocks until it receives [`AudioCmd::Shutdown`] or every sender is gone.
pub fn audio_thread<S: AudioSink>(
    mut sink: S,
    rx_cmd: Receiver<AudioCmd>,
    tx_evt: Sender<AudioMessage>,
) {
    let output_rate = sink.sample_rate().max(1);
    let block_len = (output_rate as u64 * BLOCK_MILLIS / 1000).max(1) as usize;
    let mut block = vec![0.0f32; block_len];
    let mut mixer = Mixer::default();

    info!(
        "Audio thread starting ({} Hz, {} frame blocks)",
        output_rate, block_len
    );

    'run: loop {
        // 1) Drain commands
        loop {
            let cmd = match rx_cmd.try_recv() {
                Ok(cmd) => cmd,
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => break 'run,
            };
            match cmd {
                AudioCmd::PlayFx { id, clip } => {
                    debug!("fx play id='{}'", id);
                    mixer.add(Voice::new(id.clone(), VoiceKind::Fx, clip, output_rate));
                    let _ = tx_evt.send(AudioMessage::FxPlayStarted { id });
                }
                AudioCmd::PlayMusic { id, clip, looped } => {
                    debug!("music play id='{}' looped={}", id, looped);
                    mixer.voices.retain(|v| !v.is_music(&id));
                    mixer.add(Voice::new(
                        id.clone(),
                        VoiceKind::Music { looped },
                        clip,
                        output_rate,
                    ));
                    let _ = tx_evt.send(AudioMessage::MusicPlayStarted { id });
                }
                AudioCmd::StopMusic { id } => {
                    let before = mixer.voices.len();
                    mixer.voices.retain(|v| !v.is_music(&id));
                    if mixer.voices.len() != before {
                        debug!("music stop id='{}'", id);
                        let _ = tx_evt.send(AudioMessage::MusicStopped { id });
                    }
                }
                AudioCmd::VolumeMusic { id, vol } => {
                    let vol = vol.clamp(0.0, 1.0);
                    let mut changed = false;
                    for voice in mixer.voices.iter_mut().filter(|v| v.is_music(&id)) {
                        voice.volume = vol;
                        changed = true;
                    }
                    if changed {
                        let _ = tx_evt.send(AudioMessage::MusicVolumeChanged { id, vol });
                    }
                }
                AudioCmd::StopAll => {
                    debug!("stop all ({} voices)", mixer.voices.len());
                    mixer.voices.clear();
                }
                AudioCmd::Shutdown => {
                    debug!("audio shutdown requested");
                    break 'run;
                }
            }
        }

        // 2) Mix while the sink wants data, report voices that ended
        while sink.ready() {
            for voice in mixer.mix(&mut block) {
                let msg = match voice.kind {
                    VoiceKind::Fx => AudioMessage::FxFinished { id: voice.id },
                    VoiceKind::Music { .. } => AudioMessage::MusicFinished { id: voice.id },
                };
                let _ = tx_evt.send(msg);
            }
            sink.write(&block);
        }

        std::thread::sleep(Duration::from_millis(BLOCK_MILLIS));
    }

    info!("Audio thread exiting ({} voices dropped)", mixer.voices.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(frames: usize, value: f32) -> Arc<AudioClip> {
        Arc::new(AudioClip::from_samples(vec![value; frames], 100, 1))
    }

    #[test]
    fn test_overlapping_voices_sum() {
        let mut mixer = Mixer::default();
        mixer.add(Voice::new("a".into(), VoiceKind::Fx, clip(10, 0.25), 100));
        mixer.add(Voice::new("a".into(), VoiceKind::Fx, clip(10, 0.25), 100));
        let mut block = vec![0.0; 4];
        assert!(mixer.mix(&mut block).is_empty());
        assert!(block.iter().all(|s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_fx_voice_ends_and_is_reported() {
        let mut mixer = Mixer::default();
        mixer.add(Voice::new("beep".into(), VoiceKind::Fx, clip(3, 0.5), 100));
        let mut block = vec![0.0; 5];
        let ended = mixer.mix(&mut block);
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].id, "beep");
        assert_eq!(&block[3..], &[0.0, 0.0]);
        assert!(mixer.voices.is_empty());
    }

    #[test]
    fn test_looped_music_wraps() {
        let mut mixer = Mixer::default();
        mixer.add(Voice::new(
            "theme".into(),
            VoiceKind::Music { looped: true },
            clip(2, 0.5),
            100,
        ));
        let mut block = vec![0.0; 7];
        assert!(mixer.mix(&mut block).is_empty());
        assert!(block.iter().all(|s| (s - 0.5).abs() < 1e-6));
        assert_eq!(mixer.voices.len(), 1);
    }

    #[test]
    fn test_output_is_clamped() {
        let mut mixer = Mixer::default();
        for _ in 0..4 {
            mixer.add(Voice::new("loud".into(), VoiceKind::Fx, clip(10, 0.9), 100));
        }
        let mut block = vec![0.0; 2];
        mixer.mix(&mut block);
        assert_eq!(block, vec![1.0, 1.0]);
    }

    #[test]
    fn test_voice_limit_drops_oldest_fx() {
        let mut mixer = Mixer::default();
        for i in 0..=MAX_VOICES {
            mixer.add(Voice::new(format!("fx{i}"), VoiceKind::Fx, clip(10, 0.0), 100));
        }
        assert_eq!(mixer.voices.len(), MAX_VOICES);
        assert!(mixer.voices.iter().all(|v| v.id != "fx0"));
    }

    #[test]
    fn test_resampling_step() {
        let voice = Voice::new("x".into(), VoiceKind::Fx, clip(10, 0.0), 200);
        assert!((voice.step - 0.5).abs() < 1e-9);
    }
}
