//! Decoded audio held in memory.
//!
//! An [`AudioClip`] is an interleaved `f32` buffer plus its format. Clips are
//! shared behind `Arc` between the registries and the mixer voices playing
//! them, so one clip can be playing on many voices at once.
//!
//! Two ways to get one: [`AudioClip::from_wav`] decodes RIFF/WAVE data
//! (integer PCM at 8, 16, 24 or 32 bits, or IEEE float at 32 bits) and
//! [`AudioClip::sine`] synthesizes a test tone. [`AudioClip::decode`] picks a
//! decoder from the file extension; with the `raylib` feature, OGG, MP3 and
//! FLAC assets are decoded by raylib.

use std::f64::consts::TAU;
use std::path::Path;
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Sample rate used for synthesized tones.
pub const TONE_SAMPLE_RATE: u32 = 44_100;
const TONE_AMPLITUDE: f64 = 0.5;

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

#[derive(Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClip {
    /// Build a clip from interleaved samples. A trailing partial frame is
    /// dropped.
    pub fn from_samples(mut samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            samples,
            sample_rate: sample_rate.max(1),
            channels,
        }
    }

    /// Mono sine wave at half amplitude.
    pub fn sine(frequency: f64, duration: Duration, sample_rate: u32) -> Self {
        let rate = sample_rate.max(1);
        let count = (duration.as_secs_f64() * rate as f64).round() as usize;
        let samples = (0..count)
            .map(|i| {
                let t = i as f64 / rate as f64;
                (TONE_AMPLITUDE * (TAU * frequency * t).sin()) as f32
            })
            .collect();
        Self::from_samples(samples, rate, 1)
    }

    /// Decode `bytes` according to the extension of `path`. Paths without an
    /// extension are read as WAV.
    pub fn decode(path: &str, bytes: &[u8]) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            None | Some("wav") => Self::from_wav(bytes),
            #[cfg(feature = "raylib")]
            Some(ext) => crate::raylib_backend::decode_wave(&format!(".{}", ext), bytes),
            #[cfg(not(feature = "raylib"))]
            Some(ext) => {
                log::warn!("'{}': headless builds only decode WAV", path);
                Err(EngineError::Decode(format!(
                    ".{} needs the raylib feature",
                    ext
                )))
            }
        }
    }

    pub fn from_wav(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(EngineError::Decode("not a RIFF/WAVE file".into()));
        }

        let mut format: Option<WavFormat> = None;
        let mut data: Option<&[u8]> = None;
        let mut offset = 12;
        while offset + 8 <= bytes.len() {
            let id = &bytes[offset..offset + 4];
            let size = read_u32(bytes, offset + 4) as usize;
            let body_start = offset + 8;
            // Some writers leave a bogus size on the final data chunk.
            let body_end = body_start.saturating_add(size).min(bytes.len());
            let body = &bytes[body_start..body_end];
            match id {
                b"fmt " => format = Some(WavFormat::parse(body)?),
                b"data" => data = Some(body),
                _ => {}
            }
            offset = body_start.saturating_add(size).saturating_add(size & 1);
        }

        let format = format.ok_or_else(|| EngineError::Decode("missing fmt chunk".into()))?;
        let data = data.ok_or_else(|| EngineError::Decode("missing data chunk".into()))?;
        let samples = format.decode(data)?;
        Ok(Self::from_samples(samples, format.sample_rate, format.channels))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Frame `index` downmixed to mono; silence past the end.
    pub fn mono_frame(&self, index: usize) -> f32 {
        let channels = self.channels as usize;
        let start = index * channels;
        match self.samples.get(start..start + channels) {
            Some(frame) => frame.iter().sum::<f32>() / channels as f32,
            None => 0.0,
        }
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct WavFormat {
    tag: u16,
    channels: u16,
    sample_rate: u32,
    bits: u16,
}

impl WavFormat {
    fn parse(body: &[u8]) -> Result<Self> {
        if body.len() < 16 {
            return Err(EngineError::Decode("fmt chunk too short".into()));
        }
        let mut tag = read_u16(body, 0);
        if tag == WAVE_FORMAT_EXTENSIBLE {
            // The real format is the first two bytes of the sub-format GUID.
            if body.len() < 26 {
                return Err(EngineError::Decode("extensible fmt chunk too short".into()));
            }
            tag = read_u16(body, 24);
        }
        let format = Self {
            tag,
            channels: read_u16(body, 2),
            sample_rate: read_u32(body, 4),
            bits: read_u16(body, 14),
        };
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(EngineError::Decode(format!(
                "invalid format: {} channels at {} Hz",
                format.channels, format.sample_rate
            )));
        }
        Ok(format)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<f32>> {
        let samples = match (self.tag, self.bits) {
            (WAVE_FORMAT_PCM, 8) => data.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
            (WAVE_FORMAT_PCM, 16) => data
                .chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32_768.0)
                .collect(),
            (WAVE_FORMAT_PCM, 24) => data
                .chunks_exact(3)
                .map(|c| {
                    let raw = i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8;
                    raw as f32 / 8_388_608.0
                })
                .collect(),
            (WAVE_FORMAT_PCM, 32) => data
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32 / 2_147_483_648.0)
                .collect(),
            (WAVE_FORMAT_IEEE_FLOAT, 32) => data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            (tag, bits) => {
                return Err(EngineError::Decode(format!(
                    "unsupported WAV encoding: format tag {:#06x}, {} bits",
                    tag, bits
                )));
            }
        };
        Ok(samples)
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Encode mono 16-bit PCM as a WAV file. Used to produce fixtures.
pub fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn wav_with(tag: u16, channels: u16, bits: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&8000u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_decode_picks_wav_by_extension() {
        let wav = wav_with(WAVE_FORMAT_PCM, 1, 16, &[0, 0, 0, 64]);
        assert_eq!(AudioClip::decode("sfx/hit.WAV", &wav).unwrap().frames(), 2);
        assert_eq!(AudioClip::decode("hit", &wav).unwrap().frames(), 2);
        assert!(matches!(
            AudioClip::decode("music/theme.mp3", b"not really mp3"),
            Err(EngineError::Decode(_))
        ));
    }

    #[test]
    fn test_sine_tone_shape() {
        let clip = AudioClip::sine(440.0, Duration::from_millis(500), TONE_SAMPLE_RATE);
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.frames(), 22_050);
        assert!(clip.samples().iter().all(|s| s.abs() <= 0.5 + 1e-6));
        assert!(clip.samples().iter().any(|s| *s > 0.49));
        assert!(approx_eq(clip.samples()[0], 0.0));
    }

    #[test]
    fn test_decode_pcm16_round_trip_fixture() {
        let bytes = encode_wav_pcm16(&[0.0, 0.5, -0.5], 22_050);
        let clip = AudioClip::from_wav(&bytes).unwrap();
        assert_eq!(clip.sample_rate(), 22_050);
        assert_eq!(clip.frames(), 3);
        assert!(approx_eq(clip.samples()[1], 0.5));
        assert!(approx_eq(clip.samples()[2], -0.5));
    }

    #[test]
    fn test_decode_8_24_and_float() {
        let clip = AudioClip::from_wav(&wav_with(1, 1, 8, &[128, 255, 0])).unwrap();
        assert!(approx_eq(clip.samples()[0], 0.0));
        assert!(approx_eq(clip.samples()[2], -1.0));

        let clip = AudioClip::from_wav(&wav_with(1, 1, 24, &[0x00, 0x00, 0xC0])).unwrap();
        assert!(approx_eq(clip.samples()[0], -0.5));

        let clip = AudioClip::from_wav(&wav_with(3, 1, 32, &0.25f32.to_le_bytes())).unwrap();
        assert!(approx_eq(clip.samples()[0], 0.25));
    }

    #[test]
    fn test_stereo_downmix() {
        let mut data = Vec::new();
        for v in [i16::MAX, 0, 0, i16::MIN] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let clip = AudioClip::from_wav(&wav_with(1, 2, 16, &data)).unwrap();
        assert_eq!(clip.frames(), 2);
        assert!(approx_eq(clip.mono_frame(0), 0.5));
        assert!(approx_eq(clip.mono_frame(1), -0.5));
        assert_eq!(clip.mono_frame(5), 0.0);
    }

    #[test]
    fn test_malformed_inputs_are_decode_errors() {
        assert!(matches!(
            AudioClip::from_wav(b"ID3\x03garbage"),
            Err(EngineError::Decode(_))
        ));
        assert!(matches!(
            AudioClip::from_wav(&wav_with(1, 1, 12, &[0, 0])),
            Err(EngineError::Decode(_))
        ));
        assert!(matches!(
            AudioClip::from_wav(&wav_with(1, 0, 16, &[0, 0])),
            Err(EngineError::Decode(_))
        ));
        let mut no_data = wav_with(1, 1, 16, &[]);
        no_data.truncate(36);
        assert!(matches!(
            AudioClip::from_wav(&no_data),
            Err(EngineError::Decode(_))
        ));
    }
}
