mod load_options;
mod symphonia_loader;

use crate::config::ClipLimits;
use crate::error::{RaySonicError, Result};
use crate::playback::ClipFormat;
pub use load_options::LoadOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use symphonia_loader::{load_audio_file, load_audio_file_simple};

/// Decoded, interleaved audio owned behind an `Arc` so sources can share it.
#[derive(Debug, Clone)]
pub struct AudioClip {
    inner: Arc<AudioClipInner>,
}

#[derive(Debug)]
struct AudioClipInner {
    name: String,
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
    total_frames: usize,
}

impl AudioClip {
    /// Wraps already decoded interleaved samples.
    pub fn from_samples(
        name: impl Into<String>,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        if channels == 0 || sample_rate == 0 {
            return Err(RaySonicError::AudioFormat(format!(
                "{} Hz with {} channels is not a playable format",
                sample_rate, channels
            )));
        }

        let total_frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate as f64);
        Ok(Self {
            inner: Arc::new(AudioClipInner {
                name: name.into(),
                samples: samples.into(),
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        })
    }

    /// Decodes a file with symphonia.
    pub fn from_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        load_audio_file(path, options)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn format(&self) -> ClipFormat {
        ClipFormat {
            sample_rate: self.inner.sample_rate,
            channels: self.inner.channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    /// The sample storage itself, without copying.
    pub fn shared_samples(&self) -> Arc<[f32]> {
        self.inner.samples.clone()
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }

    /// Whether two handles share the same decoded data.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Checks the clip against the playback limits.
    pub fn validate(&self, limits: &ClipLimits) -> Result<()> {
        if self.inner.sample_rate > limits.max_sample_rate {
            return Err(RaySonicError::AudioFormat(format!(
                "clip '{}' is {} Hz, limit is {} Hz",
                self.inner.name, self.inner.sample_rate, limits.max_sample_rate
            )));
        }
        if self.inner.duration > limits.max_duration {
            return Err(RaySonicError::AudioFormat(format!(
                "clip '{}' lasts {:.1} s, limit is {:.1} s",
                self.inner.name,
                self.inner.duration.as_secs_f64(),
                limits.max_duration.as_secs_f64()
            )));
        }
        Ok(())
    }

    /// Get samples for a specific channel (0-indexed)
    pub fn channel_samples(&self, channel: usize) -> Result<Vec<f32>> {
        if channel >= self.inner.channels as usize {
            return Err(RaySonicError::AudioFormat(format!(
                "Channel {} out of range (max: {})",
                channel,
                self.inner.channels - 1
            )));
        }

        Ok(self
            .inner
            .samples
            .chunks(self.inner.channels as usize)
            .map(|frame| frame[channel])
            .collect())
    }

    /// Convert to mono by downmixing all channels
    pub fn to_mono(&self) -> Result<Self> {
        if self.inner.channels == 1 {
            return Ok(self.clone());
        }

        let channels = self.inner.channels as usize;
        let mono_samples: Vec<f32> = self
            .inner
            .samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::from_samples(
            self.inner.name.clone(),
            mono_samples,
            self.inner.sample_rate,
            1,
        )
    }
}
