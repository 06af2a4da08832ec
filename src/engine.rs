//! `cpal` output voice implementing [`PlaybackDevice`].

use crate::error::{RaySonicError, Result};
use crate::playback::{ClipFormat, PlayState, PlaybackDevice, ReverbStage};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::sync::{Arc, Mutex, MutexGuard};

/// Room level in millibels
const MIN_DAMPING: f32 = -10_000.0;
const MAX_DAMPING: f32 = 0.0;
/// Length of the reverb's feedback delay
const REVERB_DELAY_SECONDS: f32 = 0.05;
const REVERB_FEEDBACK: f32 = 0.5;

/// Voice state shared between the logic thread and the output callback.
#[derive(Debug)]
struct VoiceState {
    samples: Vec<f32>,
    format: ClipFormat,
    /// Fractional frame position inside `samples`
    position: f64,
    looping: bool,
    state: PlayState,
    damping: f32,
    delay_line: Vec<f32>,
    delay_pos: usize,
}

impl VoiceState {
    fn new(device_rate: u32) -> Self {
        let delay_len = ((device_rate as f32 * REVERB_DELAY_SECONDS) as usize).max(1);
        Self {
            samples: Vec::new(),
            format: ClipFormat {
                sample_rate: device_rate,
                channels: 1,
            },
            position: 0.0,
            looping: false,
            state: PlayState::Stopped,
            damping: MIN_DAMPING,
            delay_line: vec![0.0; delay_len],
            delay_pos: 0,
        }
    }

    fn total_frames(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }

    /// Linear wet gain for the current room level.
    fn wet_gain(&self) -> f32 {
        if self.damping <= MIN_DAMPING {
            0.0
        } else {
            10f32.powf(self.damping / 2000.0)
        }
    }

    /// Fills `out` with interleaved frames at `device_rate`.
    ///
    /// Clip channels map onto output channels by index; a mono clip feeds all
    /// of them. Anything past the end of a non-looping clip is silence and
    /// stops the voice.
    fn render(&mut self, out: &mut [f32], out_channels: u16, device_rate: u32) {
        out.fill(0.0);

        let out_channels = out_channels.max(1) as usize;
        let clip_channels = self.format.channels.max(1) as usize;
        let total_frames = self.total_frames();
        let playing = self.state == PlayState::Playing && total_frames > 0;
        let step = self.format.sample_rate as f64 / device_rate.max(1) as f64;
        let wet = self.wet_gain();

        for frame in out.chunks_exact_mut(out_channels) {
            let mut dry_sum = 0.0;
            if playing && self.state == PlayState::Playing {
                let index = self.position as usize;
                if index >= total_frames {
                    if self.looping {
                        self.position %= total_frames as f64;
                    } else {
                        self.state = PlayState::Stopped;
                        self.position = 0.0;
                    }
                }
            }

            if playing && self.state == PlayState::Playing {
                let base = (self.position as usize).min(total_frames - 1) * clip_channels;
                for (ch, sample) in frame.iter_mut().enumerate() {
                    let source_ch = if clip_channels == 1 {
                        0
                    } else {
                        ch.min(clip_channels - 1)
                    };
                    *sample = self.samples[base + source_ch];
                    dry_sum += *sample;
                }
                self.position += step;
            }

            if wet > 0.0 {
                let delayed = self.delay_line[self.delay_pos];
                let mono = dry_sum / out_channels as f32;
                self.delay_line[self.delay_pos] = mono + delayed * REVERB_FEEDBACK;
                self.delay_pos = (self.delay_pos + 1) % self.delay_line.len();
                for sample in frame.iter_mut() {
                    *sample += delayed * wet;
                }
            }
        }
    }
}

fn lock(shared: &Mutex<VoiceState>) -> MutexGuard<'_, VoiceState> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reverb of a [`CpalPlaybackDevice`]: a feedback delay mixed in at the room level.
pub struct VoiceReverb {
    shared: Arc<Mutex<VoiceState>>,
    damping: f32,
}

impl ReverbStage for VoiceReverb {
    fn damping_range(&self) -> (f32, f32) {
        (MIN_DAMPING, MAX_DAMPING)
    }

    fn damping(&self) -> f32 {
        self.damping
    }

    fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(MIN_DAMPING, MAX_DAMPING);
        lock(&self.shared).damping = self.damping;
    }
}

/// One looping voice on the default `cpal` output device.
///
/// The stream runs for the lifetime of the device and plays silence unless
/// the voice is playing. The callback only ever `try_lock`s the shared state,
/// so a logic-thread update costs at most one silent block.
pub struct CpalPlaybackDevice {
    shared: Arc<Mutex<VoiceState>>,
    reverb: VoiceReverb,
    device_rate: u32,
    device_channels: u16,
    _stream: cpal::Stream,
}

impl CpalPlaybackDevice {
    /// Opens the default output device with its default configuration.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            RaySonicError::AudioDevice("No default output device available".into())
        })?;

        let default_config = device.default_output_config().map_err(|e| {
            RaySonicError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;
        let config: cpal::StreamConfig = default_config.config();
        let device_rate = config.sample_rate.0;
        let device_channels = config.channels;

        let shared = Arc::new(Mutex::new(VoiceState::new(device_rate)));

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => Self::create_stream::<f32>(&device, &config, shared.clone())?,
            cpal::SampleFormat::I16 => Self::create_stream::<i16>(&device, &config, shared.clone())?,
            cpal::SampleFormat::U16 => Self::create_stream::<u16>(&device, &config, shared.clone())?,
            _ => {
                return Err(RaySonicError::AudioFormat(
                    "Unsupported sample format".into(),
                ));
            }
        };

        stream.play().map_err(|e| {
            RaySonicError::AudioDevice(format!("Failed to start stream: {}", e))
        })?;

        log::info!(
            "Opened output voice: {} Hz, {} channels",
            device_rate,
            device_channels
        );

        Ok(Self {
            reverb: VoiceReverb {
                shared: shared.clone(),
                damping: MIN_DAMPING,
            },
            shared,
            device_rate,
            device_channels,
            _stream: stream,
        })
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }

    pub fn device_channels(&self) -> u16 {
        self.device_channels
    }

    fn create_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        shared: Arc<Mutex<VoiceState>>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels;
        let device_rate = config.sample_rate.0;
        let mut scratch: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    match shared.try_lock() {
                        Ok(mut voice) => voice.render(&mut scratch, channels, device_rate),
                        // logic thread is swapping buffers, skip this block
                        Err(_) => scratch.fill(0.0),
                    }
                    for (out, sample) in data.iter_mut().zip(&scratch) {
                        *out = T::from_sample(*sample);
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| RaySonicError::AudioDevice(format!("Failed to build stream: {}", e)))
    }
}

impl PlaybackDevice for CpalPlaybackDevice {
    fn set_sample_buffer(&mut self, samples: &[f32], format: ClipFormat) -> Result<()> {
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(RaySonicError::AudioFormat(format!(
                "{} Hz with {} channels is not a playable format",
                format.sample_rate, format.channels
            )));
        }
        let mut voice = lock(&self.shared);
        voice.samples.clear();
        voice.samples.extend_from_slice(samples);
        voice.format = format;
        Ok(())
    }

    fn set_looping(&mut self, looping: bool) {
        lock(&self.shared).looping = looping;
    }

    fn play(&mut self) {
        let mut voice = lock(&self.shared);
        voice.position = 0.0;
        voice.state = PlayState::Playing;
    }

    fn resume(&mut self) {
        lock(&self.shared).state = PlayState::Playing;
    }

    fn pause(&mut self) {
        let mut voice = lock(&self.shared);
        if voice.state == PlayState::Playing {
            voice.state = PlayState::Paused;
        }
    }

    fn stop(&mut self) {
        let mut voice = lock(&self.shared);
        voice.state = PlayState::Stopped;
        voice.position = 0.0;
    }

    fn is_playing(&self) -> bool {
        lock(&self.shared).state == PlayState::Playing
    }

    fn playback_position_seconds(&self) -> f64 {
        let voice = lock(&self.shared);
        voice.position.floor() / voice.format.sample_rate.max(1) as f64
    }

    fn reverb(&mut self) -> Option<&mut dyn ReverbStage> {
        Some(&mut self.reverb)
    }
}
