//! Applying acoustic signals to a source's audio.

use crate::audio_data::AudioClip;
use crate::config::ClipLimits;
use crate::playback::{ClipFormat, PlaybackDevice};
use std::sync::Arc;

/// Reverb damping for zero spread, in millibels
const DAMPING_FLOOR: f32 = -10_000.0;
/// Damping added per unit of spread
const DAMPING_PER_SPREAD: f32 = 10_000.0;

/// Maps a spread value onto reverb damping, clamped to the stage's range.
pub fn damping_for_spread(spread: f32, range: (f32, f32)) -> f32 {
    (DAMPING_FLOOR + DAMPING_PER_SPREAD * spread).clamp(range.0, range.1)
}

/// Original and attenuated sample buffers of a valid clip.
///
/// After every update `live[i] == original[i] * current_volume`.
#[derive(Debug, Clone)]
pub struct AudioClipState {
    original: Arc<[f32]>,
    live: Vec<f32>,
    format: ClipFormat,
    current_volume: f32,
    current_reverb_damping: f32,
}

impl AudioClipState {
    fn new(clip: &AudioClip) -> Self {
        let original = clip.shared_samples();
        Self {
            live: original.to_vec(),
            original,
            format: clip.format(),
            current_volume: 1.0,
            current_reverb_damping: DAMPING_FLOOR,
        }
    }

    pub fn original_samples(&self) -> &[f32] {
        &self.original
    }

    pub fn live_samples(&self) -> &[f32] {
        &self.live
    }

    pub fn format(&self) -> ClipFormat {
        self.format
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn current_reverb_damping(&self) -> f32 {
        self.current_reverb_damping
    }

    fn apply_volume(&mut self, volume: f32) {
        for (live, original) in self.live.iter_mut().zip(self.original.iter()) {
            *live = original * volume;
        }
        self.current_volume = volume;
    }
}

/// Per-source audio: owns the playback device and the clip buffers.
pub struct SourceAudioModulator {
    device: Box<dyn PlaybackDevice>,
    clip: Option<AudioClip>,
    state: Option<AudioClipState>,
    limits: ClipLimits,
    last_volume: Option<f32>,
}

impl SourceAudioModulator {
    pub fn new(device: Box<dyn PlaybackDevice>, limits: ClipLimits) -> Self {
        Self {
            device,
            clip: None,
            state: None,
            limits,
            last_volume: None,
        }
    }

    /// Replaces the clip. A missing or out-of-limits clip leaves the source
    /// silent until another clip is attached.
    pub fn attach_clip(&mut self, clip: Option<AudioClip>) {
        self.last_volume = None;
        self.state = None;

        match &clip {
            None => log::warn!("Sound source has no audio clip, it will stay silent"),
            Some(c) => match c.validate(&self.limits) {
                Ok(()) => {
                    self.state = Some(AudioClipState::new(c));
                    self.device.set_looping(true);
                    log::debug!("Attached clip '{}'", c.name());
                }
                Err(e) => log::warn!("Rejected clip, source stays silent: {}", e),
            },
        }
        self.clip = clip;
    }

    pub fn has_clip(&self) -> bool {
        self.state.is_some()
    }

    pub fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    pub fn clip_state(&self) -> Option<&AudioClipState> {
        self.state.as_ref()
    }

    pub fn device(&self) -> &dyn PlaybackDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn PlaybackDevice {
        self.device.as_mut()
    }

    /// Applies one acoustic update. Returns whether the sample buffer was
    /// recomputed.
    pub fn on_acoustic_update(&mut self, volume: f32, spread: f32) -> bool {
        let Some(state) = self.state.as_mut() else {
            log::warn!("Acoustic update for a source without a valid clip ignored");
            return false;
        };

        let recompute = self.last_volume != Some(volume);
        if recompute {
            state.apply_volume(volume);
            // only a delivered buffer counts as applied
            self.last_volume = match self.device.set_sample_buffer(&state.live, state.format) {
                Ok(()) => Some(volume),
                Err(e) => {
                    log::warn!("Failed to push attenuated samples, retrying next update: {}", e);
                    None
                }
            };
        }

        if let Some(reverb) = self.device.reverb() {
            let damping = damping_for_spread(spread, reverb.damping_range());
            reverb.set_damping(damping);
            state.current_reverb_damping = damping;
        }

        recompute
    }

    /// Starts playback when the clip is valid and the device is idle,
    /// resuming from a held position if there is one.
    pub fn play_if_valid(&mut self) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        if self.device.is_playing() {
            return;
        }

        if let Err(e) = self.device.set_sample_buffer(&state.live, state.format) {
            log::warn!("Failed to push samples before playback: {}", e);
            return;
        }
        if self.device.playback_position_seconds() == 0.0 {
            self.device.play();
        } else {
            self.device.resume();
        }
    }

    /// Pauses (keeping the position) or stops a playing source.
    pub fn stop(&mut self, pause: bool) {
        if self.state.is_none() || !self.device.is_playing() {
            return;
        }
        if pause {
            self.device.pause();
        } else {
            self.device.stop();
        }
    }

    pub fn on_attach(&mut self) {
        self.play_if_valid();
    }

    pub fn on_detach(&mut self) {
        self.stop(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlayState;
    use crate::playback::testing::MockDevice;

    fn clip(samples: Vec<f32>, rate: u32) -> AudioClip {
        AudioClip::from_samples("test", samples, rate, 1).unwrap()
    }

    fn modulator() -> (SourceAudioModulator, MockDevice) {
        let device = MockDevice::new();
        let modulator = SourceAudioModulator::new(Box::new(device.clone()), ClipLimits::default());
        (modulator, device)
    }

    #[test]
    fn test_volume_scales_live_buffer() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(Some(clip(vec![1.0, 1.0, 1.0, 1.0], 44_100)));
        assert!(device.snapshot().looping);

        assert!(modulator.on_acoustic_update(0.5, 0.0));
        let state = modulator.clip_state().unwrap();
        assert_eq!(state.live_samples(), &[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(state.original_samples(), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(device.snapshot().samples, vec![0.5; 4]);
    }

    #[test]
    fn test_live_tracks_original_times_volume() {
        let (mut modulator, _device) = modulator();
        let original = vec![0.2, -0.4, 0.8, 0.0, 1.0];
        modulator.attach_clip(Some(clip(original.clone(), 22_050)));

        for volume in [0.0, 0.3, 1.0, 0.75] {
            modulator.on_acoustic_update(volume, 0.1);
            let state = modulator.clip_state().unwrap();
            for (live, orig) in state.live_samples().iter().zip(&original) {
                assert_eq!(*live, orig * volume);
            }
            assert_eq!(state.current_volume(), volume);
        }
    }

    #[test]
    fn test_high_rate_clip_is_invalid() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(Some(clip(vec![1.0; 96], 96_000)));
        assert!(!modulator.has_clip());

        modulator.play_if_valid();
        let snapshot = device.snapshot();
        assert_eq!(snapshot.state, PlayState::Stopped);
        assert_eq!(snapshot.buffer_pushes, 0);
        assert_eq!(snapshot.plays, 0);
    }

    #[test]
    fn test_missing_clip_update_is_noop() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(None);
        assert!(!modulator.on_acoustic_update(0.5, 0.5));
        assert_eq!(device.snapshot().buffer_pushes, 0);
        assert_eq!(device.snapshot().damping, None);
    }

    #[test]
    fn test_pause_then_resume() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(Some(clip(vec![0.1; 16], 48_000)));

        modulator.play_if_valid();
        assert_eq!(device.snapshot().plays, 1);

        device.snapshot().position_seconds = 0.25;
        modulator.stop(true);
        assert_eq!(device.snapshot().state, PlayState::Paused);

        modulator.play_if_valid();
        let snapshot = device.snapshot();
        assert_eq!(snapshot.state, PlayState::Playing);
        assert_eq!(snapshot.resumes, 1);
        assert_eq!(snapshot.plays, 1);
        assert_eq!(snapshot.position_seconds, 0.25);
    }

    #[test]
    fn test_stop_rewinds() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(Some(clip(vec![0.1; 16], 48_000)));
        modulator.on_attach();
        device.snapshot().position_seconds = 0.5;

        modulator.on_detach();
        assert_eq!(device.snapshot().state, PlayState::Stopped);

        modulator.on_attach();
        assert_eq!(device.snapshot().plays, 2);
    }

    #[test]
    fn test_reverb_damping_clamped() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(Some(clip(vec![1.0; 4], 48_000)));

        modulator.on_acoustic_update(1.0, 0.25);
        assert_eq!(device.snapshot().damping, Some(-7500.0));

        modulator.on_acoustic_update(1.0, 3.0);
        assert_eq!(device.snapshot().damping, Some(0.0));

        modulator.on_acoustic_update(1.0, -1.0);
        assert_eq!(device.snapshot().damping, Some(-10_000.0));
        assert_eq!(
            modulator.clip_state().unwrap().current_reverb_damping(),
            -10_000.0
        );
    }

    #[test]
    fn test_unchanged_volume_skips_recompute() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(Some(clip(vec![1.0; 4], 48_000)));

        assert!(modulator.on_acoustic_update(0.4, 0.0));
        assert!(!modulator.on_acoustic_update(0.4, 0.5));
        assert_eq!(device.snapshot().buffer_pushes, 1);
        assert_eq!(device.snapshot().damping, Some(-5000.0));

        // a new clip starts from scratch
        modulator.attach_clip(Some(clip(vec![0.5; 4], 48_000)));
        assert!(modulator.on_acoustic_update(0.4, 0.0));
        assert_eq!(device.snapshot().samples, vec![0.2; 4]);
    }

    #[test]
    fn test_failed_push_is_retried_with_same_volume() {
        let (mut modulator, device) = modulator();
        modulator.attach_clip(Some(clip(vec![1.0; 4], 48_000)));
        device.snapshot().failing_pushes = 1;

        assert!(modulator.on_acoustic_update(0.5, 0.0));
        assert!(device.snapshot().samples.is_empty());

        // same volume again, but the device never got it
        assert!(modulator.on_acoustic_update(0.5, 0.0));
        assert_eq!(device.snapshot().samples, vec![0.5; 4]);

        assert!(!modulator.on_acoustic_update(0.5, 0.0));
        assert_eq!(device.snapshot().buffer_pushes, 1);
    }
}
