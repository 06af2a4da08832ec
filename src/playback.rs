//! The audio output seam: what a sound source needs from a playback device.

use crate::error::Result;

/// Layout of the interleaved samples handed to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Playback state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Room reverb attached to a device.
///
/// Damping is expressed in millibels of room level: the low end of
/// [`damping_range`](Self::damping_range) silences the reverb, the high end
/// is full level.
pub trait ReverbStage {
    fn damping_range(&self) -> (f32, f32);

    fn damping(&self) -> f32;

    /// Sets the room level; callers clamp to `damping_range` first.
    fn set_damping(&mut self, damping: f32);
}

/// A looping output voice owned by one sound source.
///
/// Calls come from the logic thread; implementations hand data to their
/// audio thread without blocking it.
pub trait PlaybackDevice {
    /// Replaces the buffer being played, keeping the playback position.
    fn set_sample_buffer(&mut self, samples: &[f32], format: ClipFormat) -> Result<()>;

    fn set_looping(&mut self, looping: bool);

    /// Starts from the beginning.
    fn play(&mut self);

    /// Continues from the held position.
    fn resume(&mut self);

    fn pause(&mut self);

    /// Halts and rewinds to the start.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    fn playback_position_seconds(&self) -> f64;

    fn reverb(&mut self) -> Option<&mut dyn ReverbStage> {
        None
    }
}
