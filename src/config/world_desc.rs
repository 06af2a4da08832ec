use crate::error::{RaySonicError, Result};
use std::time::Duration;

/// Upper bounds a clip must respect to be played.
///
/// Clips above either limit are rejected outright; nothing is resampled or
/// truncated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipLimits {
    /// Highest accepted sample rate in Hz
    pub max_sample_rate: u32,
    /// Longest accepted clip
    pub max_duration: Duration,
}

impl Default for ClipLimits {
    fn default() -> Self {
        Self {
            max_sample_rate: 48_000,
            max_duration: Duration::from_secs(3600),
        }
    }
}

/// How the per-source spread is derived from the per-ray contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadMode {
    /// Mean absolute deviation from the source volume
    #[default]
    MeanAbsoluteDeviation,
    /// Square root of the mean absolute deviation, closer to a standard deviation
    RootMeanAbsoluteDeviation,
}

/// Configuration descriptor for a RaySonic world
#[derive(Debug, Clone)]
pub struct RaySonicWorldDesc {
    /// Width of the ray-trace result texture (one ray per pixel)
    pub texture_width: u32,
    /// Height of the ray-trace result texture
    pub texture_height: u32,
    /// Maximum number of reflections per ray
    pub bounces: u32,
    /// Maximum number of diffractions per ray; each one adds a texture layer set
    pub diffractions: u32,
    /// Compute workgroup edge length. Must match `@workgroup_size` of the kernel.
    pub group_size: u32,
    /// Number of float channels written per ray (id, distance, ...)
    pub parameter_count: u32,
    pub spread_mode: SpreadMode,
    pub clip_limits: ClipLimits,
    /// Seed for pixel jitter and kernel seed (None draws from entropy)
    pub rng_seed: Option<u64>,
    /// Log per-readback hit statistics
    pub diagnostics: bool,
}

impl Default for RaySonicWorldDesc {
    fn default() -> Self {
        Self {
            texture_width: 256,
            texture_height: 256,
            bounces: 0,
            diffractions: 0,
            group_size: 4,
            parameter_count: 2,
            spread_mode: SpreadMode::default(),
            clip_limits: ClipLimits::default(),
            rng_seed: None,
            diagnostics: false,
        }
    }
}

impl RaySonicWorldDesc {
    pub const MAX_TEXTURE_SIZE: u32 = 1024;
    pub const MAX_BOUNCES: u32 = 15;
    pub const MAX_DIFFRACTIONS: u32 = 7;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture_size(mut self, width: u32, height: u32) -> Self {
        self.texture_width = width;
        self.texture_height = height;
        self
    }

    pub fn bounces(mut self, bounces: u32) -> Self {
        self.bounces = bounces;
        self
    }

    pub fn diffractions(mut self, diffractions: u32) -> Self {
        self.diffractions = diffractions;
        self
    }

    pub fn group_size(mut self, size: u32) -> Self {
        self.group_size = size;
        self
    }

    /// Result channels the kernel writes per diffraction layer set.
    pub fn parameter_count(mut self, count: u32) -> Self {
        self.parameter_count = count;
        self
    }

    pub fn spread_mode(mut self, mode: SpreadMode) -> Self {
        self.spread_mode = mode;
        self
    }

    pub fn clip_limits(mut self, limits: ClipLimits) -> Self {
        self.clip_limits = limits;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn diagnostics(mut self, enable: bool) -> Self {
        self.diagnostics = enable;
        self
    }

    /// Number of diffraction layer sets in the result texture
    pub fn diffraction_layers(&self) -> u32 {
        self.diffractions + 1
    }

    /// Total array layers of the result texture
    pub fn texture_layers(&self) -> u32 {
        self.diffraction_layers() * self.parameter_count
    }

    /// Number of floats in one complete readback
    pub fn readback_len(&self) -> usize {
        self.texture_width as usize * self.texture_height as usize * self.texture_layers() as usize
    }

    /// Checks every field against the ranges the kernel and texture layout support.
    pub fn validate(&self) -> Result<()> {
        if self.texture_width == 0
            || self.texture_height == 0
            || self.texture_width > Self::MAX_TEXTURE_SIZE
            || self.texture_height > Self::MAX_TEXTURE_SIZE
        {
            return Err(RaySonicError::Configuration(format!(
                "Texture size {}x{} outside 1..={}",
                self.texture_width,
                self.texture_height,
                Self::MAX_TEXTURE_SIZE
            )));
        }
        if self.bounces > Self::MAX_BOUNCES {
            return Err(RaySonicError::Configuration(format!(
                "Bounce limit {} exceeds {}",
                self.bounces,
                Self::MAX_BOUNCES
            )));
        }
        if self.diffractions > Self::MAX_DIFFRACTIONS {
            return Err(RaySonicError::Configuration(format!(
                "Diffraction limit {} exceeds {}",
                self.diffractions,
                Self::MAX_DIFFRACTIONS
            )));
        }
        if self.group_size == 0 {
            return Err(RaySonicError::Configuration(
                "Workgroup size must be non-zero".into(),
            ));
        }
        if self.parameter_count < 2 {
            return Err(RaySonicError::Configuration(format!(
                "Parameter count {} is below the id + distance minimum",
                self.parameter_count
            )));
        }
        Ok(())
    }
}
