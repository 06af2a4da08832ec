use std::time::Duration;

/// Decoding options for [`super::AudioClip::from_file`].
///
/// There is no resampling: a clip whose rate exceeds the world's
/// `ClipLimits` is rejected when attached, not converted.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Convert to mono after loading
    pub convert_to_mono: bool,
    /// Maximum duration to load (None = load entire file)
    pub max_duration: Option<Duration>,
    /// Which channel to use for mono conversion (None = mix all channels)
    pub mono_channel: Option<usize>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert_to_mono(mut self, convert: bool) -> Self {
        self.convert_to_mono = convert;
        self
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn mono_channel(mut self, channel: usize) -> Self {
        self.mono_channel = Some(channel);
        self
    }
}
