use crate::{
    audio_data::{AudioClip, LoadOptions},
    error::{RaySonicError, Result},
};
use std::fs::File;
use std::path::Path;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

pub fn load_audio_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<AudioClip> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| RaySonicError::AudioLoading(format!("Failed to probe audio format: {:?}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| RaySonicError::AudioLoading("No default audio track found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| RaySonicError::AudioLoading("Sample rate not found".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| RaySonicError::AudioLoading("Channel count not found".to_string()))?
        .count() as u16;

    if let Some(ch) = options.mono_channel {
        if ch >= channels as usize {
            return Err(RaySonicError::AudioFormat(format!(
                "Channel {} out of range (max: {})",
                ch,
                channels.saturating_sub(1)
            )));
        }
    }

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| RaySonicError::AudioLoading(format!("Failed to create decoder: {:?}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let max_frames = options
        .max_duration
        .map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
        .unwrap_or(usize::MAX);

    let mut frames_decoded = 0;

    while frames_decoded < max_frames {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break, // end-of-file
            Err(e) => {
                return Err(RaySonicError::AudioLoading(format!(
                    "Error reading packet: {:?}",
                    e
                )));
            }
        };

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(Error::IoError(_)) => break,
            Err(Error::DecodeError(e)) => {
                log::debug!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(RaySonicError::AudioLoading(format!(
                    "Error decoding packet: {:?}",
                    e
                )));
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();

        let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        tmp.copy_interleaved_ref(decoded);

        match options.mono_channel {
            Some(ch) => samples.extend(
                tmp.samples()
                    .chunks(channels as usize)
                    .map(|frame| frame[ch]),
            ),
            None => samples.extend_from_slice(tmp.samples()),
        }

        frames_decoded += frames;
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip")
        .to_string();

    let clip = match options.mono_channel {
        Some(_) => AudioClip::from_samples(name, samples, sample_rate, 1)?,
        None => AudioClip::from_samples(name, samples, sample_rate, channels)?,
    };

    log::info!(
        "Loaded '{}': {} Hz, {} channels, {:.2} s",
        clip.name(),
        clip.sample_rate(),
        clip.channels(),
        clip.duration().as_secs_f64()
    );

    if options.convert_to_mono {
        clip.to_mono()
    } else {
        Ok(clip)
    }
}

/// Convenience function to load audio with default options
pub fn load_audio_file_simple(path: impl AsRef<Path>) -> Result<AudioClip> {
    load_audio_file(path, &LoadOptions::default())
}
