//! Reference audio loading and WAV encoding.

use std::io::Cursor;
use std::ops::RangeInclusive;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;
use tracing::debug;

/// Sample rate the XTTS conditioning encoder expects reference audio at.
pub const REFERENCE_SAMPLE_RATE: u32 = 22050;

/// Reference lengths, in seconds, that clone a voice well.
pub const RECOMMENDED_REFERENCE_SECONDS: RangeInclusive<f32> = 10.0..=30.0;

/// Sinc kernel length of the reference resampler.
const SINC_LEN: usize = 256;

/// Errors that can occur while loading or encoding audio.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio file not found: {0}")]
    NotFound(String),

    #[error("Failed to decode WAV: {0}")]
    Decode(#[from] hound::Error),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),
}

/// Load a reference sample as a mono buffer at `sampling_rate`.
///
/// Channels are averaged, the signal is resampled when the file rate
/// differs, and every sample is clamped to [-1, 1].
pub fn load_reference(path: &Path, sampling_rate: u32) -> Result<Vec<f32>, AudioError> {
    if !path.exists() {
        return Err(AudioError::NotFound(path.display().to_string()));
    }

    let (channels, file_rate) = read_channels(path)?;
    let mono = downmix(channels);

    debug!(
        path = %path.display(),
        frames = mono.len(),
        file_rate,
        target_rate = sampling_rate,
        "Loaded reference audio"
    );

    let mut samples = if file_rate != sampling_rate && !mono.is_empty() {
        resample(mono, file_rate, sampling_rate)?
    } else {
        mono
    };

    for sample in &mut samples {
        *sample = sample.clamp(-1.0, 1.0);
    }

    Ok(samples)
}

/// Encode a mono buffer as an in-memory 16-bit PCM WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for sample in samples {
            let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(scaled)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Duration of a WAV file in seconds.
pub fn wav_duration(path: &Path) -> Result<f32, AudioError> {
    if !path.exists() {
        return Err(AudioError::NotFound(path.display().to_string()));
    }

    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    Ok(reader.duration() as f32 / spec.sample_rate as f32)
}

/// Read a WAV file into per-channel buffers normalized to [-1, 1).
fn read_channels(path: &Path) -> Result<(Vec<Vec<f32>>, u32), AudioError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channel_count = spec.channels.max(1) as usize;
    let mut channels = vec![Vec::new(); channel_count];

    match spec.sample_format {
        SampleFormat::Float => {
            for (idx, sample) in reader.samples::<f32>().enumerate() {
                channels[idx % channel_count].push(sample?);
            }
        }
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::UnsupportedBitDepth(spec.bits_per_sample));
            }
            let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            for (idx, sample) in reader.samples::<i32>().enumerate() {
                channels[idx % channel_count].push(sample? as f32 / max);
            }
        }
    }

    Ok((channels, spec.sample_rate))
}

/// Average all channels into one.
fn downmix(mut channels: Vec<Vec<f32>>) -> Vec<f32> {
    if channels.len() == 1 {
        return channels.pop().unwrap_or_default();
    }

    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let scale = 1.0 / channels.len() as f32;

    (0..frames)
        .map(|frame| channels.iter().map(|c| c[frame]).sum::<f32>() * scale)
        .collect()
}

fn resample(mut samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (samples.len() as f64 * ratio).ceil() as usize;
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    // Trailing silence pushes the tail out of the sinc kernel.
    samples.resize(samples.len() + SINC_LEN, 0.0);

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let input = vec![samples];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| AudioError::Resample(e.to_string()))?
        .pop()
        .unwrap_or_default();

    output.truncate(expected);
    Ok(output)
}
