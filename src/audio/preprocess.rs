// Audio preprocessing: WAV decode, mono downmix, resample
//
// Every uploaded recording is normalized to mono f32 PCM at the configured
// sample rate before chunking, so the stage clients always see the same
// input shape.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

/// Normalized mono PCM audio, ready for chunking
#[derive(Debug, Clone)]
pub struct PreprocessedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PreprocessedAudio {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Load a WAV file and normalize it to mono f32 at the target sample rate
pub fn load_wav_mono(path: &Path, target_rate: u32) -> Result<PreprocessedAudio> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    debug!(
        "Decoding {}: {} Hz, {} channel(s), {:?} {}-bit",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.sample_format,
        spec.bits_per_sample
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read float WAV samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to read integer WAV samples")?
        }
    };

    let mono = downmix_to_mono(&interleaved, spec.channels);
    let samples = resample_linear(&mono, spec.sample_rate, target_rate);

    Ok(PreprocessedAudio {
        samples,
        sample_rate: target_rate,
    })
}

/// Average interleaved channels down to a single mono channel
fn downmix_to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    let channels = channels as usize;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampling, sufficient at speech sample rates
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;

            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                writer.write_sample((i % 100) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_mono_wav_preserves_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_test_wav(&path, 16_000, 1, 16_000);

        let audio = load_wav_mono(&path, 16_000).unwrap();
        assert_eq!(audio.samples.len(), 16_000);
        assert_eq!(audio.sample_rate, 16_000);
        assert!((audio.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stereo_is_downmixed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_test_wav(&path, 16_000, 2, 8_000);

        let audio = load_wav_mono(&path, 16_000).unwrap();
        assert_eq!(audio.samples.len(), 8_000);
    }

    #[test]
    fn test_resample_halves_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.wav");
        write_test_wav(&path, 32_000, 1, 32_000);

        let audio = load_wav_mono(&path, 16_000).unwrap();
        assert_eq!(audio.sample_rate, 16_000);
        assert!((audio.samples.len() as i64 - 16_000).abs() <= 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_wav_mono(&dir.path().join("nope.wav"), 16_000).is_err());
    }

    #[test]
    fn test_downmix_averages_frames() {
        let mono = downmix_to_mono(&[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(mono, vec![0.5, 0.5]);
    }
}
