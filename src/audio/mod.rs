//! Audio container handling for voice enrollment and verification
//!
//! Callers hand over a complete WAV payload. It is decoded, mixed down to
//! mono and passed to the MFCC extractor collaborator.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

use crate::error::{BiometricError, Result};
use crate::voice::MfccFrame;

/// Mono waveform at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }
}

/// MFCC feature extraction (excluded collaborator)
pub trait MfccExtractor {
    /// Per-time-frame coefficient vectors for `waveform`
    fn extract(&self, waveform: &Waveform) -> Result<Vec<MfccFrame>>;
}

/// Decode a WAV payload, mixing multi-channel audio down to mono.
///
/// Integer PCM is scaled to [-1.0, 1.0].
pub fn decode_wav(bytes: &[u8]) -> Result<Waveform> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(BiometricError::Format("WAV declares zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels);
    let samples: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    if samples.is_empty() {
        return Err(BiometricError::Processing("audio contains no samples".to_string()));
    }

    log::debug!(
        "Decoded WAV: {} Hz, {} channel(s), {} bits, {} mono samples",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        samples.len()
    );

    Ok(Waveform {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Write a mono 32-bit float WAV (debug copy of a recording)
pub fn write_wav(path: &Path, waveform: &Waveform) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let storage_err = |e: hound::Error| BiometricError::Storage(format!("{}: {}", path.display(), e));
    let mut writer = WavWriter::create(path, spec).map_err(storage_err)?;
    for &sample in &waveform.samples {
        writer.write_sample(sample).map_err(storage_err)?;
    }
    writer.finalize().map_err(storage_err)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Encode interleaved i16 PCM as an in-memory WAV
    pub fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::wav_bytes;
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_decode_mono_pcm16() {
        let bytes = wav_bytes(&[0, 16384, -16384, i16::MIN], 1, 16000);
        let wave = decode_wav(&bytes).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.samples, vec![0.0, 0.5, -0.5, -1.0]);
    }

    #[test]
    fn test_stereo_is_mixed_down() {
        let bytes = wav_bytes(&[16384, 0, -16384, -16384], 2, 8000);
        let wave = decode_wav(&bytes).unwrap();
        assert_eq!(wave.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = decode_wav(b"definitely not a wav file").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_empty_wav_is_processing_error() {
        let bytes = wav_bytes(&[], 1, 16000);
        let err = decode_wav(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);
    }

    #[test]
    fn test_duration() {
        let wave = Waveform {
            samples: vec![0.0; 32000],
            sample_rate: 16000,
        };
        assert_eq!(wave.duration_ms(), 2000);
    }

    #[test]
    fn test_write_then_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_record.wav");
        let wave = Waveform {
            samples: vec![0.0, 0.25, -0.75],
            sample_rate: 22050,
        };
        write_wav(&path, &wave).unwrap();
        let decoded = decode_wav(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded, wave);
    }
}
