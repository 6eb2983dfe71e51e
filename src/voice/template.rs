use crate::error::{BiometricError, Result};
use crate::vault::{NumericArray, Template};

/// Coefficients per MFCC frame
pub const MFCC_COEFFS: usize = 13;

/// One time step of spectral coefficients
pub type MfccFrame = [f32; MFCC_COEFFS];

/// Guards against division by zero on constant input
const NORM_EPSILON: f64 = 1e-6;

/// Voice fingerprint: a variable-length sequence of fixed-width MFCC frames,
/// normalized to zero mean and unit variance over the whole matrix
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceTemplate {
    frames: Vec<MfccFrame>,
}

impl VoiceTemplate {
    /// Normalize raw extractor output into a template
    pub fn from_raw(frames: Vec<MfccFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(BiometricError::Processing(
                "feature extraction produced no frames".to_string(),
            ));
        }
        if frames.iter().flatten().any(|v| !v.is_finite()) {
            return Err(BiometricError::Processing(
                "features contain non-finite values".to_string(),
            ));
        }

        let count = (frames.len() * MFCC_COEFFS) as f64;
        let mean = frames.iter().flatten().map(|&v| f64::from(v)).sum::<f64>() / count;
        let variance = frames
            .iter()
            .flatten()
            .map(|&v| (f64::from(v) - mean).powi(2))
            .sum::<f64>()
            / count;
        let scale = variance.sqrt() + NORM_EPSILON;

        let frames = frames
            .into_iter()
            .map(|frame| frame.map(|v| ((f64::from(v) - mean) / scale) as f32))
            .collect();

        Ok(Self { frames })
    }

    /// Build from extractor rows, checking the coefficient width
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let frames = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let width = row.len();
                MfccFrame::try_from(row).map_err(|_| {
                    BiometricError::Format(format!(
                        "frame {} has {} coefficients, expected {}",
                        i, width, MFCC_COEFFS
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_raw(frames)
    }

    pub fn frames(&self) -> &[MfccFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Template for VoiceTemplate {
    fn to_array(&self) -> NumericArray {
        NumericArray::from_f32(
            vec![self.frames.len(), MFCC_COEFFS],
            self.frames.iter().flatten().copied(),
        )
    }

    /// Stored templates are already normalized and are restored as-is
    fn from_array(array: NumericArray) -> Result<Self> {
        let (len, width) = match *array.shape() {
            [len, width] => (len, width),
            ref other => {
                return Err(BiometricError::Format(format!(
                    "voice template rank {}, expected 2",
                    other.len()
                )))
            }
        };
        if width != MFCC_COEFFS || len == 0 {
            return Err(BiometricError::Format(format!(
                "voice template shape [{}, {}], expected [n > 0, {}]",
                len, width, MFCC_COEFFS
            )));
        }

        let values = array.to_f32()?;
        let frames = values
            .chunks_exact(MFCC_COEFFS)
            .map(|chunk| {
                let mut frame = [0.0f32; MFCC_COEFFS];
                frame.copy_from_slice(chunk);
                frame
            })
            .collect();

        Ok(Self { frames })
    }
}
