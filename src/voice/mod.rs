//! Voice biometrics
//!
//! MFCC templates compared by dynamic time warping. MFCC extraction itself is
//! an external collaborator behind `audio::MfccExtractor`.

pub mod dtw;
pub mod template;

pub use dtw::{
    align, align_with_path, decide, euclidean, Alignment, CostNormalization, DEFAULT_THRESHOLD,
};
pub use template::{MfccFrame, VoiceTemplate, MFCC_COEFFS};

use crate::error::Result;

/// Score a live template against the enrolled one
pub fn score(
    candidate: &VoiceTemplate,
    reference: &VoiceTemplate,
    normalization: CostNormalization,
) -> Result<f64> {
    let alignment = align_with_path(candidate.frames(), reference.frames(), |a, b| {
        euclidean(a, b)
    })?;
    Ok(normalization.apply(&alignment))
}
