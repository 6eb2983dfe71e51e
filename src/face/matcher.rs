use serde::{Deserialize, Serialize};

use super::template::FaceTemplate;

/// Default match tolerance, tuned to the embedding producer's
/// intra/inter-identity separation
pub const DEFAULT_TOLERANCE: f64 = 0.6;

/// Euclidean distance between two embeddings.
///
/// Differences are scaled by their largest magnitude before squaring, so two
/// distinct embeddings never collapse to a zero distance through underflow.
pub fn distance(candidate: &FaceTemplate, reference: &FaceTemplate) -> f64 {
    let diffs = candidate
        .as_slice()
        .iter()
        .zip(reference.as_slice())
        .map(|(a, b)| a - b);

    let scale = diffs.clone().fold(0.0f64, |m, d| m.max(d.abs()));
    if scale == 0.0 {
        return 0.0;
    }

    let sum: f64 = diffs.map(|d| (d / scale).powi(2)).sum();
    scale * sum.sqrt()
}

/// Match iff `distance <= tolerance`
pub fn compare(candidate: &FaceTemplate, reference: &FaceTemplate, tolerance: f64) -> bool {
    distance(candidate, reference) <= tolerance
}

/// What the stream is doing with faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Register,
    Verify,
}

/// Overlay colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Per-face decision label rendered by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceLabel {
    /// No reference template is enrolled
    NotRegistered,
    /// A face was localized but no embedding is available yet
    Detecting,
    /// Register mode: face ready to be captured
    Detected,
    Valid,
    Invalid,
}

impl FaceLabel {
    pub fn text(&self) -> &'static str {
        match self {
            FaceLabel::NotRegistered => "Register First",
            FaceLabel::Detecting => "Detecting...",
            FaceLabel::Detected => "Face Detected",
            FaceLabel::Valid => "Valid Face",
            FaceLabel::Invalid => "Invalid Face",
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            FaceLabel::Valid | FaceLabel::Detected => Rgb(0, 255, 0),
            FaceLabel::Invalid | FaceLabel::NotRegistered => Rgb(255, 0, 0),
            FaceLabel::Detecting => Rgb(255, 165, 0),
        }
    }
}

/// Derive the label for one localized face
pub fn label_for(
    mode: SessionMode,
    reference: Option<&FaceTemplate>,
    embedding: Option<&FaceTemplate>,
    tolerance: f64,
) -> FaceLabel {
    match (mode, reference, embedding) {
        (SessionMode::Verify, None, _) => FaceLabel::NotRegistered,
        (_, _, None) => FaceLabel::Detecting,
        (SessionMode::Register, _, Some(_)) => FaceLabel::Detected,
        (SessionMode::Verify, Some(reference), Some(embedding)) => {
            if compare(embedding, reference, tolerance) {
                FaceLabel::Valid
            } else {
                FaceLabel::Invalid
            }
        }
    }
}
