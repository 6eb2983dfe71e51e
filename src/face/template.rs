use crate::error::{BiometricError, Result};
use crate::vault::{NumericArray, Template};

/// Dimension of the upstream face embedding producer
pub const FACE_EMBEDDING_DIM: usize = 128;

/// One face, as a fixed-length embedding vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceTemplate([f64; FACE_EMBEDDING_DIM]);

impl FaceTemplate {
    pub fn new(values: [f64; FACE_EMBEDDING_DIM]) -> Result<Self> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BiometricError::Processing(
                "face embedding contains non-finite values".to_string(),
            ));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for FaceTemplate {
    type Error = BiometricError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(BiometricError::Processing("empty face embedding".to_string()));
        }
        let len = values.len();
        let values: [f64; FACE_EMBEDDING_DIM] = values.try_into().map_err(|_| {
            BiometricError::Format(format!(
                "face embedding has {} values, expected {}",
                len, FACE_EMBEDDING_DIM
            ))
        })?;
        Self::new(values)
    }
}

impl Template for FaceTemplate {
    fn to_array(&self) -> NumericArray {
        NumericArray::from_f64(vec![FACE_EMBEDDING_DIM], self.0.iter().copied())
    }

    fn from_array(array: NumericArray) -> Result<Self> {
        if array.shape() != [FACE_EMBEDDING_DIM] {
            return Err(BiometricError::Format(format!(
                "face template shape {:?}, expected [{}]",
                array.shape(),
                FACE_EMBEDDING_DIM
            )));
        }
        Self::try_from(array.to_f64()?)
    }
}
