//! Canonical binary encoding of numeric templates
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! "BIOT" | version: u8 | element type: u8 | rank: u8 | dims: rank x u32 | elements
//! ```
//!
//! Elements are written with `to_le_bytes`, so decoding reproduces every value
//! bit-for-bit together with its shape and element type.

use crate::error::{BiometricError, Result};

const MAGIC: &[u8; 4] = b"BIOT";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    F32,
    F64,
}

impl ElementType {
    fn tag(self) -> u8 {
        match self {
            ElementType::F32 => 1,
            ElementType::F64 => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ElementType::F32),
            2 => Some(ElementType::F64),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }
}

/// Shape-tagged array of little-endian numeric elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericArray {
    element: ElementType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NumericArray {
    pub fn from_f32(shape: Vec<usize>, values: impl IntoIterator<Item = f32>) -> Self {
        let data: Vec<u8> = values.into_iter().flat_map(|v| v.to_le_bytes()).collect();
        debug_assert_eq!(data.len(), shape.iter().product::<usize>() * 4);
        Self {
            element: ElementType::F32,
            shape,
            data,
        }
    }

    pub fn from_f64(shape: Vec<usize>, values: impl IntoIterator<Item = f64>) -> Self {
        let data: Vec<u8> = values.into_iter().flat_map(|v| v.to_le_bytes()).collect();
        debug_assert_eq!(data.len(), shape.iter().product::<usize>() * 8);
        Self {
            element: ElementType::F64,
            shape,
            data,
        }
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Elements as f32; fails if the stored type differs
    pub fn to_f32(&self) -> Result<Vec<f32>> {
        self.expect_element(ElementType::F32)?;
        Ok(self
            .data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Elements as f64; fails if the stored type differs
    pub fn to_f64(&self) -> Result<Vec<f64>> {
        self.expect_element(ElementType::F64)?;
        Ok(self
            .data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    fn expect_element(&self, wanted: ElementType) -> Result<()> {
        if self.element != wanted {
            return Err(BiometricError::Format(format!(
                "element type {:?}, expected {:?}",
                self.element, wanted
            )));
        }
        Ok(())
    }

    /// Fails with `Format` when the rank or a dimension does not fit the header
    pub fn encode(&self) -> Result<Vec<u8>> {
        let rank = u8::try_from(self.shape.len()).map_err(|_| {
            BiometricError::Format(format!("rank {} exceeds {}", self.shape.len(), u8::MAX))
        })?;

        let mut out = Vec::with_capacity(HEADER_LEN + self.shape.len() * 4 + self.data.len());
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.push(self.element.tag());
        out.push(rank);
        for &dim in &self.shape {
            let dim = u32::try_from(dim).map_err(|_| {
                BiometricError::Format(format!("dimension {} exceeds {}", dim, u32::MAX))
            })?;
            out.extend_from_slice(&dim.to_le_bytes());
        }
        out.extend_from_slice(&self.data);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(BiometricError::Format("not a template encoding".to_string()));
        }

        let version = bytes[4];
        if version != FORMAT_VERSION {
            return Err(BiometricError::Format(format!(
                "unsupported template version {}",
                version
            )));
        }

        let element = ElementType::from_tag(bytes[5]).ok_or_else(|| {
            BiometricError::Format(format!("unknown element type tag {}", bytes[5]))
        })?;

        let rank = bytes[6] as usize;
        let dims_end = HEADER_LEN + rank * 4;
        if bytes.len() < dims_end {
            return Err(BiometricError::Format("truncated shape header".to_string()));
        }

        let shape: Vec<usize> = bytes[HEADER_LEN..dims_end]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as usize)
            .collect();

        let expected = shape
            .iter()
            .try_fold(element.size(), |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| BiometricError::Format("shape overflows".to_string()))?;

        let data = &bytes[dims_end..];
        if data.len() != expected {
            return Err(BiometricError::Format(format!(
                "shape {:?} needs {} data bytes, found {}",
                shape,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            element,
            shape,
            data: data.to_vec(),
        })
    }
}

/// A biometric template that round-trips through the canonical encoding
pub trait Template: Sized {
    fn to_array(&self) -> NumericArray;

    /// Rebuild from a decoded array, checking shape and element type
    fn from_array(array: NumericArray) -> Result<Self>;
}
