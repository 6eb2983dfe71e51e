//! Dynamic time warping
//!
//! `cell(i, j) = d(candidate[i], reference[j]) + min(cell(i-1, j), cell(i, j-1), cell(i-1, j-1))`
//! with `cell(0, 0) = d(candidate[0], reference[0])`. The total cost is the
//! bottom-right cell. Only two rows are kept in memory.

use serde::{Deserialize, Serialize};

use crate::error::{BiometricError, Result};

/// Default decision threshold for the raw accumulated cost on normalized MFCCs
pub const DEFAULT_THRESHOLD: f64 = 100.0;

/// Result of aligning two sequences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    /// Accumulated cost along the optimal warping path
    pub cost: f64,
    /// Number of cells on that path
    pub path_len: usize,
}

/// How the accumulated cost is scaled before the threshold test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostNormalization {
    /// Raw accumulated cost; the threshold is duration dependent
    #[default]
    None,
    /// Cost divided by warping-path length
    PathLength,
}

impl CostNormalization {
    pub fn apply(&self, alignment: &Alignment) -> f64 {
        match self {
            CostNormalization::None => alignment.cost,
            CostNormalization::PathLength => alignment.cost / alignment.path_len as f64,
        }
    }
}

#[derive(Clone, Copy)]
struct Cell {
    cost: f64,
    len: usize,
}

impl Cell {
    const UNREACHABLE: Cell = Cell {
        cost: f64::INFINITY,
        len: 0,
    };

    /// Strictly cheaper wins; ties keep `self`
    fn cheaper(self, other: Cell) -> Cell {
        if other.cost < self.cost {
            other
        } else {
            self
        }
    }
}

/// Minimal cumulative alignment cost between two sequences
pub fn align<T, D>(candidate: &[T], reference: &[T], local_distance: D) -> Result<f64>
where
    D: FnMut(&T, &T) -> f64,
{
    align_with_path(candidate, reference, local_distance).map(|a| a.cost)
}

/// Like [`align`], also reporting the warping-path length
pub fn align_with_path<T, D>(
    candidate: &[T],
    reference: &[T],
    mut local_distance: D,
) -> Result<Alignment>
where
    D: FnMut(&T, &T) -> f64,
{
    if candidate.is_empty() || reference.is_empty() {
        return Err(BiometricError::Processing(format!(
            "cannot align empty sequence (candidate={}, reference={})",
            candidate.len(),
            reference.len()
        )));
    }

    let width = reference.len();
    let mut prev = vec![Cell::UNREACHABLE; width];
    let mut curr = vec![Cell::UNREACHABLE; width];

    for (i, c) in candidate.iter().enumerate() {
        for (j, r) in reference.iter().enumerate() {
            let best = match (i, j) {
                (0, 0) => Cell { cost: 0.0, len: 0 },
                (0, _) => curr[j - 1],
                (_, 0) => prev[j],
                _ => prev[j - 1].cheaper(prev[j]).cheaper(curr[j - 1]),
            };
            curr[j] = Cell {
                cost: best.cost + local_distance(c, r),
                len: best.len + 1,
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let last = prev[width - 1];
    if last.cost.is_nan() {
        return Err(BiometricError::Processing(
            "alignment cost is not a number".to_string(),
        ));
    }

    log::debug!(
        "DTW {}x{}: cost={:.4}, path_len={}",
        candidate.len(),
        width,
        last.cost,
        last.len
    );

    Ok(Alignment {
        cost: last.cost,
        path_len: last.len,
    })
}

/// Euclidean distance between two coefficient vectors
pub fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Match iff `cost < threshold`
pub fn decide(cost: f64, threshold: f64) -> bool {
    cost < threshold
}
