//! Vector normalization and similarity.

use samipa_common::{Result, SamipaError, Vector};

/// Scale `v` to unit L2 norm.
///
/// A zero-norm vector is returned unchanged: it never wins a similarity
/// comparison, but it is not an error and does not corrupt the graph.
pub fn normalize(v: &[f32]) -> Vector {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Dot product of two equal-length vectors.
///
/// Stored vectors are pre-normalized, so against them this equals cosine
/// similarity.
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(SamipaError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}
