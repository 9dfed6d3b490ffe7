//! Similarity computation for embeddings.

use crate::error::{EmbeddingError, Result};

/// Cosine similarity of two embeddings, in `[-1.0, 1.0]`.
///
/// A zero vector on either side scores 0.0. Differing lengths are a
/// [`EmbeddingError::DimensionMismatch`], with `a` taken as the expected size.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }

    // Rounding can push parallel vectors slightly past 1.0
    Ok((dot / denominator).clamp(-1.0, 1.0))
}

/// Normalize an embedding to unit length. Zero vectors are left untouched.
pub fn normalize(embedding: &mut [f32]) {
    let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    embedding.iter_mut().for_each(|x| *x /= norm);
}
