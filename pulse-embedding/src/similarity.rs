//! Cosine similarity calculations

use ndarray::ArrayView1;

use crate::{
    error::{EmbeddingError, Result},
    types::SimilarityMatch,
};

/// Calculate cosine similarity between two embeddings
///
/// Returns a value between 0.0 (unrelated) and 1.0 (identical direction).
/// Negative cosines are clamped to 0.0, and a zero vector has similarity
/// 0.0 to everything, so failed embeddings never produce a match.
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(EmbeddingError::InvalidDimension {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let a_view = ArrayView1::from(a);
    let b_view = ArrayView1::from(b);

    let dot_product = a_view.dot(&b_view) as f64;
    let norm_a = (a_view.dot(&a_view) as f64).sqrt();
    let norm_b = (b_view.dot(&b_view) as f64).sqrt();

    // Avoid division by zero
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot_product / (norm_a * norm_b)).clamp(0.0, 1.0))
}

/// L2-normalize a vector; `None` for the zero vector
pub fn normalize(vector: &[f32]) -> Option<Vec<f32>> {
    let view = ArrayView1::from(vector);
    let norm = view.dot(&view).sqrt();
    if norm == 0.0 {
        return None;
    }
    Some(vector.iter().map(|x| x / norm).collect())
}

/// Filter, sort and truncate raw hits the same way for every backend
///
/// Keeps hits with `similarity >= min_similarity` and `similarity > 0`,
/// orders by similarity descending (ties by id), and keeps the top `k`.
pub fn rank_matches(
    mut matches: Vec<SimilarityMatch>,
    k: usize,
    min_similarity: f64,
) -> Vec<SimilarityMatch> {
    matches.retain(|m| m.similarity > 0.0 && m.similarity >= min_similarity);

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    matches.truncate(k);
    matches
}
