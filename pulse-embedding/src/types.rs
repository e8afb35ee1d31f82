//! Core types for embeddings

use serde::{Deserialize, Serialize};

/// Embedding vector (1536 dimensions for text-embedding-3-small by default)
pub type EmbeddingVector = Vec<f32>;

/// Zero vector of the given dimension; the "no signal" embedding
pub fn zero_vector(dimension: usize) -> EmbeddingVector {
    vec![0.0; dimension]
}

/// True when every component is zero (or the vector is empty)
pub fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|x| *x == 0.0)
}

/// Collection a vector is indexed under; ids are unique per domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexDomain {
    ScrapedItems,
    Articles,
    Topics,
}

impl IndexDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexDomain::ScrapedItems => "scraped_items",
            IndexDomain::Articles => "articles",
            IndexDomain::Topics => "topics",
        }
    }

    pub fn all() -> [IndexDomain; 3] {
        [IndexDomain::ScrapedItems, IndexDomain::Articles, IndexDomain::Topics]
    }
}

impl std::fmt::Display for IndexDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vector together with what it was derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVector {
    pub id: String,
    pub vector: EmbeddingVector,
    pub metadata: serde_json::Value,
    /// Source text, kept for re-embedding audits
    pub text: String,
}

/// Similarity search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub id: String,
    /// Cosine similarity (0.0 - 1.0)
    pub similarity: f64,
    pub metadata: serde_json::Value,
    pub text: String,
}
