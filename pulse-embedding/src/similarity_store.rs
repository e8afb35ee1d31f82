//! Similarity store: the seam every pipeline stage searches through

use std::path::Path;

use tracing::{debug, info};

use crate::{
    error::Result,
    index::FlatIndex,
    store::EmbeddingStore,
    types::{IndexDomain, SimilarityMatch},
};

/// Fixed-dimension vector index keyed by (domain, id)
///
/// Every write and query is dimension-checked; a mismatch is an
/// [`crate::EmbeddingError::InvalidDimension`], never a silent truncation.
pub trait VectorStore: Send + Sync {
    fn dimension(&self) -> usize;

    fn upsert(
        &self,
        domain: IndexDomain,
        id: &str,
        vector: &[f32],
        metadata: serde_json::Value,
        text: &str,
    ) -> Result<()>;

    /// Top `k` matches with `similarity >= min_similarity`, best first
    fn search(
        &self,
        domain: IndexDomain,
        query: &[f32],
        k: usize,
        min_similarity: f64,
    ) -> Result<Vec<SimilarityMatch>>;

    fn contains(&self, domain: IndexDomain, id: &str) -> Result<bool>;
}

/// Persistent store plus an optional native index
///
/// Writes go to SQLite (and the index when present). Searches use the
/// index when present, otherwise a capped brute-force scan of SQLite.
pub struct SimilarityStore {
    persistent: EmbeddingStore,
    native: Option<FlatIndex>,
}

impl SimilarityStore {
    /// Brute-force only
    pub fn new(persistent: EmbeddingStore) -> Self {
        Self {
            persistent,
            native: None,
        }
    }

    /// Build a native index and warm it from everything already persisted
    pub fn with_native_index(persistent: EmbeddingStore) -> Result<Self> {
        let index = FlatIndex::new(persistent.dimension());
        for domain in IndexDomain::all() {
            let loaded = index.load(domain, persistent.load_all(domain)?)?;
            if loaded > 0 {
                info!("Warmed {} index with {} vectors", domain, loaded);
            }
        }
        Ok(Self {
            persistent,
            native: Some(index),
        })
    }

    /// Open a SQLite-backed store at `path`, optionally with a native index
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(
        path: P,
        dimension: usize,
        native_index: bool,
    ) -> Result<Self> {
        let persistent = EmbeddingStore::new(path, dimension)?;
        if native_index {
            Self::with_native_index(persistent)
        } else {
            Ok(Self::new(persistent))
        }
    }

    pub fn has_native_index(&self) -> bool {
        self.native.is_some()
    }

    pub fn persistent(&self) -> &EmbeddingStore {
        &self.persistent
    }
}

impl VectorStore for SimilarityStore {
    fn dimension(&self) -> usize {
        self.persistent.dimension()
    }

    fn upsert(
        &self,
        domain: IndexDomain,
        id: &str,
        vector: &[f32],
        metadata: serde_json::Value,
        text: &str,
    ) -> Result<()> {
        if let Some(index) = &self.native {
            index.upsert(domain, id, vector, metadata.clone(), text)?;
        }
        self.persistent.upsert(domain, id, vector, metadata, text)
    }

    fn search(
        &self,
        domain: IndexDomain,
        query: &[f32],
        k: usize,
        min_similarity: f64,
    ) -> Result<Vec<SimilarityMatch>> {
        match &self.native {
            Some(index) => index.search(domain, query, k, min_similarity),
            None => {
                debug!("No native index, scanning {} with brute force", domain);
                self.persistent.search(domain, query, k, min_similarity)
            }
        }
    }

    fn contains(&self, domain: IndexDomain, id: &str) -> Result<bool> {
        match &self.native {
            Some(index) => index.contains(domain, id),
            None => self.persistent.contains(domain, id),
        }
    }
}
