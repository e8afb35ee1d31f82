//! Exact in-memory vector index
//!
//! Vectors are normalized once on insert, so a query is a single dot
//! product per row. Zero vectors are kept (so `contains` stays truthful)
//! but never score above 0.

use std::collections::HashMap;

use ndarray::ArrayView1;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    error::{EmbeddingError, Result},
    similarity::{normalize, rank_matches},
    similarity_store::VectorStore,
    types::{IndexDomain, IndexedVector, SimilarityMatch},
};

struct Row {
    id: String,
    unit: Option<Vec<f32>>,
    metadata: serde_json::Value,
    text: String,
}

#[derive(Default)]
struct DomainRows {
    rows: Vec<Row>,
    positions: HashMap<String, usize>,
}

/// Native exact index keyed by (domain, id)
pub struct FlatIndex {
    dimension: usize,
    domains: RwLock<HashMap<IndexDomain, DomainRows>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            domains: RwLock::new(HashMap::new()),
        }
    }

    /// Bulk-load previously persisted vectors into a domain
    pub fn load(&self, domain: IndexDomain, vectors: Vec<IndexedVector>) -> Result<usize> {
        let count = vectors.len();
        for v in vectors {
            self.upsert(domain, &v.id, &v.vector, v.metadata, &v.text)?;
        }
        debug!("Loaded {} vectors into {} index", count, domain);
        Ok(count)
    }

    pub fn len(&self, domain: IndexDomain) -> usize {
        self.domains.read().get(&domain).map(|d| d.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, domain: IndexDomain) -> bool {
        self.len(domain) == 0
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorStore for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn upsert(
        &self,
        domain: IndexDomain,
        id: &str,
        vector: &[f32],
        metadata: serde_json::Value,
        text: &str,
    ) -> Result<()> {
        self.check_dimension(vector)?;

        let row = Row {
            id: id.to_string(),
            unit: normalize(vector),
            metadata,
            text: text.to_string(),
        };

        let mut domains = self.domains.write();
        let rows = domains.entry(domain).or_default();
        match rows.positions.get(id) {
            Some(&pos) => rows.rows[pos] = row,
            None => {
                rows.positions.insert(id.to_string(), rows.rows.len());
                rows.rows.push(row);
            }
        }
        Ok(())
    }

    fn search(
        &self,
        domain: IndexDomain,
        query: &[f32],
        k: usize,
        min_similarity: f64,
    ) -> Result<Vec<SimilarityMatch>> {
        self.check_dimension(query)?;

        let Some(query_unit) = normalize(query) else {
            return Ok(Vec::new());
        };
        let query_view = ArrayView1::from(&query_unit[..]);

        let domains = self.domains.read();
        let Some(rows) = domains.get(&domain) else {
            return Ok(Vec::new());
        };

        let hits = rows
            .rows
            .iter()
            .filter_map(|row| {
                let unit = row.unit.as_ref()?;
                let similarity = (query_view.dot(&ArrayView1::from(&unit[..])) as f64).clamp(0.0, 1.0);
                Some(SimilarityMatch {
                    id: row.id.clone(),
                    similarity,
                    metadata: row.metadata.clone(),
                    text: row.text.clone(),
                })
            })
            .collect();

        Ok(rank_matches(hits, k, min_similarity))
    }

    fn contains(&self, domain: IndexDomain, id: &str) -> Result<bool> {
        Ok(self
            .domains
            .read()
            .get(&domain)
            .map(|d| d.positions.contains_key(id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_ranks_by_similarity() {
        let index = FlatIndex::new(3);
        index.upsert(IndexDomain::ScrapedItems, "perfect", &[1.0, 0.0, 0.0], json!({}), "a").unwrap();
        index.upsert(IndexDomain::ScrapedItems, "close", &[0.8, 0.6, 0.0], json!({}), "b").unwrap();
        index.upsert(IndexDomain::ScrapedItems, "orthogonal", &[0.0, 1.0, 0.0], json!({}), "c").unwrap();

        let hits = index.search(IndexDomain::ScrapedItems, &[2.0, 0.0, 0.0], 10, 0.5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "perfect");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert!((hits[1].similarity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_domains_are_isolated() {
        let index = FlatIndex::new(2);
        index.upsert(IndexDomain::Articles, "a1", &[1.0, 0.0], json!({}), "").unwrap();

        let hits = index.search(IndexDomain::ScrapedItems, &[1.0, 0.0], 5, 0.0).unwrap();
        assert!(hits.is_empty());
        assert!(index.contains(IndexDomain::Articles, "a1").unwrap());
        assert!(!index.contains(IndexDomain::ScrapedItems, "a1").unwrap());
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let index = FlatIndex::new(2);
        index.upsert(IndexDomain::Topics, "t", &[1.0, 0.0], json!({"v": 1}), "old").unwrap();
        index.upsert(IndexDomain::Topics, "t", &[0.0, 1.0], json!({"v": 2}), "new").unwrap();

        assert_eq!(index.len(IndexDomain::Topics), 1);
        let hits = index.search(IndexDomain::Topics, &[0.0, 1.0], 5, 0.9).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "new");
        assert_eq!(hits[0].metadata["v"], 2);
    }

    #[test]
    fn test_zero_vectors_never_match() {
        let index = FlatIndex::new(2);
        index.upsert(IndexDomain::ScrapedItems, "empty", &[0.0, 0.0], json!({}), "").unwrap();

        assert!(index.contains(IndexDomain::ScrapedItems, "empty").unwrap());
        assert!(index.search(IndexDomain::ScrapedItems, &[1.0, 1.0], 5, 0.0).unwrap().is_empty());
        assert!(index.search(IndexDomain::ScrapedItems, &[0.0, 0.0], 5, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_fails_fast() {
        let index = FlatIndex::new(3);
        let err = index
            .upsert(IndexDomain::ScrapedItems, "x", &[1.0, 0.0], json!({}), "")
            .unwrap_err();
        assert!(err.is_integrity());

        let err = index.search(IndexDomain::ScrapedItems, &[1.0; 4], 5, 0.0).unwrap_err();
        assert!(err.is_integrity());
    }
}
