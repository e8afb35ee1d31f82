//! Near-duplicate detection over the scraped-item index
//!
//! Items are processed in scrape order. Each accepted item is indexed
//! immediately, so later items in the same batch dedup against it.

use std::sync::Arc;

use pulse_core::{ItemIndexMetadata, PulseError, PulseResult, ScrapedItem};
use pulse_embedding::{IndexDomain, VectorStore, is_zero};
use tracing::{debug, instrument};

/// How one item fared in deduplication
#[derive(Debug, Clone, PartialEq)]
pub enum DedupDecision {
    /// New and indexed
    Accepted,
    /// Indexed by an earlier run
    Known,
    /// Too close to an already indexed item
    Duplicate { of: String, similarity: f64 },
}

#[derive(Debug, Clone)]
pub struct DuplicateItem {
    pub item_id: String,
    pub duplicate_of: String,
    pub similarity: f64,
}

/// Result of one deduplication pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Accepted and known items, in scrape order
    pub survivors: Vec<ScrapedItem>,
    pub accepted: Vec<String>,
    pub known: Vec<String>,
    pub duplicates: Vec<DuplicateItem>,
}

/// Scrape order: `scraped_at` ascending, ties broken by id
pub fn sort_scrape_order(items: &mut [ScrapedItem]) {
    items.sort_by(|a, b| a.scraped_at.cmp(&b.scraped_at).then_with(|| a.id.cmp(&b.id)));
}

pub struct Deduplicator {
    vectors: Arc<dyn VectorStore>,
    threshold: f64,
}

impl Deduplicator {
    pub fn new(vectors: Arc<dyn VectorStore>, threshold: f64) -> Self {
        Self { vectors, threshold }
    }

    /// Classify one embedded item, indexing it when accepted
    pub fn check(&self, item: &ScrapedItem) -> PulseResult<DedupDecision> {
        let embedding = item.embedding.as_deref().ok_or_else(|| {
            PulseError::internal(format!("item {} reached dedup without an embedding", item.id))
        })?;

        if self.vectors.contains(IndexDomain::ScrapedItems, &item.id)? {
            return Ok(DedupDecision::Known);
        }

        // A zero vector matches nothing; leave it unindexed so a later run can re-embed it
        if is_zero(embedding) {
            return Ok(DedupDecision::Accepted);
        }

        let nearest = self
            .vectors
            .search(IndexDomain::ScrapedItems, embedding, 2, self.threshold)?
            .into_iter()
            .find(|m| m.id != item.id);

        if let Some(m) = nearest {
            return Ok(DedupDecision::Duplicate {
                of: m.id,
                similarity: m.similarity,
            });
        }

        let metadata = serde_json::to_value(ItemIndexMetadata::from(item))
            .map_err(|e| PulseError::internal(e.to_string()))?;
        self.vectors.upsert(
            IndexDomain::ScrapedItems,
            &item.id,
            embedding,
            metadata,
            &item.embedding_text(),
        )?;
        Ok(DedupDecision::Accepted)
    }

    /// Deduplicate a batch; any store error aborts the pass
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub fn deduplicate(&self, mut items: Vec<ScrapedItem>) -> PulseResult<DedupOutcome> {
        sort_scrape_order(&mut items);

        let mut outcome = DedupOutcome::default();
        for item in items {
            match self.check(&item)? {
                DedupDecision::Accepted => {
                    outcome.accepted.push(item.id.clone());
                    outcome.survivors.push(item);
                }
                DedupDecision::Known => {
                    outcome.known.push(item.id.clone());
                    outcome.survivors.push(item);
                }
                DedupDecision::Duplicate { of, similarity } => {
                    debug!(item = %item.id, duplicate_of = %of, similarity, "Near-duplicate discarded");
                    outcome.duplicates.push(DuplicateItem {
                        item_id: item.id,
                        duplicate_of: of,
                        similarity,
                    });
                }
            }
        }

        debug!(
            accepted = outcome.accepted.len(),
            known = outcome.known.len(),
            duplicates = outcome.duplicates.len(),
            "Deduplication finished"
        );
        Ok(outcome)
    }
}
