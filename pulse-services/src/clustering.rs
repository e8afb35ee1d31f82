//! Greedy single-pass clustering
//!
//! Each unassigned item, in scrape order, seeds a cluster made of itself
//! plus every other unassigned item at least `cluster_threshold` similar
//! to the seed. Membership is decided against the seed only, so this is
//! not connected-component clustering.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use pulse_core::{Engagement, PulseResult, ScrapedItem, SourceType};
use pulse_embedding::{cosine_similarity, is_zero};
use tracing::{debug, instrument};

use crate::config::DedupConfig;

/// Items grouped around one seed
#[derive(Debug, Clone)]
pub struct TrendCluster {
    /// Seed first, then members in scrape order
    pub items: Vec<ScrapedItem>,
}

impl TrendCluster {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn seed(&self) -> Option<&ScrapedItem> {
        self.items.first()
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    /// Items mentioning each symbol (uppercased)
    pub fn symbol_mentions(&self) -> BTreeMap<String, usize> {
        self.mentions(|item| &item.related_instruments.symbols, |s| s.trim().to_uppercase())
    }

    /// Items mentioning each metal (lowercased)
    pub fn metal_mentions(&self) -> BTreeMap<String, usize> {
        self.mentions(|item| &item.related_instruments.metals, |m| m.trim().to_lowercase())
    }

    fn mentions(
        &self,
        field: impl Fn(&ScrapedItem) -> &Vec<String>,
        normalize: impl Fn(&str) -> String,
    ) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            let names: BTreeSet<String> = field(item)
                .iter()
                .map(|n| normalize(n.as_str()))
                .filter(|n| !n.is_empty())
                .collect();
            for name in names {
                *counts.entry(name).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn source_types(&self) -> BTreeSet<SourceType> {
        self.items.iter().map(|i| i.source_type).collect()
    }

    /// Distinct source URLs in item order
    pub fn source_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for item in &self.items {
            if !item.source_url.is_empty() && !urls.contains(&item.source_url) {
                urls.push(item.source_url.clone());
            }
        }
        urls
    }

    pub fn engagement(&self) -> Engagement {
        self.items.iter().map(|i| i.engagement).sum()
    }

    pub fn latest_published(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|i| i.published_at).max()
    }

    /// Mean of the members' non-zero embeddings; `None` when there are none
    pub fn centroid(&self) -> Option<Vec<f32>> {
        let mut vectors = self
            .items
            .iter()
            .filter_map(|i| i.embedding.as_deref())
            .filter(|e| !is_zero(e));

        let mut sum = vectors.next()?.to_vec();
        let mut count = 1.0_f32;
        for vector in vectors {
            for (acc, x) in sum.iter_mut().zip(vector) {
                *acc += x;
            }
            count += 1.0;
        }
        sum.iter_mut().for_each(|x| *x /= count);
        Some(sum)
    }
}

/// Candidates are the batch itself, never the wider index, so earlier
/// runs' items cannot crowd out this batch's members.
pub struct Clusterer {
    threshold: f64,
    min_cluster_size: usize,
}

impl Clusterer {
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            threshold: config.cluster_threshold,
            min_cluster_size: config.min_cluster_size,
        }
    }

    /// Partition `items` (already in scrape order) into clusters
    ///
    /// Clusters below the minimum size are dropped, so the result covers
    /// a subset of the input and no item appears twice.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub fn cluster(&self, items: &[ScrapedItem]) -> PulseResult<Vec<TrendCluster>> {
        let mut assigned = vec![false; items.len()];
        let mut clusters = Vec::new();

        for (seed_pos, seed) in items.iter().enumerate() {
            if assigned[seed_pos] {
                continue;
            }
            assigned[seed_pos] = true;

            let mut members = vec![seed_pos];
            if let Some(embedding) = seed.embedding.as_deref().filter(|e| !is_zero(e)) {
                for (pos, candidate) in items.iter().enumerate().skip(seed_pos + 1) {
                    if assigned[pos] {
                        continue;
                    }
                    let Some(other) = candidate.embedding.as_deref() else {
                        continue;
                    };
                    if cosine_similarity(embedding, other)? >= self.threshold {
                        assigned[pos] = true;
                        members.push(pos);
                    }
                }
            }

            if members.len() < self.min_cluster_size {
                debug!(seed = %seed.id, size = members.len(), "Cluster too small, discarded");
                continue;
            }

            debug!(seed = %seed.id, size = members.len(), "Cluster formed");
            clusters.push(TrendCluster {
                items: members.into_iter().map(|pos| items[pos].clone()).collect(),
            });
        }

        Ok(clusters)
    }
}
