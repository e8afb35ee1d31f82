//! Trend detection tick
//!
//! Loads pending items, embeds what is missing, deduplicates, clusters,
//! scores, and upserts one topic per trending cluster. Each stored topic
//! is also indexed under its cluster's centroid.

use std::collections::HashMap;
use std::sync::Arc;

use pulse_core::{PulseError, PulseResult, ScrapedItem, TrendingTopic};
use pulse_embedding::{EmbeddingAdapter, IndexDomain, VectorStore, is_zero};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    clustering::{Clusterer, TrendCluster},
    config::PipelineConfig,
    dedup::Deduplicator,
    document_store::DocumentStore,
    run::{RunContext, RunSummary},
    scoring::TrendScorer,
};

pub struct DetectionService {
    documents: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embeddings: EmbeddingAdapter,
    config: PipelineConfig,
}

impl DetectionService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        embeddings: EmbeddingAdapter,
        config: PipelineConfig,
    ) -> Self {
        Self {
            documents,
            vectors,
            embeddings,
            config,
        }
    }

    /// One detection tick
    ///
    /// Data-integrity errors and connectivity loss abort the tick; a
    /// failed topic write is counted and the tick carries on.
    #[instrument(skip(self, ctx), fields(run_id = %ctx.run_id))]
    pub async fn run(&self, ctx: &RunContext) -> PulseResult<RunSummary> {
        let mut summary = RunSummary::start(ctx, "detect");

        let items = self
            .documents
            .pending_items(ctx.window_start(), self.config.limits.max_items_per_run)
            .map_err(|e| PulseError::unavailable(format!("Cannot load pending items: {}", e)))?;
        summary.items_loaded = items.len();
        info!("Detection started with {} pending items", items.len());

        if items.is_empty() {
            return Ok(summary.finish());
        }

        let items = self.ensure_embeddings(items, &mut summary).await?;

        let dedup = Deduplicator::new(self.vectors.clone(), self.config.dedup.dedup_threshold);
        let outcome = dedup.deduplicate(items).inspect_err(|e| {
            error!("Deduplication aborted: {}", e);
        })?;
        summary.duplicates = outcome.duplicates.len();

        let clusterer = Clusterer::new(&self.config.dedup);
        let clusters = clusterer.cluster(&outcome.survivors).inspect_err(|e| {
            error!("Clustering aborted: {}", e);
        })?;
        summary.clusters = clusters.len();

        let scorer = TrendScorer::new(self.config.scoring.clone());
        let mut upserted: HashMap<String, f64> = HashMap::new();

        for cluster in &clusters {
            if ctx.is_expired() {
                warn!("Deadline reached, leaving remaining clusters for the next run");
                summary.deadline_hit = true;
                break;
            }

            let score = scorer.score(cluster, ctx);
            if !scorer.is_trending(score) {
                debug!(size = cluster.len(), score, "Cluster below trend threshold");
                summary.skipped += 1;
                continue;
            }

            let topic = scorer.to_topic(cluster, score);
            if upserted.get(&topic.topic).is_some_and(|&best| best >= score) {
                debug!(topic = %topic.topic, score, "Weaker cluster for an existing label");
                summary.skipped += 1;
                continue;
            }

            match self.documents.upsert_topic(&topic) {
                Ok(()) => {
                    info!(topic = %topic.topic, score, mentions = topic.mention_count, "Trending topic upserted");
                    upserted.insert(topic.topic.clone(), score);
                    summary.processed += 1;
                    self.index_topic(&topic, cluster)?;
                }
                Err(e) => {
                    warn!(topic = %topic.topic, "Failed to store topic: {}", e);
                    summary.errors += 1;
                }
            }
        }

        let summary = summary.finish();
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            duplicates = summary.duplicates,
            "Detection finished"
        );
        Ok(summary)
    }

    /// Index the topic under its cluster centroid; a dimension clash is fatal
    fn index_topic(&self, topic: &TrendingTopic, cluster: &TrendCluster) -> PulseResult<()> {
        let Some(centroid) = cluster.centroid() else {
            return Ok(());
        };
        let metadata = json!({
            "category": topic.category,
            "trending_score": topic.trending_score,
            "mention_count": topic.mention_count,
            "detected_at": topic.detected_at,
        });
        self.vectors
            .upsert(IndexDomain::Topics, &topic.topic, &centroid, metadata, &topic.topic)
            .map_err(PulseError::from)
    }

    /// Reuse stored embeddings of the right dimension, compute the rest
    ///
    /// New non-zero embeddings are checkpointed onto the items right away.
    async fn ensure_embeddings(
        &self,
        mut items: Vec<ScrapedItem>,
        summary: &mut RunSummary,
    ) -> PulseResult<Vec<ScrapedItem>> {
        let dimension = self.embeddings.dimension();
        let missing: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.embedding.as_ref().is_none_or(|e| e.len() != dimension))
            .map(|(i, _)| i)
            .collect();

        if missing.is_empty() {
            return Ok(items);
        }

        let texts: Vec<String> = missing.iter().map(|&i| items[i].embedding_text()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await.map_err(|e| {
            let e = PulseError::from(e);
            error!("Embedding aborted: {}", e);
            e
        })?;

        if self.embeddings.is_unavailable() {
            return Err(PulseError::unavailable(format!(
                "Embedding provider failed {} times in a row",
                self.embeddings.consecutive_failures()
            )));
        }

        for (&pos, vector) in missing.iter().zip(vectors) {
            let item = &mut items[pos];
            if !is_zero(&vector) {
                if let Err(e) = self.documents.attach_embedding(&item.id, &vector) {
                    warn!(item = %item.id, "Failed to store embedding: {}", e);
                    summary.errors += 1;
                }
            }
            item.embedding = Some(vector);
        }

        debug!("Embedded {} items", missing.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use pulse_core::{Engagement, RelatedInstruments, SourceType};
    use pulse_embedding::{EmbeddingAdapterConfig, EmbeddingError, FlatIndex, TextEmbedder};

    use crate::document_store::SqliteDocumentStore;

    struct Down;

    #[async_trait]
    impl TextEmbedder for Down {
        fn dimension(&self) -> usize {
            3
        }
        async fn embed(&self, _text: &str) -> pulse_embedding::Result<Vec<f32>> {
            Err(EmbeddingError::Provider("connection refused".to_string()))
        }
        async fn embed_batch(&self, _texts: &[String]) -> pulse_embedding::Result<Vec<Vec<f32>>> {
            Err(EmbeddingError::Provider("connection refused".to_string()))
        }
    }

    fn item(id: &str) -> ScrapedItem {
        let at = Utc::now() - Duration::minutes(5);
        ScrapedItem {
            id: id.to_string(),
            title: format!("XYZ headline {}", id),
            body: String::new(),
            source_type: SourceType::Feed,
            source_url: format!("https://example.com/{}", id),
            published_at: at,
            scraped_at: at,
            related_instruments: RelatedInstruments::default(),
            engagement: Engagement::default(),
            embedding: None,
            processed: false,
        }
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let documents = Arc::new(SqliteDocumentStore::new_in_memory().unwrap());
        let adapter = EmbeddingAdapter::new(
            Arc::new(Down),
            EmbeddingAdapterConfig {
                dimension: 3,
                ..Default::default()
            },
        )
        .unwrap();
        let service = DetectionService::new(
            documents,
            Arc::new(FlatIndex::new(3)),
            adapter,
            PipelineConfig::default(),
        );

        let summary = service.run(&RunContext::new(24)).await.unwrap();
        assert_eq!(summary.items_loaded, 0);
        assert!(summary.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_provider_outage_aborts_run() {
        let documents = Arc::new(SqliteDocumentStore::new_in_memory().unwrap());
        let items: Vec<_> = (0..25).map(|i| item(&i.to_string())).collect();
        documents.upsert_items(&items).unwrap();

        let adapter = EmbeddingAdapter::new(
            Arc::new(Down),
            EmbeddingAdapterConfig {
                dimension: 3,
                batch_size: 5,
                max_consecutive_failures: 3,
            },
        )
        .unwrap();
        let service = DetectionService::new(
            documents.clone(),
            Arc::new(FlatIndex::new(3)),
            adapter,
            PipelineConfig::default(),
        );

        let err = service.run(&RunContext::new(24)).await.unwrap_err();
        assert!(matches!(err, PulseError::Unavailable(_)));
        // Zero vectors are never checkpointed
        let pending = documents.pending_items(Utc::now() - Duration::hours(1), 100).unwrap();
        assert!(pending.iter().all(|i| i.embedding.is_none()));
    }
}
