//! Article generation tick
//!
//! Validates pending topics, runs the content generator, and persists
//! the result. At most one article is linked per topic; a slug that is
//! already taken means the topic is already covered.

use std::sync::Arc;

use pulse_core::{Article, InstrumentRegistry, PulseError, PulseResult, TrendingTopic};
use pulse_embedding::{EmbeddingAdapter, IndexDomain, VectorStore};
use pulse_research::{ContentGenerator, GenerationStage, ImageSearch, TextGenerator};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::PipelineConfig,
    document_store::{DocumentStore, InsertOutcome},
    rate_limiter::{RateLimiter, ThrottledGenerator},
    run::{RunContext, RunSummary},
    validator::{TopicValidator, TopicVerdict},
};

/// What happened to one topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicOutcome {
    Stored { article_id: String, used_fallback: bool },
    /// An article with the same slug already exists
    AlreadyCovered { article_id: String },
}

pub struct GenerationService {
    documents: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embeddings: EmbeddingAdapter,
    registry: Arc<dyn InstrumentRegistry>,
    generator: ContentGenerator,
    config: PipelineConfig,
}

impl GenerationService {
    /// Text-generation calls are spaced by `limits.generation_interval_ms`
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        embeddings: EmbeddingAdapter,
        text: Arc<dyn TextGenerator>,
        registry: Arc<dyn InstrumentRegistry>,
        config: PipelineConfig,
    ) -> Self {
        let limiter = RateLimiter::for_generation(config.limits.generation_interval_ms);
        let throttled: Arc<dyn TextGenerator> = Arc::new(ThrottledGenerator::new(text, limiter));
        let generator = ContentGenerator::new(
            vectors.clone(),
            embeddings.clone(),
            throttled,
            registry.clone(),
            config.generator.clone(),
        );

        Self {
            documents,
            vectors,
            embeddings,
            registry,
            generator,
            config,
        }
    }

    pub fn with_images(mut self, images: Arc<dyn ImageSearch>) -> Self {
        self.generator = self.generator.with_images(images);
        self
    }

    /// One generation tick over the highest-scoring pending topics
    #[instrument(skip(self, ctx), fields(run_id = %ctx.run_id))]
    pub async fn run(&self, ctx: &RunContext) -> PulseResult<RunSummary> {
        let mut summary = RunSummary::start(ctx, "generate");

        let topics = self
            .documents
            .pending_topics(self.config.limits.max_articles_per_run)
            .map_err(|e| PulseError::unavailable(format!("Cannot load pending topics: {}", e)))?;
        info!("Generation started with {} pending topics", topics.len());

        if topics.is_empty() {
            return Ok(summary.finish());
        }

        let validator =
            TopicValidator::from_registry(self.config.validator.clone(), self.registry.as_ref()).await;

        for topic in &topics {
            if ctx.is_expired() {
                warn!("Deadline reached, leaving remaining topics for the next run");
                summary.deadline_hit = true;
                break;
            }
            if self.embeddings.is_unavailable() {
                return Err(PulseError::unavailable("Embedding provider unreachable"));
            }

            // The cluster's items are the topic's facts
            let verdict = validator.validate(
                &topic.topic,
                &topic.related_symbols,
                &topic.related_metals,
                topic.mention_count,
            );
            if let TopicVerdict::Rejected(reason) = verdict {
                info!(topic = %topic.topic, %reason, "Topic rejected");
                if let Err(e) = self.documents.reject_topic(&topic.topic, &reason.to_string()) {
                    warn!(topic = %topic.topic, "Failed to record rejection: {}", e);
                    summary.errors += 1;
                }
                summary.skipped += 1;
                continue;
            }

            match self.process_topic(topic).await {
                Ok(TopicOutcome::Stored { used_fallback, .. }) => {
                    summary.processed += 1;
                    if used_fallback {
                        summary.fallbacks += 1;
                    }
                }
                Ok(TopicOutcome::AlreadyCovered { .. }) => summary.skipped += 1,
                Err(e) if e.is_fatal() => {
                    error!(topic = %topic.topic, "Generation aborted: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(topic = %topic.topic, "Generation failed: {}", e);
                    summary.errors += 1;
                }
            }
        }

        let summary = summary.finish();
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            fallbacks = summary.fallbacks,
            "Generation finished"
        );
        Ok(summary)
    }

    /// Generate and persist one already-validated topic
    #[instrument(skip(self, topic), fields(topic = %topic.topic))]
    pub async fn process_topic(&self, topic: &TrendingTopic) -> PulseResult<TopicOutcome> {
        let mut generated = self.generator.generate(topic).await?;
        let mut article = generated.article.clone();
        article.embedding = self.embeddings.embed(&article.embedding_text()).await?;

        if let Some(existing) = self.documents.article_id_by_slug(&article.slug)? {
            return self.already_covered(topic, existing);
        }

        match self.documents.insert_article(&article)? {
            InsertOutcome::Inserted => {}
            InsertOutcome::DuplicateSlug => {
                let existing = self
                    .documents
                    .article_id_by_slug(&article.slug)?
                    .ok_or_else(|| PulseError::database(format!("slug {} vanished", article.slug)))?;
                return self.already_covered(topic, existing);
            }
        }
        generated.mark(GenerationStage::Stored);

        self.index_article(&article)?;
        self.documents.mark_items_processed(&topic.item_ids)?;
        if !self.documents.link_article(&topic.topic, &article.id)? {
            warn!(article = %article.id, "Article stored but not linked");
        }

        info!(
            article = %article.id,
            slug = %article.slug,
            stages = generated.stages.len(),
            "Article stored"
        );
        Ok(TopicOutcome::Stored {
            article_id: article.id,
            used_fallback: generated.used_fallback,
        })
    }

    fn already_covered(&self, topic: &TrendingTopic, existing: String) -> PulseResult<TopicOutcome> {
        debug!(article = %existing, "Slug already taken, consuming topic items");
        self.documents.mark_items_processed(&topic.item_ids)?;
        self.documents.link_article(&topic.topic, &existing)?;
        Ok(TopicOutcome::AlreadyCovered {
            article_id: existing,
        })
    }

    fn index_article(&self, article: &Article) -> PulseResult<()> {
        let metadata = json!({
            "title": article.title,
            "slug": article.slug,
            "category": article.category,
            "published_at": article.published_at,
        });
        self.vectors.upsert(
            IndexDomain::Articles,
            &article.id,
            &article.embedding,
            metadata,
            &article.embedding_text(),
        )?;
        Ok(())
    }
}
