//! Retrieval-augmented article generation for one trending topic

use std::sync::Arc;

use chrono::Utc;
use pulse_core::{
    Article, ArticleImage, ArticleSource, InstrumentRegistry, PulseResult, TopicCategory,
    TrendingTopic,
};
use pulse_embedding::{EmbeddingAdapter, IndexDomain, VectorStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cleanup::{
    ensure_min_words, extract_title, slugify, strip_markup, summarize, word_count,
};
use crate::images::ImageSearch;
use crate::metadata::{fallback_metadata, merge, parse_metadata};
use crate::openai::TextGenerator;
use crate::prompt::{build_article_prompt, build_humanize_prompt, build_metadata_prompt};
use crate::template::{fallback_article, padding_paragraphs, template_title};
use crate::types::{
    ArticleMetadata, Draft, GeneratedArticle, GenerationStage, ParsedMetadata, RelatedArticle,
    ResearchContext, RetrievedFact,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Supporting snippets retrieved per topic
    pub fact_limit: usize,
    pub fact_min_similarity: f64,
    /// Existing articles checked for overlapping coverage
    pub related_limit: usize,
    pub related_min_similarity: f64,
    /// Minimum words in a published article
    pub min_words: usize,
    /// Model drafts shorter than this are discarded in favour of the template
    pub min_draft_words: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Run a second rewriting pass over model drafts
    pub humanize: bool,
    pub humanize_temperature: f32,
    pub metadata_max_tokens: u32,
    pub metadata_temperature: f32,
    pub summary_max_chars: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fact_limit: 10,
            fact_min_similarity: 0.7,
            related_limit: 5,
            related_min_similarity: 0.8,
            min_words: 500,
            min_draft_words: 50,
            max_tokens: 2500,
            temperature: 0.7,
            humanize: false,
            humanize_temperature: 0.9,
            metadata_max_tokens: 800,
            metadata_temperature: 0.3,
            summary_max_chars: 300,
        }
    }
}

/// Turns a validated topic into a complete article
///
/// Every external call is best effort except retrieval against the vector
/// store, whose failures (dimension mismatches in particular) propagate.
pub struct ContentGenerator {
    vectors: Arc<dyn VectorStore>,
    embedder: EmbeddingAdapter,
    text: Arc<dyn TextGenerator>,
    instruments: Arc<dyn InstrumentRegistry>,
    images: Option<Arc<dyn ImageSearch>>,
    config: GeneratorConfig,
}

impl ContentGenerator {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        embedder: EmbeddingAdapter,
        text: Arc<dyn TextGenerator>,
        instruments: Arc<dyn InstrumentRegistry>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            vectors,
            embedder,
            text,
            instruments,
            images: None,
            config,
        }
    }

    pub fn with_images(mut self, images: Arc<dyn ImageSearch>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Gather supporting facts, overlapping coverage and market data
    #[instrument(skip(self, topic), fields(topic = %topic.topic))]
    pub async fn retrieve_context(&self, topic: &TrendingTopic) -> PulseResult<ResearchContext> {
        let query = self.embedder.embed(&topic.topic).await?;

        let facts: Vec<RetrievedFact> = self
            .vectors
            .search(
                IndexDomain::ScrapedItems,
                &query,
                self.config.fact_limit,
                self.config.fact_min_similarity,
            )?
            .into_iter()
            .map(RetrievedFact::from_match)
            .collect();

        let related_articles: Vec<RelatedArticle> = self
            .vectors
            .search(
                IndexDomain::Articles,
                &query,
                self.config.related_limit,
                self.config.related_min_similarity,
            )?
            .into_iter()
            .map(RelatedArticle::from_match)
            .collect();

        for related in &related_articles {
            info!(
                article_id = %related.id,
                title = %related.title,
                similarity = related.similarity,
                "Existing article covers a similar topic"
            );
        }

        let subject = topic.primary_instrument().map(str::to_string);
        let snapshot = match &subject {
            Some(symbol) => match self.instruments.get_snapshot(symbol).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Instrument lookup failed");
                    None
                }
            },
            None => None,
        };

        debug!(
            facts = facts.len(),
            related = related_articles.len(),
            has_snapshot = snapshot.is_some(),
            "Context retrieved"
        );

        Ok(ResearchContext {
            topic: topic.topic.clone(),
            subject,
            facts,
            related_articles,
            snapshot,
        })
    }

    /// Model draft, or the template article when the model cannot deliver
    #[instrument(skip(self, context), fields(topic = %context.topic))]
    pub async fn draft(&self, context: &ResearchContext, category: TopicCategory) -> Draft {
        let prompt = build_article_prompt(context, category, self.config.min_words);
        let result = self
            .text
            .generate(&prompt, self.config.max_tokens, self.config.temperature)
            .await;

        let draft = match result {
            Ok(raw) => self.finish_draft(&raw, context, category),
            Err(e) => {
                warn!(error = %e, "Drafting failed, using template article");
                None
            }
        };

        draft.unwrap_or_else(|| fallback_article(context, category, self.config.min_words))
    }

    fn finish_draft(
        &self,
        raw: &str,
        context: &ResearchContext,
        category: TopicCategory,
    ) -> Option<Draft> {
        let (title, body) = extract_title(raw);
        let body = strip_markup(&body);

        let words = word_count(&body);
        if words < self.config.min_draft_words {
            warn!(words, "Draft too short, using template article");
            return None;
        }

        let content = if words < self.config.min_words {
            debug!(words, "Padding short draft");
            ensure_min_words(
                &body,
                self.config.min_words,
                &padding_paragraphs(context, category),
            )
        } else {
            body
        };

        let title = title
            .map(|t| strip_markup(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| template_title(context));

        Some(Draft {
            title,
            content,
            used_fallback: false,
        })
    }

    /// Rewrite a model draft; `None` keeps the original
    async fn humanize(&self, draft: &Draft) -> Option<Draft> {
        let prompt = build_humanize_prompt(&draft.title, &draft.content, self.config.min_words);
        let raw = match self
            .text
            .generate(&prompt, self.config.max_tokens, self.config.humanize_temperature)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Humanize pass failed, keeping draft");
                return None;
            }
        };

        let (_, body) = extract_title(&raw);
        let content = strip_markup(&body);
        if word_count(&content) < self.config.min_words {
            debug!("Humanized text below minimum length, keeping draft");
            return None;
        }

        Some(Draft {
            title: draft.title.clone(),
            content,
            used_fallback: false,
        })
    }

    async fn enrich_metadata(
        &self,
        draft: &Draft,
        context: &ResearchContext,
        instruments: &[String],
        category: TopicCategory,
    ) -> ArticleMetadata {
        let fallback = fallback_metadata(
            &draft.title,
            &draft.content,
            &context.subject_name(),
            instruments,
            category,
        );

        let prompt = build_metadata_prompt(&draft.title, &draft.content);
        let parsed = match self
            .text
            .generate(
                &prompt,
                self.config.metadata_max_tokens,
                self.config.metadata_temperature,
            )
            .await
        {
            Ok(raw) => parse_metadata(&raw),
            Err(e) => {
                warn!(error = %e, "Metadata call failed, using derived metadata");
                ParsedMetadata::Fallback
            }
        };

        if parsed == ParsedMetadata::Fallback {
            debug!("No usable metadata in model output");
        }
        merge(parsed, fallback)
    }

    async fn find_image(
        &self,
        context: &ResearchContext,
        category: TopicCategory,
    ) -> Option<ArticleImage> {
        let images = self.images.as_ref()?;
        let query = image_query(context, category);
        match images.search(&query).await {
            Ok(image) => image,
            Err(e) => {
                warn!(query = %query, error = %e, "Image search failed");
                None
            }
        }
    }

    /// Run every generation stage for a topic that already passed validation
    #[instrument(skip(self, topic), fields(topic = %topic.topic))]
    pub async fn generate(&self, topic: &TrendingTopic) -> PulseResult<GeneratedArticle> {
        let mut stages = vec![GenerationStage::Validated];

        let context = self.retrieve_context(topic).await?;
        stages.push(GenerationStage::ContextRetrieved);

        let mut draft = self.draft(&context, topic.category).await;
        stages.push(GenerationStage::Drafted);

        if self.config.humanize && !draft.used_fallback {
            if let Some(humanized) = self.humanize(&draft).await {
                draft = humanized;
                stages.push(GenerationStage::Humanized);
            }
        }

        let instruments: Vec<String> = topic
            .related_symbols
            .iter()
            .chain(topic.related_metals.iter())
            .cloned()
            .collect();
        let metadata = self
            .enrich_metadata(&draft, &context, &instruments, topic.category)
            .await;
        stages.push(GenerationStage::MetadataEnriched);

        let image = self.find_image(&context, topic.category).await;
        if image.is_some() {
            stages.push(GenerationStage::ImageAttached);
        }

        let now = Utc::now();
        let article = Article {
            id: Article::new_id(),
            slug: slugify(&draft.title),
            summary: summarize(&draft.content, 2, self.config.summary_max_chars),
            word_count: word_count(&draft.content),
            category: topic.category,
            related_symbol: topic.primary_instrument().map(str::to_string),
            sources: collect_sources(&context.facts, &topic.source_urls, now),
            tldr: metadata.tldr,
            faqs: metadata.faqs,
            tags: metadata.tags,
            entities: metadata.entities,
            topics: metadata.topics,
            embedding: Vec::new(),
            image,
            used_fallback: draft.used_fallback,
            published_at: now,
            title: draft.title,
            content: draft.content,
        };

        info!(
            title = %article.title,
            words = article.word_count,
            fallback = article.used_fallback,
            "Article generated"
        );

        Ok(GeneratedArticle {
            used_fallback: article.used_fallback,
            article,
            stages,
            context,
        })
    }
}

fn image_query(context: &ResearchContext, category: TopicCategory) -> String {
    match (&context.subject, category) {
        (Some(metal), TopicCategory::Metals) => format!("{} bullion", metal.to_lowercase()),
        (_, TopicCategory::Metals) => "precious metals".to_string(),
        (_, TopicCategory::Sharia) => "islamic finance".to_string(),
        (_, TopicCategory::Stocks) => "stock market trading".to_string(),
    }
}

/// Article sources: retrieved facts first, then the topic's own URLs
fn collect_sources(
    facts: &[RetrievedFact],
    topic_urls: &[String],
    now: chrono::DateTime<Utc>,
) -> Vec<ArticleSource> {
    let mut sources: Vec<ArticleSource> = Vec::new();
    for source in facts.iter().filter_map(|f| f.to_source(now)) {
        if !sources.iter().any(|s| s.url == source.url) {
            sources.push(source);
        }
    }
    for url in topic_urls {
        if url.is_empty() || sources.iter().any(|s| &s.url == url) {
            continue;
        }
        let domain = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .unwrap_or_default();
        sources.push(ArticleSource {
            url: url.clone(),
            domain,
            title: String::new(),
            scraped_at: now,
        });
    }
    sources
}
