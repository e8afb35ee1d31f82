//! Fakes shared by the integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pulse_core::{
    Engagement, InstrumentKind, InstrumentSnapshot, PulseError, PulseResult, RelatedInstruments,
    ScrapedItem, SourceType,
};
use pulse_embedding::{EmbeddingAdapter, EmbeddingAdapterConfig, EmbeddingVector, TextEmbedder};
use pulse_research::TextGenerator;
use pulse_services::{PipelineConfig, StaticInstrumentRegistry};

pub const DIMENSION: usize = 8;

/// Sums one fixed vector per keyword found in the text
///
/// Instruments get a full unit axis and each "flavour" word a half axis,
/// so two items about the same instrument with different flavours have
/// cosine similarity 1 / 1.25 = 0.8.
pub struct KeywordEmbedder;

const KEYWORDS: [(&str, usize, f32); 8] = [
    ("xyz", 0, 1.0),
    ("alpha", 1, 0.5),
    ("beta", 2, 0.5),
    ("gamma", 3, 0.5),
    ("gold", 4, 1.0),
    ("delta", 5, 0.5),
    ("epsilon", 6, 0.5),
    ("abc", 7, 1.0),
];

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut vector = vec![0.0; DIMENSION];
    for (word, axis, weight) in KEYWORDS {
        if lower.contains(word) {
            vector[axis] += weight;
        }
    }
    vector
}

#[async_trait]
impl TextEmbedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> pulse_embedding::Result<EmbeddingVector> {
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> pulse_embedding::Result<Vec<EmbeddingVector>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

pub fn adapter() -> EmbeddingAdapter {
    EmbeddingAdapter::new(
        Arc::new(KeywordEmbedder),
        EmbeddingAdapterConfig {
            dimension: DIMENSION,
            ..Default::default()
        },
    )
    .unwrap()
}

/// Every call fails, as if the provider were over quota
#[derive(Default)]
pub struct FailingGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _: &str, _: u32, _: f32) -> PulseResult<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(PulseError::api("quota exceeded"))
    }
}

/// Returns the same reply for every prompt
pub struct FixedGenerator {
    pub reply: String,
}

impl FixedGenerator {
    /// A well-formed draft titled `title`
    pub fn draft(title: &str) -> Self {
        let sentence = "Traders weighed fresh guidance against a cautious macro backdrop today. ";
        Self {
            reply: format!("TITLE: {}\n\n{}", title, sentence.repeat(55)),
        }
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, _: &str, _: u32, _: f32) -> PulseResult<String> {
        Ok(self.reply.clone())
    }
}

pub fn registry() -> Arc<StaticInstrumentRegistry> {
    Arc::new(StaticInstrumentRegistry::from_snapshots(vec![
        InstrumentSnapshot {
            symbol: "XYZ".to_string(),
            kind: InstrumentKind::Stock,
            price: 42.0,
            change: 1.2,
            change_percent: 2.9,
            market_cap: Some(12_000_000_000.0),
        },
        InstrumentSnapshot {
            symbol: "gold".to_string(),
            kind: InstrumentKind::Metal,
            price: 2400.0,
            change: -3.0,
            change_percent: -0.1,
            market_cap: None,
        },
    ]))
}

/// Config for tests: no spacing between generation calls
pub fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.embedding.dimension = DIMENSION;
    config.limits.generation_interval_ms = 0;
    config
}

pub fn item(
    id: &str,
    title: &str,
    minutes_ago: i64,
    source: SourceType,
    upvotes: u64,
    symbols: &[&str],
    metals: &[&str],
) -> ScrapedItem {
    let at = Utc::now() - Duration::minutes(minutes_ago);
    ScrapedItem {
        id: id.to_string(),
        title: title.to_string(),
        body: String::new(),
        source_type: source,
        source_url: format!("https://news.example.com/{}", id),
        published_at: at,
        scraped_at: at,
        related_instruments: RelatedInstruments {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            metals: metals.iter().map(|s| s.to_string()).collect(),
        },
        engagement: Engagement {
            upvotes,
            comments: 0,
            shares: 0,
        },
        embedding: None,
        processed: false,
    }
}

/// Three XYZ items (weighted engagement 120) and two gold items (10)
pub fn market_items() -> Vec<ScrapedItem> {
    vec![
        item("x1", "XYZ beats estimates alpha", 50, SourceType::Social, 40, &["XYZ"], &[]),
        item("g1", "Gold edges higher delta", 45, SourceType::Feed, 5, &[], &["gold"]),
        item("x2", "XYZ raises guidance beta", 40, SourceType::Feed, 40, &["XYZ"], &[]),
        item("g2", "Gold demand steady epsilon", 35, SourceType::Feed, 5, &[], &["gold"]),
        item("x3", "XYZ analysts upgrade gamma", 30, SourceType::Site, 40, &["XYZ"], &[]),
    ]
}
