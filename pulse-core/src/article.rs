//! Generated long-form articles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topic::TopicCategory;

/// A scraped source cited by an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub url: String,
    pub domain: String,
    pub title: String,
    pub scraped_at: DateTime<Utc>,
}

/// Question/answer pair shown under an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// Header image attached to an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleImage {
    pub url: String,
    pub alt: String,
}

/// Final pipeline output, one per trending topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub title: String,
    /// URL-safe identifier derived from the title, unique across articles
    pub slug: String,
    /// Plain-text body, paragraphs separated by blank lines
    pub content: String,
    pub summary: String,
    pub category: TopicCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_symbol: Option<String>,
    #[serde(default)]
    pub sources: Vec<ArticleSource>,
    #[serde(default)]
    pub tldr: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Embedding of title + content
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ArticleImage>,
    pub word_count: usize,
    /// True when the body came from the deterministic template instead of the model
    #[serde(default)]
    pub used_fallback: bool,
    pub published_at: DateTime<Utc>,
}

impl Article {
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Text the article embedding is computed from
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }
}
