//! Scraped snippets about financial instruments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of source a snippet was scraped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Social posts (forums, microblogs)
    Social,
    /// RSS/Atom feed entries
    Feed,
    /// Articles scraped from news sites
    Site,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Social => "social",
            SourceType::Feed => "feed",
            SourceType::Site => "site",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruments a snippet mentions, as tagged by the scraper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInstruments {
    /// Equity ticker symbols (e.g. "AAPL")
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Metal names (e.g. "gold", "silver")
    #[serde(default)]
    pub metals: Vec<String>,
}

impl RelatedInstruments {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.metals.is_empty()
    }
}

/// Engagement counters reported by the source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
}

impl Engagement {
    /// Weighted engagement: comments and shares count more than passive upvotes
    pub fn weighted(&self) -> u64 {
        self.upvotes + 2 * self.comments + 3 * self.shares
    }
}

impl std::ops::Add for Engagement {
    type Output = Engagement;

    fn add(self, other: Engagement) -> Engagement {
        Engagement {
            upvotes: self.upvotes + other.upvotes,
            comments: self.comments + other.comments,
            shares: self.shares + other.shares,
        }
    }
}

impl std::iter::Sum for Engagement {
    fn sum<I: Iterator<Item = Engagement>>(iter: I) -> Engagement {
        iter.fold(Engagement::default(), |acc, e| acc + e)
    }
}

/// A raw snippet produced by the scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedItem {
    /// Unique identifier (SHA-256 of the source URL unless the scraper supplies one)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub source_type: SourceType,
    pub source_url: String,
    pub published_at: DateTime<Utc>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub related_instruments: RelatedInstruments,
    #[serde(default)]
    pub engagement: Engagement,
    /// Embedding attached by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Set once an article cites this item
    #[serde(default)]
    pub processed: bool,
}

impl ScrapedItem {
    /// Derive a stable item id from its URL
    pub fn id_for_url(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Text the item is embedded from; empty when the item has no text at all
    pub fn embedding_text(&self) -> String {
        let title = self.title.trim();
        let body = self.body.trim();
        match (title.is_empty(), body.is_empty()) {
            (true, true) => String::new(),
            (false, true) => title.to_string(),
            (true, false) => body.to_string(),
            (false, false) => format!("{}\n{}", title, body),
        }
    }

    /// Host of the source URL, without a leading "www."
    pub fn source_domain(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.source_url).ok()?;
        let host = parsed.host_str()?;
        Some(host.trim_start_matches("www.").to_string())
    }
}

/// Metadata stored next to an item's vector in the similarity index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemIndexMetadata {
    pub title: String,
    pub source_url: String,
    pub source_domain: Option<String>,
    pub source_type: Option<SourceType>,
    pub published_at: Option<DateTime<Utc>>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub symbols: Vec<String>,
    pub metals: Vec<String>,
}

impl From<&ScrapedItem> for ItemIndexMetadata {
    fn from(item: &ScrapedItem) -> Self {
        Self {
            title: item.title.clone(),
            source_url: item.source_url.clone(),
            source_domain: item.source_domain(),
            source_type: Some(item.source_type),
            published_at: Some(item.published_at),
            scraped_at: Some(item.scraped_at),
            symbols: item.related_instruments.symbols.clone(),
            metals: item.related_instruments.metals.clone(),
        }
    }
}
