//! Trending topics detected from clusters of scraped items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Editorial category of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicCategory {
    Stocks,
    Metals,
    Sharia,
}

impl TopicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicCategory::Stocks => "stocks",
            TopicCategory::Metals => "metals",
            TopicCategory::Sharia => "sharia",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stocks" => Some(TopicCategory::Stocks),
            "metals" => Some(TopicCategory::Metals),
            "sharia" => Some(TopicCategory::Sharia),
            _ => None,
        }
    }
}

impl std::fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted trend aggregate, keyed by its `topic` label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingTopic {
    /// Human-readable label, unique across topics
    pub topic: String,
    pub category: TopicCategory,
    #[serde(default)]
    pub related_symbols: Vec<String>,
    #[serde(default)]
    pub related_metals: Vec<String>,
    /// Number of clustered items behind this topic
    pub mention_count: usize,
    /// Distinct source types that mentioned the topic
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub source_urls: Vec<String>,
    /// Scraped items the cluster was built from
    #[serde(default)]
    pub item_ids: Vec<String>,
    /// Heuristic trend strength in [0, 1]
    pub trending_score: f64,
    pub detected_at: DateTime<Utc>,
    /// Article ids generated for this topic (append-only)
    #[serde(default)]
    pub articles_generated: Vec<String>,
}

impl TrendingTopic {
    pub fn has_article(&self) -> bool {
        !self.articles_generated.is_empty()
    }

    /// Instrument the topic is primarily about, preferring symbols over metals
    pub fn primary_instrument(&self) -> Option<&str> {
        self.related_symbols
            .first()
            .or_else(|| self.related_metals.first())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        assert_eq!(TopicCategory::parse("Metals"), Some(TopicCategory::Metals));
        assert_eq!(TopicCategory::parse(" sharia "), Some(TopicCategory::Sharia));
        assert_eq!(TopicCategory::parse("crypto"), None);
        assert_eq!(TopicCategory::Stocks.to_string(), "stocks");
    }

    #[test]
    fn test_primary_instrument_prefers_symbols() {
        let mut topic = TrendingTopic {
            topic: "XYZ — Latest Market Updates".to_string(),
            category: TopicCategory::Stocks,
            related_symbols: vec!["XYZ".to_string()],
            related_metals: vec!["gold".to_string()],
            mention_count: 3,
            sources: vec![],
            source_urls: vec![],
            item_ids: vec![],
            trending_score: 0.8,
            detected_at: Utc::now(),
            articles_generated: vec![],
        };
        assert_eq!(topic.primary_instrument(), Some("XYZ"));
        topic.related_symbols.clear();
        assert_eq!(topic.primary_instrument(), Some("gold"));
        assert!(!topic.has_article());
    }
}
