//! Trend scoring and topic labelling

use chrono::Utc;
use pulse_core::{TopicCategory, TrendingTopic};
use serde::Serialize;

use crate::clustering::TrendCluster;
use crate::config::ScoringConfig;
use crate::run::RunContext;

/// Per-term contributions, each already weighted
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub volume: f64,
    pub diversity: f64,
    pub engagement: f64,
    pub recency: f64,
    pub total: f64,
}

fn saturate(value: f64, reference: f64) -> f64 {
    if reference <= 0.0 {
        return 1.0;
    }
    (value / reference).clamp(0.0, 1.0)
}

pub struct TrendScorer {
    config: ScoringConfig,
}

impl TrendScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn breakdown(&self, cluster: &TrendCluster, ctx: &RunContext) -> ScoreBreakdown {
        let c = &self.config;
        let count = cluster.len() as f64;

        let recency = if cluster.is_empty() {
            0.0
        } else {
            let fresh = cluster
                .items
                .iter()
                .filter(|i| ctx.in_window(i.published_at))
                .count();
            fresh as f64 / count
        };

        let volume = c.item_weight * saturate(count, c.item_ref);
        let diversity = c.source_weight * saturate(cluster.source_types().len() as f64, c.source_ref);
        let engagement =
            c.engagement_weight * saturate(cluster.engagement().weighted() as f64, c.engagement_ref);
        let recency = c.recency_weight * recency;

        ScoreBreakdown {
            volume,
            diversity,
            engagement,
            recency,
            total: (volume + diversity + engagement + recency).clamp(0.0, 1.0),
        }
    }

    pub fn score(&self, cluster: &TrendCluster, ctx: &RunContext) -> f64 {
        self.breakdown(cluster, ctx).total
    }

    /// Strictly above the threshold
    pub fn is_trending(&self, score: f64) -> bool {
        score > self.config.trend_score_threshold
    }

    /// Most-mentioned symbol, else most-mentioned metal, else the seed's title
    pub fn label(&self, cluster: &TrendCluster) -> String {
        if let Some(symbol) = most_mentioned(&cluster.symbol_mentions()) {
            return format!("{} — Latest Market Updates", symbol);
        }
        if let Some(metal) = most_mentioned(&cluster.metal_mentions()) {
            return format!("{} — Latest Market Updates", capitalize(&metal));
        }
        cluster
            .seed()
            .map(|s| s.title.trim().to_string())
            .unwrap_or_default()
    }

    /// `metals` when any metal is referenced; `sharia` is never inferred
    pub fn category(&self, cluster: &TrendCluster) -> TopicCategory {
        if cluster.metal_mentions().is_empty() {
            TopicCategory::Stocks
        } else {
            TopicCategory::Metals
        }
    }

    pub fn to_topic(&self, cluster: &TrendCluster, score: f64) -> TrendingTopic {
        let by_count = |mentions: std::collections::BTreeMap<String, usize>| {
            let mut names: Vec<(String, usize)> = mentions.into_iter().collect();
            names.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            names.into_iter().map(|(name, _)| name).collect::<Vec<_>>()
        };

        TrendingTopic {
            topic: self.label(cluster),
            category: self.category(cluster),
            related_symbols: by_count(cluster.symbol_mentions()),
            related_metals: by_count(cluster.metal_mentions()),
            mention_count: cluster.len(),
            sources: cluster
                .source_types()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            source_urls: cluster.source_urls(),
            item_ids: cluster.item_ids(),
            trending_score: score,
            detected_at: Utc::now(),
            articles_generated: Vec::new(),
        }
    }
}

/// Highest count; ties go to the alphabetically first name
fn most_mentioned(mentions: &std::collections::BTreeMap<String, usize>) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (name, &count) in mentions {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.clone())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pulse_core::{Engagement, RelatedInstruments, ScrapedItem, SourceType};

    fn item(id: &str, symbols: &[&str], metals: &[&str], source: SourceType, upvotes: u64, hours_ago: i64) -> ScrapedItem {
        let at = Utc::now() - Duration::hours(hours_ago);
        ScrapedItem {
            id: id.to_string(),
            title: format!("Headline {}", id),
            body: String::new(),
            source_type: source,
            source_url: format!("https://example.com/{}", id),
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

    fn cluster(items: Vec<ScrapedItem>) -> TrendCluster {
        TrendCluster { items }
    }

    #[test]
    fn test_score_terms() {
        let scorer = TrendScorer::new(ScoringConfig::default());
        let ctx = RunContext::new(24);
        let c = cluster(vec![
            item("a", &["XYZ"], &[], SourceType::Social, 40, 1),
            item("b", &["XYZ"], &[], SourceType::Feed, 40, 2),
            item("c", &["XYZ"], &[], SourceType::Site, 40, 3),
        ]);

        let b = scorer.breakdown(&c, &ctx);
        assert!((b.volume - 0.18).abs() < 1e-9);
        assert!((b.diversity - 0.2).abs() < 1e-9);
        assert!((b.engagement - 0.3).abs() < 1e-9);
        assert!((b.recency - 0.2).abs() < 1e-9);
        assert!((b.total - 0.88).abs() < 1e-9);
        assert!(scorer.is_trending(b.total));
    }

    #[test]
    fn test_recency_is_fraction_in_window() {
        let scorer = TrendScorer::new(ScoringConfig::default());
        let ctx = RunContext::new(24);
        let c = cluster(vec![
            item("a", &[], &[], SourceType::Feed, 0, 1),
            item("b", &[], &[], SourceType::Feed, 0, 48),
        ]);
        assert!((scorer.breakdown(&c, &ctx).recency - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounded() {
        let scorer = TrendScorer::new(ScoringConfig::default());
        let ctx = RunContext::new(24);
        let huge: Vec<_> = (0..50)
            .map(|i| {
                let source = [SourceType::Social, SourceType::Feed, SourceType::Site][i % 3];
                item(&i.to_string(), &["XYZ"], &["gold"], source, 10_000, 0)
            })
            .collect();

        for c in [cluster(huge), cluster(vec![]), cluster(vec![item("x", &[], &[], SourceType::Feed, 0, 100)])] {
            let score = scorer.score(&c, &ctx);
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let scorer = TrendScorer::new(ScoringConfig::default());
        assert!(!scorer.is_trending(0.5));
        assert!(scorer.is_trending(0.5001));
    }

    #[test]
    fn test_labels() {
        let scorer = TrendScorer::new(ScoringConfig::default());

        let tie = cluster(vec![
            item("a", &["XYZ"], &[], SourceType::Feed, 0, 1),
            item("b", &["ABC"], &[], SourceType::Feed, 0, 1),
        ]);
        assert_eq!(scorer.label(&tie), "ABC — Latest Market Updates");

        let metals = cluster(vec![
            item("a", &[], &["silver", "gold"], SourceType::Feed, 0, 1),
            item("b", &[], &["gold"], SourceType::Feed, 0, 1),
        ]);
        assert_eq!(scorer.label(&metals), "Gold — Latest Market Updates");
        assert_eq!(scorer.category(&metals), TopicCategory::Metals);

        let bare = cluster(vec![
            item("a", &[], &[], SourceType::Feed, 0, 1),
            item("b", &[], &[], SourceType::Feed, 0, 1),
        ]);
        assert_eq!(scorer.label(&bare), "Headline a");
        assert_eq!(scorer.category(&bare), TopicCategory::Stocks);
    }

    #[test]
    fn test_to_topic() {
        let scorer = TrendScorer::new(ScoringConfig::default());
        let c = cluster(vec![
            item("a", &["XYZ", "ABC"], &["gold"], SourceType::Feed, 0, 1),
            item("b", &["XYZ"], &[], SourceType::Social, 0, 1),
        ]);
        let topic = scorer.to_topic(&c, 0.7);

        assert_eq!(topic.topic, "XYZ — Latest Market Updates");
        assert_eq!(topic.category, TopicCategory::Metals);
        assert_eq!(topic.related_symbols, vec!["XYZ", "ABC"]);
        assert_eq!(topic.related_metals, vec!["gold"]);
        assert_eq!(topic.mention_count, 2);
        assert_eq!(topic.sources, vec!["social", "feed"]);
        assert_eq!(topic.item_ids, vec!["a", "b"]);
        assert!(topic.articles_generated.is_empty());
    }
}
