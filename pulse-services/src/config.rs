//! Pipeline configuration
//!
//! Every section has defaults; a JSON file may override any subset of
//! fields and `PULSE_*` environment variables override the result.

use std::path::Path;
use std::str::FromStr;

use pulse_core::{PulseError, PulseResult};
use pulse_embedding::EmbeddingAdapterConfig;
use pulse_research::GeneratorConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Deduplication and clustering thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Similarity at or above which an item is a near-duplicate
    pub dedup_threshold: f64,
    /// Similarity at or above which an item joins a seed's cluster
    pub cluster_threshold: f64,
    /// Smaller clusters are noise
    pub min_cluster_size: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: 0.85,
            cluster_threshold: 0.75,
            min_cluster_size: 2,
        }
    }
}

/// Trending-score calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Item count that saturates the volume term
    pub item_ref: f64,
    /// Distinct source types that saturate the diversity term
    pub source_ref: f64,
    /// Weighted engagement that saturates the engagement term
    pub engagement_ref: f64,
    pub item_weight: f64,
    pub source_weight: f64,
    pub engagement_weight: f64,
    pub recency_weight: f64,
    /// Clusters must score strictly above this to become topics
    pub trend_score_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            item_ref: 5.0,
            source_ref: 3.0,
            engagement_ref: 100.0,
            item_weight: 0.3,
            source_weight: 0.2,
            engagement_weight: 0.3,
            recency_weight: 0.2,
            trend_score_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub min_length: usize,
    /// Generic topics need at least this many supporting facts
    pub generic_min_facts: usize,
    pub generic_topics: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_length: 4,
            generic_min_facts: 3,
            generic_topics: [
                "general",
                "market update",
                "market updates",
                "news",
                "latest news",
                "update",
                "markets",
                "stocks",
                "trending",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub embedding: EmbeddingAdapterConfig,
    pub dedup: DedupConfig,
    pub scoring: ScoringConfig,
    pub validator: ValidatorConfig,
    pub generator: GeneratorConfig,
    pub limits: RunLimits,
}

/// Per-tick work caps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    pub max_items_per_run: usize,
    pub max_articles_per_run: usize,
    /// Items published before this many hours ago are ignored by detection
    pub detection_window_hours: i64,
    /// Minimum spacing between text-generation calls
    pub generation_interval_ms: u64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_items_per_run: 500,
            max_articles_per_run: 5,
            detection_window_hours: 24,
            generation_interval_ms: 1000,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> PulseResult<Option<T>> {
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| PulseError::config(format!("{} has an invalid value: {:?}", name, raw))),
        _ => Ok(None),
    }
}

impl PipelineConfig {
    /// Defaults with `PULSE_*` environment overrides
    pub fn from_env() -> PulseResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load a JSON config file, then apply `PULSE_*` environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> PulseResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PulseError::config(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let mut config: Self = serde_json::from_str(&raw)
            .map_err(|e| PulseError::config(format!("Invalid config file: {}", e)))?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> PulseResult<()> {
        if let Some(v) = parse_var(&lookup, "PULSE_DEDUP_THRESHOLD")? {
            self.dedup.dedup_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "PULSE_CLUSTER_THRESHOLD")? {
            self.dedup.cluster_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "PULSE_TREND_SCORE_THRESHOLD")? {
            self.scoring.trend_score_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "PULSE_EMBEDDING_DIMENSION")? {
            self.embedding.dimension = v;
        }
        if let Some(v) = parse_var(&lookup, "PULSE_DETECTION_WINDOW_HOURS")? {
            self.limits.detection_window_hours = v;
        }
        if let Some(v) = parse_var(&lookup, "PULSE_MAX_ARTICLES_PER_RUN")? {
            self.limits.max_articles_per_run = v;
        }
        if let Some(v) = parse_var(&lookup, "PULSE_HUMANIZE")? {
            self.generator.humanize = v;
        }
        debug!(?self, "Configuration overrides applied");
        self.validate()
    }

    pub fn validate(&self) -> PulseResult<()> {
        let in_unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(PulseError::config(format!("{} must be within [0, 1], got {}", name, v)))
            }
        };
        in_unit("dedup_threshold", self.dedup.dedup_threshold)?;
        in_unit("cluster_threshold", self.dedup.cluster_threshold)?;
        in_unit("trend_score_threshold", self.scoring.trend_score_threshold)?;

        if self.embedding.dimension == 0 {
            return Err(PulseError::config("embedding dimension must be positive"));
        }
        if self.dedup.min_cluster_size == 0 {
            return Err(PulseError::config("min_cluster_size must be at least 1"));
        }
        if self.limits.detection_window_hours <= 0 {
            return Err(PulseError::config("detection_window_hours must be positive"));
        }

        let weights = self.scoring.item_weight
            + self.scoring.source_weight
            + self.scoring.engagement_weight
            + self.scoring.recency_weight;
        if (weights - 1.0).abs() > 1e-6 {
            return Err(PulseError::config(format!(
                "scoring weights must sum to 1.0, got {}",
                weights
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.dedup.dedup_threshold, 0.85);
        assert_eq!(config.dedup.cluster_threshold, 0.75);
        assert_eq!(config.scoring.trend_score_threshold, 0.5);
        assert_eq!(config.limits.max_items_per_run, 500);
        assert_eq!(config.limits.max_articles_per_run, 5);
        assert_eq!(config.embedding.batch_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(lookup(&[
                ("PULSE_DEDUP_THRESHOLD", "0.9"),
                ("PULSE_EMBEDDING_DIMENSION", "256"),
                ("PULSE_HUMANIZE", "true"),
                ("PULSE_MAX_ARTICLES_PER_RUN", ""),
            ]))
            .unwrap();
        assert_eq!(config.dedup.dedup_threshold, 0.9);
        assert_eq!(config.embedding.dimension, 256);
        assert!(config.generator.humanize);
        assert_eq!(config.limits.max_articles_per_run, 5);
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_overrides(lookup(&[("PULSE_CLUSTER_THRESHOLD", "high")]))
            .unwrap_err();
        assert!(matches!(err, PulseError::Config(_)));

        let err = config
            .apply_overrides(lookup(&[("PULSE_TREND_SCORE_THRESHOLD", "1.5")]))
            .unwrap_err();
        assert!(matches!(err, PulseError::Config(_)));
    }

    #[test]
    fn test_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "dedup": { "dedup_threshold": 0.9 }, "limits": { "max_articles_per_run": 2 } }"#)
                .unwrap();
        assert_eq!(config.dedup.dedup_threshold, 0.9);
        assert_eq!(config.dedup.cluster_threshold, 0.75);
        assert_eq!(config.limits.max_articles_per_run, 2);
        assert_eq!(config.generator.min_words, 500);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.json");
        std::fs::write(&path, r#"{ "scoring": { "engagement_ref": 50.0 } }"#).unwrap();
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.scoring.engagement_ref, 50.0);
    }
}
