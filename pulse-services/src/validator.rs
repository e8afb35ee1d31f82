//! Topic validation ahead of generation
//!
//! Runs before any model call. A rejection is a skip, not an error.

use std::collections::HashSet;

use pulse_core::InstrumentRegistry;
use serde::Serialize;
use tracing::warn;

use crate::config::ValidatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooShort,
    TooGeneric,
    UnknownInstrument,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectReason::TooShort => "topic too short",
            RejectReason::TooGeneric => "topic too generic for its evidence",
            RejectReason::UnknownInstrument => "topic names an unknown instrument",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicVerdict {
    Valid,
    Rejected(RejectReason),
}

impl TopicVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, TopicVerdict::Valid)
    }
}

pub struct TopicValidator {
    config: ValidatorConfig,
    /// Uppercased
    known_symbols: HashSet<String>,
    /// Lowercased
    known_metals: HashSet<String>,
}

impl TopicValidator {
    pub fn new(
        config: ValidatorConfig,
        known_symbols: impl IntoIterator<Item = String>,
        known_metals: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            config,
            known_symbols: known_symbols.into_iter().map(|s| s.to_uppercase()).collect(),
            known_metals: known_metals.into_iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// Load the known-instrument lists; a failing registry disables the instrument check
    pub async fn from_registry(config: ValidatorConfig, registry: &dyn InstrumentRegistry) -> Self {
        let symbols = registry.list_known_symbols().await.unwrap_or_else(|e| {
            warn!("Instrument registry unavailable, skipping symbol checks: {}", e);
            Vec::new()
        });
        let metals = registry.list_known_metals().await.unwrap_or_else(|e| {
            warn!("Instrument registry unavailable, skipping metal checks: {}", e);
            Vec::new()
        });
        Self::new(config, symbols, metals)
    }

    pub fn validate(
        &self,
        topic: &str,
        related_symbols: &[String],
        related_metals: &[String],
        fact_count: usize,
    ) -> TopicVerdict {
        let trimmed = topic.trim();
        if trimmed.chars().count() < self.config.min_length {
            return TopicVerdict::Rejected(RejectReason::TooShort);
        }

        let lowered = trimmed.to_lowercase();
        let generic = self.config.generic_topics.iter().any(|g| g.to_lowercase() == lowered);
        if generic && fact_count < self.config.generic_min_facts {
            return TopicVerdict::Rejected(RejectReason::TooGeneric);
        }

        let first = trimmed
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.');

        // Each list only gates its own kind; an empty list disables that check
        let names_symbol = looks_like_ticker(first)
            || related_symbols.iter().any(|s| s.eq_ignore_ascii_case(first));
        if names_symbol
            && !self.known_symbols.is_empty()
            && !self.known_symbols.contains(&first.to_uppercase())
        {
            return TopicVerdict::Rejected(RejectReason::UnknownInstrument);
        }

        let names_metal = related_metals.iter().any(|m| m.eq_ignore_ascii_case(first));
        if names_metal
            && !self.known_metals.is_empty()
            && !self.known_metals.contains(&first.to_lowercase())
        {
            return TopicVerdict::Rejected(RejectReason::UnknownInstrument);
        }

        TopicVerdict::Valid
    }
}

/// 1-5 uppercase letters with an optional `.X` share-class suffix
fn looks_like_ticker(token: &str) -> bool {
    let is_upper = |s: &str, max: usize| {
        !s.is_empty() && s.len() <= max && s.chars().all(|c| c.is_ascii_uppercase())
    };
    match token.split_once('.') {
        Some((base, suffix)) => is_upper(base, 5) && is_upper(suffix, 2),
        None => is_upper(token, 5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pulse_core::{InstrumentSnapshot, PulseError, PulseResult};

    fn validator(symbols: &[&str], metals: &[&str]) -> TopicValidator {
        TopicValidator::new(
            ValidatorConfig::default(),
            symbols.iter().map(|s| s.to_string()),
            metals.iter().map(|s| s.to_string()),
        )
    }

    #[test]
    fn test_short_and_generic_topics() {
        let v = validator(&[], &[]);
        assert_eq!(v.validate("PV", &[], &[], 0), TopicVerdict::Rejected(RejectReason::TooShort));
        assert_eq!(v.validate("  abc  ", &[], &[], 9), TopicVerdict::Rejected(RejectReason::TooShort));
        assert_eq!(
            v.validate("general", &[], &[], 2),
            TopicVerdict::Rejected(RejectReason::TooGeneric)
        );
        assert_eq!(
            v.validate("Market Updates", &[], &[], 0),
            TopicVerdict::Rejected(RejectReason::TooGeneric)
        );
        assert!(v.validate("general", &[], &[], 5).is_valid());
    }

    #[test]
    fn test_unknown_instrument() {
        let v = validator(&["XYZ", "BRK.B"], &["gold"]);
        let xyz = vec!["XYZ".to_string()];

        assert!(v.validate("XYZ — Latest Market Updates", &xyz, &[], 3).is_valid());
        assert!(v.validate("BRK.B — Latest Market Updates", &[], &[], 3).is_valid());
        assert_eq!(
            v.validate("QQQQ — Latest Market Updates", &[], &[], 3),
            TopicVerdict::Rejected(RejectReason::UnknownInstrument)
        );
        assert_eq!(
            v.validate("Zinc — Latest Market Updates", &[], &["zinc".to_string()], 3),
            TopicVerdict::Rejected(RejectReason::UnknownInstrument)
        );
        assert!(v.validate("Gold — Latest Market Updates", &[], &["gold".to_string()], 3).is_valid());
        assert!(v.validate("Fed holds rates steady", &[], &[], 3).is_valid());
    }

    #[test]
    fn test_empty_registry_skips_instrument_check() {
        let v = validator(&[], &[]);
        assert!(v.validate("QQQQ — Latest Market Updates", &[], &[], 3).is_valid());
    }

    #[test]
    fn test_metals_only_registry_leaves_tickers_alone() {
        let v = validator(&[], &["gold"]);
        assert!(v.validate("QQQQ — Latest Market Updates", &[], &[], 3).is_valid());
        assert_eq!(
            v.validate("Zinc — Latest Market Updates", &[], &["zinc".to_string()], 3),
            TopicVerdict::Rejected(RejectReason::UnknownInstrument)
        );
    }

    #[test]
    fn test_symbols_only_registry_leaves_metals_alone() {
        let v = validator(&["XYZ"], &[]);
        assert!(v.validate("Zinc — Latest Market Updates", &[], &["zinc".to_string()], 3).is_valid());
        assert_eq!(
            v.validate("QQQQ — Latest Market Updates", &[], &[], 3),
            TopicVerdict::Rejected(RejectReason::UnknownInstrument)
        );
    }

    struct BrokenRegistry;

    #[async_trait]
    impl InstrumentRegistry for BrokenRegistry {
        async fn get_snapshot(&self, _: &str) -> PulseResult<Option<InstrumentSnapshot>> {
            Err(PulseError::network("down"))
        }
        async fn list_known_symbols(&self) -> PulseResult<Vec<String>> {
            Err(PulseError::network("down"))
        }
        async fn list_known_metals(&self) -> PulseResult<Vec<String>> {
            Err(PulseError::network("down"))
        }
    }

    #[tokio::test]
    async fn test_registry_failure_disables_check() {
        let v = TopicValidator::from_registry(ValidatorConfig::default(), &BrokenRegistry).await;
        assert!(v.validate("QQQQ — Latest Market Updates", &[], &[], 3).is_valid());
    }
}
