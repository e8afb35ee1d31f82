use chrono::{DateTime, Utc};
use pulse_core::{Article, ArticleSource, Faq, InstrumentSnapshot, ItemIndexMetadata};
use pulse_embedding::SimilarityMatch;
use serde::{Deserialize, Serialize};

/// A scraped snippet retrieved as supporting evidence for a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedFact {
    pub id: String,
    pub title: String,
    /// Indexed text of the snippet (title and body)
    pub text: String,
    pub source_url: String,
    pub source_domain: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub similarity: f64,
}

impl RetrievedFact {
    /// Build from a `scraped_items` match; unreadable metadata leaves the source blank
    pub fn from_match(m: SimilarityMatch) -> Self {
        let meta: ItemIndexMetadata = serde_json::from_value(m.metadata).unwrap_or_default();
        Self {
            id: m.id,
            title: meta.title,
            text: m.text,
            source_url: meta.source_url,
            source_domain: meta.source_domain,
            scraped_at: meta.scraped_at,
            similarity: m.similarity,
        }
    }

    /// Single-line rendering of the snippet for prompts and templates
    pub fn snippet(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Human-readable source label
    pub fn source_label(&self) -> &str {
        match self.source_domain.as_deref() {
            Some(domain) if !domain.is_empty() => domain,
            _ if !self.source_url.is_empty() => &self.source_url,
            _ => "an unnamed source",
        }
    }

    pub fn to_source(&self, fallback_time: DateTime<Utc>) -> Option<ArticleSource> {
        if self.source_url.is_empty() {
            return None;
        }
        Some(ArticleSource {
            url: self.source_url.clone(),
            domain: self.source_domain.clone().unwrap_or_default(),
            title: self.title.clone(),
            scraped_at: self.scraped_at.unwrap_or(fallback_time),
        })
    }
}

/// An already-published article that looks like coverage of the same topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub id: String,
    pub title: String,
    pub similarity: f64,
}

impl RelatedArticle {
    pub fn from_match(m: SimilarityMatch) -> Self {
        let title = m
            .metadata
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            id: m.id,
            title,
            similarity: m.similarity,
        }
    }
}

/// Everything retrieved for one topic before drafting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchContext {
    pub topic: String,
    /// Symbol or metal the topic is about, if any
    pub subject: Option<String>,
    pub facts: Vec<RetrievedFact>,
    pub related_articles: Vec<RelatedArticle>,
    pub snapshot: Option<InstrumentSnapshot>,
}

impl ResearchContext {
    /// Display name for the topic's subject
    pub fn subject_name(&self) -> String {
        match &self.subject {
            Some(subject) => display_name(subject),
            None => self.topic.clone(),
        }
    }
}

/// Symbols stay upper-case, metals are capitalised
pub fn display_name(instrument: &str) -> String {
    if instrument.chars().any(|c| c.is_ascii_uppercase()) {
        return instrument.to_string();
    }
    let mut chars = instrument.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Stages a topic passes through on its way to a stored article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Validated,
    ContextRetrieved,
    Drafted,
    Humanized,
    MetadataEnriched,
    ImageAttached,
    Stored,
}

/// Title and body produced by the model or the template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub used_fallback: bool,
}

/// Structured enrichment attached to an article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub tldr: Vec<String>,
    pub faqs: Vec<Faq>,
    pub tags: Vec<String>,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
}

impl ArticleMetadata {
    pub fn is_empty(&self) -> bool {
        self.tldr.is_empty()
            && self.faqs.is_empty()
            && self.tags.is_empty()
            && self.entities.is_empty()
            && self.topics.is_empty()
    }
}

/// Outcome of parsing the model's metadata block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMetadata {
    Parsed(ArticleMetadata),
    Fallback,
}

/// An article ready for persistence, plus how it was produced
#[derive(Debug, Clone)]
pub struct GeneratedArticle {
    pub article: Article,
    pub stages: Vec<GenerationStage>,
    pub used_fallback: bool,
    pub context: ResearchContext,
}

impl GeneratedArticle {
    pub fn reached(&self, stage: GenerationStage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn mark(&mut self, stage: GenerationStage) {
        if !self.reached(stage) {
            self.stages.push(stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fact_from_match() {
        let m = SimilarityMatch {
            id: "a".to_string(),
            similarity: 0.9,
            metadata: json!({
                "title": "XYZ beats estimates",
                "source_url": "https://www.reuters.com/x",
                "source_domain": "reuters.com",
            }),
            text: "XYZ beats estimates\n  Revenue up 20%".to_string(),
        };
        let fact = RetrievedFact::from_match(m);
        assert_eq!(fact.title, "XYZ beats estimates");
        assert_eq!(fact.source_label(), "reuters.com");
        assert_eq!(fact.snippet(), "XYZ beats estimates Revenue up 20%");
        assert!(fact.to_source(Utc::now()).is_some());
    }

    #[test]
    fn test_fact_with_unreadable_metadata() {
        let m = SimilarityMatch {
            id: "b".to_string(),
            similarity: 0.8,
            metadata: json!("not an object"),
            text: "text".to_string(),
        };
        let fact = RetrievedFact::from_match(m);
        assert_eq!(fact.source_label(), "an unnamed source");
        assert!(fact.to_source(Utc::now()).is_none());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("gold"), "Gold");
        assert_eq!(display_name("XYZ"), "XYZ");
        assert_eq!(display_name(""), "");
    }
}
