//! Grounded Article Generation for Trending Market Topics
//!
//! This crate turns a validated trending topic into a long-form article:
//! it retrieves supporting snippets from the similarity store, drafts with a
//! language model, falls back to a deterministic template when the model
//! cannot deliver, and enriches the result with TL;DR points, FAQs, tags and
//! an optional header image.

pub mod cleanup;
pub mod generator;
pub mod images;
pub mod metadata;
pub mod openai;
pub mod prompt;
pub mod template;
pub mod types;

pub use generator::{ContentGenerator, GeneratorConfig};
pub use images::{ImageSearch, PexelsClient};
pub use openai::{OpenAIClient, TextGenerator};
pub use types::{
    ArticleMetadata, Draft, GeneratedArticle, GenerationStage, ParsedMetadata, RelatedArticle,
    ResearchContext, RetrievedFact,
};
