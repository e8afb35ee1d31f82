//! Core types for the pulse pipeline
//!
//! This crate defines the shared data structures used across the pipeline:
//! scraped items, trending topics, generated articles, instrument snapshots,
//! and the error taxonomy every stage reports through.

pub mod article;
pub mod error;
pub mod instrument;
pub mod item;
pub mod topic;

pub use article::{Article, ArticleImage, ArticleSource, Faq};
pub use error::{PulseError, PulseResult};
pub use instrument::{InstrumentKind, InstrumentRegistry, InstrumentSnapshot};
pub use item::{Engagement, ItemIndexMetadata, RelatedInstruments, ScrapedItem, SourceType};
pub use topic::{TopicCategory, TrendingTopic};
