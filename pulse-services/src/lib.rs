//! Detection and generation services for the pulse pipeline
//!
//! This crate wires the stages together: deduplication, clustering and
//! trend scoring on the detection side; topic validation, grounded
//! article generation and persistence on the generation side. Each
//! service run is one scheduler tick driven by a [`RunContext`].

pub mod clustering;
pub mod config;
pub mod dedup;
pub mod detection_service;
pub mod document_store;
pub mod generation_service;
pub mod instruments;
pub mod rate_limiter;
pub mod run;
pub mod scoring;
pub mod validator;

pub use clustering::{Clusterer, TrendCluster};
pub use config::{DedupConfig, PipelineConfig, RunLimits, ScoringConfig, ValidatorConfig};
pub use dedup::{DedupDecision, DedupOutcome, Deduplicator, DuplicateItem};
pub use detection_service::DetectionService;
pub use document_store::{DocumentStats, DocumentStore, InsertOutcome, SqliteDocumentStore};
pub use generation_service::{GenerationService, TopicOutcome};
pub use instruments::StaticInstrumentRegistry;
pub use rate_limiter::{RateLimiter, RateLimiterStats, ThrottledGenerator};
pub use run::{RunContext, RunSummary};
pub use scoring::{ScoreBreakdown, TrendScorer};
pub use validator::{RejectReason, TopicValidator, TopicVerdict};
