//! Embeddings and Similarity Search for Scraped Market Snippets
//!
//! This crate turns text into fixed-dimension vectors and answers
//! "what is close to this?" questions over them.
//!
//! ## Features
//! - OpenAI embedding client behind the [`TextEmbedder`] seam
//! - [`EmbeddingAdapter`]: batching, zero-vector degradation, dimension checks
//! - Cosine similarity with a zero-vector rule (similarity to a zero vector is 0)
//! - [`FlatIndex`]: exact in-memory index over normalized vectors
//! - [`EmbeddingStore`]: SQLite persistence with a capped brute-force scan
//! - [`SimilarityStore`]: index when available, scan otherwise

pub mod adapter;
pub mod client;
pub mod error;
pub mod index;
pub mod similarity;
pub mod similarity_store;
pub mod store;
pub mod types;

pub use adapter::{EmbeddingAdapter, EmbeddingAdapterConfig};
pub use client::{EmbeddingClient, TextEmbedder};
pub use error::{EmbeddingError, Result};
pub use index::FlatIndex;
pub use similarity::{cosine_similarity, rank_matches};
pub use similarity_store::{SimilarityStore, VectorStore};
pub use store::{EmbeddingStats, EmbeddingStore};
pub use types::{EmbeddingVector, IndexDomain, IndexedVector, SimilarityMatch, is_zero, zero_vector};
