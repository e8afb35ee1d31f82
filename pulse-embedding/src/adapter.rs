//! Embedding service adapter
//!
//! Wraps a [`TextEmbedder`] so that callers never branch on provider
//! failures: transient errors become zero vectors, which match nothing.
//! Dimension violations are the exception and always surface as errors.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    client::TextEmbedder,
    error::{EmbeddingError, Result},
    types::{EmbeddingVector, zero_vector},
};

/// Configuration for the embedding adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingAdapterConfig {
    /// Dimension every vector must have
    pub dimension: usize,
    /// Texts per provider call
    pub batch_size: usize,
    /// Consecutive failed calls after which the provider counts as unreachable
    pub max_consecutive_failures: usize,
}

impl Default for EmbeddingAdapterConfig {
    fn default() -> Self {
        Self {
            dimension: crate::client::DEFAULT_DIMENSION,
            batch_size: 10,
            max_consecutive_failures: 3,
        }
    }
}

/// Failure-normalizing front for an embedding provider
#[derive(Clone)]
pub struct EmbeddingAdapter {
    embedder: Arc<dyn TextEmbedder>,
    config: EmbeddingAdapterConfig,
    consecutive_failures: Arc<AtomicUsize>,
}

impl EmbeddingAdapter {
    /// Create an adapter; fails if the provider's dimension disagrees with the config
    pub fn new(embedder: Arc<dyn TextEmbedder>, config: EmbeddingAdapterConfig) -> Result<Self> {
        if embedder.dimension() != config.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: config.dimension,
                actual: embedder.dimension(),
            });
        }
        if config.batch_size == 0 {
            return Err(EmbeddingError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(Self {
            embedder,
            config,
            consecutive_failures: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Embed one text
    ///
    /// Blank text yields a zero vector without contacting the provider.
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if text.trim().is_empty() {
            return Ok(zero_vector(self.config.dimension));
        }

        match self.embedder.embed(text).await {
            Ok(vector) => {
                self.check_dimension(&vector)?;
                self.record_success();
                Ok(vector)
            }
            Err(e) if e.is_integrity() => Err(e),
            Err(e) => {
                self.record_failure();
                warn!("Embedding provider failed, using zero vector: {}", e);
                Ok(zero_vector(self.config.dimension))
            }
        }
    }

    /// Embed many texts, one provider call per `batch_size` group
    ///
    /// Returns exactly one vector per input, in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let mut output = Vec::with_capacity(texts.len());

        for (chunk_no, chunk) in texts.chunks(self.config.batch_size).enumerate() {
            let mut vectors: Vec<EmbeddingVector> =
                vec![zero_vector(self.config.dimension); chunk.len()];

            // Positions of non-blank texts within this chunk
            let positions: Vec<usize> = chunk
                .iter()
                .enumerate()
                .filter(|(_, t)| !t.trim().is_empty())
                .map(|(i, _)| i)
                .collect();

            if positions.is_empty() {
                output.extend(vectors);
                continue;
            }

            let to_send: Vec<String> = positions.iter().map(|&i| chunk[i].clone()).collect();
            match self.embedder.embed_batch(&to_send).await {
                Ok(embedded) if embedded.len() == to_send.len() => {
                    for (pos, vector) in positions.iter().zip(embedded) {
                        self.check_dimension(&vector)?;
                        vectors[*pos] = vector;
                    }
                    self.record_success();
                    debug!("Embedded batch {} ({} texts)", chunk_no, to_send.len());
                }
                Ok(embedded) => {
                    self.record_failure();
                    warn!(
                        "Embedding batch {} returned {} vectors for {} texts, using zero vectors",
                        chunk_no,
                        embedded.len(),
                        to_send.len()
                    );
                }
                Err(e) if e.is_integrity() => return Err(e),
                Err(e) => {
                    self.record_failure();
                    warn!("Embedding batch {} failed, using zero vectors: {}", chunk_no, e);
                }
            }

            output.extend(vectors);
        }

        Ok(output)
    }

    /// True once the provider failed `max_consecutive_failures` calls in a row
    pub fn is_unavailable(&self) -> bool {
        self.consecutive_failures() >= self.config.max_consecutive_failures
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }
}
