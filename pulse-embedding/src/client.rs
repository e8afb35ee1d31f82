//! OpenAI embedding client

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    types::EmbeddingVector,
};

/// Default embedding model
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Default dimension of [`DEFAULT_MODEL`]
pub const DEFAULT_DIMENSION: usize = 1536;

/// Text-embedding provider
///
/// Implementations return raw provider results; degradation to zero vectors
/// is the job of [`crate::EmbeddingAdapter`], not of the provider.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// One vector per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    fn dimension(&self) -> usize;
}

/// OpenAI embedding client
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// Uses text-embedding-3-small model (1536 dimensions)
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Use a different model and output dimension
    ///
    /// The dimension is sent with every request, so models that support
    /// shortened embeddings return vectors of exactly this length.
    pub fn with_model(mut self, model: &str, dimension: usize) -> Self {
        self.model = model.to_string();
        self.dimension = dimension;
        self
    }

    fn request(&self, input: EmbeddingInput) -> CreateEmbeddingRequest {
        CreateEmbeddingRequest {
            model: self.model.clone(),
            input,
            encoding_format: None,
            dimensions: Some(self.dimension as u32),
            user: None,
        }
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    /// Get the embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingClient {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let request = self.request(EmbeddingInput::String(text.to_string()));
        let response = self.client.embeddings().create(request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| EmbeddingError::Provider("No embeddings returned from API".to_string()))?;

        self.check_dimension(&embedding)?;
        debug!("Generated embedding: dimension={}, model={}", embedding.len(), self.model);
        Ok(embedding)
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.request(EmbeddingInput::StringArray(texts.to_vec()));
        let response = self.client.embeddings().create(request).await?;

        if response.data.len() != texts.len() {
            return Err(EmbeddingError::Provider(format!(
                "Expected {} embeddings, API returned {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The API reports each vector's input position; don't rely on response order
        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        let mut vectors = Vec::with_capacity(data.len());
        for entry in data {
            self.check_dimension(&entry.embedding)?;
            vectors.push(entry.embedding);
        }

        info!(
            "Generated {} embeddings: dimension={}, model={}",
            vectors.len(),
            self.dimension,
            self.model
        );
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_embed_text() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let client = EmbeddingClient::new(api_key);

        let embedding = client
            .embed("Gold climbs as traders price in rate cuts")
            .await
            .expect("Failed to generate embedding");

        assert_eq!(embedding.len(), DEFAULT_DIMENSION);
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_embed_batch_preserves_order() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let client = EmbeddingClient::new(api_key).with_model(DEFAULT_MODEL, 256);

        let texts = vec![
            "Silver demand rises on solar panel orders".to_string(),
            "Chipmaker shares jump after guidance raise".to_string(),
        ];
        let embeddings = client.embed_batch(&texts).await.expect("Failed to embed batch");

        assert_eq!(embeddings.len(), 2);
        assert!(embeddings.iter().all(|e| e.len() == 256));
    }
}
