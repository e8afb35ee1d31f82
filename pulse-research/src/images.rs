use async_trait::async_trait;
use pulse_core::{ArticleImage, PulseError, PulseResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

const PEXELS_API_BASE: &str = "https://api.pexels.com/v1";

/// Stock image lookup for article headers
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Best matching image for `query`, if the service has one
    async fn search(&self, query: &str) -> PulseResult<Option<ArticleImage>>;
}

#[derive(Debug, Clone)]
pub struct PexelsClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct PexelsSearchResponse {
    #[serde(default)]
    pub photos: Vec<PexelsPhoto>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Deserialize)]
pub struct PexelsPhoto {
    pub id: u64,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub photographer: Option<String>,
    pub src: PexelsPhotoSource,
}

#[derive(Debug, Deserialize)]
pub struct PexelsPhotoSource {
    pub original: String,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub landscape: Option<String>,
}

impl PexelsPhoto {
    fn into_image(self, query: &str) -> ArticleImage {
        let url = self.src.landscape.or(self.src.large).unwrap_or(self.src.original);
        let alt = self
            .alt
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| query.to_string());
        ArticleImage { url, alt }
    }
}

impl PexelsClient {
    pub fn new() -> PulseResult<Self> {
        let api_key = std::env::var("PEXELS_API_KEY")
            .map_err(|_| PulseError::config("PEXELS_API_KEY environment variable not set"))?;
        Self::with_api_key(api_key)
    }

    pub fn with_api_key(api_key: impl Into<String>) -> PulseResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| PulseError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ImageSearch for PexelsClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> PulseResult<Option<ArticleImage>> {
        let url = format!("{}/search", PEXELS_API_BASE);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await
            .map_err(|e| PulseError::network(format!("Pexels API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PulseError::api(format!("Pexels API error ({}): {}", status, body)));
        }

        let body: PexelsSearchResponse = response
            .json()
            .await
            .map_err(|e| PulseError::parse(format!("Failed to parse Pexels response: {}", e)))?;

        Ok(body.photos.into_iter().next().map(|p| p.into_image(query)))
    }
}
