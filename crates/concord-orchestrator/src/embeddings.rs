use async_trait::async_trait;
use concord_core::{EmbeddingsProvider, MatchError};
use serde::{Deserialize, Serialize};

/// The absent-capability default: construction succeeds, but nothing ever
/// calls `embed` on it because [`concord_core::SemanticMatcher`] and
/// [`concord_core::MLRanker`] both refuse construction without a real
/// provider. Kept around so a deployment can wire "embeddings disabled"
/// uniformly through the same `Option<Arc<dyn EmbeddingsProvider>>` slot.
#[derive(Debug, Default)]
pub struct NullEmbeddingsProvider;

#[async_trait]
impl EmbeddingsProvider for NullEmbeddingsProvider {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        Err(MatchError::Unavailable("embeddings disabled".to_string()))
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsDatum>,
}

#[derive(Deserialize)]
struct EmbeddingsDatum {
    embedding: Vec<f32>,
}

/// Calls an OpenAI-embeddings-shaped endpoint: texts in, fixed-width float
/// vectors out. Cosine similarity between vectors is computed consumer-side
/// (`concord_core::traits::cosine_similarity`), not by this client.
pub struct ReqwestEmbeddingsProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ReqwestEmbeddingsProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingsProvider for ReqwestEmbeddingsProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| MatchError::Unavailable(format!("embeddings request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MatchError::Unavailable(format!("embeddings endpoint returned {status}: {body}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| MatchError::Internal(format!("malformed embeddings response: {e}")))?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
