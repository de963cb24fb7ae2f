//! Embedding-backed similarity oracle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use factcheck_shared::{EmbeddingConfig, FactCheckError, Result, read_secret};

use crate::collaborators::{Embedder, ScoredIndex, SimilarityOracle};

/// Cosine similarity clamped to `[0, 1]`. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Sort descending by similarity; equal scores keep input order.
pub fn rank(scores: &mut [ScoredIndex]) {
    scores.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then(a.index.cmp(&b.index))
    });
}

// ---------------------------------------------------------------------------
// EmbeddingOracle
// ---------------------------------------------------------------------------

/// [`SimilarityOracle`] over any [`Embedder`]: the query is encoded once and
/// all references in one batch.
pub struct EmbeddingOracle<E> {
    embedder: E,
}

impl<E: Embedder> EmbeddingOracle<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FactCheckError::Scoring("embedder returned no vector".into()))
    }
}

fn check_dims(query: &[f32], reference: &[f32]) -> Result<()> {
    if query.len() != reference.len() {
        return Err(FactCheckError::Scoring(format!(
            "embedding dimension mismatch: {} vs {}",
            query.len(),
            reference.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl<E: Embedder> SimilarityOracle for EmbeddingOracle<E> {
    #[instrument(skip_all, fields(references = references.len()))]
    async fn batch_similarity(&self, query: &str, references: &[String]) -> Result<Vec<ScoredIndex>> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embed_one(query).await?;
        let reference_vecs = self.embedder.embed(references).await?;
        if reference_vecs.len() != references.len() {
            return Err(FactCheckError::Scoring(format!(
                "embedder returned {} vectors for {} references",
                reference_vecs.len(),
                references.len()
            )));
        }

        let mut scores = Vec::with_capacity(references.len());
        for (index, vec) in reference_vecs.iter().enumerate() {
            check_dims(&query_vec, vec)?;
            scores.push(ScoredIndex {
                index,
                similarity: cosine_similarity(&query_vec, vec),
            });
        }
        rank(&mut scores);

        debug!(top = scores.first().map(|s| s.similarity), "batch similarity computed");
        Ok(scores)
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        let va = self.embed_one(a).await?;
        let vb = self.embed_one(b).await?;
        check_dims(&va, &vb)?;
        Ok(cosine_similarity(&va, &vb))
    }
}

// ---------------------------------------------------------------------------
// HttpEmbedder
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FactCheckError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: read_secret(&config.api_key_env),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FactCheckError::Scoring(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FactCheckError::Scoring(format!(
                "embedding endpoint returned {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| FactCheckError::Scoring(format!("invalid embedding response: {e}")))?;
        parsed.data.sort_by_key(|d| d.index);

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
