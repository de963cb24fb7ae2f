//! Seams between the pipeline and the services it consumes.
//!
//! The pipeline only sees these traits. Default implementations live in
//! [`crate::preprocess`], [`crate::search`], and [`crate::similarity`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use factcheck_shared::{CandidateArticle, Claim, Result, TrustedSource};

/// Preprocessor output for one claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedClaim {
    /// Search keywords, most significant first.
    pub keywords: Vec<String>,
    /// Normalized text compared against evidence.
    pub full_text: String,
    /// Article title for URL claims; empty for text claims.
    #[serde(default)]
    pub title: String,
    /// Article host for URL claims.
    #[serde(default)]
    pub domain: Option<String>,
}

/// One entry of a batched similarity result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredIndex {
    /// Position of the reference in the input slice.
    pub index: usize,
    /// Cosine similarity clamped to `[0, 1]`.
    pub similarity: f64,
}

/// Turns raw claim input into keywords and comparison text.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    /// `Ok(None)` means the input could not be processed at all.
    async fn process(&self, claim: &Claim) -> Result<Option<ProcessedClaim>>;
}

/// Discovers candidate articles from trusted outlets.
#[async_trait]
pub trait SourceFinder: Send + Sync {
    /// At most `count` candidates for `keywords`.
    async fn search(&self, keywords: &[String], count: usize) -> Result<Vec<CandidateArticle>>;

    /// Outlets this finder searches.
    fn trusted_sources(&self) -> Vec<TrustedSource>;
}

/// Semantic similarity between texts.
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    /// One entry per reference, sorted by similarity descending, ties by index.
    async fn batch_similarity(&self, query: &str, references: &[String]) -> Result<Vec<ScoredIndex>>;

    /// Similarity of a single pair, in `[0, 1]`.
    async fn similarity(&self, a: &str, b: &str) -> Result<f64>;
}

/// Text to vector encoder behind [`crate::similarity::EmbeddingOracle`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
