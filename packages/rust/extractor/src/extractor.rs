//! The fallback chain that turns one URL into one extracted article.

use async_trait::async_trait;
use tracing::{info, instrument, warn};
use url::Url;

use factcheck_shared::{ExtractedArticle, ExtractorConfig, FactCheckError, Result};

use crate::net::{build_client, looks_like_article};
use crate::strategy::{
    ArchiveStrategy, Attempt, DirectStrategy, ExtractionStrategy, SnippetStrategy,
};

/// Anything that can turn a URL into article content.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    /// Extract the article at `url`. An error means the source is unusable.
    async fn extract(&self, url: &str) -> Result<ExtractedArticle>;
}

/// Tries each strategy in order and returns the first success.
pub struct ContentExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ContentExtractor {
    /// Direct fetch, then archive snapshot, then search snippet.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = build_client()?;
        Ok(Self::with_strategies(vec![
            Box::new(DirectStrategy::new(client.clone(), config)),
            Box::new(ArchiveStrategy::new(client.clone(), config)),
            Box::new(SnippetStrategy::new(client, config)),
        ]))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Strategy names in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl ArticleExtractor for ContentExtractor {
    #[instrument(skip_all, fields(url = %url))]
    async fn extract(&self, url: &str) -> Result<ExtractedArticle> {
        let parsed = Url::parse(url)
            .map_err(|e| FactCheckError::extraction(url, format!("invalid URL: {e}")))?;

        if !looks_like_article(url) {
            warn!("URL may not point to an article");
        }

        for strategy in &self.strategies {
            match strategy.attempt(&parsed).await {
                Attempt::Success(article) => {
                    info!(strategy = strategy.name(), "extraction succeeded");
                    return Ok(article);
                }
                Attempt::Continue => {
                    warn!(strategy = strategy.name(), "strategy failed, trying next");
                }
                Attempt::Fatal(e) => {
                    warn!(strategy = strategy.name(), error = %e, "extraction aborted");
                    return Err(e);
                }
            }
        }

        Err(FactCheckError::extraction(url, "all extraction strategies failed"))
    }
}
