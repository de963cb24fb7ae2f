//! Fetch strategies tried in order by [`crate::ContentExtractor`].

mod archive;
mod direct;
mod snippet;

pub use archive::ArchiveStrategy;
pub use direct::DirectStrategy;
pub use snippet::SnippetStrategy;

use async_trait::async_trait;
use url::Url;

use factcheck_shared::{ExtractedArticle, FactCheckError};

/// Result of one strategy run.
#[derive(Debug)]
pub enum Attempt {
    /// Usable article content was found; the chain stops here.
    Success(ExtractedArticle),
    /// This strategy gave up; hand over to the next one.
    Continue,
    /// The URL must not be fetched at all; the chain stops with this error.
    Fatal(FactCheckError),
}

/// One way of getting article content for a URL.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short identifier recorded on the extracted article.
    fn name(&self) -> &str;

    async fn attempt(&self, url: &Url) -> Attempt;
}
