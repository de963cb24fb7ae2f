use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use factcheck_shared::{ExtractedArticle, ExtractorConfig, FactCheckError, Result, char_len};

use super::{Attempt, ExtractionStrategy};
use crate::net::{host_of, random_user_agent};
use crate::page::parse_page;

// ---------------------------------------------------------------------------
// Availability API response
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<Snapshot>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    url: String,
    #[serde(default = "default_available")]
    available: bool,
}

fn default_available() -> bool {
    true
}

/// Fetch the closest web-archive snapshot when the live page is unreachable.
pub struct ArchiveStrategy {
    client: Client,
    api_url: String,
    lookup_timeout: Duration,
    fetch_timeout: Duration,
}

impl ArchiveStrategy {
    pub fn new(client: Client, config: &ExtractorConfig) -> Self {
        Self {
            client,
            api_url: config.archive_api_url.clone(),
            lookup_timeout: Duration::from_secs(config.lookup_timeout_secs),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// URL of the closest snapshot of `url`, if the archive has one.
    async fn closest_snapshot(&self, url: &Url) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("url", url.as_str())])
            .timeout(self.lookup_timeout)
            .send()
            .await
            .map_err(|e| FactCheckError::Network(format!("archive lookup failed: {e}")))?;

        let data: AvailabilityResponse = response
            .json()
            .await
            .map_err(|e| FactCheckError::parse(format!("invalid archive lookup response: {e}")))?;

        Ok(data
            .archived_snapshots
            .closest
            .filter(|snapshot| snapshot.available && !snapshot.url.is_empty())
            .map(|snapshot| snapshot.url))
    }

    async fn fetch_snapshot(&self, snapshot_url: &str, original: &Url) -> Result<Option<ExtractedArticle>> {
        let response = self
            .client
            .get(snapshot_url)
            .header(USER_AGENT, random_user_agent())
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| FactCheckError::Network(format!("{snapshot_url}: {e}")))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(FactCheckError::Network(format!("{snapshot_url}: status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FactCheckError::Network(format!("{snapshot_url}: failed to read body: {e}")))?;

        // Domain rules follow the original article, not the archive host.
        let host = host_of(original);
        Ok(parse_page(&body, &host).into_article(original.as_str(), &host, self.name()))
    }

    async fn run(&self, url: &Url) -> Result<Option<ExtractedArticle>> {
        let Some(snapshot_url) = self.closest_snapshot(url).await? else {
            info!(url = %url, "no archived snapshot");
            return Ok(None);
        };
        info!(url = %url, snapshot = %snapshot_url, "found archived snapshot");
        self.fetch_snapshot(&snapshot_url, url).await
    }
}

#[async_trait]
impl ExtractionStrategy for ArchiveStrategy {
    fn name(&self) -> &str {
        "archive"
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        match self.run(url).await {
            Ok(Some(article)) => {
                info!(url = %url, chars = char_len(&article.content), "archive extraction succeeded");
                Attempt::Success(article)
            }
            Ok(None) => Attempt::Continue,
            Err(e) => {
                warn!(url = %url, error = %e, "archive strategy failed");
                Attempt::Continue
            }
        }
    }
}
