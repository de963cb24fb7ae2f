use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{REFERER, USER_AGENT};
use tracing::{debug, info, warn};
use url::Url;

use factcheck_shared::{ExtractedArticle, ExtractorConfig, FactCheckError, Result, char_len};

use super::{Attempt, ExtractionStrategy};
use crate::net::{Backoff, host_of, is_ssrf_target, random_user_agent};
use crate::page::parse_page;

/// Outlets that reject requests lacking a search-engine referer.
const REFERER_DOMAINS: &[(&str, &str)] =
    &[("vnexpress.net", "https://www.google.com/search?q=vnexpress")];

/// Referer to send for `host`, if its outlet requires one.
fn referer_for(host: &str) -> Option<&'static str> {
    REFERER_DOMAINS
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{domain}")))
        .map(|(_, referer)| *referer)
}

/// Fetch the page itself with browser-like headers, retrying with backoff.
pub struct DirectStrategy {
    client: Client,
    max_attempts: u32,
    timeout: Duration,
    backoff: Backoff,
    /// Allow localhost/private IPs (for tests against mock servers).
    allow_localhost: bool,
}

impl DirectStrategy {
    pub fn new(client: Client, config: &ExtractorConfig) -> Self {
        Self {
            client,
            max_attempts: config.max_attempts.max(1),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            backoff: Backoff::from_config(config),
            allow_localhost: false,
        }
    }

    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// One GET. `Ok(None)` means the page loaded but held too little content.
    async fn fetch_once(&self, url: &Url, user_agent: &str) -> Result<Option<ExtractedArticle>> {
        let host = host_of(url);
        let mut request = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, user_agent)
            .timeout(self.timeout);
        if let Some(referer) = referer_for(&host) {
            request = request.header(REFERER, referer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FactCheckError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(FactCheckError::Network(format!("{url}: status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FactCheckError::Network(format!("{url}: failed to read body: {e}")))?;

        Ok(parse_page(&body, &host).into_article(url.as_str(), &host, self.name()))
    }
}

#[async_trait]
impl ExtractionStrategy for DirectStrategy {
    fn name(&self) -> &str {
        "direct"
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        if !self.allow_localhost && is_ssrf_target(url) {
            warn!(url = %url, "blocked URL targeting a private or non-HTTP resource");
            return Attempt::Fatal(FactCheckError::extraction(
                url.as_str(),
                "URL targets a private or non-HTTP resource",
            ));
        }

        let user_agent = random_user_agent();
        for attempt in 1..=self.max_attempts {
            debug!(url = %url, attempt, max = self.max_attempts, "direct fetch");
            match self.fetch_once(url, user_agent).await {
                Ok(Some(article)) => {
                    info!(url = %url, chars = char_len(&article.content), "direct fetch succeeded");
                    return Attempt::Success(article);
                }
                Ok(None) => {
                    warn!(url = %url, attempt, "direct fetch returned too little content");
                }
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "direct fetch failed");
                }
            }

            if attempt < self.max_attempts {
                self.backoff.wait().await;
            }
        }

        Attempt::Continue
    }
}
