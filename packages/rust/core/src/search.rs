//! Candidate discovery through a custom-search JSON API, with an optional
//! in-process result cache.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use factcheck_shared::{
    CandidateArticle, FactCheckError, MAX_NUM_SOURCES, MIN_NUM_SOURCES, Result, SearchConfig,
    TrustedSource, read_secret, require_secret,
};

use crate::collaborators::SourceFinder;

/// Keywords sent to the search API; the rest only dilute the query.
const MAX_QUERY_KEYWORDS: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Trusted outlet whose domain covers `host`, if any.
pub fn trusted_source_for<'a>(sources: &'a [TrustedSource], host: &str) -> Option<&'a TrustedSource> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    sources.iter().find(|s| {
        host == s.domain
            || host
                .strip_suffix(&s.domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// `kw1 kw2 … (site:a OR site:b …)`.
fn build_query(keywords: &[String], sources: &[TrustedSource]) -> String {
    let terms = keywords
        .iter()
        .take(MAX_QUERY_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let sites = sources
        .iter()
        .map(|s| format!("site:{}", s.domain))
        .collect::<Vec<_>>()
        .join(" OR ");
    if sites.is_empty() {
        terms
    } else {
        format!("{terms} ({sites})")
    }
}

// ---------------------------------------------------------------------------
// GoogleSourceFinder
// ---------------------------------------------------------------------------

/// [`SourceFinder`] backed by the Google Custom Search JSON API, restricted to
/// the trusted-source table.
pub struct GoogleSourceFinder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
    api_key_env: String,
    engine_id_env: String,
    sources: Vec<TrustedSource>,
}

impl GoogleSourceFinder {
    /// Credentials come from the env vars named in `config`. Missing
    /// credentials surface on the first search, not here.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Self::new(
            config,
            read_secret(&config.api_key_env),
            read_secret(&config.engine_id_env),
        )
    }

    pub fn new(config: &SearchConfig, api_key: Option<String>, engine_id: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FactCheckError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            engine_id,
            api_key_env: config.api_key_env.clone(),
            engine_id_env: config.engine_id_env.clone(),
            sources: config.trusted_sources.clone(),
        })
    }

    /// A value given at construction, else the named env var.
    fn credential(value: &Option<String>, var_name: &str, what: &str) -> Result<String> {
        match value {
            Some(v) => Ok(v.clone()),
            None => require_secret(var_name, what),
        }
    }

    fn to_candidate(&self, item: SearchItem) -> Option<CandidateArticle> {
        let url = Url::parse(&item.link).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        let source = trusted_source_for(&self.sources, &host)?;
        Some(CandidateArticle {
            url: item.link,
            title: item.title,
            snippet: item.snippet,
            source: source.name.clone(),
            domain: host,
        })
    }
}

#[async_trait]
impl SourceFinder for GoogleSourceFinder {
    #[instrument(skip_all, fields(keywords = keywords.len(), count))]
    async fn search(&self, keywords: &[String], count: usize) -> Result<Vec<CandidateArticle>> {
        let api_key = Self::credential(&self.api_key, &self.api_key_env, "Search API key")?;
        let engine_id = Self::credential(&self.engine_id, &self.engine_id_env, "Search engine id")?;

        if keywords.is_empty() {
            warn!("no keywords to search for");
            return Ok(Vec::new());
        }

        let count = count.clamp(MIN_NUM_SOURCES, MAX_NUM_SOURCES);
        let query = build_query(keywords, &self.sources);
        debug!(query = %query, "searching trusted sources");

        let num = count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FactCheckError::Search(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FactCheckError::Search(format!("search API returned {status}")));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| FactCheckError::Search(format!("invalid search response: {e}")))?;

        let total = body.items.len();
        let candidates: Vec<CandidateArticle> = body
            .items
            .into_iter()
            .filter_map(|item| self.to_candidate(item))
            .take(count)
            .collect();

        info!(returned = total, kept = candidates.len(), "search completed");
        Ok(candidates)
    }

    fn trusted_sources(&self) -> Vec<TrustedSource> {
        self.sources.clone()
    }
}

// ---------------------------------------------------------------------------
// CachedSourceFinder
// ---------------------------------------------------------------------------

/// TTL cache in front of any [`SourceFinder`], keyed by keywords and count.
/// Errors are never cached.
pub struct CachedSourceFinder<F> {
    inner: F,
    entries: Cache<(Vec<String>, usize), Vec<CandidateArticle>>,
}

impl<F: SourceFinder> CachedSourceFinder<F> {
    const DEFAULT_CAPACITY: u64 = 1_000;

    pub fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            entries: Cache::builder()
                .max_capacity(Self::DEFAULT_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl<F: SourceFinder> SourceFinder for CachedSourceFinder<F> {
    async fn search(&self, keywords: &[String], count: usize) -> Result<Vec<CandidateArticle>> {
        let key = (keywords.to_vec(), count);
        if let Some(hit) = self.entries.get(&key) {
            debug!(count, "search cache hit");
            return Ok(hit);
        }

        let candidates = self.inner.search(keywords, count).await?;
        self.entries.insert(key, candidates.clone());
        Ok(candidates)
    }

    fn trusted_sources(&self) -> Vec<TrustedSource> {
        self.inner.trusted_sources()
    }
}
