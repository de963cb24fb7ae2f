use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use factcheck_shared::{
    ExtractedArticle, ExtractorConfig, FactCheckError, Result, char_len, normalize_text,
};

use super::{Attempt, ExtractionStrategy};
use crate::net::{host_of, random_user_agent};
use crate::page::MIN_CONTENT_CHARS;

static RESULT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.g").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static HEADLINE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid selector"));
static SNIPPET_CANDIDATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div, span").expect("valid selector"));
static SNIPPET_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("VwiC3b|s3v9rd").expect("valid regex"));

/// Use a search engine's result snippet as stand-in evidence.
pub struct SnippetStrategy {
    client: Client,
    search_url: String,
    timeout: Duration,
}

impl SnippetStrategy {
    pub fn new(client: Client, config: &ExtractorConfig) -> Self {
        Self {
            client,
            search_url: config.search_page_url.clone(),
            timeout: Duration::from_secs(config.lookup_timeout_secs),
        }
    }

    async fn run(&self, url: &Url) -> Result<Option<ExtractedArticle>> {
        let query = site_query(url);
        debug!(url = %url, query = %query, "searching for result snippet");

        let body = self
            .client
            .get(&self.search_url)
            .query(&[("q", query.as_str())])
            .header(USER_AGENT, random_user_agent())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FactCheckError::Network(format!("search request failed: {e}")))?
            .text()
            .await
            .map_err(|e| FactCheckError::Network(format!("failed to read search page: {e}")))?;

        let Some((title, content)) = find_result(&body, url.as_str()) else {
            return Ok(None);
        };

        let host = host_of(url);
        Ok(Some(ExtractedArticle {
            url: url.to_string(),
            domain: host,
            title,
            description: String::new(),
            content,
            strategy: self.name().to_string(),
        }))
    }
}

#[async_trait]
impl ExtractionStrategy for SnippetStrategy {
    fn name(&self) -> &str {
        "search_snippet"
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        match self.run(url).await {
            Ok(Some(article)) => {
                info!(url = %url, chars = char_len(&article.content), "search snippet extraction succeeded");
                Attempt::Success(article)
            }
            Ok(None) => {
                debug!(url = %url, "no usable search snippet");
                Attempt::Continue
            }
            Err(e) => {
                warn!(url = %url, error = %e, "search snippet strategy failed");
                Attempt::Continue
            }
        }
    }
}

/// `site:<host> <last path segment, dashes as spaces>`.
fn site_query(url: &Url) -> String {
    let slug = url.as_str().rsplit('/').next().unwrap_or("").replace('-', " ");
    format!("site:{} {}", host_of(url), slug).trim().to_string()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized headline and snippet of the first result block linking to
/// `url` whose normalized snippet is long enough to count as evidence.
fn find_result(html: &str, url: &str) -> Option<(String, String)> {
    let doc = Html::parse_document(html);

    for block in doc.select(&RESULT_SEL) {
        let Some(href) = block.select(&LINK_SEL).next().and_then(|a| a.value().attr("href")) else {
            continue;
        };
        if !href.contains(url) {
            continue;
        }

        let title = block
            .select(&HEADLINE_SEL)
            .next()
            .map(|el| normalize_text(&element_text(el)))
            .unwrap_or_default();
        let snippet = block
            .select(&SNIPPET_CANDIDATE_SEL)
            .find(|el| el.value().classes().any(|c| SNIPPET_CLASS_RE.is_match(c)))
            .map(|el| normalize_text(&element_text(el)))
            .unwrap_or_default();

        if !title.is_empty() && char_len(&snippet) > MIN_CONTENT_CHARS {
            return Some((title, snippet));
        }
    }

    None
}
