//! Frequency-based keyword preprocessor.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, instrument, warn};

use factcheck_extractor::ArticleExtractor;
use factcheck_shared::{Claim, ClaimKind, Result, char_len, normalize_text, truncate_chars};

use crate::collaborators::{Preprocessor, ProcessedClaim};

/// Keywords kept per claim.
pub const MAX_KEYWORDS: usize = 15;

/// Leading content of a URL claim used for keywords.
const KEYWORD_CONTENT_CHARS: usize = 500;

const MIN_TOKEN_CHARS: usize = 3;

const PUNCTUATION: &str = ".,!?;:()-";

const STOPWORDS: &[&str] = &[
    "và", "hoặc", "của", "có", "được", "đã", "đang", "sẽ", "này", "đó", "kia", "các", "những",
    "cho", "từ", "với", "trong", "ngoài", "trên", "dưới", "là", "thì", "mà", "một", "hai", "ba",
    "bốn", "năm", "sáu", "bảy", "tám", "cũng", "để", "vào", "ra", "đến", "bị", "bởi", "còn",
    "khi", "lại", "sau", "trước", "nếu", "không", "chỉ", "như", "theo", "đều", "rất", "hay",
    "về", "tại", "do", "đây", "đấy", "ấy", "nào", "gì", "ai", "đâu", "bao", "lúc", "nơi",
    "người", "việc", "chúng", "nhiều",
];

static SENTENCE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,!?;:])").expect("valid regex"));

/// Split on whitespace after detaching sentence punctuation.
fn tokenize(text: &str) -> Vec<String> {
    SENTENCE_PUNCT_RE
        .replace_all(text, " $1 ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn is_keyword_candidate(token: &str) -> bool {
    !PUNCTUATION.contains(token)
        && !STOPWORDS.contains(&token)
        && char_len(token) >= MIN_TOKEN_CHARS
        && !token.chars().all(|c| c.is_numeric())
        && token.chars().any(char::is_alphanumeric)
}

/// Most frequent non-stopword tokens of `text`, ties broken by first occurrence.
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<String> {
    let normalized = normalize_text(text);

    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for token in tokenize(&normalized) {
        let token = token.to_lowercase();
        if !is_keyword_candidate(&token) {
            continue;
        }
        match positions.get(&token) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(token.clone(), counts.len());
                counts.push((token, 1));
            }
        }
    }

    // Stable sort keeps first-occurrence order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(top_n).map(|(t, _)| t).collect()
}

/// Default [`Preprocessor`]. Text claims are normalized in place; URL claims
/// are fetched through the article extractor first.
pub struct KeywordPreprocessor {
    extractor: Arc<dyn ArticleExtractor>,
}

impl KeywordPreprocessor {
    pub fn new(extractor: Arc<dyn ArticleExtractor>) -> Self {
        Self { extractor }
    }

    async fn process_url(&self, url: &str) -> Option<ProcessedClaim> {
        let article = match self.extractor.extract(url).await {
            Ok(article) => article,
            Err(e) => {
                warn!(url, error = %e, "failed to extract claim article");
                return None;
            }
        };

        let keyword_text = format!(
            "{} {} {}",
            article.title,
            article.description,
            truncate_chars(&article.content, KEYWORD_CONTENT_CHARS)
        );
        let full_text = format!("{} {} {}", article.title, article.description, article.content);
        let keywords = extract_keywords(&keyword_text, MAX_KEYWORDS);
        info!(chars = char_len(&full_text), keywords = keywords.len(), "processed URL claim");

        Some(ProcessedClaim {
            keywords,
            full_text,
            title: article.title,
            domain: Some(article.domain),
        })
    }
}

#[async_trait]
impl Preprocessor for KeywordPreprocessor {
    #[instrument(skip_all, fields(kind = %claim.kind))]
    async fn process(&self, claim: &Claim) -> Result<Option<ProcessedClaim>> {
        match claim.kind {
            ClaimKind::Url => Ok(self.process_url(&claim.raw_input).await),
            ClaimKind::Text => {
                let full_text = normalize_text(&claim.raw_input);
                let keywords = extract_keywords(&full_text, MAX_KEYWORDS);
                info!(chars = char_len(&full_text), keywords = keywords.len(), "processed text claim");
                Ok(Some(ProcessedClaim {
                    keywords,
                    full_text,
                    title: String::new(),
                    domain: None,
                }))
            }
        }
    }
}
