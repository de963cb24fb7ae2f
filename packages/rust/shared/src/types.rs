//! Core domain types shared by the extractor, pipeline, and CLI.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// How the raw claim input should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimKind {
    /// Free text pasted by the user.
    #[default]
    Text,
    /// A link to an article whose content is the claim.
    Url,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
        }
    }
}

impl std::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "url" => Ok(Self::Url),
            other => Err(format!("unknown input type '{other}' (expected text or url)")),
        }
    }
}

/// A claim under verification. One per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// The user-submitted text or URL, trimmed.
    pub raw_input: String,
    /// Interpretation of `raw_input`.
    pub kind: ClaimKind,
}

impl Claim {
    pub fn new(raw_input: impl Into<String>, kind: ClaimKind) -> Self {
        Self {
            raw_input: raw_input.into().trim().to_string(),
            kind,
        }
    }

    pub fn text(raw_input: impl Into<String>) -> Self {
        Self::new(raw_input, ClaimKind::Text)
    }

    pub fn url(raw_input: impl Into<String>) -> Self {
        Self::new(raw_input, ClaimKind::Url)
    }

    /// Number of whitespace-separated words in the input.
    pub fn word_count(&self) -> usize {
        self.raw_input.split_whitespace().count()
    }
}

// ---------------------------------------------------------------------------
// Candidate / evidence records
// ---------------------------------------------------------------------------

/// An article URL proposed by a source finder, before extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateArticle {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    /// Human-readable source name (e.g. the trusted outlet's key).
    #[serde(default)]
    pub source: String,
    /// Host of `url`.
    #[serde(default)]
    pub domain: String,
}

/// Normalized article content pulled from one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub url: String,
    pub domain: String,
    pub title: String,
    pub description: String,
    /// Normalized body text; always longer than the minimum evidence length.
    pub content: String,
    /// Name of the strategy that produced this article.
    pub strategy: String,
}

/// Extracted evidence for a single candidate, held only until scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub url: String,
    pub title: String,
    pub content: String,
    pub domain: String,
    pub snippet: String,
    pub source: String,
}

impl EvidenceRecord {
    /// Merge an extraction result with the candidate that pointed at it.
    /// The candidate title is used when the page yielded none.
    pub fn from_extraction(candidate: &CandidateArticle, article: ExtractedArticle) -> Self {
        let title = if article.title.is_empty() {
            candidate.title.clone()
        } else {
            article.title
        };
        Self {
            url: candidate.url.clone(),
            title,
            content: article.content,
            domain: article.domain,
            snippet: candidate.snippet.clone(),
            source: candidate.source.clone(),
        }
    }
}

/// Evidence with its raw similarity to the claim, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvidence {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub source: String,
    pub similarity: f64,
}
