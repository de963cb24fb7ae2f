//! Single-article content extraction with an ordered fallback chain.
//!
//! [`ContentExtractor`] tries a direct browser-like fetch, then the closest
//! web-archive snapshot, then a search-result snippet. Every strategy shares
//! the same page parser ([`parse_page`]) and the per-outlet rules in
//! [`DOMAIN_RULES`].

pub mod extractor;
pub mod net;
pub mod page;
pub mod rules;
pub mod strategy;

pub use extractor::{ArticleExtractor, ContentExtractor};
pub use net::{is_ssrf_target, looks_like_article};
pub use page::{MIN_CONTENT_CHARS, ParsedPage, parse_page};
pub use rules::{DOMAIN_RULES, DomainRule, Locator, rule_for};
pub use strategy::{
    ArchiveStrategy, Attempt, DirectStrategy, ExtractionStrategy, SnippetStrategy,
};
