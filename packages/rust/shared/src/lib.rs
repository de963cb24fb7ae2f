//! Shared types, error model, configuration, and text normalization.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`FactCheckError`] — the unified error type
//! - Domain types ([`Claim`], [`CandidateArticle`], [`EvidenceRecord`], [`ScoredEvidence`])
//! - Configuration ([`AppConfig`] and its sections, config loading)
//! - [`normalize_text`], applied to every extracted string

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EmbeddingConfig, ExtractorConfig, MAX_NUM_SOURCES,
    MIN_NUM_SOURCES, SearchConfig, ServerConfig, TrustedSource, VerdictConfig, VerdictThresholds,
    config_dir, config_file_path, init_config, load_config, load_config_from, read_secret,
    require_secret, validate_config,
};
pub use error::{FactCheckError, Result};
pub use text::{char_len, normalize_text, truncate_chars};
pub use types::{
    CandidateArticle, Claim, ClaimKind, EvidenceRecord, ExtractedArticle, ScoredEvidence,
};
