//! Application configuration.
//!
//! User config lives at `~/.factcheck/factcheck.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FactCheckError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "factcheck.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".factcheck";

/// Inclusive bounds for the number of evidence sources per request.
pub const MIN_NUM_SOURCES: usize = 1;
pub const MAX_NUM_SOURCES: usize = 10;

// ---------------------------------------------------------------------------
// Config structs (matching factcheck.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Article extraction settings.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Verdict thresholds and refutation policy.
    #[serde(default)]
    pub verdict: VerdictConfig,

    /// Source discovery settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Embedding backend settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Evidence sources requested when the caller does not say.
    #[serde(default = "default_num_sources")]
    pub num_sources: usize,

    /// Upper bound accepted from callers.
    #[serde(default = "default_max_num_sources")]
    pub max_num_sources: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            num_sources: default_num_sources(),
            max_num_sources: default_max_num_sources(),
        }
    }
}

fn default_num_sources() -> usize {
    5
}
fn default_max_num_sources() -> usize {
    MAX_NUM_SOURCES
}

/// `[extractor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Direct-fetch attempts before falling back.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lower bound of the randomized retry backoff.
    #[serde(default = "default_backoff_min_ms")]
    pub backoff_min_ms: u64,

    /// Upper bound of the randomized retry backoff.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Timeout for direct page fetches and archive snapshot fetches.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for the archive availability lookup and the search page.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Concurrent extractions per request.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Closest-snapshot lookup endpoint.
    #[serde(default = "default_archive_api_url")]
    pub archive_api_url: String,

    /// Search results page used by the snippet fallback.
    #[serde(default = "default_search_page_url")]
    pub search_page_url: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_min_ms: default_backoff_min_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            fetch_timeout_secs: default_fetch_timeout(),
            lookup_timeout_secs: default_lookup_timeout(),
            concurrency: default_concurrency(),
            archive_api_url: default_archive_api_url(),
            search_page_url: default_search_page_url(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_min_ms() -> u64 {
    2_000
}
fn default_backoff_max_ms() -> u64 {
    5_000
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_lookup_timeout() -> u64 {
    10
}
fn default_concurrency() -> usize {
    5
}
fn default_archive_api_url() -> String {
    "http://archive.org/wayback/available".into()
}
fn default_search_page_url() -> String {
    "https://www.google.com/search".into()
}

/// Lower bounds of the verdict bands. Anything below `likely_false` is
/// `HIGHLY_LIKELY_FALSE`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictThresholds {
    #[serde(default = "default_highly_likely_true")]
    pub highly_likely_true: f64,
    #[serde(default = "default_likely_true")]
    pub likely_true: f64,
    #[serde(default = "default_uncertain")]
    pub uncertain: f64,
    #[serde(default = "default_likely_false")]
    pub likely_false: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            highly_likely_true: default_highly_likely_true(),
            likely_true: default_likely_true(),
            uncertain: default_uncertain(),
            likely_false: default_likely_false(),
        }
    }
}

fn default_highly_likely_true() -> f64 {
    0.85
}
fn default_likely_true() -> f64 {
    0.70
}
fn default_uncertain() -> f64 {
    0.50
}
fn default_likely_false() -> f64 {
    0.30
}

/// `[verdict]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictConfig {
    #[serde(default)]
    pub thresholds: VerdictThresholds,

    /// Headline terms signalling the article refutes what it covers.
    #[serde(default = "default_refutation_terms")]
    pub refutation_terms: Vec<String>,

    /// Raw similarity a refuting article must exceed before its score is inverted.
    #[serde(default = "default_refutation_min_similarity")]
    pub refutation_min_similarity: f64,

    /// Number of top-ranked references considered for the verdict.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            thresholds: VerdictThresholds::default(),
            refutation_terms: default_refutation_terms(),
            refutation_min_similarity: default_refutation_min_similarity(),
            top_k: default_top_k(),
        }
    }
}

fn default_refutation_terms() -> Vec<String> {
    [
        "bác bỏ",
        "phủ nhận",
        "đính chính",
        "tin đồn",
        "tin giả",
        "sự thật",
        "thực hư",
        "giả mạo",
        "vu khống",
        "debunk",
        "deny",
        "denies",
        "correction",
        "rumor",
        "fake",
        "hoax",
        "truth",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_refutation_min_similarity() -> f64 {
    0.6
}
fn default_top_k() -> usize {
    3
}

/// A trusted outlet the source finder is allowed to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedSource {
    /// Short name reported as the evidence `source`.
    pub name: String,
    /// Registrable domain, matched as a host suffix.
    pub domain: String,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key (never store the key itself).
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the custom search engine id.
    #[serde(default = "default_search_engine_id_env")]
    pub engine_id_env: String,

    /// Custom search JSON endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Outlets searched for evidence.
    #[serde(default = "default_trusted_sources")]
    pub trusted_sources: Vec<TrustedSource>,

    /// Cache search results in memory.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Lifetime of cached search results.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    /// Request timeout for the search API.
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_api_key_env(),
            engine_id_env: default_search_engine_id_env(),
            endpoint: default_search_endpoint(),
            trusted_sources: default_trusted_sources(),
            cache_enabled: true,
            cache_ttl_hours: default_cache_ttl_hours(),
            timeout_secs: default_lookup_timeout(),
        }
    }
}

fn default_search_api_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_search_engine_id_env() -> String {
    "GOOGLE_CSE_ID".into()
}
fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_trusted_sources() -> Vec<TrustedSource> {
    [
        ("vnexpress", "vnexpress.net"),
        ("tuoitre", "tuoitre.vn"),
        ("thanhnien", "thanhnien.vn"),
        ("dantri", "dantri.com.vn"),
        ("vietnamnet", "vietnamnet.vn"),
    ]
    .into_iter()
    .map(|(name, domain)| TrustedSource {
        name: name.into(),
        domain: domain.into(),
    })
    .collect()
}
fn default_true() -> bool {
    true
}
fn default_cache_ttl_hours() -> u64 {
    24
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible embeddings endpoint.
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Embedding model id.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Name of the env var holding the API key. The key is optional for
    /// self-hosted endpoints.
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            api_key_env: default_embedding_api_key_env(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_endpoint() -> String {
    "http://127.0.0.1:8080/v1/embeddings".into()
}
fn default_embedding_model() -> String {
    "bkai-foundation-models/vietnamese-bi-encoder".into()
}
fn default_embedding_api_key_env() -> String {
    "EMBEDDING_API_KEY".into()
}
fn default_embedding_timeout() -> u64 {
    60
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; `"*"` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.factcheck/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FactCheckError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.factcheck/factcheck.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FactCheckError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        FactCheckError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FactCheckError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FactCheckError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FactCheckError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs whose values cannot drive the pipeline.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let t = &config.verdict.thresholds;
    let ordered = 0.0 <= t.likely_false
        && t.likely_false <= t.uncertain
        && t.uncertain <= t.likely_true
        && t.likely_true <= t.highly_likely_true
        && t.highly_likely_true <= 1.0;
    if !ordered {
        return Err(FactCheckError::config(
            "verdict thresholds must be ascending within [0, 1]",
        ));
    }

    if config.extractor.backoff_min_ms > config.extractor.backoff_max_ms {
        return Err(FactCheckError::config(
            "extractor.backoff_min_ms must not exceed backoff_max_ms",
        ));
    }

    if config.extractor.max_attempts == 0 || config.extractor.concurrency == 0 {
        return Err(FactCheckError::config(
            "extractor.max_attempts and extractor.concurrency must be at least 1",
        ));
    }

    let max = config.defaults.max_num_sources;
    if !(MIN_NUM_SOURCES..=MAX_NUM_SOURCES).contains(&max)
        || !(MIN_NUM_SOURCES..=max).contains(&config.defaults.num_sources)
    {
        return Err(FactCheckError::config(format!(
            "defaults.num_sources must be within {MIN_NUM_SOURCES}..={max} and max_num_sources within {MIN_NUM_SOURCES}..={MAX_NUM_SOURCES}"
        )));
    }

    Ok(())
}

/// Read a secret from the env var named by `var_name`.
pub fn read_secret(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.is_empty())
}

/// Read a required secret, with an actionable error when it is missing.
pub fn require_secret(var_name: &str, what: &str) -> Result<String> {
    read_secret(var_name).ok_or_else(|| {
        FactCheckError::config(format!(
            "{what} not found. Set the {var_name} environment variable."
        ))
    })
}
