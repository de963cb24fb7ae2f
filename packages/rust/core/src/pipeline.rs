//! End-to-end claim check: preprocess → discover → extract → score → classify.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use factcheck_extractor::{ArticleExtractor, ContentExtractor, MIN_CONTENT_CHARS};
use factcheck_shared::{
    AppConfig, CandidateArticle, Claim, ClaimKind, EvidenceRecord, FactCheckError,
    MAX_NUM_SOURCES, MIN_NUM_SOURCES, Result, ScoredEvidence, TrustedSource, char_len,
};

use crate::collaborators::{Preprocessor, SimilarityOracle, SourceFinder};
use crate::preprocess::KeywordPreprocessor;
use crate::search::{CachedSourceFinder, GoogleSourceFinder};
use crate::similarity::{EmbeddingOracle, HttpEmbedder};
use crate::verdict::{RankedReference, Verdict, VerdictClassifier};

/// Claims with fewer words are rejected before any work is done.
pub const MIN_CLAIM_WORDS: usize = 3;

/// Processed text shorter than this, with no keywords, has nothing to search for.
const MIN_FULL_TEXT_CHARS: usize = 15;

const DEFAULT_CONCURRENCY: usize = 5;

const MSG_INPUT_TOO_SHORT: &str =
    "Nội dung quá ngắn hoặc không đủ ngữ nghĩa để phân tích. Vui lòng cung cấp thêm chi tiết.";
const MSG_UNPROCESSABLE: &str = "Không thể xử lý input";
const MSG_NO_REFERENCES: &str = "Không tìm thấy bài báo tham khảo từ nguồn uy tín";
const MSG_CRAWL_FAILED: &str = "Không thể crawl nội dung từ các bài báo tham khảo";

const MSG_EMPTY_CONTENT: &str = "Content không được để trống";
const MSG_TOO_FEW_WORDS: &str = "Content quá ngắn (tối thiểu 3 từ)";

/// Boundary check for a submitted claim. Returns the trimmed [`Claim`] and the
/// requested source count, or a validation error suitable for the caller.
pub fn validate_claim(
    content: &str,
    kind: ClaimKind,
    num_sources: i64,
    max_num_sources: usize,
) -> Result<(Claim, usize)> {
    let claim = Claim::new(content, kind);
    if claim.raw_input.is_empty() {
        return Err(FactCheckError::validation(MSG_EMPTY_CONTENT));
    }
    if kind == ClaimKind::Text && claim.word_count() < MIN_CLAIM_WORDS {
        return Err(FactCheckError::validation(MSG_TOO_FEW_WORDS));
    }

    let max = max_num_sources.clamp(MIN_NUM_SOURCES, MAX_NUM_SOURCES);
    let count = usize::try_from(num_sources)
        .ok()
        .filter(|n| (MIN_NUM_SOURCES..=max).contains(n))
        .ok_or_else(|| {
            FactCheckError::validation(format!(
                "numSources phải nằm trong khoảng {MIN_NUM_SOURCES}-{max}"
            ))
        })?;

    Ok((claim, count))
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Non-success end states of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    InputTooShort,
    NoReferences,
    CrawlFailed,
    Error,
}

impl TerminalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputTooShort => "input_too_short",
            Self::NoReferences => "no_references",
            Self::CrawlFailed => "crawl_failed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub verdict: Verdict,
    /// Top references with raw and adjusted similarity.
    pub references: Vec<RankedReference>,
    /// All scored evidence, sorted by raw similarity descending.
    pub details: Vec<ScoredEvidence>,
    pub keywords: Vec<String>,
    /// Title of the claim article (URL claims only).
    pub title: String,
    /// Host of the claim article (URL claims only).
    pub domain: Option<String>,
    /// Candidates returned by the source finder.
    pub candidates: usize,
    /// Candidates whose content was extracted.
    pub crawled: usize,
    pub timestamp: DateTime<Utc>,
}

/// Result of [`EvidencePipeline::run`].
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Success(Box<CheckReport>),
    Terminal {
        status: TerminalStatus,
        message: String,
    },
}

impl CheckOutcome {
    fn terminal(status: TerminalStatus, message: impl Into<String>) -> Self {
        Self::Terminal {
            status,
            message: message.into(),
        }
    }

    /// `success` or the terminal status name.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Terminal { status, .. } => status.as_str(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn phase(&self, name: &str);
    /// Called after each candidate's extraction finishes.
    fn source_crawled(&self, url: &str, succeeded: bool, current: usize, total: usize);
    /// Called once with the final outcome.
    fn done(&self, outcome: &CheckOutcome, elapsed: Duration);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_crawled(&self, _url: &str, _succeeded: bool, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &CheckOutcome, _elapsed: Duration) {}
}

// ---------------------------------------------------------------------------
// EvidencePipeline
// ---------------------------------------------------------------------------

/// The verification orchestrator. Built once per process and shared.
pub struct EvidencePipeline {
    preprocessor: Arc<dyn Preprocessor>,
    finder: Arc<dyn SourceFinder>,
    extractor: Arc<dyn ArticleExtractor>,
    oracle: Arc<dyn SimilarityOracle>,
    classifier: VerdictClassifier,
    concurrency: usize,
}

impl EvidencePipeline {
    pub fn new(
        preprocessor: Arc<dyn Preprocessor>,
        finder: Arc<dyn SourceFinder>,
        extractor: Arc<dyn ArticleExtractor>,
        oracle: Arc<dyn SimilarityOracle>,
        classifier: VerdictClassifier,
    ) -> Self {
        Self {
            preprocessor,
            finder,
            extractor,
            oracle,
            classifier,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum concurrent extractions.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Wire the default collaborators from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let extractor: Arc<dyn ArticleExtractor> =
            Arc::new(ContentExtractor::new(&config.extractor)?);
        let preprocessor = Arc::new(KeywordPreprocessor::new(extractor.clone()));

        let google = GoogleSourceFinder::from_config(&config.search)?;
        let finder: Arc<dyn SourceFinder> = if config.search.cache_enabled {
            let ttl = Duration::from_secs(config.search.cache_ttl_hours * 3600);
            Arc::new(CachedSourceFinder::new(google, ttl))
        } else {
            Arc::new(google)
        };

        let oracle = Arc::new(EmbeddingOracle::new(HttpEmbedder::new(&config.embedding)?));

        Ok(Self::new(
            preprocessor,
            finder,
            extractor,
            oracle,
            VerdictClassifier::new(&config.verdict),
        )
        .with_concurrency(config.extractor.concurrency))
    }

    /// Outlets the source finder searches.
    pub fn trusted_sources(&self) -> Vec<TrustedSource> {
        self.finder.trusted_sources()
    }

    pub async fn run(&self, claim: &Claim, count: usize) -> CheckOutcome {
        self.run_with_progress(claim, count, &SilentProgress).await
    }

    /// Run the pipeline. Never fails: every error or panic becomes a
    /// terminal status.
    #[instrument(skip_all, fields(kind = %claim.kind, count))]
    pub async fn run_with_progress(
        &self,
        claim: &Claim,
        count: usize,
        progress: &dyn ProgressReporter,
    ) -> CheckOutcome {
        let start = Instant::now();

        let outcome = match AssertUnwindSafe(self.execute(claim, count, progress))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(error = %e, "pipeline failed");
                CheckOutcome::terminal(TerminalStatus::Error, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "pipeline panicked");
                CheckOutcome::terminal(TerminalStatus::Error, message)
            }
        };

        info!(
            status = outcome.status(),
            elapsed_ms = start.elapsed().as_millis(),
            "check finished"
        );
        progress.done(&outcome, start.elapsed());
        outcome
    }

    async fn execute(
        &self,
        claim: &Claim,
        count: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<CheckOutcome> {
        // --- Stage 0: Guard ---
        if claim.kind == ClaimKind::Text && claim.word_count() < MIN_CLAIM_WORDS {
            warn!(words = claim.word_count(), "claim too short");
            return Ok(CheckOutcome::terminal(TerminalStatus::InputTooShort, MSG_INPUT_TOO_SHORT));
        }
        let count = count.clamp(MIN_NUM_SOURCES, MAX_NUM_SOURCES);

        // --- Stage 1: Preprocess ---
        progress.phase("Preprocessing claim");
        let Some(processed) = self.preprocessor.process(claim).await? else {
            warn!("preprocessor could not process input");
            return Ok(CheckOutcome::terminal(TerminalStatus::Error, MSG_UNPROCESSABLE));
        };
        if processed.keywords.is_empty() && char_len(&processed.full_text) < MIN_FULL_TEXT_CHARS {
            warn!("processed claim has no searchable content");
            return Ok(CheckOutcome::terminal(TerminalStatus::InputTooShort, MSG_INPUT_TOO_SHORT));
        }
        info!(keywords = ?processed.keywords, "claim preprocessed");

        // --- Stage 2: Discover ---
        progress.phase("Searching trusted sources");
        let mut candidates = self.finder.search(&processed.keywords, count).await?;
        candidates.truncate(count);
        if candidates.is_empty() {
            warn!("no reference articles found");
            return Ok(CheckOutcome::terminal(TerminalStatus::NoReferences, MSG_NO_REFERENCES));
        }
        info!(candidates = candidates.len(), "reference articles found");

        // --- Stage 3: Extract ---
        progress.phase("Extracting evidence");
        let evidence = self.gather_evidence(&candidates, progress).await;
        if evidence.is_empty() {
            error!(candidates = candidates.len(), "all extractions failed");
            return Ok(CheckOutcome::terminal(TerminalStatus::CrawlFailed, MSG_CRAWL_FAILED));
        }
        info!(crawled = evidence.len(), candidates = candidates.len(), "evidence extracted");

        // --- Stage 4: Score ---
        progress.phase("Scoring similarity");
        let details = self.score(&processed.full_text, &evidence).await?;

        // --- Stage 5: Classify ---
        progress.phase("Classifying");
        let (verdict, references) = self.classifier.classify(&details);
        info!(
            code = %verdict.code,
            similarity = verdict.similarity,
            confidence = verdict.confidence,
            "verdict"
        );

        Ok(CheckOutcome::Success(Box::new(CheckReport {
            verdict,
            references,
            details,
            keywords: processed.keywords,
            title: processed.title,
            domain: processed.domain,
            candidates: candidates.len(),
            crawled: evidence.len(),
            timestamp: Utc::now(),
        })))
    }

    /// Extract every candidate with bounded concurrency. Failed or panicked
    /// extractions are dropped; discovery order is preserved.
    async fn gather_evidence(
        &self,
        candidates: &[CandidateArticle],
        progress: &dyn ProgressReporter,
    ) -> Vec<EvidenceRecord> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let total = candidates.len();

        let mut handles = Vec::with_capacity(total);
        for candidate in candidates {
            let sem = semaphore.clone();
            let extractor = self.extractor.clone();
            let url = candidate.url.clone();

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return Err(FactCheckError::extraction(&url, "worker pool closed"));
                };
                extractor.extract(&url).await
            }));
        }

        let mut slots: Vec<Option<EvidenceRecord>> = vec![None; total];
        for (index, handle) in handles.into_iter().enumerate() {
            let candidate = &candidates[index];
            let succeeded = match handle.await {
                Ok(Ok(article)) if char_len(&article.content) <= MIN_CONTENT_CHARS => {
                    warn!(
                        url = %candidate.url,
                        chars = char_len(&article.content),
                        "extracted content too short, dropping source"
                    );
                    false
                }
                Ok(Ok(article)) => {
                    info!(
                        url = %candidate.url,
                        strategy = %article.strategy,
                        chars = char_len(&article.content),
                        "extracted"
                    );
                    slots[index] = Some(EvidenceRecord::from_extraction(candidate, article));
                    true
                }
                Ok(Err(e)) => {
                    warn!(url = %candidate.url, error = %e, "extraction failed, dropping source");
                    false
                }
                Err(e) => {
                    warn!(url = %candidate.url, error = %e, "extraction task panicked, dropping source");
                    false
                }
            };
            progress.source_crawled(&candidate.url, succeeded, index + 1, total);
        }

        slots.into_iter().flatten().collect()
    }

    async fn score(&self, query: &str, evidence: &[EvidenceRecord]) -> Result<Vec<ScoredEvidence>> {
        let references: Vec<String> = evidence.iter().map(|e| e.content.clone()).collect();
        let scores = self.oracle.batch_similarity(query, &references).await?;

        let mut ranked = Vec::with_capacity(scores.len());
        for scored in scores {
            let record = evidence.get(scored.index).ok_or_else(|| {
                FactCheckError::Scoring(format!(
                    "similarity index {} out of range for {} references",
                    scored.index,
                    evidence.len()
                ))
            })?;
            info!(domain = %record.domain, similarity = scored.similarity, "scored");
            ranked.push((
                scored.index,
                ScoredEvidence {
                    url: record.url.clone(),
                    title: record.title.clone(),
                    domain: record.domain.clone(),
                    source: record.source.clone(),
                    similarity: scored.similarity.clamp(0.0, 1.0),
                },
            ));
        }

        // Equal scores keep discovery order whatever order the oracle used.
        ranked.sort_by(|(ia, a), (ib, b)| b.similarity.total_cmp(&a.similarity).then(ia.cmp(ib)));
        Ok(ranked.into_iter().map(|(_, e)| e).collect())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("internal error: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("internal error: {s}")
    } else {
        "internal error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use factcheck_shared::{ExtractedArticle, VerdictConfig};

    use super::*;
    use crate::collaborators::{ProcessedClaim, ScoredIndex};
    use crate::verdict::VerdictCode;

    // --- Stubs ---

    struct StubPreprocessor {
        result: Option<ProcessedClaim>,
        panics: bool,
        calls: AtomicUsize,
    }

    impl StubPreprocessor {
        fn returning(result: Option<ProcessedClaim>) -> Self {
            Self {
                result,
                panics: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Preprocessor for StubPreprocessor {
        async fn process(&self, _claim: &Claim) -> Result<Option<ProcessedClaim>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panics {
                panic!("tokenizer exploded");
            }
            Ok(self.result.clone())
        }
    }

    struct StubFinder {
        urls: Vec<&'static str>,
        requested: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SourceFinder for StubFinder {
        async fn search(&self, _keywords: &[String], count: usize) -> Result<Vec<CandidateArticle>> {
            self.requested.lock().unwrap().push(count);
            Ok(self
                .urls
                .iter()
                .map(|url| CandidateArticle {
                    url: url.to_string(),
                    title: format!("candidate {url}"),
                    snippet: String::new(),
                    source: "vnexpress".into(),
                    domain: "vnexpress.net".into(),
                })
                .collect())
        }

        fn trusted_sources(&self) -> Vec<TrustedSource> {
            Vec::new()
        }
    }

    /// Succeeds unless the URL contains `fail` or `panic`; `short` yields a
    /// page with too little content. The page title is the final path
    /// segment, empty for `untitled`.
    struct StubExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArticleExtractor for StubExtractor {
        async fn extract(&self, url: &str) -> Result<ExtractedArticle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("panic") {
                panic!("parser bug");
            }
            if url.contains("fail") {
                return Err(FactCheckError::extraction(url, "all extraction strategies failed"));
            }
            if url.contains("short") {
                return Ok(ExtractedArticle {
                    url: url.to_string(),
                    domain: "vnexpress.net".into(),
                    title: "tin ngắn".into(),
                    description: String::new(),
                    content: "giá xăng tăng".into(),
                    strategy: "direct".into(),
                });
            }
            let slug = url.rsplit('/').next().unwrap_or_default();
            Ok(ExtractedArticle {
                url: url.to_string(),
                domain: "vnexpress.net".into(),
                title: if slug == "untitled" { String::new() } else { slug.replace('-', " ") },
                description: String::new(),
                content: format!("{slug} ").repeat(40),
                strategy: "direct".into(),
            })
        }
    }

    /// Scores each reference by a fixed per-slug table; unknown slugs score 0.
    /// With `unsorted` the scores come back in reverse input order.
    struct StubOracle {
        table: Vec<(&'static str, f64)>,
        fail: bool,
        unsorted: bool,
    }

    #[async_trait]
    impl SimilarityOracle for StubOracle {
        async fn batch_similarity(&self, _query: &str, references: &[String]) -> Result<Vec<ScoredIndex>> {
            if self.fail {
                return Err(FactCheckError::Scoring("embedding backend unavailable".into()));
            }
            let mut scores: Vec<ScoredIndex> = references
                .iter()
                .enumerate()
                .map(|(index, text)| ScoredIndex {
                    index,
                    similarity: self
                        .table
                        .iter()
                        .find(|(slug, _)| text.starts_with(slug))
                        .map_or(0.0, |(_, s)| *s),
                })
                .collect();
            if self.unsorted {
                scores.reverse();
            } else {
                crate::similarity::rank(&mut scores);
            }
            Ok(scores)
        }

        async fn similarity(&self, _a: &str, _b: &str) -> Result<f64> {
            Ok(0.0)
        }
    }

    struct Harness {
        preprocessor: Arc<StubPreprocessor>,
        finder: Arc<StubFinder>,
        extractor: Arc<StubExtractor>,
        pipeline: EvidencePipeline,
    }

    fn processed() -> ProcessedClaim {
        ProcessedClaim {
            keywords: vec!["giá".into(), "xăng".into()],
            full_text: "giá xăng tăng mạnh từ chiều nay".into(),
            title: String::new(),
            domain: None,
        }
    }

    fn harness(
        preprocessor: StubPreprocessor,
        urls: Vec<&'static str>,
        oracle: StubOracle,
    ) -> Harness {
        let preprocessor = Arc::new(preprocessor);
        let finder = Arc::new(StubFinder {
            urls,
            requested: Mutex::new(Vec::new()),
        });
        let extractor = Arc::new(StubExtractor {
            calls: AtomicUsize::new(0),
        });
        let pipeline = EvidencePipeline::new(
            preprocessor.clone(),
            finder.clone(),
            extractor.clone(),
            Arc::new(oracle),
            VerdictClassifier::new(&VerdictConfig::default()),
        )
        .with_concurrency(2);
        Harness {
            preprocessor,
            finder,
            extractor,
            pipeline,
        }
    }

    fn oracle(table: Vec<(&'static str, f64)>) -> StubOracle {
        StubOracle {
            table,
            fail: false,
            unsorted: false,
        }
    }

    fn status_of(outcome: &CheckOutcome) -> Option<TerminalStatus> {
        match outcome {
            CheckOutcome::Terminal { status, .. } => Some(*status),
            CheckOutcome::Success(_) => None,
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        crawled: Mutex<Vec<(bool, usize, usize)>>,
        done: AtomicUsize,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn source_crawled(&self, _url: &str, succeeded: bool, current: usize, total: usize) {
            self.crawled.lock().unwrap().push((succeeded, current, total));
        }
        fn done(&self, _outcome: &CheckOutcome, _elapsed: Duration) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    // --- Tests ---

    #[tokio::test]
    async fn short_text_claim_skips_every_collaborator() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec!["https://vnexpress.net/a"],
            oracle(vec![]),
        );

        let outcome = h.pipeline.run(&Claim::text("giá xăng"), 5).await;

        assert_eq!(status_of(&outcome), Some(TerminalStatus::InputTooShort));
        assert_eq!(h.preprocessor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_url_claim_is_not_word_gated() {
        let h = harness(
            StubPreprocessor::returning(None),
            vec![],
            oracle(vec![]),
        );

        let outcome = h.pipeline.run(&Claim::url("https://vnexpress.net/x-1.html"), 5).await;
        assert_eq!(status_of(&outcome), Some(TerminalStatus::Error));
        assert_eq!(h.preprocessor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_processed_claim_is_too_short() {
        let h = harness(
            StubPreprocessor::returning(Some(ProcessedClaim {
                keywords: vec![],
                full_text: "a b c".into(),
                ..ProcessedClaim::default()
            })),
            vec!["https://vnexpress.net/a"],
            oracle(vec![]),
        );

        let outcome = h.pipeline.run(&Claim::text("à ừ ờ"), 5).await;
        assert_eq!(status_of(&outcome), Some(TerminalStatus::InputTooShort));
        assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_candidates_is_no_references() {
        let h = harness(StubPreprocessor::returning(Some(processed())), vec![], oracle(vec![]));

        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 5).await;
        assert_eq!(status_of(&outcome), Some(TerminalStatus::NoReferences));
    }

    #[tokio::test]
    async fn all_failed_extractions_is_crawl_failed() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec![
                "https://vnexpress.net/fail-1",
                "https://vnexpress.net/fail-2",
                "https://vnexpress.net/panic-3",
                "https://vnexpress.net/fail-4",
            ],
            oracle(vec![]),
        );

        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 5).await;

        match &outcome {
            CheckOutcome::Terminal { status, message } => {
                assert_eq!(*status, TerminalStatus::CrawlFailed);
                assert_eq!(message, MSG_CRAWL_FAILED);
            }
            CheckOutcome::Success(_) => panic!("expected crawl_failed"),
        }
        assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn partial_failures_still_produce_a_verdict() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec![
                "https://vnexpress.net/gia-xang-tang",
                "https://vnexpress.net/fail-2",
                "https://vnexpress.net/panic-3",
                "https://vnexpress.net/untitled",
            ],
            oracle(vec![("gia-xang-tang", 0.9), ("untitled", 0.4)]),
        );
        let progress = RecordingProgress::default();

        let outcome = h
            .pipeline
            .run_with_progress(&Claim::text("giá xăng tăng mạnh"), 5, &progress)
            .await;

        let CheckOutcome::Success(report) = outcome else {
            panic!("expected success");
        };
        assert_eq!(report.candidates, 4);
        assert_eq!(report.crawled, 2);
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.details[0].url, "https://vnexpress.net/gia-xang-tang");
        assert_eq!(report.details[1].title, "candidate https://vnexpress.net/untitled");
        assert_eq!(report.verdict.code, VerdictCode::HighlyLikelyTrue);
        assert_eq!(report.keywords, vec!["giá", "xăng"]);

        let crawled = progress.crawled.lock().unwrap().clone();
        assert_eq!(
            crawled,
            vec![(true, 1, 4), (false, 2, 4), (false, 3, 4), (true, 4, 4)]
        );
        assert_eq!(progress.done.load(Ordering::SeqCst), 1);
        assert_eq!(progress.phases.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn too_short_content_counts_as_failed_extraction() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec![
                "https://vnexpress.net/short-1",
                "https://vnexpress.net/short-2",
            ],
            oracle(vec![]),
        );

        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 5).await;
        assert_eq!(status_of(&outcome), Some(TerminalStatus::CrawlFailed));
        assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn short_content_is_dropped_from_scoring() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec![
                "https://vnexpress.net/short-1",
                "https://vnexpress.net/gia-xang-tang",
            ],
            oracle(vec![("gia-xang-tang", 0.9)]),
        );
        let progress = RecordingProgress::default();

        let outcome = h
            .pipeline
            .run_with_progress(&Claim::text("giá xăng tăng mạnh"), 5, &progress)
            .await;

        let CheckOutcome::Success(report) = outcome else {
            panic!("expected success");
        };
        assert_eq!(report.candidates, 2);
        assert_eq!(report.crawled, 1);
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].url, "https://vnexpress.net/gia-xang-tang");
        assert_eq!(
            progress.crawled.lock().unwrap().clone(),
            vec![(false, 1, 2), (true, 2, 2)]
        );
    }

    #[tokio::test]
    async fn equal_scores_keep_discovery_order() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec![
                "https://vnexpress.net/a-0",
                "https://vnexpress.net/a-1",
                "https://vnexpress.net/a-2",
                "https://vnexpress.net/a-3",
            ],
            StubOracle {
                table: vec![("a-", 0.8)],
                fail: false,
                unsorted: true,
            },
        );

        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 5).await;

        let CheckOutcome::Success(report) = outcome else {
            panic!("expected success");
        };
        let urls: Vec<&str> = report.details.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://vnexpress.net/a-0",
                "https://vnexpress.net/a-1",
                "https://vnexpress.net/a-2",
                "https://vnexpress.net/a-3",
            ]
        );
        let refs: Vec<&str> = report.references.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(refs, urls[..refs.len()].to_vec());
    }

    #[tokio::test]
    async fn refuting_evidence_flips_the_verdict() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec!["https://vnexpress.net/hoax-gia-xang"],
            oracle(vec![("hoax-gia-xang", 0.9)]),
        );
        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 5).await;
        let CheckOutcome::Success(report) = outcome else {
            panic!("expected success");
        };
        assert!(report.references[0].refuted);
        assert_eq!(report.verdict.code, VerdictCode::HighlyLikelyFalse);
    }

    #[tokio::test]
    async fn count_is_clamped_and_candidates_truncated() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec![
                "https://vnexpress.net/a-1",
                "https://vnexpress.net/b-2",
                "https://vnexpress.net/c-3",
            ],
            oracle(vec![]),
        );

        h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 50).await;
        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 0).await;

        assert_eq!(*h.finder.requested.lock().unwrap(), vec![10, 1]);
        let CheckOutcome::Success(report) = outcome else {
            panic!("expected success");
        };
        assert_eq!(report.candidates, 1);
        assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn scoring_failure_is_error_status() {
        let h = harness(
            StubPreprocessor::returning(Some(processed())),
            vec!["https://vnexpress.net/gia-xang"],
            StubOracle {
                table: vec![],
                fail: true,
                unsorted: false,
            },
        );

        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 5).await;
        match outcome {
            CheckOutcome::Terminal { status, message } => {
                assert_eq!(status, TerminalStatus::Error);
                assert!(message.contains("embedding backend unavailable"));
            }
            CheckOutcome::Success(_) => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn panicking_stage_becomes_error_status() {
        let h = harness(
            StubPreprocessor {
                result: None,
                panics: true,
                calls: AtomicUsize::new(0),
            },
            vec![],
            oracle(vec![]),
        );

        let outcome = h.pipeline.run(&Claim::text("giá xăng tăng mạnh"), 5).await;
        match outcome {
            CheckOutcome::Terminal { status, message } => {
                assert_eq!(status, TerminalStatus::Error);
                assert!(message.contains("tokenizer exploded"));
            }
            CheckOutcome::Success(_) => panic!("expected error"),
        }
    }

    #[test]
    fn validation_rejects_blank_and_short_text() {
        let err = validate_claim("   ", ClaimKind::Url, 5, 10).unwrap_err();
        assert!(matches!(err, FactCheckError::Validation { .. }));
        assert!(err.to_string().contains("trống"));

        let err = validate_claim("hai từ", ClaimKind::Text, 5, 10).unwrap_err();
        assert!(err.to_string().contains("tối thiểu 3 từ"));

        let (claim, count) =
            validate_claim("  https://vnexpress.net/a-1.html ", ClaimKind::Url, 3, 10).unwrap();
        assert_eq!(claim.raw_input, "https://vnexpress.net/a-1.html");
        assert_eq!(count, 3);
    }

    #[test]
    fn validation_bounds_source_count() {
        let text = "giá xăng tăng mạnh";
        assert!(validate_claim(text, ClaimKind::Text, 0, 10).is_err());
        assert!(validate_claim(text, ClaimKind::Text, -2, 10).is_err());
        assert!(validate_claim(text, ClaimKind::Text, 11, 10).is_err());
        assert!(validate_claim(text, ClaimKind::Text, 7, 5).is_err());
        assert_eq!(validate_claim(text, ClaimKind::Text, 10, 10).unwrap().1, 10);
    }

    #[test]
    fn status_names_are_snake_case() {
        assert_eq!(TerminalStatus::InputTooShort.as_str(), "input_too_short");
        assert_eq!(
            serde_json::to_string(&TerminalStatus::CrawlFailed).unwrap(),
            "\"crawl_failed\""
        );
    }
}
