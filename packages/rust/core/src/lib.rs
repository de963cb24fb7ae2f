//! Claim verification: collaborator seams, the evidence pipeline, and the
//! refutation-aware verdict classifier.

pub mod collaborators;
pub mod pipeline;
pub mod preprocess;
pub mod search;
pub mod similarity;
pub mod verdict;

pub use collaborators::{
    Embedder, Preprocessor, ProcessedClaim, ScoredIndex, SimilarityOracle, SourceFinder,
};
pub use pipeline::{
    CheckOutcome, CheckReport, EvidencePipeline, MIN_CLAIM_WORDS, ProgressReporter,
    SilentProgress, TerminalStatus, validate_claim,
};
pub use preprocess::{KeywordPreprocessor, extract_keywords};
pub use search::{CachedSourceFinder, GoogleSourceFinder};
pub use similarity::{EmbeddingOracle, HttpEmbedder, cosine_similarity};
pub use verdict::{RankedReference, Verdict, VerdictClassifier, VerdictCode};
