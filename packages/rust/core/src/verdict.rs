//! Refutation-aware mapping from scored evidence to a verdict band.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use factcheck_shared::{ScoredEvidence, VerdictConfig, VerdictThresholds, normalize_text};

/// The five ordered verdict bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictCode {
    HighlyLikelyTrue,
    LikelyTrue,
    Uncertain,
    LikelyFalse,
    HighlyLikelyFalse,
}

impl VerdictCode {
    /// Band for `score` (inclusive lower bounds).
    pub fn for_score(score: f64, t: &VerdictThresholds) -> Self {
        if score >= t.highly_likely_true {
            Self::HighlyLikelyTrue
        } else if score >= t.likely_true {
            Self::LikelyTrue
        } else if score >= t.uncertain {
            Self::Uncertain
        } else if score >= t.likely_false {
            Self::LikelyFalse
        } else {
            Self::HighlyLikelyFalse
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighlyLikelyTrue => "HIGHLY_LIKELY_TRUE",
            Self::LikelyTrue => "LIKELY_TRUE",
            Self::Uncertain => "UNCERTAIN",
            Self::LikelyFalse => "LIKELY_FALSE",
            Self::HighlyLikelyFalse => "HIGHLY_LIKELY_FALSE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::HighlyLikelyTrue => "Rất có khả năng đúng",
            Self::LikelyTrue => "Có khả năng đúng",
            Self::Uncertain => "Không chắc chắn",
            Self::LikelyFalse => "Có khả năng sai",
            Self::HighlyLikelyFalse => "Rất có khả năng sai",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Self::HighlyLikelyTrue => "Nội dung có độ tương đồng rất cao với các nguồn tin uy tín.",
            Self::LikelyTrue => {
                "Nội dung khá tương đồng với các nguồn tin uy tín, nhưng cần xem xét thêm."
            }
            Self::Uncertain => "Nội dung có một số điểm tương đồng nhưng cần kiểm chứng kỹ hơn.",
            Self::LikelyFalse => "Nội dung có ít điểm tương đồng với các nguồn tin uy tín.",
            Self::HighlyLikelyFalse => {
                "Nội dung có độ tương đồng rất thấp với các nguồn tin uy tín."
            }
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::HighlyLikelyTrue => "green",
            Self::LikelyTrue => "lightgreen",
            Self::Uncertain => "orange",
            Self::LikelyFalse => "coral",
            Self::HighlyLikelyFalse => "red",
        }
    }
}

impl std::fmt::Display for VerdictCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: String,
    pub code: VerdictCode,
    pub explanation: String,
    pub color: String,
    /// Highest adjusted similarity among the top references.
    pub similarity: f64,
    /// Distance from the 0.5 midpoint, scaled to `[0, 1]`.
    pub confidence: f64,
}

impl Verdict {
    fn new(code: VerdictCode, similarity: f64) -> Self {
        Self {
            label: code.label().to_string(),
            code,
            explanation: code.explanation().to_string(),
            color: code.color().to_string(),
            similarity,
            confidence: ((similarity - 0.5).abs() * 2.0).clamp(0.0, 1.0),
        }
    }
}

/// One row of the displayed top references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedReference {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub source: String,
    /// Raw similarity to the claim.
    pub similarity: f64,
    /// Similarity after refutation adjustment.
    pub adjusted: f64,
    /// Whether the title marked this reference as a refutation.
    pub refuted: bool,
}

/// Maps scored evidence to a [`Verdict`].
#[derive(Debug, Clone)]
pub struct VerdictClassifier {
    thresholds: VerdictThresholds,
    refutation_terms: Vec<String>,
    refutation_min_similarity: f64,
    top_k: usize,
}

impl VerdictClassifier {
    pub fn new(config: &VerdictConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            refutation_terms: config
                .refutation_terms
                .iter()
                .map(|t| normalize_text(t))
                .filter(|t| !t.is_empty())
                .collect(),
            refutation_min_similarity: config.refutation_min_similarity,
            top_k: config.top_k.max(1),
        }
    }

    /// Whether `title` announces a debunk or denial.
    pub fn is_refutation_title(&self, title: &str) -> bool {
        let title = normalize_text(title);
        self.refutation_terms.iter().any(|term| title.contains(term.as_str()))
    }

    /// Verdict for `score` alone.
    pub fn verdict_for(&self, score: f64) -> Verdict {
        Verdict::new(VerdictCode::for_score(score, &self.thresholds), score)
    }

    /// Classify evidence sorted by raw similarity. Returns the verdict and the
    /// top references with their adjusted scores.
    pub fn classify(&self, evidence: &[ScoredEvidence]) -> (Verdict, Vec<RankedReference>) {
        let mut ordered: Vec<&ScoredEvidence> = evidence.iter().collect();
        ordered.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        let references: Vec<RankedReference> = ordered
            .into_iter()
            .take(self.top_k)
            .map(|e| {
                let refuted = e.similarity > self.refutation_min_similarity
                    && self.is_refutation_title(&e.title);
                let adjusted = if refuted { 1.0 - e.similarity } else { e.similarity };
                if refuted {
                    info!(title = %e.title, raw = e.similarity, adjusted, "refutation detected");
                }
                RankedReference {
                    url: e.url.clone(),
                    title: e.title.clone(),
                    domain: e.domain.clone(),
                    source: e.source.clone(),
                    similarity: e.similarity,
                    adjusted,
                    refuted,
                }
            })
            .collect();

        let highest = references
            .iter()
            .map(|r| r.adjusted)
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
            .unwrap_or(0.0);

        let verdict = self.verdict_for(highest);
        debug!(highest, code = %verdict.code, "verdict computed");
        (verdict, references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> VerdictClassifier {
        VerdictClassifier::new(&VerdictConfig::default())
    }

    fn evidence(title: &str, similarity: f64) -> ScoredEvidence {
        ScoredEvidence {
            url: format!("https://vnexpress.net/{}-1.html", title.len()),
            title: title.into(),
            domain: "vnexpress.net".into(),
            source: "vnexpress".into(),
            similarity,
        }
    }

    #[test]
    fn band_boundaries_are_inclusive() {
        let c = classifier();
        assert_eq!(c.verdict_for(0.85).code, VerdictCode::HighlyLikelyTrue);
        assert_eq!(c.verdict_for(0.8499).code, VerdictCode::LikelyTrue);
        assert_eq!(c.verdict_for(0.70).code, VerdictCode::LikelyTrue);
        assert_eq!(c.verdict_for(0.30).code, VerdictCode::LikelyFalse);
        assert_eq!(c.verdict_for(0.2999).code, VerdictCode::HighlyLikelyFalse);
    }

    #[test]
    fn confidence_measures_distance_from_midpoint() {
        let c = classifier();
        let zero = c.verdict_for(0.0);
        assert_eq!(zero.code, VerdictCode::HighlyLikelyFalse);
        assert_eq!(zero.confidence, 1.0);
        assert_eq!(zero.color, "red");

        let mid = c.verdict_for(0.5);
        assert_eq!(mid.code, VerdictCode::Uncertain);
        assert_eq!(mid.confidence, 0.0);
        assert_eq!(mid.color, "orange");
    }

    #[test]
    fn refutation_inverts_high_similarity() {
        let (verdict, refs) = classifier().classify(&[evidence("Bộ Y tế BÁC BỎ tin đồn vaccine", 0.9)]);
        assert!(refs[0].refuted);
        assert!((refs[0].adjusted - 0.1).abs() < 1e-9);
        assert!((verdict.similarity - 0.1).abs() < 1e-9);
        assert_eq!(verdict.code, VerdictCode::HighlyLikelyFalse);
    }

    #[test]
    fn refutation_needs_similarity_above_trigger() {
        let (verdict, refs) = classifier().classify(&[evidence("Sự thật về giá xăng", 0.6)]);
        assert!(!refs[0].refuted);
        assert_eq!(verdict.similarity, 0.6);
    }

    #[test]
    fn only_top_three_are_considered() {
        let items = vec![
            evidence("a", 0.8),
            evidence("b", 0.7),
            evidence("c", 0.65),
            evidence("d", 0.95),
            evidence("e", 0.1),
        ];
        let (verdict, refs) = classifier().classify(&items);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].title, "d");
        assert_eq!(verdict.code, VerdictCode::HighlyLikelyTrue);
    }

    #[test]
    fn refuted_top_item_yields_to_next_best() {
        let items = vec![
            evidence("Đính chính thông tin giá điện", 0.92),
            evidence("Giá điện tăng từ tháng sau", 0.75),
        ];
        let (verdict, refs) = classifier().classify(&items);
        assert!(refs[0].refuted);
        assert_eq!(verdict.similarity, 0.75);
        assert_eq!(verdict.code, VerdictCode::LikelyTrue);
    }

    #[test]
    fn no_evidence_is_highly_likely_false() {
        let (verdict, refs) = classifier().classify(&[]);
        assert!(refs.is_empty());
        assert_eq!(verdict.similarity, 0.0);
        assert_eq!(verdict.code, VerdictCode::HighlyLikelyFalse);
    }

    #[test]
    fn code_serializes_screaming_snake() {
        let json = serde_json::to_string(&VerdictCode::HighlyLikelyTrue).unwrap();
        assert_eq!(json, "\"HIGHLY_LIKELY_TRUE\"");
    }
}
