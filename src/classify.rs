//! Confidence cascade combining dataset similarity with CV heuristics.
//!
//! The cascade is a fixed, loop-free decision tree:
//! 1. default `Freehand` at the base confidence, sourced from CV;
//! 2. a dataset match (if any) raises confidence from hash similarity;
//! 3. below the review threshold, grid/symmetry heuristics may override;
//! 4. anything still below the threshold is flagged for external review,
//!    which the host performs and records via [`ClassificationResult::with_external_review`].

use serde::{Deserialize, Serialize};

use crate::config::CascadeConfig;
use crate::dataset::{KolamLabel, NearestMatch};
use crate::grid::Grid;
use crate::symmetry::SymmetryFlag;

const MATCH_STRATEGY: &str = "pHash-NN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cv,
    Dataset,
    External,
}

/// Evidence recorded by the dataset stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    pub strategy: String,
    /// Normalized similarity rounded to three decimals.
    pub similarity: f64,
    pub distance: u32,
    pub matched: String,
}

/// Evidence recorded by an external reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDetails {
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationDetails {
    Match(MatchDetails),
    External(ExternalDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub label: KolamLabel,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ClassificationDetails>,
    /// Confidence stayed below the review threshold; the host may consult an external analyzer.
    pub needs_external_review: bool,
}

impl ClassificationResult {
    /// Records an external reviewer's verdict: source becomes `external` and
    /// confidence is raised to at least `config.external_floor`.
    pub fn with_external_review(
        self,
        label: KolamLabel,
        model: impl Into<String>,
        config: &CascadeConfig,
    ) -> Self {
        Self {
            label,
            confidence: self.confidence.max(config.external_floor).clamp(0.0, 1.0),
            source: Source::External,
            details: Some(ClassificationDetails::External(ExternalDetails {
                model: model.into(),
            })),
            needs_external_review: false,
        }
    }
}

/// CV-side inputs of the cascade.
#[derive(Debug, Clone, Copy)]
pub struct CvEvidence<'a> {
    pub dot_count: usize,
    pub grid: Grid,
    pub symmetry: &'a [SymmetryFlag],
}

impl CvEvidence<'_> {
    /// Heuristic label: dots on a grid suggest Pulli; two-axis mirror symmetry suggests Sikku.
    pub fn heuristic(&self, config: &CascadeConfig) -> (KolamLabel, f64) {
        let mut label = KolamLabel::Freehand;
        let mut confidence = config.cv_freehand_confidence;
        if self.dot_count >= 4 && self.grid.is_established() {
            label = KolamLabel::Pulli;
            confidence = config.cv_pulli_confidence;
        }
        if self.symmetry.contains(&SymmetryFlag::HorizontalMirror)
            && self.symmetry.contains(&SymmetryFlag::VerticalMirror)
        {
            label = KolamLabel::Sikku;
            confidence = confidence.max(config.cv_sikku_confidence);
        }
        (label, confidence)
    }
}

pub fn classify(
    evidence: &CvEvidence<'_>,
    nearest: Option<&NearestMatch<'_>>,
    config: &CascadeConfig,
) -> ClassificationResult {
    let mut label = KolamLabel::Freehand;
    let mut confidence = config.base_confidence;
    let mut source = Source::Cv;
    let mut details = None;

    if let Some(found) = nearest {
        if found.entry.label != KolamLabel::Unknown {
            label = found.entry.label;
        }
        confidence = confidence.max(
            config
                .dataset_ceiling
                .min(config.base_confidence + found.similarity * config.similarity_weight),
        );
        source = Source::Dataset;
        details = Some(ClassificationDetails::Match(MatchDetails {
            strategy: MATCH_STRATEGY.to_string(),
            similarity: (found.similarity * 1000.0).round() / 1000.0,
            distance: found.distance,
            matched: found.entry.path.display().to_string(),
        }));
    }

    if confidence < config.review_threshold {
        let (cv_label, cv_confidence) = evidence.heuristic(config);
        if cv_confidence > confidence {
            label = cv_label;
            confidence = cv_confidence;
        }
    }

    let confidence = confidence.clamp(0.0, 1.0);
    tracing::debug!("classified {label} at {confidence:.3} from {source:?}");
    ClassificationResult {
        label,
        confidence,
        source,
        details,
        needs_external_review: confidence < config.review_threshold,
    }
}
