//! Per-pair comparison results.

use serde::{Deserialize, Serialize};

/// Maximum number of suggestions kept per statement pair.
pub const MAX_SUGGESTIONS: usize = 3;

/// Qualitative critique of one statement pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Natural-language critique
    pub feedback: String,

    /// Concrete improvement actions (at most three)
    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Whether this feedback came from the deterministic template
    #[serde(default)]
    pub fallback: bool,
}

impl Feedback {
    pub fn new(feedback: impl Into<String>, suggestions: Vec<String>) -> Self {
        let mut suggestions = suggestions;
        suggestions.truncate(MAX_SUGGESTIONS);
        Self {
            feedback: feedback.into(),
            suggestions,
            fallback: false,
        }
    }

    /// Mark this feedback as produced by a fallback template
    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }
}

/// How the two sides of a pair were matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairKind {
    /// Both a submitted and a reference statement exist at this position
    Matched,

    /// The reference has a statement here but the submission does not
    MissingSubmission,

    /// The submission has a statement here but the reference does not
    ExtraSubmission,
}

impl Default for PairKind {
    fn default() -> Self {
        Self::Matched
    }
}

/// Outcome of comparing one submitted statement with one reference statement.
///
/// Statements are aligned by position, so `submitted_index` and
/// `reference_index` are equal. For unmatched pairs the index refers to the
/// side that exists, see [`PairKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub submitted_index: usize,
    pub reference_index: usize,

    /// Structural similarity in [0, 1]
    pub similarity: f64,

    pub feedback_text: String,

    /// At most three suggestions
    pub suggestions: Vec<String>,

    #[serde(default)]
    pub kind: PairKind,

    /// True when the feedback came from the fallback template
    #[serde(default)]
    pub fallback: bool,
}

impl ComparisonResult {
    /// Build a result for a matched pair at `index`
    pub fn matched(index: usize, similarity: f64, feedback: Feedback) -> Self {
        Self::with_kind(index, PairKind::Matched, similarity, feedback)
    }

    pub fn with_kind(index: usize, kind: PairKind, similarity: f64, feedback: Feedback) -> Self {
        let Feedback {
            feedback,
            mut suggestions,
            fallback,
        } = feedback;
        suggestions.truncate(MAX_SUGGESTIONS);

        Self {
            submitted_index: index,
            reference_index: index,
            similarity: similarity.clamp(0.0, 1.0),
            feedback_text: feedback,
            suggestions,
            kind,
            fallback,
        }
    }
}
