//! Positional alignment of submitted and reference statements.
//!
//! The first submitted statement is compared with the first reference
//! statement, and so on. What happens to statements past the end of the
//! shorter list is a grading policy:
//!
//! - `Truncate` drops them silently (the historical behaviour)
//! - `PenalizeMissing` keeps them as zero-similarity pairs

use serde::{Deserialize, Serialize};

use crate::domain::{ExtractedStatement, Feedback, PairKind};

/// What to do with statements that have no counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Only score positions present on both sides
    Truncate,

    /// Score unmatched positions on either side as 0
    PenalizeMissing,
}

impl Default for PairingPolicy {
    fn default() -> Self {
        Self::Truncate
    }
}

impl std::str::FromStr for PairingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "truncate" => Ok(Self::Truncate),
            "penalize_missing" => Ok(Self::PenalizeMissing),
            other => Err(format!("unknown pairing policy: {}", other)),
        }
    }
}

/// Statements sharing one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementPair<'a> {
    pub index: usize,
    pub submitted: Option<&'a ExtractedStatement>,
    pub reference: Option<&'a ExtractedStatement>,
}

impl StatementPair<'_> {
    pub fn kind(&self) -> PairKind {
        match (self.submitted, self.reference) {
            (Some(_), None) => PairKind::ExtraSubmission,
            (None, Some(_)) => PairKind::MissingSubmission,
            _ => PairKind::Matched,
        }
    }
}

/// Align two statement lists by position
pub fn pair_statements<'a>(
    submitted: &'a [ExtractedStatement],
    reference: &'a [ExtractedStatement],
    policy: PairingPolicy,
) -> Vec<StatementPair<'a>> {
    let len = match policy {
        PairingPolicy::Truncate => submitted.len().min(reference.len()),
        PairingPolicy::PenalizeMissing => submitted.len().max(reference.len()),
    };

    (0..len)
        .map(|index| StatementPair {
            index,
            submitted: submitted.get(index),
            reference: reference.get(index),
        })
        .collect()
}

/// Fixed feedback for a position only one side has
pub fn unmatched_feedback(kind: PairKind) -> Feedback {
    match kind {
        PairKind::MissingSubmission => Feedback::new(
            "Aucune requête ne correspond à cette question de la correction.",
            vec!["Ajouter la requête manquante pour cette question".to_string()],
        ),
        PairKind::ExtraSubmission => Feedback::new(
            "Cette requête ne correspond à aucune question de la correction.",
            vec!["Vérifier que chaque requête répond à une question de l'énoncé".to_string()],
        ),
        PairKind::Matched => Feedback::new(String::new(), Vec::new()),
    }
}
