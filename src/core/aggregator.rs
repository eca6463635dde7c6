//! Combines per-pair results into the final outcome.
//!
//! The grade is the mean similarity scaled to 20. The criterion scores are
//! that same mean scaled to 10; they are not measured independently.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::domain::{
    ComparisonResult, EvaluationOutcome, ExtractedStatement, PairKind, CRITERIA,
    MAX_CRITERION_SCORE, MAX_GRADE,
};

use super::evaluator::EvaluationError;
use super::similarity::round2;

/// Feedback when the submission holds no SQL
pub const NO_STATEMENTS_FEEDBACK: &str = "Aucune requête SQL n'a été trouvée dans votre soumission. Veuillez soumettre des requêtes SQL valides.";

/// Suggestions when the submission holds no SQL
pub const NO_STATEMENTS_SUGGESTIONS: [&str; 3] = [
    "Soumettre un document contenant vos requêtes SQL sous forme de texte, et non d'image",
    "Terminer chaque requête par un point-virgule",
    "Vérifier que le fichier déposé correspond bien à cet exercice",
];

/// Suggestions when grading failed
pub const ERROR_SUGGESTIONS: [&str; 3] = [
    "Vérifiez que votre fichier PDF est correctement formaté",
    "Assurez-vous que vos requêtes SQL sont valides",
    "Si le problème persiste, contactez votre professeur",
];

/// Whether grading can go ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Both sides have statements
    Ready,

    /// The submission is empty; grade it 0 without pairing
    NothingSubmitted,
}

/// Check the statement lists before pairing.
///
/// An empty submission is checked first, so a pair of empty documents ends
/// as `NothingSubmitted` rather than as an error.
pub fn readiness(
    submitted: &[ExtractedStatement],
    reference: &[ExtractedStatement],
) -> Result<Readiness, EvaluationError> {
    if submitted.is_empty() {
        return Ok(Readiness::NothingSubmitted);
    }
    if reference.is_empty() {
        return Err(EvaluationError::NoReferenceStatements);
    }
    Ok(Readiness::Ready)
}

/// Aggregate comparison results in statement order
pub fn aggregate(comparisons: &[ComparisonResult]) -> EvaluationOutcome {
    let mean = mean_similarity(comparisons);

    EvaluationOutcome {
        grade: round2(mean * MAX_GRADE).clamp(0.0, MAX_GRADE),
        feedback: format_feedback(comparisons),
        criteria_scores: criterion_scores(mean),
        improvement_suggestions: comparisons
            .iter()
            .flat_map(|c| c.suggestions.iter().cloned())
            .collect(),
    }
}

/// Outcome for a submission without SQL
pub fn no_statements_outcome() -> EvaluationOutcome {
    EvaluationOutcome::zero(NO_STATEMENTS_FEEDBACK, &NO_STATEMENTS_SUGGESTIONS)
}

/// Outcome for a failed evaluation
pub fn error_outcome(message: &str) -> EvaluationOutcome {
    let message = if message.trim().is_empty() {
        "Une erreur inconnue s'est produite lors de l'évaluation"
    } else {
        message
    };
    EvaluationOutcome::zero(
        format!("Erreur lors de l'évaluation : {}", message),
        &ERROR_SUGGESTIONS,
    )
}

/// Every criterion gets the mean similarity scaled to 10
pub fn criterion_scores(mean: f64) -> BTreeMap<String, f64> {
    let score = round2(mean * MAX_CRITERION_SCORE).clamp(0.0, MAX_CRITERION_SCORE);
    CRITERIA
        .iter()
        .map(|criterion| (criterion.name.to_string(), score))
        .collect()
}

fn mean_similarity(comparisons: &[ComparisonResult]) -> f64 {
    if comparisons.is_empty() {
        return 0.0;
    }
    let total: f64 = comparisons.iter().map(|c| c.similarity).sum();
    (total / comparisons.len() as f64).clamp(0.0, 1.0)
}

/// One section per pair, in statement order
pub fn format_feedback(comparisons: &[ComparisonResult]) -> String {
    let mut out = String::from("Évaluation détaillée :\n\n");

    for (position, comparison) in comparisons.iter().enumerate() {
        let label = match comparison.kind {
            PairKind::Matched => "",
            PairKind::MissingSubmission => " (manquante)",
            PairKind::ExtraSubmission => " (en trop)",
        };

        // Writing to a String cannot fail
        let _ = writeln!(out, "Requête {}{} :", position + 1, label);
        let _ = writeln!(out, "Score : {:.1}/20\n", comparison.similarity * MAX_GRADE);
        let _ = writeln!(out, "Analyse :\n{}\n", comparison.feedback_text);

        if !comparison.suggestions.is_empty() {
            out.push_str("Suggestions d'amélioration :\n");
            for suggestion in &comparison.suggestions {
                let _ = writeln!(out, "• {}", suggestion);
            }
        }
        out.push('\n');
    }

    out
}
