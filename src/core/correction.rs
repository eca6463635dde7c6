//! Correction-model drafting for exercises.
//!
//! Asks the model service for a structured grading guide (key points,
//! criteria, expected solution type, important keywords) that a teacher can
//! review before writing the reference solution.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::{GenerationRequest, ModelService};

/// Sampling temperature for drafting (more creative than feedback)
pub const CORRECTION_TEMPERATURE: f32 = 0.7;

/// Exercise to draft a correction model for
#[derive(Debug, Clone)]
pub struct Exercise {
    pub title: String,
    pub description: String,
}

/// Prompt for a correction model
pub fn correction_prompt(exercise: &Exercise) -> String {
    format!(
        r#"En tant qu'expert en bases de données, rédigez un modèle de correction détaillé pour cet exercice :

Titre : {title}
Description : {description}

Format de réponse attendu (JSON) :
{{
    "points_clés": ["point1", "point2"],
    "critères_évaluation": {{
        "critère1": "description et barème",
        "critère2": "description et barème"
    }},
    "solution_type": "description du type de solution attendue",
    "mots_clés_importants": ["mot1", "mot2"]
}}
"#,
        title = exercise.title.trim(),
        description = exercise.description.trim(),
    )
}

/// Draft a correction model. Unlike feedback there is no fallback: the
/// caller decides what to do with a failure.
pub async fn generate_correction_model(
    service: &dyn ModelService,
    model: &str,
    exercise: &Exercise,
    deadline: Duration,
) -> Result<String> {
    let request = GenerationRequest::new(model, correction_prompt(exercise), CORRECTION_TEMPERATURE);

    let reply = tokio::time::timeout(deadline, service.generate(&request))
        .await
        .with_context(|| format!("Correction model timed out after {:?}", deadline))?
        .with_context(|| format!("Failed to draft correction model for '{}'", exercise.title))?;

    info!(title = %exercise.title, chars = reply.len(), "Correction model drafted");
    Ok(reply.trim().to_string())
}
