//! Qualitative feedback for one statement pair.
//!
//! The model service is asked for a JSON object
//! `{"feedback": "...", "suggestions": ["...", ...]}`. Models are chatty and
//! sloppy with JSON, so the reply goes through a repair pipeline before it is
//! parsed:
//!
//! 1. slice from the first `{` to the last `}`
//! 2. collapse whitespace runs (newlines included) to single spaces
//! 3. close doubled braces (`} }` -> `}}`)
//! 4. drop the gap between a quote and a closing brace (`" }` -> `"}`)
//! 5. strip trailing commas before `]` or `}`
//!
//! [`FeedbackGenerator::generate`] never fails: transport errors, timeouts
//! and unparseable replies all end in [`fallback_feedback`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::adapters::{GenerationRequest, ModelService};
use crate::domain::{Feedback, MAX_SUGGESTIONS};

use super::normalizer::normalize;
use super::retry::RetryPolicy;

/// Default model used for feedback
pub const DEFAULT_MODEL: &str = "deepseek-coder";

/// Feedback generation failures. Absorbed by the fallback, never returned
/// to callers of [`FeedbackGenerator::generate`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedbackError {
    #[error("Model service error: {0}")]
    ModelService(String),

    #[error("Model service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unusable model response: {0}")]
    ResponseParse(String),
}

/// Settings for feedback generation
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSettings {
    /// Model name sent to the service
    pub model: String,

    /// Sampling temperature (kept low for stable output)
    pub temperature: f32,

    /// Output length budget
    pub max_tokens: Option<u32>,

    /// Deadline for one model call
    pub timeout: Duration,

    /// Retries before falling back
    pub retry_policy: RetryPolicy,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: Some(800),
            timeout: Duration::from_secs(60),
            retry_policy: RetryPolicy::none(),
        }
    }
}

impl FeedbackSettings {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the request for a prompt
    pub fn request(&self, prompt: String) -> GenerationRequest {
        let request = GenerationRequest::new(self.model.clone(), prompt, self.temperature);
        match self.max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        }
    }
}

/// Writes feedback for statement pairs through a model service
pub struct FeedbackGenerator {
    service: Arc<dyn ModelService>,
    settings: FeedbackSettings,
}

impl FeedbackGenerator {
    pub fn new(service: Arc<dyn ModelService>, settings: FeedbackSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> &FeedbackSettings {
        &self.settings
    }

    pub fn service(&self) -> &Arc<dyn ModelService> {
        &self.service
    }

    /// Feedback for one pair. Falls back to the template on any failure.
    pub async fn generate(&self, submitted: &str, reference: &str, similarity: f64) -> Feedback {
        debug!(
            submitted = %normalize(submitted),
            reference = %normalize(reference),
            "Requesting feedback"
        );

        let request = self.settings.request(build_prompt(submitted, reference));
        let policy = &self.settings.retry_policy;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.try_generate(&request).await {
                Ok(feedback) => return feedback,
                Err(e) if policy.should_retry(attempt) => {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        service = self.service.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Feedback generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        service = self.service.name(),
                        attempt,
                        error = %e,
                        "Feedback generation failed, using fallback"
                    );
                    return fallback_feedback(similarity);
                }
            }
        }
    }

    async fn try_generate(&self, request: &GenerationRequest) -> Result<Feedback, FeedbackError> {
        let raw = match tokio::time::timeout(self.settings.timeout, self.service.generate(request))
            .await
        {
            Err(_) => return Err(FeedbackError::Timeout(self.settings.timeout)),
            Ok(Err(e)) => return Err(FeedbackError::ModelService(format!("{:#}", e))),
            Ok(Ok(raw)) => raw,
        };

        parse_feedback(&raw).map_err(|e| {
            debug!(raw = %truncate(&raw, 300), "Raw model reply");
            e
        })
    }
}

/// Prompt asking for a JSON critique of `submitted` against `reference`
pub fn build_prompt(submitted: &str, reference: &str) -> String {
    format!(
        r#"En tant qu'expert en bases de données, comparez la requête SQL d'un étudiant avec la correction attendue.
Évaluez :
1. La syntaxe et la structure
2. La performance et l'optimisation
3. Les bonnes pratiques
4. Des améliorations concrètes

Requête soumise :
{submitted}

Correction attendue :
{reference}

EXEMPLE DE RÉPONSE ATTENDUE :
{{
    "feedback": "La requête est correcte et renvoie les résultats attendus. La jointure entre EMPRUNTS et LIVRES est bien écrite, mais un LEFT JOIN garderait les livres jamais empruntés. Les alias rendent la requête lisible. Le filtre WHERE sur l'année est juste.",
    "suggestions": [
        "Remplacer JOIN par LEFT JOIN pour conserver les livres sans emprunt",
        "Utiliser COUNT(DISTINCT e.id) pour éviter de compter des doublons",
        "Ajouter un commentaire décrivant la règle métier appliquée"
    ]
}}

RÈGLES STRICTES :
1. Répondez UNIQUEMENT avec l'objet JSON
2. Aucun texte avant ou après le JSON
3. Utilisez des guillemets doubles pour toutes les chaînes
4. "feedback" est une seule chaîne de texte détaillée
5. "suggestions" contient des actions concrètes et précises
"#,
        submitted = submitted.trim(),
        reference = reference.trim(),
    )
}

/// Deterministic feedback used when the model service cannot help
pub fn fallback_feedback(similarity: f64) -> Feedback {
    let feedback = format!(
        "La requête obtient un score de similarité de {:.2}. \
         L'analyse détaillée n'est pas disponible, voici une appréciation générale. \
         Vérifiez que les jointures relient les bonnes tables avec des conditions explicites, \
         que les alias de tables rendent la requête lisible et que les conditions de filtrage \
         (WHERE, HAVING) correspondent bien à l'énoncé.",
        similarity
    );

    Feedback::new(
        feedback,
        FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
    )
    .as_fallback()
}

/// Suggestions attached to every fallback feedback
pub const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "Comparer les tables jointes et les conditions de jointure avec l'énoncé, et utiliser LEFT JOIN lorsque les enregistrements sans correspondance doivent apparaître",
    "Ajouter des index sur les colonnes utilisées dans les jointures et les conditions WHERE",
    "Commenter la requête pour expliquer la logique métier et les choix d'implémentation",
];

/// Parse a raw model reply into feedback
pub fn parse_feedback(raw: &str) -> Result<Feedback, FeedbackError> {
    let repaired = repair_response(raw)?;

    let value: Value = serde_json::from_str(&repaired)
        .map_err(|e| FeedbackError::ResponseParse(format!("invalid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| FeedbackError::ResponseParse("reply is not a JSON object".into()))?;

    let feedback = match object.get("feedback") {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::String(_)) => {
            return Err(FeedbackError::ResponseParse("feedback is empty".into()))
        }
        _ => {
            return Err(FeedbackError::ResponseParse(
                "feedback must be a string".into(),
            ))
        }
    };

    let suggestions = match object.get("suggestions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(stringify)
            .collect(),
        Some(_) => {
            return Err(FeedbackError::ResponseParse(
                "suggestions must be a list".into(),
            ))
        }
    };

    Ok(Feedback::new(feedback, suggestions))
}

/// Run every repair step over a raw reply
pub fn repair_response(raw: &str) -> Result<String, FeedbackError> {
    let span = slice_json_span(raw)?;
    let repaired = collapse_whitespace(span);
    let repaired = close_doubled_braces(&repaired);
    let repaired = drop_quote_gap_before_brace(&repaired);
    Ok(strip_trailing_commas(&repaired))
}

/// Slice from the first `{` to the last `}` (inclusive)
pub fn slice_json_span(raw: &str) -> Result<&str, FeedbackError> {
    let start = raw
        .find('{')
        .ok_or_else(|| FeedbackError::ResponseParse("no opening brace".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| FeedbackError::ResponseParse("no closing brace".into()))?;

    if end < start {
        return Err(FeedbackError::ResponseParse(
            "closing brace before opening brace".into(),
        ));
    }

    Ok(&raw[start..=end])
}

/// Collapse whitespace runs, literal newlines included, to one space
pub fn collapse_whitespace(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
    re.replace_all(text, " ").into_owned()
}

/// `} }` -> `}}`
pub fn close_doubled_braces(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\}\s*\}").expect("brace pattern is valid"));
    re.replace_all(text, "}}").into_owned()
}

/// `" }` -> `"}`
pub fn drop_quote_gap_before_brace(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#""\s*\}"#).expect("quote pattern is valid"));
    re.replace_all(text, "\"}").into_owned()
}

/// `, ]` -> `]` and `, }` -> `}`
pub fn strip_trailing_commas(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r",\s*([\]\}])").expect("comma pattern is valid"));
    re.replace_all(text, "$1").into_owned()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_json_span() {
        let raw = "Voici mon analyse : {\"feedback\": \"ok\"} merci !";
        assert_eq!(slice_json_span(raw).unwrap(), "{\"feedback\": \"ok\"}");
    }

    #[test]
    fn test_slice_json_span_missing_braces() {
        assert!(matches!(
            slice_json_span("no json here"),
            Err(FeedbackError::ResponseParse(_))
        ));
        assert!(slice_json_span("only {").is_err());
        assert!(slice_json_span("} backwards {").is_err());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("{\n  \"a\":\t1\r\n}"), "{ \"a\": 1 }");
    }

    #[test]
    fn test_close_doubled_braces() {
        assert_eq!(close_doubled_braces("{\"a\": {\"b\": 1} }"), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_drop_quote_gap_before_brace() {
        assert_eq!(drop_quote_gap_before_brace("{\"a\": \"b\" }"), "{\"a\": \"b\"}");
    }

    #[test]
    fn test_strip_trailing_commas() {
        assert_eq!(strip_trailing_commas("[\"a\", \"b\", ]"), "[\"a\", \"b\"]");
        assert_eq!(strip_trailing_commas("{\"a\": 1, }"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_clean_reply() {
        let raw = r#"{"feedback": "Bonne requête.", "suggestions": ["Ajouter un alias", " Trier "]}"#;
        let feedback = parse_feedback(raw).unwrap();

        assert_eq!(feedback.feedback, "Bonne requête.");
        assert_eq!(feedback.suggestions, vec!["Ajouter un alias", "Trier"]);
        assert!(!feedback.fallback);
    }

    #[test]
    fn test_parse_verbose_malformed_reply() {
        let raw = "Bien sûr ! Voici l'évaluation :\n```json\n{\n  \"feedback\": \"La jointure est correcte.\"  ,\n  \"suggestions\": [\n    \"Utiliser LEFT JOIN\",\n    \"Ajouter un index\",\n  ]\n}\n```\nBonne journée.";
        let feedback = parse_feedback(raw).unwrap();

        assert_eq!(feedback.feedback, "La jointure est correcte.");
        assert_eq!(feedback.suggestions, vec!["Utiliser LEFT JOIN", "Ajouter un index"]);
    }

    #[test]
    fn test_parse_truncates_and_stringifies_suggestions() {
        let raw = r#"{"feedback": "x", "suggestions": ["a", 2, true, "d", "e"]}"#;
        let feedback = parse_feedback(raw).unwrap();
        assert_eq!(feedback.suggestions, vec!["a", "2", "true"]);
    }

    #[test]
    fn test_parse_missing_suggestions_is_accepted() {
        let feedback = parse_feedback(r#"{"feedback": "Rien à redire."}"#).unwrap();
        assert!(feedback.suggestions.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(parse_feedback(r#"{"feedback": 3}"#).is_err());
        assert!(parse_feedback(r#"{"suggestions": []}"#).is_err());
        assert!(parse_feedback(r#"{"feedback": "  "}"#).is_err());
        assert!(parse_feedback(r#"{"feedback": "ok", "suggestions": "do it"}"#).is_err());
        assert!(parse_feedback(r#"{"feedback": "ok" "suggestions": []}"#).is_err());
    }

    #[test]
    fn test_fallback_feedback() {
        let feedback = fallback_feedback(0.456);

        assert!(feedback.feedback.contains("0.46"));
        assert_eq!(feedback.suggestions.len(), 3);
        assert!(feedback.fallback);
    }

    #[test]
    fn test_prompt_contains_statements_and_rules() {
        let prompt = build_prompt("  SELECT a FROM t;\n", "SELECT b FROM u;");

        assert!(prompt.contains("SELECT a FROM t;"));
        assert!(prompt.contains("SELECT b FROM u;"));
        assert!(prompt.contains("\"suggestions\": ["));
        assert!(prompt.contains("UNIQUEMENT"));
    }

    #[test]
    fn test_settings_request() {
        let settings = FeedbackSettings::default();
        let request = settings.request("p".into());

        assert_eq!(request.model, DEFAULT_MODEL);
        assert_eq!(request.max_tokens, Some(800));
        assert!(request.temperature < 0.5);
    }
}
