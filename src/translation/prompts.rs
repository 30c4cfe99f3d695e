/*!
 * Instructions sent with each batch.
 *
 * The system message fixes the languages and the response shape; the user
 * message is the batch payload as compact JSON and nothing else.
 */

use anyhow::Result;

use super::profile::ExpectedShape;
use super::record::BatchRequest;
use crate::language_utils;

/// System prompt template with language placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for reference data translation.
    pub const REFERENCE_TRANSLATOR: &'static str = "You are a precise translator. \
Translate the {source_language} values you are given to {target_language}. \
Use the most common {target_language} names for places and signs. \
Keep the meaning and tone; do not summarize or add explanations.";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self { template: template.to_string() }
    }

    /// Render the template with the given language names.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(Self::REFERENCE_TRANSLATOR)
    }
}

/// Rendered messages for one service call
#[derive(Debug, Clone, PartialEq)]
pub struct Instructions {
    /// System message
    pub system: String,
    /// User message
    pub user: String,
}

/// Response format directive for a batch
pub fn shape_directive(shape: ExpectedShape, request: &BatchRequest) -> String {
    let keys = request
        .units
        .first()
        .map(|u| u.fields.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", "))
        .unwrap_or_default();
    let single_field = request.units.first().is_some_and(|u| u.fields.len() == 1);

    match shape {
        ExpectedShape::Array if single_field => format!(
            "Return ONLY a JSON array of exactly {} strings, one per input element, in the same order.",
            request.len()
        ),
        ExpectedShape::Array => format!(
            "Return ONLY a JSON array of exactly {} objects with keys: {}, one per input element, in the same order.",
            request.len(),
            keys
        ),
        ExpectedShape::Object => format!(
            "Return ONLY one JSON object with exactly the same keys as the input ({}), every value translated.",
            keys
        ),
    }
}

/// Build the system and user messages for a batch
pub fn build_instructions(
    template: &PromptTemplate,
    source_language: &str,
    target_language: &str,
    shape: ExpectedShape,
    request: &BatchRequest,
) -> Result<Instructions> {
    let source_name = language_utils::get_language_name(source_language)?;
    let target_name = language_utils::get_language_name(target_language)?;

    let system = format!(
        "{}\n{} Do not change the order. No extra text, no code fences.",
        template.render(&source_name, &target_name),
        shape_directive(shape, request)
    );

    let payload = match shape {
        ExpectedShape::Array => request.payload(),
        ExpectedShape::Object => request
            .units
            .first()
            .map(|u| u.to_object())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
    };

    Ok(Instructions { system, user: payload.to_string() })
}
