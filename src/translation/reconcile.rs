/*!
 * Response reconciliation.
 *
 * Turns the free text returned by the service into one set of translated
 * fields per request unit, in request order. Parsing escalates through:
 *
 * 1. a direct parse of the whole text
 * 2. a parse of the outermost container span (first opening to last closing delimiter)
 * 3. the same after stripping code fences and trailing commas
 *
 * The result must match the request arity exactly. Blank translations fall
 * back to the source text.
 */

use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::profile::ExpectedShape;
use super::record::{BatchRequest, BatchResponse, TranslatedFields, TranslationUnit};
use crate::errors::PipelineError;

/// A comma directly before a closing bracket or brace
static TRAILING_COMMA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("Invalid trailing comma regex"));

/// Markdown code fence markers with an optional language tag
static CODE_FENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("Invalid code fence regex"));

/// Maps raw responses onto batch results for one expected shape
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    shape: ExpectedShape,
}

impl Reconciler {
    pub fn new(shape: ExpectedShape) -> Self {
        Self { shape }
    }

    /// Reconcile a raw response against the request it answers
    pub fn reconcile(&self, request: &BatchRequest, raw: &str) -> Result<BatchResponse, PipelineError> {
        let value = self.parse(raw)?;

        let elements = match (self.shape, value) {
            (ExpectedShape::Array, Value::Array(items)) => items,
            (ExpectedShape::Object, value @ Value::Object(_)) => {
                if request.len() != 1 {
                    return Err(PipelineError::Repair(format!(
                        "An object response answers exactly one record, batch has {}",
                        request.len()
                    )));
                }
                vec![value]
            }
            (shape, other) => {
                return Err(PipelineError::Repair(format!(
                    "Expected a JSON {:?} response, got {}",
                    shape,
                    excerpt(&other.to_string())
                )));
            }
        };

        if elements.len() != request.len() {
            return Err(PipelineError::Repair(format!(
                "Translation count mismatch. Expected {} got {}",
                request.len(),
                elements.len()
            )));
        }

        let items = request
            .units
            .iter()
            .zip(elements.iter())
            .enumerate()
            .map(|(position, (unit, element))| translated_fields(position, unit, element))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BatchResponse { items })
    }

    /// Parse the expected container out of a raw response
    pub fn parse(&self, raw: &str) -> Result<Value, PipelineError> {
        let trimmed = raw.trim();

        if let Some(value) = self.parse_matching(trimmed) {
            return Ok(value);
        }

        if let Some(value) = self.outer_span(trimmed).and_then(|span| self.parse_matching(span)) {
            debug!("Recovered response from its outer container span");
            return Ok(value);
        }

        let repaired = repair(trimmed);
        let candidate = self.outer_span(&repaired).unwrap_or(&repaired);
        if let Some(value) = self.parse_matching(candidate) {
            warn!("Repaired malformed response (code fences or trailing commas)");
            return Ok(value);
        }

        let (open, _) = self.shape.delimiters();
        Err(PipelineError::Repair(format!(
            "No JSON {} found in response: {}",
            if open == '[' { "array" } else { "object" },
            excerpt(trimmed)
        )))
    }

    fn parse_matching(&self, text: &str) -> Option<Value> {
        serde_json::from_str::<Value>(text)
            .ok()
            .filter(|value| self.shape.matches(value))
    }

    fn outer_span<'a>(&self, text: &'a str) -> Option<&'a str> {
        let (open, close) = self.shape.delimiters();
        let start = text.find(open)?;
        let end = text.rfind(close)?;
        (end > start).then(|| &text[start..=end])
    }
}

/// Strip code fences and trailing commas
pub fn repair(text: &str) -> String {
    let unfenced = CODE_FENCE_PATTERN.replace_all(text, "");
    TRAILING_COMMA_PATTERN.replace_all(unfenced.trim(), "$1").into_owned()
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}

/// Text of a JSON value; null and absent values are empty
fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn lookup<'a>(map: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn translated_fields(position: usize, unit: &TranslationUnit, element: &Value) -> Result<TranslatedFields, PipelineError> {
    let raw: Vec<(String, String)> = match element {
        Value::Object(map) => unit
            .fields
            .iter()
            .map(|(name, _)| (name.clone(), value_text(lookup(map, name))))
            .collect(),
        Value::Array(_) => {
            return Err(PipelineError::Repair(format!(
                "Element {} is a nested array",
                position
            )));
        }
        scalar if unit.fields.len() == 1 => vec![(unit.fields[0].0.clone(), value_text(Some(scalar)))],
        _ => {
            return Err(PipelineError::Repair(format!(
                "Element {} is a bare value but the record has {} translatable fields",
                position,
                unit.fields.len()
            )));
        }
    };

    Ok(raw
        .into_iter()
        .map(|(name, text)| {
            let text = text.trim();
            let text = if text.is_empty() {
                unit.source_text(&name).unwrap_or_default().to_string()
            } else {
                text.to_string()
            };
            (name, text)
        })
        .collect())
}
