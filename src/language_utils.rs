//! Language tag utilities
//!
//! Source and target languages are configured as ISO 639-1 (2-letter) or
//! ISO 639-2 (3-letter) tags. Prompts need the English language name and
//! review log headers need a short uppercase suffix (`NAME_JA`, `INFO_EN`).

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their ISO 639-2/T equivalent
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Resolve a language tag to its isolang entry
fn resolve(tag: &str) -> Result<Language> {
    let normalized = tag.trim().to_lowercase();

    let language = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == normalized)
                .map(|(_, terminological)| *terminological)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(part2t)
        }
        _ => None,
    };

    language.ok_or_else(|| anyhow!("Invalid language code: {}", tag))
}

/// Validate a language tag
pub fn validate_language_code(tag: &str) -> Result<()> {
    resolve(tag).map(|_| ())
}

/// Get the English language name for a tag ("ja" -> "Japanese")
pub fn get_language_name(tag: &str) -> Result<String> {
    Ok(resolve(tag)?.to_name().to_string())
}

/// Uppercase column suffix for a tag ("ja" -> "JA", "rus" -> "RU")
///
/// Falls back to the 3-letter code for languages without a 2-letter one.
pub fn column_suffix(tag: &str) -> Result<String> {
    let language = resolve(tag)?;
    let code = language
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| language.to_639_3().to_string());
    Ok(code.to_uppercase())
}

/// Check if two language tags represent the same language
pub fn language_codes_match(tag1: &str, tag2: &str) -> bool {
    match (resolve(tag1), resolve(tag2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
