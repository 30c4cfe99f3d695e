/*!
 * Table profiles.
 *
 * A profile describes one source -> target table pair: which columns form the
 * identity key, which are translated, how the service is asked to shape its
 * answer, and how results are written. The pipeline itself is the same for
 * every profile.
 */

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::language_utils;

/// Container the service is asked to answer with
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedShape {
    /// One JSON array, one element per record in request order
    Array,
    /// One JSON object holding the fields of a single record
    Object,
}

impl ExpectedShape {
    /// Opening and closing delimiters of the container
    pub fn delimiters(&self) -> (char, char) {
        match self {
            Self::Array => ('[', ']'),
            Self::Object => ('{', '}'),
        }
    }

    /// Whether a parsed value is of this shape
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// How the target table is written
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Insert each batch as it commits
    #[default]
    Append,
    /// Delete and reinsert the whole table once every batch succeeded
    Replace,
}

/// Review log column layout
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewLayout {
    /// Header is the target row's columns
    #[default]
    Mirror,
    /// Pass-through columns, then `<FIELD>_<TARGET>` and `<FIELD>_<SOURCE>`
    Bilingual,
}

/// Which source columns are translated
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Translatable {
    /// Every selected column except these
    AllExcept(Vec<String>),
    /// Only these columns
    Only(Vec<String>),
}

impl Translatable {
    fn includes(&self, column: &str) -> bool {
        match self {
            Self::AllExcept(excluded) => !excluded.iter().any(|c| c.eq_ignore_ascii_case(column)),
            Self::Only(included) => included.iter().any(|c| c.eq_ignore_ascii_case(column)),
        }
    }
}

/// Domain rule removing records before any service call
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Exclusion {
    /// Skip records whose column is null or blank
    SkipBlank { column: String },
    /// Skip records whose column equals a value (trimmed, case-insensitive)
    SkipValue { column: String, value: String },
    /// Skip records whose identity key already exists in the target table
    SkipExistingKeys,
}

/// Source -> target table pair and how to translate it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableProfile {
    /// Name used on the command line
    pub name: String,

    /// Source table
    pub source_table: String,

    /// Target table
    pub target_table: String,

    /// Source language override (defaults to the configured source language)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,

    /// Source columns to read; all columns when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    /// Identity key columns
    pub key_columns: Vec<String>,

    /// Translatable subset
    pub translatable: Translatable,

    /// Expected response container
    pub shape: ExpectedShape,

    /// Target write mode
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Target column filled with MAX+1, MAX+2, ... on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_column: Option<String>,

    /// Review log layout
    #[serde(default)]
    pub review_layout: ReviewLayout,

    /// Domain skip rules
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,

    /// Records per service call
    pub batch_size: usize,

    /// Review log path
    pub review_log: String,
}

impl TableProfile {
    /// Translatable columns among `selected`, in order. Key columns never are.
    pub fn translatable_columns(&self, selected: &[String]) -> Vec<String> {
        selected
            .iter()
            .filter(|c| !self.is_key_column(c))
            .filter(|c| self.translatable.includes(c))
            .cloned()
            .collect()
    }

    /// Whether a column belongs to the identity key
    pub fn is_key_column(&self, column: &str) -> bool {
        self.key_columns.iter().any(|k| k == column)
    }

    /// Object-shaped responses carry exactly one record
    pub fn effective_batch_size(&self, requested: usize) -> usize {
        match self.shape {
            ExpectedShape::Object => 1,
            ExpectedShape::Array => requested.max(1),
        }
    }

    /// Review log header for the given selected source columns
    pub fn review_header(
        &self,
        selected: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>> {
        let mut header: Vec<String> = self.sequence_column.iter().cloned().collect();
        match self.review_layout {
            ReviewLayout::Mirror => header.extend(selected.iter().cloned()),
            ReviewLayout::Bilingual => {
                let translatable = self.translatable_columns(selected);
                let target_suffix = language_utils::column_suffix(target_language)?;
                let source_suffix = language_utils::column_suffix(source_language)?;
                if target_suffix == source_suffix {
                    return Err(anyhow!(
                        "Bilingual review log needs distinct languages, got {} twice",
                        target_suffix
                    ));
                }
                header.extend(selected.iter().filter(|c| !translatable.contains(c)).cloned());
                header.extend(translatable.iter().map(|c| format!("{}_{}", c, target_suffix)));
                header.extend(translatable.iter().map(|c| format!("{}_{}", c, source_suffix)));
            }
        }
        Ok(header)
    }

    /// Check the profile is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Profile name cannot be empty"));
        }
        if self.source_table.trim().is_empty() || self.target_table.trim().is_empty() {
            return Err(anyhow!("Profile '{}' needs source and target tables", self.name));
        }
        if self.key_columns.is_empty() {
            return Err(anyhow!("Profile '{}' needs at least one key column", self.name));
        }
        if let Some(columns) = &self.columns {
            if let Some(missing) = self.key_columns.iter().find(|k| !columns.contains(k)) {
                return Err(anyhow!(
                    "Profile '{}' key column {} is not among its selected columns",
                    self.name,
                    missing
                ));
            }
        }
        if let Some(sequence) = &self.sequence_column {
            if self.columns.as_ref().is_some_and(|c| c.contains(sequence)) {
                return Err(anyhow!(
                    "Profile '{}' sequence column {} must not be read from the source",
                    self.name,
                    sequence
                ));
            }
        }
        Ok(())
    }
}

/// Profiles for the moon calendar reference tables
pub fn builtin_profiles() -> Vec<TableProfile> {
    vec![moon_days(), cities(), zodiac_info(), zodiac_garden()]
}

fn moon_days() -> TableProfile {
    TableProfile {
        name: "moon-days".to_string(),
        source_table: "MOON_DAY_INFO_ENG".to_string(),
        target_table: "MOON_DAY_INFO_JA".to_string(),
        source_language: None,
        columns: None,
        key_columns: vec!["MOON_DATE_NUMBER".to_string()],
        translatable: Translatable::AllExcept(vec!["MOON_DATE_NUMBER".to_string()]),
        shape: ExpectedShape::Object,
        write_mode: WriteMode::Append,
        sequence_column: None,
        review_layout: ReviewLayout::Mirror,
        exclusions: Vec::new(),
        batch_size: 1,
        review_log: "scripts/moon_day_info_ja.csv".to_string(),
    }
}

fn cities() -> TableProfile {
    TableProfile {
        name: "cities".to_string(),
        source_table: "CITIES_ENG".to_string(),
        target_table: "CITIES_JA".to_string(),
        source_language: None,
        columns: Some(vec![
            "NAME".to_string(),
            "LONGITUDE".to_string(),
            "LATITUDE".to_string(),
        ]),
        key_columns: vec!["LONGITUDE".to_string(), "LATITUDE".to_string()],
        translatable: Translatable::Only(vec!["NAME".to_string()]),
        shape: ExpectedShape::Array,
        write_mode: WriteMode::Append,
        sequence_column: Some("INDEX".to_string()),
        review_layout: ReviewLayout::Bilingual,
        exclusions: vec![
            Exclusion::SkipBlank { column: "NAME".to_string() },
            // Seeded from the lookup service with the top cities already
            Exclusion::SkipValue { column: "NAME".to_string(), value: "Tokyo".to_string() },
            Exclusion::SkipExistingKeys,
        ],
        batch_size: 20,
        review_log: "scripts/cities_ja_translated.csv".to_string(),
    }
}

fn zodiac_table(name: &str, source_table: &str, target_table: &str, source_language: Option<&str>, review_log: &str) -> TableProfile {
    TableProfile {
        name: name.to_string(),
        source_table: source_table.to_string(),
        target_table: target_table.to_string(),
        source_language: source_language.map(str::to_string),
        columns: Some(vec!["ZODIAC".to_string(), "NAME".to_string(), "INFO".to_string()]),
        key_columns: vec!["ZODIAC".to_string()],
        translatable: Translatable::Only(vec!["NAME".to_string(), "INFO".to_string()]),
        shape: ExpectedShape::Array,
        write_mode: WriteMode::Replace,
        sequence_column: None,
        review_layout: ReviewLayout::Bilingual,
        exclusions: Vec::new(),
        batch_size: 6,
        review_log: review_log.to_string(),
    }
}

fn zodiac_info() -> TableProfile {
    zodiac_table("zodiac-info", "ZODIAC_INFO_ENG", "ZODIAC_INFO_JA", None, "scripts/zodiac_info_ja.csv")
}

fn zodiac_garden() -> TableProfile {
    zodiac_table("zodiac-garden", "ZODIAC_GARDEN_RU", "ZODIAC_GARDEN_JA", Some("ru"), "scripts/zodiac_garden_ja.csv")
}
