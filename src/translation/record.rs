/*!
 * Record model shared by every pipeline stage.
 *
 * - `SourceRecord`: one row read from the source table, in column order
 * - `IdentityKey`: the stable key a record is known by across runs
 * - `TranslationUnit` / `BatchRequest`: the translatable part of a batch
 * - `BatchResponse`: translated fields, positionally aligned with the request
 * - `CompletionRecord`: a translated row ready for the sink
 */

use std::fmt;

use rusqlite::types::{Value, ValueRef};

/// A scalar value read from the store
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    /// Text form used in prompts, review logs and identity keys. Null is empty.
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(i) => i.to_string(),
            Self::Real(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Whether the value is null or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Convert into a value bindable by rusqlite
    pub fn to_sql_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(i) => Value::Integer(*i),
            Self::Real(f) => Value::Real(*f),
            Self::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl From<ValueRef<'_>> for FieldValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// Stable identity of a record: the text form of its key column values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(Vec<String>);

impl IdentityKey {
    /// Build a key from already-rendered parts
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(|p| p.into().trim().to_string()).collect())
    }

    /// Key parts in key-column order
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// A key with any empty part cannot identify a record
    pub fn is_empty(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(|p| p.is_empty())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// One source row, fields in storage column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceRecord {
    fields: Vec<(String, FieldValue)>,
}

impl SourceRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field append
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(column, value);
        self
    }

    /// Append a field
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Look up a field by exact column name
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Text of a field, empty when absent or null
    pub fn text(&self, column: &str) -> String {
        self.get(column).map(FieldValue::as_text).unwrap_or_default()
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Fields in order
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Identity key built from the given key columns
    pub fn identity_key(&self, key_columns: &[String]) -> IdentityKey {
        IdentityKey::new(key_columns.iter().map(|c| self.text(c)))
    }
}

/// The translatable fields of one record, as source text
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub fields: Vec<(String, String)>,
}

impl TranslationUnit {
    /// Extract the translatable subset of a record
    pub fn from_record(record: &SourceRecord, translatable: &[String]) -> Self {
        Self {
            fields: translatable.iter().map(|c| (c.clone(), record.text(c))).collect(),
        }
    }

    /// Source text of a field
    pub fn source_text(&self, column: &str) -> Option<&str> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, text)| text.as_str())
    }

    /// Payload sent to the service: a bare string for single-field units,
    /// otherwise an object keyed by column name.
    pub fn to_payload(&self) -> serde_json::Value {
        if self.fields.len() == 1 {
            return serde_json::Value::String(self.fields[0].1.clone());
        }
        self.to_object()
    }

    /// Payload as an object keyed by column name, whatever the field count
    pub fn to_object(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(name, text)| (name.clone(), serde_json::Value::String(text.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Ordered units for one service call; responses correlate by position
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub units: Vec<TranslationUnit>,
}

impl BatchRequest {
    /// Build a request from records in order
    pub fn from_records(records: &[SourceRecord], translatable: &[String]) -> Self {
        Self {
            units: records
                .iter()
                .map(|r| TranslationUnit::from_record(r, translatable))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// JSON payload for the whole batch
    pub fn payload(&self) -> serde_json::Value {
        serde_json::Value::Array(self.units.iter().map(TranslationUnit::to_payload).collect())
    }
}

/// Translated fields of one unit, never blank
pub type TranslatedFields = Vec<(String, String)>;

/// Validated response, same length and order as its request
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    pub items: Vec<TranslatedFields>,
}

impl BatchResponse {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A translated record as handed to the sink
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    /// Identity of the source record
    pub key: IdentityKey,
    /// The untouched source record
    pub source: SourceRecord,
    /// Target-side values in source column order
    pub values: Vec<(String, FieldValue)>,
}

impl CompletionRecord {
    /// Merge translations onto a source record.
    ///
    /// Only columns present in `translated` are replaced; everything else is
    /// copied from the source.
    pub fn assemble(
        source: &SourceRecord,
        key_columns: &[String],
        translated: &TranslatedFields,
    ) -> Self {
        let values = source
            .fields()
            .iter()
            .map(|(column, value)| {
                let value = translated
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, text)| FieldValue::Text(text.clone()))
                    .unwrap_or_else(|| value.clone());
                (column.clone(), value)
            })
            .collect();

        Self {
            key: source.identity_key(key_columns),
            source: source.clone(),
            values,
        }
    }

    /// Target-side value of a column
    pub fn value(&self, column: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }
}
