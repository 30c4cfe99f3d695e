/*!
 * Completion ledger.
 *
 * The set of identity keys already present in a review log. A key in the log
 * is the only signal that a record was translated, so a resumed run skips
 * exactly those records.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::path::Path;

use super::record::IdentityKey;
use crate::errors::PipelineError;

/// Identity keys of completed records
#[derive(Debug, Clone, Default)]
pub struct CompletionLedger {
    keys: HashSet<IdentityKey>,
}

impl CompletionLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every key from a review log.
    ///
    /// A missing or empty log yields an empty ledger. A log whose header
    /// lacks one of the key columns is a schema error.
    pub fn load(path: &Path, key_columns: &[String]) -> Result<Self> {
        Ok(Self { keys: loaded_keys(path, key_columns)? })
    }

    /// Whether a record with this key was already completed
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    /// Record a completed key; returns false if it was already present
    pub fn insert(&mut self, key: IdentityKey) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Keys present in the review log at `path`
pub fn loaded_keys(path: &Path, key_columns: &[String]) -> Result<HashSet<IdentityKey>> {
    if !path.exists() {
        debug!("No review log at {:?}, nothing completed yet", path);
        return Ok(HashSet::new());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open review log: {:?}", path))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read review log header: {:?}", path))?
        .clone();
    if headers.is_empty() {
        return Ok(HashSet::new());
    }

    let indices = key_columns
        .iter()
        .map(|column| {
            headers.iter().position(|h| h.trim() == column).ok_or_else(|| {
                PipelineError::Schema(format!("Review log {:?} has no {} column", path, column))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut keys = HashSet::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("Failed to read review log row: {:?}", path))?;
        let key = IdentityKey::new(indices.iter().map(|i| row.get(*i).unwrap_or_default()));
        if !key.is_empty() {
            keys.insert(key);
        }
    }

    info!("Loaded {} completed keys from {:?}", keys.len(), path);
    Ok(keys)
}
