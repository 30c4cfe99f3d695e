/*!
 * Durable output of translated batches.
 *
 * Every committed batch lands in both the review log (CSV, append-only) and
 * the target table, or in neither:
 *
 * - Append mode inserts each batch inside a store transaction, appends the
 *   CSV rows while the transaction is open and commits only after the CSV
 *   is flushed.
 * - Replace mode stages rows until `finish`, which deletes the target rows,
 *   reinserts everything and appends the log in a single transaction.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use rusqlite::params_from_iter;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use super::profile::{ReviewLayout, TableProfile, WriteMode};
use super::record::{CompletionRecord, FieldValue};
use crate::database::{DatabaseConnection, RecordSource};
use crate::database::schema::{self, ColumnInfo, column_list, quote_ident};
use crate::errors::PipelineError;

/// Append-only CSV review log
#[derive(Debug, Clone)]
pub struct ReviewLog {
    path: PathBuf,
    header: Vec<String>,
}

impl ReviewLog {
    pub fn new(path: impl Into<PathBuf>, header: Vec<String>) -> Self {
        Self { path: path.into(), header }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Replace the log with a header-only file
    pub fn reset(&self) -> Result<()> {
        self.create_parent()?;
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to create review log: {:?}", self.path))?;
        writer.write_record(&self.header)?;
        writer.flush()?;
        Ok(())
    }

    /// Append rows, writing the header first if the file is missing or empty
    pub fn append_rows(&self, rows: &[Vec<String>]) -> Result<()> {
        self.create_parent()?;
        let needs_header = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        if !needs_header {
            self.check_header();
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open review log: {:?}", self.path))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if needs_header {
            writer.write_record(&self.header)?;
        }
        for row in rows {
            writer.write_record(row)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush review log: {:?}", self.path))?;
        Ok(())
    }

    fn create_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create review log directory: {:?}", parent))?;
        }
        Ok(())
    }

    fn check_header(&self) {
        let existing = csv::Reader::from_path(&self.path)
            .and_then(|mut r| r.headers().map(|h| h.iter().map(str::to_string).collect::<Vec<_>>()));
        match existing {
            Ok(existing) if existing != self.header => {
                warn!("Review log {:?} has header {:?}, expected {:?}", self.path, existing, self.header)
            }
            Err(e) => warn!("Could not read review log header {:?}: {}", self.path, e),
            _ => {}
        }
    }
}

/// Writes committed batches to the review log and the target table
#[derive(Debug)]
pub struct Sink {
    db: DatabaseConnection,
    target_table: String,
    write_mode: WriteMode,
    layout: ReviewLayout,
    sequence_column: Option<String>,
    columns: Vec<String>,
    translatable: Vec<String>,
    review_log: ReviewLog,
    next_sequence: i64,
    staged_rows: Vec<Vec<FieldValue>>,
    staged_log: Vec<Vec<String>>,
    written: usize,
}

impl Sink {
    /// Prepare the target table and sequence counter.
    ///
    /// A missing target is created from the selected source columns. An
    /// existing target lacking one of them is a schema error.
    pub async fn prepare(
        db: DatabaseConnection,
        profile: &TableProfile,
        columns: &[ColumnInfo],
        translatable: Vec<String>,
        review_log: ReviewLog,
    ) -> Result<Self> {
        let target_table = profile.target_table.clone();
        let sequence_column = profile.sequence_column.clone();

        let (table, source_columns, sequence) = (target_table.clone(), columns.to_vec(), sequence_column.clone());
        let target_columns = db
            .execute_async(move |conn| {
                schema::ensure_table(conn, &table, &source_columns, sequence.as_deref())?;
                schema::table_columns(conn, &table)
            })
            .await?;

        let insert_columns: Vec<String> = sequence_column
            .iter()
            .cloned()
            .chain(columns.iter().map(|c| c.name.clone()))
            .collect();
        if let Some(missing) = insert_columns.iter().find(|c| !target_columns.iter().any(|t| &t.name == *c)) {
            return Err(PipelineError::Schema(format!("Target table {} has no {} column", target_table, missing)).into());
        }

        let next_sequence = match (&sequence_column, profile.write_mode) {
            (None, _) => 0,
            (Some(_), WriteMode::Replace) => 1,
            (Some(column), WriteMode::Append) => {
                RecordSource::new(db.clone()).max_integer(&target_table, column).await? + 1
            }
        };

        debug!("Sink ready for {} ({:?}), next sequence {}", target_table, profile.write_mode, next_sequence);

        Ok(Self {
            db,
            target_table,
            write_mode: profile.write_mode,
            layout: profile.review_layout,
            sequence_column,
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            translatable,
            review_log,
            next_sequence,
            staged_rows: Vec::new(),
            staged_log: Vec::new(),
            written: 0,
        })
    }

    /// Rows written to the target so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Next sequence value to be assigned
    pub fn next_sequence(&self) -> i64 {
        self.next_sequence
    }

    /// Commit one batch as a unit
    pub async fn commit(&mut self, records: &[CompletionRecord]) -> Result<(), PipelineError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut rows = Vec::with_capacity(records.len());
        let mut log_rows = Vec::with_capacity(records.len());
        for (offset, record) in records.iter().enumerate() {
            let sequence = self.sequence_column.as_ref().map(|_| self.next_sequence + offset as i64);
            rows.push(self.target_row(record, sequence));
            log_rows.push(self.log_row(record, sequence));
        }

        match self.write_mode {
            WriteMode::Append => {
                let count = rows.len();
                let sql = self.insert_sql();
                let review_log = self.review_log.clone();
                self.db
                    .transaction_async(move |tx| {
                        insert_rows(tx, &sql, &rows)?;
                        review_log.append_rows(&log_rows)?;
                        Ok(())
                    })
                    .await
                    .map_err(|e| PipelineError::Commit(format!("{:#}", e)))?;
                self.written += count;
                debug!("Committed {} rows to {}", count, self.target_table);
            }
            WriteMode::Replace => {
                self.staged_rows.extend(rows);
                self.staged_log.extend(log_rows);
            }
        }

        if self.sequence_column.is_some() {
            self.next_sequence += records.len() as i64;
        }
        Ok(())
    }

    /// Flush staged rows. Replace mode swaps the whole target table here.
    pub async fn finish(mut self) -> Result<usize, PipelineError> {
        if self.write_mode == WriteMode::Replace {
            let rows = std::mem::take(&mut self.staged_rows);
            let log_rows = std::mem::take(&mut self.staged_log);
            let count = rows.len();
            let delete_sql = format!("DELETE FROM {}", quote_ident(&self.target_table));
            let insert_sql = self.insert_sql();
            let review_log = self.review_log.clone();

            self.db
                .transaction_async(move |tx| {
                    tx.execute(&delete_sql, [])?;
                    insert_rows(tx, &insert_sql, &rows)?;
                    review_log.append_rows(&log_rows)?;
                    Ok(())
                })
                .await
                .map_err(|e| PipelineError::Commit(format!("{:#}", e)))?;

            info!("Replaced {} with {} rows", self.target_table, count);
            self.written += count;
        }
        Ok(self.written)
    }

    fn insert_sql(&self) -> String {
        let columns: Vec<&str> = self
            .sequence_column
            .iter()
            .map(String::as_str)
            .chain(self.columns.iter().map(String::as_str))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.target_table),
            column_list(&columns),
            vec!["?"; columns.len()].join(", ")
        )
    }

    fn target_row(&self, record: &CompletionRecord, sequence: Option<i64>) -> Vec<FieldValue> {
        sequence
            .map(FieldValue::Integer)
            .into_iter()
            .chain(
                self.columns
                    .iter()
                    .map(|c| record.value(c).cloned().unwrap_or(FieldValue::Null)),
            )
            .collect()
    }

    fn log_row(&self, record: &CompletionRecord, sequence: Option<i64>) -> Vec<String> {
        let mut row: Vec<String> = sequence.map(|s| s.to_string()).into_iter().collect();
        let text = |value: Option<&FieldValue>| value.map(FieldValue::as_text).unwrap_or_default();

        match self.layout {
            ReviewLayout::Mirror => {
                row.extend(self.columns.iter().map(|c| text(record.value(c))));
            }
            ReviewLayout::Bilingual => {
                row.extend(
                    self.columns
                        .iter()
                        .filter(|c| !self.translatable.contains(c))
                        .map(|c| text(record.value(c))),
                );
                row.extend(self.translatable.iter().map(|c| text(record.value(c))));
                row.extend(self.translatable.iter().map(|c| text(record.source.get(c))));
            }
        }
        row
    }
}

fn insert_rows(conn: &rusqlite::Connection, sql: &str, rows: &[Vec<FieldValue>]) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    for row in rows {
        let inserted = stmt.execute(params_from_iter(row.iter().map(FieldValue::to_sql_value)))?;
        if inserted != 1 {
            return Err(anyhow!("Expected one inserted row, got {}", inserted));
        }
    }
    Ok(())
}
