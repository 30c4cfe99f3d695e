/*!
 * Record source and target lookups.
 *
 * Reads source rows in storage order and answers the questions the pipeline
 * asks of the target table: which identity keys it already holds and the
 * current maximum of its sequence column.
 */

use anyhow::Result;
use log::debug;
use std::collections::HashSet;

use super::connection::DatabaseConnection;
use super::schema::{self, ColumnInfo, column_list, quote_ident};
use crate::errors::PipelineError;
use crate::translation::record::{FieldValue, IdentityKey, SourceRecord};

/// Read access to source and target tables
#[derive(Debug, Clone)]
pub struct RecordSource {
    db: DatabaseConnection,
}

impl RecordSource {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Declared columns of a table; a missing or column-less table is a schema error
    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let name = table.to_string();
        let columns = self
            .db
            .execute_async(move |conn| schema::table_columns(conn, &name))
            .await?;
        if columns.is_empty() {
            return Err(PipelineError::Schema(format!("Table {} not found or has no columns", table)).into());
        }
        Ok(columns)
    }

    /// Fetch `columns` of every row of `table` in storage order
    pub async fn fetch(&self, table: &str, columns: &[String], limit: Option<usize>) -> Result<Vec<SourceRecord>> {
        if columns.is_empty() {
            return Err(PipelineError::Schema(format!("No columns requested from {}", table)).into());
        }

        let declared = self.columns(table).await?;
        if let Some(missing) = columns.iter().find(|c| !declared.iter().any(|d| &d.name == *c)) {
            return Err(PipelineError::Schema(format!("Column {} not found in {}", missing, table)).into());
        }

        let mut sql = format!("SELECT {} FROM {}", column_list(columns), quote_ident(table));
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        debug!("{}", sql);

        let columns = columns.to_vec();
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query([])?;
                let mut records = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut record = SourceRecord::new();
                    for (i, column) in columns.iter().enumerate() {
                        record.push(column.clone(), FieldValue::from(row.get_ref(i)?));
                    }
                    records.push(record);
                }
                Ok(records)
            })
            .await
    }

    /// Identity keys already present in `table`; empty when the table is missing
    pub async fn existing_keys(&self, table: &str, key_columns: &[String]) -> Result<HashSet<IdentityKey>> {
        let table = table.to_string();
        let key_columns = key_columns.to_vec();
        self.db
            .execute_async(move |conn| {
                if !schema::table_exists(conn, &table)? {
                    return Ok(HashSet::new());
                }
                let declared = schema::table_columns(conn, &table)?;
                if let Some(missing) = key_columns.iter().find(|k| !declared.iter().any(|d| &d.name == *k)) {
                    return Err(PipelineError::Schema(format!("Target table {} has no {} column", table, missing)).into());
                }
                let sql = format!("SELECT {} FROM {}", column_list(&key_columns), quote_ident(&table));
                let mut stmt = conn.prepare(&sql)?;
                let mut rows = stmt.query([])?;
                let mut keys = HashSet::new();
                while let Some(row) = rows.next()? {
                    let mut parts = Vec::with_capacity(key_columns.len());
                    for i in 0..key_columns.len() {
                        parts.push(FieldValue::from(row.get_ref(i)?).as_text());
                    }
                    let key = IdentityKey::new(parts);
                    if !key.is_empty() {
                        keys.insert(key);
                    }
                }
                Ok(keys)
            })
            .await
    }

    /// Largest integer value of `column` in `table`, 0 when empty or missing
    pub async fn max_integer(&self, table: &str, column: &str) -> Result<i64> {
        let table = table.to_string();
        let column = column.to_string();
        self.db
            .execute_async(move |conn| {
                if !schema::table_exists(conn, &table)? {
                    return Ok(0);
                }
                let sql = format!(
                    "SELECT COALESCE(MAX(CAST({} AS INTEGER)), 0) FROM {}",
                    quote_ident(&column),
                    quote_ident(&table)
                );
                Ok(conn.query_row(&sql, [], |row| row.get(0))?)
            })
            .await
    }
}
