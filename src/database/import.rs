/*!
 * Review log import.
 *
 * Loads a reviewed CSV back into a target table. Columns are matched by
 * header name; target columns absent from the CSV are inserted as NULL.
 */

use anyhow::{Context, Result, anyhow};
use log::info;
use rusqlite::params_from_iter;
use std::collections::HashMap;
use std::path::Path;

use super::connection::DatabaseConnection;
use super::schema::{self, column_list, quote_ident};

/// Options of one import
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Target table receiving the rows
    pub target_table: String,
    /// Table whose schema the target is recreated from when truncating
    pub source_table: String,
    /// Drop and recreate the target before inserting
    pub truncate: bool,
}

/// Read a CSV into header-keyed rows
pub fn read_csv_rows(path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV: {:?}", path))?;
    let rows = reader
        .deserialize::<HashMap<String, String>>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read CSV: {:?}", path))?;
    Ok(rows)
}

/// Import a review log into the target table. Returns the inserted row count.
pub async fn import_review_log(db: &DatabaseConnection, csv_path: &Path, options: &ImportOptions) -> Result<usize> {
    let rows = read_csv_rows(csv_path)?;
    if rows.is_empty() {
        return Err(anyhow!("No rows found in CSV: {:?}", csv_path));
    }

    let target_table = options.target_table.clone();
    let options = options.clone();
    let inserted = db
        .transaction_async(move |tx| {
            if options.truncate {
                schema::recreate_table_like(tx, &options.source_table, &options.target_table)?;
            }

            let columns: Vec<String> = schema::table_columns(tx, &options.target_table)?
                .into_iter()
                .map(|c| c.name)
                .collect();
            if columns.is_empty() {
                return Err(anyhow!("Target table {} not found or has no columns", options.target_table));
            }

            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&options.target_table),
                column_list(&columns),
                placeholders
            );
            let mut stmt = tx.prepare(&sql)?;
            for row in &rows {
                stmt.execute(params_from_iter(columns.iter().map(|c| row.get(c))))?;
            }
            Ok(rows.len())
        })
        .await?;

    info!("Imported {} rows into {}", inserted, target_table);
    Ok(inserted)
}
