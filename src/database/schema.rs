/*!
 * Schema discovery and table creation.
 *
 * Tables are addressed by name and their columns discovered at runtime with
 * `PRAGMA table_info`. Identifiers are always double-quoted.
 */

use anyhow::{Context, Result, anyhow};
use log::info;
use rusqlite::Connection;

/// One column as declared in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Declared type, possibly empty
    pub decl_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, decl_type: impl Into<String>) -> Self {
        Self { name: name.into(), decl_type: decl_type.into() }
    }

    fn definition(&self) -> String {
        if self.decl_type.trim().is_empty() {
            quote_ident(&self.name)
        } else {
            format!("{} {}", quote_ident(&self.name), self.decl_type)
        }
    }
}

/// Quote an identifier for SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated quoted column list
pub fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a table exists
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .with_context(|| format!("Failed to check table existence: {}", table))?;
    Ok(count > 0)
}

/// Columns of a table in declaration order; empty when the table is missing
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                decl_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read columns of {}", table))?;
    Ok(columns)
}

/// Create `table` with the given columns unless it exists.
///
/// The sequence column, when given, is prepended as INTEGER. Returns whether
/// the table was created.
pub fn ensure_table(
    conn: &Connection,
    table: &str,
    columns: &[ColumnInfo],
    sequence_column: Option<&str>,
) -> Result<bool> {
    if table_exists(conn, table)? {
        return Ok(false);
    }
    if columns.is_empty() {
        return Err(anyhow!("Cannot create table {} without columns", table));
    }

    let definitions = sequence_column
        .map(|s| ColumnInfo::new(s, "INTEGER"))
        .into_iter()
        .chain(columns.iter().cloned())
        .map(|c| c.definition())
        .collect::<Vec<_>>()
        .join(", ");

    info!("Creating table {}", table);
    conn.execute_batch(&format!("CREATE TABLE {} ({})", quote_ident(table), definitions))
        .with_context(|| format!("Failed to create table {}", table))?;
    Ok(true)
}

/// Drop `target` and recreate it with the columns of `source`
pub fn recreate_table_like(conn: &Connection, source: &str, target: &str) -> Result<()> {
    let columns = table_columns(conn, source)?;
    if columns.is_empty() {
        return Err(anyhow!("Source table {} not found", source));
    }
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(target)))?;
    ensure_table(conn, target, &columns, None)?;
    Ok(())
}
