/*!
 * City table seeding from the GeoNames lookup.
 */

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;

use super::connection::DatabaseConnection;
use super::schema::{self, ColumnInfo, quote_ident};
use crate::providers::geonames::Place;

/// One seeded city row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedRow {
    #[serde(rename = "INDEX")]
    pub index: i64,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "LONGITUDE")]
    pub longitude: String,
    #[serde(rename = "LATITUDE")]
    pub latitude: String,
}

fn city_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("NAME", "TEXT"),
        ColumnInfo::new("LONGITUDE", "TEXT"),
        ColumnInfo::new("LATITUDE", "TEXT"),
    ]
}

/// Turn places into rows, numbered by population rank from 1.
///
/// Places without a usable name or coordinates are skipped but keep their
/// rank. Fewer than `limit` rows is an error.
pub fn build_rows(places: &[Place], limit: usize) -> Result<Vec<SeedRow>> {
    let rows: Vec<SeedRow> = places
        .iter()
        .take(limit)
        .zip(1i64..)
        .filter_map(|(place, index)| {
            let name = [&place.name, &place.toponym_name]
                .into_iter()
                .flatten()
                .map(|n| n.trim())
                .find(|n| !n.is_empty())?;
            let (lng, lat) = (place.lng.as_ref()?, place.lat.as_ref()?);
            Some(SeedRow {
                index,
                name: name.to_string(),
                longitude: lng.clone(),
                latitude: lat.clone(),
            })
        })
        .collect();

    if rows.len() < limit {
        return Err(anyhow!("Only built {} rows (expected {})", rows.len(), limit));
    }
    Ok(rows)
}

/// Replace the contents of `table` with the seeded rows
pub async fn seed_table(db: &DatabaseConnection, table: &str, rows: Vec<SeedRow>) -> Result<usize> {
    let table = table.to_string();
    let count = rows.len();
    db.transaction_async(move |tx| {
        schema::ensure_table(tx, &table, &city_columns(), Some("INDEX"))?;
        tx.execute(&format!("DELETE FROM {}", quote_ident(&table)), [])?;
        let sql = format!(
            "INSERT INTO {} (\"INDEX\", \"NAME\", \"LONGITUDE\", \"LATITUDE\") VALUES (?1, ?2, ?3, ?4)",
            quote_ident(&table)
        );
        let mut stmt = tx.prepare(&sql)?;
        for row in &rows {
            stmt.execute(rusqlite::params![row.index, row.name, row.longitude, row.latitude])?;
        }
        Ok(())
    })
    .await?;

    info!("Seeded {} rows", count);
    Ok(count)
}

/// Write the seeded rows to a CSV file, replacing it
pub fn write_csv(path: &Path, rows: &[SeedRow]) -> Result<()> {
    if rows.is_empty() {
        warn!("No seeded rows to write to {:?}", path);
    }
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("Failed to create CSV: {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
