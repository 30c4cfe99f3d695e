/*!
 * Common test utilities for the moontrans test suite
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use moontrans::app_config::Config;
use moontrans::database::DatabaseConnection;
use moontrans::providers::mock::MockProvider;
use moontrans::translation::{Orchestrator, RunOptions, TableProfile};

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Config with retries and throttling reduced to zero delay
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.translation.provider.api_key = "test-key".to_string();
    config.translation.common.rate_limit_delay_ms = 0;
    config.translation.common.retry_backoff_ms = 0;
    config
}

/// Built-in profile by name
pub fn profile(name: &str) -> TableProfile {
    test_config()
        .profile(name)
        .map(|p| p.clone())
        .unwrap_or_else(|e| panic!("{}", e))
}

/// Run options writing the review log into `dir`
pub fn run_options(dir: &Path, log_name: &str) -> RunOptions {
    RunOptions {
        review_log: Some(dir.join(log_name)),
        inter_batch_delay: Some(std::time::Duration::ZERO),
        ..Default::default()
    }
}

/// Orchestrator over `db` answering through `provider`
pub fn orchestrator(db: &DatabaseConnection, provider: &MockProvider) -> Orchestrator<MockProvider> {
    Orchestrator::new(&test_config(), db.clone(), Arc::new(provider.clone()))
}

/// In-memory database with the given SQL applied
pub fn database(sql: &str) -> Result<DatabaseConnection> {
    let db = DatabaseConnection::new_in_memory()?;
    let sql = sql.to_string();
    db.execute(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
    })?;
    Ok(db)
}

/// Moon day source table with `days` rows and an empty target
pub fn moon_day_database(days: i64) -> Result<DatabaseConnection> {
    let mut sql = String::from(
        "CREATE TABLE MOON_DAY_INFO_ENG (MOON_DATE_NUMBER INTEGER, GENERAL TEXT, HEALTH TEXT);
         CREATE TABLE MOON_DAY_INFO_JA (MOON_DATE_NUMBER INTEGER, GENERAL TEXT, HEALTH TEXT);",
    );
    for day in 1..=days {
        sql.push_str(&format!(
            "INSERT INTO MOON_DAY_INFO_ENG VALUES ({day}, 'General {day}', 'Health {day}');"
        ));
    }
    database(&sql)
}

/// City source table and a target already holding Tokyo
pub fn cities_database() -> Result<DatabaseConnection> {
    database(
        "CREATE TABLE CITIES_ENG (NAME TEXT, LONGITUDE TEXT, LATITUDE TEXT);
         INSERT INTO CITIES_ENG VALUES ('Tokyo', '139.69', '35.68');
         INSERT INTO CITIES_ENG VALUES ('Osaka', '135.50', '34.69');
         INSERT INTO CITIES_ENG VALUES ('Nagoya', '136.90', '35.18');
         INSERT INTO CITIES_ENG VALUES ('', '0', '0');
         INSERT INTO CITIES_ENG VALUES ('Yokohama', '139.64', '35.44');
         INSERT INTO CITIES_ENG VALUES ('Sapporo', '141.35', '43.06');
         CREATE TABLE CITIES_JA (\"INDEX\" INTEGER, NAME TEXT, LONGITUDE TEXT, LATITUDE TEXT);
         INSERT INTO CITIES_JA VALUES (1, '東京', '139.69', '35.68');
         INSERT INTO CITIES_JA VALUES (2, '横浜', '139.64', '35.44');",
    )
}

/// Zodiac source table with three signs and a stale target
pub fn zodiac_database() -> Result<DatabaseConnection> {
    database(
        "CREATE TABLE ZODIAC_INFO_ENG (ZODIAC INTEGER, NAME TEXT, INFO TEXT);
         INSERT INTO ZODIAC_INFO_ENG VALUES (1, 'Aries', 'Fire sign');
         INSERT INTO ZODIAC_INFO_ENG VALUES (2, 'Taurus', 'Earth sign');
         INSERT INTO ZODIAC_INFO_ENG VALUES (3, 'Gemini', 'Air sign');
         CREATE TABLE ZODIAC_INFO_JA (ZODIAC INTEGER, NAME TEXT, INFO TEXT);
         INSERT INTO ZODIAC_INFO_JA VALUES (1, 'old', 'old');",
    )
}

/// Single-column query results as text
pub fn query_strings(db: &DatabaseConnection, sql: &str) -> Result<Vec<String>> {
    let sql = sql.to_string();
    db.execute(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Row count of a table
pub fn count_rows(db: &DatabaseConnection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
    db.execute(move |conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
}

/// Data lines of a CSV file, header excluded
pub fn csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .records()
        .map(|r| r.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
