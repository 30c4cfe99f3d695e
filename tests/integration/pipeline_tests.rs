/*!
 * Integration tests for table synchronization runs
 */

use anyhow::Result;

use moontrans::errors::{PipelineError, ProviderError};
use moontrans::providers::mock::{MockProvider, MockReply};
use moontrans::translation::RunOptions;
use moontrans::translation::profile::WriteMode;
use crate::common;

/// Test that a dry run only writes the review log header
#[tokio::test]
async fn test_run_withDryRun_shouldWriteHeaderWithoutContactingService() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let log_path = dir.path().join("moon_day_info_ja.csv");
    std::fs::write(&log_path, "MOON_DATE_NUMBER,GENERAL,HEALTH\n1,stale,stale\n")?;

    let db = common::moon_day_database(3)?;
    let provider = MockProvider::echo();
    let options = RunOptions { dry_run: true, ..common::run_options(dir.path(), "moon_day_info_ja.csv") };

    let report = common::orchestrator(&db, &provider).run(&common::profile("moon-days"), &options).await?;

    assert!(report.dry_run);
    assert_eq!(report.processed, 0);
    assert_eq!(provider.request_count(), 0);
    assert_eq!(std::fs::read_to_string(&log_path)?, "MOON_DATE_NUMBER,GENERAL,HEALTH\n");
    assert_eq!(common::count_rows(&db, "MOON_DAY_INFO_JA")?, 0);
    Ok(())
}

/// Test that three keys in batches of two come back as three records in order
#[tokio::test]
async fn test_run_withThreeKeysAndBatchOfTwo_shouldCommitThreeRecordsInOrder() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::zodiac_database()?;
    let provider = MockProvider::scripted([
        MockReply::Text(r#"[{"NAME":"牡羊座","INFO":"火のサイン"},{"NAME":"牡牛座","INFO":"地のサイン"}]"#.to_string()),
        MockReply::Text(r#"[{"NAME":"双子座","INFO":"風のサイン"}]"#.to_string()),
    ]);
    let options = RunOptions { batch_size: Some(2), ..common::run_options(dir.path(), "zodiac_info_ja.csv") };

    let report = common::orchestrator(&db, &provider).run(&common::profile("zodiac-info"), &options).await?;

    assert_eq!(report.processed, 3);
    assert_eq!(report.batches, 2);
    assert_eq!(provider.request_count(), 2);
    assert_eq!(
        common::query_strings(&db, "SELECT NAME FROM ZODIAC_INFO_JA ORDER BY rowid")?,
        vec!["牡羊座", "牡牛座", "双子座"]
    );

    let rows = common::csv_rows(&dir.path().join("zodiac_info_ja.csv"))?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["1", "牡羊座", "火のサイン", "Aries", "Fire sign"]);
    assert_eq!(rows[2][0], "3");
    Ok(())
}

/// Test that resuming twice never duplicates completed records
#[tokio::test]
async fn test_run_withResumeTwice_shouldNotDuplicateRecords() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::moon_day_database(3)?;
    let provider = MockProvider::echo();
    let options = RunOptions { resume: true, ..common::run_options(dir.path(), "moon_day_info_ja.csv") };
    let orchestrator = common::orchestrator(&db, &provider);
    let profile = common::profile("moon-days");

    let first = orchestrator.run(&profile, &options).await?;
    let second = orchestrator.run(&profile, &options).await?;

    assert_eq!(first.processed, 3);
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped_completed, 3);
    assert_eq!(provider.request_count(), 3);
    assert_eq!(common::count_rows(&db, "MOON_DAY_INFO_JA")?, 3);

    let rows = common::csv_rows(&dir.path().join("moon_day_info_ja.csv"))?;
    let keys: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(keys, vec!["1", "2", "3"]);
    Ok(())
}

/// Test that object-shaped profiles send one record per call and keep the key
#[tokio::test]
async fn test_run_withObjectShape_shouldSendOneRecordPerCall() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::moon_day_database(2)?;
    let provider = MockProvider::echo();
    let options = RunOptions { batch_size: Some(10), ..common::run_options(dir.path(), "moon.csv") };

    common::orchestrator(&db, &provider).run(&common::profile("moon-days"), &options).await?;

    assert_eq!(provider.request_count(), 2);
    assert_eq!(provider.requests()[0].user, r#"{"GENERAL":"General 1","HEALTH":"Health 1"}"#);
    assert_eq!(
        common::query_strings(&db, "SELECT CAST(MOON_DATE_NUMBER AS TEXT) || ':' || GENERAL FROM MOON_DAY_INFO_JA ORDER BY MOON_DATE_NUMBER")?,
        vec!["1:[ja] General 1", "2:[ja] General 2"]
    );
    Ok(())
}

/// Test that cities already in the target are excluded before any call
#[tokio::test]
async fn test_run_withExistingCoordinates_shouldExcludeBeforeAnyCall() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::cities_database()?;
    let provider = MockProvider::echo();

    let report = common::orchestrator(&db, &provider)
        .run(&common::profile("cities"), &common::run_options(dir.path(), "cities.csv"))
        .await?;

    assert_eq!(report.source_records, 6);
    assert_eq!(report.skipped_excluded, 3);
    assert_eq!(report.processed, 3);
    assert_eq!(provider.request_count(), 1);
    assert_eq!(provider.requests()[0].user, r#"["Osaka","Nagoya","Sapporo"]"#);
    Ok(())
}

/// Test that non-translatable fields keep their source values
#[tokio::test]
async fn test_run_withCities_shouldPreservePassThroughFields() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::cities_database()?;
    let provider = MockProvider::echo();

    common::orchestrator(&db, &provider)
        .run(&common::profile("cities"), &common::run_options(dir.path(), "cities.csv"))
        .await?;

    assert_eq!(
        common::query_strings(
            &db,
            "SELECT CAST(\"INDEX\" AS TEXT) || '|' || NAME || '|' || LONGITUDE || '|' || LATITUDE FROM CITIES_JA WHERE \"INDEX\" > 2 ORDER BY \"INDEX\""
        )?,
        vec![
            "3|[ja] Osaka|135.50|34.69",
            "4|[ja] Nagoya|136.90|35.18",
            "5|[ja] Sapporo|141.35|43.06",
        ]
    );

    let rows = common::csv_rows(&dir.path().join("cities.csv"))?;
    assert_eq!(rows[0], vec!["3", "135.50", "34.69", "[ja] Osaka", "Osaka"]);
    Ok(())
}

/// Test that a response one element short fails the batch and commits nothing
#[tokio::test]
async fn test_run_withShortResponse_shouldFailWithoutCommitting() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::cities_database()?;
    let provider = MockProvider::scripted([MockReply::Text(r#"["大阪","名古屋"]"#.to_string())]);

    let err = common::orchestrator(&db, &provider)
        .run(&common::profile("cities"), &common::run_options(dir.path(), "cities.csv"))
        .await
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Repair(_))));
    assert!(err.to_string().contains("Expected 3 got 2"));
    assert_eq!(common::count_rows(&db, "CITIES_JA")?, 2);
    assert!(!dir.path().join("cities.csv").exists());
    Ok(())
}

/// Test that a fenced answer with a trailing comma is repaired and committed
#[tokio::test]
async fn test_run_withFencedTrailingComma_shouldRepairAndCommit() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::cities_database()?;
    let provider = MockProvider::scripted([MockReply::Text(
        "Here you go:\n```json\n[\"大阪\", \"\", \"札幌\",]\n```".to_string(),
    )]);

    let report = common::orchestrator(&db, &provider)
        .run(&common::profile("cities"), &common::run_options(dir.path(), "cities.csv"))
        .await?;

    assert_eq!(report.processed, 3);
    assert_eq!(
        common::query_strings(&db, "SELECT NAME FROM CITIES_JA WHERE \"INDEX\" > 2 ORDER BY \"INDEX\"")?,
        vec!["大阪", "Nagoya", "札幌"]
    );
    Ok(())
}

/// Test that a failing batch aborts the run but keeps earlier batches
#[tokio::test]
async fn test_run_withServiceFailure_shouldKeepEarlierBatchesAndResume() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::moon_day_database(3)?;
    let failing = MockProvider::scripted([
        MockReply::Text(r#"{"GENERAL":"一般","HEALTH":"健康"}"#.to_string()),
        MockReply::Error(ProviderError::AuthenticationError("invalid key".to_string())),
    ]);
    let options = RunOptions { resume: true, ..common::run_options(dir.path(), "moon.csv") };
    let profile = common::profile("moon-days");

    let err = common::orchestrator(&db, &failing).run(&profile, &options).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Transport { attempts: 1, .. })
    ));
    assert_eq!(common::count_rows(&db, "MOON_DAY_INFO_JA")?, 1);

    let echo = MockProvider::echo();
    let report = common::orchestrator(&db, &echo).run(&profile, &options).await?;
    assert_eq!(report.skipped_completed, 1);
    assert_eq!(report.processed, 2);
    assert_eq!(common::count_rows(&db, "MOON_DAY_INFO_JA")?, 3);
    Ok(())
}

/// Test that transient failures are retried within the attempt budget
#[tokio::test]
async fn test_run_withTransientFailure_shouldRetryAndSucceed() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::cities_database()?;
    let provider = MockProvider::scripted([MockReply::Error(ProviderError::RateLimitExceeded(
        "slow down".to_string(),
    ))]);

    let report = common::orchestrator(&db, &provider)
        .run(&common::profile("cities"), &common::run_options(dir.path(), "cities.csv"))
        .await?;

    assert_eq!(report.processed, 3);
    assert_eq!(provider.request_count(), 2);
    Ok(())
}

/// Test that replace mode swaps the whole target and ignores resume
#[tokio::test]
async fn test_run_withReplaceMode_shouldReplaceTargetEveryRun() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::zodiac_database()?;
    let provider = MockProvider::echo();
    let profile = common::profile("zodiac-info");
    assert_eq!(profile.write_mode, WriteMode::Replace);
    let options = RunOptions { resume: true, ..common::run_options(dir.path(), "zodiac.csv") };

    common::orchestrator(&db, &provider).run(&profile, &options).await?;
    let second = common::orchestrator(&db, &provider).run(&profile, &options).await?;

    assert_eq!(second.skipped_completed, 0);
    assert_eq!(second.processed, 3);
    assert_eq!(common::count_rows(&db, "ZODIAC_INFO_JA")?, 3);
    assert_eq!(
        common::query_strings(&db, "SELECT NAME FROM ZODIAC_INFO_JA ORDER BY ZODIAC")?,
        vec!["[ja] Aries", "[ja] Taurus", "[ja] Gemini"]
    );
    Ok(())
}

/// Test that the row limit applies before filtering
#[tokio::test]
async fn test_run_withLimit_shouldReadOnlyFirstRows() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::cities_database()?;
    let provider = MockProvider::echo();
    let options = RunOptions { limit: Some(2), ..common::run_options(dir.path(), "cities.csv") };

    let report = common::orchestrator(&db, &provider).run(&common::profile("cities"), &options).await?;

    assert_eq!(report.source_records, 2);
    assert_eq!(report.skipped_excluded, 1);
    assert_eq!(report.processed, 1);
    Ok(())
}

/// Test that a missing source table is a schema error
#[tokio::test]
async fn test_run_withMissingSourceTable_shouldBeSchemaError() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::database("CREATE TABLE OTHER (A TEXT);")?;
    let provider = MockProvider::echo();

    let err = common::orchestrator(&db, &provider)
        .run(&common::profile("cities"), &common::run_options(dir.path(), "cities.csv"))
        .await
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Schema(_))));
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

/// Test that rerunning an appended table without resume inserts nothing twice
#[tokio::test]
async fn test_run_withAppendModeRerunWithoutResume_shouldNotDuplicateRows() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::moon_day_database(3)?;
    let provider = MockProvider::echo();
    let options = common::run_options(dir.path(), "moon_day_info_ja.csv");
    let profile = common::profile("moon-days");
    assert!(!options.resume);

    let first = common::orchestrator(&db, &provider).run(&profile, &options).await?;
    let second = common::orchestrator(&db, &provider).run(&profile, &options).await?;

    assert_eq!(first.processed, 3);
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped_completed, 3);
    assert_eq!(provider.request_count(), 3);
    assert_eq!(common::count_rows(&db, "MOON_DAY_INFO_JA")?, 3);
    assert_eq!(common::csv_rows(&dir.path().join("moon_day_info_ja.csv"))?.len(), 3);
    Ok(())
}

/// Test that a row limit is refused for tables that are replaced as a whole
#[tokio::test]
async fn test_run_withReplaceModeAndLimit_shouldRefuseAndKeepTarget() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::zodiac_database()?;
    let provider = MockProvider::echo();
    let profile = common::profile("zodiac-info");

    common::orchestrator(&db, &provider)
        .run(&profile, &common::run_options(dir.path(), "zodiac.csv"))
        .await?;
    assert_eq!(common::count_rows(&db, "ZODIAC_INFO_JA")?, 3);

    let limited = RunOptions { limit: Some(1), ..common::run_options(dir.path(), "zodiac.csv") };
    let err = common::orchestrator(&db, &provider).run(&profile, &limited).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Config(_))));
    assert_eq!(provider.request_count(), 1);
    assert_eq!(common::count_rows(&db, "ZODIAC_INFO_JA")?, 3);
    assert_eq!(common::csv_rows(&dir.path().join("zodiac.csv"))?.len(), 3);
    Ok(())
}

/// Test that a replace run failing after its first batch leaves target and log untouched
#[tokio::test]
async fn test_run_withReplaceModeFailingMidway_shouldWriteNothing() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::zodiac_database()?;
    let provider = MockProvider::scripted([
        MockReply::Text(r#"[{"NAME":"牡羊座","INFO":"火のサイン"},{"NAME":"牡牛座","INFO":"地のサイン"}]"#.to_string()),
        MockReply::Text("garbage".to_string()),
    ]);
    let options = RunOptions { batch_size: Some(2), ..common::run_options(dir.path(), "zodiac.csv") };

    let err = common::orchestrator(&db, &provider)
        .run(&common::profile("zodiac-info"), &options)
        .await
        .unwrap_err();

    assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Repair(_))));
    assert_eq!(provider.request_count(), 2);
    assert_eq!(common::query_strings(&db, "SELECT NAME FROM ZODIAC_INFO_JA")?, vec!["old"]);
    assert!(!dir.path().join("zodiac.csv").exists());
    Ok(())
}
