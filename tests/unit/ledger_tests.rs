/*!
 * Tests for the completion ledger against review logs written by the sink
 */

use anyhow::Result;

use moontrans::translation::ledger::CompletionLedger;
use moontrans::translation::record::IdentityKey;
use moontrans::translation::sink::ReviewLog;
use crate::common;

/// Test that keys appended through the review log are read back
#[test]
fn test_load_withBilingualCityLog_shouldReadCoordinateKeys() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let profile = common::profile("cities");
    let selected = vec!["NAME".to_string(), "LONGITUDE".to_string(), "LATITUDE".to_string()];
    let header = profile.review_header(&selected, "en", "ja")?;
    let log = ReviewLog::new(dir.path().join("cities.csv"), header);

    log.append_rows(&[
        vec!["3".into(), "135.50".into(), "34.69".into(), "大阪".into(), "Osaka".into()],
        vec!["4".into(), "136.90".into(), "35.18".into(), "名古屋".into(), "Nagoya".into()],
    ])?;
    log.append_rows(&[vec!["5".into(), "141.35".into(), "43.06".into(), "札幌".into(), "Sapporo".into()]])?;

    let ledger = CompletionLedger::load(log.path(), &profile.key_columns)?;
    assert_eq!(ledger.len(), 3);
    assert!(ledger.contains(&IdentityKey::new(["136.90", "35.18"])));
    assert!(!ledger.contains(&IdentityKey::new(["35.18", "136.90"])));
    Ok(())
}

/// Test that a header-only log from a dry run holds no keys
#[test]
fn test_load_afterReset_shouldBeEmpty() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ReviewLog::new(dir.path().join("moon.csv"), vec!["MOON_DATE_NUMBER".to_string(), "GENERAL".to_string()]);
    log.append_rows(&[vec!["1".into(), "一般".into()]])?;
    log.reset()?;

    let ledger = CompletionLedger::load(log.path(), &["MOON_DATE_NUMBER".to_string()])?;
    assert!(ledger.is_empty());
    Ok(())
}

/// Test that quoted values with commas survive the round trip
#[test]
fn test_load_withQuotedKeys_shouldKeepCommas() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ReviewLog::new(dir.path().join("log.csv"), vec!["KEY".to_string(), "TEXT".to_string()]);
    log.append_rows(&[vec!["a,b".into(), "\"quoted\"".into()]])?;

    let ledger = CompletionLedger::load(log.path(), &["KEY".to_string()])?;
    assert!(ledger.contains(&IdentityKey::new(["a,b"])));
    Ok(())
}
