/*!
 * Tests for response reconciliation through the public API
 */

use moontrans::errors::PipelineError;
use moontrans::translation::profile::ExpectedShape;
use moontrans::translation::reconcile::Reconciler;
use moontrans::translation::record::{BatchRequest, SourceRecord};

fn city_request(names: &[&str]) -> BatchRequest {
    let records: Vec<SourceRecord> = names.iter().map(|n| SourceRecord::new().with("NAME", *n)).collect();
    BatchRequest::from_records(&records, &["NAME".to_string()])
}

/// Test that a multi-line fenced answer with a trailing comma matches a clean one
#[test]
fn test_reconcile_withPrettyPrintedFencedArray_shouldMatchCleanResponse() {
    let reconciler = Reconciler::new(ExpectedShape::Array);
    let request = city_request(&["Osaka", "Kyoto"]);

    let clean = reconciler.reconcile(&request, r#"["大阪","京都"]"#).unwrap();
    let dirty = reconciler
        .reconcile(&request, "```json\n[\n  \"大阪\",\n  \"京都\",\n]\n```")
        .unwrap();

    assert_eq!(clean, dirty);
}

/// Test that extra elements are rejected like missing ones
#[test]
fn test_reconcile_withLongArray_shouldBeRepairError() {
    let reconciler = Reconciler::new(ExpectedShape::Array);
    let err = reconciler.reconcile(&city_request(&["Osaka"]), r#"["大阪","京都"]"#).unwrap_err();
    assert!(matches!(err, PipelineError::Repair(ref message) if message.contains("Expected 1 got 2")));
}

/// Test that an object answer to an array request is rejected
#[test]
fn test_reconcile_withObjectForArrayShape_shouldBeRepairError() {
    let reconciler = Reconciler::new(ExpectedShape::Array);
    let err = reconciler.reconcile(&city_request(&["Osaka"]), r#"{"NAME": "大阪"}"#).unwrap_err();
    assert!(matches!(err, PipelineError::Repair(_)));
}

/// Test that an object answer cannot cover more than one record
#[test]
fn test_reconcile_withObjectShapeAndTwoRecords_shouldBeRepairError() {
    let reconciler = Reconciler::new(ExpectedShape::Object);
    let err = reconciler.reconcile(&city_request(&["Osaka", "Kyoto"]), r#"{"NAME": "大阪"}"#).unwrap_err();
    assert!(matches!(err, PipelineError::Repair(_)));
}

/// Test that numbers in the answer are kept as text
#[test]
fn test_reconcile_withNumericElement_shouldUseItsText() {
    let reconciler = Reconciler::new(ExpectedShape::Array);
    let response = reconciler.reconcile(&city_request(&["7"]), "[7]").unwrap();
    assert_eq!(response.items[0][0].1, "7");
}
