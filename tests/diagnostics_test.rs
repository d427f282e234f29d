//! Diagnostics integration tests
//!
//! Covers pattern matching through the public API and the save/load/diagnose
//! round trip through the file-backed report store.

mod support;

use devstack::diagnostics::{
    diagnose_report, Confidence, DiagnosisMode, DiagnosticStore, ErrorPattern,
    FileDiagnosticStore, PatternError, PatternMatcher, StoreError,
};
use devstack::report::Phase;
use support::{FakeBuilder, FakeLifecycle, Harness};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn two_pattern_matcher(p2_phase: Option<Phase>) -> PatternMatcher {
    let p1 = ErrorPattern::new(
        "p1",
        "Unknown identifier",
        "Regenerate code",
        Confidence::High,
    )
    .with_regex(r"undefined:\s*\w+")
    .unwrap()
    .for_phase(Phase::Build);

    let mut p2 = ErrorPattern::new(
        "p2",
        "Compiler gave up",
        "Fix the first reported error",
        Confidence::Medium,
    )
    .with_substrings(["too many errors"]);
    if let Some(phase) = p2_phase {
        p2 = p2.for_phase(phase);
    }

    PatternMatcher::builder()
        .add_pattern(p1)
        .unwrap()
        .add_pattern(p2)
        .unwrap()
        .build()
}

#[test]
fn test_regex_pattern_wins_in_its_phase() {
    let matcher = two_pattern_matcher(None);
    let diagnosis = matcher
        .diagnose("foo.go:10: undefined: Bar", "core", Phase::Build)
        .unwrap();
    assert_eq!(diagnosis.pattern, "p1");
    assert_eq!(diagnosis.confidence, Confidence::High);
}

#[test]
fn test_phase_filter_falls_through_to_next_pattern() {
    let matcher = two_pattern_matcher(None);
    let diagnosis = matcher
        .diagnose("too many errors\nundefined: X", "web", Phase::FrontendGen)
        .unwrap();
    assert_eq!(diagnosis.pattern, "p2");
    assert_eq!(diagnosis.confidence, Confidence::Medium);
}

#[test]
fn test_phase_filtered_patterns_produce_no_match() {
    let matcher = two_pattern_matcher(Some(Phase::Build));
    assert!(matcher
        .diagnose("too many errors\nundefined: X", "web", Phase::FrontendGen)
        .is_none());
}

#[test]
fn test_match_all_orders_by_confidence() {
    let matcher = two_pattern_matcher(None);
    let all = matcher.diagnose_all("undefined: X\ntoo many errors", "core", Phase::Build);
    let names: Vec<&str> = all.iter().map(|d| d.pattern.as_str()).collect();
    assert_eq!(names, vec!["p1", "p2"]);
}

#[test]
fn test_invalid_regex_rejected_at_registration() {
    let err = ErrorPattern::new("broken", "h", "s", Confidence::Low)
        .with_regex("(unclosed")
        .unwrap_err();
    assert!(matches!(err, PatternError::InvalidRegex { ref name, .. } if name == "broken"));
}

#[test]
fn test_builtin_catalog_covers_common_failures() {
    let matcher = PatternMatcher::with_builtin_catalog().unwrap();
    assert!(!matcher.is_empty());

    let daemon = matcher
        .diagnose(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
            "services",
            Phase::Restart,
        )
        .unwrap();
    assert_eq!(daemon.pattern, "docker-daemon-down");
    assert!(!daemon.suggestion.is_empty());

    assert!(matcher.diagnose("   \n", "core", Phase::Build).is_none());
}

#[tokio::test]
async fn test_saved_report_can_be_rediagnosed() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileDiagnosticStore::new(temp_dir.path().join("reports"));

    let builder = FakeBuilder::new().failing("primary", "./server.go:41:9: undefined: pb.NewLedgerClient");
    let harness = Harness::new(builder, FakeLifecycle::running());
    let err = harness
        .pipeline()
        .run(CancellationToken::new())
        .await
        .unwrap_err();
    let report = err.report().unwrap();

    let path = store.save(report).unwrap();
    assert!(path.exists());
    assert_eq!(store.list().unwrap(), vec![path.clone()]);

    let loaded = store.latest().unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.failed_count(), report.failed_count());

    let matcher = PatternMatcher::with_builtin_catalog().unwrap();
    let diagnosed = diagnose_report(&matcher, &loaded, DiagnosisMode::Best);

    // cascaded skips of gateway and web are not diagnosed
    assert_eq!(diagnosed.len(), 1);
    assert_eq!(diagnosed[0].step.service, "core");
    assert_eq!(diagnosed[0].diagnoses[0].pattern, "go-undefined");
}

#[test]
fn test_latest_without_reports() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileDiagnosticStore::new(temp_dir.path());
    assert!(matches!(store.latest(), Err(StoreError::NotFound(_))));
}
