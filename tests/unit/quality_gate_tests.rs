/*!
 * Tests for the presentation quality gate
 */

use cuegate::subtitle_processor::Cue;
use cuegate::validation::{GateThresholds, QualityGate, Severity, ViolationCode, validate};

fn defaults() -> GateThresholds {
    GateThresholds::default()
}

#[test]
fn test_validate_withGapOf50ms_shouldPass() {
    let cues = vec![Cue::new(10.0, 12.0, "First"), Cue::new(12.05, 14.0, "Second")];
    assert!(validate(&cues, &defaults()).passed);
}

#[test]
fn test_validate_withGapOf49ms_shouldFailWithOverlap() {
    let cues = vec![Cue::new(10.0, 12.0, "First"), Cue::new(12.049, 14.0, "Second")];
    let result = validate(&cues, &defaults());

    assert!(!result.passed);
    let overlaps: Vec<_> = result.violations_of(ViolationCode::Overlaps).collect();
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].segment_id, Some(1));
}

/// Boundary holds at many offsets, where float rounding differs
#[test]
fn test_validate_withExactGapAtManyOffsets_shouldNeverFlag() {
    for i in 0..500 {
        let end = i as f64 * 1.37;
        let cues = vec![Cue::new(end - 1.0, end, "a"), Cue::new(end + 0.05, end + 1.0, "b")];
        let result = validate(&cues, &defaults());
        assert_eq!(result.stats.overlap_count, 0, "end={end}");
    }
}

#[test]
fn test_validate_withCps22_shouldPassAndCps22_5ShouldFail() {
    let at_limit = vec![Cue::new(0.0, 2.0, "x".repeat(44))];
    let over_limit = vec![Cue::new(0.0, 2.0, "x".repeat(45))];

    assert!(validate(&at_limit, &defaults()).passed);

    let result = validate(&over_limit, &defaults());
    assert!(!result.passed);
    assert_eq!(result.violations[0].code, ViolationCode::Cps);
    assert_eq!(result.stats.max_cps, 22.5);
}

#[test]
fn test_validate_withCustomThresholds_shouldApplyThem() {
    let thresholds = GateThresholds {
        max_cps: 10.0,
        max_cue_duration: 2.0,
        min_gap_ms: 500.0,
    };
    let cues = vec![
        Cue::new(0.0, 3.0, "Short"),
        Cue::new(3.2, 4.0, "Twelve chars"),
    ];

    let result = validate(&cues, &thresholds);
    let codes: Vec<ViolationCode> = result.violations.iter().map(|v| v.code).collect();

    assert_eq!(
        codes,
        vec![ViolationCode::Overlaps, ViolationCode::MaxCue, ViolationCode::Cps]
    );
    assert!(result.violations.iter().all(|v| v.severity == Severity::Error));
}

#[test]
fn test_stats_shouldAverageOverTimedCuesOnly() {
    let cues = vec![
        Cue::new(0.0, 1.0, "abcd"),
        Cue::new(2.0, 2.0, "zero length"),
        Cue::new(3.0, 5.0, "abcdefghijkl"),
    ];
    let result = validate(&cues, &defaults());

    assert_eq!(result.stats.total_cues, 3);
    assert_eq!(result.stats.average_cps, 5.0);
    assert_eq!(result.stats.max_cps, 6.0);
}

#[test]
fn test_summary_shouldReportCounts() {
    let cues = vec![
        Cue::new(0.0, 2.0, "a"),
        Cue::new(1.0, 9.0, "b"),
        Cue::new(9.5, 10.0, "x".repeat(30)),
    ];
    let result = QualityGate::default().check(&cues);

    assert!(!result.passed);
    assert_eq!(result.summary(), "1 overlapping subtitles, 1 too fast, 1 too long");
}

#[test]
fn test_gateResult_shouldSerializeForReports() {
    let result = validate(&[Cue::new(0.0, 1.0, "ok"), Cue::new(0.5, 2.0, "late")], &defaults());
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["passed"], false);
    assert_eq!(json["violations"][0]["code"], "OVERLAPS");
    assert_eq!(json["violations"][0]["segment_id"], 1);
    assert_eq!(json["violations"][0]["severity"], "error");
    assert_eq!(json["stats"]["overlap_count"], 1);
}
