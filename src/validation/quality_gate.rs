/*!
 * Presentation quality gate for translated cues.
 *
 * Checks every cue against three constraints:
 * - Gap to the next cue (overlaps and cues that follow too closely)
 * - Reading speed in characters per second
 * - Maximum on-screen duration
 *
 * The gate is a pure function of the cues and thresholds. Violations are
 * returned as data; the caller decides what to do with a failed verdict.
 */

use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::subtitle_processor::Cue;

/// Tolerance for threshold comparisons on derived float values.
///
/// Timestamps are stored in seconds, so a 50 ms gap computed from them can
/// come out as 49.999... ms. Values within this distance of a threshold count
/// as equal to it.
const EPSILON: f64 = 1e-9;

/// Kind of presentation problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationCode {
    /// Gap to the next cue is below the minimum (or negative)
    #[serde(rename = "OVERLAPS")]
    Overlaps,
    /// Reading speed above the limit
    #[serde(rename = "CPS")]
    Cps,
    /// Cue stays on screen too long
    #[serde(rename = "MAX_CUE")]
    MaxCue,
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ViolationCode::Overlaps => "OVERLAPS",
            ViolationCode::Cps => "CPS",
            ViolationCode::MaxCue => "MAX_CUE",
        };
        write!(f, "{}", code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found by the gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub code: ViolationCode,

    /// 1-based position of the offending cue
    pub segment_id: Option<usize>,

    pub message: String,

    pub severity: Severity,
}

impl Violation {
    fn error(code: ViolationCode, cue_number: usize, message: String) -> Self {
        Self {
            code,
            segment_id: Some(cue_number),
            message,
            severity: Severity::Error,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment_id {
            Some(id) => write!(f, "[{}] cue {}: {}", self.code, id, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Gate thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    /// Reading speed ceiling in characters per second
    #[serde(default = "default_max_cps")]
    pub max_cps: f64,

    /// On-screen duration ceiling in seconds
    #[serde(default = "default_max_cue_duration")]
    pub max_cue_duration: f64,

    /// Minimum gap between consecutive cues in milliseconds
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            max_cps: default_max_cps(),
            max_cue_duration: default_max_cue_duration(),
            min_gap_ms: default_min_gap_ms(),
        }
    }
}

fn default_max_cps() -> f64 {
    22.0
}

fn default_max_cue_duration() -> f64 {
    6.0
}

fn default_min_gap_ms() -> f64 {
    50.0
}

/// Aggregate statistics over a cue sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateStats {
    pub total_cues: usize,
    pub overlap_count: usize,
    pub cps_violations: usize,
    pub long_cues: usize,
    /// Mean reading speed over cues with positive duration
    pub average_cps: f64,
    /// Highest reading speed over cues with positive duration
    pub max_cps: f64,
}

/// Verdict of the quality gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// True iff no violation has error severity
    pub passed: bool,

    /// Violations in cue order
    pub violations: Vec<Violation>,

    pub stats: GateStats,
}

impl GateResult {
    /// Build a verdict; it passes iff no violation has error severity
    pub fn from_violations(violations: Vec<Violation>, stats: GateStats) -> Self {
        let passed = !violations.iter().any(|v| v.severity == Severity::Error);
        Self {
            passed,
            violations,
            stats,
        }
    }

    /// Human-readable one-line summary derived from the stats
    pub fn summary(&self) -> String {
        if self.violations.is_empty() {
            return format!("All {} subtitles passed quality checks", self.stats.total_cues);
        }
        format!(
            "{} overlapping subtitles, {} too fast, {} too long",
            self.stats.overlap_count, self.stats.cps_violations, self.stats.long_cues
        )
    }

    /// Number of violations with error severity
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count()
    }

    /// Violations with the given code
    pub fn violations_of(&self, code: ViolationCode) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.code == code)
    }
}

/// Reading speed of a cue, `None` when its duration is not positive
pub fn chars_per_second(cue: &Cue) -> Option<f64> {
    let duration = cue.duration();
    (duration > 0.0).then(|| cue.text.chars().count() as f64 / duration)
}

/// Validate cues against the given thresholds
pub fn validate(cues: &[Cue], thresholds: &GateThresholds) -> GateResult {
    let mut violations = Vec::new();
    let mut stats = GateStats {
        total_cues: cues.len(),
        ..GateStats::default()
    };
    let mut cps_sum = 0.0;
    let mut timed_cues = 0usize;

    for (i, cue) in cues.iter().enumerate() {
        let number = i + 1;

        if let Some(next) = cues.get(i + 1) {
            let gap_ms = (next.start - cue.end) * 1000.0;
            if gap_ms < thresholds.min_gap_ms - EPSILON {
                stats.overlap_count += 1;
                let message = if gap_ms < 0.0 {
                    format!("Overlaps next cue by {:.0}ms", -gap_ms)
                } else {
                    format!(
                        "Gap to next cue is {:.0}ms (min: {:.0}ms)",
                        gap_ms, thresholds.min_gap_ms
                    )
                };
                violations.push(Violation::error(ViolationCode::Overlaps, number, message));
            }
        }

        if let Some(cps) = chars_per_second(cue) {
            timed_cues += 1;
            cps_sum += cps;
            stats.max_cps = stats.max_cps.max(cps);

            if cps > thresholds.max_cps + EPSILON {
                stats.cps_violations += 1;
                violations.push(Violation::error(
                    ViolationCode::Cps,
                    number,
                    format!("Reading speed {:.1} CPS (max: {:.1})", cps, thresholds.max_cps),
                ));
            }
        }

        let duration = cue.duration();
        if duration > thresholds.max_cue_duration + EPSILON {
            stats.long_cues += 1;
            violations.push(Violation::error(
                ViolationCode::MaxCue,
                number,
                format!(
                    "On screen for {:.2}s (max: {:.2}s)",
                    duration, thresholds.max_cue_duration
                ),
            ));
        }
    }

    if timed_cues > 0 {
        stats.average_cps = cps_sum / timed_cues as f64;
    }

    GateResult::from_violations(violations, stats)
}

/// Quality gate with fixed thresholds
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    thresholds: GateThresholds,
}

impl QualityGate {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GateThresholds {
        &self.thresholds
    }

    /// Validate cues and log the verdict
    pub fn check(&self, cues: &[Cue]) -> GateResult {
        let result = validate(cues, &self.thresholds);
        if result.passed {
            info!("Quality gate passed: {}", result.summary());
        } else {
            warn!(
                "Quality gate failed with {} error(s): {}",
                result.error_count(),
                result.summary()
            );
        }
        result
    }
}
