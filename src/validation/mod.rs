/*!
 * Validation of translated output.
 *
 * - `quality_gate`: Presentation checks on the final cue sequence
 */

pub mod quality_gate;

// Re-export main types
pub use quality_gate::{
    GateResult, GateStats, GateThresholds, QualityGate, Severity, Violation, ViolationCode, validate,
};
