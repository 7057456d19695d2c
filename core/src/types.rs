//! Shared primitive types used across the engine.

/// A whole number of calendar days. Signed so date differences can be
/// computed before clamping.
pub type DayCount = i64;

/// A stable case identifier, sourced or synthesized at ingestion.
pub type CaseId = String;
