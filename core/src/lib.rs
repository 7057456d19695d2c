//! Subsidy-recovery case engine.
//!
//! Turns normalized case records into classified, alerted cases plus
//! portfolio KPIs. `ingest` and `report` sit on either side of the engine
//! and are the only modules that touch files.

pub mod alert_evaluator;
pub mod case;
pub mod case_classifier;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod kpi_summarizer;
pub mod report;
pub mod types;

pub use case::{AlertLabel, AlertedCase, CaseCategory, CaseRecord, ClassifiedCase, PriorityBucket};
pub use clock::EvaluationDate;
pub use config::EngineConfig;
pub use engine::{CaseEngine, EngineOutput};
pub use error::{RecoveryError, RecoveryResult};
pub use kpi_summarizer::KpiSummary;
