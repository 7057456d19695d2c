//! The case engine: one full recomputation over a record set.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Case classifier   (inactivity, category, priority, review order)
//!   2. Alert evaluator   (level 1 / level 2 flags and label)
//!   3. KPI summarizer    (portfolio scalars)
//!
//! RULES:
//!   - Each stage consumes the previous stage's output and returns a new one.
//!   - The evaluation date is an argument, never read from the clock here.
//!   - No state survives between runs.

use crate::{
    alert_evaluator::AlertEvaluator,
    case::{AlertedCase, CaseRecord},
    case_classifier::CaseClassifier,
    clock::EvaluationDate,
    config::EngineConfig,
    error::RecoveryResult,
    kpi_summarizer::{self, KpiSummary},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineOutput {
    pub evaluated_on: EvaluationDate,
    /// In review order.
    pub cases: Vec<AlertedCase>,
    pub kpis: KpiSummary,
}

#[derive(Debug, Clone, Default)]
pub struct CaseEngine {
    config: EngineConfig,
}

impl CaseEngine {
    /// Rejects configs that would break the alert or bucket invariants.
    pub fn try_new(config: EngineConfig) -> RecoveryResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, records: &[CaseRecord], today: EvaluationDate) -> EngineOutput {
        log::info!("Evaluating {} cases as of {today}", records.len());

        let classified = CaseClassifier::new(&self.config).classify_all(records, today);
        log::debug!("classifier: {} cases ordered for review", classified.len());

        let alerted = AlertEvaluator::new(self.config.alert_thresholds).evaluate_all(classified);
        log::debug!(
            "alerts: {} cases with an alert",
            alerted.iter().filter(|c| c.has_alert()).count()
        );

        let kpis = kpi_summarizer::summarize(&alerted);
        log::info!(
            "KPIs: total={} closed={} level1={} level2={} closure_rate={:.2}%",
            kpis.total_cases,
            kpis.closed_cases,
            kpis.level_1_alerts,
            kpis.level_2_alerts,
            kpis.closure_rate,
        );

        EngineOutput {
            evaluated_on: today,
            cases: alerted,
            kpis,
        }
    }
}
