//! Alert evaluator: two-level inactivity alerts on classified cases.
//!
//! RULE: Closed cases never alert, however stale they are.
//! Level 1 (overdue) outranks Level 2 (stagnation) in the label.

use crate::{
    case::{AlertLabel, AlertedCase, ClassifiedCase},
    config::AlertThresholds,
};

pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Alert every case, preserving input order.
    pub fn evaluate_all(&self, cases: Vec<ClassifiedCase>) -> Vec<AlertedCase> {
        cases.into_iter().map(|case| self.evaluate(case)).collect()
    }

    pub fn evaluate(&self, case: ClassifiedCase) -> AlertedCase {
        let open = !case.is_closed;
        let days = case.days_since_activity;

        let alert_level_1 = open && days >= self.thresholds.level_1_days;
        let alert_level_2 = open && days >= self.thresholds.level_2_days;

        AlertedCase {
            case,
            alert_level_1,
            alert_level_2,
            alert_label: label_for(alert_level_1, alert_level_2),
        }
    }
}

pub fn label_for(level_1: bool, level_2: bool) -> AlertLabel {
    if level_1 {
        AlertLabel::Overdue
    } else if level_2 {
        AlertLabel::Stagnation
    } else {
        AlertLabel::None
    }
}
