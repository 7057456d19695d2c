//! Case classifier: inactivity, lifecycle category, priority and review order.
//!
//! Classification is an ordered rule chain (first match wins):
//!   1. status is one of {closed, finalized, paid}  -> Closure
//!   2. sub_status contains "return"                -> Return
//!   3. sub_status contains "claim"                 -> Claim
//!   4. status contains "pending"                   -> Pending
//!   5. otherwise                                   -> InProgress
//! Both fields are trimmed and lowercased before matching.
//!
//! Review order: open cases first, then stalest first, then oldest
//! registration first. The sort is stable, so input order breaks any
//! remaining tie.

use crate::{
    case::{CaseCategory, CaseRecord, ClassifiedCase, Inactivity, PriorityBucket},
    clock::EvaluationDate,
    config::{ClassificationRule, EngineConfig, MatchField, Matcher, PriorityBin},
    types::DayCount,
};
use std::cmp::Ordering;

pub struct CaseClassifier<'a> {
    config: &'a EngineConfig,
}

impl<'a> CaseClassifier<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Classify every record and return them in review order.
    pub fn classify_all(&self, records: &[CaseRecord], today: EvaluationDate) -> Vec<ClassifiedCase> {
        let mut cases: Vec<ClassifiedCase> = records
            .iter()
            .map(|record| self.classify(record, today))
            .collect();
        cases.sort_by(review_order);
        cases
    }

    pub fn classify(&self, record: &CaseRecord, today: EvaluationDate) -> ClassifiedCase {
        let inactivity = inactivity(record, today);
        let days_since_activity = inactivity.effective_days(self.config.unknown_activity_days);
        let case_category = classify_case(&self.config.classification_rules, &record.status, &record.sub_status);

        ClassifiedCase {
            record: record.clone(),
            inactivity,
            days_since_activity,
            case_category,
            is_closed: case_category == CaseCategory::Closure,
            priority_bucket: priority_for(
                &self.config.priority_bins,
                self.config.overflow_bucket,
                days_since_activity,
            ),
        }
    }
}

/// Days between the last movement and `today`. Future movement dates are
/// clamped to zero.
pub fn inactivity(record: &CaseRecord, today: EvaluationDate) -> Inactivity {
    let Some(last) = record.last_activity_date else {
        return Inactivity::Unknown;
    };
    let days = today.days_since(last);
    if days < 0 {
        log::warn!(
            "case {}: last activity {last} is after evaluation date {today}, counting 0 days",
            record.id
        );
        return Inactivity::Known(0);
    }
    Inactivity::Known(days)
}

/// Run the rule chain over raw status text.
pub fn classify_case(rules: &[ClassificationRule], status: &str, sub_status: &str) -> CaseCategory {
    let status = status.trim().to_lowercase();
    let sub_status = sub_status.trim().to_lowercase();

    rules
        .iter()
        .find(|rule| {
            let value = match rule.field {
                MatchField::Status => &status,
                MatchField::SubStatus => &sub_status,
            };
            rule.matcher.matches(value)
        })
        .map(|rule| rule.category)
        .unwrap_or(CaseCategory::InProgress)
}

impl Matcher {
    /// `value` must already be trimmed and lowercased.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::OneOf(words) => words.iter().any(|w| w.trim().to_lowercase() == value),
            Matcher::Contains(word) => value.contains(word.trim().to_lowercase().as_str()),
        }
    }
}

/// First bin whose upper edge reaches `days`, else `overflow`.
pub fn priority_for(bins: &[PriorityBin], overflow: PriorityBucket, days: DayCount) -> PriorityBucket {
    let idx = bins.partition_point(|bin| bin.max_days < days);
    bins.get(idx).map(|bin| bin.bucket).unwrap_or(overflow)
}

fn review_order(a: &ClassifiedCase, b: &ClassifiedCase) -> Ordering {
    a.is_closed
        .cmp(&b.is_closed)
        .then_with(|| b.days_since_activity.cmp(&a.days_since_activity))
        .then_with(|| {
            // Missing registration dates go last.
            match (a.record.registration_date, b.record.registration_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
}
