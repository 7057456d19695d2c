//! Case classifier tests: rule precedence, inactivity, priority and review order.

use chrono::{Duration, NaiveDate};
use recovery_core::{
    case_classifier::{classify_case, CaseClassifier},
    config::{ClassificationRule, MatchField, Matcher},
    CaseCategory, CaseRecord, EngineConfig, EvaluationDate, PriorityBucket,
};

fn today() -> EvaluationDate {
    EvaluationDate::fixed(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
}

fn days_ago(n: i64) -> Option<NaiveDate> {
    Some(today().date() - Duration::days(n))
}

fn record(id: &str, status: &str, sub_status: &str, idle_days: Option<i64>) -> CaseRecord {
    CaseRecord {
        id: id.into(),
        status: status.into(),
        sub_status: sub_status.into(),
        last_activity_date: idle_days.and_then(days_ago),
        ..Default::default()
    }
}

fn category(status: &str, sub_status: &str) -> CaseCategory {
    classify_case(&EngineConfig::default().classification_rules, status, sub_status)
}

/// Closure is checked before any sub-status rule.
#[test]
fn closed_status_wins_over_claim_sub_status() {
    assert_eq!(category("Closed", "Claim pending"), CaseCategory::Closure);
}

#[test]
fn closure_statuses_match_case_and_whitespace_insensitively() {
    assert_eq!(category("  PAID ", ""), CaseCategory::Closure);
    assert_eq!(category("Finalized", ""), CaseCategory::Closure);
    assert_eq!(category("closed", "return requested"), CaseCategory::Closure);
}

/// Closure needs the whole status to match, not a substring.
#[test]
fn partially_paid_is_not_closure() {
    assert_eq!(category("Partially paid", ""), CaseCategory::InProgress);
}

#[test]
fn return_outranks_claim_and_pending() {
    assert_eq!(category("Pending", "Claim after return"), CaseCategory::Return);
    assert_eq!(category("Pending", "Claim filed"), CaseCategory::Claim);
    assert_eq!(category("Pending review", "docs requested"), CaseCategory::Pending);
}

#[test]
fn anything_else_is_in_progress() {
    assert_eq!(category("Open", ""), CaseCategory::InProgress);
    assert_eq!(category("", ""), CaseCategory::InProgress);
}

/// A reordered rule chain changes precedence accordingly.
#[test]
fn custom_rule_chain_is_evaluated_in_order() {
    let rules = vec![
        ClassificationRule {
            field: MatchField::SubStatus,
            matcher: Matcher::Contains("reclamo".into()),
            category: CaseCategory::Claim,
        },
        ClassificationRule {
            field: MatchField::Status,
            matcher: Matcher::OneOf(vec!["cerrado".into(), "pagado".into()]),
            category: CaseCategory::Closure,
        },
    ];
    assert_eq!(classify_case(&rules, "Pagado", "Reclamo EsSalud"), CaseCategory::Claim);
    assert_eq!(classify_case(&rules, "Pagado", ""), CaseCategory::Closure);
}

#[test]
fn days_since_activity_counts_from_evaluation_date() {
    let config = EngineConfig::default();
    let case = CaseClassifier::new(&config).classify(&record("a", "Open", "", Some(12)), today());
    assert_eq!(case.days_since_activity, 12);
    assert_eq!(case.priority_bucket, PriorityBucket::High);
    assert!(!case.is_closed);
}

#[test]
fn missing_activity_date_is_maximally_stale() {
    let config = EngineConfig::default();
    let case = CaseClassifier::new(&config).classify(&record("a", "Open", "", None), today());
    assert!(!case.inactivity.is_known());
    assert_eq!(case.days_since_activity, 999);
    assert_eq!(case.priority_bucket, PriorityBucket::Critical);
}

#[test]
fn future_activity_date_counts_as_zero_days() {
    let config = EngineConfig::default();
    let mut rec = record("a", "Open", "", None);
    rec.last_activity_date = Some(today().date() + Duration::days(5));
    let case = CaseClassifier::new(&config).classify(&rec, today());
    assert_eq!(case.days_since_activity, 0);
    assert_eq!(case.priority_bucket, PriorityBucket::Low);
}

/// Moving the last activity earlier never lowers the day count.
#[test]
fn inactivity_is_monotonic_in_last_activity_date() {
    let config = EngineConfig::default();
    let classifier = CaseClassifier::new(&config);
    let mut previous = -1;
    for idle in 0..60 {
        let case = classifier.classify(&record("a", "Open", "", Some(idle)), today());
        assert!(
            case.days_since_activity >= previous,
            "days went down at idle={idle}: {} < {previous}",
            case.days_since_activity
        );
        previous = case.days_since_activity;
    }
}

#[test]
fn is_closed_tracks_closure_category() {
    let config = EngineConfig::default();
    let classifier = CaseClassifier::new(&config);
    for (status, sub) in [("Paid", ""), ("Open", "Return"), ("Pending", ""), ("Open", "Claim")] {
        let case = classifier.classify(&record("a", status, sub, Some(1)), today());
        assert_eq!(case.is_closed, case.case_category == CaseCategory::Closure);
    }
}

#[test]
fn review_order_puts_open_then_stale_then_old_registrations() {
    let config = EngineConfig::default();
    let reg = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);

    let mut closed_stale = record("closed-stale", "Closed", "", Some(90));
    closed_stale.registration_date = reg(2023, 1, 1);
    let mut open_fresh = record("open-fresh", "Open", "", Some(1));
    open_fresh.registration_date = reg(2023, 1, 1);
    let mut open_stale_new = record("open-stale-new", "Open", "", Some(40));
    open_stale_new.registration_date = reg(2024, 3, 1);
    let mut open_stale_old = record("open-stale-old", "Open", "", Some(40));
    open_stale_old.registration_date = reg(2023, 6, 1);
    let open_stale_unreg = record("open-stale-unregistered", "Open", "", Some(40));
    let open_unknown = record("open-unknown", "Pending", "", None);

    let input = vec![
        closed_stale,
        open_fresh,
        open_stale_unreg,
        open_stale_new,
        open_unknown,
        open_stale_old,
    ];
    let ids: Vec<String> = CaseClassifier::new(&config)
        .classify_all(&input, today())
        .into_iter()
        .map(|c| c.record.id)
        .collect();

    assert_eq!(
        ids,
        vec![
            "open-unknown",
            "open-stale-old",
            "open-stale-new",
            "open-stale-unregistered",
            "open-fresh",
            "closed-stale",
        ]
    );
}

/// Full ties keep input order.
#[test]
fn review_order_is_stable_on_ties() {
    let config = EngineConfig::default();
    let input: Vec<CaseRecord> = (0..10).map(|i| record(&format!("c{i}"), "Open", "", Some(20))).collect();
    let ids: Vec<String> = CaseClassifier::new(&config)
        .classify_all(&input, today())
        .into_iter()
        .map(|c| c.record.id)
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
    assert_eq!(ids, expected);
}

/// Classification copies every input field forward unchanged.
#[test]
fn classified_case_carries_the_original_record() {
    let config = EngineConfig::default();
    let mut rec = record("keep-me", "Open", "Return requested", Some(3));
    rec.agent = "M. Quispe".into();
    rec.amount = 1520.75;
    let case = CaseClassifier::new(&config).classify(&rec, today());
    assert_eq!(case.record, rec);
}
