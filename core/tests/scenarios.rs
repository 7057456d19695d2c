//! End-to-end engine runs over small, hand-checked portfolios.

use chrono::{Duration, NaiveDate};
use recovery_core::{
    AlertLabel, AlertedCase, CaseCategory, CaseEngine, CaseRecord, EngineConfig, EvaluationDate, PriorityBucket,
    RecoveryError,
};

fn today() -> EvaluationDate {
    EvaluationDate::fixed(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
}

fn record(id: &str, status: &str, sub_status: &str, idle_days: Option<i64>, amount: f64) -> CaseRecord {
    CaseRecord {
        id: id.into(),
        status: status.into(),
        sub_status: sub_status.into(),
        last_activity_date: idle_days.map(|n| today().date() - Duration::days(n)),
        amount,
        ..Default::default()
    }
}

fn scenario_a() -> CaseRecord {
    record("A", "Paid", "", Some(40), 1200.0)
}

fn scenario_b() -> CaseRecord {
    record("B", "Open", "Return requested", Some(20), 300.0)
}

fn scenario_c() -> CaseRecord {
    record("C", "Open", "", Some(35), 500.0)
}

fn scenario_d() -> CaseRecord {
    record("D", "Pending review", "", None, 0.0)
}

fn find<'a>(cases: &'a [AlertedCase], id: &str) -> &'a AlertedCase {
    cases.iter().find(|c| c.record().id == id).expect("case present in output")
}

#[test]
fn paid_case_is_closed_and_silent() {
    let out = CaseEngine::default().run(&[scenario_a()], today());
    let a = &out.cases[0];
    assert_eq!(a.case.case_category, CaseCategory::Closure);
    assert!(a.case.is_closed);
    assert!(!a.alert_level_1);
    assert!(!a.alert_level_2);
    assert_eq!(a.case.priority_bucket, PriorityBucket::Critical);
}

#[test]
fn return_case_stagnates() {
    let out = CaseEngine::default().run(&[scenario_b()], today());
    let b = &out.cases[0];
    assert_eq!(b.case.case_category, CaseCategory::Return);
    assert!(!b.alert_level_1);
    assert!(b.alert_level_2);
    assert_eq!(b.alert_label, AlertLabel::Stagnation);
    assert_eq!(b.alert_label.to_string(), "Level 2 – Stagnation");
    assert_eq!(b.case.priority_bucket, PriorityBucket::Critical);
}

#[test]
fn idle_open_case_is_overdue() {
    let out = CaseEngine::default().run(&[scenario_c()], today());
    let c = &out.cases[0];
    assert_eq!(c.case.case_category, CaseCategory::InProgress);
    assert!(c.alert_level_1);
    assert_eq!(c.alert_label, AlertLabel::Overdue);
    assert_eq!(c.alert_label.to_string(), "Level 1 – Overdue");
}

#[test]
fn pending_case_without_activity_date_is_critical() {
    let out = CaseEngine::default().run(&[scenario_d()], today());
    let d = &out.cases[0];
    assert_eq!(d.case.case_category, CaseCategory::Pending);
    assert_eq!(d.case.days_since_activity, 999);
    assert_eq!(d.case.priority_bucket, PriorityBucket::Critical);
    assert!(d.alert_level_1);
    assert!(d.alert_level_2);
}

#[test]
fn kpis_over_paid_return_and_idle_cases() {
    let out = CaseEngine::default().run(&[scenario_a(), scenario_b(), scenario_c()], today());
    let k = &out.kpis;
    assert_eq!(k.total_cases, 3);
    assert_eq!(k.closed_cases, 1);
    assert_eq!(k.open_cases, 2);
    assert_eq!(k.level_1_alerts, 1);
    assert_eq!(k.level_2_alerts, 2);
    assert!((k.total_amount - 2000.0).abs() < 1e-9);
    assert!((k.closure_rate - 33.33).abs() < 0.01, "closure rate {}", k.closure_rate);
}

#[test]
fn output_is_in_review_order() {
    let input = [scenario_a(), scenario_b(), scenario_c(), scenario_d()];
    let out = CaseEngine::default().run(&input, today());
    let ids: Vec<&str> = out.cases.iter().map(|c| c.record().id.as_str()).collect();
    assert_eq!(ids, vec!["D", "C", "B", "A"]);
}

/// The same input evaluated later ages every open case.
#[test]
fn rerun_on_a_later_date_changes_results() {
    let input = [scenario_b()];
    let engine = CaseEngine::default();
    let now = engine.run(&input, today());
    let later = engine.run(&input, EvaluationDate::fixed(today().date() + Duration::days(10)));

    assert_eq!(find(&now.cases, "B").case.days_since_activity, 20);
    assert_eq!(find(&later.cases, "B").case.days_since_activity, 30);
    assert_eq!(find(&now.cases, "B").alert_label, AlertLabel::Stagnation);
    assert_eq!(find(&later.cases, "B").alert_label, AlertLabel::Overdue);
}

#[test]
fn identical_runs_are_identical() {
    let input = [scenario_d(), scenario_c(), scenario_a(), scenario_b()];
    let engine = CaseEngine::default();
    assert_eq!(engine.run(&input, today()), engine.run(&input, today()));
}

/// Portfolio-wide invariants on a mixed batch.
#[test]
fn closed_cases_never_alert_and_level_1_implies_level_2() {
    let mut input = Vec::new();
    for (i, status) in ["Closed", "Open", "Paid", "Pending", "Finalized", "In review"].iter().enumerate() {
        for idle in [None, Some(0), Some(14), Some(15), Some(30), Some(365)] {
            input.push(record(&format!("{status}-{i}-{idle:?}"), status, "", idle, 10.0));
        }
    }
    let out = CaseEngine::default().run(&input, today());
    assert_eq!(out.cases.len(), input.len());
    for case in &out.cases {
        if case.case.is_closed {
            assert!(!case.alert_level_1 && !case.alert_level_2, "closed case alerted: {}", case.record().id);
        } else {
            assert!(!case.alert_level_1 || case.alert_level_2, "level 1 without level 2: {}", case.record().id);
        }
    }
}

#[test]
fn engine_output_serializes_with_display_labels() {
    let out = CaseEngine::default().run(&[scenario_c()], today());
    let json = serde_json::to_value(&out).unwrap();
    let case = &json["cases"][0];
    assert_eq!(case["id"], "C");
    assert_eq!(case["alert_label"], "Level 1 – Overdue");
    assert_eq!(case["case_category"], "InProgress");
    assert_eq!(json["evaluated_on"], "2024-06-30");
    assert_eq!(json["kpis"]["total_cases"], 1);
}

/// A config that would misbin or misalert cases never reaches `run`.
#[test]
fn engine_construction_validates_config() {
    assert!(CaseEngine::try_new(EngineConfig::default()).is_ok());

    let no_bins = EngineConfig { priority_bins: Vec::new(), ..EngineConfig::default() };
    let err = CaseEngine::try_new(no_bins).unwrap_err();
    assert!(matches!(err, RecoveryError::InvalidConfig { .. }), "got {err:?}");

    let mut inverted = EngineConfig::default();
    inverted.alert_thresholds.level_1_days = 10;
    inverted.alert_thresholds.level_2_days = 15;
    let err = CaseEngine::try_new(inverted).unwrap_err();
    assert!(err.to_string().contains("level_1_days"), "got {err}");

    let custom = EngineConfig::from_json(r#"{"alert_thresholds": {"level_1_days": 45, "level_2_days": 20}}"#).unwrap();
    let engine = CaseEngine::try_new(custom).unwrap();
    let out = engine.run(&[record("slow", "Open", "", Some(40), 0.0)], today());
    assert_eq!(out.cases[0].alert_label, AlertLabel::Stagnation);
}
