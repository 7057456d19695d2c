//! Portfolio KPIs for the review dashboard.

use crate::case::AlertedCase;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KpiSummary {
    pub total_cases: usize,
    pub open_cases: usize,
    pub closed_cases: usize,
    pub level_1_alerts: usize,
    pub level_2_alerts: usize,
    /// Sum over every case, open or closed.
    pub total_amount: f64,
    /// Percentage in [0, 100]; 0 for an empty portfolio.
    pub closure_rate: f64,
}

pub fn summarize(cases: &[AlertedCase]) -> KpiSummary {
    let total_cases = cases.len();
    let closed_cases = cases.iter().filter(|c| c.case.is_closed).count();
    let level_1_alerts = cases.iter().filter(|c| c.alert_level_1).count();
    let level_2_alerts = cases.iter().filter(|c| c.alert_level_2).count();
    let total_amount: f64 = cases.iter().map(|c| c.record().amount).sum();

    let closure_rate = if total_cases == 0 {
        0.0
    } else {
        closed_cases as f64 / total_cases as f64 * 100.0
    };

    KpiSummary {
        total_cases,
        open_cases: total_cases - closed_cases,
        closed_cases,
        level_1_alerts,
        level_2_alerts,
        total_amount,
        closure_rate,
    }
}

impl fmt::Display for KpiSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  total cases:      {}", self.total_cases)?;
        writeln!(f, "  open cases:       {}", self.open_cases)?;
        writeln!(f, "  closed cases:     {}", self.closed_cases)?;
        writeln!(f, "  level 1 alerts:   {}", self.level_1_alerts)?;
        writeln!(f, "  level 2 alerts:   {}", self.level_2_alerts)?;
        writeln!(f, "  total amount:     {}", group_thousands(self.total_amount))?;
        write!(f, "  closure rate:     {:.2}%", self.closure_rate)
    }
}

/// `1234567.891` -> `1,234,567.89`
fn group_thousands(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
