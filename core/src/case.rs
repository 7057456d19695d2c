//! Case records as they move through the engine.
//!
//! RULE: Each stage returns a new, wider record that owns its predecessor.
//!   CaseRecord     (ingest output)
//!   ClassifiedCase (case_classifier output)
//!   AlertedCase    (alert_evaluator output)
//! No stage mutates a record produced by an earlier stage.

use crate::ingest::normalize_header;
use crate::types::{CaseId, DayCount};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One normalized spreadsheet row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseRecord {
    pub id: CaseId,
    pub registration_date: Option<NaiveDate>,
    pub last_activity_date: Option<NaiveDate>,
    pub status: String,
    pub sub_status: String,
    pub agent: String,
    pub amount: f64,
    /// Every source column of the row as (header, cell text), in sheet order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<(String, String)>,
}

impl CaseRecord {
    /// Cell text of a source column. Headers compare after normalization,
    /// so "Fecha Fin" finds "FECHA FIN".
    pub fn source_value(&self, header: &str) -> Option<&str> {
        let wanted = normalize_header(header);
        self.source
            .iter()
            .find(|(name, _)| normalize_header(name) == wanted)
            .map(|(_, value)| value.as_str())
    }
}

// ── Derived enumerations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaseCategory {
    Closure,
    Return,
    Claim,
    Pending,
    InProgress,
}

impl CaseCategory {
    pub const ALL: [CaseCategory; 5] = [
        CaseCategory::Closure,
        CaseCategory::Return,
        CaseCategory::Claim,
        CaseCategory::Pending,
        CaseCategory::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseCategory::Closure    => "Closure",
            CaseCategory::Return     => "Return",
            CaseCategory::Claim      => "Claim",
            CaseCategory::Pending    => "Pending",
            CaseCategory::InProgress => "InProgress",
        }
    }
}

impl fmt::Display for CaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['_', '-', ' '], "");
        CaseCategory::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown case category '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityBucket {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityBucket::Low      => "Low",
            PriorityBucket::Medium   => "Medium",
            PriorityBucket::High     => "High",
            PriorityBucket::Critical => "Critical",
        }
    }
}

impl fmt::Display for PriorityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest alert severity set on a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertLabel {
    #[serde(rename = "None")]
    None,
    #[serde(rename = "Level 2 – Stagnation")]
    Stagnation,
    #[serde(rename = "Level 1 – Overdue")]
    Overdue,
}

impl AlertLabel {
    pub const ALL: [AlertLabel; 3] = [AlertLabel::None, AlertLabel::Stagnation, AlertLabel::Overdue];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLabel::None       => "None",
            AlertLabel::Stagnation => "Level 2 – Stagnation",
            AlertLabel::Overdue    => "Level 1 – Overdue",
        }
    }
}

impl fmt::Display for AlertLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the display label or a short alias ("level1", "overdue", ...).
impl FromStr for AlertLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(label) = AlertLabel::ALL.into_iter().find(|l| l.as_str() == s.trim()) {
            return Ok(label);
        }
        match s.trim().to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "none" => Ok(AlertLabel::None),
            "level2" | "stagnation" => Ok(AlertLabel::Stagnation),
            "level1" | "overdue" => Ok(AlertLabel::Overdue),
            _ => Err(format!("unknown alert label '{s}'")),
        }
    }
}

// ── Inactivity ───────────────────────────────────────────────────────────────

/// Days since the last recorded movement. `Unknown` when the record has no
/// last-activity date; it only becomes a number through `effective_days`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Inactivity {
    Known(DayCount),
    Unknown,
}

impl Inactivity {
    pub fn effective_days(&self, unknown_days: DayCount) -> DayCount {
        match self {
            Inactivity::Known(days) => *days,
            Inactivity::Unknown => unknown_days,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Inactivity::Known(_))
    }
}

// ── Stage outputs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedCase {
    #[serde(flatten)]
    pub record: CaseRecord,
    pub inactivity: Inactivity,
    /// `inactivity` with the unknown sentinel applied.
    pub days_since_activity: DayCount,
    pub case_category: CaseCategory,
    pub is_closed: bool,
    pub priority_bucket: PriorityBucket,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertedCase {
    #[serde(flatten)]
    pub case: ClassifiedCase,
    pub alert_level_1: bool,
    pub alert_level_2: bool,
    pub alert_label: AlertLabel,
}

impl AlertedCase {
    pub fn record(&self) -> &CaseRecord {
        &self.case.record
    }

    pub fn has_alert(&self) -> bool {
        self.alert_level_1 || self.alert_level_2
    }
}
