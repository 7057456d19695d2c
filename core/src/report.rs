//! Presentation helpers: dashboard filters, the management view, the
//! per-case detail lookup and report export (CSV, JSON, `.xlsx`).
//!
//! These consume engine output and never feed back into it.

use crate::{
    case::{AlertLabel, AlertedCase, CaseCategory},
    engine::EngineOutput,
    error::RecoveryResult,
    ingest::normalize_header,
};
use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::io::Write;

/// Source columns shown in the management view, in display order.
pub const MANAGEMENT_COLUMNS: [&str; 21] = [
    "EMPRESA",
    "DNI",
    "APELLIDOS Y NOMBRES",
    "TIPO DE SUBSIDIO",
    "FECHA DE INICIO",
    "FECHA FIN",
    "TOTAL DIAS",
    "VENCIMIENTO DE EXPEDIENTE",
    "STATUS PLATAFORMA VIVA",
    "STATUS TRABAJADORA SOCIAL",
    "STATUS EBE",
    "EXPEDIENTE",
    "IMPORTE SOLICITADO",
    "IMPORTE REEMBOLSADO POR ESSALUD",
    "DIFERENCIA S/. A FAVOR",
    "DIFERENCIA S/. EN CONTRA",
    "FECHA ULTIMA ACCION",
    "DETALLE DE RPTA ESSALUD OBSERVACIÓN",
    "FECHA DE COBRO (CONTABILIDAD)",
    "AÑO DE COBRO (CONTABILIDAD)",
    "MES DE COBRO (CONTABILIDAD)",
];

/// Engine columns leading every detail row. Same names as the CSV report header.
pub const DETAIL_COLUMNS: [&str; 14] = [
    "id",
    "registration_date",
    "last_activity_date",
    "status",
    "sub_status",
    "agent",
    "amount",
    "days_since_activity",
    "case_category",
    "is_closed",
    "priority_bucket",
    "alert_level_1",
    "alert_level_2",
    "alert_label",
];

pub const MANAGEMENT_SHEET: &str = "GESTION";
pub const DETAIL_SHEET: &str = "DETALLE";

const NAME_COLUMN: &str = "APELLIDOS Y NOMBRES";
const DNI_COLUMN: &str = "DNI";

// ── Filtering ────────────────────────────────────────────────────────────────

/// Empty lists and `alert: None` place no restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseFilter {
    pub statuses: Vec<String>,
    pub agents: Vec<String>,
    pub categories: Vec<CaseCategory>,
    pub alert: Option<AlertLabel>,
}

impl CaseFilter {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.agents.is_empty() && self.categories.is_empty() && self.alert.is_none()
    }

    pub fn matches(&self, case: &AlertedCase) -> bool {
        let record = case.record();
        (self.statuses.is_empty() || self.statuses.iter().any(|s| s == &record.status))
            && (self.agents.is_empty() || self.agents.iter().any(|a| a == &record.agent))
            && (self.categories.is_empty() || self.categories.contains(&case.case.case_category))
            && self.alert.map_or(true, |label| label == case.alert_label)
    }

    /// Matching cases, in the order given.
    pub fn apply<'a>(&self, cases: &'a [AlertedCase]) -> Vec<&'a AlertedCase> {
        cases.iter().filter(|c| self.matches(c)).collect()
    }
}

/// Distinct values offered by the dashboard filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterOptions {
    pub statuses: Vec<String>,
    pub agents: Vec<String>,
    pub alert_labels: Vec<AlertLabel>,
}

pub fn filter_options(cases: &[AlertedCase]) -> FilterOptions {
    let mut statuses = BTreeSet::new();
    let mut agents = BTreeSet::new();
    let mut alert_labels = BTreeSet::new();

    for case in cases {
        let record = case.record();
        if !record.status.is_empty() {
            statuses.insert(record.status.clone());
        }
        if !record.agent.is_empty() {
            agents.insert(record.agent.clone());
        }
        alert_labels.insert(case.alert_label);
    }

    FilterOptions {
        statuses: statuses.into_iter().collect(),
        agents: agents.into_iter().collect(),
        alert_labels: alert_labels.into_iter().collect(),
    }
}

// ── Export ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    id: &'a str,
    registration_date: String,
    last_activity_date: String,
    status: &'a str,
    sub_status: &'a str,
    agent: &'a str,
    amount: f64,
    days_since_activity: i64,
    case_category: &'static str,
    is_closed: bool,
    priority_bucket: &'static str,
    alert_level_1: bool,
    alert_level_2: bool,
    alert_label: &'static str,
}

enum DetailCell<'a> {
    Text(&'a str),
    Number(f64),
    Flag(bool),
}

impl fmt::Display for DetailCell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailCell::Text(s) => f.write_str(s),
            DetailCell::Number(n) => write!(f, "{n}"),
            DetailCell::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl ReportRow<'_> {
    /// Values in `DETAIL_COLUMNS` order.
    fn cells(&self) -> [DetailCell<'_>; 14] {
        [
            DetailCell::Text(self.id),
            DetailCell::Text(&self.registration_date),
            DetailCell::Text(&self.last_activity_date),
            DetailCell::Text(self.status),
            DetailCell::Text(self.sub_status),
            DetailCell::Text(self.agent),
            DetailCell::Number(self.amount),
            DetailCell::Number(self.days_since_activity as f64),
            DetailCell::Text(self.case_category),
            DetailCell::Flag(self.is_closed),
            DetailCell::Text(self.priority_bucket),
            DetailCell::Flag(self.alert_level_1),
            DetailCell::Flag(self.alert_level_2),
            DetailCell::Text(self.alert_label),
        ]
    }
}

impl<'a> From<&'a AlertedCase> for ReportRow<'a> {
    fn from(case: &'a AlertedCase) -> Self {
        let record = case.record();
        let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        Self {
            id: &record.id,
            registration_date: date(record.registration_date),
            last_activity_date: date(record.last_activity_date),
            status: &record.status,
            sub_status: &record.sub_status,
            agent: &record.agent,
            amount: record.amount,
            days_since_activity: case.case.days_since_activity,
            case_category: case.case.case_category.as_str(),
            is_closed: case.case.is_closed,
            priority_bucket: case.case.priority_bucket.as_str(),
            alert_level_1: case.alert_level_1,
            alert_level_2: case.alert_level_2,
            alert_label: case.alert_label.as_str(),
        }
    }
}

/// Detail report: one CSV row per case, header first.
pub fn write_csv<'a, W, I>(cases: I, writer: W) -> RecoveryResult<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AlertedCase>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0usize;
    for case in cases {
        csv_writer.serialize(ReportRow::from(case))?;
        rows += 1;
    }
    csv_writer.flush()?;
    log::debug!("report: wrote {rows} case rows");
    Ok(())
}

pub fn write_json<W: Write>(output: &EngineOutput, writer: W) -> RecoveryResult<()> {
    serde_json::to_writer_pretty(writer, output)?;
    Ok(())
}

// ── Management view ──────────────────────────────────────────────────────────

fn normalized_source_headers(cases: &[&AlertedCase]) -> HashSet<String> {
    cases
        .iter()
        .flat_map(|c| c.record().source.iter())
        .map(|(header, _)| normalize_header(header))
        .collect()
}

/// `MANAGEMENT_COLUMNS` present in the source, in display order.
pub fn management_columns(cases: &[&AlertedCase]) -> Vec<&'static str> {
    let present = normalized_source_headers(cases);
    MANAGEMENT_COLUMNS
        .iter()
        .copied()
        .filter(|col| present.contains(&normalize_header(col)))
        .collect()
}

/// `MANAGEMENT_COLUMNS` the source does not carry.
pub fn missing_management_columns(cases: &[&AlertedCase]) -> Vec<&'static str> {
    let present = normalized_source_headers(cases);
    MANAGEMENT_COLUMNS
        .iter()
        .copied()
        .filter(|col| !present.contains(&normalize_header(col)))
        .collect()
}

/// Management view as CSV: the present management columns, source text as-is.
/// Writes nothing when no management column is present.
pub fn write_management_csv<W: Write>(cases: &[&AlertedCase], writer: W) -> RecoveryResult<()> {
    let columns = management_columns(cases);
    if columns.is_empty() {
        log::info!("report: no management columns in source, management view skipped");
        return Ok(());
    }
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&columns)?;
    for case in cases {
        let record = case.record();
        csv_writer.write_record(columns.iter().map(|col| record.source_value(col).unwrap_or_default()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

// ── Case detail ──────────────────────────────────────────────────────────────

/// Source headers that follow the engine columns in detail output, in first-seen order.
fn extra_source_headers(cases: &[&AlertedCase]) -> Vec<String> {
    let engine: HashSet<String> = DETAIL_COLUMNS.iter().map(|c| normalize_header(c)).collect();
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    for (header, _) in cases.iter().flat_map(|c| c.record().source.iter()) {
        let key = normalize_header(header);
        if !engine.contains(&key) && seen.insert(key) {
            headers.push(header.clone());
        }
    }
    headers
}

/// Selector text for one case: "<name> | DNI <dni>".
pub fn case_label(case: &AlertedCase) -> String {
    let record = case.record();
    let name = record.source_value(NAME_COLUMN).filter(|s| !s.is_empty()).unwrap_or("Unnamed");
    let dni = record.source_value(DNI_COLUMN).filter(|s| !s.is_empty()).unwrap_or("no DNI");
    format!("{name} | DNI {dni}")
}

/// First case whose id, DNI or label equals `key`. Labels compare case-insensitively.
pub fn find_case<'a>(cases: &[&'a AlertedCase], key: &str) -> Option<&'a AlertedCase> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    cases.iter().copied().find(|case| {
        let record = case.record();
        record.id == key
            || record.source_value(DNI_COLUMN) == Some(key)
            || case_label(case).eq_ignore_ascii_case(key)
    })
}

/// Every field of one case as (column, value): engine columns, then source columns.
pub fn case_detail(case: &AlertedCase) -> Vec<(String, String)> {
    let row = ReportRow::from(case);
    let mut detail: Vec<(String, String)> = DETAIL_COLUMNS
        .iter()
        .zip(row.cells())
        .map(|(col, cell)| (col.to_string(), cell.to_string()))
        .collect();
    for header in extra_source_headers(&[case]) {
        let value = case.record().source_value(&header).unwrap_or_default().to_string();
        detail.push((header, value));
    }
    detail
}

// ── Workbook ─────────────────────────────────────────────────────────────────

/// Two-sheet `.xlsx` report: GESTION holds the management view, DETALLE
/// every engine and source column. Cases keep the order given.
pub fn write_workbook<W: Write>(cases: &[&AlertedCase], mut writer: W) -> RecoveryResult<()> {
    let mut workbook = Workbook::new();

    let columns = management_columns(cases);
    let gestion = workbook.add_worksheet();
    gestion.set_name(MANAGEMENT_SHEET)?;
    write_header(gestion, columns.iter().copied())?;
    for (i, case) in cases.iter().enumerate() {
        let row = (i + 1) as RowNum;
        for (col, header) in columns.iter().enumerate() {
            let value = case.record().source_value(header).unwrap_or_default();
            gestion.write_string(row, col as ColNum, value)?;
        }
    }

    let extra = extra_source_headers(cases);
    let detalle = workbook.add_worksheet();
    detalle.set_name(DETAIL_SHEET)?;
    write_header(detalle, DETAIL_COLUMNS.iter().copied().chain(extra.iter().map(String::as_str)))?;
    for (i, case) in cases.iter().enumerate() {
        let row = (i + 1) as RowNum;
        let report_row = ReportRow::from(*case);
        for (col, cell) in report_row.cells().into_iter().enumerate() {
            let col = col as ColNum;
            match cell {
                DetailCell::Text(s) => detalle.write_string(row, col, s)?,
                DetailCell::Number(n) => detalle.write_number(row, col, n)?,
                DetailCell::Flag(b) => detalle.write_boolean(row, col, b)?,
            };
        }
        for (j, header) in extra.iter().enumerate() {
            let value = case.record().source_value(header).unwrap_or_default();
            detalle.write_string(row, (DETAIL_COLUMNS.len() + j) as ColNum, value)?;
        }
    }

    writer.write_all(&workbook.save_to_buffer()?)?;
    log::debug!("report: wrote workbook with {} cases, {} management columns", cases.len(), columns.len());
    Ok(())
}

fn write_header<'h>(sheet: &mut Worksheet, headers: impl Iterator<Item = &'h str>) -> RecoveryResult<()> {
    for (col, header) in headers.enumerate() {
        sheet.write_string(0, col as ColNum, header)?;
    }
    Ok(())
}
