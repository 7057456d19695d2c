//! Spreadsheet ingestion: header mapping, validation and cell coercion.
//!
//! Input is the first worksheet of an `.xlsx` workbook or a CSV export of
//! it. Every source column is kept on the record; headers are normalized
//! (lowercase, accents stripped, separators -> `_`) and matched against
//! per-field synonym lists. When several synonyms are present, each row
//! takes the first candidate column that yields a value.
//!
//! RULE: Nothing past this module sees raw cell text. Unparseable dates
//! become `None`, unparseable amounts become 0, missing text becomes "".

use crate::{
    case::CaseRecord,
    error::{RecoveryError, RecoveryResult},
};
use calamine::{Data, Reader, Xlsx};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// Identity columns joined into a synthesized case id.
const ID_PARTS: [&str; 4] = ["dni", "tipo_de_subsidio", "fecha_de_inicio", "fecha_fin"];
const ID_DELIMITER: &str = "|";

/// Two-digit-year layouts are tried first; `%Y` would read "24" as year 24.
const DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];
/// `%Y` accepts one to three digit years too; those are misparses.
const MIN_YEAR: i32 = 1000;
const CURRENCY_MARKERS: &[&str] = &["S/.", "S/", "$"];

// ── Semantic fields ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    RegistrationDate,
    LastActivityDate,
    Status,
    SubStatus,
    Agent,
    Amount,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Id,
        Field::RegistrationDate,
        Field::LastActivityDate,
        Field::Status,
        Field::SubStatus,
        Field::Agent,
        Field::Amount,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Id               => "id",
            Field::RegistrationDate => "registration_date",
            Field::LastActivityDate => "last_activity_date",
            Field::Status           => "status",
            Field::SubStatus        => "sub_status",
            Field::Agent            => "agent",
            Field::Amount           => "amount",
        }
    }

    /// Normalized header names, in preference order.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Field::Id => &["id", "expediente", "case_id"],
            Field::RegistrationDate => &[
                "fecha_registro",
                "fecha_de_registro",
                "registration_date",
                "fecha_de_inicio",
            ],
            Field::LastActivityDate => &[
                "fecha_ultimo_mov",
                "fecha_ultima_accion",
                "fecha_ultimo_movimiento",
                "last_activity_date",
            ],
            Field::Status => &["estado", "status_plataforma_viva", "status"],
            Field::SubStatus => &["subestado", "status_ebe", "sub_status"],
            Field::Agent => &["agente", "trabajadora_social", "status_trabajadora_social", "agent"],
            Field::Amount => &["monto", "importe_solicitado", "amount"],
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Field::Id | Field::LastActivityDate | Field::Status)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Column map ───────────────────────────────────────────────────────────────

/// Resolved header positions for one input file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnMap {
    headers: Vec<String>,
    candidates: HashMap<Field, Vec<usize>>,
    id_parts: Option<[usize; 4]>,
}

impl ColumnMap {
    pub fn resolve(raw_headers: &[String]) -> Self {
        let normalized: Vec<String> = raw_headers.iter().map(|h| normalize_header(h)).collect();
        let position = |name: &str| normalized.iter().position(|h| h == name);

        let candidates = Field::ALL
            .into_iter()
            .map(|field| {
                let cols: Vec<usize> = field.synonyms().iter().filter_map(|s| position(*s)).collect();
                (field, cols)
            })
            .collect();

        let parts: Vec<usize> = ID_PARTS.iter().filter_map(|p| position(*p)).collect();
        let id_parts = <[usize; 4]>::try_from(parts).ok();

        Self {
            headers: raw_headers.to_vec(),
            candidates,
            id_parts,
        }
    }

    pub fn columns_for(&self, field: Field) -> &[usize] {
        self.candidates.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn can_synthesize_id(&self) -> bool {
        self.id_parts.is_some()
    }

    pub fn has(&self, field: Field) -> bool {
        !self.columns_for(field).is_empty() || (field == Field::Id && self.can_synthesize_id())
    }

    /// Fields absent from the header row, in schema order.
    pub fn missing(&self, required: bool) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| f.is_required() == required && !self.has(*f))
            .collect()
    }

    /// Fail with every missing required field named.
    pub fn validate(&self) -> RecoveryResult<()> {
        let missing = self.missing(true);
        if missing.is_empty() {
            return Ok(());
        }
        Err(RecoveryError::MissingRequiredFields {
            missing: missing.iter().map(|f| f.name().to_string()).collect(),
        })
    }

    /// `field <- Header A, Header B` lines for logging.
    pub fn describe(&self) -> String {
        Field::ALL
            .into_iter()
            .map(|field| {
                let cols: Vec<&str> = self
                    .columns_for(field)
                    .iter()
                    .map(|&i| self.headers[i].as_str())
                    .collect();
                let source = if !cols.is_empty() {
                    cols.join(", ")
                } else if field == Field::Id && self.can_synthesize_id() {
                    format!("synthesized from {}", ID_PARTS.join(ID_DELIMITER))
                } else {
                    "(none)".to_string()
                };
                format!("{field} <- {source}")
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub records: Vec<CaseRecord>,
    /// Optional fields with no source column; they take their defaults.
    pub missing_optional: Vec<Field>,
    pub column_map: ColumnMap,
}

/// Load case records from a CSV reader. Cells that are not valid UTF-8
/// are read as Latin-1.
pub fn load_cases<R: Read>(reader: R) -> RecoveryResult<IngestReport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = decode_record(csv_reader.byte_headers()?, 1);
    let mut rows = Vec::new();
    for (row_num, result) in csv_reader.byte_records().enumerate() {
        let row = result?;
        // Header is line 1.
        rows.push(decode_record(&row, row_num + 2));
    }
    build_report(headers, rows)
}

/// Load case records from the first worksheet of an `.xlsx` workbook.
/// The first row holds the headers.
pub fn load_workbook<R: Read + Seek>(reader: R) -> RecoveryResult<IngestReport> {
    let mut workbook: Xlsx<R> = Xlsx::new(reader).map_err(calamine::Error::from)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(RecoveryError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&sheet).map_err(calamine::Error::from)?;
    log::info!("Reading worksheet '{sheet}'");

    let mut rows = range.rows().map(|row| row.iter().map(workbook_cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    build_report(headers, rows.collect())
}

/// Load case records from a path; `.xlsx`/`.xlsm` are read as workbooks,
/// anything else as CSV.
pub fn load_cases_file(path: &str) -> RecoveryResult<IngestReport> {
    let file = std::fs::File::open(path)?;
    if is_workbook_path(path) {
        load_workbook(BufReader::new(file))
    } else {
        load_cases(file)
    }
}

fn is_workbook_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "xlsx" | "xlsm"))
}

fn build_report(headers: Vec<String>, rows: Vec<Vec<String>>) -> RecoveryResult<IngestReport> {
    let column_map = ColumnMap::resolve(&headers);
    column_map.validate()?;
    log::info!("Column mapping: {}", column_map.describe());

    let missing_optional = column_map.missing(false);
    for field in &missing_optional {
        log::warn!("Optional field '{field}' has no source column, using defaults");
    }

    let records: Vec<CaseRecord> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| build_record(&column_map, row, i + 2))
        .collect();
    log::info!("Loaded {} case records", records.len());

    Ok(IngestReport {
        records,
        missing_optional,
        column_map,
    })
}

fn decode_record(record: &csv::ByteRecord, line: usize) -> Vec<String> {
    record
        .iter()
        .map(|bytes| match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => {
                let text: String = bytes.iter().map(|&b| char::from(b)).collect();
                log::warn!("line {line}: cell is not UTF-8, read as Latin-1: '{text}'");
                text
            }
        })
        .collect()
}

fn workbook_cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // Whole numbers (DNI, counts) lose the trailing ".0".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) if d.time() == NaiveTime::MIN => d.format("%Y-%m-%d").to_string(),
            Some(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        _ => String::new(),
    }
}

fn build_record(map: &ColumnMap, row: &[String], line: usize) -> CaseRecord {
    let text = |field: Field| first_text(row, map.columns_for(field)).unwrap_or_default().to_string();
    let date = |field: Field| {
        let cols = map.columns_for(field);
        let parsed = cols.iter().filter_map(|&i| cell(row, i)).find_map(parse_date);
        if parsed.is_none() {
            if let Some(raw) = first_text(row, cols) {
                log::debug!("line {line}: unparseable {field} '{raw}', treating as missing");
            }
        }
        parsed
    };

    let id = match first_text(row, map.columns_for(Field::Id)) {
        Some(id) => id.to_string(),
        None => synthesize_id(map, row),
    };

    let source = map
        .headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !header.trim().is_empty())
        .map(|(i, header)| (header.trim().to_string(), cell(row, i).unwrap_or_default().to_string()))
        .collect();

    CaseRecord {
        registration_date: date(Field::RegistrationDate),
        last_activity_date: date(Field::LastActivityDate),
        status: text(Field::Status),
        sub_status: text(Field::SubStatus),
        agent: text(Field::Agent),
        amount: coerce_amount(row, map.columns_for(Field::Amount), line),
        id,
        source,
    }
}

fn synthesize_id(map: &ColumnMap, row: &[String]) -> String {
    match map.id_parts {
        Some(parts) => parts
            .iter()
            .map(|&i| row.get(i).map(|s| s.trim()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(ID_DELIMITER),
        None => String::new(),
    }
}

fn coerce_amount(row: &[String], cols: &[usize], line: usize) -> f64 {
    let Some(amount) = cols.iter().filter_map(|&i| cell(row, i)).find_map(parse_amount) else {
        if let Some(raw) = first_text(row, cols) {
            log::debug!("line {line}: unparseable amount '{raw}', using 0");
        }
        return 0.0;
    };
    if amount < 0.0 {
        log::warn!("line {line}: negative amount {amount}, using 0");
        return 0.0;
    }
    amount
}

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn first_text<'r>(row: &'r [String], cols: &[usize]) -> Option<&'r str> {
    cols.iter().find_map(|&i| cell(row, i))
}

// ── Cell parsers ─────────────────────────────────────────────────────────────

/// `" Fecha Último  Mov. "` -> `"fecha_ultimo_mov"`
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().to_lowercase().chars() {
        let ch = match ch {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        };
        if ch.is_alphanumeric() || ch == '_' {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Calendar date of a cell; any time part is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let plausible = |date: &NaiveDate| date.year() >= MIN_YEAR;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok().filter(plausible))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok().map(|dt| dt.date()).filter(plausible))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
                .filter(plausible)
        })
}

/// Numeric value of an amount cell, currency markers and thousands
/// separators removed. `None` when not a finite number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut cleaned = raw.trim().to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned.retain(|c| !c.is_whitespace() && c != ',');
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
