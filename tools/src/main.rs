//! case-runner: headless case engine runner for subsidy recovery.
//!
//! Usage:
//!   case-runner --input cases.csv
//!   case-runner --input cases.csv --today 2024-06-30 --alert level1 --report overdue.csv
//!   case-runner --input cases.xlsx --report reporte.xlsx --management gestion.csv
//!   case-runner --input cases.xlsx --case 44556677
//!   case-runner --input cases.csv --list-filters
//!   case-runner --input cases.csv --config engine.json --json

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use recovery_core::{
    ingest,
    report::{self, CaseFilter, FilterOptions},
    AlertLabel, AlertedCase, CaseCategory, CaseEngine, EngineConfig, EngineOutput, EvaluationDate,
};
use std::io::{self, Write};

#[derive(Parser, Debug)]
#[command(name = "case-runner")]
#[command(about = "Classify subsidy-recovery cases, raise inactivity alerts and report KPIs")]
struct Cli {
    /// Case spreadsheet (.xlsx) or its CSV export
    #[arg(short, long)]
    input: String,

    /// Evaluation date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Only show cases with this status (repeatable)
    #[arg(long = "status")]
    statuses: Vec<String>,

    /// Only show cases handled by this agent (repeatable)
    #[arg(long = "agent")]
    agents: Vec<String>,

    /// Only show cases in this category (repeatable)
    #[arg(long = "category")]
    categories: Vec<CaseCategory>,

    /// Only show cases with this alert label ("level1", "level2", "none")
    #[arg(long)]
    alert: Option<AlertLabel>,

    /// Write the filtered report here: a GESTION/DETALLE workbook for
    /// `.xlsx` paths, the detail CSV otherwise
    #[arg(long)]
    report: Option<String>,

    /// Write the filtered management view (source columns) to this CSV path
    #[arg(long)]
    management: Option<String>,

    /// Show every field of one case, looked up by id, DNI or "<name> | DNI <dni>"
    #[arg(long = "case")]
    case_key: Option<String>,

    /// List the status, agent and alert values available to the filters
    #[arg(long)]
    list_filters: bool,

    /// Print the full output as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let today = cli.today.map(EvaluationDate::fixed).unwrap_or_else(EvaluationDate::today);

    let ingested = ingest::load_cases_file(&cli.input)
        .with_context(|| format!("Cannot load cases from {}", cli.input))?;
    if !ingested.missing_optional.is_empty() {
        let names: Vec<&str> = ingested.missing_optional.iter().map(|f| f.name()).collect();
        eprintln!("warning: optional fields missing, defaults used: {}", names.join(", "));
    }

    let engine = CaseEngine::try_new(config)?;
    let output = engine.run(&ingested.records, today);

    let filter = CaseFilter {
        statuses: cli.statuses,
        agents: cli.agents,
        categories: cli.categories,
        alert: cli.alert,
    };
    let selected = filter.apply(&output.cases);
    log::debug!("filter kept {} of {} cases", selected.len(), output.cases.len());

    if let Some(path) = &cli.report {
        let file = std::fs::File::create(path).with_context(|| format!("Cannot create {path}"))?;
        if path.to_lowercase().ends_with(".xlsx") {
            report::write_workbook(&selected, file)?;
        } else {
            report::write_csv(selected.iter().copied(), file)?;
        }
        log::info!("report written to {path}");
    }

    if let Some(path) = &cli.management {
        let missing = report::missing_management_columns(&selected);
        if !missing.is_empty() {
            eprintln!("warning: management columns not in source: {}", missing.join(", "));
        }
        let file = std::fs::File::create(path).with_context(|| format!("Cannot create {path}"))?;
        report::write_management_csv(&selected, file)?;
    }

    let mut stdout = io::stdout().lock();
    if cli.list_filters {
        print_filter_options(&mut stdout, &report::filter_options(&output.cases))?;
    } else if let Some(key) = &cli.case_key {
        let case = report::find_case(&selected, key)
            .with_context(|| format!("No case matches '{key}'"))?;
        print_case_detail(&mut stdout, case)?;
    } else if cli.json {
        report::write_json(&output, &mut stdout)?;
        writeln!(stdout)?;
    } else {
        print_summary(&mut stdout, &cli.input, &output, &selected)?;
    }
    stdout.flush()?;

    Ok(())
}

fn print_summary(
    out: &mut impl Write,
    input: &str,
    output: &EngineOutput,
    selected: &[&AlertedCase],
) -> Result<()> {
    writeln!(out, "Subsidy recovery: case review")?;
    writeln!(out, "  input:            {input}")?;
    writeln!(out, "  evaluated on:     {}", output.evaluated_on)?;
    writeln!(out)?;
    writeln!(out, "{}", output.kpis)?;
    writeln!(out)?;

    if selected.is_empty() {
        writeln!(out, "No cases match the selected filters.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<28} {:<12} {:>6} {:<9} {:<22} {:<16}",
        "id", "category", "days", "priority", "alert", "agent"
    )?;
    for case in selected {
        writeln!(
            out,
            "{:<28} {:<12} {:>6} {:<9} {:<22} {:<16}",
            case.record().id,
            case.case.case_category.as_str(),
            case.case.days_since_activity,
            case.case.priority_bucket.as_str(),
            case.alert_label.as_str(),
            case.record().agent,
        )?;
    }
    Ok(())
}

fn print_filter_options(out: &mut impl Write, options: &FilterOptions) -> Result<()> {
    writeln!(out, "statuses:")?;
    for status in &options.statuses {
        writeln!(out, "  {status}")?;
    }
    writeln!(out, "agents:")?;
    for agent in &options.agents {
        writeln!(out, "  {agent}")?;
    }
    writeln!(out, "alerts:")?;
    for label in &options.alert_labels {
        writeln!(out, "  {label}")?;
    }
    Ok(())
}

fn print_case_detail(out: &mut impl Write, case: &AlertedCase) -> Result<()> {
    writeln!(out, "{}", report::case_label(case))?;
    let detail = report::case_detail(case);
    let width = detail.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
    for (name, value) in &detail {
        writeln!(out, "  {name:<width$}  {value}")?;
    }
    Ok(())
}
