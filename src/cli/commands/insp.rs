//! `qms insp` command - Inspection reports and measurements

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use csv::StringRecord;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    allocate_number, open_in_editor, open_project, parse_date, parse_finite, print_field,
    print_structured, refresh_short_ids, save_new, save_updated, today,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::loader;
use crate::core::tolerance::Verdict;
use crate::core::Config;
use crate::entities::inspection::{InspectionDiscipline, InspectionReport, Measurement};

#[derive(Subcommand, Debug)]
pub enum InspCommands {
    /// List inspection reports
    List(ListArgs),

    /// Create a new inspection report
    New(NewArgs),

    /// Show a report with its measurements
    Show(ShowArgs),

    /// Edit a report in your editor (results are re-evaluated afterwards)
    Edit(EditArgs),

    /// Add measurements to a report
    Measure(MeasureArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by discipline
    #[arg(long, short = 'D')]
    pub discipline: Option<InspectionDiscipline>,

    /// Only reports with a Não Conforme result
    #[arg(long)]
    pub nonconforming: bool,

    /// Search in number, title, part and customer
    #[arg(long)]
    pub search: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Inspection discipline
    #[arg(long, short = 'D')]
    pub discipline: InspectionDiscipline,

    /// Report title
    #[arg(long, short = 't')]
    pub title: String,

    /// Part or item number
    #[arg(long)]
    pub part: Option<String>,

    /// Drawing number and revision
    #[arg(long)]
    pub drawing: Option<String>,

    #[arg(long)]
    pub customer: Option<String>,

    /// Sales order or work order reference
    #[arg(long)]
    pub order: Option<String>,

    /// Inspector name (default: configured author)
    #[arg(long)]
    pub inspector: Option<String>,

    /// Inspection date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Discipline detail as KEY=VALUE (e.g. heat_number=H4471), repeatable
    #[arg(long = "detail", value_parser = parse_detail)]
    pub details: Vec<(String, String)>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Report ID, number or short ID (INSP@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Report ID, number or short ID (INSP@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct MeasureArgs {
    /// Report ID, number or short ID (INSP@N)
    pub id: String,

    /// Characteristic measured
    #[arg(long, short = 'c', required_unless_present = "csv")]
    pub characteristic: Option<String>,

    /// Nominal value
    #[arg(long, short = 'n', allow_hyphen_values = true, value_parser = parse_finite, required_unless_present = "csv")]
    pub nominal: Option<f64>,

    /// Tolerance token: +0.1, -0.05 or 0.2 (at most two)
    #[arg(long = "tol", short = 't', allow_hyphen_values = true)]
    pub tolerances: Vec<String>,

    /// Measured value
    #[arg(long, short = 'm', allow_hyphen_values = true, value_parser = parse_finite, required_unless_present = "csv")]
    pub measured: Option<f64>,

    /// Unit (mm, µm, HRC, ...)
    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    /// Import measurements from a CSV file
    /// (columns: characteristic,nominal,tolerance_a,tolerance_b,measured,unit)
    #[arg(long, conflicts_with_all = ["characteristic", "nominal", "measured"])]
    pub csv: Option<PathBuf>,
}

fn parse_detail(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("Invalid detail '{}'. Use KEY=VALUE", s))
}

/// Run an inspection subcommand
pub fn run(cmd: InspCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        InspCommands::List(args) => run_list(args, global),
        InspCommands::New(args) => run_new(args, global),
        InspCommands::Show(args) => run_show(args, global),
        InspCommands::Edit(args) => run_edit(args, global),
        InspCommands::Measure(args) => run_measure(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 12),
    ColumnDef::new("discipline", "DISCIPLINE", 18),
    ColumnDef::new("title", "TITLE", 30),
    ColumnDef::new("part", "PART", 14),
    ColumnDef::new("date", "DATE", 12),
    ColumnDef::new("measurements", "MEAS", 6),
    ColumnDef::new("result", "RESULT", 14),
];

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut reports: Vec<InspectionReport> = loader::load_records(&project)?;

    let search = args.search.as_ref().map(|s| s.to_lowercase());
    reports.retain(|r| {
        let discipline_ok = args.discipline.map_or(true, |d| r.discipline == d);
        let nc_ok = !args.nonconforming || r.verdict() == Some(Verdict::NaoConforme);
        let search_ok = search.as_ref().map_or(true, |q| {
            r.title.to_lowercase().contains(q)
                || r.number.as_ref().is_some_and(|n| n.to_lowercase().contains(q))
                || r.part_number.as_ref().is_some_and(|p| p.to_lowercase().contains(q))
                || r.customer.as_ref().is_some_and(|c| c.to_lowercase().contains(q))
        });
        discipline_ok && nc_ok && search_ok
    });

    reports.sort_by(|a, b| {
        a.inspection_date
            .cmp(&b.inspection_date)
            .then(a.number.cmp(&b.number))
    });

    if args.count {
        println!("{}", reports.len());
        return Ok(());
    }

    if print_structured(&reports, global.format)? {
        return Ok(());
    }

    if reports.is_empty() {
        if !global.quiet {
            println!("No inspection reports found.");
        }
        return Ok(());
    }

    let short_ids = refresh_short_ids(&project, &reports);
    let rows = reports.iter().map(|r| {
        TableRow::new(r.id.to_string(), &short_ids)
            .cell("number", CellValue::Number(r.number.clone()))
            .cell("discipline", CellValue::Text(r.discipline.to_string()))
            .cell("title", CellValue::Text(r.title.clone()))
            .cell(
                "part",
                r.part_number.clone().map_or(CellValue::Empty, CellValue::Text),
            )
            .cell("date", CellValue::Date(Some(r.inspection_date)))
            .cell("measurements", CellValue::Count(r.measurements.len() as i64))
            .cell("result", CellValue::Verdict(r.verdict()))
    });

    let mut formatter = TableFormatter::new(COLUMNS, "inspection report", "INSP");
    if global.quiet {
        formatter = formatter.without_summary();
    }
    formatter.output(rows, global.format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);

    let mut report = InspectionReport::new(
        args.discipline,
        args.title,
        args.date.unwrap_or_else(today),
        config.author(),
    );
    report.part_number = args.part;
    report.drawing = args.drawing;
    report.customer = args.customer;
    report.order_ref = args.order;
    report.inspector = Some(args.inspector.unwrap_or_else(|| config.author()));
    report.details.extend(args.details);

    report.number = Some(allocate_number(&project, &config, report.family())?);
    let path = save_new(&project, &report, global)?;

    if !global.quiet && global.format != OutputFormat::Id {
        let missing: Vec<&str> = report
            .discipline
            .suggested_details()
            .iter()
            .copied()
            .filter(|k| !report.details.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            println!(
                "   {} {}",
                style("usual details not filled:").dim(),
                style(missing.join(", ")).yellow()
            );
        }
    }

    if args.edit {
        open_in_editor(&config, &path)?;
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, report): (_, InspectionReport) = loader::resolve(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", std::fs::read_to_string(&path).into_diagnostic()?),
        OutputFormat::Id => println!("{}", report.id),
        _ => print_summary(&report),
    }
    Ok(())
}

fn print_summary(report: &InspectionReport) {
    println!(
        "{} {}",
        style(report.display_ref()).cyan().bold(),
        style(&report.title).bold()
    );
    println!("{}", "-".repeat(60));
    print_field("ID", Some(&report.id));
    print_field("Discipline", Some(report.discipline));
    print_field("Date", Some(report.inspection_date));
    print_field("Part", report.part_number.as_ref());
    print_field("Drawing", report.drawing.as_ref());
    print_field("Customer", report.customer.as_ref());
    print_field("Order", report.order_ref.as_ref());
    print_field("Inspector", report.inspector.as_ref());
    for (key, value) in &report.details {
        print_field(key, Some(value));
    }

    if report.measurements.is_empty() {
        println!();
        println!("{}", style("No measurements yet.").dim());
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(["#", "Characteristic", "Nominal", "Tolerance", "Range", "Measured", "Unit", "Result"]);
    for (i, m) in report.measurements.iter().enumerate() {
        let tolerance = [m.tolerance_a.as_deref(), m.tolerance_b.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" / ");
        builder.push_record([
            (i + 1).to_string(),
            m.characteristic.clone(),
            m.nominal.to_string(),
            if tolerance.is_empty() { "-".to_string() } else { tolerance },
            m.range().to_string(),
            m.measured.to_string(),
            m.unit.clone().unwrap_or_default(),
            m.result.to_string(),
        ]);
    }
    println!();
    println!("{}", builder.build().with(Style::rounded()));

    if let Some(verdict) = report.verdict() {
        let styled = if verdict.is_conforming() {
            style(verdict.to_string()).green().bold()
        } else {
            style(verdict.to_string()).red().bold()
        };
        println!(
            "Result: {} ({} of {} out of tolerance)",
            styled,
            report.nonconforming().len(),
            report.measurements.len()
        );
    }
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, _): (_, InspectionReport) = loader::resolve(&project, &args.id)?;
    open_in_editor(&config, &path)?;

    // Hand edits may have changed values or tolerances
    let content = std::fs::read_to_string(&path).into_diagnostic()?;
    let mut report: InspectionReport = serde_yml::from_str(&content)
        .map_err(|e| miette::miette!("{} is no longer valid YAML: {}", path.display(), e))?;
    let changed = report.reevaluate();
    if changed > 0 {
        report.revision += 1;
        save_updated(&path, &report, &format!("Re-evaluated {} result(s) in", changed), global)?;
    }
    Ok(())
}

fn run_measure(args: MeasureArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, mut report): (_, InspectionReport) = loader::resolve(&project, &args.id)?;

    let measurements = match &args.csv {
        Some(csv_path) => read_measurements_csv(csv_path)?,
        None => vec![measurement_from_args(&args)?],
    };

    let count = measurements.len();
    for m in measurements {
        let verdict = report.add_measurement(m);
        if !global.quiet {
            if let Some(last) = report.measurements.last() {
                let styled = if verdict.is_conforming() {
                    style(verdict.to_string()).green()
                } else {
                    style(verdict.to_string()).red().bold()
                };
                println!(
                    "   {:<24} {:>10} in {:<22} {}",
                    last.characteristic,
                    last.measured,
                    last.range().to_string(),
                    styled
                );
            }
        }
    }
    report.revision += 1;

    save_updated(
        &path,
        &report,
        &format!("Added {} measurement(s) to", count),
        global,
    )
}

fn measurement_from_args(args: &MeasureArgs) -> Result<Measurement> {
    if args.tolerances.len() > 2 {
        return Err(miette::miette!(
            "At most two tolerance tokens are allowed, got {}",
            args.tolerances.len()
        ));
    }
    let characteristic = args
        .characteristic
        .clone()
        .ok_or_else(|| miette::miette!("--characteristic is required"))?;
    let nominal = args
        .nominal
        .ok_or_else(|| miette::miette!("--nominal is required"))?;
    let measured = args
        .measured
        .ok_or_else(|| miette::miette!("--measured is required"))?;

    let mut m = Measurement::new(
        characteristic,
        nominal,
        args.tolerances.first().cloned(),
        args.tolerances.get(1).cloned(),
        measured,
    );
    m.unit = args.unit.clone();
    Ok(m)
}

/// Build a map from header name to column index
fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase().trim().to_string(), i))
        .collect()
}

fn get_field(record: &StringRecord, header_map: &HashMap<String, usize>, field: &str) -> Option<String> {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_measurements_csv(path: &Path) -> Result<Vec<Measurement>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .into_diagnostic()?;
    let header_map = build_header_map(reader.headers().into_diagnostic()?);

    for required in ["characteristic", "nominal", "measured"] {
        if !header_map.contains_key(required) {
            return Err(miette::miette!(
                "{} has no '{}' column",
                path.display(),
                required
            ));
        }
    }

    let mut measurements = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.into_diagnostic()?;
        // Header is line 1
        let line = i + 2;
        let number = |field: &str| -> Result<f64> {
            let raw = get_field(&record, &header_map, field)
                .ok_or_else(|| miette::miette!("line {}: missing {}", line, field))?;
            parse_finite(&raw).map_err(|e| miette::miette!("line {}: {}", line, e))
        };

        let characteristic = get_field(&record, &header_map, "characteristic")
            .ok_or_else(|| miette::miette!("line {}: missing characteristic", line))?;
        let mut m = Measurement::new(
            characteristic,
            number("nominal")?,
            get_field(&record, &header_map, "tolerance_a"),
            get_field(&record, &header_map, "tolerance_b"),
            number("measured")?,
        );
        m.unit = get_field(&record, &header_map, "unit");
        measurements.push(m);
    }

    tracing::info!(count = measurements.len(), file = %path.display(), "Read measurements");
    Ok(measurements)
}
