//! `qms cal` command - Equipment calibration records

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{
    allocate_number, open_in_editor, open_project, parse_date, print_field, print_structured,
    refresh_short_ids, save_new, save_updated, today,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::loader;
use crate::core::numbering::SequenceFamily;
use crate::core::Config;
use crate::entities::calibration::{Calibration, CalibrationState};

#[derive(Subcommand, Debug)]
pub enum CalCommands {
    /// List calibrated equipment
    List(ListArgs),

    /// Register a new instrument
    New(NewArgs),

    /// Show an instrument's calibration details
    Show(ShowArgs),

    /// Edit a calibration record in your editor
    Edit(EditArgs),

    /// Record a new calibration and restart the cycle
    Record(RecordArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only instruments that are due soon or overdue
    #[arg(long)]
    pub due: bool,

    /// Reference date for due calculations (default: today)
    #[arg(long, value_parser = parse_date)]
    pub on: Option<NaiveDate>,

    /// Search in tag, description and location
    #[arg(long)]
    pub search: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Equipment tag stamped on the instrument
    #[arg(long, short = 'T')]
    pub tag: String,

    /// Instrument description
    #[arg(long, short = 't')]
    pub title: String,

    /// Date of the last calibration
    #[arg(long, short = 'l', value_parser = parse_date)]
    pub last: NaiveDate,

    /// Calibration interval in months
    #[arg(long, short = 'm', default_value = "12", value_parser = clap::value_parser!(u32).range(1..=120))]
    pub interval: u32,

    /// Where the instrument is kept
    #[arg(long)]
    pub location: Option<String>,

    /// Calibration laboratory
    #[arg(long)]
    pub laboratory: Option<String>,

    /// Certificate of the last calibration
    #[arg(long)]
    pub certificate: Option<String>,

    /// Serial number
    #[arg(long)]
    pub serial: Option<String>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Calibration ID, number or short ID (CAL@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Calibration ID, number or short ID (CAL@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct RecordArgs {
    /// Calibration ID, number or short ID (CAL@N)
    pub id: String,

    /// Calibration date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Certificate number
    #[arg(long, short = 'c')]
    pub certificate: Option<String>,

    /// Laboratory (keeps the current one if omitted)
    #[arg(long)]
    pub laboratory: Option<String>,

    /// The instrument failed calibration; take it out of service
    #[arg(long)]
    pub failed: bool,
}

/// Run a calibration subcommand
pub fn run(cmd: CalCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CalCommands::List(args) => run_list(args, global),
        CalCommands::New(args) => run_new(args, global),
        CalCommands::Show(args) => run_show(args, global),
        CalCommands::Edit(args) => run_edit(args, global),
        CalCommands::Record(args) => run_record(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 12),
    ColumnDef::new("tag", "TAG", 12),
    ColumnDef::new("title", "DESCRIPTION", 34),
    ColumnDef::new("last", "LAST", 12),
    ColumnDef::new("due", "DUE", 12),
    ColumnDef::new("days", "DAYS", 6),
    ColumnDef::new("state", "STATE", 16),
];

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let on = args.on.unwrap_or_else(today);
    let warning_days = config.calibration_warning_days();

    let mut cals: Vec<Calibration> = loader::load_records(&project)?;

    let search = args.search.as_ref().map(|s| s.to_lowercase());
    cals.retain(|c| {
        let due_ok = !args.due
            || matches!(
                c.state_on(on, warning_days),
                CalibrationState::DueSoon | CalibrationState::Overdue
            );
        let search_ok = search.as_ref().map_or(true, |q| {
            c.equipment_tag.to_lowercase().contains(q)
                || c.title.to_lowercase().contains(q)
                || c.location.as_ref().is_some_and(|l| l.to_lowercase().contains(q))
        });
        due_ok && search_ok
    });

    // Most urgent first
    cals.sort_by_key(|c| c.next_due());

    if args.count {
        println!("{}", cals.len());
        return Ok(());
    }

    if print_structured(&cals, global.format)? {
        return Ok(());
    }

    if cals.is_empty() {
        if !global.quiet {
            println!("No calibrations found.");
        }
        return Ok(());
    }

    let short_ids = refresh_short_ids(&project, &cals);
    let rows = cals.iter().map(|c| {
        TableRow::new(c.id.to_string(), &short_ids)
            .cell("number", CellValue::Number(c.number.clone()))
            .cell("tag", CellValue::Text(c.equipment_tag.clone()))
            .cell("title", CellValue::Text(c.title.clone()))
            .cell("last", CellValue::Date(Some(c.last_calibration)))
            .cell("due", CellValue::Date(c.next_due()))
            .cell(
                "days",
                c.days_remaining(on).map_or(CellValue::Empty, CellValue::Count),
            )
            .cell("state", CellValue::State(c.state_on(on, warning_days).to_string()))
    });

    let mut formatter = TableFormatter::new(COLUMNS, "calibration", "CAL");
    if global.quiet {
        formatter = formatter.without_summary();
    }
    formatter.output(rows, global.format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);

    let mut cal = Calibration::new(args.tag, args.title, args.last, args.interval, config.author());
    cal.location = args.location;
    cal.laboratory = args.laboratory;
    cal.certificate = args.certificate;
    cal.serial_number = args.serial;
    cal.number = Some(allocate_number(&project, &config, SequenceFamily::Calibration)?);

    let path = save_new(&project, &cal, global)?;
    if !global.quiet && global.format != OutputFormat::Id {
        if let Some(due) = cal.next_due() {
            println!("   next calibration due {}", style(due).yellow());
        }
    }

    if args.edit {
        open_in_editor(&config, &path)?;
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, cal): (_, Calibration) = loader::resolve(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cal).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", std::fs::read_to_string(&path).into_diagnostic()?),
        OutputFormat::Id => println!("{}", cal.id),
        _ => {
            let now = today();
            println!(
                "{} {} {}",
                style(cal.display_ref()).cyan().bold(),
                style(&cal.equipment_tag).yellow(),
                style(&cal.title).bold()
            );
            println!("{}", "-".repeat(60));
            print_field("ID", Some(&cal.id));
            print_field("State", Some(cal.state_on(now, config.calibration_warning_days())));
            print_field("Location", cal.location.as_ref());
            print_field("Serial", cal.serial_number.as_ref());
            print_field("Laboratory", cal.laboratory.as_ref());
            print_field("Certificate", cal.certificate.as_ref());
            print_field("Last", Some(cal.last_calibration));
            print_field("Interval", Some(format!("{} months", cal.interval_months)));
            print_field("Next due", cal.next_due());
            print_field("Days left", cal.days_remaining(now));
            if !cal.history.is_empty() {
                println!();
                println!("{}", style("History").bold());
                for event in cal.history.iter().rev() {
                    println!(
                        "  {}  {:<16} {}",
                        event.date,
                        event.certificate.as_deref().unwrap_or("-"),
                        if event.approved { style("approved").green() } else { style("failed").red() }
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, _): (_, Calibration) = loader::resolve(&project, &args.id)?;
    open_in_editor(&config, &path)
}

fn run_record(args: RecordArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, mut cal): (_, Calibration) = loader::resolve(&project, &args.id)?;

    cal.record(
        args.date.unwrap_or_else(today),
        args.certificate,
        args.laboratory,
        !args.failed,
    )
    .map_err(|e| miette::miette!("{}", e))?;

    save_updated(&path, &cal, "Recorded calibration for", global)?;
    if !global.quiet {
        match cal.next_due() {
            Some(due) if !args.failed => println!("   next calibration due {}", style(due).yellow()),
            _ => println!("   {}", style("instrument taken out of service").red()),
        }
    }
    Ok(())
}
