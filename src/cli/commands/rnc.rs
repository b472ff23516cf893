//! `qms rnc` command - Non-conformance report management

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
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
use crate::entities::inspection::InspectionReport;
use crate::entities::rnc::{
    AffectedItems, Defect, Disposition, DispositionDecision, Rnc, RncCategory, RncOrigin,
    RncStatus, Severity,
};

#[derive(Subcommand, Debug)]
pub enum RncCommands {
    /// List RNCs with filtering
    List(ListArgs),

    /// Create a new RNC
    New(NewArgs),

    /// Show an RNC's details
    Show(ShowArgs),

    /// Edit an RNC in your editor
    Edit(EditArgs),

    /// Close an RNC (requires a disposition)
    Close(CloseArgs),
}

/// RNC status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Open,
    Analysis,
    Action,
    Closed,
    /// Everything except closed
    Active,
    All,
}

/// Severity filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SeverityFilter {
    Minor,
    Major,
    Critical,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Filter by severity
    #[arg(long, short = 'S', default_value = "all")]
    pub severity: SeverityFilter,

    /// Search in number, title and description
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// RNC title (required unless interactive)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Origin (internal, supplier, customer)
    #[arg(long, short = 'O', default_value = "internal")]
    pub origin: String,

    /// Severity level
    #[arg(long, short = 'S', default_value = "minor")]
    pub severity: String,

    /// Category
    #[arg(long, short = 'c', default_value = "dimensional")]
    pub category: String,

    /// Description of the problem
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Affected part or drawing number
    #[arg(long)]
    pub part: Option<String>,

    /// Affected lot / heat number
    #[arg(long)]
    pub lot: Option<String>,

    /// Quantity affected
    #[arg(long)]
    pub quantity: Option<u32>,

    /// Characteristic out of specification
    #[arg(long)]
    pub characteristic: Option<String>,

    /// Inspection report that found the problem (ID, number or short ID)
    #[arg(long)]
    pub inspection: Option<String>,

    /// Report date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,

    /// Interactive mode (prompt for fields)
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// RNC ID, number or short ID (RNC@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// RNC ID, number or short ID (RNC@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct CloseArgs {
    /// RNC ID, number or short ID (RNC@N)
    pub id: String,

    /// Disposition to record before closing
    #[arg(long, short = 'd')]
    pub disposition: Option<String>,

    /// Justification for the disposition
    #[arg(long, short = 'j')]
    pub justification: Option<String>,

    /// Closing date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// Run an RNC subcommand
pub fn run(cmd: RncCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        RncCommands::List(args) => run_list(args, global),
        RncCommands::New(args) => run_new(args, global),
        RncCommands::Show(args) => run_show(args, global),
        RncCommands::Edit(args) => run_edit(args, global),
        RncCommands::Close(args) => run_close(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 12),
    ColumnDef::new("title", "TITLE", 36),
    ColumnDef::new("origin", "ORIGIN", 10),
    ColumnDef::new("severity", "SEVERITY", 10),
    ColumnDef::new("category", "CATEGORY", 14),
    ColumnDef::new("status", "STATUS", 10),
    ColumnDef::new("date", "DATE", 12),
];

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut rncs: Vec<Rnc> = loader::load_records(&project)?;

    let search = args.search.as_ref().map(|s| s.to_lowercase());
    rncs.retain(|r| {
        let status_ok = match args.status {
            StatusFilter::Open => r.status == RncStatus::Open,
            StatusFilter::Analysis => r.status == RncStatus::Analysis,
            StatusFilter::Action => r.status == RncStatus::Action,
            StatusFilter::Closed => r.status == RncStatus::Closed,
            StatusFilter::Active => r.status != RncStatus::Closed,
            StatusFilter::All => true,
        };
        let severity_ok = match args.severity {
            SeverityFilter::Minor => r.severity == Severity::Minor,
            SeverityFilter::Major => r.severity == Severity::Major,
            SeverityFilter::Critical => r.severity == Severity::Critical,
            SeverityFilter::All => true,
        };
        let search_ok = search.as_ref().map_or(true, |q| {
            r.title.to_lowercase().contains(q)
                || r.description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(q))
                || r.number
                    .as_ref()
                    .is_some_and(|n| n.to_lowercase().contains(q))
        });
        status_ok && severity_ok && search_ok
    });

    rncs.sort_by(|a, b| a.number.cmp(&b.number).then(a.created.cmp(&b.created)));
    if let Some(limit) = args.limit {
        rncs.truncate(limit);
    }

    if args.count {
        println!("{}", rncs.len());
        return Ok(());
    }

    if print_structured(&rncs, global.format)? {
        return Ok(());
    }

    if rncs.is_empty() {
        if !global.quiet {
            println!("No RNCs found.");
        }
        return Ok(());
    }

    let short_ids = refresh_short_ids(&project, &rncs);
    let rows = rncs.iter().map(|r| {
        TableRow::new(r.id.to_string(), &short_ids)
            .cell("number", CellValue::Number(r.number.clone()))
            .cell("title", CellValue::Text(r.title.clone()))
            .cell("origin", CellValue::Text(r.origin.to_string()))
            .cell("severity", CellValue::Severity(r.severity))
            .cell("category", CellValue::Text(r.category.to_string()))
            .cell("status", CellValue::State(r.status.to_string()))
            .cell("date", CellValue::Date(r.report_date))
    });

    let mut formatter = TableFormatter::new(COLUMNS, "RNC", "RNC");
    if global.quiet {
        formatter = formatter.without_summary();
    }
    formatter.output(rows, global.format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);

    let (title, origin, severity, category) = if args.interactive || args.title.is_none() {
        use dialoguer::{Input, Select};

        let title: String = Input::new()
            .with_prompt("RNC title")
            .interact_text()
            .into_diagnostic()?;

        let origin_options = ["internal", "supplier", "customer"];
        let origin_idx = Select::new()
            .with_prompt("Origin")
            .items(&origin_options)
            .default(0)
            .interact()
            .into_diagnostic()?;

        let severity_options = ["minor", "major", "critical"];
        let severity_idx = Select::new()
            .with_prompt("Severity")
            .items(&severity_options)
            .default(0)
            .interact()
            .into_diagnostic()?;

        let category_idx = Select::new()
            .with_prompt("Category")
            .items(&RncCategory::NAMES)
            .default(0)
            .interact()
            .into_diagnostic()?;

        (
            title,
            origin_options[origin_idx].to_string(),
            severity_options[severity_idx].to_string(),
            RncCategory::NAMES[category_idx].to_string(),
        )
    } else {
        (
            args.title
                .clone()
                .ok_or_else(|| miette::miette!("Title is required (use --title or -t)"))?,
            args.origin.clone(),
            args.severity.clone(),
            args.category.clone(),
        )
    };

    let origin: RncOrigin = origin.parse().map_err(|e: String| miette::miette!("{}", e))?;
    let severity: Severity = severity.parse().map_err(|e: String| miette::miette!("{}", e))?;
    let category: RncCategory = category.parse().map_err(|e: String| miette::miette!("{}", e))?;

    let mut rnc = Rnc::new(title, origin, severity, config.author());
    rnc.category = category;
    rnc.description = args.description;
    rnc.report_date = Some(args.date.unwrap_or_else(today));

    if args.part.is_some() || args.lot.is_some() || args.quantity.is_some() {
        rnc.affected_items = Some(AffectedItems {
            part_number: args.part,
            lot_number: args.lot,
            quantity_affected: args.quantity,
        });
    }
    if args.characteristic.is_some() {
        rnc.defect = Some(Defect {
            characteristic: args.characteristic,
            ..Defect::default()
        });
    }
    if let Some(reference) = args.inspection {
        let (_, report): (_, InspectionReport) = loader::resolve(&project, &reference)?;
        rnc.links.inspection = Some(report.id);
    }

    rnc.number = Some(allocate_number(&project, &config, SequenceFamily::Rnc)?);
    let path = save_new(&project, &rnc, global)?;

    if !global.quiet && global.format != OutputFormat::Id {
        println!(
            "   {} | {} | {}",
            style(rnc.origin).yellow(),
            style(rnc.severity).white(),
            style(&rnc.title).white()
        );
    }

    if args.edit {
        open_in_editor(&config, &path)?;
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, rnc): (_, Rnc) = loader::resolve(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rnc).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", std::fs::read_to_string(&path).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", rnc.id),
        _ => print_summary(&rnc),
    }
    Ok(())
}

fn print_summary(rnc: &Rnc) {
    println!(
        "{} {}",
        style(rnc.display_ref()).cyan().bold(),
        style(&rnc.title).bold()
    );
    println!("{}", "-".repeat(60));
    print_field("ID", Some(&rnc.id));
    print_field("Status", Some(rnc.status));
    print_field("Origin", Some(rnc.origin));
    print_field("Severity", Some(rnc.severity));
    print_field("Category", Some(rnc.category));
    print_field("Report date", rnc.report_date);
    print_field("Description", rnc.description.as_ref());
    if let Some(items) = &rnc.affected_items {
        print_field("Part", items.part_number.as_ref());
        print_field("Lot", items.lot_number.as_ref());
        print_field("Quantity", items.quantity_affected);
    }
    if let Some(defect) = &rnc.defect {
        print_field("Characteristic", defect.characteristic.as_ref());
        print_field("Specification", defect.specification.as_ref());
        print_field("Actual", defect.actual.as_ref());
    }
    for (i, action) in rnc.containment.iter().enumerate() {
        let mark = if action.done { style("✓").green() } else { style("○").dim() };
        println!("{:<16} {} {}", if i == 0 { "Containment:" } else { "" }, mark, action.action);
    }
    if let Some(disposition) = &rnc.disposition {
        print_field("Disposition", Some(disposition.decision));
        print_field("Justification", disposition.justification.as_ref());
    }
    print_field("Inspection", rnc.links.inspection.as_ref());
    print_field("Action plan", rnc.links.action_plan.as_ref());
    print_field("Closed", rnc.closed_date);
    print_field("Closed by", rnc.closed_by.as_ref());
    print_field("Author", Some(&rnc.author));
    print_field("Revision", Some(rnc.revision));
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, _): (_, Rnc) = loader::resolve(&project, &args.id)?;
    open_in_editor(&config, &path)
}

fn run_close(args: CloseArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, mut rnc): (_, Rnc) = loader::resolve(&project, &args.id)?;
    let date = args.date.unwrap_or_else(today);

    if let Some(decision) = args.disposition {
        let decision: DispositionDecision =
            decision.parse().map_err(|e: String| miette::miette!("{}", e))?;
        rnc.disposition = Some(Disposition {
            decision,
            decision_date: Some(date),
            decision_by: Some(config.author()),
            justification: args.justification,
        });
    }

    rnc.close(config.author(), date)
        .map_err(|e| miette::miette!("{}", e))?;
    save_updated(&path, &rnc, "Closed", global)
}
