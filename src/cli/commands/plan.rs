//! `qms plan` command - Corrective-action plans

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

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
use crate::entities::action_plan::{ActionPlan, PlanStatus};
use crate::entities::rnc::{Rnc, RncStatus};

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// List action plans
    List(ListArgs),

    /// Create a new action plan
    New(NewArgs),

    /// Show a plan with its actions
    Show(ShowArgs),

    /// Edit a plan in your editor
    Edit(EditArgs),

    /// Add an action to a plan
    Action(ActionArgs),

    /// Mark an action as done
    Done(DoneArgs),

    /// Verify the effectiveness of a completed plan
    Verify(VerifyArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Open,
    InProgress,
    Completed,
    Verified,
    /// Open or in progress
    Active,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Only plans with overdue actions
    #[arg(long)]
    pub overdue: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Plan title
    #[arg(long, short = 't')]
    pub title: String,

    /// RNC that triggered the plan (ID, number or short ID); it is linked back
    #[arg(long)]
    pub rnc: Option<String>,

    /// Root cause found in the analysis
    #[arg(long, short = 'c')]
    pub root_cause: Option<String>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Plan ID, number or short ID (PLAN@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Plan ID, number or short ID (PLAN@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ActionArgs {
    /// Plan ID, number or short ID (PLAN@N)
    pub id: String,

    /// What has to be done
    #[arg(long, short = 'w')]
    pub what: String,

    /// Who is responsible
    #[arg(long)]
    pub who: Option<String>,

    /// Due date
    #[arg(long, short = 'd', value_parser = parse_date)]
    pub due: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct DoneArgs {
    /// Plan ID, number or short ID (PLAN@N)
    pub id: String,

    /// Action number within the plan
    pub action: u32,

    /// Evidence of completion
    #[arg(long)]
    pub evidence: Option<String>,

    /// Completion date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Plan ID, number or short ID (PLAN@N)
    pub id: String,

    /// Verification date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// Run an action plan subcommand
pub fn run(cmd: PlanCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PlanCommands::List(args) => run_list(args, global),
        PlanCommands::New(args) => run_new(args, global),
        PlanCommands::Show(args) => run_show(args, global),
        PlanCommands::Edit(args) => run_edit(args, global),
        PlanCommands::Action(args) => run_action(args, global),
        PlanCommands::Done(args) => run_done(args, global),
        PlanCommands::Verify(args) => run_verify(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 10),
    ColumnDef::new("title", "TITLE", 36),
    ColumnDef::new("rnc", "RNC", 12),
    ColumnDef::new("actions", "ACTIONS", 8),
    ColumnDef::new("progress", "DONE %", 7),
    ColumnDef::new("overdue", "LATE", 5),
    ColumnDef::new("status", "STATUS", 12),
];

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let now = today();
    let mut plans: Vec<ActionPlan> = loader::load_records(&project)?;

    plans.retain(|p| {
        let status_ok = match args.status {
            StatusFilter::Open => p.status == PlanStatus::Open,
            StatusFilter::InProgress => p.status == PlanStatus::InProgress,
            StatusFilter::Completed => p.status == PlanStatus::Completed,
            StatusFilter::Verified => p.status == PlanStatus::Verified,
            StatusFilter::Active => matches!(p.status, PlanStatus::Open | PlanStatus::InProgress),
            StatusFilter::All => true,
        };
        status_ok && (!args.overdue || !p.overdue(now).is_empty())
    });
    plans.sort_by(|a, b| a.number.cmp(&b.number).then(a.created.cmp(&b.created)));

    if args.count {
        println!("{}", plans.len());
        return Ok(());
    }

    if print_structured(&plans, global.format)? {
        return Ok(());
    }

    if plans.is_empty() {
        if !global.quiet {
            println!("No action plans found.");
        }
        return Ok(());
    }

    let short_ids = refresh_short_ids(&project, &plans);
    let rows = plans.iter().map(|p| {
        TableRow::new(p.id.to_string(), &short_ids)
            .cell("number", CellValue::Number(p.number.clone()))
            .cell("title", CellValue::Text(p.title.clone()))
            .cell("rnc", p.origin_rnc.clone().map_or(CellValue::Empty, CellValue::Text))
            .cell("actions", CellValue::Count(p.actions.len() as i64))
            .cell("progress", CellValue::Float(p.progress() * 100.0, 0))
            .cell("overdue", CellValue::Count(p.overdue(now).len() as i64))
            .cell("status", CellValue::State(p.status.to_string()))
    });

    let mut formatter = TableFormatter::new(COLUMNS, "action plan", "PLAN");
    if global.quiet {
        formatter = formatter.without_summary();
    }
    formatter.output(rows, global.format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);

    let mut plan = ActionPlan::new(args.title, config.author());
    plan.root_cause = args.root_cause;

    let origin = match &args.rnc {
        Some(reference) => {
            let (rnc_path, rnc): (_, Rnc) = loader::resolve(&project, reference)?;
            plan.origin_rnc = Some(rnc.display_ref());
            Some((rnc_path, rnc))
        }
        None => None,
    };

    plan.number = Some(allocate_number(&project, &config, SequenceFamily::ActionPlan)?);
    let path = save_new(&project, &plan, global)?;

    if let Some((rnc_path, mut rnc)) = origin {
        rnc.links.action_plan = Some(plan.id.clone());
        if matches!(rnc.status, RncStatus::Open | RncStatus::Analysis) {
            rnc.status = RncStatus::Action;
        }
        rnc.revision += 1;
        save_updated(&rnc_path, &rnc, "Linked plan to", global)?;
    }

    if args.edit {
        open_in_editor(&config, &path)?;
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, plan): (_, ActionPlan) = loader::resolve(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", std::fs::read_to_string(&path).into_diagnostic()?),
        OutputFormat::Id => println!("{}", plan.id),
        _ => {
            let now = today();
            println!(
                "{} {}",
                style(plan.display_ref()).cyan().bold(),
                style(&plan.title).bold()
            );
            println!("{}", "-".repeat(60));
            print_field("ID", Some(&plan.id));
            print_field("Status", Some(plan.status));
            print_field("Origin RNC", plan.origin_rnc.as_ref());
            print_field("Root cause", plan.root_cause.as_ref());
            print_field("Progress", Some(format!("{:.0}%", plan.progress() * 100.0)));
            print_field("Verified by", plan.verified_by.as_ref());

            if !plan.actions.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["#", "What", "Who", "Due", "Status"]);
                for a in &plan.actions {
                    let status = if a.is_overdue(now) {
                        format!("{} (late)", a.status)
                    } else {
                        a.status.to_string()
                    };
                    builder.push_record([
                        a.action_number.to_string(),
                        a.what.clone(),
                        a.who.clone().unwrap_or_else(|| "-".to_string()),
                        a.due.map_or_else(|| "-".to_string(), |d| d.to_string()),
                        status,
                    ]);
                }
                println!();
                println!("{}", builder.build().with(Style::rounded()));
            }
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, _): (_, ActionPlan) = loader::resolve(&project, &args.id)?;
    open_in_editor(&config, &path)
}

fn run_action(args: ActionArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, mut plan): (_, ActionPlan) = loader::resolve(&project, &args.id)?;

    if plan.status == PlanStatus::Verified {
        return Err(miette::miette!(
            "{} is verified; open a new plan instead",
            plan.display_ref()
        ));
    }

    let n = plan.add_action(args.what, args.who, args.due);
    plan.revision += 1;
    save_updated(&path, &plan, &format!("Added action {} to", n), global)
}

fn run_done(args: DoneArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, mut plan): (_, ActionPlan) = loader::resolve(&project, &args.id)?;

    plan.complete_action(args.action, args.date.unwrap_or_else(today), args.evidence)
        .map_err(|e| miette::miette!("{}", e))?;
    save_updated(&path, &plan, &format!("Completed action {} of", args.action), global)?;

    if !global.quiet && plan.status == PlanStatus::Completed {
        println!(
            "   all actions done; plan is {}",
            style(plan.status).green().bold()
        );
    }
    Ok(())
}

fn run_verify(args: VerifyArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, mut plan): (_, ActionPlan) = loader::resolve(&project, &args.id)?;

    plan.verify(config.author(), args.date.unwrap_or_else(today))
        .map_err(|e| miette::miette!("{}", e))?;
    save_updated(&path, &plan, "Verified", global)
}
