//! `qms lesson` command - Lessons learned

use chrono::{Datelike, NaiveDate};
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{
    open_in_editor, open_project, parse_date, print_field, print_structured,
    refresh_short_ids, save_new, today,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::loader;
use crate::core::numbering::{next_number, SequenceFamily};
use crate::core::Config;
use crate::entities::lesson::Lesson;

#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    /// List lessons learned
    List(ListArgs),

    /// Record a new lesson
    New(NewArgs),

    /// Show a lesson
    Show(ShowArgs),

    /// Edit a lesson in your editor
    Edit(EditArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only lessons from this year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Search in title, lesson text and tags
    #[arg(long)]
    pub search: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Lesson title
    #[arg(long, short = 't')]
    pub title: String,

    /// Where it happened (project, product, process)
    #[arg(long)]
    pub context: Option<String>,

    /// What happened
    #[arg(long, short = 'w')]
    pub what: Option<String>,

    /// The lesson itself
    #[arg(long, short = 'l')]
    pub lesson: Option<String>,

    /// What to do next time
    #[arg(long, short = 'r')]
    pub recommendation: Option<String>,

    /// Source record (e.g. RNC-0042)
    #[arg(long, short = 's')]
    pub source: Option<String>,

    /// Date of the lesson; also picks the numbering year (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Tag, repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Lesson ID, number or short ID (LSN@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Lesson ID, number or short ID (LSN@N)
    pub id: String,
}

/// Run a lesson subcommand
pub fn run(cmd: LessonCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        LessonCommands::List(args) => run_list(args, global),
        LessonCommands::New(args) => run_new(args, global),
        LessonCommands::Show(args) => run_show(args, global),
        LessonCommands::Edit(args) => run_edit(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 14),
    ColumnDef::new("title", "TITLE", 40),
    ColumnDef::new("source", "SOURCE", 12),
    ColumnDef::new("date", "DATE", 12),
    ColumnDef::new("status", "STATUS", 10),
];

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let mut lessons: Vec<Lesson> = loader::load_records(&project)?;

    lessons.retain(|l| {
        args.year.map_or(true, |y| l.date.year() == y)
            && args.search.as_ref().map_or(true, |q| l.matches(q))
    });
    lessons.sort_by(|a, b| a.number.cmp(&b.number).then(a.date.cmp(&b.date)));

    if args.count {
        println!("{}", lessons.len());
        return Ok(());
    }

    if print_structured(&lessons, global.format)? {
        return Ok(());
    }

    if lessons.is_empty() {
        if !global.quiet {
            println!("No lessons found.");
        }
        return Ok(());
    }

    let short_ids = refresh_short_ids(&project, &lessons);
    let rows = lessons.iter().map(|l| {
        TableRow::new(l.id.to_string(), &short_ids)
            .cell("number", CellValue::Number(l.number.clone()))
            .cell("title", CellValue::Text(l.title.clone()))
            .cell("source", l.source.clone().map_or(CellValue::Empty, CellValue::Text))
            .cell("date", CellValue::Date(Some(l.date)))
            .cell("status", CellValue::State(l.status.to_string()))
    });

    let mut formatter = TableFormatter::new(COLUMNS, "lesson", "LSN");
    if global.quiet {
        formatter = formatter.without_summary();
    }
    formatter.output(rows, global.format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let date = args.date.unwrap_or_else(today);

    let mut lesson = Lesson::new(args.title, date, config.author());
    lesson.context = args.context;
    lesson.what_happened = args.what;
    lesson.lesson = args.lesson;
    lesson.recommendation = args.recommendation;
    lesson.source = args.source;
    lesson.tags = args.tags;

    // Backdated lessons are numbered in their own year
    lesson.number = Some(
        next_number(&project, SequenceFamily::Lesson, &config, date)
            .map_err(|e| miette::miette!("{}", e))?,
    );

    let path = save_new(&project, &lesson, global)?;
    if args.edit {
        open_in_editor(&config, &path)?;
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, lesson): (_, Lesson) = loader::resolve(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&lesson).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", std::fs::read_to_string(&path).into_diagnostic()?),
        OutputFormat::Id => println!("{}", lesson.id),
        _ => {
            println!(
                "{} {}",
                style(lesson.display_ref()).cyan().bold(),
                style(&lesson.title).bold()
            );
            println!("{}", "-".repeat(60));
            print_field("ID", Some(&lesson.id));
            print_field("Date", Some(lesson.date));
            print_field("Status", Some(lesson.status));
            print_field("Source", lesson.source.as_ref());
            print_field("Context", lesson.context.as_ref());
            print_field("What happened", lesson.what_happened.as_ref());
            print_field("Lesson", lesson.lesson.as_ref());
            print_field("Recommendation", lesson.recommendation.as_ref());
            if !lesson.tags.is_empty() {
                print_field("Tags", Some(lesson.tags.join(", ")));
            }
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, _): (_, Lesson) = loader::resolve(&project, &args.id)?;
    open_in_editor(&config, &path)
}
