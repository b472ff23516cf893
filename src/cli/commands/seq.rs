//! `qms seq` command - Preview record numbering

use chrono::{Datelike, NaiveDate};
use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{open_project, today};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::numbering::{next_number, SequenceFamily};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum SeqCommands {
    /// Show the number the next record of a family would get (nothing is written)
    Next(NextArgs),

    /// List every family with its format and next number
    List,
}

#[derive(clap::Args, Debug)]
pub struct NextArgs {
    /// Sequence family
    pub family: SequenceFamily,

    /// Year for year-scoped families (default: current year)
    #[arg(long, short = 'y')]
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
struct FamilyRow {
    family: &'static str,
    format: String,
    next: String,
}

/// Run a sequence subcommand
pub fn run(cmd: SeqCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SeqCommands::Next(args) => run_next(args, global),
        SeqCommands::List => run_list(global),
    }
}

fn reference_date(year: Option<i32>) -> Result<NaiveDate> {
    let now = today();
    match year {
        None => Ok(now),
        Some(y) => NaiveDate::from_ymd_opt(y, now.month(), 1)
            .ok_or_else(|| miette::miette!("Invalid year: {}", y)),
    }
}

fn run_next(args: NextArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let date = reference_date(args.year)?;

    let number =
        next_number(&project, args.family, &config, date).map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "family": args.family.key(), "next": number })
        ),
        _ => println!("{}", number),
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let now = today();

    let mut rows = Vec::new();
    for family in SequenceFamily::all() {
        let next =
            next_number(&project, *family, &config, now).map_err(|e| miette::miette!("{}", e))?;
        rows.push(FamilyRow {
            family: family.key(),
            format: family.format(&config).to_string(),
            next,
        });
    }

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&rows).into_diagnostic()?),
        OutputFormat::Tsv => {
            for row in &rows {
                println!("{}\t{}\t{}", row.family, row.format, row.next);
            }
        }
        _ => {
            let mut builder = Builder::default();
            builder.push_record(["Family", "Format", "Next"]);
            for row in &rows {
                builder.push_record([row.family.to_string(), row.format.clone(), row.next.clone()]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
    }
    Ok(())
}
