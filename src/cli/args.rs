//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    cal::CalCommands, completions::CompletionsArgs, init::InitArgs, insp::InspCommands,
    lesson::LessonCommands, order::OrderCommands, plan::PlanCommands, quote::QuoteCommands,
    rnc::RncCommands, seq::SeqCommands, tol::TolCommands,
};

#[derive(Parser)]
#[command(name = "qms")]
#[command(author, version, about = "Quality Management Toolkit")]
#[command(long_about = "A plain-text quality management toolkit: non-conformance reports, calibrations, inspection reports, lessons learned, action plans, quotations and sales orders, one YAML file per record.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// Install the stderr log subscriber; `-v` raises the level step by step
    pub fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project root (default: auto-detect by finding .qms/)
    #[arg(long, global = true, env = "QMS_PROJECT")]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new QMS project
    Init(InitArgs),

    /// Non-conformance reports (RNC)
    #[command(subcommand)]
    Rnc(RncCommands),

    /// Equipment calibration records
    #[command(subcommand)]
    Cal(CalCommands),

    /// Inspection reports (raw material, dimensional, NDT, painting)
    #[command(subcommand)]
    Insp(InspCommands),

    /// Lessons learned
    #[command(subcommand)]
    Lesson(LessonCommands),

    /// Corrective-action plans
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Sales quotations
    #[command(subcommand)]
    Quote(QuoteCommands),

    /// Sales orders
    #[command(subcommand)]
    Order(OrderCommands),

    /// Tolerance evaluation
    #[command(subcommand)]
    Tol(TolCommands),

    /// Record numbering
    #[command(subcommand)]
    Seq(SeqCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
