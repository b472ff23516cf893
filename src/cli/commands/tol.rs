//! `qms tol` command - Evaluate a measurement against its tolerance

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::parse_finite;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::tolerance::{ToleranceRange, ToleranceSpec, ToleranceToken, Verdict};

#[derive(Subcommand, Debug)]
pub enum TolCommands {
    /// Check a measured value against nominal and up to two tolerance tokens
    ///
    /// Tokens: `+0.1` sets the upper allowance, `-0.05` the lower one and a
    /// bare `0.2` both sides not already set. The verdict is printed; the exit
    /// status is 0 whether or not the value conforms.
    Eval(EvalArgs),
}

#[derive(clap::Args, Debug)]
#[command(allow_negative_numbers = true)]
pub struct EvalArgs {
    /// Nominal value from the drawing
    #[arg(long, short = 'n', value_parser = parse_finite)]
    pub nominal: f64,

    /// Measured value
    #[arg(long, short = 'm', value_parser = parse_finite)]
    pub measured: f64,

    /// Tolerance tokens (at most two), e.g. `+0.1 -0.05` or `0.2`
    #[arg(num_args = 0..=2)]
    pub tokens: Vec<String>,
}

/// Result of an evaluation, as printed in structured formats
#[derive(Debug, Serialize)]
struct Evaluation<'a> {
    nominal: f64,
    measured: f64,
    tokens: &'a [String],
    lower: f64,
    upper: f64,
    verdict: Verdict,
}

/// Run a tolerance subcommand
pub fn run(cmd: TolCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TolCommands::Eval(args) => run_eval(args, global),
    }
}

fn run_eval(args: EvalArgs, global: &GlobalOpts) -> Result<()> {
    let spec = ToleranceSpec::from_strings(
        args.nominal,
        args.tokens.first().map(String::as_str),
        args.tokens.get(1).map(String::as_str),
    );
    let range = spec.range();
    let verdict = range.classify(args.measured);

    for token in &args.tokens {
        if !ToleranceToken::parse(token).is_valid() {
            tracing::warn!(token = %token, "Ignoring unparseable tolerance token");
        }
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let evaluation = Evaluation {
                nominal: args.nominal,
                measured: args.measured,
                tokens: &args.tokens,
                lower: range.lower,
                upper: range.upper,
                verdict,
            };
            if global.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&evaluation).into_diagnostic()?);
            } else {
                print!("{}", serde_yml::to_string(&evaluation).into_diagnostic()?);
            }
        }
        OutputFormat::Tsv | OutputFormat::Csv => {
            let sep = if global.format == OutputFormat::Csv { ',' } else { '\t' };
            println!(
                "{}{sep}{}{sep}{}{sep}{}{sep}{}",
                args.nominal, args.measured, range.lower, range.upper, verdict
            );
        }
        OutputFormat::Id => println!("{}", verdict),
        _ => print_evaluation(args.measured, &range, verdict, global.quiet),
    }
    Ok(())
}

fn print_evaluation(measured: f64, range: &ToleranceRange, verdict: Verdict, quiet: bool) {
    let styled = if verdict.is_conforming() {
        style(verdict.to_string()).green().bold()
    } else {
        style(verdict.to_string()).red().bold()
    };

    if quiet {
        println!("{}", styled);
        return;
    }

    println!("{:<10} {}", style("Range:").bold(), range);
    println!("{:<10} {}", style("Measured:").bold(), measured);
    println!("{:<10} {}", style("Verdict:").bold(), styled);
}
