//! `qms init` command - Initialize a new QMS project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::EntityPrefix;
use crate::core::project::{Project, ProjectError, PROJECT_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .qms/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized QMS project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Open a non-conformance report",
                style("qms rnc new -t \"...\"").yellow()
            );
            println!(
                "  {} Register an instrument",
                style("qms cal new -T PAQ-01 -t \"...\" --last 2025-01-15").yellow()
            );
            println!(
                "  {} Check a measurement",
                style("qms tol eval -n 10 -m 10.05 +0.1 -0.05").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} QMS project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("qms init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let config = format!("{}/config.yaml", PROJECT_DIR);
    let dirs = std::iter::once(format!("{}/", PROJECT_DIR))
        .chain(std::iter::once(config))
        .chain(
            EntityPrefix::all()
                .iter()
                .map(|p| format!("{}/", Project::entity_directory(*p))),
        );

    for dir in dirs {
        if root.join(&dir).exists() {
            let marker = if dir.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", marker, style(dir).dim());
        }
    }
}
