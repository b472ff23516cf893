use clap::Parser;
use miette::Result;
use qms::cli::commands;
use qms::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` or `grep -q` ends quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    Cli::setup_logging(cli.global.verbose);
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Rnc(cmd) => commands::rnc::run(cmd, &global),
        Commands::Cal(cmd) => commands::cal::run(cmd, &global),
        Commands::Insp(cmd) => commands::insp::run(cmd, &global),
        Commands::Lesson(cmd) => commands::lesson::run(cmd, &global),
        Commands::Plan(cmd) => commands::plan::run(cmd, &global),
        Commands::Quote(cmd) => commands::quote::run(cmd, &global),
        Commands::Order(cmd) => commands::order::run(cmd, &global),
        Commands::Tol(cmd) => commands::tol::run(cmd, &global),
        Commands::Seq(cmd) => commands::seq::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
