//! seaice - sea-ice core stacking and climatology tool
//!
//! ```text
//! seaice run --config analysis.toml
//! seaice inspect cores.csv
//! ```

use clap::{Parser, Subcommand};
use seaice_cli::{describe, load_stack, run};
use seaice_core::{AnalysisConfig, Diagnostics};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "seaice", version, about = "Stack sea-ice cores into binned climatologies")]
struct Cli {
    /// Log verbosity when RUST_LOG is unset
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the analysis described by a TOML file
    Run {
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured result path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarize a normalized observation table
    Inspect {
        path: PathBuf,

        /// List the collection of this core
        #[arg(long)]
        core: Option<String>,
    },
}

/// Entries were already logged as they were recorded; only tally them here
fn print_diagnostics(diagnostics: &Diagnostics) {
    let warnings = diagnostics.warnings().len();
    let errors = diagnostics.errors().len();
    if warnings + errors > 0 {
        eprintln!("{} warning(s), {} error(s)", warnings, errors);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Run { config, output } => {
            let mut config = AnalysisConfig::from_file(&config)?;
            if let Some(output) = output {
                config.output.path = output;
            }
            let summary = run(&config)?;
            print_diagnostics(&summary.diagnostics);
            println!(
                "{} cores, {} observations -> {} rows in {}",
                summary.cores,
                summary.input_rows,
                summary.output_rows,
                config.output.path.display()
            );
        }
        Command::Inspect { path, core } => {
            let mut diagnostics = Diagnostics::new();
            let stack = load_stack(&path, &mut diagnostics)?;
            print_diagnostics(&diagnostics);
            println!("{} rows from {} cores", stack.len(), stack.names().len());
            for line in describe(&stack) {
                println!("{}", line);
            }
            if let Some(core) = core {
                println!("{}: {}", core, stack.core_in_collection(&core).join(", "));
            }
        }
    }
    Ok(())
}
