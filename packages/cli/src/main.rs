mod commands;
mod config;
mod script;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{export, run, templates, ExportArgs, RunArgs, TemplatesArgs};

/// Folio CLI - paged document editing from the command line
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a document as clean HTML
    Export(ExportArgs),

    /// Replay a JSON script of editor actions against a document
    Run(RunArgs),

    /// List saved templates
    Templates(TemplatesArgs),
}

fn main() {
    // Logs go to stderr so exported markup on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Export(args) => export(args),
        Command::Run(args) => run(args),
        Command::Templates(args) => templates(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
