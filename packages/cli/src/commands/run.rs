use crate::config::open_session;
use crate::script::{load_script, StepOutcome};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Editor config file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Script of editor steps (JSON array)
    #[arg(long)]
    pub script: PathBuf,

    /// Storage directory; edits persist here between runs
    #[arg(short, long)]
    pub storage: Option<PathBuf>,

    /// Write the clean export here after the script finishes
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Fail on the first step that does nothing
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    let steps = load_script(&args.script)?;
    let mut session = open_session(&args.config, args.storage.as_deref())?;

    println!(
        "{} {} ({} steps)",
        "▶".bright_blue().bold(),
        session.config().id.bright_white(),
        steps.len()
    );

    let mut skipped = 0;
    for (i, step) in steps.iter().enumerate() {
        match step.apply(&mut session)? {
            StepOutcome::Applied(Some(detail)) => {
                println!("  {} {:>3} {} {}", "✓".green(), i + 1, step.name(), detail.dimmed());
            }
            StepOutcome::Applied(None) => {
                println!("  {} {:>3} {}", "✓".green(), i + 1, step.name());
            }
            StepOutcome::Skipped => {
                skipped += 1;
                println!("  {} {:>3} {} {}", "·".yellow(), i + 1, step.name(), "(no effect)".dimmed());
                if args.strict {
                    anyhow::bail!("Step {} ({}) had no effect", i + 1, step.name());
                }
            }
        }
    }

    println!();
    println!(
        "{} {} steps, {} skipped, {} pages, {} history entries",
        "✅".green(),
        steps.len(),
        skipped,
        session.page_count(),
        session.history().len()
    );

    if let Some(out) = args.out {
        fs::write(&out, session.export_html())?;
        println!("   Output: {}", out.display());
    }

    Ok(())
}
