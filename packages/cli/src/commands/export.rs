use crate::config::open_session;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Editor config file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Storage directory holding persisted content
    #[arg(short, long)]
    pub storage: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn export(args: ExportArgs) -> Result<()> {
    let session = open_session(&args.config, args.storage.as_deref())?;
    let html = session.export_html();

    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out, html)?;
            eprintln!(
                "{} Exported {} ({} pages) → {}",
                "✓".green(),
                session.config().id.bright_white(),
                session.page_count(),
                out.display()
            );
        }
        None => println!("{}", html),
    }

    Ok(())
}
