use crate::config::{open_storage, DEFAULT_STORAGE_DIR};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::TemplateCatalog;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TemplatesArgs {
    /// Storage directory holding the template catalog
    #[arg(short, long, default_value = DEFAULT_STORAGE_DIR)]
    pub storage: PathBuf,

    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn templates(args: TemplatesArgs) -> Result<()> {
    let storage = open_storage(Some(&args.storage));
    let catalog = TemplateCatalog::load(storage.as_ref());

    if args.json {
        println!("{}", serde_json::to_string_pretty(catalog.records())?);
        return Ok(());
    }

    if catalog.is_empty() {
        println!("{}", "No templates saved".yellow());
        return Ok(());
    }

    println!("{}", format!("{} templates", catalog.len()).bright_blue().bold());
    for record in catalog.records() {
        println!(
            "  {} {} {}",
            "•".green(),
            record.name.bright_white(),
            record.id.dimmed()
        );
        println!(
            "      page {} of '{}', {} editable regions",
            record.page_index + 1,
            record.page_selector,
            record.editable_elements.len()
        );
    }

    Ok(())
}
