//! Subcommands and the helpers they share.

pub mod archives;
pub mod config;
pub mod fields;
pub mod index;
pub mod parse;
pub mod sink;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use irs990_core::{
    FilingRouter, Irs990Config, MappingCatalog, RecordExtractor, ReturnTypeClass, RunSummary,
};

/// Output options shared by the extraction commands.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Forms to extract, comma separated (default: from config)
    #[arg(short, long, value_delimiter = ',')]
    pub forms: Vec<String>,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output file name prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

impl OutputArgs {
    /// Apply overrides to `config` and return the forms to extract.
    pub fn apply(&self, config: &mut Irs990Config) -> Vec<String> {
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.output.prefix = prefix.clone();
        }

        if self.forms.is_empty() {
            config.filings.default_forms.clone()
        } else {
            self.forms.clone()
        }
    }
}

/// Load the configuration named on the command line, else the user's
/// default file, else built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<Irs990Config> {
    if let Some(path) = config_path {
        return Irs990Config::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        return Irs990Config::from_file(&default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()));
    }

    Ok(Irs990Config::default())
}

/// Build a router over a fresh catalog for the configured return types.
pub fn build_router(
    config: &Irs990Config,
    forms: &[String],
) -> (Arc<MappingCatalog>, FilingRouter) {
    let catalog = Arc::new(config.catalog());

    let return_types = config
        .filings
        .return_type_aliases
        .iter()
        .fold(ReturnTypeClass::new(&config.filings.return_type), |class, alias| {
            class.with_alias(alias)
        });

    let extractor = RecordExtractor::new(Arc::clone(&catalog));
    let router =
        FilingRouter::new(extractor, forms.iter().cloned()).with_return_types(return_types);

    (catalog, router)
}

/// Progress bar over `len` filings, or a spinner when the count is unknown.
pub fn progress_bar(len: Option<u64>) -> anyhow::Result<ProgressBar> {
    let pb = match len {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(concat!(
                        "{spinner:.green} [{elapsed_precise}] ",
                        "[{bar:40.cyan/blue}] {pos}/{len} filings",
                    ))?
                    .progress_chars("=>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} filings {msg}")?,
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
    };
    Ok(pb)
}

/// Print the end-of-run report.
pub fn print_summary(summary: &RunSummary, elapsed: Duration, outputs: &[PathBuf]) {
    println!();
    println!(
        "{} Processed {} of {} filings in {:?}",
        style("✓").green(),
        summary.processed,
        summary.considered,
        elapsed
    );
    println!(
        "   {} skipped (return type), {} not found, {} failed",
        summary.skipped_return_type,
        summary.not_found,
        style(summary.failures.len()).red()
    );

    for (form, count) in &summary.records {
        println!("   {} {} record(s)", style(form).cyan(), count);
    }
    for path in outputs {
        println!("   {} {}", style("→").dim(), path.display());
    }

    if !summary.failures.is_empty() {
        println!();
        println!("{}", style("Failed filings:").red());
        for failure in &summary.failures {
            println!("  - {}: {}", failure.object_id, failure.reason);
        }
    }
}
