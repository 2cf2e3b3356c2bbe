//! Archives command - extract filings stored in bulk zip archives.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;

use irs990_core::{FilingIndex, LocationResolver};

use super::sink::CsvSink;
use super::{build_router, load_config, print_summary, progress_bar, OutputArgs};

/// Arguments for the archives command.
#[derive(Args)]
pub struct ArchivesArgs {
    /// Directory of current `<year>_*.zip` archives
    #[arg(short = 'a', long, required = true)]
    archives: PathBuf,

    /// Directory of prior archives, searched after the current ones
    #[arg(long)]
    prior: Option<PathBuf>,

    /// Index listing; without one every stored filing is extracted
    #[arg(short, long)]
    index: Option<PathBuf>,

    /// Stop after this many filings
    #[arg(short, long)]
    limit: Option<usize>,

    #[command(flatten)]
    output: OutputArgs,
}

pub fn run(args: ArchivesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    let forms = args.output.apply(&mut config);

    let mut locations = LocationResolver::from_archive_dirs(
        &args.archives,
        args.prior.as_deref(),
        &config.filings.document_suffix,
    )
    .with_context(|| format!("Failed to open archives in {}", args.archives.display()))?;

    let years = locations.years().collect::<Vec<_>>().join(", ");
    println!(
        "{} Archive years: {}",
        style("ℹ").blue(),
        if years.is_empty() { "none" } else { years.as_str() }
    );

    let (catalog, router) = build_router(&config, &forms);
    let router = router.with_limit(args.limit);
    let mut sink = CsvSink::create(&config, &catalog, &forms)?;

    let summary = match &args.index {
        Some(path) => {
            let index = FilingIndex::from_path(path)
                .with_context(|| format!("Failed to read index {}", path.display()))?;
            let total = args.limit.map_or(index.len(), |limit| limit.min(index.len()));
            let pb = progress_bar(Some(total as u64))?;
            let summary = router.run_with(&index, &mut locations, &mut sink, &mut |_| pb.inc(1))?;
            pb.finish_and_clear();
            summary
        }
        None => {
            let pb = progress_bar(None)?;
            let summary = router.run_documents(&mut locations, &mut sink, &mut |id| {
                pb.set_message(id.to_string());
                pb.inc(1);
            })?;
            pb.finish_and_clear();
            summary
        }
    };

    print_summary(&summary, start.elapsed(), &sink.paths());
    Ok(())
}
