//! Index command - extract the filings an index lists from a directory tree.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;

use irs990_core::{FilingIndex, LocationResolver};

use super::sink::CsvSink;
use super::{build_router, load_config, print_summary, progress_bar, OutputArgs};

/// Arguments for the index command.
#[derive(Args)]
pub struct IndexArgs {
    /// Index listing (CSV with RETURN_TYPE and OBJECT_ID columns)
    #[arg(required = true)]
    index: PathBuf,

    /// Root of the `<year>/<subdirectory>/` filing tree
    #[arg(short = 'd', long)]
    filings: PathBuf,

    /// Stop after this many index entries
    #[arg(short, long)]
    limit: Option<usize>,

    #[command(flatten)]
    output: OutputArgs,
}

pub fn run(args: IndexArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    let forms = args.output.apply(&mut config);

    let index = FilingIndex::from_path(&args.index)
        .with_context(|| format!("Failed to read index {}", args.index.display()))?;
    let mut locations =
        LocationResolver::from_directory_tree(&args.filings, &config.filings.document_suffix)
            .with_context(|| format!("Failed to scan {}", args.filings.display()))?;

    println!(
        "{} {} index entries, {} filing year(s) on disk",
        style("ℹ").blue(),
        index.len(),
        locations.years().count()
    );

    let (catalog, router) = build_router(&config, &forms);
    let router = router.with_limit(args.limit);
    let mut sink = CsvSink::create(&config, &catalog, &forms)?;

    let total = args.limit.map_or(index.len(), |limit| limit.min(index.len()));
    let pb = progress_bar(Some(total as u64))?;
    let summary = router.run_with(&index, &mut locations, &mut sink, &mut |_| pb.inc(1))?;
    pb.finish_and_clear();

    print_summary(&summary, start.elapsed(), &sink.paths());
    Ok(())
}
