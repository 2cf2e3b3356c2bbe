//! Parse command - extract records from filing documents on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use tracing::warn;

use irs990_core::document::decode;
use irs990_core::filing::{FilingFailure, FilingSource, MemorySink};
use irs990_core::{FilingRouter, RecordSink, RunSummary};

use super::sink::CsvSink;
use super::{build_router, load_config, print_summary, progress_bar, OutputArgs};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Filing documents or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON records grouped by form, on stdout
    Json,
    /// One CSV file per form
    Csv,
}

pub fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    let forms = args.output.apply(&mut config);

    let mut files = Vec::new();
    for pattern in &args.inputs {
        let matched = glob(pattern)
            .with_context(|| format!("Invalid pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        if matched.is_empty() {
            warn!("No files match {}", pattern);
        }
        files.extend(matched);
    }

    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    let (catalog, router) = build_router(&config, &forms);
    let mut summary = RunSummary::default();
    let suffix = config.filings.document_suffix.as_str();

    match args.format {
        OutputFormat::Json => {
            let mut sink = MemorySink::new();
            process_files(&files, &router, suffix, &mut sink, &mut summary, || {})?;
            println!("{}", serde_json::to_string_pretty(&sink)?);
        }
        OutputFormat::Csv => {
            println!(
                "{} Found {} filing(s) to process",
                style("ℹ").blue(),
                files.len()
            );

            let mut sink = CsvSink::create(&config, &catalog, &forms)?;
            let pb = progress_bar(Some(files.len() as u64))?;
            process_files(&files, &router, suffix, &mut sink, &mut summary, || pb.inc(1))?;
            sink.finish()?;
            pb.finish_and_clear();

            print_summary(&summary, start.elapsed(), &sink.paths());
        }
    }

    Ok(())
}

fn process_files(
    files: &[PathBuf],
    router: &FilingRouter,
    suffix: &str,
    sink: &mut dyn RecordSink,
    summary: &mut RunSummary,
    mut tick: impl FnMut(),
) -> anyhow::Result<()> {
    for path in files {
        summary.considered += 1;
        match read_source(path, suffix) {
            Ok(source) => router.process(&source, sink, summary)?,
            Err(e) => {
                warn!("Failed to read {}: {:#}", path.display(), e);
                summary.failures.push(FilingFailure {
                    object_id: path.display().to_string(),
                    origin: Some(path.display().to_string()),
                    reason: format!("{:#}", e),
                });
            }
        }
        tick();
    }
    Ok(())
}

fn read_source(path: &Path, suffix: &str) -> anyhow::Result<FilingSource> {
    let bytes = fs::read(path)?;
    let text = decode(bytes)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let object_id = file_name
        .strip_suffix(suffix)
        .or_else(|| Path::new(file_name).file_stem().and_then(|s| s.to_str()))
        .unwrap_or(file_name);

    Ok(FilingSource {
        object_id: object_id.to_string(),
        origin: path.display().to_string(),
        text,
    })
}
