//! CLI application for extracting IRS Form 990 filings into CSV.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{archives, config, fields, index, parse};

/// IRS 990 extraction - Turn e-filed 990 returns into per-form tables
#[derive(Parser)]
#[command(name = "irs990")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from filing documents on disk
    Parse(parse::ParseArgs),

    /// Extract filings listed in an index from a directory tree
    Index(index::IndexArgs),

    /// Extract filings stored in bulk zip archives
    Archives(archives::ArchivesArgs),

    /// Print the output columns of a form
    Fields(fields::FieldsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Parse(args) => parse::run(args, cli.config.as_deref()),
        Commands::Index(args) => index::run(args, cli.config.as_deref()),
        Commands::Archives(args) => archives::run(args, cli.config.as_deref()),
        Commands::Fields(args) => fields::run(args, cli.config.as_deref()),
        Commands::Config(args) => config::run(args),
    }
}
