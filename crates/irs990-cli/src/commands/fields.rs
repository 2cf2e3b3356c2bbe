//! Fields command - print the output columns of a form.

use clap::Args;

use irs990_core::COMMON_COLUMNS;

use super::load_config;

/// Arguments for the fields command.
#[derive(Args)]
pub struct FieldsArgs {
    /// Form identifier
    #[arg(default_value = "990")]
    form: String,

    /// Print the header as one comma-separated line
    #[arg(long)]
    csv: bool,
}

pub fn run(args: FieldsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let catalog = config.catalog();

    let universe = catalog.field_name_universe(&args.form)?;
    if universe.is_empty() {
        anyhow::bail!("No mapping declares form '{}'", args.form);
    }

    let columns = COMMON_COLUMNS
        .iter()
        .copied()
        .chain(universe.iter().map(String::as_str))
        .collect::<Vec<_>>();

    if args.csv {
        println!("{}", columns.join(","));
    } else {
        for column in columns {
            println!("{}", column);
        }
    }

    Ok(())
}
