//! Config command - Print the configuration `serve` would run with.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::OutputFormat;
use crate::settings::{Overrides, Settings};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub overrides: Overrides,
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let settings = args.overrides.apply(Settings::load(config)?);
    match format {
        OutputFormat::Human => print!("{}", settings.to_toml()?),
        _ => println!("{}", format.json(&settings)?),
    }
    Ok(())
}
