//! Catalog reload CLI command.

use clap::Args;

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Options for the reload command.
#[derive(Debug, Args)]
pub struct ReloadArgs {
    /// Reload the tile cache configuration instead of the catalog
    #[arg(long)]
    pub tile_cache: bool,
    /// Issue the reload through the public endpoint
    #[arg(long)]
    pub public: bool,
    /// Node port to reload, repeatable; defaults to the configured list
    #[arg(long = "port")]
    pub ports: Vec<u16>,
}

/// Run the reload command.
pub fn run(args: ReloadArgs, settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    let ports = (!args.ports.is_empty()).then_some(args.ports.as_slice());
    let envelope = if args.tile_cache {
        engine.gwc_reload(ports, args.public)
    } else {
        engine.reload(ports, args.public)
    };
    common::emit(&envelope)
}
