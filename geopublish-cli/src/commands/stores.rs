//! Store listing CLI commands.

use clap::Subcommand;

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Store action subcommands.
#[derive(Debug, Subcommand)]
pub enum StoreAction {
    /// List data and coverage stores
    List {
        /// Restrict the listing to one workspace
        #[arg(long)]
        workspace: Option<String>,
        /// Fetch the full record of each store
        #[arg(long)]
        properties: bool,
    },
}

/// Run a store subcommand.
pub fn run(action: StoreAction, settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    let envelope = match action {
        StoreAction::List {
            workspace,
            properties,
        } => engine.list_stores(workspace.as_deref(), properties)?,
    };
    common::emit(&envelope)
}
