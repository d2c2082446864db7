//! Layer management CLI commands.

use clap::Subcommand;

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Layer action subcommands.
#[derive(Debug, Subcommand)]
pub enum LayerAction {
    /// List every layer in the catalog
    List {
        /// Fetch the full record of each layer
        #[arg(long)]
        properties: bool,
    },
    /// Retrieve one layer with its derived service URLs
    Get {
        /// Layer identifier, `workspace:name` or bare name
        id: String,
        /// Store to resolve the backing resource against
        #[arg(long)]
        store: Option<String>,
    },
    /// Delete a layer and its backing feature type
    Delete {
        /// Layer identifier, `workspace:name` or bare name
        id: String,
        /// Data store holding the backing feature type
        #[arg(long)]
        datastore: String,
        /// Delete dependent objects too
        #[arg(long)]
        recurse: bool,
    },
}

/// Run a layer subcommand.
pub fn run(action: LayerAction, settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    let envelope = match action {
        LayerAction::List { properties } => engine.list_layers(properties)?,
        LayerAction::Get { id, store } => engine.get_layer(&id, store.as_deref())?,
        LayerAction::Delete {
            id,
            datastore,
            recurse,
        } => engine.delete_layer(&id, &datastore, recurse)?,
    };
    common::emit(&envelope)
}
