//! Workspace management CLI commands.

use clap::Subcommand;

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Workspace action subcommands.
#[derive(Debug, Subcommand)]
pub enum WorkspaceAction {
    /// List every workspace in the catalog
    List {
        /// Fetch the full record of each workspace
        #[arg(long)]
        properties: bool,
    },
    /// Create a workspace together with its namespace
    Create {
        /// Workspace name
        name: String,
        /// Namespace URI, e.g. http://topo.example.com
        uri: String,
    },
    /// Delete a workspace
    Delete {
        /// Workspace name
        name: String,
        /// Also remove the underlying files
        #[arg(long)]
        purge: bool,
        /// Delete contained stores and layers too
        #[arg(long)]
        recurse: bool,
    },
}

/// Run a workspace subcommand.
pub fn run(action: WorkspaceAction, settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    let envelope = match action {
        WorkspaceAction::List { properties } => engine.list_workspaces(properties)?,
        WorkspaceAction::Create { name, uri } => engine.create_workspace(&name, &uri)?,
        WorkspaceAction::Delete {
            name,
            purge,
            recurse,
        } => engine.delete_workspace(&name, purge, recurse)?,
    };
    common::emit(&envelope)
}
