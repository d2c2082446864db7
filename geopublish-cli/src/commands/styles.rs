//! Style management CLI commands.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Style action subcommands.
#[derive(Debug, Subcommand)]
pub enum StyleAction {
    /// List styles, global or per workspace
    List {
        /// Restrict the listing to one workspace
        #[arg(long)]
        workspace: Option<String>,
        /// Fetch the full record of each style
        #[arg(long)]
        properties: bool,
    },
    /// Create a style from an SLD document
    Create {
        /// Style identifier, `workspace:name` or bare name for a global style
        id: String,
        /// Path to the SLD document
        sld: PathBuf,
        /// Replace the style when it already exists
        #[arg(long)]
        overwrite: bool,
    },
}

/// Run a style subcommand.
pub fn run(action: StyleAction, settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    let envelope = match action {
        StyleAction::List {
            workspace,
            properties,
        } => engine.list_styles(workspace.as_deref(), properties)?,
        StyleAction::Create { id, sld, overwrite } => {
            let body = fs::read_to_string(&sld).map_err(|error| CliError::File {
                path: sld.display().to_string(),
                message: error.to_string(),
            })?;
            engine.create_style(&id, &body, overwrite)?
        }
    };
    common::emit(&envelope)
}
