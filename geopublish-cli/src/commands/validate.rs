//! Endpoint validation CLI command.

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Run the validate command.
pub fn run(settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    engine.validate()?;
    println!(
        "{} answers like a catalog and accepted the credentials.",
        settings.endpoint
    );
    Ok(())
}
