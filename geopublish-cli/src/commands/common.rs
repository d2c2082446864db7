//! Common helpers shared across CLI commands.

use geopublish::geoserver::GeoServerEngine;
use geopublish::Envelope;

use crate::error::CliError;
use crate::settings::Settings;

/// Build a catalog engine from resolved settings.
pub fn engine(settings: &Settings) -> Result<GeoServerEngine, CliError> {
    GeoServerEngine::new(settings.catalog_config())
        .map_err(|error| CliError::Catalog(error.to_string()))
}

/// Print an envelope as pretty JSON.
///
/// Failure envelopes still print; the returned error then drives the
/// nonzero exit code.
pub fn emit(envelope: &Envelope) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(envelope)
        .map_err(|error| CliError::Catalog(error.to_string()))?;
    println!("{rendered}");
    if envelope.is_success() {
        Ok(())
    } else {
        Err(CliError::Failed)
    }
}
