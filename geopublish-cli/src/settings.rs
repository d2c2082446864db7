//! Layered connection settings for CLI commands.
//!
//! Values are resolved flag first, then `GEOPUBLISH_*` environment
//! variable (applied by clap), then the `[catalog]` section of
//! `~/.config/geopublish/config.ini`. Credentials fall back to the
//! stock admin account when no source provides them.

use std::path::PathBuf;
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use geopublish::geoserver::config::{DEFAULT_PASSWORD, DEFAULT_USERNAME};
use geopublish::geoserver::GeoServerConfig;

use crate::error::CliError;

/// Config file section holding catalog connection settings.
const CATALOG_SECTION: &str = "catalog";

/// Values taken from command-line flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Resolved catalog connection settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub public_endpoint: Option<String>,
    pub node_ports: Option<Vec<u16>>,
    pub timeout: Option<Duration>,
}

/// Path of the config file, `~/.config/geopublish/config.ini` on Linux.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("geopublish").join("config.ini"))
}

fn load_config_file() -> Option<Ini> {
    let path = config_file_path()?;
    match Ini::load_from_file(&path) {
        Ok(ini) => Some(ini),
        Err(error) => {
            debug!(path = %path.display(), %error, "config file not loaded");
            None
        }
    }
}

impl Settings {
    /// Resolve settings from the given overrides and the config file.
    pub fn resolve(overrides: Overrides) -> Result<Settings, CliError> {
        let file = load_config_file();
        Settings::layered(overrides, file.as_ref())
    }

    fn layered(overrides: Overrides, file: Option<&Ini>) -> Result<Settings, CliError> {
        let from_file = |key: &str| {
            file.and_then(|ini| ini.get_from(Some(CATALOG_SECTION), key))
                .map(str::to_string)
        };

        let endpoint = overrides
            .endpoint
            .or_else(|| from_file("endpoint"))
            .ok_or_else(|| {
                CliError::Config(
                    "No catalog endpoint specified. Use --endpoint, set GEOPUBLISH_ENDPOINT \
                     or set endpoint in the [catalog] section of config.ini."
                        .to_string(),
                )
            })?;
        let username = overrides
            .username
            .or_else(|| from_file("username"))
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let password = overrides
            .password
            .or_else(|| from_file("password"))
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

        let node_ports = from_file("node_ports")
            .map(|raw| parse_ports(&raw))
            .transpose()?;
        let timeout = from_file("timeout_seconds")
            .map(|raw| parse_timeout(&raw))
            .transpose()?;

        Ok(Settings {
            endpoint,
            username,
            password,
            public_endpoint: from_file("public_endpoint"),
            node_ports,
            timeout,
        })
    }

    /// Turn the resolved settings into an engine configuration.
    pub fn catalog_config(&self) -> GeoServerConfig {
        let mut config =
            GeoServerConfig::new(&self.endpoint).with_credentials(&self.username, &self.password);
        if let Some(public) = &self.public_endpoint {
            config = config.with_public_endpoint(public);
        }
        if let Some(ports) = &self.node_ports {
            config = config.with_node_ports(ports.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

fn parse_ports(raw: &str) -> Result<Vec<u16>, CliError> {
    raw.split(',')
        .map(|part| part.trim().parse::<u16>())
        .collect::<Result<Vec<u16>, _>>()
        .map_err(|_| {
            CliError::Config(format!(
                "The node_ports entry \"{raw}\" is not a comma-separated list of ports."
            ))
        })
}

fn parse_timeout(raw: &str) -> Result<Duration, CliError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| {
            CliError::Config(format!(
                "The timeout_seconds entry \"{raw}\" is not a number of seconds."
            ))
        })
}
