//! GeoPublish CLI - publish spatial datasets from the command line.
//!
//! This binary provides a command-line interface to the geopublish library.
//! Operation results print as pretty JSON envelopes; a failure envelope
//! exits nonzero.

mod commands;
mod error;
mod settings;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::layers::LayerAction;
use commands::publish::PublishAction;
use commands::reload::ReloadArgs;
use commands::stores::StoreAction;
use commands::styles::StyleAction;
use commands::workspaces::WorkspaceAction;
use error::CliError;
use settings::{Overrides, Settings};

/// GeoPublish CLI - publish rasters, feature types and styles to
/// GeoServer-style catalogs.
#[derive(Debug, Parser)]
#[command(name = "geopublish")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog REST endpoint, e.g. http://localhost:8181/geoserver/rest/
    #[arg(long, global = true, env = "GEOPUBLISH_ENDPOINT")]
    endpoint: Option<String>,

    /// Username for HTTP basic auth
    #[arg(long, global = true, env = "GEOPUBLISH_USERNAME")]
    username: Option<String>,

    /// Password for HTTP basic auth
    #[arg(long, global = true, env = "GEOPUBLISH_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the endpoint answers like a catalog and accepts the credentials
    Validate,
    /// Manage workspaces
    Workspaces {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
    /// Inspect data and coverage stores
    Stores {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Manage layers
    Layers {
        #[command(subcommand)]
        action: LayerAction,
    },
    /// Manage styles
    Styles {
        #[command(subcommand)]
        action: StyleAction,
    },
    /// Publish datasets as layers
    Publish {
        #[command(subcommand)]
        action: PublishAction,
    },
    /// Maintain the tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Reload the catalog configuration on every node
    Reload(ReloadArgs),
}

fn main() {
    // Logs go to stderr so envelope JSON on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        endpoint,
        username,
        password,
        command,
    } = cli;
    let settings = Settings::resolve(Overrides {
        endpoint,
        username,
        password,
    })?;

    match command {
        Command::Validate => commands::validate::run(&settings),
        Command::Workspaces { action } => commands::workspaces::run(action, &settings),
        Command::Stores { action } => commands::stores::run(action, &settings),
        Command::Layers { action } => commands::layers::run(action, &settings),
        Command::Styles { action } => commands::styles::run(action, &settings),
        Command::Publish { action } => commands::publish::run(action, &settings),
        Command::Cache { action } => commands::cache::run(action, &settings),
        Command::Reload(args) => commands::reload::run(args, &settings),
    }
}
