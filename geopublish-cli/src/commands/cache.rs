//! Tile cache maintenance CLI commands.

use clap::{Args, Subcommand, ValueEnum};

use geopublish::geoserver::{KillTarget, SeedOptions, TileCacheOp};

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Tile cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Render and store tiles for a layer
    Seed {
        /// Layer identifier, `workspace:name` or bare name
        layer: String,
        /// Re-render tiles that are already cached
        #[arg(long)]
        reseed: bool,
        #[command(flatten)]
        params: SeedParams,
    },
    /// Drop cached tiles for a layer
    Truncate {
        /// Layer identifier, `workspace:name` or bare name
        layer: String,
        /// Drop every grid set, format and zoom level at once
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        params: SeedParams,
    },
    /// Show the seeding tasks of a layer
    Status {
        /// Layer identifier, `workspace:name` or bare name
        layer: String,
    },
    /// Stop seeding tasks of a layer
    Kill {
        /// Layer identifier, `workspace:name` or bare name
        layer: String,
        /// Which tasks to stop
        #[arg(long, value_enum, default_value = "all")]
        scope: KillScope,
    },
}

/// Zoom, grid and format switches shared by seed and truncate.
#[derive(Debug, Args)]
pub struct SeedParams {
    /// First zoom level
    #[arg(long, default_value_t = 10)]
    pub zoom_start: u32,
    /// Last zoom level
    #[arg(long, default_value_t = 15)]
    pub zoom_end: u32,
    /// Grid set to operate on
    #[arg(long, default_value = "900913")]
    pub grid_set: String,
    /// Tile image format
    #[arg(long, default_value = "image/png")]
    pub image_format: String,
    /// Server-side worker threads
    #[arg(long, default_value_t = 1)]
    pub threads: u32,
    /// Restrict to a bounding box given as minx,miny,maxx,maxy
    #[arg(long)]
    pub bounds: Option<String>,
}

impl SeedParams {
    fn to_options(&self) -> Result<SeedOptions, CliError> {
        let mut options = SeedOptions::new()
            .with_zoom_range(self.zoom_start, self.zoom_end)
            .with_grid_set_id(&self.grid_set)
            .with_image_format(&self.image_format)
            .with_thread_count(self.threads);
        if let Some(spec) = &self.bounds {
            options = options.with_bounds(parse_bounds(spec)?);
        }
        Ok(options)
    }
}

/// Which seeding tasks a kill applies to.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KillScope {
    /// Running and pending tasks
    All,
    /// Only tasks currently running
    Running,
    /// Only tasks waiting to run
    Pending,
}

impl From<KillScope> for KillTarget {
    fn from(scope: KillScope) -> Self {
        match scope {
            KillScope::All => KillTarget::All,
            KillScope::Running => KillTarget::Running,
            KillScope::Pending => KillTarget::Pending,
        }
    }
}

/// Run a tile cache subcommand.
pub fn run(action: CacheAction, settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    let envelope = match action {
        CacheAction::Seed {
            layer,
            reseed,
            params,
        } => {
            let operation = if reseed {
                TileCacheOp::Reseed
            } else {
                TileCacheOp::Seed
            };
            engine.modify_tile_cache(&layer, operation, &params.to_options()?)?
        }
        CacheAction::Truncate { layer, all, params } => {
            let operation = if all {
                TileCacheOp::MassTruncate
            } else {
                TileCacheOp::Truncate
            };
            engine.modify_tile_cache(&layer, operation, &params.to_options()?)?
        }
        CacheAction::Status { layer } => engine.query_tile_cache_tasks(&layer)?,
        CacheAction::Kill { layer, scope } => {
            engine.terminate_tile_cache_tasks(&layer, scope.into())?
        }
    };
    common::emit(&envelope)
}

/// Parse a `minx,miny,maxx,maxy` bounding box argument.
fn parse_bounds(spec: &str) -> Result<[f64; 4], CliError> {
    let parts = spec
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| bounds_error(spec))?;
    match parts[..] {
        [minx, miny, maxx, maxy] => Ok([minx, miny, maxx, maxy]),
        _ => Err(bounds_error(spec)),
    }
}

fn bounds_error(spec: &str) -> CliError {
    CliError::Usage(format!(
        "The bounds \"{spec}\" are not of the form minx,miny,maxx,maxy."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds() {
        assert_eq!(
            parse_bounds("-10, 0, 10.5, 20").unwrap(),
            [-10.0, 0.0, 10.5, 20.0]
        );
    }

    #[test]
    fn test_parse_bounds_rejects_bad_specs() {
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("1,2,3,4,5").is_err());
        assert!(parse_bounds("1,2,3,north").is_err());
    }

    #[test]
    fn test_seed_params_carry_into_options() {
        let params = SeedParams {
            zoom_start: 0,
            zoom_end: 4,
            grid_set: "4326".to_string(),
            image_format: "image/jpeg".to_string(),
            threads: 2,
            bounds: Some("-10,-5,10,5".to_string()),
        };
        let options = params.to_options().unwrap();
        assert_eq!(options.zoom_start, 0);
        assert_eq!(options.zoom_end, 4);
        assert_eq!(options.grid_set_id, "4326");
        assert_eq!(options.image_format, "image/jpeg");
        assert_eq!(options.thread_count, 2);
        assert_eq!(options.bounds, Some([-10.0, -5.0, 10.0, 5.0]));
    }
}
