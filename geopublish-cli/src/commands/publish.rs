//! Dataset publishing CLI commands.

use std::path::PathBuf;

use clap::Subcommand;

use geopublish::geoserver::{CoverageSource, CoverageType, ShapefileSource, SqlViewOptions};

use crate::commands::common;
use crate::error::CliError;
use crate::settings::Settings;

/// Publishing subcommands.
#[derive(Debug, Subcommand)]
pub enum PublishAction {
    /// Upload a shapefile set and publish it as a layer
    Shapefile {
        /// Store identifier, `workspace:name` or bare name
        store: String,
        /// Base path; sibling .shp, .shx, .dbf and .prj files are gathered
        #[arg(long, conflicts_with = "zip")]
        base: Option<PathBuf>,
        /// Zip archive that already carries the shapefile set
        #[arg(long)]
        zip: Option<PathBuf>,
        /// Replace an existing store of the same name
        #[arg(long)]
        overwrite: bool,
        /// Character set of the DBF file
        #[arg(long)]
        charset: Option<String>,
        /// Style to set as the layer default after publishing
        #[arg(long)]
        default_style: Option<String>,
    },
    /// Upload a raster file and publish it as a coverage layer
    Coverage {
        /// Layer identifier, `workspace:name` or bare name
        layer: String,
        /// Raster file to upload
        file: PathBuf,
        /// Raster format, e.g. GeoTIFF or ArcGrid
        #[arg(long)]
        format: CoverageType,
        /// Style to set as the layer default after publishing
        #[arg(long)]
        default_style: Option<String>,
        /// Additional style to attach, repeatable
        #[arg(long = "style")]
        styles: Vec<String>,
        /// Replace an existing store of the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Publish a SQL view as a layer
    SqlView {
        /// Data store identifier, `workspace:name` or bare name
        store: String,
        /// Name of the layer to create
        layer: String,
        /// SELECT statement backing the view
        #[arg(long)]
        sql: String,
        /// Geometry type of the view, e.g. Point or MultiPolygon
        #[arg(long)]
        geometry_type: String,
        /// Spatial reference ID of the geometry column
        #[arg(long)]
        srid: u32,
        /// Style to set as the layer default
        #[arg(long)]
        default_style: String,
        /// Geometry column name
        #[arg(long)]
        geometry_name: Option<String>,
        /// Additional style to attach, repeatable
        #[arg(long = "style")]
        styles: Vec<String>,
        /// Skip registering the layer with the tile cache
        #[arg(long)]
        no_tile_cache: bool,
    },
}

/// Run a publish subcommand.
pub fn run(action: PublishAction, settings: &Settings) -> Result<(), CliError> {
    let engine = common::engine(settings)?;
    let envelope = match action {
        PublishAction::Shapefile {
            store,
            base,
            zip,
            overwrite,
            charset,
            default_style,
        } => {
            let source = shapefile_source(base, zip)?;
            engine.create_shapefile_resource(
                &store,
                source,
                overwrite,
                charset.as_deref(),
                default_style.as_deref(),
            )?
        }
        PublishAction::Coverage {
            layer,
            file,
            format,
            default_style,
            styles,
            overwrite,
        } => engine.create_coverage_layer(
            &layer,
            format,
            CoverageSource::path(file),
            default_style.as_deref(),
            &styles,
            overwrite,
        )?,
        PublishAction::SqlView {
            store,
            layer,
            sql,
            geometry_type,
            srid,
            default_style,
            geometry_name,
            styles,
            no_tile_cache,
        } => {
            let mut options = SqlViewOptions::new()
                .with_other_styles(styles)
                .with_gwc(!no_tile_cache);
            if let Some(name) = geometry_name {
                options = options.with_geometry_name(name);
            }
            engine.create_sql_view_layer(
                &store,
                &layer,
                &geometry_type,
                srid,
                &sql,
                &default_style,
                &options,
            )?
        }
    };
    common::emit(&envelope)
}

fn shapefile_source(
    base: Option<PathBuf>,
    zip: Option<PathBuf>,
) -> Result<ShapefileSource, CliError> {
    match (base, zip) {
        (Some(base), None) => Ok(ShapefileSource::Base(base)),
        (None, Some(zip)) => Ok(ShapefileSource::Zip(zip)),
        _ => Err(CliError::Usage(
            "Pass exactly one of --base or --zip.".to_string(),
        )),
    }
}
