//! Publishing workflows that register new catalog objects.
//!
//! Every workflow here follows the same arc: prepare a payload, push it to
//! the REST API, apply styles where requested, reload the catalog nodes and
//! finish with a fresh fetch of the object so the caller sees what the
//! server actually stored.

use std::fmt;
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use crate::geoserver::coverage::{
    pack, stage_coverage, ArchiveMember, CoverageSource, CoverageType,
};
use crate::geoserver::error::{classify_server_error, GeoServerError, ServerErrorKind};
use crate::geoserver::gwc::GwcMethod;
use crate::geoserver::GeoServerEngine;
use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::identifier::Identifier;
use crate::retry::retry;

/// Uploads are retried this many times when the server hiccups on unzip.
const UPLOAD_ATTEMPTS: u32 = 5;

/// Sidecar extensions gathered next to a shapefile base path.
const SHAPEFILE_SIDECARS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// A file handed over in memory, e.g. from a web form.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> UploadFile {
        UploadFile {
            file_name: file_name.into(),
            data,
        }
    }
}

/// Where shapefile bytes come from.
#[derive(Debug, Clone)]
pub enum ShapefileSource {
    /// Path without extension; `.shp`, `.shx`, `.dbf` and `.prj` siblings
    /// are gathered from disk and zipped.
    Base(PathBuf),
    /// Path to a zip archive that already carries the shapefile set.
    Zip(PathBuf),
    /// Files handed over directly; zipped under the store name.
    Upload(Vec<UploadFile>),
}

/// One parameter of a parameterized SQL view.
#[derive(Debug, Clone)]
pub struct SqlViewParameter {
    pub name: String,
    pub default_value: String,
    pub regexp_validator: String,
}

impl SqlViewParameter {
    pub fn new(
        name: impl Into<String>,
        default_value: impl Into<String>,
        regexp_validator: impl Into<String>,
    ) -> SqlViewParameter {
        SqlViewParameter {
            name: name.into(),
            default_value: default_value.into(),
            regexp_validator: regexp_validator.into(),
        }
    }
}

/// Optional knobs for [`GeoServerEngine::create_sql_view_layer`].
#[derive(Debug, Clone)]
pub struct SqlViewOptions {
    pub geometry_name: String,
    pub other_styles: Vec<String>,
    pub parameters: Vec<SqlViewParameter>,
    pub reload_public: bool,
    pub enable_gwc: bool,
    pub gwc_method: GwcMethod,
}

impl Default for SqlViewOptions {
    fn default() -> Self {
        SqlViewOptions {
            geometry_name: "geometry".to_string(),
            other_styles: Vec::new(),
            parameters: Vec::new(),
            reload_public: false,
            enable_gwc: true,
            gwc_method: GwcMethod::Auto,
        }
    }
}

impl SqlViewOptions {
    pub fn new() -> SqlViewOptions {
        SqlViewOptions::default()
    }

    pub fn with_geometry_name(mut self, name: impl Into<String>) -> Self {
        self.geometry_name = name.into();
        self
    }

    pub fn with_other_styles(mut self, styles: Vec<String>) -> Self {
        self.other_styles = styles;
        self
    }

    pub fn with_parameter(mut self, parameter: SqlViewParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_reload_public(mut self, public: bool) -> Self {
        self.reload_public = public;
        self
    }

    pub fn with_gwc(mut self, enabled: bool) -> Self {
        self.enable_gwc = enabled;
        self
    }

    pub fn with_gwc_method(mut self, method: GwcMethod) -> Self {
        self.gwc_method = method;
        self
    }
}

/// Connection settings for a PostGIS-backed data store.
#[derive(Debug, Clone)]
pub struct PostgisConnection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    pub max_connection_idle_time: u32,
    pub evictor_run_periodicity: u32,
    pub validate_connections: bool,
    pub expose_primary_keys: bool,
}

impl PostgisConnection {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> PostgisConnection {
        PostgisConnection {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            max_connections: 5,
            max_connection_idle_time: 30,
            evictor_run_periodicity: 30,
            validate_connections: true,
            expose_primary_keys: false,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_max_connection_idle_time(mut self, seconds: u32) -> Self {
        self.max_connection_idle_time = seconds;
        self
    }

    pub fn with_evictor_run_periodicity(mut self, seconds: u32) -> Self {
        self.evictor_run_periodicity = seconds;
        self
    }

    pub fn with_validate_connections(mut self, validate: bool) -> Self {
        self.validate_connections = validate;
        self
    }

    pub fn with_expose_primary_keys(mut self, expose: bool) -> Self {
        self.expose_primary_keys = expose;
        self
    }
}

/// How a file upload ended when it did not end in success.
#[derive(Debug)]
enum UploadError {
    /// Server-side unzip glitch; worth another attempt.
    Transient(HttpResponse),
    /// The server rejected the payload for good.
    Rejected(HttpResponse),
    Transport(HttpError),
}

impl fmt::Display for UploadError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Transient(response) => {
                write!(formatter, "transient upload failure, status {}", response.status)
            }
            UploadError::Rejected(response) => {
                write!(formatter, "upload rejected with status {}", response.status)
            }
            UploadError::Transport(error) => error.fmt(formatter),
        }
    }
}

fn layer_styles_xml(default_style: &str, other_styles: &[String]) -> String {
    let mut xml = format!(
        "<layer><defaultStyle><name>{}</name></defaultStyle><styles class=\"linked-hash-set\">",
        escape(default_style)
    );
    for style in other_styles {
        xml.push_str(&format!("<style><name>{}</name></style>", escape(style)));
    }
    xml.push_str("</styles></layer>");
    xml
}

fn default_style_xml(style: &str) -> String {
    format!(
        "<layer><defaultStyle><name>{}</name></defaultStyle></layer>",
        escape(style)
    )
}

fn sql_view_xml(
    layer_name: &str,
    srid: u32,
    sql: &str,
    geometry_name: &str,
    geometry_type: &str,
    parameters: &[SqlViewParameter],
) -> String {
    let mut xml = format!(
        "<featureType>\
         <name>{name}</name>\
         <nativeName>{name}</nativeName>\
         <title>{name}</title>\
         <srs>EPSG:{srid}</srs>\
         <enabled>true</enabled>\
         <metadata><entry key=\"JDBC_VIRTUAL_TABLE\"><virtualTable>\
         <name>{name}</name>\
         <sql>{sql}</sql>\
         <escapeSql>false</escapeSql>\
         <geometry><name>{geometry}</name><type>{geometry_type}</type><srid>{srid}</srid></geometry>",
        name = escape(layer_name),
        srid = srid,
        sql = escape(sql),
        geometry = escape(geometry_name),
        geometry_type = escape(geometry_type),
    );
    for parameter in parameters {
        xml.push_str(&format!(
            "<parameter><name>{}</name><defaultValue>{}</defaultValue>\
             <regexpValidator>{}</regexpValidator></parameter>",
            escape(&parameter.name),
            escape(&parameter.default_value),
            escape(&parameter.regexp_validator),
        ));
    }
    xml.push_str("</virtualTable></entry></metadata></featureType>");
    xml
}

fn feature_type_xml(layer_name: &str, table: &str) -> String {
    format!(
        "<featureType><name>{}</name><nativeName>{}</nativeName></featureType>",
        escape(layer_name),
        escape(table)
    )
}

fn coverage_store_xml(name: &str, store_format: &str, workspace: &str) -> String {
    format!(
        "<coverageStore>\
         <name>{}</name>\
         <type>{}</type>\
         <enabled>true</enabled>\
         <workspace><name>{}</name></workspace>\
         </coverageStore>",
        escape(name),
        store_format,
        escape(workspace)
    )
}

fn postgis_store_xml(name: &str, connection: &PostgisConnection) -> String {
    format!(
        "<dataStore>\
         <name>{name}</name>\
         <connectionParameters>\
         <entry key=\"host\">{host}</entry>\
         <entry key=\"port\">{port}</entry>\
         <entry key=\"database\">{database}</entry>\
         <entry key=\"user\">{user}</entry>\
         <entry key=\"passwd\">{passwd}</entry>\
         <entry key=\"dbtype\">postgis</entry>\
         <entry key=\"max connections\">{max_connections}</entry>\
         <entry key=\"Max connection idle time\">{idle_time}</entry>\
         <entry key=\"Evictor run periodicity\">{evictor}</entry>\
         <entry key=\"validate connections\">{validate}</entry>\
         <entry key=\"Expose primary keys\">{expose}</entry>\
         </connectionParameters>\
         </dataStore>",
        name = escape(name),
        host = escape(&connection.host),
        port = connection.port,
        database = escape(&connection.database),
        user = escape(&connection.username),
        passwd = escape(&connection.password),
        max_connections = connection.max_connections,
        idle_time = connection.max_connection_idle_time,
        evictor = connection.evictor_run_periodicity,
        validate = connection.validate_connections,
        expose = connection.expose_primary_keys,
    )
}

fn layer_group_xml(name: &str, layers: &[String], styles: &[String]) -> String {
    let mut xml = format!("<layerGroup><name>{}</name><layers>", escape(name));
    for layer in layers {
        xml.push_str(&format!("<layer>{}</layer>", escape(layer)));
    }
    xml.push_str("</layers><styles>");
    for style in styles {
        xml.push_str(&format!("<style>{}</style>", escape(style)));
    }
    xml.push_str("</styles></layerGroup>");
    xml
}

fn namespace_xml(prefix: &str, uri: &str) -> String {
    format!(
        "<namespace><prefix>{}</prefix><uri>{}</uri></namespace>",
        escape(prefix),
        escape(uri)
    )
}

impl<C: HttpClient> GeoServerEngine<C> {
    /// Push an upload request, retrying transient server-side unzip errors.
    ///
    /// A `201 Created` or a duplicate report counts as success; anything
    /// else comes back for the caller to phrase its own failure.
    fn upload_with_retry(&self, request: &HttpRequest) -> Result<(), UploadError> {
        retry(
            UPLOAD_ATTEMPTS,
            |error| matches!(error, UploadError::Transient(_)),
            || {
                let response = self
                    .client
                    .execute(request.clone())
                    .map_err(UploadError::Transport)?;
                if response.status == 201 {
                    return Ok(());
                }
                let text = response.text().into_owned();
                match classify_server_error(response.status, &text) {
                    ServerErrorKind::Duplicate => {
                        warn!(
                            status = response.status,
                            "server reports the object already exists, continuing"
                        );
                        Ok(())
                    }
                    ServerErrorKind::TransientUpload => Err(UploadError::Transient(response)),
                    _ => Err(UploadError::Rejected(response)),
                }
            },
        )
    }

    /// Set the default and additional styles on a layer.
    ///
    /// Styles that live in the layer's workspace are qualified before the
    /// update so GeoServer does not silently fall back to a global style of
    /// the same name.
    fn apply_layer_styles(
        &self,
        layer_id: &str,
        default_style: &str,
        other_styles: &[String],
    ) -> Result<(), GeoServerError> {
        let (workspace, name) = self.qualify(layer_id)?;
        let known = self.style_names(&workspace)?;
        let qualify_style = |style: &str| {
            if known.iter().any(|candidate| candidate == style) {
                format!("{workspace}:{style}")
            } else {
                style.to_string()
            }
        };

        let default_style = qualify_style(default_style);
        let other_styles: Vec<String> = other_styles
            .iter()
            .map(|style| qualify_style(style))
            .collect();

        let url = self.rest_url(&["layers", &format!("{workspace}:{name}.xml")]);
        let body = layer_styles_xml(&default_style, &other_styles);
        debug!(layer = %name, default_style = %default_style, "updating layer styles");
        let response = self
            .client
            .execute(HttpRequest::put(url).with_body("text/xml", body))?;
        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Update Layer Styles Status Code {}: {}",
                response.status,
                response.text()
            )));
        }
        Ok(())
    }

    /// Replace the styles of a layer and return its refreshed record.
    pub fn update_layer_styles(
        &self,
        layer_id: &str,
        default_style: &str,
        other_styles: &[String],
    ) -> Result<Envelope, GeoServerError> {
        self.apply_layer_styles(layer_id, default_style, other_styles)?;
        self.get_layer(layer_id, None)
    }

    /// Upload a shapefile set and register it as a new data store.
    ///
    /// Unless `overwrite` is set, an existing store of the same name fails
    /// the call before any bytes are moved.
    pub fn create_shapefile_resource(
        &self,
        store_id: &str,
        source: ShapefileSource,
        overwrite: bool,
        charset: Option<&str>,
        default_style: Option<&str>,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(store_id)?;

        if !overwrite && self.store_document(&workspace, &name)?.is_some() {
            return Ok(Envelope::err(format!(
                "There is already a store named {name} in {workspace}"
            )));
        }

        // The resource usually adopts the store name; a prepared zip keeps
        // the name of the shapefile inside it.
        let mut resource_id = name.clone();
        let data = match source {
            ShapefileSource::Base(base) => {
                let mut members = Vec::new();
                for extension in SHAPEFILE_SIDECARS {
                    let path = PathBuf::from(format!("{}.{extension}", base.display()));
                    if !path.exists() {
                        continue;
                    }
                    let data = std::fs::read(&path)
                        .map_err(|source| GeoServerError::file(path.display(), source))?;
                    members.push(ArchiveMember::file(format!("{name}.{extension}"), data));
                }
                pack(&members)?
            }
            ShapefileSource::Zip(path) => {
                let data = std::fs::read(&path)
                    .map_err(|source| GeoServerError::file(path.display(), source))?;
                if !data.starts_with(b"PK") {
                    return Err(GeoServerError::InvalidArgument(format!(
                        "\"{}\" is not a zip archive.",
                        path.display()
                    )));
                }
                if let Some(stem) = path.file_stem() {
                    resource_id = stem.to_string_lossy().into_owned();
                }
                data
            }
            ShapefileSource::Upload(files) => {
                let mut members = Vec::with_capacity(files.len());
                for file in files {
                    let member = match Path::new(&file.file_name).extension() {
                        Some(extension) => format!("{name}.{}", extension.to_string_lossy()),
                        None => name.clone(),
                    };
                    members.push(ArchiveMember::file(member, file.data));
                }
                pack(&members)?
            }
        };

        let url = self.rest_url(&["workspaces", &workspace, "datastores", &name, "file.shp"]);
        let mut request = HttpRequest::put(url)
            .with_header("Accept", "application/xml")
            .with_body("application/zip", data);
        if let Some(charset) = charset {
            request = request.with_query("charset", charset);
        }
        if overwrite {
            request = request.with_query("update", "overwrite");
        }

        match self.upload_with_retry(&request) {
            Ok(()) => info!(store = %name, workspace = %workspace, "uploaded shapefile"),
            Err(UploadError::Transient(response)) | Err(UploadError::Rejected(response)) => {
                return Ok(Envelope::err(format!(
                    "{}({}): {}",
                    response.reason(),
                    response.status,
                    response.text()
                )));
            }
            Err(UploadError::Transport(error)) => return Err(error.into()),
        }

        if let Some(style) = default_style {
            let url = self.rest_url(&["layers", &format!("{workspace}:{resource_id}.xml")]);
            let request =
                HttpRequest::put(url).with_body("application/xml", default_style_xml(style));
            let response = self.client.execute(request)?;
            if response.status != 200 {
                return Ok(Envelope::err(format!(
                    "{}({}): {}",
                    response.reason(),
                    response.status,
                    response.text()
                )));
            }
        }

        self.reload(None, false);
        self.get_resource(&format!("{workspace}:{resource_id}"), Some(&name))
    }

    /// Create an empty coverage store of the given type.
    pub fn create_coverage_store(
        &self,
        store_id: &str,
        coverage_type: CoverageType,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(store_id)?;
        let xml = coverage_store_xml(&name, coverage_type.store_format(), &workspace);
        let url = self.rest_url(&["workspaces", &workspace, "coveragestores"]);
        let response = self.client.execute(
            HttpRequest::post(url)
                .with_header("Accept", "application/xml")
                .with_body("text/xml", xml),
        )?;
        if response.status != 201 {
            return Err(GeoServerError::Remote(format!(
                "Create Coverage Store Status Code {}: {}",
                response.status,
                response.text()
            )));
        }
        self.get_store(store_id)
    }

    /// Upload a raster and publish it as a coverage layer.
    ///
    /// The store is named after the coverage and created by the upload
    /// itself. GRASS grids are converted to Arc/Info ASCII grids on the way
    /// out; other archives and loose rasters upload as-is.
    pub fn create_coverage_layer(
        &self,
        layer_id: &str,
        coverage_type: CoverageType,
        source: CoverageSource,
        default_style: Option<&str>,
        other_styles: &[String],
        overwrite: bool,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, coverage_name) = self.qualify(layer_id)?;
        let store_name = coverage_name.clone();

        if !overwrite && self.store_document(&workspace, &store_name)?.is_some() {
            return Ok(Envelope::err(format!(
                "There is already a store named {store_name} in {workspace}"
            )));
        }

        let payload = stage_coverage(coverage_type, source)?;
        let url = self.rest_url(&[
            "workspaces",
            &workspace,
            "coveragestores",
            &store_name,
            &format!("file.{}", coverage_type.extension()),
        ]);
        let mut request = HttpRequest::put(url)
            .with_header("Accept", "application/xml")
            .with_body(payload.content_type, payload.data);
        // An image mosaic publishes many coverages; naming one is wrong.
        if coverage_type != CoverageType::ImageMosaic {
            request = request.with_query("coverageName", coverage_name.as_str());
        }
        if overwrite {
            request = request.with_query("update", "overwrite");
        }

        match self.upload_with_retry(&request) {
            Ok(()) => info!(coverage = %coverage_name, workspace = %workspace, "uploaded coverage"),
            Err(UploadError::Transient(response)) | Err(UploadError::Rejected(response)) => {
                return Err(GeoServerError::Remote(format!(
                    "Create Coverage Status Code {}: {}",
                    response.status,
                    response.text()
                )));
            }
            Err(UploadError::Transport(error)) => return Err(error.into()),
        }

        let qualified = format!("{workspace}:{coverage_name}");
        if let Some(style) = default_style {
            self.apply_layer_styles(&qualified, style, other_styles)?;
        }
        self.reload(None, false);
        self.get_layer(&qualified, Some(&store_name))
    }

    /// Publish a SQL view as a feature type on a PostGIS store.
    ///
    /// The view is registered first, then the tile cache layer is synced,
    /// styles applied and the catalog reloaded before the final fetch.
    #[allow(clippy::too_many_arguments)]
    pub fn create_sql_view_layer(
        &self,
        store_id: &str,
        layer_name: &str,
        geometry_type: &str,
        srid: u32,
        sql: &str,
        default_style: &str,
        options: &SqlViewOptions,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, store_name) = self.qualify(store_id)?;
        let layer_id = if layer_name.contains(':') {
            layer_name.to_string()
        } else {
            format!("{workspace}:{layer_name}")
        };

        let xml = sql_view_xml(
            layer_name,
            srid,
            sql,
            &options.geometry_name,
            geometry_type,
            &options.parameters,
        );
        let url = self.rest_url(&["workspaces", &workspace, "datastores", &store_name, "featuretypes"]);
        let request = HttpRequest::post(url).with_body("text/xml", xml);
        match self.upload_with_retry(&request) {
            Ok(()) => info!(layer = %layer_id, "created sql view feature type"),
            Err(UploadError::Transient(response)) | Err(UploadError::Rejected(response)) => {
                return Err(GeoServerError::Remote(format!(
                    "Create Feature Type Status Code {}: {}",
                    response.status,
                    response.text()
                )));
            }
            Err(UploadError::Transport(error)) => return Err(error.into()),
        }

        if options.enable_gwc {
            self.sync_tile_cache_layer(&layer_id, options.gwc_method)?;
        }
        self.apply_layer_styles(&layer_id, default_style, &options.other_styles)?;
        self.reload(None, options.reload_public);
        self.get_layer(&layer_id, Some(&store_name))
    }

    /// Create a data store backed by a PostGIS database.
    pub fn create_postgis_store(
        &self,
        store_id: &str,
        connection: &PostgisConnection,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(store_id)?;
        let url = self.rest_url(&["workspaces", &workspace, "datastores"]);
        let request = HttpRequest::post(url)
            .with_header("Accept", "application/xml")
            .with_body("text/xml", postgis_store_xml(&name, connection));
        let response = self.client.execute(request)?;
        if response.status != 201 {
            return Err(GeoServerError::Remote(format!(
                "Create Postgis Store Status Code {}: {}",
                response.status,
                response.text()
            )));
        }
        info!(store = %name, workspace = %workspace, "created postgis store");
        self.get_store(store_id)
    }

    /// Publish a table of an existing PostGIS store as a feature type.
    pub fn create_layer_from_postgis_store(
        &self,
        store_id: &str,
        table: &str,
        layer_name: Option<&str>,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, store_name) = self.qualify(store_id)?;

        let store = self.get_store(store_id)?;
        if !store.is_success() {
            return Ok(Envelope::err(format!(
                "There is no store named '{store_name}' in {workspace}"
            )));
        }

        let layer_name = layer_name.unwrap_or(table);
        let url = self.rest_url(&["workspaces", &workspace, "datastores", &store_name, "featuretypes"]);
        let request = HttpRequest::post(url)
            .with_header("Accept", "application/xml")
            .with_body("text/xml", feature_type_xml(layer_name, table));
        let response = self.client.execute(request)?;
        if response.status != 201 {
            return Ok(Envelope::err(format!(
                "{}({}): {}",
                response.reason(),
                response.status,
                response.text()
            )));
        }
        self.get_store(store_id)
    }

    /// Group existing layers under a single name.
    ///
    /// `layers` and `styles` pair up positionally, so their lengths must
    /// match.
    pub fn create_layer_group(
        &self,
        layer_group_id: &str,
        layers: &[String],
        styles: &[String],
    ) -> Result<Envelope, GeoServerError> {
        if layers.len() != styles.len() {
            return Err(GeoServerError::InvalidArgument(
                "The number of layers and the number of styles must be the same.".to_string(),
            ));
        }

        let (workspace, name) = self.qualify(layer_group_id)?;
        let url = self.rest_url(&["workspaces", &workspace, "layergroups.json"]);
        let request =
            HttpRequest::post(url).with_body("text/xml", layer_group_xml(&name, layers, styles));
        let response = self.client.execute(request)?;
        if response.status != 201 {
            return Err(GeoServerError::Remote(format!(
                "Create Layer Group Status Code {}: {}",
                response.status,
                response.text()
            )));
        }
        self.get_layer_group(layer_group_id)
    }

    /// Create a workspace with the given namespace URI.
    pub fn create_workspace(
        &self,
        workspace_id: &str,
        uri: &str,
    ) -> Result<Envelope, GeoServerError> {
        let url = self.rest_url(&["namespaces"]);
        let request = HttpRequest::post(url).with_body("text/xml", namespace_xml(workspace_id, uri));
        let response = self.client.execute(request)?;
        if !(200..300).contains(&response.status) {
            return Ok(Envelope::err(format!(
                "Tried to create workspace but got {}: {}",
                response.status,
                response.text()
            )));
        }
        info!(workspace = %workspace_id, "created workspace");
        self.get_workspace(workspace_id)
    }

    /// Upload an SLD document as a new style.
    ///
    /// With `overwrite` the existing style is purged first; a style still
    /// referenced by a layer refuses deletion and fails the call. Rendering
    /// warnings from the server still count as a created style.
    pub fn create_style(
        &self,
        style_id: &str,
        sld_body: &str,
        overwrite: bool,
    ) -> Result<Envelope, GeoServerError> {
        // Styles without a workspace are global; no default resolution here.
        let Identifier {
            workspace,
            name: style_name,
        } = Identifier::parse(style_id);

        if overwrite {
            match self.delete_style(style_id, true) {
                Ok(_) => {}
                Err(error) => {
                    let message = error.to_string();
                    if message.contains("referenced by existing") {
                        return Err(error);
                    }
                    warn!(style = %style_name, "could not delete existing style: {message}");
                }
            }
        }

        let url = match &workspace {
            Some(workspace) => self.rest_url(&["workspaces", workspace, "styles"]),
            None => self.rest_url(&["styles"]),
        };
        let request = HttpRequest::post(url)
            .with_query("name", style_name.as_str())
            .with_body("application/vnd.ogc.sld+xml", sld_body.as_bytes().to_vec());

        match self.upload_with_retry(&request) {
            Ok(()) => {}
            Err(UploadError::Transient(response)) | Err(UploadError::Rejected(response)) => {
                let text = response.text().into_owned();
                if classify_server_error(response.status, &text) == ServerErrorKind::StyleWarning {
                    let warning = format!("Created style {style_name} with warnings: {text}");
                    warn!("{warning}");
                    return Ok(Envelope::ok(warning));
                }
                return Err(GeoServerError::Remote(format!(
                    "Create Style Status Code {}: {}",
                    response.status, text
                )));
            }
            Err(UploadError::Transport(error)) => return Err(error.into()),
        }

        self.get_style(style_id)
    }
}
