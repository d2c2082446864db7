//! GeoServer catalog client.
//!
//! [`GeoServerEngine`] wraps the catalog REST API plus its GeoWebCache
//! sibling. Retrieval and listing return flattened dictionaries with
//! derived OGC service URLs, publishing uploads payloads and re-fetches
//! the stored object, and maintenance covers catalog reloads, tile-cache
//! seeding and deletions.
//!
//! Submodules split the work: [`publish`] holds the multi-step publishing
//! workflows, [`gwc`] the tile-cache operations, [`coverage`] raster
//! payload staging, [`object`]/[`transcribe`] the document model, and
//! [`urls`] endpoint derivation.
//!
//! Identifiers follow the `"workspace:name"` convention throughout; most
//! operations resolve a missing workspace against the catalog default,
//! while styles and layer groups without one address the global
//! collections instead.

pub mod config;
pub mod coverage;
pub mod error;
pub mod gwc;
pub mod object;
pub mod publish;
pub mod transcribe;
pub mod urls;

use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};
use url::Url;

use crate::envelope::Envelope;
use crate::http::{HttpClient, HttpRequest, ReqwestClient};
use crate::identifier::Identifier;
use crate::xmlutil;

pub use config::GeoServerConfig;
pub use coverage::{CoveragePayload, CoverageSource, CoverageType};
pub use error::GeoServerError;
pub use gwc::{GwcMethod, KillTarget, SeedOptions, TileCacheOp};
pub use publish::{
    PostgisConnection, ShapefileSource, SqlViewOptions, SqlViewParameter, UploadFile,
};

use error::WARNING_STATUS_CODES;
use object::{Bounds, CatalogObject, ResourceKind, StoreKind};

/// Marker string the catalog root page must contain to pass validation.
const CATALOG_MARKER: &str = "Geoserver Configuration API";

/// Attempts per node when reloading the GeoWebCache configuration.
const GWC_RELOAD_ATTEMPTS: u32 = 3;

/// Extent returned when a feature type reports no bounding box at all,
/// roughly covering the conterminous United States.
const DEFAULT_EXTENT: [f64; 4] = [-128.583984375, 22.1874049914, -64.423828125, 52.1065051908];

/// Client for a GeoServer catalog.
///
/// Generic over the HTTP transport so tests can script exchanges; the
/// default transport is a blocking reqwest client carrying the
/// configured basic-auth credentials.
pub struct GeoServerEngine<C: HttpClient = ReqwestClient> {
    pub(crate) config: GeoServerConfig,
    pub(crate) client: C,
}

impl GeoServerEngine {
    /// Build an engine talking to a live catalog.
    pub fn new(config: GeoServerConfig) -> Result<Self, GeoServerError> {
        let client = ReqwestClient::with_timeout(config.timeout)?
            .with_credentials(&config.username, &config.password);
        Ok(GeoServerEngine { config, client })
    }
}

impl<C: HttpClient> GeoServerEngine<C> {
    /// Build an engine over a caller-supplied transport.
    pub fn with_client(config: GeoServerConfig, client: C) -> Self {
        GeoServerEngine { config, client }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &GeoServerConfig {
        &self.config
    }

    /// REST endpoint, switched to the public address when one is
    /// configured and asked for.
    fn base_endpoint(&self, public: bool) -> &str {
        if public {
            if let Some(endpoint) = &self.config.public_endpoint {
                return endpoint;
            }
        }
        &self.config.endpoint
    }

    fn rest_url(&self, segments: &[&str]) -> String {
        urls::rest_url(&self.config.endpoint, segments)
    }

    /// GeoWebCache REST endpoint derived from the catalog endpoint.
    pub fn gwc_endpoint(&self, public: bool) -> String {
        urls::gwc_endpoint(self.base_endpoint(public))
    }

    /// OWS service endpoint of a workspace.
    pub fn ows_endpoint(&self, workspace: &str, public: bool) -> String {
        urls::ows_endpoint(self.base_endpoint(public), workspace)
    }

    /// WMS service endpoint.
    pub fn wms_endpoint(&self, public: bool) -> String {
        urls::wms_endpoint(self.base_endpoint(public))
    }

    /// Check that the endpoint answers and the credentials are accepted.
    pub fn validate(&self) -> Result<(), GeoServerError> {
        let endpoint = &self.config.endpoint;
        if Url::parse(endpoint).is_err() {
            return Err(GeoServerError::Validation(format!(
                "The URL \"{endpoint}\" provided for the GeoServer spatial dataset service \
                 endpoint is invalid."
            )));
        }

        let response = self.client.execute(HttpRequest::get(endpoint))?;
        if response.status == 401 {
            return Err(GeoServerError::Validation(
                "The username and password of the GeoServer spatial dataset service engine \
                 are not valid."
                    .to_string(),
            ));
        }
        if response.status != 200 || !response.text().contains(CATALOG_MARKER) {
            return Err(GeoServerError::Validation(format!(
                "The URL \"{endpoint}\" is not a valid GeoServer spatial dataset service \
                 endpoint."
            )));
        }
        Ok(())
    }

    /// Name of the catalog's default workspace.
    pub fn default_workspace(&self) -> Result<String, GeoServerError> {
        let url = self.rest_url(&["workspaces", "default.json"]);
        let response = self.client.execute(HttpRequest::get(url))?;
        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Get Default Workspace Status Code {}: {}",
                response.status,
                response.text()
            )));
        }
        let document = response
            .json()
            .map_err(|e| GeoServerError::Decode(e.to_string()))?;
        document
            .pointer("/workspace/name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                GeoServerError::Decode("default workspace document has no name".to_string())
            })
    }

    /// Split an identifier, resolving a missing workspace against the
    /// catalog default.
    fn qualify(&self, identifier: &str) -> Result<(String, String), GeoServerError> {
        let Identifier { workspace, name } = Identifier::parse(identifier);
        let workspace = match workspace {
            Some(workspace) => workspace,
            None => self.default_workspace()?,
        };
        Ok((workspace, name))
    }

    /// Reload the in-memory catalog configuration on every node.
    ///
    /// Unreachable nodes are logged and skipped; nodes that answer with an
    /// error status fail the envelope and their messages are collected.
    pub fn reload(&self, ports: Option<&[u16]>, public: bool) -> Envelope {
        let ports = ports.or(self.config.node_ports.as_deref());
        let nodes = urls::node_endpoints(self.base_endpoint(public), ports);
        debug!(?nodes, "catalog reload");

        let mut errors: Vec<String> = Vec::new();
        for node in &nodes {
            match self.client.execute(HttpRequest::post(format!("{node}reload"))) {
                Ok(response) if response.status == 200 => {}
                Ok(response) => {
                    let message = format!(
                        "Catalog Reload Status Code {}: {}",
                        response.status,
                        response.text()
                    );
                    error!("{message}");
                    errors.push(message);
                }
                Err(transport) => {
                    warn!(%transport, "Catalog could not be reloaded on a GeoServer node.");
                }
            }
        }

        if errors.is_empty() {
            Envelope::ok(Value::Null)
        } else {
            Envelope::err(errors.join("; "))
        }
    }

    /// Reload the GeoWebCache configuration on every node.
    ///
    /// Error statuses are retried a few times per node before counting as
    /// a failure; a node that cannot be reached at all is skipped after a
    /// warning.
    pub fn gwc_reload(&self, ports: Option<&[u16]>, public: bool) -> Envelope {
        let ports = ports.or(self.config.node_ports.as_deref());
        let nodes = urls::node_endpoints(&self.gwc_endpoint(public), ports);
        debug!(?nodes, "tile cache reload");

        let mut errors: Vec<String> = Vec::new();
        for node in &nodes {
            let url = format!("{node}reload");
            let mut attempts = GWC_RELOAD_ATTEMPTS;
            while attempts > 0 {
                match self.client.execute(HttpRequest::post(&url)) {
                    Ok(response) if response.status == 200 => break,
                    Ok(response) => {
                        let message = format!(
                            "GeoWebCache Reload Status Code {}: {}",
                            response.status,
                            response.text()
                        );
                        error!("{message}");
                        attempts -= 1;
                        if attempts == 0 {
                            errors.push(message);
                        }
                    }
                    Err(transport) => {
                        warn!(%transport, "GeoWebCache could not be reloaded on a GeoServer node.");
                        break;
                    }
                }
            }
        }

        if errors.is_empty() {
            Envelope::ok(Value::Null)
        } else {
            Envelope::err(errors.join("; "))
        }
    }

    /// Retrieve a workspace record.
    pub fn get_workspace(&self, workspace_id: &str) -> Result<Envelope, GeoServerError> {
        let url = self.rest_url(&["workspaces", &format!("{workspace_id}.json")]);
        self.get_object(url, format!("Workspace \"{workspace_id}\" not found."))
    }

    /// Retrieve a data or coverage store record.
    pub fn get_store(&self, store_id: &str) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(store_id)?;
        let Some((_, document)) = self.store_document(&workspace, &name)? else {
            return Ok(Envelope::err(format!("Store \"{store_id}\" not found.")));
        };
        let object = CatalogObject::from_document(&document)?;
        Ok(Envelope::ok(transcribe::transcribe(
            &object,
            &self.config.endpoint,
        )))
    }

    /// Retrieve a feature type or coverage record.
    ///
    /// Without a store every store of the workspace is searched.
    pub fn get_resource(
        &self,
        resource_id: &str,
        store: Option<&str>,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(resource_id)?;
        let Some((_, document)) = self.resource_document(&workspace, &name, store)? else {
            return Ok(Envelope::err(format!(
                "Resource \"{resource_id}\" not found."
            )));
        };
        let object = CatalogObject::from_document(&document)?;
        Ok(Envelope::ok(transcribe::transcribe(
            &object,
            &self.config.endpoint,
        )))
    }

    /// Retrieve a layer with its styles, derived WMS URLs and tile-cache
    /// configuration.
    ///
    /// The backing resource is fetched for bounding-box derivation when it
    /// can be located; `store` narrows that lookup to one store.
    pub fn get_layer(
        &self,
        layer_id: &str,
        store: Option<&str>,
    ) -> Result<Envelope, GeoServerError> {
        let url = self.rest_url(&["layers", &format!("{layer_id}.json")]);
        let Some(document) = self.fetch_document(url)? else {
            return Ok(Envelope::err(format!("Layer \"{layer_id}\" not found.")));
        };
        let object = CatalogObject::from_document(&document)?;
        let CatalogObject::Layer(layer) = object else {
            return Err(GeoServerError::Decode("expected a layer document".to_string()));
        };

        let resource = self.layer_resource(&layer, store)?;
        let mut dictionary =
            transcribe::transcribe_layer(&layer, resource.as_ref(), &self.config.endpoint);

        // Tile-cache properties live in GeoWebCache, not the main catalog.
        let gwc_url = format!("{}layers/{}.xml", self.gwc_endpoint(false), layer_id);
        let response = self.client.execute(HttpRequest::get(gwc_url))?;
        if response.status == 200 {
            let value = xmlutil::xml_to_value(&response.text())
                .map_err(|e| GeoServerError::Decode(e.to_string()))?;
            if let (Value::Object(map), Some(cached)) =
                (&mut dictionary, value.get("GeoServerLayer"))
            {
                map.insert("tile_caching".to_string(), cached.clone());
            }
        }
        Ok(Envelope::ok(dictionary))
    }

    /// Retrieve a layer group record.
    pub fn get_layer_group(&self, layer_group_id: &str) -> Result<Envelope, GeoServerError> {
        let Identifier { workspace, name } = Identifier::parse(layer_group_id);
        let url = match &workspace {
            Some(workspace) => {
                self.rest_url(&["workspaces", workspace, "layergroups", &format!("{name}.json")])
            }
            None => self.rest_url(&["layergroups", &format!("{name}.json")]),
        };
        self.get_object(url, format!("Layer Group \"{layer_group_id}\" not found."))
    }

    /// Retrieve a style record.
    ///
    /// An unqualified identifier addresses the global style collection.
    pub fn get_style(&self, style_id: &str) -> Result<Envelope, GeoServerError> {
        let Identifier { workspace, name } = Identifier::parse(style_id);
        let url = match &workspace {
            Some(workspace) => {
                self.rest_url(&["workspaces", workspace, "styles", &format!("{name}.json")])
            }
            None => self.rest_url(&["styles", &format!("{name}.json")]),
        };
        self.get_object(url, format!("Style \"{style_id}\" not found."))
    }

    /// Extent of a feature type, optionally buffered, as
    /// `[minx, miny, maxx, maxy]`.
    pub fn get_layer_extent(
        &self,
        store_id: &str,
        feature_name: &str,
        native: bool,
        buffer_factor: f64,
    ) -> Result<[f64; 4], GeoServerError> {
        let (workspace, store) = self.qualify(store_id)?;
        let url = self.rest_url(&[
            "workspaces",
            &workspace,
            "datastores",
            &store,
            "featuretypes",
            &format!("{feature_name}.json"),
        ]);
        let response = self.client.execute(HttpRequest::get(url))?;
        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Get Layer Extent Status Code {}: {}",
                response.status,
                response.text()
            )));
        }
        let document = response
            .json()
            .map_err(|e| GeoServerError::Decode(e.to_string()))?;

        let key = if native { "nativeBoundingBox" } else { "latLonBoundingBox" };
        let bounds = document
            .pointer(&format!("/featureType/{key}"))
            .and_then(Bounds::parse);

        Ok(match bounds {
            Some(bounds) => [
                bounds.minx / buffer_factor,
                bounds.miny / buffer_factor,
                bounds.maxx * buffer_factor,
                bounds.maxy * buffer_factor,
            ],
            None => DEFAULT_EXTENT,
        })
    }

    /// List workspaces, as names or full records.
    pub fn list_workspaces(&self, with_properties: bool) -> Result<Envelope, GeoServerError> {
        let members = self.collection_members(
            self.rest_url(&["workspaces.json"]),
            "workspaces",
            "workspace",
            "List Workspaces",
        )?;
        self.list_envelope(tag_members("workspace", members), with_properties)
    }

    /// List the stores of a workspace, or of every workspace.
    pub fn list_stores(
        &self,
        workspace: Option<&str>,
        with_properties: bool,
    ) -> Result<Envelope, GeoServerError> {
        let workspaces = match workspace {
            Some(workspace) => vec![workspace.to_string()],
            None => self.workspace_names()?,
        };
        let named = workspace.is_some();

        let mut members = Vec::new();
        for workspace in &workspaces {
            for kind in [StoreKind::Data, StoreKind::Coverage] {
                let (stores, _) = store_family(kind);
                let url = self.rest_url(&["workspaces", workspace, &format!("{stores}.json")]);
                let response = self.client.execute(HttpRequest::get(url))?;
                if response.status != 200 {
                    if named {
                        return Ok(Envelope::err(format!("Invalid workspace \"{workspace}\".")));
                    }
                    debug!(workspace = %workspace, status = response.status, "store listing skipped");
                    continue;
                }
                let document = response
                    .json()
                    .map_err(|e| GeoServerError::Decode(e.to_string()))?;
                let wrapper = format!("{}s", kind.as_str());
                members.extend(
                    document
                        .get(&wrapper)
                        .map(|value| object::collection(value, kind.as_str()))
                        .unwrap_or_default()
                        .into_iter()
                        .map(|item| (kind.as_str(), item)),
                );
            }
        }
        self.list_envelope(members, with_properties)
    }

    /// List feature types and coverages, crawling stores as needed.
    ///
    /// `workspace` and `store` narrow the crawl; without them every store
    /// of every workspace is visited.
    pub fn list_resources(
        &self,
        workspace: Option<&str>,
        store: Option<&str>,
        with_properties: bool,
    ) -> Result<Envelope, GeoServerError> {
        let workspaces = match workspace {
            Some(workspace) => vec![workspace.to_string()],
            None => self.workspace_names()?,
        };

        let mut members = Vec::new();
        for workspace in &workspaces {
            for (kind, member) in [
                (StoreKind::Data, "featureType"),
                (StoreKind::Coverage, "coverage"),
            ] {
                let (stores, resources) = store_family(kind);
                let store_names = match store {
                    Some(store) => vec![store.to_string()],
                    None => self.store_names(workspace, kind)?,
                };
                let wrapper = format!("{member}s");
                for store in &store_names {
                    let url = self.rest_url(&[
                        "workspaces",
                        workspace,
                        stores,
                        store,
                        &format!("{resources}.json"),
                    ]);
                    let Some(document) = self.fetch_document(url)? else {
                        continue;
                    };
                    members.extend(
                        document
                            .get(&wrapper)
                            .map(|value| object::collection(value, member))
                            .unwrap_or_default()
                            .into_iter()
                            .map(|item| (member, item)),
                    );
                }
            }
        }
        self.list_envelope(members, with_properties)
    }

    /// List all layers.
    pub fn list_layers(&self, with_properties: bool) -> Result<Envelope, GeoServerError> {
        let members = self.collection_members(
            self.rest_url(&["layers.json"]),
            "layers",
            "layer",
            "List Layers",
        )?;
        self.list_envelope(tag_members("layer", members), with_properties)
    }

    /// List all layer groups.
    pub fn list_layer_groups(&self, with_properties: bool) -> Result<Envelope, GeoServerError> {
        let members = self.collection_members(
            self.rest_url(&["layergroups.json"]),
            "layerGroups",
            "layerGroup",
            "List Layer Groups",
        )?;
        self.list_envelope(tag_members("layerGroup", members), with_properties)
    }

    /// List styles, globally or per workspace.
    pub fn list_styles(
        &self,
        workspace: Option<&str>,
        with_properties: bool,
    ) -> Result<Envelope, GeoServerError> {
        let url = match workspace {
            Some(workspace) => self.rest_url(&["workspaces", workspace, "styles.json"]),
            None => self.rest_url(&["styles.json"]),
        };
        let members = self.collection_members(url, "styles", "style", "List Styles")?;
        self.list_envelope(tag_members("style", members), with_properties)
    }

    /// Change attributes of a resource and save it back.
    ///
    /// `changes` is a JSON object of attribute/value pairs merged into the
    /// stored document before the save.
    pub fn update_resource(
        &self,
        resource_id: &str,
        store: Option<&str>,
        changes: &Value,
    ) -> Result<Envelope, GeoServerError> {
        let changes = require_object(changes)?;
        let (workspace, name) = self.qualify(resource_id)?;
        let Some((url, mut document)) = self.resource_document(&workspace, &name, store)? else {
            return Ok(Envelope::err(format!(
                "Resource \"{resource_id}\" not found."
            )));
        };

        if let Some(target) = document_body(&mut document) {
            merge_changes(target, changes);
        }
        if let Some(envelope) = self.save_document(&url, &document)? {
            return Ok(envelope);
        }

        let object = CatalogObject::from_document(&document)?;
        Ok(Envelope::ok(transcribe::transcribe(
            &object,
            &self.config.endpoint,
        )))
    }

    /// Change attributes of a layer, including its tile-cache block.
    ///
    /// `tile_caching` is not part of the main catalog document; it is
    /// pushed to GeoWebCache separately after the layer itself saves.
    pub fn update_layer(
        &self,
        layer_id: &str,
        changes: &Value,
        tile_caching: Option<&Value>,
    ) -> Result<Envelope, GeoServerError> {
        let changes = require_object(changes)?;
        let url = self.rest_url(&["layers", &format!("{layer_id}.json")]);
        let Some(mut document) = self.fetch_document(url.clone())? else {
            return Ok(Envelope::err(format!("Layer \"{layer_id}\" not found.")));
        };

        if let Some(target) = document_body(&mut document) {
            merge_changes(target, changes);
        }
        if let Some(envelope) = self.save_document(&url, &document)? {
            return Ok(envelope);
        }

        let object = CatalogObject::from_document(&document)?;
        let CatalogObject::Layer(layer) = object else {
            return Err(GeoServerError::Decode("expected a layer document".to_string()));
        };
        let mut dictionary = transcribe::transcribe_layer(&layer, None, &self.config.endpoint);

        if let Some(tile_caching) = tile_caching {
            let mut wrapped = Map::new();
            wrapped.insert("GeoServerLayer".to_string(), tile_caching.clone());
            let xml = xmlutil::value_to_xml(&Value::Object(wrapped))
                .map_err(|e| GeoServerError::Decode(e.to_string()))?;
            let gwc_url = format!("{}layers/{}.xml", self.gwc_endpoint(false), layer_id);
            let response = self
                .client
                .execute(HttpRequest::post(gwc_url).with_body("text/xml", xml))?;
            if response.status != 200 {
                return Ok(Envelope::err(response.text().into_owned()));
            }
            if let Value::Object(map) = &mut dictionary {
                map.insert("tile_caching".to_string(), tile_caching.clone());
            }
        }
        Ok(Envelope::ok(dictionary))
    }

    /// Change attributes of a layer group and save it back.
    pub fn update_layer_group(
        &self,
        layer_group_id: &str,
        changes: &Value,
    ) -> Result<Envelope, GeoServerError> {
        let changes = require_object(changes)?;
        let Identifier { workspace, name } = Identifier::parse(layer_group_id);
        let url = match &workspace {
            Some(workspace) => {
                self.rest_url(&["workspaces", workspace, "layergroups", &format!("{name}.json")])
            }
            None => self.rest_url(&["layergroups", &format!("{name}.json")]),
        };
        let Some(mut document) = self.fetch_document(url.clone())? else {
            return Ok(Envelope::err(format!(
                "Layer Group \"{layer_group_id}\" not found."
            )));
        };

        if let Some(target) = document_body(&mut document) {
            merge_changes(target, changes);
        }
        if let Some(envelope) = self.save_document(&url, &document)? {
            return Ok(envelope);
        }

        let object = CatalogObject::from_document(&document)?;
        Ok(Envelope::ok(transcribe::transcribe(
            &object,
            &self.config.endpoint,
        )))
    }

    /// Delete a workspace.
    pub fn delete_workspace(
        &self,
        workspace_id: &str,
        purge: bool,
        recurse: bool,
    ) -> Result<Envelope, GeoServerError> {
        let url = self.rest_url(&["workspaces", &format!("{workspace_id}.json")]);
        if self.fetch_document(url.clone())?.is_none() {
            return Ok(Envelope::err(format!(
                "GeoServer object does not exist: \"{workspace_id}\"."
            )));
        }
        self.delete_envelope(
            HttpRequest::delete(url)
                .with_query("purge", bool_str(purge))
                .with_query("recurse", bool_str(recurse)),
        )
    }

    /// Delete a data or coverage store.
    pub fn delete_store(
        &self,
        store_id: &str,
        purge: bool,
        recurse: bool,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(store_id)?;
        let Some((kind, _)) = self.store_document(&workspace, &name)? else {
            return Ok(Envelope::err(format!(
                "GeoServer object does not exist: \"{store_id}\"."
            )));
        };
        let (stores, _) = store_family(kind);
        let url = self.rest_url(&["workspaces", &workspace, stores, &format!("{name}.json")]);
        self.delete_envelope(
            HttpRequest::delete(url)
                .with_query("purge", bool_str(purge))
                .with_query("recurse", bool_str(recurse)),
        )
    }

    /// Delete a feature type or coverage.
    pub fn delete_resource(
        &self,
        resource_id: &str,
        store: Option<&str>,
        purge: bool,
        recurse: bool,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(resource_id)?;
        let Some((url, _)) = self.resource_document(&workspace, &name, store)? else {
            return Ok(Envelope::err(format!(
                "GeoServer object does not exist: \"{name}\"."
            )));
        };
        self.delete_envelope(
            HttpRequest::delete(url)
                .with_query("purge", bool_str(purge))
                .with_query("recurse", bool_str(recurse)),
        )
    }

    /// Delete a feature type registered on a data store.
    pub fn delete_layer(
        &self,
        layer_id: &str,
        datastore: &str,
        recurse: bool,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(layer_id)?;
        let url = self.rest_url(&[
            "workspaces",
            &workspace,
            "datastores",
            datastore,
            "featuretypes",
            &name,
        ]);
        self.delete_with_tolerance(
            HttpRequest::delete(url)
                .with_header("Content-type", "application/json")
                .with_query("recurse", bool_str(recurse)),
            "Delete Layer",
        )
    }

    /// Delete a layer group, tolerating one that is already gone.
    pub fn delete_layer_group(&self, layer_group_id: &str) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(layer_group_id)?;
        let url = self.rest_url(&["workspaces", &workspace, "layergroups", &name]);
        let response = self
            .client
            .execute(HttpRequest::delete(url).with_query("recurse", "true"))?;
        if response.status != 200 {
            let text = response.text().into_owned();
            if response.status == 404 && text.contains("No such layer group") {
                debug!(group = %name, "layer group already absent");
            } else {
                return Err(GeoServerError::Remote(format!(
                    "Delete Layer Group Status Code {}: {}",
                    response.status, text
                )));
            }
        }
        Ok(Envelope::ok(Value::Null))
    }

    /// Delete a coverage store.
    pub fn delete_coverage_store(
        &self,
        store_id: &str,
        recurse: bool,
        purge: bool,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(store_id)?;
        let url = self.rest_url(&["workspaces", &workspace, "coveragestores", &name]);
        self.delete_with_tolerance(
            HttpRequest::delete(url)
                .with_query("recurse", bool_str(recurse))
                .with_query("purge", bool_str(purge)),
            "Delete Coverage Store",
        )
    }

    /// Delete a style, optionally purging the underlying SLD file.
    pub fn delete_style(&self, style_id: &str, purge: bool) -> Result<Envelope, GeoServerError> {
        let Identifier { workspace, name } = Identifier::parse(style_id);
        let url = match &workspace {
            Some(workspace) => self.rest_url(&["workspaces", workspace, "styles", &name]),
            None => self.rest_url(&["styles", &name]),
        };
        self.delete_with_tolerance(
            HttpRequest::delete(url).with_query("purge", bool_str(purge)),
            "Delete Style",
        )
    }

    /// Turn on the time dimension of a coverage, listing ISO8601 values.
    pub fn enable_time_dimension(&self, coverage_id: &str) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(coverage_id)?;
        let url = self.rest_url(&[
            "workspaces",
            &workspace,
            "coveragestores",
            &name,
            "coverages",
            &name,
        ]);
        let xml = "<coverage>\
                   <enabled>true</enabled>\
                   <metadata><entry key=\"time\"><dimensionInfo>\
                   <enabled>true</enabled>\
                   <presentation>LIST</presentation>\
                   <units>ISO8601</units>\
                   <defaultValue/>\
                   </dimensionInfo></entry></metadata>\
                   </coverage>";
        let response = self
            .client
            .execute(HttpRequest::put(url).with_body("text/xml", xml))?;
        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Enable Time Dimension Layer {} with Status Code {}: {}",
                name,
                response.status,
                response.text()
            )));
        }
        Ok(Envelope::ok(Value::Null))
    }

    /// GET a JSON document, `None` when the server answers non-200.
    fn fetch_document(&self, url: String) -> Result<Option<Value>, GeoServerError> {
        let response = self.client.execute(HttpRequest::get(url))?;
        if response.status != 200 {
            return Ok(None);
        }
        let document = response
            .json()
            .map_err(|e| GeoServerError::Decode(e.to_string()))?;
        Ok(Some(document))
    }

    /// Fetch, parse and transcribe one catalog object.
    fn get_object(&self, url: String, missing: String) -> Result<Envelope, GeoServerError> {
        let Some(document) = self.fetch_document(url)? else {
            return Ok(Envelope::err(missing));
        };
        let object = CatalogObject::from_document(&document)?;
        Ok(Envelope::ok(transcribe::transcribe(
            &object,
            &self.config.endpoint,
        )))
    }

    /// PUT a document back, reporting a failed save inside an envelope.
    fn save_document(
        &self,
        url: &str,
        document: &Value,
    ) -> Result<Option<Envelope>, GeoServerError> {
        let body = serde_json::to_vec(document).map_err(|e| GeoServerError::Decode(e.to_string()))?;
        let response = self
            .client
            .execute(HttpRequest::put(url).with_body("application/json", body))?;
        if !response.is_success() {
            return Ok(Some(Envelope::err(format!(
                "{}({}): {}",
                response.reason(),
                response.status,
                response.text()
            ))));
        }
        Ok(None)
    }

    /// Raw store document of either kind, data stores probed first.
    fn store_document(
        &self,
        workspace: &str,
        name: &str,
    ) -> Result<Option<(StoreKind, Value)>, GeoServerError> {
        for kind in [StoreKind::Data, StoreKind::Coverage] {
            let (stores, _) = store_family(kind);
            let url = self.rest_url(&["workspaces", workspace, stores, &format!("{name}.json")]);
            if let Some(document) = self.fetch_document(url)? {
                return Ok(Some((kind, document)));
            }
        }
        Ok(None)
    }

    /// Locate a resource document and the URL it was fetched from.
    ///
    /// With a store the two candidate URLs are probed directly; without
    /// one every store of the workspace is crawled.
    fn resource_document(
        &self,
        workspace: &str,
        name: &str,
        store: Option<&str>,
    ) -> Result<Option<(String, Value)>, GeoServerError> {
        for kind in [StoreKind::Data, StoreKind::Coverage] {
            let (stores, resources) = store_family(kind);
            let store_names = match store {
                Some(store) => vec![store.to_string()],
                None => self.store_names(workspace, kind)?,
            };
            for store in &store_names {
                let url = self.rest_url(&[
                    "workspaces",
                    workspace,
                    stores,
                    store,
                    resources,
                    &format!("{name}.json"),
                ]);
                if let Some(document) = self.fetch_document(url.clone())? {
                    return Ok(Some((url, document)));
                }
            }
        }
        Ok(None)
    }

    /// Names of the stores of one kind in a workspace.
    fn store_names(&self, workspace: &str, kind: StoreKind) -> Result<Vec<String>, GeoServerError> {
        let (stores, _) = store_family(kind);
        let url = self.rest_url(&["workspaces", workspace, &format!("{stores}.json")]);
        let Some(document) = self.fetch_document(url)? else {
            return Ok(Vec::new());
        };
        let wrapper = format!("{}s", kind.as_str());
        Ok(document
            .get(&wrapper)
            .map(|value| object::collection(value, kind.as_str()))
            .unwrap_or_default()
            .iter()
            .filter_map(object::name_of)
            .collect())
    }

    /// All workspace names.
    fn workspace_names(&self) -> Result<Vec<String>, GeoServerError> {
        let members = self.collection_members(
            self.rest_url(&["workspaces.json"]),
            "workspaces",
            "workspace",
            "List Workspaces",
        )?;
        Ok(members.iter().filter_map(object::name_of).collect())
    }

    /// Style names visible in a workspace.
    fn style_names(&self, workspace: &str) -> Result<Vec<String>, GeoServerError> {
        let url = self.rest_url(&["workspaces", workspace, "styles.json"]);
        let Some(document) = self.fetch_document(url)? else {
            return Ok(Vec::new());
        };
        Ok(document
            .get("styles")
            .map(|value| object::collection(value, "style"))
            .unwrap_or_default()
            .iter()
            .filter_map(object::name_of)
            .collect())
    }

    /// Fetch the backing resource of a layer for bounding-box derivation.
    ///
    /// Best effort: a layer whose resource cannot be resolved still
    /// transcribes, just with default bounds.
    fn layer_resource(
        &self,
        layer: &object::Layer,
        store: Option<&str>,
    ) -> Result<Option<object::Resource>, GeoServerError> {
        let Some(reference) = &layer.resource else {
            return Ok(None);
        };

        let document = match store {
            Some(store) => {
                let Identifier { workspace, name } = Identifier::parse(&reference.name);
                let Some(workspace) = workspace else {
                    debug!(resource = %reference.name, "resource reference has no workspace");
                    return Ok(None);
                };
                let (stores, resources) = store_family(match reference.kind {
                    ResourceKind::FeatureType => StoreKind::Data,
                    ResourceKind::Coverage => StoreKind::Coverage,
                });
                let url = self.rest_url(&[
                    "workspaces",
                    &workspace,
                    stores,
                    store,
                    resources,
                    &format!("{name}.json"),
                ]);
                self.fetch_document(url)?
            }
            None => match &reference.href {
                Some(href) => self.fetch_document(href.clone())?,
                None => None,
            },
        };

        let Some(document) = document else {
            debug!(resource = %reference.name, "backing resource not fetched");
            return Ok(None);
        };
        match CatalogObject::from_document(&document) {
            Ok(CatalogObject::Resource(resource)) => Ok(Some(resource)),
            _ => {
                debug!(resource = %reference.name, "backing resource document not usable");
                Ok(None)
            }
        }
    }

    /// GET a collection URL and unwrap its member list.
    fn collection_members(
        &self,
        url: String,
        wrapper: &str,
        member: &str,
        label: &str,
    ) -> Result<Vec<Value>, GeoServerError> {
        let response = self.client.execute(HttpRequest::get(url))?;
        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "{} Status Code {}: {}",
                label,
                response.status,
                response.text()
            )));
        }
        let document = response
            .json()
            .map_err(|e| GeoServerError::Decode(e.to_string()))?;
        Ok(document
            .get(wrapper)
            .map(|value| object::collection(value, member))
            .unwrap_or_default())
    }

    /// Turn collection members into a name list or a record list.
    ///
    /// Collection listings are abbreviated, so full records are fetched
    /// through each member's `href`; members that cannot be fetched or
    /// decoded are skipped.
    fn list_envelope(
        &self,
        members: Vec<(&str, Value)>,
        with_properties: bool,
    ) -> Result<Envelope, GeoServerError> {
        if !with_properties {
            let names: Vec<Value> = members
                .iter()
                .filter_map(|(_, item)| object::name_of(item))
                .map(Value::String)
                .collect();
            return Ok(Envelope::ok(Value::Array(names)));
        }

        let mut records = Vec::with_capacity(members.len());
        for (member, item) in members {
            let document = match item.get("href").and_then(Value::as_str) {
                Some(href) => match self.fetch_document(href.to_string())? {
                    Some(document) => document,
                    None => continue,
                },
                // Some servers inline the full record in the listing.
                None => {
                    let mut wrapped = Map::new();
                    wrapped.insert(member.to_string(), item);
                    Value::Object(wrapped)
                }
            };
            match CatalogObject::from_document(&document) {
                Ok(object) => {
                    records.push(transcribe::transcribe(&object, &self.config.endpoint));
                }
                Err(e) => debug!(error = %e, "skipping undecodable collection member"),
            }
        }
        Ok(Envelope::ok(Value::Array(records)))
    }

    /// Issue a delete, tolerating 403/404 as already-gone.
    fn delete_with_tolerance(
        &self,
        request: HttpRequest,
        label: &str,
    ) -> Result<Envelope, GeoServerError> {
        let response = self.client.execute(request)?;
        if response.status != 200 {
            let message = format!(
                "{} Status Code {}: {}",
                label,
                response.status,
                response.text()
            );
            if WARNING_STATUS_CODES.contains(&response.status) {
                warn!("{message}");
            } else {
                error!("{message}");
                return Err(GeoServerError::Remote(message));
            }
        }
        Ok(Envelope::ok(Value::Null))
    }

    /// Issue a delete, reporting failures inside the envelope.
    fn delete_envelope(&self, request: HttpRequest) -> Result<Envelope, GeoServerError> {
        let response = self.client.execute(request)?;
        if !response.is_success() {
            return Ok(Envelope::err(format!(
                "{}({}): {}",
                response.reason(),
                response.status,
                response.text()
            )));
        }
        Ok(Envelope::ok(Value::Null))
    }
}

/// REST collection segments for a store kind: (stores, resources).
fn store_family(kind: StoreKind) -> (&'static str, &'static str) {
    match kind {
        StoreKind::Data => ("datastores", "featuretypes"),
        StoreKind::Coverage => ("coveragestores", "coverages"),
    }
}

/// Pair collection members with their document key.
fn tag_members(member: &str, items: Vec<Value>) -> Vec<(&str, Value)> {
    items.into_iter().map(|item| (member, item)).collect()
}

/// Changes must arrive as a JSON object of attribute/value pairs.
fn require_object(changes: &Value) -> Result<&Map<String, Value>, GeoServerError> {
    changes.as_object().ok_or_else(|| {
        GeoServerError::InvalidArgument("Attribute changes must be a JSON object.".to_string())
    })
}

/// Mutable view of the body object under a document's root key.
fn document_body(document: &mut Value) -> Option<&mut Map<String, Value>> {
    document
        .as_object_mut()
        .and_then(|map| map.values_mut().next())
        .and_then(Value::as_object_mut)
}

/// Apply caller changes onto a catalog document body.
///
/// Style and layer lists arrive as plain name arrays and are lifted into
/// the reference shapes the REST API expects; everything else passes
/// through as-is.
fn merge_changes(target: &mut Map<String, Value>, changes: &Map<String, Value>) {
    for (key, value) in changes {
        match (key.as_str(), value.as_array()) {
            ("default_style", _) => {
                target.insert("defaultStyle".to_string(), json!({ "name": value }));
            }
            ("styles", Some(names)) => {
                let styles: Vec<Value> =
                    names.iter().map(|name| json!({ "name": name })).collect();
                target.insert("styles".to_string(), json!({ "style": styles }));
            }
            ("layers", Some(names)) => {
                let published: Vec<Value> = names
                    .iter()
                    .map(|name| json!({ "@type": "layer", "name": name }))
                    .collect();
                target.insert("publishables".to_string(), json!({ "published": published }));
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
