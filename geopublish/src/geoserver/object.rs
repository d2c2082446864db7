//! Typed views of catalog REST documents.
//!
//! The REST API wraps every object in a single-key JSON document
//! (`{"layer": {...}}`, `{"dataStore": {...}}`). Parsing turns those into a
//! [`CatalogObject`] tagged union with known fields per variant; keys the
//! parser does not understand are kept in an `extra` map so transcription
//! can pass them through unchanged.

use serde_json::{Map, Value};

use crate::geoserver::error::GeoServerError;

/// A parsed catalog object.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogObject {
    Workspace(Workspace),
    Store(Store),
    Resource(Resource),
    Layer(Layer),
    LayerGroup(LayerGroup),
    Style(Style),
}

impl CatalogObject {
    /// Parse a single-key REST document into the matching variant.
    pub fn from_document(document: &Value) -> Result<CatalogObject, GeoServerError> {
        let root = document
            .as_object()
            .filter(|map| map.len() == 1)
            .ok_or_else(|| {
                GeoServerError::Decode("catalog document must have a single root key".to_string())
            })?;
        let (key, body) = root.iter().next().expect("checked non-empty");
        let body = body.as_object().ok_or_else(|| {
            GeoServerError::Decode(format!("catalog document \"{key}\" is not an object"))
        })?;

        match key.as_str() {
            "workspace" => Ok(CatalogObject::Workspace(Workspace::parse(body))),
            "dataStore" => Ok(CatalogObject::Store(Store::parse(body, StoreKind::Data))),
            "coverageStore" => Ok(CatalogObject::Store(Store::parse(
                body,
                StoreKind::Coverage,
            ))),
            "featureType" => Ok(CatalogObject::Resource(Resource::parse(
                body,
                ResourceKind::FeatureType,
            ))),
            "coverage" => Ok(CatalogObject::Resource(Resource::parse(
                body,
                ResourceKind::Coverage,
            ))),
            "layer" => Ok(CatalogObject::Layer(Layer::parse(body))),
            "layerGroup" => Ok(CatalogObject::LayerGroup(LayerGroup::parse(body))),
            "style" => Ok(CatalogObject::Style(Style::parse(body))),
            other => Err(GeoServerError::Decode(format!(
                "unrecognized catalog document root \"{other}\""
            ))),
        }
    }

    /// Name of the underlying object.
    pub fn name(&self) -> &str {
        match self {
            CatalogObject::Workspace(workspace) => &workspace.name,
            CatalogObject::Store(store) => &store.name,
            CatalogObject::Resource(resource) => &resource.name,
            CatalogObject::Layer(layer) => &layer.name,
            CatalogObject::LayerGroup(group) => &group.name,
            CatalogObject::Style(style) => &style.name,
        }
    }
}

/// Namespace grouping stores, resources and styles.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub name: String,
    pub extra: Map<String, Value>,
}

impl Workspace {
    fn parse(body: &Map<String, Value>) -> Workspace {
        let mut name = String::new();
        let mut extra = Map::new();
        for (key, value) in body {
            match key.as_str() {
                "name" => name = string_of(value).unwrap_or_default(),
                _ => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }
        Workspace { name, extra }
    }
}

/// Whether a store holds vector or raster data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Data,
    Coverage,
}

impl StoreKind {
    /// Tag used by the REST API for this store family.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Data => "dataStore",
            StoreKind::Coverage => "coverageStore",
        }
    }
}

/// Named connection to a data source within a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub name: String,
    pub workspace: Option<String>,
    pub kind: StoreKind,
    /// Backing format reported by the server, e.g. "PostGIS" or "GeoTIFF".
    pub store_type: Option<String>,
    pub enabled: Option<bool>,
    pub extra: Map<String, Value>,
}

impl Store {
    fn parse(body: &Map<String, Value>, kind: StoreKind) -> Store {
        let mut store = Store {
            name: String::new(),
            workspace: None,
            kind,
            store_type: None,
            enabled: None,
            extra: Map::new(),
        };
        for (key, value) in body {
            match key.as_str() {
                "name" => store.name = string_of(value).unwrap_or_default(),
                "workspace" => store.workspace = name_of(value),
                "type" => store.store_type = string_of(value),
                "enabled" => store.enabled = value.as_bool(),
                _ => {
                    store.extra.insert(key.clone(), value.clone());
                }
            }
        }
        store
    }
}

/// Whether a resource is a vector feature type or a raster coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    FeatureType,
    Coverage,
}

impl ResourceKind {
    /// Tag used in transcribed dictionaries and layer resource references.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::FeatureType => "featureType",
            ResourceKind::Coverage => "coverage",
        }
    }
}

/// A bounding box in the order the REST API reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub minx: f64,
    pub maxx: f64,
    pub miny: f64,
    pub maxy: f64,
    pub crs: Option<String>,
}

impl Bounds {
    pub(crate) fn parse(value: &Value) -> Option<Bounds> {
        let map = value.as_object()?;
        Some(Bounds {
            minx: number_of(map.get("minx")?)?,
            maxx: number_of(map.get("maxx")?)?,
            miny: number_of(map.get("miny")?)?,
            maxy: number_of(map.get("maxy")?)?,
            crs: map.get("crs").and_then(crs_of),
        })
    }

    /// Bounding box as a `minx,miny,maxx,maxy` WMS/WCS query fragment.
    pub fn bbox_string(&self) -> String {
        format!("{},{},{},{}", self.minx, self.miny, self.maxx, self.maxy)
    }
}

/// A published feature type or coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub workspace: Option<String>,
    /// Owning store, possibly workspace-qualified.
    pub store: Option<String>,
    pub kind: ResourceKind,
    pub title: Option<String>,
    pub enabled: Option<bool>,
    /// Declared SRS, e.g. "EPSG:4326".
    pub projection: Option<String>,
    pub native_bbox: Option<Bounds>,
    pub latlon_bbox: Option<Bounds>,
    pub extra: Map<String, Value>,
}

impl Resource {
    fn parse(body: &Map<String, Value>, kind: ResourceKind) -> Resource {
        let mut resource = Resource {
            name: String::new(),
            workspace: None,
            store: None,
            kind,
            title: None,
            enabled: None,
            projection: None,
            native_bbox: None,
            latlon_bbox: None,
            extra: Map::new(),
        };
        for (key, value) in body {
            match key.as_str() {
                "name" => resource.name = string_of(value).unwrap_or_default(),
                "namespace" => resource.workspace = name_of(value),
                "store" => resource.store = name_of(value),
                "title" => resource.title = string_of(value),
                "enabled" => resource.enabled = value.as_bool(),
                "srs" => resource.projection = string_of(value),
                "nativeBoundingBox" => resource.native_bbox = Bounds::parse(value),
                "latLonBoundingBox" => resource.latlon_bbox = Bounds::parse(value),
                _ => {
                    resource.extra.insert(key.clone(), value.clone());
                }
            }
        }
        resource
    }

    /// Workspace-qualified name when a workspace is known.
    pub fn qualified_name(&self) -> String {
        match &self.workspace {
            Some(workspace) => format!("{workspace}:{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Reference from a layer to its backing resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    /// Possibly workspace-qualified resource name.
    pub name: String,
    pub href: Option<String>,
}

/// The renderable unit referencing a resource and styles.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub layer_type: Option<String>,
    pub default_style: Option<String>,
    pub styles: Vec<String>,
    pub resource: Option<ResourceRef>,
    pub extra: Map<String, Value>,
}

impl Layer {
    fn parse(body: &Map<String, Value>) -> Layer {
        let mut layer = Layer {
            name: String::new(),
            layer_type: None,
            default_style: None,
            styles: Vec::new(),
            resource: None,
            extra: Map::new(),
        };
        for (key, value) in body {
            match key.as_str() {
                "name" => layer.name = string_of(value).unwrap_or_default(),
                "type" => layer.layer_type = string_of(value),
                "defaultStyle" => layer.default_style = qualified_style(value),
                "styles" => {
                    layer.styles = collection(value, "style")
                        .iter()
                        .filter_map(qualified_style)
                        .collect();
                }
                "resource" => layer.resource = parse_resource_ref(value),
                _ => {
                    layer.extra.insert(key.clone(), value.clone());
                }
            }
        }
        layer
    }
}

/// An ordered group of layers rendered as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroup {
    pub name: String,
    pub workspace: Option<String>,
    pub layers: Vec<String>,
    pub styles: Vec<String>,
    pub bounds: Option<Bounds>,
    pub extra: Map<String, Value>,
}

impl LayerGroup {
    fn parse(body: &Map<String, Value>) -> LayerGroup {
        let mut group = LayerGroup {
            name: String::new(),
            workspace: None,
            layers: Vec::new(),
            styles: Vec::new(),
            bounds: None,
            extra: Map::new(),
        };
        for (key, value) in body {
            match key.as_str() {
                "name" => group.name = string_of(value).unwrap_or_default(),
                "workspace" => group.workspace = name_of(value),
                "publishables" => {
                    group.layers = collection(value, "published")
                        .iter()
                        .filter_map(name_of)
                        .collect();
                }
                "layers" => {
                    // Older servers report a plain layers list instead of
                    // publishables.
                    group.layers = collection(value, "layer")
                        .iter()
                        .filter_map(name_of)
                        .collect();
                }
                "styles" => {
                    group.styles = collection(value, "style")
                        .iter()
                        .filter_map(qualified_style)
                        .collect();
                }
                "bounds" => group.bounds = Bounds::parse(value),
                _ => {
                    group.extra.insert(key.clone(), value.clone());
                }
            }
        }
        group
    }
}

/// A named SLD style, global or workspace-scoped.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub name: String,
    pub workspace: Option<String>,
    pub filename: Option<String>,
    pub extra: Map<String, Value>,
}

impl Style {
    fn parse(body: &Map<String, Value>) -> Style {
        let mut style = Style {
            name: String::new(),
            workspace: None,
            filename: None,
            extra: Map::new(),
        };
        for (key, value) in body {
            match key.as_str() {
                "name" => style.name = string_of(value).unwrap_or_default(),
                "workspace" => style.workspace = name_of(value),
                "filename" => style.filename = string_of(value),
                _ => {
                    style.extra.insert(key.clone(), value.clone());
                }
            }
        }
        style
    }
}

/// Items of a REST collection wrapper.
///
/// The API encodes collections as `{"style": [..]}` with three quirks: a
/// single item is not wrapped in an array, an empty collection is the empty
/// string instead of an object, and null placeholders appear for absent
/// entries.
pub fn collection(value: &Value, member: &str) -> Vec<Value> {
    let Some(inner) = value.as_object().and_then(|map| map.get(member)) else {
        return Vec::new();
    };
    match inner {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .cloned()
            .collect(),
        Value::Null => Vec::new(),
        single => vec![single.clone()],
    }
}

/// String content of a scalar value.
fn string_of(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Name of a reference value, which is either a plain string or an object
/// carrying a `name` key.
pub fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::String(name) if !name.is_empty() => Some(name.clone()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Style name, workspace-qualified when the reference carries a workspace.
fn qualified_style(value: &Value) -> Option<String> {
    let name = name_of(value)?;
    if name.contains(':') {
        return Some(name);
    }
    let workspace = value
        .as_object()
        .and_then(|map| map.get("workspace"))
        .and_then(name_of);
    match workspace {
        Some(workspace) => Some(format!("{workspace}:{name}")),
        None => Some(name),
    }
}

fn parse_resource_ref(value: &Value) -> Option<ResourceRef> {
    let map = value.as_object()?;
    let kind = match map.get("@class").and_then(Value::as_str) {
        Some("coverage") => ResourceKind::Coverage,
        _ => ResourceKind::FeatureType,
    };
    Some(ResourceRef {
        kind,
        name: name_of(value)?,
        href: map.get("href").and_then(Value::as_str).map(str::to_string),
    })
}

/// Numbers arrive as JSON numbers or, from some server versions, strings.
fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

/// CRS entries are either plain strings or `{"@class": .., "$": ..}` wrappers.
fn crs_of(value: &Value) -> Option<String> {
    match value {
        Value::String(crs) => Some(crs.clone()),
        Value::Object(map) => map.get("$").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
