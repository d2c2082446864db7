//! Flatten catalog objects into plain dictionaries for response envelopes.
//!
//! Reference-typed fields collapse to names, styles to workspace-qualified
//! name lists, and objects tagged with a resource type gain derived WFS, WCS
//! or WMS query URLs so callers can hand them straight to a map client. No
//! network I/O happens here.

use serde_json::{json, Map, Value};

use crate::geoserver::object::{
    Bounds, CatalogObject, Layer, LayerGroup, Resource, ResourceKind, Store, Style, Workspace,
};
use crate::geoserver::urls;

const DEFAULT_BBOX: &str = "-180,-90,180,90";
const DEFAULT_SRS: &str = "EPSG:4326";
const DEFAULT_SIZE: &str = "512";

/// Flatten a catalog object into a dictionary.
pub fn transcribe(object: &CatalogObject, endpoint: &str) -> Value {
    match object {
        CatalogObject::Workspace(workspace) => transcribe_workspace(workspace),
        CatalogObject::Store(store) => transcribe_store(store),
        CatalogObject::Resource(resource) => transcribe_resource(resource, endpoint),
        CatalogObject::Layer(layer) => transcribe_layer(layer, None, endpoint),
        CatalogObject::LayerGroup(group) => transcribe_layer_group(group, endpoint),
        CatalogObject::Style(style) => transcribe_style(style),
    }
}

fn transcribe_workspace(workspace: &Workspace) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(workspace.name));
    merge_extra(&mut map, &workspace.extra);
    Value::Object(map)
}

fn transcribe_store(store: &Store) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(store.name));
    map.insert("workspace".to_string(), json!(store.workspace));
    map.insert("resource_type".to_string(), json!(store.kind.as_str()));
    if let Some(store_type) = &store.store_type {
        map.insert("type".to_string(), json!(store_type));
    }
    if let Some(enabled) = store.enabled {
        map.insert("enabled".to_string(), json!(enabled));
    }
    merge_extra(&mut map, &store.extra);
    Value::Object(map)
}

fn transcribe_resource(resource: &Resource, endpoint: &str) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(resource.name));
    map.insert("workspace".to_string(), json!(resource.workspace));
    map.insert("store".to_string(), json!(resource.store));
    map.insert("resource_type".to_string(), json!(resource.kind.as_str()));
    if let Some(title) = &resource.title {
        map.insert("title".to_string(), json!(title));
    }
    if let Some(enabled) = resource.enabled {
        map.insert("enabled".to_string(), json!(enabled));
    }
    if let Some(projection) = &resource.projection {
        map.insert("projection".to_string(), json!(projection));
    }
    if let Some(bounds) = &resource.native_bbox {
        map.insert("native_bbox".to_string(), bbox_list(bounds));
    }
    if let Some(bounds) = &resource.latlon_bbox {
        map.insert("latlon_bbox".to_string(), bbox_list(bounds));
    }
    merge_extra(&mut map, &resource.extra);

    match resource.kind {
        ResourceKind::FeatureType => {
            map.insert("wfs".to_string(), wfs_urls(endpoint, &resource.qualified_name()));
        }
        ResourceKind::Coverage => {
            let (bbox, srs, width) = derived_window(resource.native_bbox.as_ref(), resource.projection.as_deref());
            map.insert(
                "wcs".to_string(),
                wcs_urls(
                    endpoint,
                    &resource.name,
                    resource.workspace.as_deref(),
                    &bbox,
                    &srs,
                    &width,
                ),
            );
        }
    }
    Value::Object(map)
}

/// Flatten a layer, borrowing the backing resource for bounding-box derivation
/// when the caller has it.
pub fn transcribe_layer(layer: &Layer, resource: Option<&Resource>, endpoint: &str) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(layer.name));
    map.insert("resource_type".to_string(), json!("layer"));
    map.insert(
        "catalog".to_string(),
        json!(endpoint.trim_end_matches('/')),
    );
    if let Some(layer_type) = &layer.layer_type {
        map.insert("type".to_string(), json!(layer_type));
    }
    map.insert("default_style".to_string(), json!(layer.default_style));
    map.insert("styles".to_string(), json!(layer.styles));
    if let Some(reference) = &layer.resource {
        map.insert("resource".to_string(), json!(reference.name));
    }
    merge_extra(&mut map, &layer.extra);

    let style = layer.default_style.clone().unwrap_or_default();
    let (bbox, srs, width) = derived_window(
        resource.and_then(|resource| resource.native_bbox.as_ref()),
        resource.and_then(|resource| resource.projection.as_deref()),
    );
    map.insert(
        "wms".to_string(),
        wms_urls(endpoint, &layer.name, &style, &bbox, &srs, &width),
    );
    Value::Object(map)
}

fn transcribe_layer_group(group: &LayerGroup, endpoint: &str) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(group.name));
    map.insert("workspace".to_string(), json!(group.workspace));
    map.insert("resource_type".to_string(), json!("layerGroup"));
    map.insert("layers".to_string(), json!(group.layers));
    map.insert("styles".to_string(), json!(group.styles));
    if let Some(bounds) = &group.bounds {
        map.insert(
            "bounds".to_string(),
            json!([bounds.minx, bounds.maxx, bounds.miny, bounds.maxy, bounds.crs]),
        );
    }
    merge_extra(&mut map, &group.extra);

    let (bbox, srs, width) = derived_window(group.bounds.as_ref(), None);
    map.insert(
        "wms".to_string(),
        wms_urls(endpoint, &group.name, "", &bbox, &srs, &width),
    );
    Value::Object(map)
}

fn transcribe_style(style: &Style) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(style.name));
    map.insert("workspace".to_string(), json!(style.workspace));
    if let Some(filename) = &style.filename {
        map.insert("filename".to_string(), json!(filename));
    }
    merge_extra(&mut map, &style.extra);
    Value::Object(map)
}

fn merge_extra(map: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        map.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

/// Native bounding box in catalog order.
fn bbox_list(bounds: &Bounds) -> Value {
    json!([bounds.minx, bounds.maxx, bounds.miny, bounds.maxy])
}

/// Derive (bbox, srs, width) for service URLs.
///
/// Width is recomputed from the bounding box's aspect ratio at the fixed
/// default height so preview images are not distorted.
fn derived_window(bounds: Option<&Bounds>, projection: Option<&str>) -> (String, String, String) {
    let Some(bounds) = bounds else {
        return (
            DEFAULT_BBOX.to_string(),
            DEFAULT_SRS.to_string(),
            DEFAULT_SIZE.to_string(),
        );
    };
    let srs = bounds
        .crs
        .clone()
        .or_else(|| projection.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_SRS.to_string());
    let height: f64 = 512.0;
    let span_y = bounds.maxy - bounds.miny;
    let width = if span_y != 0.0 {
        let aspect_ratio = (bounds.maxx - bounds.minx) / span_y;
        ((aspect_ratio * height) as i64).to_string()
    } else {
        DEFAULT_SIZE.to_string()
    };
    (bounds.bbox_string(), srs, width)
}

fn wfs_urls(endpoint: &str, resource_id: &str) -> Value {
    let formats = [
        ("gml3", "GML3"),
        ("gml2", "GML2"),
        ("shapefile", "shape-zip"),
        ("geojson", "application/json"),
        ("geojsonp", "text/javascript"),
        ("csv", "csv"),
    ];
    let mut map = Map::new();
    for (key, format) in formats {
        map.insert(key.to_string(), json!(urls::wfs_url(endpoint, resource_id, format)));
    }
    Value::Object(map)
}

fn wcs_urls(
    endpoint: &str,
    name: &str,
    namespace: Option<&str>,
    bbox: &str,
    srs: &str,
    width: &str,
) -> Value {
    let formats = [
        ("png", "png"),
        ("gif", "gif"),
        ("jpeg", "jpeg"),
        ("tiff", "tif"),
        ("bmp", "bmp"),
        ("geotiff", "geotiff"),
        ("gtopo30", "gtopo30"),
        ("arcgrid", "ArcGrid"),
        ("arcgrid_gz", "ArcGrid-GZIP"),
    ];
    let mut map = Map::new();
    for (key, format) in formats {
        map.insert(
            key.to_string(),
            json!(urls::wcs_url(
                endpoint,
                name,
                srs,
                bbox,
                width,
                DEFAULT_SIZE,
                format,
                namespace,
            )),
        );
    }
    Value::Object(map)
}

fn wms_urls(
    endpoint: &str,
    layer: &str,
    style: &str,
    bbox: &str,
    srs: &str,
    width: &str,
) -> Value {
    let formats = [
        ("png", "image/png"),
        ("png8", "image/png8"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("tiff", "image/tiff"),
        ("tiff8", "image/tiff8"),
        ("geotiff", "image/geotiff"),
        ("geotiff8", "image/geotiff8"),
        ("svg", "image/svg"),
        ("pdf", "application/pdf"),
        ("georss", "rss"),
        ("kml", "kml"),
        ("kmz", "kmz"),
        ("openlayers", "application/openlayers"),
    ];
    let mut map = Map::new();
    for (key, format) in formats {
        map.insert(
            key.to_string(),
            json!(urls::wms_url(
                endpoint,
                layer,
                style,
                srs,
                bbox,
                width,
                DEFAULT_SIZE,
                format,
            )),
        );
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENDPOINT: &str = "http://localhost:8181/geoserver/rest/";

    fn feature_type() -> CatalogObject {
        CatalogObject::from_document(&json!({
            "featureType": {
                "name": "roads",
                "namespace": {"name": "sf"},
                "store": {"@class": "dataStore", "name": "sf:shp"},
                "enabled": true,
                "keywords": {"string": ["roads"]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_feature_type_gets_wfs_urls() {
        let dictionary = transcribe(&feature_type(), ENDPOINT);
        assert_eq!(dictionary["resource_type"], "featureType");
        assert_eq!(dictionary["store"], "sf:shp");

        let wfs = dictionary["wfs"].as_object().unwrap();
        for key in ["gml2", "gml3", "shapefile", "geojson", "geojsonp", "csv"] {
            assert!(wfs.contains_key(key), "missing wfs format {key}");
        }
        let gml3 = wfs["gml3"].as_str().unwrap();
        assert!(gml3.contains("typeNames=sf:roads"));
        // Keywords the parser does not model pass through untouched.
        assert!(dictionary["keywords"].is_object());
    }

    #[test]
    fn test_coverage_bbox_ordering() {
        let coverage = CatalogObject::from_document(&json!({
            "coverage": {
                "name": "dem",
                "namespace": {"name": "topo"},
                "srs": "EPSG:4326",
                "nativeBoundingBox": {"minx": 0.0, "maxx": 1.0, "miny": 2.0, "maxy": 3.0}
            }
        }))
        .unwrap();

        let dictionary = transcribe(&coverage, ENDPOINT);
        assert_eq!(dictionary["native_bbox"], json!([0.0, 1.0, 2.0, 3.0]));

        let png = dictionary["wcs"]["png"].as_str().unwrap();
        assert!(png.contains("BoundingBox=0,2,1,3"), "got {png}");
        assert!(png.contains("namespace=topo"));
        // Unit aspect ratio keeps the default width.
        assert!(png.contains("width=512"));
    }

    #[test]
    fn test_layer_wms_formats_and_aspect_ratio() {
        let layer = CatalogObject::from_document(&json!({
            "layer": {
                "name": "roads",
                "type": "VECTOR",
                "defaultStyle": {"name": "line"},
                "resource": {"@class": "featureType", "name": "sf:roads"}
            }
        }))
        .unwrap();
        let CatalogObject::Layer(layer) = layer else { unreachable!() };

        let resource = CatalogObject::from_document(&json!({
            "featureType": {
                "name": "roads",
                "namespace": {"name": "sf"},
                "srs": "EPSG:4326",
                "nativeBoundingBox": {"minx": -180.0, "maxx": 180.0, "miny": -90.0, "maxy": 90.0}
            }
        }))
        .unwrap();
        let CatalogObject::Resource(resource) = resource else { unreachable!() };

        let dictionary = transcribe_layer(&layer, Some(&resource), ENDPOINT);
        let wms = dictionary["wms"].as_object().unwrap();
        assert_eq!(wms.len(), 14);

        let png = wms["png"].as_str().unwrap();
        assert!(png.contains("layers=roads"));
        assert!(png.contains("styles=line"));
        assert!(png.contains("bbox=-180,-90,180,90"));
        // 2:1 aspect at height 512.
        assert!(png.contains("width=1024"));
        assert!(png.contains("height=512"));
    }

    #[test]
    fn test_layer_without_resource_uses_defaults() {
        let layer = CatalogObject::from_document(&json!({
            "layer": {"name": "roads", "defaultStyle": {"name": "line"}}
        }))
        .unwrap();
        let dictionary = transcribe(&layer, ENDPOINT);
        let png = dictionary["wms"]["png"].as_str().unwrap();
        assert!(png.contains("bbox=-180,-90,180,90"));
        assert!(png.contains("srs=EPSG:4326"));
        assert!(png.contains("width=512"));
        assert_eq!(dictionary["catalog"], "http://localhost:8181/geoserver/rest");
    }

    #[test]
    fn test_layer_group_reads_bounds() {
        let group = CatalogObject::from_document(&json!({
            "layerGroup": {
                "name": "basemap",
                "publishables": {"published": [{"name": "topp:states"}]},
                "styles": {"style": [{"name": "polygon"}]},
                "bounds": {"minx": -124.0, "maxx": -66.0, "miny": 24.0, "maxy": 53.0, "crs": "EPSG:4326"}
            }
        }))
        .unwrap();
        let dictionary = transcribe(&group, ENDPOINT);
        assert_eq!(dictionary["resource_type"], "layerGroup");
        assert_eq!(
            dictionary["bounds"],
            json!([-124.0, -66.0, 24.0, 53.0, "EPSG:4326"])
        );
        let png = dictionary["wms"]["png"].as_str().unwrap();
        assert!(png.contains("bbox=-124,24,-66,53"));
        assert!(png.contains("layers=basemap"));
        assert!(png.contains("styles=&"));
    }

    #[test]
    fn test_store_and_workspace_flatten() {
        let store = CatalogObject::from_document(&json!({
            "dataStore": {
                "name": "shp",
                "workspace": {"name": "sf", "href": "http://x/workspaces/sf.json"},
                "enabled": true
            }
        }))
        .unwrap();
        let dictionary = transcribe(&store, ENDPOINT);
        assert_eq!(dictionary["workspace"], "sf");
        assert_eq!(dictionary["resource_type"], "dataStore");

        let workspace =
            CatalogObject::from_document(&json!({"workspace": {"name": "sf"}})).unwrap();
        assert_eq!(transcribe(&workspace, ENDPOINT)["name"], "sf");
    }
}
