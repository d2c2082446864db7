//! GeoWebCache integration: cached-layer registration and tile cache
//! maintenance (seeding, truncation, task control).

use std::fmt;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::envelope::Envelope;
use crate::geoserver::error::GeoServerError;
use crate::geoserver::GeoServerEngine;
use crate::http::{HttpClient, HttpRequest};

/// HTTP verb strategy for registering a cached layer.
///
/// GeoWebCache wants `PUT` for a brand new cached layer and `POST` to update
/// an existing one. `Auto` probes the layer first and picks accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GwcMethod {
    #[default]
    Auto,
    Post,
    Put,
}

/// Tile cache maintenance operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileCacheOp {
    Seed,
    Reseed,
    Truncate,
    MassTruncate,
}

impl TileCacheOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileCacheOp::Seed => "seed",
            TileCacheOp::Reseed => "reseed",
            TileCacheOp::Truncate => "truncate",
            TileCacheOp::MassTruncate => "masstruncate",
        }
    }
}

impl fmt::Display for TileCacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which seeding tasks a terminate request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KillTarget {
    #[default]
    All,
    Running,
    Pending,
}

impl KillTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            KillTarget::All => "all",
            KillTarget::Running => "running",
            KillTarget::Pending => "pending",
        }
    }
}

/// Parameters for seed, reseed and truncate requests.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// First zoom level the operation covers.
    pub zoom_start: u32,
    /// Last zoom level the operation covers. Seeding past zoom 20 is rarely
    /// a good idea.
    pub zoom_end: u32,
    /// Grid set to operate on, commonly 4326 or 900913.
    pub grid_set_id: String,
    /// Tile image format.
    pub image_format: String,
    /// Server-side worker threads for the operation.
    pub thread_count: u32,
    /// Restrict the operation to a bounding box, as minx, miny, maxx, maxy.
    pub bounds: Option<[f64; 4]>,
    /// Parameter filters, e.g. a STYLES value.
    pub parameters: Vec<(String, String)>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            zoom_start: 10,
            zoom_end: 15,
            grid_set_id: "900913".to_string(),
            image_format: "image/png".to_string(),
            thread_count: 1,
            bounds: None,
            parameters: Vec::new(),
        }
    }
}

impl SeedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zoom_range(mut self, start: u32, end: u32) -> Self {
        self.zoom_start = start;
        self.zoom_end = end;
        self
    }

    pub fn with_grid_set_id(mut self, grid_set_id: impl Into<String>) -> Self {
        self.grid_set_id = grid_set_id.into();
        self
    }

    pub fn with_image_format(mut self, image_format: impl Into<String>) -> Self {
        self.image_format = image_format.into();
        self
    }

    pub fn with_thread_count(mut self, thread_count: u32) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_bounds(mut self, bounds: [f64; 4]) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }
}

/// Cached-layer descriptor registered alongside a published layer.
fn gwc_layer_xml(layer_id: &str) -> String {
    format!(
        "<GeoServerLayer>\
         <enabled>true</enabled>\
         <name>{layer_id}</name>\
         <mimeFormats>\
         <string>image/png</string>\
         <string>image/jpeg</string>\
         </mimeFormats>\
         <gridSubsets>\
         <gridSubset><gridSetName>EPSG:4326</gridSetName></gridSubset>\
         <gridSubset><gridSetName>EPSG:900913</gridSetName></gridSubset>\
         </gridSubsets>\
         <metaWidthHeight><int>4</int><int>4</int></metaWidthHeight>\
         <expireCache>0</expireCache>\
         <expireClients>0</expireClients>\
         <autoCacheStyles>true</autoCacheStyles>\
         </GeoServerLayer>"
    )
}

fn seed_request_xml(layer_id: &str, operation: TileCacheOp, options: &SeedOptions) -> String {
    let mut xml = format!("<seedRequest><name>{layer_id}</name>");
    if let Some([minx, miny, maxx, maxy]) = options.bounds {
        xml.push_str(&format!(
            "<bounds><coords>\
             <double>{minx}</double>\
             <double>{miny}</double>\
             <double>{maxx}</double>\
             <double>{maxy}</double>\
             </coords></bounds>"
        ));
    }
    xml.push_str(&format!("<gridSetId>{}</gridSetId>", options.grid_set_id));
    xml.push_str(&format!("<zoomStart>{}</zoomStart>", options.zoom_start));
    xml.push_str(&format!("<zoomStop>{}</zoomStop>", options.zoom_end));
    xml.push_str(&format!("<format>{}</format>", options.image_format));
    xml.push_str(&format!("<type>{}</type>", operation.as_str()));
    xml.push_str(&format!("<threadCount>{}</threadCount>", options.thread_count));
    if !options.parameters.is_empty() {
        xml.push_str("<parameters>");
        for (name, value) in &options.parameters {
            xml.push_str(&format!(
                "<entry><string>{name}</string><string>{value}</string></entry>"
            ));
        }
        xml.push_str("</parameters>");
    }
    xml.push_str("</seedRequest>");
    xml
}

fn mass_truncate_xml(layer_id: &str) -> String {
    format!("<truncateLayer><layerName>{layer_id}</layerName></truncateLayer>")
}

const TASK_STATUSES: [(i64, &str); 4] = [
    (-1, "Aborted"),
    (0, "Pending"),
    (1, "Running"),
    (2, "Done"),
];

/// Turn the seed endpoint's "long-array-array" rows into task dictionaries.
/// Status codes outside the known map pass through untouched.
fn transcribe_tasks(document: &Value) -> Vec<Value> {
    let Some(rows) = document.get("long-array-array").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            if row.len() < 5 {
                return None;
            }
            let status = row[4]
                .as_i64()
                .and_then(|code| TASK_STATUSES.iter().find(|(known, _)| *known == code))
                .map(|(_, label)| json!(label))
                .unwrap_or_else(|| row[4].clone());
            Some(json!({
                "tiles_processed": row[0],
                "total_to_process": row[1],
                "num_remaining": row[2],
                "task_id": row[3],
                "task_status": status,
            }))
        })
        .collect()
}

impl<C: HttpClient> GeoServerEngine<C> {
    /// Register or refresh the cached-layer definition for a layer.
    ///
    /// A `PUT` that hits an existing cached layer is retried once as a
    /// `POST` update.
    pub(crate) fn sync_tile_cache_layer(
        &self,
        layer_id: &str,
        method: GwcMethod,
    ) -> Result<(), GeoServerError> {
        let url = format!("{}layers/{}.xml", self.gwc_endpoint(false), layer_id);
        let body = gwc_layer_xml(layer_id);

        let use_put = match method {
            GwcMethod::Put => true,
            GwcMethod::Post => false,
            GwcMethod::Auto => {
                let probe = HttpRequest::get(&url).with_header("Accept", "application/xml");
                match self.client.execute(probe) {
                    Ok(response) if response.status == 404 => true,
                    Ok(_) => false,
                    Err(error) => {
                        debug!(%error, "cached layer probe failed, updating with POST");
                        false
                    }
                }
            }
        };

        let first = if use_put {
            HttpRequest::put(&url).with_body("text/xml", body.clone())
        } else {
            HttpRequest::post(&url).with_body("text/xml", body.clone())
        };
        let mut response = self.client.execute(first)?;

        if use_put && !response.is_success() {
            let conflict = response.status == 405
                || response.status == 409
                || response.text().to_lowercase().contains("already exists");
            if conflict {
                debug!(layer = layer_id, "cached layer already present, retrying as POST");
                response = self
                    .client
                    .execute(HttpRequest::post(&url).with_body("text/xml", body))?;
            }
        }

        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Create/Update GWC Layer Status Code {}: {}",
                response.status,
                response.text()
            )));
        }
        Ok(())
    }

    /// Seed, reseed or truncate the tile cache of a layer.
    pub fn modify_tile_cache(
        &self,
        layer_id: &str,
        operation: TileCacheOp,
        options: &SeedOptions,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(layer_id)?;
        let gwc = self.gwc_endpoint(false);
        let qualified = format!("{workspace}:{name}");

        let request = if operation == TileCacheOp::MassTruncate {
            HttpRequest::post(format!("{gwc}masstruncate/"))
                .with_body("text/xml", mass_truncate_xml(&qualified))
        } else {
            HttpRequest::post(format!("{gwc}seed/{qualified}.xml")).with_body(
                "text/xml",
                seed_request_xml(&qualified, operation, options),
            )
        };
        let response = self.client.execute(request)?;

        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Unable to submit {} tile cache operation for layer {}:{}. {}:{}",
                operation,
                workspace,
                name,
                response.status,
                response.text()
            )));
        }
        info!(layer = %qualified, operation = %operation, "submitted tile cache operation");
        Ok(Envelope::ok(Value::Null))
    }

    /// Stop seeding tasks for a layer.
    pub fn terminate_tile_cache_tasks(
        &self,
        layer_id: &str,
        kill: KillTarget,
    ) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(layer_id)?;
        let url = format!("{}seed/{workspace}:{name}", self.gwc_endpoint(false));

        let response = self.client.execute(
            HttpRequest::post(url)
                .with_form(vec![("kill_all".to_string(), kill.as_str().to_string())]),
        )?;

        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Unable to terminate tile cache tasks for layer {}:{}. {}:{}",
                workspace,
                name,
                response.status,
                response.text()
            )));
        }
        Ok(Envelope::ok(Value::Null))
    }

    /// List the status of seeding tasks for a layer.
    pub fn query_tile_cache_tasks(&self, layer_id: &str) -> Result<Envelope, GeoServerError> {
        let (workspace, name) = self.qualify(layer_id)?;
        let url = format!("{}seed/{workspace}:{name}.json", self.gwc_endpoint(false));

        let response = self.client.execute(HttpRequest::get(url))?;

        if response.status != 200 {
            return Err(GeoServerError::Remote(format!(
                "Unable to query tile cache status for layer {}:{}. {}:{}",
                workspace,
                name,
                response.status,
                response.text()
            )));
        }
        let document = response
            .json()
            .map_err(|error| GeoServerError::Decode(error.to_string()))?;
        Ok(Envelope::ok(json!(transcribe_tasks(&document))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoserver::GeoServerConfig;
    use crate::http::tests::MockHttpClient;
    use crate::http::{Method, RequestBody};

    const ENDPOINT: &str = "http://localhost:8181/geoserver/rest/";

    fn engine(client: MockHttpClient) -> GeoServerEngine<MockHttpClient> {
        GeoServerEngine::with_client(GeoServerConfig::new(ENDPOINT), client)
    }

    fn body_text(request: &HttpRequest) -> String {
        match &request.body {
            Some(RequestBody::Bytes { data, .. }) => String::from_utf8(data.clone()).unwrap(),
            other => panic!("expected byte body, got {other:?}"),
        }
    }

    #[test]
    fn test_seed_request_xml_defaults() {
        let xml = seed_request_xml("sf:roads", TileCacheOp::Seed, &SeedOptions::default());
        assert!(xml.starts_with("<seedRequest><name>sf:roads</name>"));
        assert!(xml.contains("<gridSetId>900913</gridSetId>"));
        assert!(xml.contains("<zoomStart>10</zoomStart>"));
        assert!(xml.contains("<zoomStop>15</zoomStop>"));
        assert!(xml.contains("<format>image/png</format>"));
        assert!(xml.contains("<type>seed</type>"));
        assert!(xml.contains("<threadCount>1</threadCount>"));
        assert!(!xml.contains("<bounds>"));
        assert!(!xml.contains("<parameters>"));
    }

    #[test]
    fn test_seed_request_xml_bounds_and_parameters() {
        let options = SeedOptions::new()
            .with_zoom_range(0, 4)
            .with_bounds([-10.0, -5.0, 10.0, 5.0])
            .with_parameter("STYLES", "line");
        let xml = seed_request_xml("sf:roads", TileCacheOp::Reseed, &options);
        assert!(xml.contains(
            "<bounds><coords><double>-10</double><double>-5</double>\
             <double>10</double><double>5</double></coords></bounds>"
        ));
        assert!(xml.contains("<type>reseed</type>"));
        assert!(xml.contains("<entry><string>STYLES</string><string>line</string></entry>"));
    }

    #[test]
    fn test_transcribe_tasks_maps_status_codes() {
        let document = serde_json::json!({
            "long-array-array": [[100, 200, 100, 7, 1], [200, 200, 0, 8, 2], [0, 50, 50, 9, 9]]
        });
        let tasks = transcribe_tasks(&document);
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0]["task_status"], "Running");
        assert_eq!(tasks[0]["tiles_processed"], 100);
        assert_eq!(tasks[1]["task_status"], "Done");
        // Unknown codes pass through as-is.
        assert_eq!(tasks[2]["task_status"], 9);
    }

    #[test]
    fn test_sync_auto_probes_then_posts_when_layer_exists() {
        let client = MockHttpClient::new()
            .with_response(200, "<GeoServerLayer/>")
            .with_response(200, "");
        let engine = engine(client);
        engine.sync_tile_cache_layer("sf:roads", GwcMethod::Auto).unwrap();

        let requests = engine.client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(
            requests[0].url,
            "http://localhost:8181/geoserver/gwc/rest/layers/sf:roads.xml"
        );
        assert_eq!(requests[1].method, Method::Post);
        assert!(body_text(&requests[1]).contains("<name>sf:roads</name>"));
    }

    #[test]
    fn test_sync_auto_puts_when_layer_missing() {
        let client = MockHttpClient::new()
            .with_response(404, "not found")
            .with_response(200, "");
        let engine = engine(client);
        engine.sync_tile_cache_layer("sf:roads", GwcMethod::Auto).unwrap();

        let requests = engine.client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::Put);
    }

    #[test]
    fn test_sync_put_falls_back_to_post_once() {
        let client = MockHttpClient::new()
            .with_response(405, "method not allowed")
            .with_response(200, "");
        let engine = engine(client);
        engine.sync_tile_cache_layer("sf:roads", GwcMethod::Put).unwrap();

        let requests = engine.client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(requests[1].method, Method::Post);
    }

    #[test]
    fn test_sync_failure_reports_status() {
        let client = MockHttpClient::new().with_response(500, "boom");
        let engine = engine(client);
        let error = engine
            .sync_tile_cache_layer("sf:roads", GwcMethod::Post)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Create/Update GWC Layer Status Code 500: boom"
        );
    }

    #[test]
    fn test_mass_truncate_posts_truncate_layer() {
        let client = MockHttpClient::new().with_response(200, "");
        let engine = engine(client);
        engine
            .modify_tile_cache("sf:roads", TileCacheOp::MassTruncate, &SeedOptions::default())
            .unwrap();

        let requests = engine.client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "http://localhost:8181/geoserver/gwc/rest/masstruncate/"
        );
        assert_eq!(
            body_text(&requests[0]),
            "<truncateLayer><layerName>sf:roads</layerName></truncateLayer>"
        );
    }

    #[test]
    fn test_seed_posts_to_seed_endpoint() {
        let client = MockHttpClient::new().with_response(200, "");
        let engine = engine(client);
        let envelope = engine
            .modify_tile_cache("sf:roads", TileCacheOp::Seed, &SeedOptions::default())
            .unwrap();
        assert!(envelope.is_success());

        let requests = engine.client.requests();
        assert_eq!(
            requests[0].url,
            "http://localhost:8181/geoserver/gwc/rest/seed/sf:roads.xml"
        );
        assert!(body_text(&requests[0]).contains("<type>seed</type>"));
    }

    #[test]
    fn test_modify_tile_cache_failure_message() {
        let client = MockHttpClient::new().with_response(400, "bad request");
        let engine = engine(client);
        let error = engine
            .modify_tile_cache("sf:roads", TileCacheOp::Truncate, &SeedOptions::default())
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unable to submit truncate tile cache operation for layer sf:roads. 400:bad request"
        );
    }

    #[test]
    fn test_terminate_posts_kill_form() {
        let client = MockHttpClient::new().with_response(200, "");
        let engine = engine(client);
        engine
            .terminate_tile_cache_tasks("sf:roads", KillTarget::Running)
            .unwrap();

        let requests = engine.client.requests();
        assert_eq!(
            requests[0].url,
            "http://localhost:8181/geoserver/gwc/rest/seed/sf:roads"
        );
        assert_eq!(
            requests[0].body,
            Some(RequestBody::Form(vec![(
                "kill_all".to_string(),
                "running".to_string()
            )]))
        );
    }

    #[test]
    fn test_query_wraps_task_list() {
        let client = MockHttpClient::new()
            .with_response(200, r#"{"long-array-array": [[10, 100, 90, 1, 0]]}"#);
        let engine = engine(client);
        let envelope = engine.query_tile_cache_tasks("sf:roads").unwrap();

        assert!(envelope.is_success());
        let tasks = envelope.result().unwrap().as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["task_status"], "Pending");
        assert_eq!(
            engine.client.requests()[0].url,
            "http://localhost:8181/geoserver/gwc/rest/seed/sf:roads.json"
        );
    }

    #[test]
    fn test_query_failure_message() {
        let client = MockHttpClient::new().with_response(404, "no such layer");
        let engine = engine(client);
        let error = engine.query_tile_cache_tasks("sf:roads").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unable to query tile cache status for layer sf:roads. 404:no such layer"
        );
    }
}
