//! CKAN registry client.
//!
//! [`CkanEngine`] wraps a registry's action API: every operation is a
//! POST of a JSON argument object to `{endpoint}/{action}`, answered by
//! the server's own `{"success": …, "result"|"error": …}` document,
//! which maps straight onto [`Envelope`]. File-backed resources upload
//! as multipart form data instead of JSON. The API key, when
//! configured, rides along as both the `X-CKAN-API-Key` and
//! `Authorization` headers.
//!
//! Registry-reported failures (missing dataset, rejected fields) come
//! back as failed envelopes; [`CkanError`] is reserved for transport,
//! decode and local-file problems.

pub mod config;
pub mod error;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::envelope::Envelope;
use crate::http::{
    HttpClient, HttpRequest, HttpResponse, MultipartField, ReqwestClient,
};

pub use config::CkanConfig;
pub use error::CkanError;

/// Where a registry resource's content comes from.
///
/// A resource is either a link to data hosted elsewhere or a file this
/// client uploads; the two are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource<'a> {
    /// Link the resource to an external URL.
    Url(&'a str),
    /// Upload a local file as the resource body.
    File(&'a Path),
}

/// Client for a CKAN dataset registry.
pub struct CkanEngine<C: HttpClient = ReqwestClient> {
    pub(crate) config: CkanConfig,
    pub(crate) client: C,
}

impl CkanEngine {
    /// Build an engine talking to a live registry.
    pub fn new(config: CkanConfig) -> Result<Self, CkanError> {
        let client = ReqwestClient::with_timeout(config.timeout)?;
        Ok(CkanEngine { config, client })
    }
}

impl<C: HttpClient> CkanEngine<C> {
    /// Build an engine over a caller-supplied transport.
    pub fn with_client(config: CkanConfig, client: C) -> Self {
        CkanEngine { config, client }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &CkanConfig {
        &self.config
    }

    /// Check that the endpoint answers like a registry API root.
    ///
    /// The action endpoint's parent (the URL without its `action`
    /// segment) must answer 200 with a version document.
    pub fn validate(&self) -> Result<(), CkanError> {
        let endpoint = &self.config.endpoint;
        if Url::parse(endpoint).is_err() {
            return Err(CkanError::Validation(format!(
                "The URL \"{endpoint}\" provided for the CKAN dataset service endpoint \
                 is invalid."
            )));
        }

        let trimmed = endpoint.trim_end_matches('/');
        let api_endpoint = trimmed.strip_suffix("/action").unwrap_or(trimmed);
        let response = self.client.execute(HttpRequest::get(api_endpoint))?;

        let versioned = response
            .json()
            .ok()
            .as_ref()
            .and_then(|document| document.get("version"))
            .is_some();
        if response.status != 200 || !versioned {
            return Err(CkanError::Validation(format!(
                "The URL \"{endpoint}\" is not a valid endpoint for a CKAN dataset \
                 service."
            )));
        }
        Ok(())
    }

    /// Search datasets matching field queries.
    ///
    /// `query` becomes the `q` action argument, `filtered_query` the
    /// `fq` argument; at least one is required. `params` carries any
    /// further action arguments as a JSON object (or `Null`).
    pub fn search_datasets(
        &self,
        query: Option<&[(&str, &str)]>,
        filtered_query: Option<&[(&str, &str)]>,
        params: &Value,
    ) -> Result<Envelope, CkanError> {
        if query.is_none() && filtered_query.is_none() {
            return Err(CkanError::InvalidArgument(
                "A query or filtered query is required.".to_string(),
            ));
        }
        let mut data = params_object(params)?;
        if let Some(query) = query {
            data.insert("q".to_string(), query_value(query));
        }
        if let Some(filtered_query) = filtered_query {
            data.insert("fq".to_string(), query_value(filtered_query));
        }
        self.action("package_search", data)
    }

    /// Search resources matching field queries.
    pub fn search_resources(
        &self,
        query: &[(&str, &str)],
        params: &Value,
    ) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("query".to_string(), query_value(query));
        self.action("resource_search", data)
    }

    /// List dataset names, or full dataset records with their resources.
    pub fn list_datasets(
        &self,
        with_resources: bool,
        params: &Value,
    ) -> Result<Envelope, CkanError> {
        let data = params_object(params)?;
        let method = if with_resources {
            "current_package_list_with_resources"
        } else {
            "package_list"
        };
        self.action(method, data)
    }

    /// Retrieve a dataset record by id or name.
    pub fn get_dataset(&self, dataset_id: &str, params: &Value) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("id".to_string(), json!(dataset_id));
        self.action("package_show", data)
    }

    /// Retrieve a resource record by id.
    pub fn get_resource(&self, resource_id: &str, params: &Value) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("id".to_string(), json!(resource_id));
        self.action("resource_show", data)
    }

    /// Create a dataset.
    pub fn create_dataset(&self, name: &str, params: &Value) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("name".to_string(), json!(name));
        self.action("package_create", data)
    }

    /// Add a resource to a dataset.
    ///
    /// A linked resource posts as plain JSON; a file-backed one uploads
    /// as multipart form data, with the resource name defaulting to the
    /// file's basename and the uploaded filename keeping its extension.
    pub fn create_resource(
        &self,
        dataset_id: &str,
        source: UploadSource<'_>,
        params: &Value,
    ) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("package_id".to_string(), json!(dataset_id));

        match source {
            UploadSource::Url(url) => {
                data.insert("url".to_string(), json!(url));
                self.action("resource_create", data)
            }
            UploadSource::File(path) => {
                // Older registry versions refuse a resource without a url
                // field even when a file is attached.
                data.insert("url".to_string(), json!(""));

                let name = match data.get("name").and_then(Value::as_str) {
                    Some(name) => name.to_string(),
                    None => {
                        let name = basename(path);
                        data.insert("name".to_string(), json!(name));
                        name
                    }
                };
                let extension = path
                    .extension()
                    .map(|extension| format!(".{}", extension.to_string_lossy()))
                    .unwrap_or_default();
                let mut upload_file_name = name;
                if !extension.is_empty() && !upload_file_name.ends_with(&extension) {
                    upload_file_name.push_str(&extension);
                }

                let bytes =
                    fs::read(path).map_err(|source| CkanError::file(path.display(), source))?;
                self.upload_action("resource_create", data, upload_file_name, bytes)
            }
        }
    }

    /// Update a dataset's attributes.
    ///
    /// The registry's update action replaces absent `resources` and
    /// `tags` lists with empty ones, orphaning every resource; the
    /// stored lists are carried forward unless the caller is changing
    /// them.
    pub fn update_dataset(&self, dataset_id: &str, params: &Value) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("id".to_string(), json!(dataset_id));

        let current = self.action("package_show", data.clone())?;
        if let Some(dataset) = current.result() {
            for key in ["resources", "tags"] {
                if !data.contains_key(key) {
                    if let Some(value) = dataset.get(key) {
                        data.insert(key.to_string(), value.clone());
                    }
                }
            }
        }
        self.action("package_update", data)
    }

    /// Update a resource, optionally replacing its content.
    ///
    /// Without a new url the stored one is fetched and carried forward,
    /// since saving a resource url-less severs its link to the data.
    pub fn update_resource(
        &self,
        resource_id: &str,
        source: Option<UploadSource<'_>>,
        params: &Value,
    ) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("id".to_string(), json!(resource_id));

        let mut upload: Option<(String, Vec<u8>)> = None;
        match source {
            Some(UploadSource::Url(url)) => {
                data.insert("url".to_string(), json!(url));
            }
            Some(UploadSource::File(path)) => {
                if !data.contains_key("name") {
                    data.insert("name".to_string(), json!(basename(path)));
                }
                let bytes =
                    fs::read(path).map_err(|source| CkanError::file(path.display(), source))?;
                upload = Some((basename(path), bytes));
            }
            None => {}
        }

        if !data.contains_key("url") {
            let current = self.get_resource(resource_id, &Value::Null)?;
            if let Some(url) = current.result().and_then(|resource| resource.get("url")) {
                data.insert("url".to_string(), url.clone());
            }
        }

        match upload {
            Some((file_name, bytes)) => {
                self.upload_action("resource_update", data, file_name, bytes)
            }
            None => self.action("resource_update", data),
        }
    }

    /// Delete a dataset.
    pub fn delete_dataset(&self, dataset_id: &str, params: &Value) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("id".to_string(), json!(dataset_id));
        self.action("package_delete", data)
    }

    /// Delete a resource.
    pub fn delete_resource(
        &self,
        resource_id: &str,
        params: &Value,
    ) -> Result<Envelope, CkanError> {
        let mut data = params_object(params)?;
        data.insert("id".to_string(), json!(resource_id));
        self.action("resource_delete", data)
    }

    /// Download every resource of a dataset.
    ///
    /// Files land in `location`, defaulting to a directory named after
    /// the dataset. Returns the written paths in resource order.
    pub fn download_dataset(
        &self,
        dataset_id: &str,
        location: Option<&Path>,
    ) -> Result<Vec<PathBuf>, CkanError> {
        let envelope = self.get_dataset(dataset_id, &Value::Null)?;
        let Some(dataset) = envelope.result() else {
            return Err(CkanError::Remote(envelope_error(&envelope)));
        };

        let directory = match location {
            Some(location) => location.to_path_buf(),
            None => PathBuf::from(
                dataset
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(dataset_id),
            ),
        };

        let mut downloaded = Vec::new();
        if let Some(resources) = dataset.get("resources").and_then(Value::as_array) {
            for resource in resources {
                downloaded.push(self.fetch_resource_file(resource, &directory, None)?);
            }
        }
        Ok(downloaded)
    }

    /// Download one resource's content to a local file.
    pub fn download_resource(
        &self,
        resource_id: &str,
        location: Option<&Path>,
        local_file_name: Option<&str>,
    ) -> Result<PathBuf, CkanError> {
        let envelope = self.get_resource(resource_id, &Value::Null)?;
        let Some(resource) = envelope.result() else {
            return Err(CkanError::Remote(envelope_error(&envelope)));
        };
        self.fetch_resource_file(
            resource,
            location.unwrap_or_else(|| Path::new(".")),
            local_file_name,
        )
    }

    /// POST a JSON action request.
    fn action(&self, method: &str, params: Map<String, Value>) -> Result<Envelope, CkanError> {
        debug!(action = method, "registry action");
        let body = serde_json::to_vec(&Value::Object(params))
            .map_err(|e| CkanError::Decode(e.to_string()))?;
        let request = self.authorize(
            HttpRequest::post(self.action_url(method)).with_body("application/json", body),
        );
        let response = self.client.execute(request)?;
        parse_action_response(&response)
    }

    /// POST a multipart action request carrying one uploaded file.
    fn upload_action(
        &self,
        method: &str,
        params: Map<String, Value>,
        file_name: String,
        data: Vec<u8>,
    ) -> Result<Envelope, CkanError> {
        debug!(action = method, file = %file_name, "registry upload");
        let mut fields: Vec<MultipartField> = params
            .iter()
            .map(|(key, value)| MultipartField::text(key, text_of(value)))
            .collect();
        fields.push(MultipartField::file("upload", file_name, data));

        let request =
            self.authorize(HttpRequest::post(self.action_url(method)).with_multipart(fields));
        let response = self.client.execute(request)?;
        parse_action_response(&response)
    }

    fn action_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), method)
    }

    fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        if let Some(api_key) = &self.config.api_key {
            request = request
                .with_header("X-CKAN-API-Key", api_key)
                .with_header("Authorization", api_key);
        }
        request
    }

    /// Fetch a resource record's content and write it next to its name.
    fn fetch_resource_file(
        &self,
        resource: &Value,
        location: &Path,
        local_file_name: Option<&str>,
    ) -> Result<PathBuf, CkanError> {
        let file_name = match local_file_name {
            Some(name) => name.to_string(),
            None => {
                let stem = resource
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .or_else(|| resource.get("id").and_then(Value::as_str))
                    .unwrap_or("resource");
                let format = resource
                    .get("format")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                format!("{stem}.{format}")
            }
        };

        let url = resource
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| CkanError::Decode("resource record has no url".to_string()))?;

        fs::create_dir_all(location)
            .map_err(|source| CkanError::file(location.display(), source))?;
        let target = location.join(file_name);

        let response = self.client.execute(HttpRequest::get(url))?;
        if !response.is_success() {
            return Err(CkanError::Remote(format!(
                "Download Status Code {}: {}",
                response.status,
                response.reason()
            )));
        }
        fs::write(&target, &response.body)
            .map_err(|source| CkanError::file(target.display(), source))?;

        info!(path = %target.display(), "resource downloaded");
        Ok(target)
    }
}

/// Interpret the registry's action response document as an envelope.
fn parse_action_response(response: &HttpResponse) -> Result<Envelope, CkanError> {
    let document: Value = response.json().map_err(|_| {
        CkanError::Decode(format!(
            "Status Code {}: {}",
            response.status,
            response.text()
        ))
    })?;

    match document.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(Envelope::ok(
            document.get("result").cloned().unwrap_or(Value::Null),
        )),
        Some(false) => Ok(Envelope::err(error_text(&document))),
        None => Err(CkanError::Decode(
            "action response has no success flag".to_string(),
        )),
    }
}

/// Pull the human-readable message out of an action error block.
fn error_text(document: &Value) -> String {
    match document.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        None => "unknown registry error".to_string(),
    }
}

fn envelope_error(envelope: &Envelope) -> String {
    envelope
        .error()
        .unwrap_or("unknown registry error")
        .to_string()
}

/// Assemble `field:value` search terms.
///
/// A single pair searches as a plain string, several as a list, which
/// is the shape the search actions expect.
fn query_value(pairs: &[(&str, &str)]) -> Value {
    let mut terms: Vec<String> = pairs
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect();
    if terms.len() == 1 {
        Value::String(terms.remove(0))
    } else {
        Value::Array(terms.into_iter().map(Value::String).collect())
    }
}

/// Additional action arguments must arrive as a JSON object, or `Null`
/// for none.
fn params_object(params: &Value) -> Result<Map<String, Value>, CkanError> {
    match params {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(CkanError::InvalidArgument(
            "Additional parameters must be a JSON object.".to_string(),
        )),
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Multipart form values are strings; non-string JSON passes through
/// serialized.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::http::{Method, MultipartValue, RequestBody};

    const ENDPOINT: &str = "https://data.example.com/api/3/action/";

    fn engine(client: MockHttpClient) -> CkanEngine<MockHttpClient> {
        CkanEngine::with_client(CkanConfig::new(ENDPOINT).with_api_key("abc-123"), client)
    }

    fn success(result: Value) -> String {
        json!({"success": true, "result": result}).to_string()
    }

    fn body_json(request: &HttpRequest) -> Value {
        match &request.body {
            Some(RequestBody::Bytes { data, .. }) => serde_json::from_slice(data).unwrap(),
            other => panic!("expected byte body, got {other:?}"),
        }
    }

    fn multipart_fields(request: &HttpRequest) -> &[MultipartField] {
        match &request.body {
            Some(RequestBody::Multipart(fields)) => fields,
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    fn field_text<'a>(fields: &'a [MultipartField], name: &str) -> &'a str {
        let field = fields
            .iter()
            .find(|field| field.name == name)
            .unwrap_or_else(|| panic!("missing field {name}"));
        match &field.value {
            MultipartValue::Text(text) => text,
            other => panic!("field {name} is not text: {other:?}"),
        }
    }

    #[test]
    fn test_validate_strips_action_suffix() {
        let engine = engine(MockHttpClient::new().with_response(200, r#"{"version": 3}"#));
        engine.validate().unwrap();
        assert_eq!(
            engine.client.requests()[0].url,
            "https://data.example.com/api/3"
        );
    }

    #[test]
    fn test_validate_rejects_unparseable_url() {
        let engine =
            CkanEngine::with_client(CkanConfig::new("not a url"), MockHttpClient::new());
        let error = engine.validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "The URL \"not a url\" provided for the CKAN dataset service endpoint \
             is invalid."
        );
        assert_eq!(engine.client.request_count(), 0);
    }

    #[test]
    fn test_validate_rejects_non_registry_endpoint() {
        let expected = format!(
            "The URL \"{ENDPOINT}\" is not a valid endpoint for a CKAN dataset service."
        );

        let engine = engine(MockHttpClient::new().with_response(200, r#"{"hello": "world"}"#));
        assert_eq!(engine.validate().unwrap_err().to_string(), expected);

        let engine = self::engine(MockHttpClient::new().with_response(404, ""));
        assert_eq!(engine.validate().unwrap_err().to_string(), expected);
    }

    #[test]
    fn test_action_posts_json_with_auth_headers() {
        let engine = engine(
            MockHttpClient::new().with_response(200, &success(json!({"name": "water"}))),
        );

        let envelope = engine.get_dataset("water", &Value::Null).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.result().unwrap()["name"], "water");

        let request = &engine.client.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.url,
            "https://data.example.com/api/3/action/package_show"
        );
        assert!(request
            .headers
            .contains(&("X-CKAN-API-Key".to_string(), "abc-123".to_string())));
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "abc-123".to_string())));
        assert_eq!(body_json(request), json!({"id": "water"}));
    }

    #[test]
    fn test_action_failure_maps_error_message() {
        let body = json!({
            "success": false,
            "error": {"message": "Not found", "__type": "Not Found Error"}
        });
        let engine = engine(MockHttpClient::new().with_response(404, &body.to_string()));

        let envelope = engine.get_dataset("nope", &Value::Null).unwrap();
        assert_eq!(envelope.error(), Some("Not found"));
    }

    #[test]
    fn test_action_error_without_message_serializes_block() {
        let body = json!({
            "success": false,
            "error": {"name": ["That URL is already in use."], "__type": "Validation Error"}
        });
        let engine = engine(MockHttpClient::new().with_response(409, &body.to_string()));

        let envelope = engine.create_dataset("taken", &Value::Null).unwrap();
        assert!(envelope.error().unwrap().contains("already in use"));
    }

    #[test]
    fn test_unparseable_body_is_decode_error() {
        let engine = engine(MockHttpClient::new().with_response(502, "<html>bad gateway</html>"));
        let error = engine.list_datasets(false, &Value::Null).unwrap_err();
        assert!(error.to_string().contains("Status Code 502"));
    }

    #[test]
    fn test_search_datasets_single_pair_is_string() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .search_datasets(Some(&[("type", "dam")]), None, &Value::Null)
            .unwrap();

        let request = &engine.client.requests()[0];
        assert!(request.url.ends_with("/package_search"));
        assert_eq!(body_json(request), json!({"q": "type:dam"}));
    }

    #[test]
    fn test_search_datasets_multiple_pairs_are_list() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .search_datasets(
                None,
                Some(&[("type", "dam"), ("state", "UT")]),
                &Value::Null,
            )
            .unwrap();

        assert_eq!(
            body_json(&engine.client.requests()[0]),
            json!({"fq": ["type:dam", "state:UT"]})
        );
    }

    #[test]
    fn test_search_datasets_requires_some_query() {
        let engine = engine(MockHttpClient::new());
        let error = engine.search_datasets(None, None, &Value::Null).unwrap_err();
        assert_eq!(error.to_string(), "A query or filtered query is required.");
        assert_eq!(engine.client.request_count(), 0);
    }

    #[test]
    fn test_search_resources_uses_query_argument() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .search_resources(&[("format", "csv")], &Value::Null)
            .unwrap();

        let request = &engine.client.requests()[0];
        assert!(request.url.ends_with("/resource_search"));
        assert_eq!(body_json(request), json!({"query": "format:csv"}));
    }

    #[test]
    fn test_list_datasets_picks_action_by_detail() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(json!(["a"]))));
        engine.list_datasets(false, &Value::Null).unwrap();
        assert!(engine.client.requests()[0].url.ends_with("/package_list"));

        let engine = self::engine(MockHttpClient::new().with_response(200, &success(json!([]))));
        engine.list_datasets(true, &Value::Null).unwrap();
        assert!(engine.client.requests()[0]
            .url
            .ends_with("/current_package_list_with_resources"));
    }

    #[test]
    fn test_create_dataset_merges_params() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .create_dataset("water", &json!({"notes": "Streamflow archive"}))
            .unwrap();

        assert_eq!(
            body_json(&engine.client.requests()[0]),
            json!({"name": "water", "notes": "Streamflow archive"})
        );
    }

    #[test]
    fn test_create_resource_with_url_posts_json() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .create_resource(
                "water",
                UploadSource::Url("http://files.example.com/flow.csv"),
                &Value::Null,
            )
            .unwrap();

        let request = &engine.client.requests()[0];
        assert!(request.url.ends_with("/resource_create"));
        assert_eq!(
            body_json(request),
            json!({"package_id": "water", "url": "http://files.example.com/flow.csv"})
        );
    }

    #[test]
    fn test_create_resource_with_file_uploads_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, b"a,b\n1,2\n").unwrap();

        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .create_resource("water", UploadSource::File(&path), &Value::Null)
            .unwrap();

        let requests = engine.client.requests();
        let fields = multipart_fields(&requests[0]);
        assert_eq!(field_text(fields, "package_id"), "water");
        assert_eq!(field_text(fields, "url"), "");
        assert_eq!(field_text(fields, "name"), "data.csv");

        let upload = fields.iter().find(|field| field.name == "upload").unwrap();
        match &upload.value {
            MultipartValue::File { file_name, data } => {
                assert_eq!(file_name, "data.csv");
                assert_eq!(data, b"a,b\n1,2\n");
            }
            other => panic!("upload is not a file: {other:?}"),
        }
    }

    #[test]
    fn test_create_resource_appends_extension_to_custom_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, b"a,b\n").unwrap();

        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .create_resource(
                "water",
                UploadSource::File(&path),
                &json!({"name": "streamflow"}),
            )
            .unwrap();

        let requests = engine.client.requests();
        let fields = multipart_fields(&requests[0]);
        assert_eq!(field_text(fields, "name"), "streamflow");
        let upload = fields.iter().find(|field| field.name == "upload").unwrap();
        match &upload.value {
            MultipartValue::File { file_name, .. } => assert_eq!(file_name, "streamflow.csv"),
            other => panic!("upload is not a file: {other:?}"),
        }
    }

    #[test]
    fn test_create_resource_missing_file() {
        let engine = engine(MockHttpClient::new());
        let error = engine
            .create_resource(
                "water",
                UploadSource::File(Path::new("/definitely/missing/data.csv")),
                &Value::Null,
            )
            .unwrap_err();
        assert!(error.to_string().contains("/definitely/missing/data.csv"));
        assert_eq!(engine.client.request_count(), 0);
    }

    #[test]
    fn test_update_dataset_preserves_resources_and_tags() {
        let stored = json!({
            "name": "water",
            "resources": [{"id": "r1"}],
            "tags": [{"name": "hydrology"}]
        });
        let client = MockHttpClient::new()
            .with_response(200, &success(stored))
            .with_response(200, &success(json!({})));
        let engine = engine(client);

        engine
            .update_dataset("water", &json!({"notes": "updated"}))
            .unwrap();

        let requests = engine.client.requests();
        assert!(requests[0].url.ends_with("/package_show"));
        assert!(requests[1].url.ends_with("/package_update"));
        let body = body_json(&requests[1]);
        assert_eq!(body["id"], "water");
        assert_eq!(body["notes"], "updated");
        assert_eq!(body["resources"], json!([{"id": "r1"}]));
        assert_eq!(body["tags"], json!([{"name": "hydrology"}]));
    }

    #[test]
    fn test_update_dataset_caller_lists_win() {
        let stored = json!({"resources": [{"id": "r1"}], "tags": [{"name": "old"}]});
        let client = MockHttpClient::new()
            .with_response(200, &success(stored))
            .with_response(200, &success(json!({})));
        let engine = engine(client);

        engine.update_dataset("water", &json!({"tags": []})).unwrap();

        let body = body_json(&engine.client.requests()[1]);
        assert_eq!(body["tags"], json!([]));
        assert_eq!(body["resources"], json!([{"id": "r1"}]));
    }

    #[test]
    fn test_update_resource_with_url_skips_lookup() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(json!({}))));
        engine
            .update_resource(
                "r1",
                Some(UploadSource::Url("http://files.example.com/new.csv")),
                &Value::Null,
            )
            .unwrap();

        assert_eq!(engine.client.request_count(), 1);
        let body = body_json(&engine.client.requests()[0]);
        assert_eq!(body["url"], "http://files.example.com/new.csv");
    }

    #[test]
    fn test_update_resource_preserves_stored_url() {
        let client = MockHttpClient::new()
            .with_response(200, &success(json!({"url": "http://files.example.com/old.csv"})))
            .with_response(200, &success(json!({})));
        let engine = engine(client);

        engine
            .update_resource("r1", None, &json!({"description": "better"}))
            .unwrap();

        let requests = engine.client.requests();
        assert!(requests[0].url.ends_with("/resource_show"));
        let body = body_json(&requests[1]);
        assert_eq!(body["url"], "http://files.example.com/old.csv");
        assert_eq!(body["description"], "better");
    }

    #[test]
    fn test_update_resource_file_uploads_and_keeps_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.csv");
        std::fs::write(&path, b"x,y\n").unwrap();

        let client = MockHttpClient::new()
            .with_response(200, &success(json!({"url": "http://files.example.com/old.csv"})))
            .with_response(200, &success(json!({})));
        let engine = engine(client);

        engine
            .update_resource("r1", Some(UploadSource::File(&path)), &Value::Null)
            .unwrap();

        let update = &engine.client.requests()[1];
        assert!(update.url.ends_with("/resource_update"));
        let fields = multipart_fields(update);
        assert_eq!(field_text(fields, "url"), "http://files.example.com/old.csv");
        assert_eq!(field_text(fields, "name"), "new.csv");
        assert!(fields.iter().any(|field| field.name == "upload"));
    }

    #[test]
    fn test_delete_actions_post_identifier() {
        let engine = engine(MockHttpClient::new().with_response(200, &success(Value::Null)));
        let envelope = engine.delete_dataset("water", &Value::Null).unwrap();
        assert!(envelope.is_success());
        let request = &engine.client.requests()[0];
        assert!(request.url.ends_with("/package_delete"));
        assert_eq!(body_json(request), json!({"id": "water"}));

        let engine = self::engine(MockHttpClient::new().with_response(200, &success(Value::Null)));
        engine.delete_resource("r1", &Value::Null).unwrap();
        assert!(engine.client.requests()[0].url.ends_with("/resource_delete"));
    }

    #[test]
    fn test_download_resource_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let record = json!({
            "name": "flow",
            "id": "abc",
            "format": "CSV",
            "url": "http://files.example.com/flow.csv"
        });
        let client = MockHttpClient::new()
            .with_response(200, &success(record))
            .with_response(200, "a,b\n1,2\n");
        let engine = engine(client);

        let path = engine
            .download_resource("abc", Some(dir.path()), None)
            .unwrap();
        assert_eq!(path, dir.path().join("flow.CSV"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");

        let fetch = &engine.client.requests()[1];
        assert_eq!(fetch.method, Method::Get);
        assert_eq!(fetch.url, "http://files.example.com/flow.csv");
        // Content downloads hit the stored url directly, without API
        // headers.
        assert!(fetch.headers.is_empty());
    }

    #[test]
    fn test_download_resource_name_falls_back_to_id() {
        let dir = tempfile::tempdir().unwrap();
        let record = json!({
            "name": "",
            "id": "abc",
            "format": "tif",
            "url": "http://files.example.com/dem.tif"
        });
        let client = MockHttpClient::new()
            .with_response(200, &success(record))
            .with_response(200, "raster");
        let engine = engine(client);

        let path = engine
            .download_resource("abc", Some(dir.path()), None)
            .unwrap();
        assert_eq!(path, dir.path().join("abc.tif"));
    }

    #[test]
    fn test_download_dataset_fetches_every_resource() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("watershed");
        let dataset = json!({
            "name": "watershed",
            "resources": [
                {"name": "flow", "id": "r1", "format": "csv", "url": "http://files.example.com/flow.csv"},
                {"name": "dem", "id": "r2", "format": "tif", "url": "http://files.example.com/dem.tif"}
            ]
        });
        let client = MockHttpClient::new()
            .with_response(200, &success(dataset))
            .with_response(200, "flow-data")
            .with_response(200, "dem-data");
        let engine = engine(client);

        let files = engine.download_dataset("watershed", Some(&target)).unwrap();
        assert_eq!(
            files,
            vec![target.join("flow.csv"), target.join("dem.tif")]
        );
        assert_eq!(std::fs::read_to_string(&files[1]).unwrap(), "dem-data");
    }

    #[test]
    fn test_download_failed_lookup_raises() {
        let body = json!({
            "success": false,
            "error": {"message": "Not found", "__type": "Not Found Error"}
        });
        let engine = engine(MockHttpClient::new().with_response(404, &body.to_string()));

        let error = engine.download_resource("nope", None, None).unwrap_err();
        assert!(error.to_string().contains("Not found"));
    }

    #[test]
    fn test_download_bad_status_raises() {
        let dir = tempfile::tempdir().unwrap();
        let record = json!({
            "name": "flow",
            "id": "abc",
            "format": "csv",
            "url": "http://files.example.com/flow.csv"
        });
        let client = MockHttpClient::new()
            .with_response(200, &success(record))
            .with_response(404, "gone");
        let engine = engine(client);

        let error = engine
            .download_resource("abc", Some(dir.path()), None)
            .unwrap_err();
        assert_eq!(error.to_string(), "Download Status Code 404: Not Found");
    }

    #[test]
    fn test_rejects_non_object_params() {
        let engine = engine(MockHttpClient::new());
        let error = engine
            .get_dataset("water", &json!(["not", "an", "object"]))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Additional parameters must be a JSON object."
        );
    }
}
