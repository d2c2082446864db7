//! HTTP transport abstraction for the catalog and registry clients.
//!
//! Engines talk to the network through the [`HttpClient`] trait so tests
//! can substitute a scripted mock. The real implementation wraps a
//! blocking reqwest client with optional basic-auth credentials.
//!
//! Transport and protocol concerns are split deliberately: `execute`
//! returns `Err` only for transport-level failures (connection refused,
//! timeout, invalid request). HTTP status codes come back inside
//! [`HttpResponse`] for the engines to interpret, because a 404 or a 500
//! body is meaningful input to the publish protocol, not an error in
//! itself.

use std::borrow::Cow;
use std::time::Duration;

use thiserror::Error;

/// Default timeout for catalog requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised by the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The underlying client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// The request never produced a response.
    #[error("request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The request could not be assembled (for example a bad multipart
    /// part).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// HTTP verbs used by the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// One field of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartField {
    pub name: String,
    pub value: MultipartValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartValue {
    Text(String),
    File { file_name: String, data: Vec<u8> },
}

impl MultipartField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        MultipartField {
            name: name.into(),
            value: MultipartValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        MultipartField {
            name: name.into(),
            value: MultipartValue::File {
                file_name: file_name.into(),
                data,
            },
        }
    }
}

/// Request body variants the engines emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Raw bytes with an explicit content type (XML payloads, zip
    /// archives, raw raster files).
    Bytes { content_type: String, data: Vec<u8> },

    /// URL-encoded form fields.
    Form(Vec<(String, String)>),

    /// Multipart form (registry file uploads).
    Multipart(Vec<MultipartField>),
}

/// A single HTTP request, built with the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Append one query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append one header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a raw body with its content type.
    pub fn with_body(
        mut self,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.body = Some(RequestBody::Bytes {
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Set a URL-encoded form body.
    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Set a multipart form body.
    pub fn with_multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = Some(RequestBody::Multipart(fields));
        self
    }

    /// Query parameter lookup, mostly for tests and logging.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Canonical reason phrase for the status code.
    pub fn reason(&self) -> &'static str {
        reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown Status")
    }
}

/// Trait for HTTP operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Perform the request, returning the response or a transport error.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    credentials: Option<(String, String)>,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            credentials: None,
        })
    }

    /// Attach basic-auth credentials applied to every request.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new().expect("Failed to create default HTTP client")
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.as_str());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &self.credentials {
            builder = builder.basic_auth(username, Some(password));
        }

        builder = match request.body {
            Some(RequestBody::Bytes { content_type, data }) => {
                builder.header("Content-type", content_type).body(data)
            }
            Some(RequestBody::Form(fields)) => builder.form(&fields),
            Some(RequestBody::Multipart(fields)) => {
                let mut form = reqwest::blocking::multipart::Form::new();
                for field in fields {
                    form = match field.value {
                        MultipartValue::Text(value) => form.text(field.name, value),
                        MultipartValue::File { file_name, data } => form.part(
                            field.name,
                            reqwest::blocking::multipart::Part::bytes(data).file_name(file_name),
                        ),
                    };
                }
                builder.multipart(form)
            }
            None => builder,
        };

        let response = builder.send().map_err(|e| HttpError::RequestFailed {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| HttpError::RequestFailed {
                url: request.url,
                reason: format!("failed to read response body: {}", e),
            })?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}
