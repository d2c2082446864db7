//! Configuration for the GeoServer catalog engine.

use std::time::Duration;

/// Default admin account shipped with stock GeoServer installs.
pub const DEFAULT_USERNAME: &str = "admin";
/// Default admin password shipped with stock GeoServer installs.
pub const DEFAULT_PASSWORD: &str = "geoserver";

/// Configuration for a [`GeoServerEngine`](crate::geoserver::GeoServerEngine).
#[derive(Debug, Clone)]
pub struct GeoServerConfig {
    /// REST configuration endpoint, e.g. `http://localhost:8181/geoserver/rest/`.
    pub endpoint: String,

    /// Username for HTTP basic auth.
    pub username: String,

    /// Password for HTTP basic auth.
    pub password: String,

    /// Publicly reachable REST endpoint.
    ///
    /// Used for derived service URLs and catalog reloads when the internal
    /// endpoint is not routable from outside the deployment.
    pub public_endpoint: Option<String>,

    /// Ports of each node in a clustered deployment.
    ///
    /// When set, catalog reloads are issued to every node individually.
    pub node_ports: Option<Vec<u16>>,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl GeoServerConfig {
    /// Create a configuration for the given REST endpoint with default
    /// credentials.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            public_endpoint: None,
            node_ports: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the basic auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the publicly reachable REST endpoint.
    pub fn with_public_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.public_endpoint = Some(endpoint.into());
        self
    }

    /// Set the node ports for a clustered deployment.
    pub fn with_node_ports(mut self, ports: Vec<u16>) -> Self {
        self.node_ports = Some(ports);
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
