//! Configuration for the CKAN registry engine.

use std::time::Duration;

/// Configuration for a [`CkanEngine`](crate::ckan::CkanEngine).
#[derive(Debug, Clone)]
pub struct CkanConfig {
    /// Action API endpoint, e.g. `https://data.example.com/api/3/action/`.
    pub endpoint: String,

    /// API key sent with every action request.
    ///
    /// Anonymous access works for read actions on open registries.
    pub api_key: Option<String>,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl CkanConfig {
    /// Create a configuration for the given action endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CkanConfig::new("https://data.example.com/api/3/action/");
        assert_eq!(config.endpoint, "https://data.example.com/api/3/action/");
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_pattern() {
        let config = CkanConfig::new("https://data.example.com/api/3/action/")
            .with_api_key("abc-123")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.api_key.as_deref(), Some("abc-123"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
