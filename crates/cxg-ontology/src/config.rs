//! Configuration types for the SPARQL client and expansion cache.

use std::time::Duration;

/// Public Ubergraph endpoint, which materializes subclass and part-of closure.
pub const DEFAULT_ENDPOINT: &str = "https://ubergraph.apps.renci.org/sparql";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for [`crate::SparqlClient`].
///
/// # Example
///
/// ```rust
/// use cxg_ontology::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .with_endpoint("http://localhost:8890/sparql")
///     .with_timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(config.endpoint, "http://localhost:8890/sparql");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// SPARQL endpoint URL.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("cxg-ontology/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a new builder for ClientConfig.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Builds the ClientConfig.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Configuration for the expansion cache.
///
/// # Example
///
/// ```rust
/// use cxg_ontology::CacheConfig;
/// use std::time::Duration;
///
/// let cache = CacheConfig {
///     max_entries: 5_000,
///     ttl: Duration::from_secs(3600),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached expansions.
    pub max_entries: usize,
    /// Time-to-live for cached expansions.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}
