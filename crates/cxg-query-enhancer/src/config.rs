//! Configuration for the query enhancer.

use std::path::PathBuf;

use cxg_ontology::{CacheConfig, ClientConfig};

use crate::coordinator::DEFAULT_MAX_WORKERS;

/// Default directory for durable inventory files.
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Organism used when a request names none.
pub const DEFAULT_ORGANISM: &str = "homo_sapiens";

/// Configuration for [`crate::QueryEnhancer`].
///
/// # Example
///
/// ```rust
/// use cxg_query_enhancer::EnhancerConfig;
///
/// let config = EnhancerConfig::builder()
///     .with_max_workers(3)
///     .without_cache_dir()
///     .build();
/// assert_eq!(config.max_workers, 3);
/// assert!(config.cache_dir.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancerConfig {
    /// SPARQL client settings, shared by every pooled client.
    pub client: ClientConfig,
    /// Concurrent expansion requests, and the number of pooled clients.
    pub max_workers: usize,
    /// Directory for durable inventory files. `None` keeps inventories in
    /// memory only.
    pub cache_dir: Option<PathBuf>,
    /// Organism used when a request names none.
    pub default_organism: String,
    /// Expansion cache shared by the pooled clients. `None` disables it.
    pub expansion_cache: Option<CacheConfig>,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            cache_dir: Some(PathBuf::from(DEFAULT_CACHE_DIR)),
            default_organism: DEFAULT_ORGANISM.to_string(),
            expansion_cache: None,
        }
    }
}

impl EnhancerConfig {
    /// Creates a new builder for EnhancerConfig.
    pub fn builder() -> EnhancerConfigBuilder {
        EnhancerConfigBuilder::default()
    }
}

/// Builder for EnhancerConfig.
#[derive(Debug, Clone, Default)]
pub struct EnhancerConfigBuilder {
    config: EnhancerConfig,
}

impl EnhancerConfigBuilder {
    /// Sets the SPARQL client configuration.
    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.config.client = client;
        self
    }

    /// Sets the number of concurrent expansions.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = max_workers;
        self
    }

    /// Sets the durable inventory directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    /// Keeps inventories in memory only.
    pub fn without_cache_dir(mut self) -> Self {
        self.config.cache_dir = None;
        self
    }

    /// Sets the organism used when a request names none.
    pub fn with_default_organism(mut self, organism: impl Into<String>) -> Self {
        self.config.default_organism = organism.into();
        self
    }

    /// Enables the expansion cache.
    pub fn with_expansion_cache(mut self, cache: CacheConfig) -> Self {
        self.config.expansion_cache = Some(cache);
        self
    }

    /// Builds the EnhancerConfig.
    pub fn build(self) -> EnhancerConfig {
        self.config
    }
}
