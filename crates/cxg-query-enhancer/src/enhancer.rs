//! The public entry point: rewrite a filter so each term covers its
//! ontology descendants present in the census.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cxg_filter::{extract, group_terms, rewrite, FilterTriple};
use cxg_ontology::{
    Category, ExpansionCache, OntologyError, OntologyExpander, OntologyExtractor, SparqlClient,
};
use tracing::{debug, error, info, warn};

use crate::census::CensusBackend;
use crate::config::EnhancerConfig;
use crate::coordinator::ExpansionCoordinator;
use crate::error::EnhancerResult;
use crate::inventory::{InventoryStore, TermInventoryCache};
use crate::pool::{PooledExpander, ResourcePool};

/// One enhancement call.
///
/// # Example
///
/// ```rust
/// use cxg_query_enhancer::EnhanceRequest;
///
/// let request = EnhanceRequest::new("cell_type == 'neuron' and disease == 'normal'")
///     .with_categories(["cell_type"])
///     .with_organism("Homo sapiens")
///     .with_dataset_version("2025-01-30");
/// assert_eq!(request.organism.as_deref(), Some("Homo sapiens"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnhanceRequest {
    /// Filter expression to rewrite.
    pub filter: String,
    /// Categories to enhance. `None` enhances every supported category found
    /// in the filter.
    pub categories: Option<Vec<String>>,
    /// Organism. `None` uses the configured default.
    pub organism: Option<String>,
    /// Census release to filter against. `None` skips census filtering.
    pub dataset_version: Option<String>,
}

impl EnhanceRequest {
    /// Creates a request for `filter` with every option unset.
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Default::default()
        }
    }

    /// Restricts enhancement to `categories`.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the organism.
    pub fn with_organism(mut self, organism: impl Into<String>) -> Self {
        self.organism = Some(organism.into());
        self
    }

    /// Sets the census release.
    pub fn with_dataset_version(mut self, version: impl Into<String>) -> Self {
        self.dataset_version = Some(version.into());
        self
    }
}

/// Rewrites filter expressions with ontology closure.
///
/// Never fails once built: parse errors, failed expansions and an
/// unreachable census all degrade to a less expanded result.
#[derive(Debug)]
pub struct QueryEnhancer {
    coordinator: ExpansionCoordinator,
    default_organism: String,
}

impl QueryEnhancer {
    /// Creates an enhancer around a ready coordinator.
    pub fn new(coordinator: ExpansionCoordinator, default_organism: impl Into<String>) -> Self {
        Self {
            coordinator,
            default_organism: default_organism.into(),
        }
    }

    /// Builds the production stack: a pool of `max_workers` SPARQL
    /// extractors, and an inventory cache over `census` persisted in
    /// `cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client or the worker pool cannot be built.
    pub fn from_config(config: &EnhancerConfig, census: Arc<dyn CensusBackend>) -> EnhancerResult<Self> {
        let shared_cache = config
            .expansion_cache
            .clone()
            .map(|cache| Arc::new(ExpansionCache::new(cache)));

        let pool = ResourcePool::from_fn(config.max_workers.max(1), |_| {
            let client = SparqlClient::new(&config.client)?;
            Ok::<_, OntologyError>(match &shared_cache {
                Some(cache) => OntologyExtractor::with_shared_cache(client, Arc::clone(cache)),
                None => OntologyExtractor::new(client),
            })
        })?;
        info!(
            endpoint = %config.client.endpoint,
            clients = pool.capacity(),
            "ontology client pool ready"
        );

        let inventory = match &config.cache_dir {
            Some(dir) => TermInventoryCache::with_store(census, InventoryStore::new(dir)),
            None => TermInventoryCache::new(census),
        };

        Self::with_expander(Arc::new(PooledExpander::new(pool)), Some(Arc::new(inventory)), config)
    }

    /// Builds an enhancer over any expander and optional inventory cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be built.
    pub fn with_expander(
        expander: Arc<dyn OntologyExpander>,
        inventory: Option<Arc<TermInventoryCache>>,
        config: &EnhancerConfig,
    ) -> EnhancerResult<Self> {
        let mut coordinator = ExpansionCoordinator::new(expander, config.max_workers)?;
        if let Some(inventory) = inventory {
            coordinator = coordinator.with_inventory(inventory);
        }
        Ok(Self::new(coordinator, config.default_organism.clone()))
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &ExpansionCoordinator {
        &self.coordinator
    }

    /// Returns the inventory cache, if any.
    pub fn inventory(&self) -> Option<&Arc<TermInventoryCache>> {
        self.coordinator.inventory()
    }

    /// Organism used when a request names none.
    pub fn default_organism(&self) -> &str {
        &self.default_organism
    }

    /// Rewrites `request.filter`.
    ///
    /// Returns the input unchanged if it does not parse or mentions no
    /// requested category.
    pub fn enhance(&self, request: &EnhanceRequest) -> String {
        let organism_given = request.organism.is_some();
        let organism = match &request.organism {
            Some(organism) => organism.as_str(),
            None => {
                info!(organism = %self.default_organism, "no organism given, using default");
                self.default_organism.as_str()
            }
        };

        let candidates: Vec<&str> = match &request.categories {
            None => Category::names(),
            Some(requested) => {
                let supported = Category::names();
                let mut kept: Vec<&str> = supported
                    .into_iter()
                    .filter(|name| requested.iter().any(|r| r == name))
                    .collect();
                kept.sort_unstable();
                kept
            }
        };
        if candidates.is_empty() {
            info!("no supported categories requested, returning original filter");
            return request.filter.clone();
        }

        let (expr, triples) = match extract(&request.filter, &candidates) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "invalid filter syntax, returning original filter");
                return request.filter.clone();
            }
        };

        let groups = group_terms(&triples);
        if groups.is_empty() {
            info!("no relevant categories or terms found, returning original filter");
            return request.filter.clone();
        }
        warn_repeated_columns(&triples);

        let categories = groups.categories();
        if request.categories.is_none() {
            info!(?categories, "auto-detected categories");
        } else {
            info!(?categories, "categories to be processed");
        }
        if !organism_given && categories.contains(&Category::DevelopmentStage.as_str()) {
            warn!(
                organism,
                "processing development_stage with the default organism; pass an organism explicitly"
            );
        }

        let version = request.dataset_version.as_deref();
        let labels = self.expand_groups(&groups.labels, organism, version, true);
        let ids = self.expand_groups(&groups.ids, organism, version, false);

        let rewritten = rewrite(&expr, &labels, &ids).to_string();
        info!("filter rewritten");
        debug!(original = %request.filter, rewritten = %rewritten, "rewrite result");
        rewritten
    }

    /// Convenience for [`Self::enhance`] with every option unset.
    pub fn enhance_filter(&self, filter: &str) -> String {
        self.enhance(&EnhanceRequest::new(filter))
    }

    fn expand_groups(
        &self,
        groups: &BTreeMap<String, Vec<String>>,
        organism: &str,
        version: Option<&str>,
        label_based: bool,
    ) -> BTreeMap<String, Vec<String>> {
        groups
            .iter()
            .map(|(category, terms)| {
                let expanded =
                    self.coordinator
                        .process(terms, category, Some(organism), version, label_based);
                (category.clone(), expanded)
            })
            .collect()
    }
}

/// Logs columns that occur in more than one comparison; all of their
/// occurrences receive the same merged replacement list.
fn warn_repeated_columns(triples: &[FilterTriple]) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for triple in triples {
        *counts.entry(triple.column.as_str()).or_default() += 1;
    }
    for (column, count) in counts {
        if count > 1 {
            warn!(
                column,
                occurrences = count,
                "column compared more than once; occurrences share one merged value list"
            );
        }
    }
}
