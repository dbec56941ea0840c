//! Term expansion over a SPARQL endpoint.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStats, ExpansionCache};
use crate::config::CacheConfig;
use crate::error::OntologyResult;
use crate::namespace::{resolve_namespace, Category, Namespace};
use crate::query::{expansion_query, iri_to_id, label_lookup_query, LABEL_VAR, TERM_VAR};
use crate::traits::{Binding, OntologyExpander, OntologyTerm, SparqlEndpoint};

/// Expands ontology terms into their descendants.
///
/// Works with any [`SparqlEndpoint`]; production code uses
/// [`crate::SparqlClient`], tests use in-memory endpoints.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use cxg_ontology::{Binding, OntologyExpander, OntologyExtractor, OntologyResult, SparqlEndpoint};
///
/// struct OneRow;
///
/// impl SparqlEndpoint for OneRow {
///     fn query(&self, _sparql: &str) -> OntologyResult<Vec<Binding>> {
///         let mut row = HashMap::new();
///         row.insert("term".to_string(), "http://purl.obolibrary.org/obo/CL_0000540".to_string());
///         row.insert("label".to_string(), "neuron".to_string());
///         Ok(vec![row])
///     }
/// }
///
/// let extractor = OntologyExtractor::new(OneRow);
/// let terms = extractor.expand("neuron", "cell_type", None).unwrap();
/// assert_eq!(terms[0].id, "CL:0000540");
/// ```
#[derive(Debug)]
pub struct OntologyExtractor<E> {
    endpoint: E,
    cache: Option<Arc<ExpansionCache>>,
}

impl<E: SparqlEndpoint> OntologyExtractor<E> {
    /// Creates an extractor without caching.
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            cache: None,
        }
    }

    /// Creates an extractor that caches expansions.
    pub fn with_cache(endpoint: E, config: CacheConfig) -> Self {
        Self {
            endpoint,
            cache: Some(Arc::new(ExpansionCache::new(config))),
        }
    }

    /// Creates an extractor that shares an expansion cache with others.
    pub fn with_shared_cache(endpoint: E, cache: Arc<ExpansionCache>) -> Self {
        Self {
            endpoint,
            cache: Some(cache),
        }
    }

    /// Returns the underlying endpoint.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Returns expansion cache statistics, if caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Drops all cached expansions.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Expands `term` within an already resolved namespace.
    ///
    /// Rows without a label, or whose ID falls outside `namespace`, are
    /// dropped. Endpoint errors are returned unchanged.
    pub fn expand_in(&self, term: &str, namespace: Namespace) -> OntologyResult<Vec<OntologyTerm>> {
        let key = self
            .cache
            .as_ref()
            .map(|_| ExpansionCache::key(namespace, term));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                debug!(term, namespace = %namespace, "expansion cache hit");
                return Ok(hit);
            }
        }

        let sparql = expansion_query(term, namespace)?;
        debug!(term, namespace = %namespace, "executing ontology expansion query");
        let rows = self.endpoint.query(&sparql)?;

        let terms = terms_from_rows(rows, namespace);
        if terms.is_empty() {
            warn!(term, namespace = %namespace, "no expansion found");
        } else {
            debug!(term, count = terms.len(), "expansion retrieved");
        }

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.set(key, terms.clone());
        }
        Ok(terms)
    }

    /// Resolves a label or exact synonym to a single ontology ID.
    ///
    /// Returns `Ok(None)` when nothing matches.
    pub fn lookup_id(
        &self,
        label: &str,
        category: &str,
        organism: Option<&str>,
    ) -> OntologyResult<Option<String>> {
        let namespace = resolve_namespace(category.parse::<Category>()?, organism)?;
        let rows = self.endpoint.query(&label_lookup_query(label, namespace))?;

        let id = rows
            .into_iter()
            .find_map(|row| row.get(TERM_VAR).map(|iri| iri_to_id(iri)));
        if id.is_none() {
            warn!(label, category, "no ontology ID found for label");
        }
        Ok(id)
    }
}

impl<E: SparqlEndpoint> OntologyExpander for OntologyExtractor<E> {
    fn expand(
        &self,
        term: &str,
        category: &str,
        organism: Option<&str>,
    ) -> OntologyResult<Vec<OntologyTerm>> {
        let namespace = resolve_namespace(category.parse::<Category>()?, organism)?;
        self.expand_in(term, namespace)
    }
}

fn terms_from_rows(rows: Vec<Binding>, namespace: Namespace) -> Vec<OntologyTerm> {
    let mut seen = HashSet::new();
    let mut terms = Vec::with_capacity(rows.len());

    for mut row in rows {
        let (Some(iri), Some(label)) = (row.remove(TERM_VAR), row.remove(LABEL_VAR)) else {
            continue;
        };
        let id = iri_to_id(&iri);
        if Namespace::of_id(&id) != Some(namespace) {
            debug!(%id, namespace = %namespace, "dropping term outside namespace");
            continue;
        }
        if seen.insert(id.clone()) {
            terms.push(OntologyTerm { id, label });
        }
    }
    terms
}
