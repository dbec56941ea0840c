//! Traits at the service boundaries.
//!
//! [`SparqlEndpoint`] is the transport seam: anything that can run a SPARQL
//! `SELECT` and hand back variable bindings. [`OntologyExpander`] is the
//! seam consumed by the enhancer: given a term and category, return the term
//! and its descendants. [`crate::OntologyExtractor`] connects the two.
//!
//! # Example: a fixed endpoint for tests
//!
//! ```rust
//! use std::collections::HashMap;
//! use cxg_ontology::{Binding, OntologyResult, SparqlEndpoint};
//!
//! struct Fixed(Vec<Binding>);
//!
//! impl SparqlEndpoint for Fixed {
//!     fn query(&self, _sparql: &str) -> OntologyResult<Vec<Binding>> {
//!         Ok(self.0.clone())
//!     }
//! }
//!
//! let mut row = HashMap::new();
//! row.insert("term".to_string(), "http://purl.obolibrary.org/obo/CL_0000540".to_string());
//! row.insert("label".to_string(), "neuron".to_string());
//! let endpoint = Fixed(vec![row]);
//! assert_eq!(endpoint.query("SELECT ...").unwrap().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::OntologyResult;

/// One result row: variable name to bound value.
pub type Binding = HashMap<String, String>;

/// An ontology term with its human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OntologyTerm {
    /// Namespaced identifier, e.g. `CL:0000540`.
    pub id: String,
    /// Primary label, e.g. `neuron`.
    pub label: String,
}

impl OntologyTerm {
    /// Creates a new term.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Executes SPARQL `SELECT` queries.
///
/// Implementations must be safe to share across worker threads.
pub trait SparqlEndpoint: Send + Sync {
    /// Runs `sparql` and returns one [`Binding`] per result row.
    fn query(&self, sparql: &str) -> OntologyResult<Vec<Binding>>;
}

/// Expands a term into itself plus its descendants.
pub trait OntologyExpander: Send + Sync {
    /// Returns the closure of `term` within the namespace of `category`.
    ///
    /// `term` is either a namespaced ID or a label. `organism` is only
    /// consulted for organism-dependent categories.
    fn expand(
        &self,
        term: &str,
        category: &str,
        organism: Option<&str>,
    ) -> OntologyResult<Vec<OntologyTerm>>;
}

impl<T: SparqlEndpoint + ?Sized> SparqlEndpoint for Arc<T> {
    fn query(&self, sparql: &str) -> OntologyResult<Vec<Binding>> {
        (**self).query(sparql)
    }
}

impl<T: OntologyExpander + ?Sized> OntologyExpander for Arc<T> {
    fn expand(
        &self,
        term: &str,
        category: &str,
        organism: Option<&str>,
    ) -> OntologyResult<Vec<OntologyTerm>> {
        (**self).expand(term, category, organism)
    }
}
