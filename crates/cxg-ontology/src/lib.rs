//! # cxg-ontology
//!
//! Ontology support for CellxGene filter enhancement: category to namespace
//! resolution, SPARQL query construction, and expansion of a term into the
//! term plus its descendants.
//!
//! ## Architecture
//!
//! ```text
//! OntologyExpander (trait)  <- consumed by the query enhancer
//!        ^
//! OntologyExtractor<E>      -- namespace resolution, query building, row mapping
//!        |
//! SparqlEndpoint (trait)    <- SparqlClient (HTTP) or test doubles
//! ```
//!
//! ## Supported categories
//!
//! | Category | Namespace |
//! |----------|-----------|
//! | `cell_type` | `CL` |
//! | `tissue`, `tissue_general` | `UBERON` |
//! | `disease` | `MONDO` |
//! | `development_stage` | `HsapDv` (human) / `MmusDv` (mouse) |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cxg_ontology::{ClientConfig, OntologyExpander, OntologyExtractor, SparqlClient};
//!
//! let client = SparqlClient::new(&ClientConfig::default()).unwrap();
//! let extractor = OntologyExtractor::new(client);
//! let terms = extractor.expand("neuron", "cell_type", None).unwrap();
//! for term in terms {
//!     println!("{} {}", term.id, term.label);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
mod client;
mod config;
mod error;
mod extractor;
mod namespace;
pub mod query;
mod traits;

pub use cache::{CacheStats, ExpansionCache};
pub use client::{parse_results, SparqlClient};
pub use config::{CacheConfig, ClientConfig, ClientConfigBuilder, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use error::{OntologyError, OntologyResult};
pub use extractor::OntologyExtractor;
pub use namespace::{resolve_category, resolve_namespace, Category, Namespace, Organism};
pub use traits::{Binding, OntologyExpander, OntologyTerm, SparqlEndpoint};
