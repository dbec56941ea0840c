//! # cxg-query-enhancer
//!
//! Rewrites CellxGene census filter expressions so that each ontology term
//! also matches its descendants, restricted to the terms that actually occur
//! in a given census release.
//!
//! ```text
//! "cell_type == 'neuron'"
//!     -> cell_type in ['neuron', 'glutamatergic neuron', ...]
//! ```
//!
//! ## Pipeline
//!
//! 1. [`cxg_filter`] parses the filter and extracts the values compared
//!    against `cell_type`, `tissue`, `disease`, ... and their
//!    `*_ontology_term_id` columns.
//! 2. [`ExpansionCoordinator`] expands every term through an
//!    [`cxg_ontology::OntologyExpander`] on a bounded worker pool.
//! 3. [`TermInventoryCache`] drops expanded IDs that never occur in the
//!    census release, with a memo and durable `.cxgi` files in front of the
//!    [`CensusBackend`].
//! 4. The filter is rewritten with sorted, deduplicated value lists.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cxg_query_enhancer::{EnhanceRequest, EnhancerConfig, InMemoryCensus, QueryEnhancer};
//!
//! let census = InMemoryCensus::new(10_000);
//! let enhancer = QueryEnhancer::from_config(&EnhancerConfig::default(), Arc::new(census))?;
//!
//! let rewritten = enhancer.enhance(
//!     &EnhanceRequest::new("cell_type == 'neuron' and tissue == 'kidney'")
//!         .with_organism("Homo sapiens")
//!         .with_dataset_version("2025-01-30"),
//! );
//! println!("{}", rewritten);
//! # Ok::<(), cxg_query_enhancer::EnhancerError>(())
//! ```
//!
//! ## Failure behavior
//!
//! [`QueryEnhancer::enhance`] never fails. Invalid syntax returns the input,
//! a failed term expansion contributes nothing, and an unreachable census
//! leaves expansions unfiltered. Every degradation is logged through
//! `tracing`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod census;
mod config;
mod coordinator;
mod enhancer;
pub mod error;
pub mod inventory;
pub mod pool;

pub use census::{CensusBackend, InMemoryCensus, ValueChunk, ValueStream};
pub use config::{EnhancerConfig, EnhancerConfigBuilder, DEFAULT_CACHE_DIR, DEFAULT_ORGANISM};
pub use coordinator::{ExpansionCoordinator, DEFAULT_MAX_WORKERS};
pub use enhancer::{EnhanceRequest, QueryEnhancer};
pub use error::{EnhancerError, EnhancerResult};
pub use inventory::{InventoryKey, InventoryStats, InventoryStore, TermInventoryCache};
pub use pool::{PoolGuard, PooledExpander, ResourcePool};
