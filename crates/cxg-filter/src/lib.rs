//! # cxg-filter
//!
//! Parser, walker and rewriter for the boolean filter expressions used to
//! slice single-cell datasets, e.g.
//! `cell_type == 'neuron' and tissue in ['kidney', 'liver']`.
//!
//! This crate provides:
//! - **Parser**: turn filter text into an [`Expr`] tree
//! - **Extraction**: find comparisons on category and ontology-ID columns
//! - **Rewriting**: replace those comparisons with expanded value lists
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use cxg_filter::{extract, group_terms, rewrite};
//!
//! let (expr, triples) = extract("cell_type == 'neuron' and sex == 'female'", &["cell_type"]).unwrap();
//! let groups = group_terms(&triples);
//! assert_eq!(groups.labels["cell_type"], vec!["neuron"]);
//!
//! let mut labels = BTreeMap::new();
//! labels.insert("cell_type".to_string(), vec!["neuron".to_string(), "motor neuron".to_string()]);
//! let out = rewrite(&expr, &labels, &BTreeMap::new());
//! assert_eq!(out.to_string(), "cell_type in ['motor neuron', 'neuron'] and sex == 'female'");
//! ```
//!
//! ## Syntax Quick Reference
//!
//! | Construct | Example |
//! |-----------|---------|
//! | Equality | `cell_type == 'neuron'` |
//! | Membership | `tissue in ['kidney', 'liver']` |
//! | Negation | `not disease == 'normal'` |
//! | Connectors | `a == 1 and (b == 2 or c == 3)` |
//! | Identity | `suspension_type is not None` |
//! | Ordering | `n_genes >= 500` |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ast;
mod error;
mod parser;
mod rewrite;

pub use ast::{BoolOperator, CompareOperator, Expr, Literal};
pub use error::{FilterError, FilterResult};
pub use parser::parse;
pub use rewrite::{
    classify_column, extract, extract_triples, group_terms, rewrite, ColumnKind, FilterTriple,
    TermGroups, ID_COLUMN_SUFFIX,
};
