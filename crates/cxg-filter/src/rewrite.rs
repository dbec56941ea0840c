//! Term extraction and rewriting over parsed filter expressions.
//!
//! A comparison is interesting when its left side is a bare column name that
//! is either a category (`cell_type`) or the ID column of a category
//! (`cell_type_ontology_term_id`). Extraction collects the literal values of
//! those comparisons; rewriting swaps them for expanded value lists.

use std::collections::BTreeMap;

use crate::ast::{CompareOperator, Expr};
use crate::error::FilterResult;
use crate::parser::parse;

/// Suffix that turns a category name into its ID column name.
pub const ID_COLUMN_SUFFIX: &str = "_ontology_term_id";

/// Whether a column holds human-readable labels or ontology IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnKind {
    /// Column named after the category itself, e.g. `cell_type`.
    Label,
    /// Column named `{category}_ontology_term_id`.
    Id,
}

/// A recognized `(column, operator, values)` comparison.
///
/// Equality to one value and membership in a list are both normalized to a
/// value list, so downstream code never looks at the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterTriple {
    /// Column name as written in the filter.
    pub column: String,
    /// Category the column belongs to.
    pub category: String,
    /// Label or ID column.
    pub kind: ColumnKind,
    /// String literal values in source order.
    pub values: Vec<String>,
}

/// Per-category term lists gathered from a set of triples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermGroups {
    /// Label values keyed by category.
    pub labels: BTreeMap<String, Vec<String>>,
    /// ID values keyed by category.
    pub ids: BTreeMap<String, Vec<String>>,
}

impl TermGroups {
    /// Returns true if no terms were collected.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.ids.is_empty()
    }

    /// Categories that have at least one label or ID, in sorted order.
    pub fn categories(&self) -> Vec<&str> {
        let mut cats: Vec<&str> = self
            .labels
            .keys()
            .chain(self.ids.keys())
            .map(String::as_str)
            .collect();
        cats.sort_unstable();
        cats.dedup();
        cats
    }
}

/// Maps a column name to its category and kind, if it belongs to one of
/// `categories`.
pub fn classify_column<S: AsRef<str>>(
    column: &str,
    categories: &[S],
) -> Option<(String, ColumnKind)> {
    let known = |name: &str| categories.iter().any(|c| c.as_ref() == name);

    if known(column) {
        return Some((column.to_string(), ColumnKind::Label));
    }
    column
        .strip_suffix(ID_COLUMN_SUFFIX)
        .filter(|base| known(base))
        .map(|base| (base.to_string(), ColumnKind::Id))
}

/// Walks `expr` and collects every recognized comparison on a column of one
/// of `categories`.
///
/// Only `column == 'value'` and `column in ['a', 'b']` are recognized; any
/// other shape is walked over without producing a triple.
pub fn extract_triples<S: AsRef<str>>(expr: &Expr, categories: &[S]) -> Vec<FilterTriple> {
    let mut triples = Vec::new();
    collect(expr, categories, &mut triples);
    triples
}

fn collect<S: AsRef<str>>(expr: &Expr, categories: &[S], out: &mut Vec<FilterTriple>) {
    if let Expr::Compare { left, op, right } = expr {
        if let Some(column) = left.as_name() {
            if let Some((category, kind)) = classify_column(column, categories) {
                if let Some(values) = literal_values(*op, right) {
                    out.push(FilterTriple {
                        column: column.to_string(),
                        category,
                        kind,
                        values,
                    });
                }
            }
        }
    }

    for child in expr.children() {
        collect(child, categories, out);
    }
}

fn literal_values(op: CompareOperator, right: &Expr) -> Option<Vec<String>> {
    match (op, right) {
        (CompareOperator::Eq, value) => value.as_str_literal().map(|s| vec![s.to_string()]),
        (CompareOperator::In, Expr::List(items)) => Some(
            items
                .iter()
                .filter_map(Expr::as_str_literal)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

/// Merges triples into per-category label and ID lists.
///
/// Every occurrence of a column contributes to the same list. Duplicates
/// are dropped, first occurrence wins the position.
pub fn group_terms(triples: &[FilterTriple]) -> TermGroups {
    let mut groups = TermGroups::default();
    for triple in triples {
        let target = match triple.kind {
            ColumnKind::Label => &mut groups.labels,
            ColumnKind::Id => &mut groups.ids,
        };
        let values = target.entry(triple.category.clone()).or_default();
        for value in &triple.values {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }
    }
    groups
}

/// Parses `text` and extracts triples for `categories`.
///
/// Returns the parse error unchanged so the caller can decide to fall back
/// to the original text.
pub fn extract<S: AsRef<str>>(
    text: &str,
    categories: &[S],
) -> FilterResult<(Expr, Vec<FilterTriple>)> {
    let expr = parse(text)?;
    let triples = extract_triples(&expr, categories);
    Ok((expr, triples))
}

/// Rewrites every comparison whose column has a non-empty replacement list.
///
/// `labels` is keyed by category for label columns, `ids` by category for
/// `{category}_ontology_term_id` columns. A matching comparison becomes
/// `column in [...]` with the replacement values sorted and deduplicated,
/// whatever its original operator. Everything else is copied unchanged.
pub fn rewrite(
    expr: &Expr,
    labels: &BTreeMap<String, Vec<String>>,
    ids: &BTreeMap<String, Vec<String>>,
) -> Expr {
    match expr {
        Expr::Compare { left, op, right } => {
            if let Some(values) = left.as_name().and_then(|c| replacement(c, labels, ids)) {
                let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                sorted.dedup();
                return Expr::Compare {
                    left: left.clone(),
                    op: CompareOperator::In,
                    right: Box::new(Expr::string_list(sorted)),
                };
            }
            Expr::Compare {
                left: Box::new(rewrite(left, labels, ids)),
                op: *op,
                right: Box::new(rewrite(right, labels, ids)),
            }
        }
        Expr::BoolOp { op, operands } => Expr::BoolOp {
            op: *op,
            operands: operands.iter().map(|e| rewrite(e, labels, ids)).collect(),
        },
        Expr::Not(inner) => Expr::Not(Box::new(rewrite(inner, labels, ids))),
        Expr::Nested(inner) => Expr::Nested(Box::new(rewrite(inner, labels, ids))),
        Expr::List(items) => Expr::List(items.iter().map(|e| rewrite(e, labels, ids)).collect()),
        Expr::Tuple(items) => {
            Expr::Tuple(items.iter().map(|e| rewrite(e, labels, ids)).collect())
        }
        Expr::Name(_) | Expr::Literal(_) => expr.clone(),
    }
}

fn replacement<'a>(
    column: &str,
    labels: &'a BTreeMap<String, Vec<String>>,
    ids: &'a BTreeMap<String, Vec<String>>,
) -> Option<&'a Vec<String>> {
    let found = match labels.get(column) {
        Some(values) => Some(values),
        None => column
            .strip_suffix(ID_COLUMN_SUFFIX)
            .and_then(|base| ids.get(base)),
    };
    found.filter(|values| !values.is_empty())
}
