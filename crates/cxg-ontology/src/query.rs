//! SPARQL query construction.
//!
//! The endpoint is expected to materialize the transitive closure of
//! `rdfs:subClassOf` and `BFO:0000050` (part of), so a single hop from the
//! input node reaches every descendant, including the node itself.

use crate::error::{OntologyError, OntologyResult};
use crate::namespace::Namespace;

/// Maximum rows requested for one expansion.
pub const EXPANSION_LIMIT: usize = 1000;

/// Variable bound to the descendant IRI.
pub const TERM_VAR: &str = "term";

/// Variable bound to the descendant label.
pub const LABEL_VAR: &str = "label";

const PREFIXES: &str = "\
PREFIX obo: <http://purl.obolibrary.org/obo/>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX oio: <http://www.geneontology.org/formats/oboInOwl#>
";

/// How an input term identifies its ontology node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// Namespaced identifier with a known prefix.
    Id(Namespace),
    /// Anything else, matched against labels and exact synonyms.
    Label,
}

/// Classifies `term` as an ID (`CL:0000540`) or a label (`neuron`).
pub fn classify_term(term: &str) -> TermKind {
    match Namespace::of_id(term) {
        Some(ns) => TermKind::Id(ns),
        None => TermKind::Label,
    }
}

/// Builds the expansion query for `term` inside `namespace`.
///
/// # Errors
///
/// Returns [`OntologyError::InvalidTerm`] for an ID whose local part cannot
/// be written as a prefixed name.
pub fn expansion_query(term: &str, namespace: Namespace) -> OntologyResult<String> {
    let iri = namespace.ontology_iri();

    let input = match classify_term(term) {
        TermKind::Id(_) => format!(
            "    VALUES ?inputTerm {{ obo:{} }}\n    ?inputTerm rdfs:isDefinedBy <{}> .\n",
            id_to_local_name(term)?,
            iri
        ),
        TermKind::Label => {
            let literal = escape_literal(term);
            format!(
                "    ?inputTerm rdfs:isDefinedBy <{iri}> .\n    {{\n        \
                 ?inputTerm rdfs:label ?inputTermLabel .\n        \
                 FILTER(LCASE(STR(?inputTermLabel)) = LCASE(\"{literal}\"))\n    \
                 }} UNION {{\n        \
                 ?inputTerm oio:hasExactSynonym ?inputTermLabel .\n        \
                 FILTER(LCASE(STR(?inputTermLabel)) = LCASE(\"{literal}\"))\n    }}\n"
            )
        }
    };

    Ok(format!(
        "{PREFIXES}
SELECT DISTINCT ?{TERM_VAR} (STR(?term_label) AS ?{LABEL_VAR})
WHERE {{
  {{
{input}
    {{ ?{TERM_VAR} rdfs:subClassOf ?inputTerm . }}
    UNION
    {{ ?{TERM_VAR} obo:BFO_0000050 ?inputTerm . }}
  }}
  ?{TERM_VAR} rdfs:isDefinedBy <{iri}> ;
        rdfs:label ?term_label .
}}
LIMIT {EXPANSION_LIMIT}
"
    ))
}

/// Builds a query resolving a label or exact synonym to a single node.
pub fn label_lookup_query(label: &str, namespace: Namespace) -> String {
    let literal = escape_literal(label);
    let iri = namespace.ontology_iri();
    format!(
        "{PREFIXES}
SELECT DISTINCT ?{TERM_VAR}
WHERE {{
  ?{TERM_VAR} rdfs:isDefinedBy <{iri}> .
  {{ ?{TERM_VAR} rdfs:label \"{literal}\" . }}
  UNION
  {{ ?{TERM_VAR} oio:hasExactSynonym \"{literal}\" . }}
}}
LIMIT 1
"
    )
}

/// Escapes a value for use inside a double-quoted SPARQL literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Turns `CL:0000540` into the local name `CL_0000540`.
fn id_to_local_name(id: &str) -> OntologyResult<String> {
    let valid = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '-'));
    if !valid {
        return Err(OntologyError::InvalidTerm(id.to_string()));
    }
    Ok(id.replacen(':', "_", 1))
}

/// Turns an entity IRI into a namespaced ID.
///
/// `http://purl.obolibrary.org/obo/CL_0000540` becomes `CL:0000540`; only
/// the first underscore of the last path segment is replaced.
pub fn iri_to_id(iri: &str) -> String {
    let local = iri.rsplit('/').next().unwrap_or(iri);
    local.replacen('_', ":", 1)
}
