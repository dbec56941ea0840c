//! Blocking HTTP client for SPARQL 1.1 endpoints.

use std::collections::HashMap;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{OntologyError, OntologyResult};
use crate::traits::{Binding, SparqlEndpoint};

const RESULTS_JSON: &str = "application/sparql-results+json";

/// SPARQL endpoint reached over HTTP.
///
/// Queries are sent as a form-encoded `POST` and answered as SPARQL JSON
/// results. The underlying connection pool is shared by clones.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    http: Client,
    endpoint: String,
}

impl SparqlClient {
    /// Creates a client from configuration.
    pub fn new(config: &ClientConfig) -> OntologyResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| OntologyError::QueryFailed(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint URL this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SparqlEndpoint for SparqlClient {
    fn query(&self, sparql: &str) -> OntologyResult<Vec<Binding>> {
        debug!(endpoint = %self.endpoint, bytes = sparql.len(), "sending SPARQL query");

        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, RESULTS_JSON)
            .form(&[("query", sparql)])
            .send()
            .map_err(|e| OntologyError::QueryFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| OntologyError::QueryFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(OntologyError::QueryFailed(format!(
                "endpoint returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        parse_results(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    results: ResultsBody,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    bindings: Vec<HashMap<String, BoundValue>>,
}

#[derive(Debug, Deserialize)]
struct BoundValue {
    value: String,
}

/// Decodes an `application/sparql-results+json` document into bindings.
pub fn parse_results(body: &str) -> OntologyResult<Vec<Binding>> {
    let doc: ResultsDocument =
        serde_json::from_str(body).map_err(|e| OntologyError::MalformedResponse(e.to_string()))?;

    Ok(doc
        .results
        .bindings
        .into_iter()
        .map(|row| row.into_iter().map(|(var, v)| (var, v.value)).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results() {
        let body = r#"{
            "head": {"vars": ["term", "label"]},
            "results": {"bindings": [
                {
                    "term": {"type": "uri", "value": "http://purl.obolibrary.org/obo/CL_0000540"},
                    "label": {"type": "literal", "value": "neuron"}
                },
                {
                    "term": {"type": "uri", "value": "http://purl.obolibrary.org/obo/CL_0000100"}
                }
            ]}
        }"#;

        let rows = parse_results(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["label"], "neuron");
        assert_eq!(
            rows[0]["term"],
            "http://purl.obolibrary.org/obo/CL_0000540"
        );
        assert!(!rows[1].contains_key("label"));
    }

    #[test]
    fn test_parse_empty_results() {
        let body = r#"{"head": {"vars": ["term"]}, "results": {"bindings": []}}"#;
        assert!(parse_results(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_results("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, OntologyError::MalformedResponse(_)));
    }

    #[test]
    fn test_client_keeps_endpoint() {
        let config = ClientConfig::builder()
            .with_endpoint("http://localhost:1/sparql")
            .build();
        let client = SparqlClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1/sparql");
    }
}
