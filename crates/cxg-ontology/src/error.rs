//! Error types for ontology resolution and expansion.

use thiserror::Error;

/// Errors that can occur while resolving namespaces or expanding terms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OntologyError {
    /// Category has no ontology namespace.
    #[error("Unsupported category '{category}'. Supported categories are: {supported}")]
    UnsupportedCategory {
        /// The rejected category.
        category: String,
        /// Comma-separated list of supported categories.
        supported: String,
    },

    /// Organism has no namespace for an organism-dependent category.
    #[error("Unsupported organism '{organism}' for '{category}'.")]
    UnsupportedOrganism {
        /// The rejected organism.
        organism: String,
        /// Category that needed it.
        category: String,
    },

    /// Organism-dependent category was used without an organism.
    #[error("The 'organism' parameter is required for '{category}'.")]
    OrganismRequired {
        /// Category that needed it.
        category: String,
    },

    /// Term cannot be safely embedded in a query.
    #[error("Invalid ontology term '{0}'")]
    InvalidTerm(String),

    /// Transport or endpoint failure.
    #[error("SPARQL query failed: {0}")]
    QueryFailed(String),

    /// Endpoint answered with a body that is not a result set.
    #[error("Malformed SPARQL response: {0}")]
    MalformedResponse(String),
}

impl OntologyError {
    /// Returns true for precondition violations that should reach the caller
    /// rather than be degraded into an empty expansion.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OntologyError::UnsupportedCategory { .. }
                | OntologyError::UnsupportedOrganism { .. }
                | OntologyError::OrganismRequired { .. }
        )
    }
}

/// Result type for ontology operations.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unsupported_category() {
        let err = OntologyError::UnsupportedCategory {
            category: "sex".to_string(),
            supported: "cell_type, tissue".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported category 'sex'. Supported categories are: cell_type, tissue"
        );
    }

    #[test]
    fn test_error_display_unsupported_organism() {
        let err = OntologyError::UnsupportedOrganism {
            organism: "Danio rerio".to_string(),
            category: "development_stage".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported organism 'Danio rerio' for 'development_stage'."
        );
    }

    #[test]
    fn test_error_display_organism_required() {
        let err = OntologyError::OrganismRequired {
            category: "development_stage".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The 'organism' parameter is required for 'development_stage'."
        );
    }

    #[test]
    fn test_error_display_query_failed() {
        let err = OntologyError::QueryFailed("connection refused".to_string());
        assert_eq!(err.to_string(), "SPARQL query failed: connection refused");
    }

    #[test]
    fn test_configuration_classification() {
        assert!(OntologyError::OrganismRequired {
            category: "development_stage".to_string()
        }
        .is_configuration());
        assert!(!OntologyError::QueryFailed("timeout".to_string()).is_configuration());
        assert!(!OntologyError::InvalidTerm("x y".to_string()).is_configuration());
    }
}
