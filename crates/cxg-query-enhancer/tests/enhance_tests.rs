//! End-to-end tests for filter enhancement through the public API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cxg_ontology::{
    resolve_category, ClientConfig, OntologyError, OntologyExpander, OntologyResult, OntologyTerm,
};
use cxg_query_enhancer::{
    CensusBackend, EnhanceRequest, EnhancerConfig, EnhancerError, EnhancerResult, InMemoryCensus,
    InventoryStore, QueryEnhancer, TermInventoryCache, ValueStream,
};
use tempfile::tempdir;

const VERSION: &str = "2025-01-30";
const HUMAN: &str = "homo_sapiens";

/// Mock expander keyed by `(category, term)`. Unknown pairs fail like an
/// unreachable endpoint; organism-dependent categories validate the organism.
struct MockExpander {
    table: HashMap<(String, String), Vec<OntologyTerm>>,
}

impl MockExpander {
    fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    fn with(mut self, category: &str, term: &str, expansion: &[(&str, &str)]) -> Self {
        let terms = expansion
            .iter()
            .map(|(id, label)| OntologyTerm::new(*id, *label))
            .collect();
        self.table
            .insert((category.to_string(), term.to_string()), terms);
        self
    }

    /// Expansions from the worked examples of the rewrite rules.
    fn standard() -> Self {
        Self::new()
            .with(
                "cell_type",
                "CL:0000540",
                &[("CL:0000540", "neuron"), ("CL:child_540", "child 540")],
            )
            .with(
                "cell_type",
                "CL:0000566",
                &[("CL:0000566", "angioblastic mesenchymal cell"), ("CL:child_566", "child 566")],
            )
            .with(
                "cell_type",
                "neuron",
                &[("CL:0000540", "neuron"), ("CL:neuron_child", "Neuron Child")],
            )
            .with(
                "tissue",
                "kidney",
                &[("UBERON:0002113", "kidney"), ("UBERON:0001285", "nephron")],
            )
            .with("disease", "normal", &[])
            .with(
                "development_stage",
                "adult stage",
                &[("HsapDv:0000258", "adult stage"), ("HsapDv:0000087", "human adult stage")],
            )
    }
}

impl OntologyExpander for MockExpander {
    fn expand(
        &self,
        term: &str,
        category: &str,
        organism: Option<&str>,
    ) -> OntologyResult<Vec<OntologyTerm>> {
        resolve_category(category, organism)?;
        self.table
            .get(&(category.to_string(), term.to_string()))
            .cloned()
            .ok_or_else(|| OntologyError::QueryFailed(format!("503 for {}", term)))
    }
}

/// Census that is always down.
struct DownCensus;

impl CensusBackend for DownCensus {
    fn stream_distinct_values(
        &self,
        _version: &str,
        _organism: &str,
        _column: &str,
    ) -> EnhancerResult<ValueStream<'_>> {
        Err(EnhancerError::Census("census unavailable".to_string()))
    }
}

fn census() -> InMemoryCensus {
    InMemoryCensus::new(2)
        .with_values(
            VERSION,
            HUMAN,
            "cell_type_ontology_term_id",
            ["CL:0000540", "CL:child_566", "CL:neuron_child", "unknown"],
        )
        .with_null(VERSION, HUMAN, "cell_type_ontology_term_id")
        .with_values(
            VERSION,
            HUMAN,
            "tissue_ontology_term_id",
            ["UBERON:0002113", "UBERON:0001285"],
        )
        .with_values(
            VERSION,
            HUMAN,
            "development_stage_ontology_term_id",
            ["HsapDv:0000087"],
        )
}

fn memory_config() -> EnhancerConfig {
    EnhancerConfig::builder().without_cache_dir().build()
}

fn enhancer_with(census: Arc<dyn CensusBackend>) -> QueryEnhancer {
    let inventory = Arc::new(TermInventoryCache::new(census));
    QueryEnhancer::with_expander(Arc::new(MockExpander::standard()), Some(inventory), &memory_config())
        .unwrap()
}

fn versioned(filter: &str) -> EnhanceRequest {
    EnhanceRequest::new(filter)
        .with_organism(HUMAN)
        .with_dataset_version(VERSION)
}

mod rewriting {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        let enhancer = enhancer_with(Arc::new(census()));
        let out = enhancer.enhance(&versioned(
            "cell_type_ontology_term_id in ['CL:0000540', 'CL:0000566']",
        ));
        assert_eq!(out, "cell_type_ontology_term_id in ['CL:0000540', 'CL:child_566']");
    }

    #[test]
    fn test_label_aggregation() {
        let enhancer = enhancer_with(Arc::new(census()));
        let out = enhancer.enhance(&versioned("cell_type in ['neuron']"));
        assert_eq!(out, "cell_type in ['Neuron Child', 'neuron']");
    }

    #[test]
    fn test_closure_includes_original_term() {
        let enhancer = QueryEnhancer::with_expander(
            Arc::new(MockExpander::standard()),
            None,
            &memory_config(),
        )
        .unwrap();
        let out = enhancer.enhance(&EnhanceRequest::new("tissue == 'kidney'"));
        assert_eq!(out, "tissue in ['kidney', 'nephron']");
        assert!(out.contains("'kidney'"));
    }

    #[test]
    fn test_untouched_clauses_survive() {
        let enhancer = enhancer_with(Arc::new(census()));
        let out = enhancer.enhance(&versioned(
            "(cell_type == 'neuron' or sex == 'female') and not is_primary_data == False",
        ));
        assert_eq!(
            out,
            "(cell_type in ['Neuron Child', 'neuron'] or sex == 'female') and not is_primary_data == False"
        );
    }

    #[test]
    fn test_multi_category_independence() {
        let enhancer = enhancer_with(Arc::new(census()));
        let filter = "cell_type == 'neuron' and tissue == 'kidney' and disease == 'normal' \
                      and development_stage == 'adult stage' and assay == 'broken'";
        let out = enhancer.enhance(&versioned(filter));

        assert_eq!(
            out,
            "cell_type in ['Neuron Child', 'neuron'] and tissue in ['kidney', 'nephron'] \
             and disease in ['normal'] and development_stage in ['human adult stage'] \
             and assay == 'broken'"
        );
    }

    #[test]
    fn test_failing_term_does_not_affect_siblings() {
        let enhancer = enhancer_with(Arc::new(census()));
        let out = enhancer.enhance(&versioned("cell_type in ['neuron', 'no such cell']"));
        assert_eq!(out, "cell_type in ['Neuron Child', 'neuron']");
    }
}

mod degradation {
    use super::*;

    #[test]
    fn test_no_op_returns_input() {
        let enhancer = enhancer_with(Arc::new(census()));
        for filter in [
            "sex == 'female'",
            "is_primary_data == True and  donor_id in [\"d1\", \"d2\"]",
            "cell_type_id == 'CL:0000540'",
        ] {
            assert_eq!(enhancer.enhance(&versioned(filter)), filter);
        }
    }

    #[test]
    fn test_invalid_syntax_returns_input() {
        let enhancer = enhancer_with(Arc::new(census()));
        for filter in ["cell_type == ", "cell_type == 'neuron' and (", "cell_type = 'neuron'", ""] {
            assert_eq!(enhancer.enhance(&versioned(filter)), filter);
        }
    }

    #[test]
    fn test_unreachable_census_leaves_expansion_unfiltered() {
        let enhancer = enhancer_with(Arc::new(DownCensus));
        let out = enhancer.enhance(&versioned(
            "cell_type_ontology_term_id in ['CL:0000540', 'CL:0000566']",
        ));
        assert_eq!(
            out,
            "cell_type_ontology_term_id in ['CL:0000540', 'CL:0000566', 'CL:child_540', 'CL:child_566']"
        );
        let stats = enhancer.inventory().unwrap().stats();
        assert_eq!(stats.unfiltered_fallbacks, 1);
    }

    #[test]
    fn test_unsupported_organism_keeps_stage_terms() {
        let enhancer = enhancer_with(Arc::new(census()));
        let out = enhancer.enhance(
            &EnhanceRequest::new("development_stage == 'adult stage' and cell_type == 'neuron'")
                .with_organism("Danio rerio"),
        );
        assert_eq!(
            out,
            "development_stage in ['adult stage'] and cell_type in ['Neuron Child', 'neuron']"
        );
    }

    #[test]
    fn test_unreachable_endpoint_keeps_terms() {
        let config = EnhancerConfig::builder()
            .with_client(
                ClientConfig::builder()
                    .with_endpoint("http://127.0.0.1:9/sparql")
                    .with_timeout(Duration::from_secs(2))
                    .build(),
            )
            .with_max_workers(2)
            .without_cache_dir()
            .build();
        let enhancer = QueryEnhancer::from_config(&config, Arc::new(census())).unwrap();

        let out = enhancer.enhance(&versioned("cell_type == 'neuron'"));
        assert_eq!(out, "cell_type in ['neuron']");
    }
}

mod determinism {
    use super::*;

    #[test]
    fn test_repeated_calls_identical() {
        let enhancer = enhancer_with(Arc::new(census()));
        let request = versioned(
            "cell_type_ontology_term_id in ['CL:0000566', 'CL:0000540'] or cell_type == 'neuron'",
        );
        let first = enhancer.enhance(&request);
        for _ in 0..20 {
            assert_eq!(enhancer.enhance(&request), first);
        }
    }

    #[test]
    fn test_term_order_irrelevant() {
        let enhancer = enhancer_with(Arc::new(census()));
        let a = enhancer.enhance(&versioned(
            "cell_type_ontology_term_id in ['CL:0000540', 'CL:0000566']",
        ));
        let b = enhancer.enhance(&versioned(
            "cell_type_ontology_term_id in ['CL:0000566', 'CL:0000540']",
        ));
        assert_eq!(a, b);
    }

    #[test]
    fn test_concurrent_callers() {
        let enhancer = Arc::new(enhancer_with(Arc::new(census())));
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let enhancer = Arc::clone(&enhancer);
                std::thread::spawn(move || enhancer.enhance(&versioned("cell_type in ['neuron']")))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "cell_type in ['Neuron Child', 'neuron']");
        }
    }
}

mod configuration_errors {
    use super::*;

    #[test]
    fn test_unsupported_organism_raises() {
        let err = resolve_category("development_stage", Some("Danio rerio")).unwrap_err();
        assert!(matches!(err, OntologyError::UnsupportedOrganism { .. }));
        assert!(err.to_string().contains("Danio rerio"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_organism_raises() {
        let err = resolve_category("development_stage", None).unwrap_err();
        assert!(matches!(err, OntologyError::OrganismRequired { .. }));
    }
}

mod durable_inventory {
    use super::*;

    #[test]
    fn test_cold_process_reuses_warm_fetch() {
        let dir = tempdir().unwrap();
        let request = versioned("cell_type_ontology_term_id in ['CL:0000540', 'CL:0000566']");

        let warm_inventory = Arc::new(TermInventoryCache::with_store(
            Arc::new(census()),
            InventoryStore::new(dir.path()),
        ));
        let warm = QueryEnhancer::with_expander(
            Arc::new(MockExpander::standard()),
            Some(warm_inventory),
            &memory_config(),
        )
        .unwrap();
        let expected = warm.enhance(&request);

        // The census is gone; the file written above still filters.
        let cold_inventory = Arc::new(TermInventoryCache::with_store(
            Arc::new(DownCensus),
            InventoryStore::new(dir.path()),
        ));
        let cold = QueryEnhancer::with_expander(
            Arc::new(MockExpander::standard()),
            Some(Arc::clone(&cold_inventory)),
            &memory_config(),
        )
        .unwrap();

        assert_eq!(cold.enhance(&request), expected);
        assert_eq!(cold_inventory.stats().disk_hits, 1);
        assert_eq!(cold_inventory.stats().fetches, 0);
    }

    #[test]
    fn test_from_config_persists_in_cache_dir() {
        let dir = tempdir().unwrap();
        let config = EnhancerConfig::builder().with_cache_dir(dir.path()).build();
        let enhancer = QueryEnhancer::from_config(&config, Arc::new(census())).unwrap();

        let store = enhancer.inventory().unwrap().store().unwrap();
        assert_eq!(store.dir(), dir.path());
        assert_eq!(enhancer.default_organism(), "homo_sapiens");
        assert_eq!(enhancer.coordinator().max_workers(), 5);
    }
}
