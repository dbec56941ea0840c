//! Expansion coordinator.
//!
//! Fans the terms of one category out over a bounded worker pool, unions
//! the expansions by ID, filters them against the census inventory and
//! returns a sorted list of surviving labels or IDs.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use cxg_ontology::{OntologyExpander, OntologyResult, OntologyTerm};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info};

use crate::error::{EnhancerError, EnhancerResult};
use crate::inventory::TermInventoryCache;

/// Default number of concurrent expansion requests.
///
/// Kept small so a shared ontology endpoint is not overloaded.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Expands and filters the terms of one category at a time.
pub struct ExpansionCoordinator {
    expander: Arc<dyn OntologyExpander>,
    inventory: Option<Arc<TermInventoryCache>>,
    pool: ThreadPool,
    max_workers: usize,
}

impl ExpansionCoordinator {
    /// Creates a coordinator running at most `max_workers` expansions at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be built.
    pub fn new(expander: Arc<dyn OntologyExpander>, max_workers: usize) -> EnhancerResult<Self> {
        let max_workers = max_workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .thread_name(|i| format!("cxg-expand-{}", i))
            .build()
            .map_err(|e| EnhancerError::ThreadPool(e.to_string()))?;

        Ok(Self {
            expander,
            inventory: None,
            pool,
            max_workers,
        })
    }

    /// Filters expansions through `inventory` whenever a census version is given.
    pub fn with_inventory(mut self, inventory: Arc<TermInventoryCache>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// Returns the inventory cache, if any.
    pub fn inventory(&self) -> Option<&Arc<TermInventoryCache>> {
        self.inventory.as_ref()
    }

    /// Maximum number of concurrent expansions.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Expands `terms` for `category` and returns the surviving labels
    /// (`label_based`) or IDs, sorted.
    ///
    /// A term whose expansion fails contributes nothing. If no term expands
    /// at all, `terms` is returned unchanged. Without a `version`, or
    /// without an inventory cache, no census filtering happens.
    pub fn process(
        &self,
        terms: &[String],
        category: &str,
        organism: Option<&str>,
        version: Option<&str>,
        label_based: bool,
    ) -> Vec<String> {
        if terms.is_empty() {
            return Vec::new();
        }

        let expanded = self.expand_all(terms, category, organism);
        if expanded.is_empty() {
            info!(category, "nothing expanded, keeping original terms");
            return terms.to_vec();
        }

        let surviving: BTreeSet<&String> = match (version, &self.inventory, organism) {
            (Some(version), Some(inventory), Some(organism)) => {
                let ids: Vec<String> = expanded.keys().cloned().collect();
                let column = format!("{}_ontology_term_id", category);
                let kept: HashSet<String> = inventory
                    .filter_by_inventory(&ids, version, organism, &column)
                    .into_iter()
                    .collect();
                expanded.keys().filter(|id| kept.contains(*id)).collect()
            }
            _ => expanded.keys().collect(),
        };

        let result: Vec<String> = if label_based {
            let labels: BTreeSet<&String> = surviving
                .iter()
                .filter_map(|id| expanded.get(*id))
                .flatten()
                .collect();
            labels.into_iter().cloned().collect()
        } else {
            surviving.into_iter().cloned().collect()
        };

        debug!(
            category,
            input = terms.len(),
            expanded = expanded.len(),
            output = result.len(),
            "category processed"
        );
        result
    }

    /// Expands every distinct term concurrently and unions the results by ID.
    fn expand_all(
        &self,
        terms: &[String],
        category: &str,
        organism: Option<&str>,
    ) -> BTreeMap<String, BTreeSet<String>> {
        let distinct: BTreeSet<&String> = terms.iter().collect();

        let outcomes: Vec<(&String, OntologyResult<Vec<OntologyTerm>>)> =
            self.pool.install(|| {
                distinct
                    .into_par_iter()
                    .map(|term| (term, self.expander.expand(term, category, organism)))
                    .collect()
            });

        let mut union: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (term, outcome) in outcomes {
            match outcome {
                Ok(expansion) => {
                    for OntologyTerm { id, label } in expansion {
                        union.entry(id).or_default().insert(label);
                    }
                }
                Err(e) => error!(term = %term, category, error = %e, "term expansion failed"),
            }
        }
        union
    }
}

impl std::fmt::Debug for ExpansionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionCoordinator")
            .field("max_workers", &self.max_workers)
            .field("inventory", &self.inventory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::census::InMemoryCensus;
    use cxg_ontology::OntologyError;
    use std::collections::HashMap;
    use std::thread;
    use std::time::Duration;

    /// Mock expander backed by a fixed table. Unknown terms fail.
    struct MockExpander {
        table: HashMap<String, Vec<OntologyTerm>>,
        delays: HashMap<String, Duration>,
    }

    impl MockExpander {
        fn new(entries: &[(&str, &[(&str, &str)])]) -> Self {
            let table = entries
                .iter()
                .map(|(term, expansion)| {
                    let terms = expansion
                        .iter()
                        .map(|(id, label)| OntologyTerm::new(*id, *label))
                        .collect();
                    (term.to_string(), terms)
                })
                .collect();
            Self {
                table,
                delays: HashMap::new(),
            }
        }

        fn with_delay(mut self, term: &str, delay: Duration) -> Self {
            self.delays.insert(term.to_string(), delay);
            self
        }
    }

    impl OntologyExpander for MockExpander {
        fn expand(
            &self,
            term: &str,
            _category: &str,
            _organism: Option<&str>,
        ) -> OntologyResult<Vec<OntologyTerm>> {
            if let Some(delay) = self.delays.get(term) {
                thread::sleep(*delay);
            }
            self.table
                .get(term)
                .cloned()
                .ok_or_else(|| OntologyError::QueryFailed(format!("no route for {}", term)))
        }
    }

    const V: &str = "2025-01-30";
    const COL: &str = "cell_type_ontology_term_id";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn neuron_expander() -> MockExpander {
        MockExpander::new(&[
            (
                "neuron",
                &[("CL:0000540", "neuron"), ("CL:neuron_child", "Neuron Child")],
            ),
            (
                "CL:0000540",
                &[("CL:0000540", "neuron"), ("CL:child_540", "child 540")],
            ),
            (
                "CL:0000566",
                &[("CL:0000566", "angioblast"), ("CL:child_566", "child 566")],
            ),
        ])
    }

    fn coordinator(expander: MockExpander) -> ExpansionCoordinator {
        ExpansionCoordinator::new(Arc::new(expander), DEFAULT_MAX_WORKERS).unwrap()
    }

    mod without_census {
        use super::*;

        #[test]
        fn test_empty_terms() {
            let result = coordinator(neuron_expander()).process(&[], "cell_type", None, None, true);
            assert!(result.is_empty());
        }

        #[test]
        fn test_label_based_union() {
            let result = coordinator(neuron_expander()).process(
                &strings(&["neuron"]),
                "cell_type",
                Some("homo_sapiens"),
                None,
                true,
            );
            assert_eq!(result, strings(&["Neuron Child", "neuron"]));
        }

        #[test]
        fn test_id_based_union_sorted() {
            let result = coordinator(neuron_expander()).process(
                &strings(&["CL:0000566", "CL:0000540"]),
                "cell_type",
                Some("homo_sapiens"),
                None,
                false,
            );
            assert_eq!(
                result,
                strings(&["CL:0000540", "CL:0000566", "CL:child_540", "CL:child_566"])
            );
        }

        #[test]
        fn test_failed_term_skipped() {
            let result = coordinator(neuron_expander()).process(
                &strings(&["CL:0000540", "CL:broken"]),
                "cell_type",
                Some("homo_sapiens"),
                None,
                false,
            );
            assert_eq!(result, strings(&["CL:0000540", "CL:child_540"]));
        }

        #[test]
        fn test_nothing_expanded_returns_input() {
            let input = strings(&["CL:zzz", "CL:aaa"]);
            let result = coordinator(neuron_expander()).process(
                &input,
                "cell_type",
                Some("homo_sapiens"),
                None,
                false,
            );
            assert_eq!(result, input);
        }

        #[test]
        fn test_version_without_inventory_skips_filtering() {
            let result = coordinator(neuron_expander()).process(
                &strings(&["CL:0000540"]),
                "cell_type",
                Some("homo_sapiens"),
                Some(V),
                false,
            );
            assert_eq!(result, strings(&["CL:0000540", "CL:child_540"]));
        }

        #[test]
        fn test_duplicate_terms_collapse() {
            let result = coordinator(neuron_expander()).process(
                &strings(&["neuron", "neuron"]),
                "cell_type",
                None,
                None,
                true,
            );
            assert_eq!(result, strings(&["Neuron Child", "neuron"]));
        }
    }

    mod with_census {
        use super::*;

        fn inventory(values: &[&str]) -> Arc<TermInventoryCache> {
            let census = InMemoryCensus::new(2).with_values(
                V,
                "homo_sapiens",
                COL,
                values.iter().copied(),
            );
            Arc::new(TermInventoryCache::new(Arc::new(census)))
        }

        #[test]
        fn test_id_round_trip() {
            let coordinator = coordinator(neuron_expander())
                .with_inventory(inventory(&["CL:0000540", "CL:child_566"]));
            let result = coordinator.process(
                &strings(&["CL:0000540", "CL:0000566"]),
                "cell_type",
                Some("homo_sapiens"),
                Some(V),
                false,
            );
            assert_eq!(result, strings(&["CL:0000540", "CL:child_566"]));
        }

        #[test]
        fn test_labels_follow_surviving_ids() {
            let coordinator =
                coordinator(neuron_expander()).with_inventory(inventory(&["CL:neuron_child"]));
            let result = coordinator.process(
                &strings(&["neuron"]),
                "cell_type",
                Some("Homo sapiens"),
                Some(V),
                true,
            );
            assert_eq!(result, strings(&["Neuron Child"]));
        }

        #[test]
        fn test_unreachable_census_returns_unfiltered() {
            // No column registered for this version: every census read fails.
            let coordinator = coordinator(neuron_expander()).with_inventory(inventory(&[]));
            let result = coordinator.process(
                &strings(&["CL:0000540"]),
                "cell_type",
                Some("homo_sapiens"),
                Some("2099-01-01"),
                false,
            );
            assert_eq!(result, strings(&["CL:0000540", "CL:child_540"]));
        }

        #[test]
        fn test_everything_filtered_out() {
            let coordinator =
                coordinator(neuron_expander()).with_inventory(inventory(&["CL:9999999"]));
            let result = coordinator.process(
                &strings(&["CL:0000540"]),
                "cell_type",
                Some("homo_sapiens"),
                Some(V),
                false,
            );
            assert!(result.is_empty());
        }
    }

    mod determinism {
        use super::*;

        #[test]
        fn test_completion_order_irrelevant() {
            let slow_first = neuron_expander()
                .with_delay("CL:0000540", Duration::from_millis(20))
                .with_delay("neuron", Duration::from_millis(10));
            let slow_last = neuron_expander().with_delay("CL:0000566", Duration::from_millis(20));
            let terms = strings(&["CL:0000540", "neuron", "CL:0000566"]);

            let a = coordinator(slow_first).process(&terms, "cell_type", None, None, false);
            let b = coordinator(slow_last).process(&terms, "cell_type", None, None, false);
            assert_eq!(a, b);

            let coordinator = coordinator(neuron_expander());
            let first = coordinator.process(&terms, "cell_type", None, None, true);
            for _ in 0..10 {
                assert_eq!(coordinator.process(&terms, "cell_type", None, None, true), first);
            }
        }

        #[test]
        fn test_single_worker() {
            let coordinator = ExpansionCoordinator::new(Arc::new(neuron_expander()), 0).unwrap();
            assert_eq!(coordinator.max_workers(), 1);
            let result = coordinator.process(
                &strings(&["CL:0000540", "CL:0000566"]),
                "cell_type",
                None,
                None,
                false,
            );
            assert_eq!(result.len(), 4);
        }
    }
}
