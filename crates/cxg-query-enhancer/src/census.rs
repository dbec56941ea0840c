//! Census backend contract.
//!
//! The census is the dataset whose observed ontology IDs bound what an
//! expanded filter may contain. Backends stream the distinct values of one
//! column for one `(version, organism)` slice in chunks, so the whole column
//! never has to be materialized at once.

use std::collections::HashMap;

use crate::error::{EnhancerError, EnhancerResult};

/// One chunk of raw column values. `None` is a null cell.
pub type ValueChunk = Vec<Option<String>>;

/// Lazy, finite stream of value chunks.
pub type ValueStream<'a> = Box<dyn Iterator<Item = EnhancerResult<ValueChunk>> + Send + 'a>;

/// Source of distinct column values for a dataset slice.
pub trait CensusBackend: Send + Sync {
    /// Streams the distinct values of `column` for `organism` in census
    /// release `version`.
    ///
    /// Each call starts a fresh stream. Values may repeat across chunks.
    fn stream_distinct_values(
        &self,
        version: &str,
        organism: &str,
        column: &str,
    ) -> EnhancerResult<ValueStream<'_>>;
}

/// In-memory census, for tests and offline use.
///
/// # Example
///
/// ```rust
/// use cxg_query_enhancer::{CensusBackend, InMemoryCensus};
///
/// let census = InMemoryCensus::new(2).with_values(
///     "2025-01-30",
///     "homo_sapiens",
///     "cell_type_ontology_term_id",
///     ["CL:0000540", "CL:0000100", "unknown"],
/// );
/// let chunks: Vec<_> = census
///     .stream_distinct_values("2025-01-30", "homo_sapiens", "cell_type_ontology_term_id")
///     .unwrap()
///     .collect();
/// assert_eq!(chunks.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCensus {
    chunk_size: usize,
    columns: HashMap<(String, String, String), Vec<Option<String>>>,
}

impl InMemoryCensus {
    /// Creates an empty census that yields chunks of `chunk_size` values.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            columns: HashMap::new(),
        }
    }

    /// Adds non-null values for a column slice.
    pub fn with_values<I, S>(mut self, version: &str, organism: &str, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .entry(key(version, organism, column))
            .or_default()
            .extend(values.into_iter().map(|v| Some(v.into())));
        self
    }

    /// Adds a null value for a column slice.
    pub fn with_null(mut self, version: &str, organism: &str, column: &str) -> Self {
        self.columns
            .entry(key(version, organism, column))
            .or_default()
            .push(None);
        self
    }
}

impl CensusBackend for InMemoryCensus {
    fn stream_distinct_values(
        &self,
        version: &str,
        organism: &str,
        column: &str,
    ) -> EnhancerResult<ValueStream<'_>> {
        let values = self
            .columns
            .get(&key(version, organism, column))
            .ok_or_else(|| {
                EnhancerError::Census(format!(
                    "no column '{}' for {} in census {}",
                    column, organism, version
                ))
            })?;

        Ok(Box::new(
            values.chunks(self.chunk_size).map(|chunk| Ok(chunk.to_vec())),
        ))
    }
}

fn key(version: &str, organism: &str, column: &str) -> (String, String, String) {
    (version.to_string(), organism.to_string(), column.to_string())
}
