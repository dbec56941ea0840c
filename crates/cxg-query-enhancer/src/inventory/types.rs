//! Types for the term inventory cache.

use std::fmt;

/// Identifies one inventory: a column of one organism in one census release.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventoryKey {
    /// Census release, e.g. `2025-01-30`.
    pub version: String,
    /// Census organism name, lowercase with underscores.
    pub organism: String,
    /// Column name, e.g. `cell_type_ontology_term_id`.
    pub column: String,
}

impl InventoryKey {
    /// Creates a key, normalizing `organism` to the census form
    /// (`Homo sapiens` becomes `homo_sapiens`).
    pub fn new(version: &str, organism: &str, column: &str) -> Self {
        Self {
            version: version.to_string(),
            organism: census_organism(organism),
            column: column.to_string(),
        }
    }
}

impl fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.version, self.organism, self.column)
    }
}

/// Normalizes an organism name to the census form.
pub fn census_organism(organism: &str) -> String {
    organism.trim().replace(' ', "_").to_lowercase()
}

/// Statistics about inventory cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventoryStats {
    /// Lookups answered from the in-process memo.
    pub memo_hits: usize,
    /// Lookups answered from a durable cache file.
    pub disk_hits: usize,
    /// Lookups that streamed the column from the census.
    pub fetches: usize,
    /// Census reads that failed.
    pub backend_failures: usize,
    /// Durable cache files found unusable.
    pub corrupt_files: usize,
    /// Filter calls that returned IDs unfiltered.
    pub unfiltered_fallbacks: usize,
}

impl InventoryStats {
    /// Total number of inventory lookups.
    pub fn lookups(&self) -> usize {
        self.memo_hits + self.disk_hits + self.fetches
    }

    /// Returns the share of lookups served without the census, as a percentage.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            ((self.memo_hits + self.disk_hits) as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for InventoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Term Inventory Statistics:")?;
        writeln!(f, "  Memo hits:       {}", self.memo_hits)?;
        writeln!(f, "  Disk hits:       {}", self.disk_hits)?;
        writeln!(f, "  Census fetches:  {}", self.fetches)?;
        writeln!(f, "  Hit rate:        {:.1}%", self.cache_hit_rate())?;
        writeln!(f, "  Backend errors:  {}", self.backend_failures)?;
        writeln!(f, "  Corrupt files:   {}", self.corrupt_files)?;
        writeln!(f, "  Unfiltered:      {}", self.unfiltered_fallbacks)?;
        Ok(())
    }
}
