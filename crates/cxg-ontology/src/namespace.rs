//! Categories, organisms and the ontology namespaces they resolve to.

use std::fmt;
use std::str::FromStr;

use crate::error::{OntologyError, OntologyResult};

/// A filterable biological dimension backed by an ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// `cell_type` (Cell Ontology)
    CellType,
    /// `tissue` (Uberon)
    Tissue,
    /// `tissue_general` (Uberon)
    TissueGeneral,
    /// `disease` (Mondo)
    Disease,
    /// `development_stage` (organism-specific developmental stage ontology)
    DevelopmentStage,
}

impl Category {
    /// Every supported category, in declaration order.
    pub const ALL: [Category; 5] = [
        Category::CellType,
        Category::Tissue,
        Category::TissueGeneral,
        Category::Disease,
        Category::DevelopmentStage,
    ];

    /// Column name of the category, e.g. `cell_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CellType => "cell_type",
            Category::Tissue => "tissue",
            Category::TissueGeneral => "tissue_general",
            Category::Disease => "disease",
            Category::DevelopmentStage => "development_stage",
        }
    }

    /// Name of the column holding ontology IDs for this category.
    pub fn id_column(&self) -> String {
        format!("{}_ontology_term_id", self.as_str())
    }

    /// Returns true if the namespace depends on the organism.
    pub fn is_organism_dependent(&self) -> bool {
        matches!(self, Category::DevelopmentStage)
    }

    /// All supported category names.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Category::as_str).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = OntologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| OntologyError::UnsupportedCategory {
                category: s.to_string(),
                supported: Category::names().join(", "),
            })
    }
}

/// Organisms with a developmental stage ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Organism {
    /// Homo sapiens
    HomoSapiens,
    /// Mus musculus
    MusMusculus,
}

impl Organism {
    /// Parses an organism name, accepting `homo_sapiens`, `Homo sapiens`
    /// and other case or separator variants.
    pub fn parse(name: &str) -> Option<Organism> {
        let normalized = name.trim().replace('_', " ").to_lowercase();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.as_str() {
            "homo sapiens" => Some(Organism::HomoSapiens),
            "mus musculus" => Some(Organism::MusMusculus),
            _ => None,
        }
    }

    /// Binomial name, e.g. `Homo sapiens`.
    pub fn scientific_name(&self) -> &'static str {
        match self {
            Organism::HomoSapiens => "Homo sapiens",
            Organism::MusMusculus => "Mus musculus",
        }
    }

    /// Name used by the census, e.g. `homo_sapiens`.
    pub fn census_name(&self) -> &'static str {
        match self {
            Organism::HomoSapiens => "homo_sapiens",
            Organism::MusMusculus => "mus_musculus",
        }
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scientific_name())
    }
}

/// An OBO ontology namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Cell Ontology
    Cl,
    /// Uberon anatomy ontology
    Uberon,
    /// Mondo disease ontology
    Mondo,
    /// Human developmental stages
    HsapDv,
    /// Mouse developmental stages
    MmusDv,
}

impl Namespace {
    /// Every known namespace.
    pub const ALL: [Namespace; 5] = [
        Namespace::Cl,
        Namespace::Uberon,
        Namespace::Mondo,
        Namespace::HsapDv,
        Namespace::MmusDv,
    ];

    /// ID prefix, e.g. `CL` in `CL:0000540`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Cl => "CL",
            Namespace::Uberon => "UBERON",
            Namespace::Mondo => "MONDO",
            Namespace::HsapDv => "HsapDv",
            Namespace::MmusDv => "MmusDv",
        }
    }

    /// IRI of the ontology document that defines the namespace's terms.
    pub fn ontology_iri(&self) -> &'static str {
        match self {
            Namespace::Cl => "http://purl.obolibrary.org/obo/cl.owl",
            Namespace::Uberon => "http://purl.obolibrary.org/obo/uberon.owl",
            Namespace::Mondo => "http://purl.obolibrary.org/obo/mondo.owl",
            Namespace::HsapDv => "http://purl.obolibrary.org/obo/hsapdv.owl",
            Namespace::MmusDv => "http://purl.obolibrary.org/obo/mmusdv.owl",
        }
    }

    /// Finds the namespace whose prefix starts `id` as `PREFIX:`.
    pub fn of_id(id: &str) -> Option<Namespace> {
        let (prefix, rest) = id.split_once(':')?;
        if rest.is_empty() {
            return None;
        }
        Namespace::ALL.iter().copied().find(|ns| ns.prefix() == prefix)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Resolves the namespace for `category`.
///
/// # Errors
///
/// For `development_stage`, fails with [`OntologyError::OrganismRequired`]
/// when `organism` is `None` and [`OntologyError::UnsupportedOrganism`]
/// when it names neither supported organism.
pub fn resolve_namespace(category: Category, organism: Option<&str>) -> OntologyResult<Namespace> {
    match category {
        Category::CellType => Ok(Namespace::Cl),
        Category::Tissue | Category::TissueGeneral => Ok(Namespace::Uberon),
        Category::Disease => Ok(Namespace::Mondo),
        Category::DevelopmentStage => {
            let name = organism.ok_or_else(|| OntologyError::OrganismRequired {
                category: category.to_string(),
            })?;
            match Organism::parse(name) {
                Some(Organism::HomoSapiens) => Ok(Namespace::HsapDv),
                Some(Organism::MusMusculus) => Ok(Namespace::MmusDv),
                None => Err(OntologyError::UnsupportedOrganism {
                    organism: name.to_string(),
                    category: category.to_string(),
                }),
            }
        }
    }
}

/// Like [`resolve_namespace`], but parses the category name first.
pub fn resolve_category(category: &str, organism: Option<&str>) -> OntologyResult<Namespace> {
    resolve_namespace(category.parse()?, organism)
}
