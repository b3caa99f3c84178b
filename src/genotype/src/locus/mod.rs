use std::{fmt::{self, Display, Formatter}, str::FromStr};

use serde::{Serialize, Deserialize};

use crate::AlleleKey;

mod error;
pub use error::LocusError;

/// Declared ploidy of a locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ploidy {
    Haploid,
    #[default]
    Diploid,
    Haplodiploid,
    Unknown,
}

impl Ploidy {
    /// Number of allele keys an individual is expected to carry at a locus of this ploidy.
    /// `None` when the ploidy is unknown (any non-zero number of keys is then accepted).
    #[must_use]
    pub fn expected_alleles(&self) -> Option<usize> {
        match self {
            Self::Haploid | Self::Haplodiploid => Some(1),
            Self::Diploid                      => Some(2),
            Self::Unknown                      => None,
        }
    }
}

impl Display for Ploidy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ploidy = match self {
            Self::Haploid      => "haploid",
            Self::Diploid      => "diploid",
            Self::Haplodiploid => "haplodiploid",
            Self::Unknown      => "unknown",
        };
        Display::fmt(ploidy, f)
    }
}

impl FromStr for Ploidy {
    type Err = LocusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "haploid"      => Ok(Self::Haploid),
            "diploid"      => Ok(Self::Diploid),
            "haplodiploid" => Ok(Self::Haplodiploid),
            "unknown"      => Ok(Self::Unknown),
            _              => Err(LocusError::ParsePloidy(s.to_string())),
        }
    }
}

/// A registered allele. Its position within the owning [`LocusInfo`] is its [`AlleleKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleInfo {
    pub id: String,
}

impl AlleleInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self{id: id.into()}
    }
}

/// Allele registry of a single locus: maps allele identifiers to dense [`AlleleKey`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocusInfo {
    name   : String,
    ploidy : Ploidy,
    #[serde(default)]
    alleles: Vec<AlleleInfo>,
}

impl LocusInfo {
    pub fn new(name: impl Into<String>, ploidy: Ploidy) -> Self {
        Self{name: name.into(), ploidy, alleles: Vec::new()}
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn ploidy(&self) -> Ploidy {
        self.ploidy
    }

    /// Register a new allele and return its key.
    /// # Errors
    /// - `DuplicateAllele` if an allele with the same id is already registered.
    pub fn add_allele(&mut self, allele: AlleleInfo) -> Result<AlleleKey, LocusError> {
        if self.alleles.iter().any(|registered| registered.id == allele.id) {
            return Err(LocusError::DuplicateAllele{locus: self.name.clone(), allele: allele.id})
        }
        self.alleles.push(allele);
        Ok(AlleleKey(self.alleles.len() - 1))
    }

    /// Resolve an allele identifier into its key.
    /// # Errors
    /// - `AlleleNotFound` if `id` was never registered.
    pub fn allele_key(&self, id: &str) -> Result<AlleleKey, LocusError> {
        self.alleles.iter()
            .position(|allele| allele.id == id)
            .map(AlleleKey)
            .ok_or_else(|| LocusError::AlleleNotFound{locus: self.name.clone(), allele: id.to_string()})
    }

    /// # Errors
    /// - `AlleleKeyOutOfBounds` if `key` does not index a registered allele.
    pub fn allele(&self, key: AlleleKey) -> Result<&AlleleInfo, LocusError> {
        self.alleles.get(key.0)
            .ok_or_else(|| LocusError::AlleleKeyOutOfBounds{locus: self.name.clone(), key, len: self.alleles.len()})
    }

    #[must_use]
    pub fn number_of_alleles(&self) -> usize {
        self.alleles.len()
    }

    pub fn alleles(&self) -> impl Iterator<Item = &AlleleInfo> {
        self.alleles.iter()
    }
}

/// Ordered collection of the loci being analyzed. The index of a locus is its locus position
/// within every [`crate::MultilocusGenotype`] built against this registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalyzedLoci {
    loci: Vec<LocusInfo>,
}

impl AnalyzedLoci {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a locus and return its position.
    /// # Errors
    /// - `DuplicateLocus` if a locus with the same name is already registered.
    pub fn add_locus(&mut self, locus: LocusInfo) -> Result<usize, LocusError> {
        if self.loci.iter().any(|registered| registered.name == locus.name) {
            return Err(LocusError::DuplicateLocus(locus.name))
        }
        self.loci.push(locus);
        Ok(self.loci.len() - 1)
    }

    /// # Errors
    /// - `LocusOutOfBounds` if `position >= self.len()`
    pub fn locus(&self, position: usize) -> Result<&LocusInfo, LocusError> {
        self.loci.get(position).ok_or(LocusError::LocusOutOfBounds{index: position, len: self.loci.len()})
    }

    /// Mutable access to a locus, e.g. to register additional alleles.
    /// # Errors
    /// - `LocusOutOfBounds` if `position >= self.len()`
    pub fn locus_mut(&mut self, position: usize) -> Result<&mut LocusInfo, LocusError> {
        let len = self.loci.len();
        self.loci.get_mut(position).ok_or(LocusError::LocusOutOfBounds{index: position, len})
    }

    /// # Errors
    /// - `LocusNotFound` if no locus is named `name`
    pub fn locus_position(&self, name: &str) -> Result<usize, LocusError> {
        self.loci.iter()
            .position(|locus| locus.name == name)
            .ok_or_else(|| LocusError::LocusNotFound(name.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loci.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocusInfo> {
        self.loci.iter()
    }
}
