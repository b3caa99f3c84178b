use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Deserialize};

use crate::{AlleleKey, GenotypeError, LocusError, LocusInfo, MonolocusGenotype, Ploidy};

/// Placeholder used when displaying a missing locus.
pub const MISSING_LOCUS_DISPLAY: &str = "NA";

/// Space padding of each locus, when displaying a `MultilocusGenotype`.
const LOCUS_DISPLAY_LEN: usize = 7;

/// Genotypes of one individual across all loci.
///
/// The number of loci is set at construction and never changes. Each slot is either a
/// [`MonolocusGenotype`], or `None` if the data is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilocusGenotype {
    loci: Vec<Option<MonolocusGenotype>>,
}

impl MultilocusGenotype {
    /// Instantiate a multilocus genotype of `number_of_loci` loci, all of them missing.
    #[must_use]
    pub fn new(number_of_loci: usize) -> Self {
        Self{loci: vec![None; number_of_loci]}
    }

    /// Number of loci (missing or not).
    #[must_use]
    pub fn size(&self) -> usize {
        self.loci.len()
    }

    fn check_bounds(&self, locus_position: usize) -> Result<(), GenotypeError> {
        match locus_position < self.loci.len() {
            true  => Ok(()),
            false => Err(GenotypeError::LocusOutOfBounds{index: locus_position, len: self.loci.len()}),
        }
    }

    /// # Errors
    /// - `LocusOutOfBounds` if `locus_position >= self.size()`
    pub fn set_monolocus_genotype(&mut self, locus_position: usize, genotype: MonolocusGenotype) -> Result<(), GenotypeError> {
        self.check_bounds(locus_position)?;
        self.loci[locus_position] = Some(genotype);
        Ok(())
    }

    /// Set a locus from raw allele keys, validated against the declared `ploidy` of the locus:
    /// haploid and haplodiploid loci expect a single key, diploid loci exactly two. Loci of unknown
    /// ploidy accept any non-zero number of keys.
    ///
    /// # Errors
    /// - `LocusOutOfBounds` if `locus_position >= self.size()`
    /// - `PloidyMismatch` if the number of keys does not match `ploidy`. The slot is left untouched.
    /// - `EmptyGenotype` if `keys` is empty.
    pub fn set_monolocus_genotype_by_allele_keys(&mut self, locus_position: usize, keys: &[AlleleKey], ploidy: Ploidy) -> Result<(), GenotypeError> {
        self.check_bounds(locus_position)?;
        if let Some(expected) = ploidy.expected_alleles() {
            if keys.len() != expected {
                return Err(GenotypeError::PloidyMismatch{ploidy, expected, found: keys.len()})
            }
        }
        let genotype = MonolocusGenotype::from_keys(keys.to_vec())?;
        self.loci[locus_position] = Some(genotype);
        Ok(())
    }

    /// Set a locus from allele identifiers, resolved through the registry of `locus`.
    ///
    /// # Errors
    /// - `AlleleNotFound` if any of the ids is not registered within `locus`
    /// - any error of [`Self::set_monolocus_genotype_by_allele_keys`]
    pub fn set_monolocus_genotype_by_allele_ids(&mut self, locus_position: usize, ids: &[&str], locus: &LocusInfo) -> anyhow::Result<()> {
        use located_error::LocatedError;
        let keys = ids.iter()
            .map(|id| locus.allele_key(id))
            .collect::<Result<Vec<AlleleKey>, LocusError>>()
            .with_loc(|| format!("While resolving the allele ids of locus '{}'", locus.name()))?;
        self.set_monolocus_genotype_by_allele_keys(locus_position, &keys, locus.ploidy())
            .with_loc(|| format!("While setting locus '{}' at position {locus_position}", locus.name()))
    }

    /// # Errors
    /// - `LocusOutOfBounds` if `locus_position >= self.size()`
    pub fn set_monolocus_genotype_as_missing(&mut self, locus_position: usize) -> Result<(), GenotypeError> {
        self.check_bounds(locus_position)?;
        self.loci[locus_position] = None;
        Ok(())
    }

    /// # Errors
    /// - `LocusOutOfBounds` if `locus_position >= self.size()`
    pub fn is_monolocus_genotype_missing(&self, locus_position: usize) -> Result<bool, GenotypeError> {
        self.check_bounds(locus_position)?;
        Ok(self.loci[locus_position].is_none())
    }

    /// Access the genotype at a given locus. `Ok(None)` if the locus is missing.
    /// # Errors
    /// - `LocusOutOfBounds` if `locus_position >= self.size()`
    pub fn monolocus_genotype(&self, locus_position: usize) -> Result<Option<&MonolocusGenotype>, GenotypeError> {
        self.check_bounds(locus_position)?;
        Ok(self.loci[locus_position].as_ref())
    }

    /// Iterate over every locus slot, in locus order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&MonolocusGenotype>> {
        self.loci.iter().map(Option::as_ref)
    }

    #[must_use]
    pub fn count_non_missing_loci(&self) -> usize {
        self.loci.iter().flatten().count()
    }

    /// Number of homozygous loci. Only loci carrying exactly two allele keys are considered.
    #[must_use]
    pub fn count_homozygous_loci(&self) -> usize {
        self.count_bi_allelic_loci_with(false)
    }

    /// Number of heterozygous loci. Only loci carrying exactly two allele keys are considered.
    #[must_use]
    pub fn count_heterozygous_loci(&self) -> usize {
        self.count_bi_allelic_loci_with(true)
    }

    fn count_bi_allelic_loci_with(&self, heterozygous: bool) -> usize {
        self.loci.iter()
            .flatten()
            .filter(|genotype| genotype.is_heterozygous_bi_allelic() == Some(heterozygous))
            .count()
    }
}

impl Display for MultilocusGenotype {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.loci.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match slot {
                Some(genotype) => write!(f, "{: <LOCUS_DISPLAY_LEN$}", genotype.to_string())?,
                None           => write!(f, "{MISSING_LOCUS_DISPLAY: <LOCUS_DISPLAY_LEN$}")?,
            }
        }
        Ok(())
    }
}
