use std::{fmt::{self, Display, Formatter}, hash::{Hash, Hasher}};

use itertools::Itertools;
use serde::{Serialize, Deserialize};

use crate::{AlleleKey, GenotypeError};

/// Field separator used when displaying the allele keys of a genotype, e.g. `1/2`
pub const ALLELE_SEPARATOR: &str = "/";

/// Allele keys carried by one individual at one locus.
///
/// - `MonoAllele` : haploid loci, or haplodiploid loci of hemizygous individuals.
/// - `BiAllele`   : diploid loci. Allele order is irrelevant: `{a, b} == {b, a}`
/// - `MultiAllele`: polyploid or unfiltered data, carrying at least one key. Order is significant.
///
/// There is no "empty" genotype: missing data is the absence of a genotype at a locus.
/// See [`crate::MultilocusGenotype`]
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub enum MonolocusGenotype {
    MonoAllele(AlleleKey),
    BiAllele([AlleleKey; 2]),
    MultiAllele(Vec<AlleleKey>),
}

impl MonolocusGenotype {
    #[must_use]
    pub fn mono_allele(key: AlleleKey) -> Self {
        Self::MonoAllele(key)
    }

    /// Build a diploid genotype.
    /// # Errors
    /// - `InvalidAlleleCount` if `keys` does not contain exactly two keys.
    pub fn bi_allele(keys: &[AlleleKey]) -> Result<Self, GenotypeError> {
        match keys {
            [first, second] => Ok(Self::BiAllele([*first, *second])),
            _               => Err(GenotypeError::InvalidAlleleCount(keys.len())),
        }
    }

    /// Build a polyploid genotype.
    /// # Errors
    /// - `EmptyGenotype` if `keys` is empty.
    pub fn multi_allele(keys: Vec<AlleleKey>) -> Result<Self, GenotypeError> {
        if keys.is_empty() {
            return Err(GenotypeError::EmptyGenotype)
        }
        Ok(Self::MultiAllele(keys))
    }

    /// Build the most specific variant for the provided keys: one key gives a `MonoAllele`,
    /// two keys a `BiAllele`, anything above a `MultiAllele`.
    /// # Errors
    /// - `EmptyGenotype` if `keys` is empty.
    pub fn from_keys(keys: Vec<AlleleKey>) -> Result<Self, GenotypeError> {
        match keys.as_slice() {
            []              => Err(GenotypeError::EmptyGenotype),
            [key]           => Ok(Self::MonoAllele(*key)),
            [first, second] => Ok(Self::BiAllele([*first, *second])),
            _               => Ok(Self::MultiAllele(keys)),
        }
    }

    /// Build a genotype of the same variant as `self`, carrying `keys` instead.
    /// # Errors
    /// - `AlleleCountMismatch` if `keys` does not match the ploidy of `self`.
    pub fn with_keys(&self, keys: Vec<AlleleKey>) -> Result<Self, GenotypeError> {
        if keys.len() != self.ploidy() {
            return Err(GenotypeError::AlleleCountMismatch{expected: self.ploidy(), found: keys.len()})
        }
        match (self, keys.as_slice()) {
            (Self::MonoAllele(_), [key])           => Ok(Self::MonoAllele(*key)),
            (Self::BiAllele(_), [first, second])   => Ok(Self::BiAllele([*first, *second])),
            (Self::MultiAllele(_), _)              => Ok(Self::MultiAllele(keys)),
            _                                      => Err(GenotypeError::AlleleCountMismatch{expected: self.ploidy(), found: keys.len()}),
        }
    }

    /// Allele keys carried by this genotype, in insertion order.
    #[must_use]
    pub fn allele_keys(&self) -> &[AlleleKey] {
        match self {
            Self::MonoAllele(key)   => std::slice::from_ref(key),
            Self::BiAllele(keys)    => keys,
            Self::MultiAllele(keys) => keys,
        }
    }

    /// Number of allele copies carried by this genotype.
    #[must_use]
    pub fn ploidy(&self) -> usize {
        self.allele_keys().len()
    }

    /// `true` if all the carried keys are identical. Trivially `true` for a `MonoAllele`:
    /// callers interested in diploid zygosity should rely on [`Self::heterozygous_pair`] instead.
    #[must_use]
    pub fn is_homozygous(&self) -> bool {
        self.allele_keys().iter().all_equal()
    }

    /// Zygosity of a genotype carrying exactly two allele keys (whatever its variant).
    /// - `Some(false)`: homozygous bi-allelic genotype
    /// - `Some(true)` : heterozygous bi-allelic genotype
    /// - `None`       : genotype does not carry exactly two keys.
    #[must_use]
    pub fn is_heterozygous_bi_allelic(&self) -> Option<bool> {
        match self.allele_keys() {
            [first, second] => Some(first != second),
            _               => None,
        }
    }

    /// Return the two keys of a heterozygous bi-allelic genotype, `None` in any other case.
    #[must_use]
    pub fn heterozygous_pair(&self) -> Option<[AlleleKey; 2]> {
        match self.allele_keys() {
            [first, second] if first != second => Some([*first, *second]),
            _                                  => None,
        }
    }

    /// Sorted copy of the keys, used for order-insensitive comparison of diploid genotypes.
    fn sorted_pair(keys: &[AlleleKey; 2]) -> [AlleleKey; 2] {
        let mut sorted = *keys;
        sorted.sort_unstable();
        sorted
    }
}

impl PartialEq for MonolocusGenotype {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MonoAllele(a),  Self::MonoAllele(b))  => a == b,
            (Self::BiAllele(a),    Self::BiAllele(b))    => Self::sorted_pair(a) == Self::sorted_pair(b),
            (Self::MultiAllele(a), Self::MultiAllele(b)) => a == b,
            _                                            => false,
        }
    }
}

impl Hash for MonolocusGenotype {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::MonoAllele(key)   => key.hash(state),
            Self::BiAllele(keys)    => Self::sorted_pair(keys).hash(state),
            Self::MultiAllele(keys) => keys.hash(state),
        }
    }
}

impl Display for MonolocusGenotype {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.allele_keys().iter().join(ALLELE_SEPARATOR), f)
    }
}
