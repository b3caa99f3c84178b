use thiserror::Error;

use crate::Ploidy;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenotypeError {
    #[error("A bi-allelic genotype requires exactly 2 allele keys. Got {0}")]
    InvalidAlleleCount(usize),

    #[error("Attempting to build a genotype without any allele key. Missing data must be encoded as a missing locus instead.")]
    EmptyGenotype,

    #[error("Invalid number of allele keys for a {ploidy} locus: expected {expected}, got {found}")]
    PloidyMismatch{ploidy: Ploidy, expected: usize, found: usize},

    #[error("Expected {expected} allele keys to rebuild this genotype, got {found}")]
    AlleleCountMismatch{expected: usize, found: usize},

    #[error("Locus position {index} is out of bounds (number of loci = {len})")]
    LocusOutOfBounds{index: usize, len: usize},
}
