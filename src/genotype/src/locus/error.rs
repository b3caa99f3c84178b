use thiserror::Error;

use crate::AlleleKey;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocusError {
    #[error("Allele '{allele}' is not registered within locus '{locus}'")]
    AlleleNotFound{locus: String, allele: String},

    #[error("Allele '{allele}' is already registered within locus '{locus}'")]
    DuplicateAllele{locus: String, allele: String},

    #[error("Allele key {key} is out of bounds for locus '{locus}' (number of alleles = {len})")]
    AlleleKeyOutOfBounds{locus: String, key: AlleleKey, len: usize},

    #[error("Locus '{0}' was not found")]
    LocusNotFound(String),

    #[error("Locus '{0}' is already registered")]
    DuplicateLocus(String),

    #[error("Locus position {index} is out of bounds (number of loci = {len})")]
    LocusOutOfBounds{index: usize, len: usize},

    #[error("Invalid ploidy '{0}'. Expected one of: haploid, diploid, haplodiploid, unknown")]
    ParsePloidy(String),
}
