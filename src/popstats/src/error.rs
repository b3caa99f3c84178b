use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use genotype::GenotypeError;
use polymorphism::ContainerError;

/// Zero (or degenerate) denominator behind an undefined statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denominator {
    /// The selected groups do not carry any allele at this locus.
    NoAllele,
    /// The selected groups do not carry any bi-allelic genotype at this locus.
    NoBiAllelicGenotype,
    /// None of the selected genotypes is heterozygous.
    NoHeterozygousAllele,
    /// `2n - 1 <= 0`
    SampleSize,
    /// Mean sample size `n̄ <= 1`
    MeanSampleSize,
    /// Sum of the variance components is zero.
    VarianceComponents,
    /// Fewer than two of the selected groups carry data at this locus.
    AmongGroups,
    /// `Jx * Jy <= 0`
    GeneIdentity,
    /// `Fst` is either 0 or 1.
    DegenerateFst,
}

impl Display for Denominator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoAllele             => "no allele observed within the selected groups",
            Self::NoBiAllelicGenotype  => "no bi-allelic genotype observed within the selected groups",
            Self::NoHeterozygousAllele => "no heterozygous genotype observed within the selected groups",
            Self::SampleSize           => "sample size is too small (2n - 1 <= 0)",
            Self::MeanSampleSize       => "mean sample size is lower or equal to 1",
            Self::VarianceComponents   => "sum of the variance components is zero",
            Self::AmongGroups          => "fewer than two of the selected groups carry data at this locus",
            Self::GeneIdentity         => "product of the gene identities Jx.Jy is zero",
            Self::DegenerateFst        => "Fst is either equal to 0 or 1",
        };
        Display::fmt(msg, f)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Undefined statistic: {0}")]
    Undefined(Denominator),

    #[error("At least two groups are required to compute this statistic. Got {0}")]
    InsufficientGroups(usize),

    #[error("Invalid distance method '{0}'. Expected one of: nei72, nei78, wc, rh, nm, d, rousset")]
    ParseDistanceMethod(String),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl From<GenotypeError> for StatsError {
    fn from(err: GenotypeError) -> Self {
        Self::Container(ContainerError::Genotype(err))
    }
}

impl StatsError {
    /// `true` if this error flags an undefined value rather than invalid input.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined(_))
    }
}
