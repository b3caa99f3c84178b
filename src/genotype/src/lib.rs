//! Genotype data model: allele keys, per-locus allele registries, and single/multi-locus genotypes.
//!
//! Missing data is never encoded inside a genotype: a [`MultilocusGenotype`] holds one optional
//! [`MonolocusGenotype`] per locus, and a missing locus is simply an empty slot.

pub mod allele;
pub use allele::AlleleKey;

pub mod locus;
pub use locus::{AlleleInfo, AnalyzedLoci, LocusInfo, Ploidy, LocusError};

pub mod monolocus;
pub use monolocus::MonolocusGenotype;

pub mod multilocus;
pub use multilocus::MultilocusGenotype;

mod error;
pub use error::GenotypeError;
