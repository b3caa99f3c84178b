//! Statistics engine over a [`polymorphism::PolymorphismMultiGContainer`]: allele frequencies,
//! heterozygosity, Weir & Cockerham F-statistics, Nei distances, distance matrices and
//! permutation tests.
//!
//! Unless noted otherwise, every function takes a container, a locus position and a set of group
//! ids, and only considers the non-missing genotypes of the selected groups. Every statistic
//! returns a `Result<_, StatsError>`: zero denominators are reported as
//! [`StatsError::Undefined`], bounds and unknown groups as hard errors.

pub mod frequencies;
pub mod heterozygosity;
pub mod fstatistics;
pub mod distance;
pub mod permutation;

mod error;
pub use error::{Denominator, StatsError};

pub use distance::{DistanceMatrix, DistanceMethod};
pub use fstatistics::{Fstats, VarComp};
pub use permutation::PermResults;
