//! Group-indexed container of multilocus genotypes, and the randomization operators used to
//! build permutation null distributions from it.

pub mod container;
pub use container::{ContainerError, GroupId, PolymorphismMultiGContainer};

pub mod tools;
