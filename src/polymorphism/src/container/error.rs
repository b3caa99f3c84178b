use thiserror::Error;

use genotype::GenotypeError;
use super::GroupId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Position {index} is out of bounds (container size = {len})")]
    PositionOutOfBounds{index: usize, len: usize},

    #[error("Group {0} does not exist within the container")]
    GroupNotFound(GroupId),

    #[error("Multilocus genotypes of the container do not share the same number of loci, or the container is empty")]
    NotAligned,

    #[error(transparent)]
    Genotype(#[from] GenotypeError),
}
