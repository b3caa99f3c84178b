use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to open dataset file '{}'", path.display())]
    OpenFile{path: PathBuf, #[source] err: std::io::Error},

    #[error("Failed to parse YAML dataset")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Individual '{individual}' carries {found} genotype entries, while {expected} loci are declared")]
    LocusCountMismatch{individual: String, expected: usize, found: usize},

    #[error("The dataset does not declare any locus")]
    NoLoci,
}
