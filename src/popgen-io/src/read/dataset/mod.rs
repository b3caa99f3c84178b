use std::{collections::BTreeMap, fs, path::Path};

use anyhow::Result;
use log::{debug, info};
use serde::{Serialize, Deserialize};

use genotype::{AlleleInfo, AnalyzedLoci, LocusInfo, MultilocusGenotype, Ploidy};
use located_error::LocatedError;
use polymorphism::{GroupId, PolymorphismMultiGContainer};

mod error;
pub use error::DatasetError;

/// Locus declaration, as written by users. Allele identifiers are registered in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawLocus {
    name   : String,
    #[serde(default)]
    ploidy : Ploidy,
    #[serde(default)]
    alleles: Vec<String>,
}

/// One individual: its group and one optional list of allele identifiers per locus.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawIndividual {
    #[serde(default)]
    name     : Option<String>,
    group    : GroupId,
    genotypes: Vec<Option<Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDataset {
    loci       : Vec<RawLocus>,
    #[serde(default)]
    groups     : BTreeMap<GroupId, String>,
    #[serde(default)]
    individuals: Vec<RawIndividual>,
}

/// A fully resolved input dataset: the locus registry, and the grouped genotypes built against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub loci     : AnalyzedLoci,
    pub container: PolymorphismMultiGContainer,
}

impl Dataset {
    /// Read and resolve a YAML dataset file.
    ///
    /// # Errors
    /// - if the file cannot be opened, or is not a valid YAML dataset.
    /// - see [`Dataset::from_yaml_str`]
    pub fn from_yaml(path: &Path) -> Result<Self> {
        info!("Reading dataset {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|err| DatasetError::OpenFile{path: path.to_path_buf(), err})
            .loc("While reading dataset")?;
        Self::from_yaml_str(&content).with_loc(|| format!("While parsing dataset '{}'", path.display()))
    }

    /// Resolve a YAML dataset.
    ///
    /// # Errors
    /// - `NoLoci` if no locus is declared.
    /// - `LocusCountMismatch` if an individual does not carry exactly one entry per declared locus.
    /// - if a locus or an allele is declared twice, if an allele identifier is unknown, or if a
    ///   genotype does not match the ploidy of its locus.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawDataset = serde_yaml::from_str(yaml).map_err(DatasetError::ParseYaml).loc("While deserializing dataset")?;
        if raw.loci.is_empty() {
            return Err(DatasetError::NoLoci).loc("While registering loci")
        }

        let mut loci = AnalyzedLoci::new();
        for raw_locus in raw.loci {
            let mut locus = LocusInfo::new(raw_locus.name, raw_locus.ploidy);
            for id in raw_locus.alleles {
                locus.add_allele(AlleleInfo::new(id)).loc("While registering alleles")?;
            }
            loci.add_locus(locus).loc("While registering loci")?;
        }

        let mut container = PolymorphismMultiGContainer::new();
        for (group, name) in raw.groups {
            container.add_group_name(group, name);
        }

        for (i, individual) in raw.individuals.into_iter().enumerate() {
            let label = individual.name.unwrap_or_else(|| format!("#{i}"));
            if individual.genotypes.len() != loci.len() {
                return Err(DatasetError::LocusCountMismatch{individual: label, expected: loci.len(), found: individual.genotypes.len()})
                    .loc("While reading individuals")
            }

            let mut genotype = MultilocusGenotype::new(loci.len());
            for (position, (locus, ids)) in loci.iter().zip(&individual.genotypes).enumerate() {
                let Some(ids) = ids else { continue };
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                genotype.set_monolocus_genotype_by_allele_ids(position, &ids, locus)
                    .with_loc(|| format!("While reading the genotypes of individual '{label}'"))?;
            }
            container.add_multilocus_genotype(genotype, individual.group);
        }

        debug!("Dataset: {} loci, {} individuals, {} groups", loci.len(), container.size(), container.number_of_groups());
        Ok(Self{loci, container})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genotype::{AlleleKey, MonolocusGenotype};

    const DATASET: &str = "
loci:
  - name: Loc-A
    ploidy: diploid
    alleles: ['120', '124']
  - name: Loc-B
    ploidy: haploid
    alleles: [A, C, G]
groups:
  1: pop-A
  2: pop-B
individuals:
  - name: ind-1
    group: 1
    genotypes: [['120', '124'], [C]]
  - group: 2
    genotypes: [['124', '124'], null]
";

    #[test]
    fn read_dataset() -> Result<()> {
        let dataset = Dataset::from_yaml_str(DATASET)?;
        assert_eq!(dataset.loci.len(), 2);
        assert_eq!(dataset.loci.locus(1)?.ploidy(), Ploidy::Haploid);

        let container = &dataset.container;
        assert_eq!(container.size(), 2);
        assert!(container.is_aligned());
        assert_eq!(container.number_of_loci()?, 2);
        assert_eq!(container.group_names(), vec!["pop-A", "pop-B"]);
        assert_eq!(container.group_id(1)?, GroupId(2));

        let first = container.multilocus_genotype(0)?;
        assert_eq!(first.monolocus_genotype(0)?, Some(&MonolocusGenotype::BiAllele([AlleleKey(0), AlleleKey(1)])));
        assert_eq!(first.monolocus_genotype(1)?, Some(&MonolocusGenotype::MonoAllele(AlleleKey(1))));
        assert!(container.multilocus_genotype(1)?.is_monolocus_genotype_missing(1)?);
        Ok(())
    }

    #[test]
    fn read_dataset_file() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("dataset.yaml");
        fs::write(&path, DATASET)?;
        assert_eq!(Dataset::from_yaml(&path)?, Dataset::from_yaml_str(DATASET)?);
        assert!(Dataset::from_yaml(&tmpdir.path().join("missing.yaml")).is_err());
        Ok(())
    }

    #[test]
    fn locus_count_mismatch() {
        let yaml = DATASET.replace("[['124', '124'], null]", "[['124', '124']]");
        let err = Dataset::from_yaml_str(&yaml).expect_err("second individual lacks a locus");
        assert!(err.chain().any(|cause| cause.to_string().contains("'#1' carries 1 genotype entries")));
    }

    #[test]
    fn unknown_allele() {
        let yaml = DATASET.replace("[C]", "[T]");
        let err = Dataset::from_yaml_str(&yaml).expect_err("allele T is not registered");
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>();
        assert!(chain.iter().any(|cause| cause.contains("ind-1")));
        assert!(chain.iter().any(|cause| cause.contains("Loc-B")));
    }

    #[test]
    fn ploidy_mismatch() {
        let yaml = DATASET.replace("[C]", "[C, G]");
        assert!(Dataset::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn no_loci() {
        let err = Dataset::from_yaml_str("loci: []").expect_err("no locus declared");
        assert!(err.chain().any(|cause| cause.to_string().contains("does not declare any locus")));
    }
}
