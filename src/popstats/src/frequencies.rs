use std::collections::{BTreeMap, BTreeSet};

use genotype::AlleleKey;
use polymorphism::{GroupId, PolymorphismMultiGContainer};

use crate::{Denominator, StatsError};

/// Distinct allele keys carried by the selected groups at `locus`.
pub fn allele_ids(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeSet<AlleleKey>, StatsError> {
    Ok(container.monolocus_genotypes(locus, groups)?
        .into_iter()
        .flat_map(|genotype| genotype.allele_keys().iter().copied())
        .collect())
}

/// Number of copies of each allele carried by the selected groups at `locus`.
pub fn allele_count_map(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, usize>, StatsError> {
    let mut counts = BTreeMap::new();
    for genotype in container.monolocus_genotypes(locus, groups)? {
        for key in genotype.allele_keys() {
            *counts.entry(*key).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Relative frequency of each allele carried by the selected groups at `locus`.
///
/// # Errors
/// - `Undefined(NoAllele)` if the selected groups carry no allele at this locus.
pub fn allele_frequency_map(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, f64>, StatsError> {
    let counts = allele_count_map(container, locus, groups)?;
    let total: usize = counts.values().sum();
    if total == 0 {
        return Err(StatsError::Undefined(Denominator::NoAllele))
    }
    Ok(counts.into_iter()
        .map(|(key, count)| (key, count as f64 / total as f64))
        .collect())
}

/// Total number of allele copies (gametes) observed within the selected groups at `locus`.
pub fn gamete_count(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<usize, StatsError> {
    Ok(container.monolocus_genotypes(locus, groups)?
        .into_iter()
        .map(|genotype| genotype.ploidy())
        .sum())
}

/// Number of non-missing genotypes within the selected groups at `locus`.
pub fn count_non_missing(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<usize, StatsError> {
    Ok(container.monolocus_genotypes(locus, groups)?.len())
}

/// Number of genotypes carrying exactly two alleles within the selected groups at `locus`.
pub fn count_bi_allelic(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<usize, StatsError> {
    Ok(container.monolocus_genotypes(locus, groups)?
        .into_iter()
        .filter(|genotype| genotype.is_heterozygous_bi_allelic().is_some())
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, GROUP_A, GROUP_B};
    use float_cmp::approx_eq;
    use genotype::{MonolocusGenotype, MultilocusGenotype};
    use polymorphism::ContainerError;

    #[test]
    fn two_groups_frequencies() -> anyhow::Result<()> {
        let container = mock::two_groups()?;
        let freqs_a = allele_frequency_map(&container, 0, &BTreeSet::from([GROUP_A]))?;
        let freqs_b = allele_frequency_map(&container, 0, &BTreeSet::from([GROUP_B]))?;
        assert_eq!(freqs_a, BTreeMap::from([(AlleleKey(1), 0.75), (AlleleKey(2), 0.25)]));
        assert_eq!(freqs_b, BTreeMap::from([(AlleleKey(1), 0.25), (AlleleKey(2), 0.75)]));
        Ok(())
    }

    #[test]
    fn frequencies_sum_to_one() -> anyhow::Result<()> {
        let container = mock::structured()?;
        let groups = container.all_group_ids();
        for locus in 0..3 {
            let sum: f64 = allele_frequency_map(&container, locus, &groups)?.values().sum();
            assert!(approx_eq!(f64, sum, 1.0, epsilon = 1e-12));
        }
        Ok(())
    }

    #[test]
    fn counts() -> anyhow::Result<()> {
        let container = mock::structured()?;
        let groups = BTreeSet::from([GROUP_A]);
        assert_eq!(allele_ids(&container, 0, &groups)?, BTreeSet::from([AlleleKey(0), AlleleKey(1)]));
        assert_eq!(allele_count_map(&container, 0, &groups)?, BTreeMap::from([(AlleleKey(0), 10), (AlleleKey(1), 2)]));
        assert_eq!(gamete_count(&container, 2, &groups)?, 10);
        assert_eq!(count_non_missing(&container, 2, &groups)?, 5);
        assert_eq!(count_bi_allelic(&container, 2, &groups)?, 5);
        Ok(())
    }

    #[test]
    fn bi_allelic_count_skips_other_ploidies() -> anyhow::Result<()> {
        let mut container = mock::two_groups()?;
        let mut haploid = MultilocusGenotype::new(1);
        haploid.set_monolocus_genotype(0, MonolocusGenotype::mono_allele(AlleleKey(1)))?;
        container.add_multilocus_genotype(haploid, GROUP_A);

        let groups = BTreeSet::from([GROUP_A]);
        assert_eq!(count_non_missing(&container, 0, &groups)?, 3);
        assert_eq!(count_bi_allelic(&container, 0, &groups)?, 2);
        assert_eq!(gamete_count(&container, 0, &groups)?, 5);
        Ok(())
    }

    #[test]
    fn empty_locus_is_undefined() -> anyhow::Result<()> {
        let mut container = mock::two_groups()?;
        mock::push_diploid(&mut container, GroupId(3), &[None])?;
        let groups = BTreeSet::from([GroupId(3)]);
        assert_eq!(allele_frequency_map(&container, 0, &groups), Err(StatsError::Undefined(Denominator::NoAllele)));
        assert!(allele_count_map(&container, 0, &groups)?.is_empty());
        Ok(())
    }

    #[test]
    fn hard_errors() -> anyhow::Result<()> {
        let container = mock::two_groups()?;
        let unknown = BTreeSet::from([GroupId(42)]);
        assert_eq!(allele_ids(&container, 0, &unknown), Err(StatsError::Container(ContainerError::GroupNotFound(GroupId(42)))));
        let err = allele_count_map(&container, 1, &container.all_group_ids()).expect_err("locus 1 does not exist");
        assert!(!err.is_undefined());
        Ok(())
    }
}
