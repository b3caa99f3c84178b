use std::collections::{BTreeMap, BTreeSet};

use genotype::AlleleKey;
use log::trace;
use polymorphism::{GroupId, PolymorphismMultiGContainer};

use crate::{frequencies, Denominator, StatsError};

/// Number of heterozygous genotypes carrying each allele, within the selected groups at `locus`.
///
/// Only genotypes carrying exactly two alleles are considered. Alleles never found in a
/// heterozygous genotype are absent from the map.
pub fn count_heterozygous(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, usize>, StatsError> {
    let mut counts = BTreeMap::new();
    for [first, second] in container.monolocus_genotypes(locus, groups)?.into_iter().filter_map(|g| g.heterozygous_pair()) {
        *counts.entry(first).or_insert(0) += 1;
        *counts.entry(second).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Per-allele heterozygote frequencies: heterozygote counts divided by the number of bi-allelic
/// genotypes.
///
/// # Errors
/// - `Undefined(NoBiAllelicGenotype)` if the selected groups carry no bi-allelic genotype.
pub fn heterozygous_frequencies(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, f64>, StatsError> {
    let bi_allelic = frequencies::count_bi_allelic(container, locus, groups)?;
    if bi_allelic == 0 {
        return Err(StatsError::Undefined(Denominator::NoBiAllelicGenotype))
    }
    Ok(count_heterozygous(container, locus, groups)?
        .into_iter()
        .map(|(key, count)| (key, count as f64 / bi_allelic as f64))
        .collect())
}

/// Observed heterozygosity: mean of the per-allele heterozygote frequencies.
///
/// # Errors
/// - `Undefined(NoBiAllelicGenotype)` if the selected groups carry no bi-allelic genotype.
/// - `Undefined(NoHeterozygousAllele)` if none of these genotypes is heterozygous.
pub fn hobs(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<f64, StatsError> {
    let frequencies = heterozygous_frequencies(container, locus, groups)?;
    if frequencies.is_empty() {
        return Err(StatsError::Undefined(Denominator::NoHeterozygousAllele))
    }
    Ok(frequencies.values().sum::<f64>() / frequencies.len() as f64)
}

/// Expected heterozygosity (Nei 1978): `1 - Σ pᵢ²`
///
/// # Errors
/// - `Undefined(NoAllele)` if the selected groups carry no allele at this locus.
pub fn hexp(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<f64, StatsError> {
    let homozygosity: f64 = frequencies::allele_frequency_map(container, locus, groups)?
        .values()
        .map(|p| p * p)
        .sum();
    Ok(1.0 - homozygosity)
}

/// Unbiased expected heterozygosity: `2n·Hexp / (2n - 1)`, where `n` is the number of non-missing
/// genotypes, whatever their ploidy. [`crate::distance::nei78_distance`] uses the same `n`.
///
/// # Errors
/// - `Undefined(NoAllele)` if the selected groups carry no allele at this locus.
pub fn hnb(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<f64, StatsError> {
    let n = frequencies::count_non_missing(container, locus, groups)? as f64;
    let hexp = hexp(container, locus, groups)?;
    trace!("Locus {locus}: n = {n}, Hexp = {hexp}");
    let denominator = 2.0 * n - 1.0;
    if denominator <= 0.0 {
        return Err(StatsError::Undefined(Denominator::SampleSize))
    }
    Ok(2.0 * n * hexp / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, GROUP_A, GROUP_B};
    use float_cmp::approx_eq;
    use genotype::{MonolocusGenotype, MultilocusGenotype};

    #[test]
    fn two_groups_hobs() -> anyhow::Result<()> {
        let container = mock::two_groups()?;
        for group in [GROUP_A, GROUP_B] {
            let groups = BTreeSet::from([group]);
            assert_eq!(count_heterozygous(&container, 0, &groups)?, BTreeMap::from([(AlleleKey(1), 1), (AlleleKey(2), 1)]));
            assert!(approx_eq!(f64, hobs(&container, 0, &groups)?, 0.5, ulps = 2));
        }
        Ok(())
    }

    #[test]
    fn hexp_in_unit_range() -> anyhow::Result<()> {
        let container = mock::structured()?;
        for groups in [BTreeSet::from([GROUP_A]), BTreeSet::from([GROUP_B]), container.all_group_ids()] {
            for locus in 0..3 {
                let h = hexp(&container, locus, &groups)?;
                assert!((0.0..1.0).contains(&h), "Hexp = {h}");
            }
        }
        // ---- Monomorphic locus.
        assert!(approx_eq!(f64, hexp(&container, 1, &container.all_group_ids())?, 0.0, ulps = 2));
        Ok(())
    }

    #[test]
    fn hnb_correction() -> anyhow::Result<()> {
        let container = mock::two_groups()?;
        let groups = BTreeSet::from([GROUP_A]);
        // Hexp = 1 - (0.75² + 0.25²) = 0.375 ; n = 2 => Hnb = 4 * 0.375 / 3
        assert!(approx_eq!(f64, hexp(&container, 0, &groups)?, 0.375, ulps = 2));
        assert!(approx_eq!(f64, hnb(&container, 0, &groups)?, 0.5, ulps = 2));
        Ok(())
    }

    #[test]
    fn hnb_counts_every_sampled_genotype() -> anyhow::Result<()> {
        let mut container = mock::two_groups()?;
        mock::push_haploid(&mut container, GROUP_A, 1)?;
        let groups = BTreeSet::from([GROUP_A]);
        // p = (0.8, 0.2) => Hexp = 0.32 ; n = 3 => Hnb = 6 * 0.32 / 5
        assert!(approx_eq!(f64, hnb(&container, 0, &groups)?, 0.384, epsilon = 1e-12));
        Ok(())
    }

    #[test]
    fn undefined_heterozygosity() -> anyhow::Result<()> {
        let mut container = mock::two_groups()?;
        mock::push_diploid(&mut container, GroupId(3), &[Some([4, 4])])?;
        let homozygous = BTreeSet::from([GroupId(3)]);
        assert_eq!(hobs(&container, 0, &homozygous), Err(StatsError::Undefined(Denominator::NoHeterozygousAllele)));

        let mut haploid = MultilocusGenotype::new(1);
        haploid.set_monolocus_genotype(0, MonolocusGenotype::mono_allele(AlleleKey(1)))?;
        container.add_multilocus_genotype(haploid, GroupId(4));
        let haploids = BTreeSet::from([GroupId(4)]);
        assert_eq!(heterozygous_frequencies(&container, 0, &haploids), Err(StatsError::Undefined(Denominator::NoBiAllelicGenotype)));

        mock::push_diploid(&mut container, GroupId(5), &[None])?;
        let missing = BTreeSet::from([GroupId(5)]);
        assert!(hexp(&container, 0, &missing).is_err_and(|e| e.is_undefined()));
        assert!(hnb(&container, 0, &missing).is_err_and(|e| e.is_undefined()));
        Ok(())
    }
}
