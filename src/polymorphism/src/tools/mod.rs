//! Randomization operators over a [`PolymorphismMultiGContainer`].
//!
//! Every operator leaves its input untouched and returns a new container, built from clones of the
//! original records. Per-record locus alignment is always preserved. Operators assume the input is
//! internally consistent (aligned genotypes, registered group ids): genotype errors raised while
//! rebuilding a record are propagated as is.

use std::collections::BTreeSet;

use genotype::{AlleleKey, MonolocusGenotype};
use log::{debug, trace};

use crate::{ContainerError, GroupId, PolymorphismMultiGContainer};

/// Positions of every record belonging to one of `groups`, in insertion order.
fn member_positions(container: &PolymorphismMultiGContainer, groups: &BTreeSet<GroupId>) -> Vec<usize> {
    container.iter()
        .enumerate()
        .filter(|(_, (_, group))| groups.contains(group))
        .map(|(position, _)| position)
        .collect()
}

/// Number of loci to iterate upon, for a set of member positions. Relies on alignment.
fn number_of_loci(container: &PolymorphismMultiGContainer, positions: &[usize]) -> Result<usize, ContainerError> {
    match positions.first() {
        Some(first) => Ok(container.multilocus_genotype(*first)?.size()),
        None        => Ok(0),
    }
}

/// Shuffle the group labels across the whole container. Genotypes are left intact, and the number
/// of records per group is preserved.
#[must_use]
pub fn permute_multilocus_genotypes(container: &PolymorphismMultiGContainer, rng: &mut fastrand::Rng) -> PolymorphismMultiGContainer {
    let mut labels: Vec<GroupId> = container.iter().map(|(_, group)| group).collect();
    rng.shuffle(&mut labels);

    let mut permuted = container.empty_with_groups();
    for ((genotype, _), group) in container.iter().zip(labels) {
        permuted.add_multilocus_genotype(genotype.clone(), group);
    }
    permuted
}

/// Per locus, shuffle the single-locus genotypes (missing slots included) of every member of
/// `groups`, pooled together. Records of other groups are left untouched.
///
/// # Errors
/// - propagates any container or genotype error raised while rebuilding the records.
pub fn permute_monolocus_genotypes(container: &PolymorphismMultiGContainer, groups: &BTreeSet<GroupId>, rng: &mut fastrand::Rng) -> Result<PolymorphismMultiGContainer, ContainerError> {
    let mut permuted = container.clone();
    let positions = member_positions(container, groups);
    shuffle_monolocus_genotypes(&mut permuted, &positions, rng)?;
    Ok(permuted)
}

/// Same as [`permute_monolocus_genotypes`], but genotypes are only exchanged between members of
/// the same group.
///
/// # Errors
/// - propagates any container or genotype error raised while rebuilding the records.
pub fn permute_intra_group_monolocus_genotypes(container: &PolymorphismMultiGContainer, groups: &BTreeSet<GroupId>, rng: &mut fastrand::Rng) -> Result<PolymorphismMultiGContainer, ContainerError> {
    let mut permuted = container.clone();
    for group in groups {
        let positions = member_positions(container, &BTreeSet::from([*group]));
        shuffle_monolocus_genotypes(&mut permuted, &positions, rng)?;
    }
    Ok(permuted)
}

fn shuffle_monolocus_genotypes(container: &mut PolymorphismMultiGContainer, positions: &[usize], rng: &mut fastrand::Rng) -> Result<(), ContainerError> {
    let nloci = number_of_loci(container, positions)?;
    debug!("Shuffling single-locus genotypes of {} records across {nloci} loci", positions.len());
    for locus in 0..nloci {
        // ---- Pool every slot of the locus, missing ones included.
        let mut slots = Vec::with_capacity(positions.len());
        for position in positions {
            slots.push(container.multilocus_genotype(*position)?.monolocus_genotype(locus)?.cloned());
        }
        rng.shuffle(&mut slots);

        for (position, slot) in positions.iter().zip(slots) {
            let genotype = container.multilocus_genotype_mut(*position)?;
            match slot {
                Some(monolocus) => genotype.set_monolocus_genotype(locus, monolocus)?,
                None            => genotype.set_monolocus_genotype_as_missing(locus)?,
            }
        }
    }
    Ok(())
}

/// Per locus, pool the alleles of every member of `groups`, shuffle the pool, and redistribute it
/// so that each individual receives as many alleles as it originally carried at that locus.
/// Missing slots stay missing.
///
/// # Errors
/// - propagates any container or genotype error raised while rebuilding the records.
pub fn permute_alleles(container: &PolymorphismMultiGContainer, groups: &BTreeSet<GroupId>, rng: &mut fastrand::Rng) -> Result<PolymorphismMultiGContainer, ContainerError> {
    let mut permuted = container.clone();
    let positions = member_positions(container, groups);
    shuffle_alleles(&mut permuted, &positions, rng)?;
    Ok(permuted)
}

/// Same as [`permute_alleles`], but alleles are only exchanged between members of the same group.
///
/// # Errors
/// - propagates any container or genotype error raised while rebuilding the records.
pub fn permute_intra_group_alleles(container: &PolymorphismMultiGContainer, groups: &BTreeSet<GroupId>, rng: &mut fastrand::Rng) -> Result<PolymorphismMultiGContainer, ContainerError> {
    let mut permuted = container.clone();
    for group in groups {
        let positions = member_positions(container, &BTreeSet::from([*group]));
        shuffle_alleles(&mut permuted, &positions, rng)?;
    }
    Ok(permuted)
}

fn shuffle_alleles(container: &mut PolymorphismMultiGContainer, positions: &[usize], rng: &mut fastrand::Rng) -> Result<(), ContainerError> {
    let nloci = number_of_loci(container, positions)?;
    debug!("Shuffling alleles of {} records across {nloci} loci", positions.len());
    for locus in 0..nloci {
        // ---- Build the pool of loose alleles, and keep each individual's slot as a template.
        let mut pool: Vec<AlleleKey> = Vec::new();
        let mut ledger: Vec<Option<MonolocusGenotype>> = Vec::with_capacity(positions.len());
        for position in positions {
            let slot = container.multilocus_genotype(*position)?.monolocus_genotype(locus)?;
            if let Some(genotype) = slot {
                pool.extend_from_slice(genotype.allele_keys());
            }
            ledger.push(slot.cloned());
        }
        rng.shuffle(&mut pool);
        trace!("Locus {locus}: pool of {} alleles", pool.len());

        // ---- Replay the ledger against the shuffled pool. Slots keep their variant.
        let mut draws = pool.into_iter();
        for (position, template) in positions.iter().zip(ledger) {
            let Some(template) = template else { continue };
            let keys: Vec<AlleleKey> = draws.by_ref().take(template.ploidy()).collect();
            let monolocus = template.with_keys(keys)?;
            container.multilocus_genotype_mut(*position)?.set_monolocus_genotype(locus, monolocus)?;
        }
    }
    Ok(())
}

/// Sub-container holding only the members of `groups`, in their original order. Group ids and
/// names of the selected groups are preserved.
#[must_use]
pub fn extract_groups(container: &PolymorphismMultiGContainer, groups: &BTreeSet<GroupId>) -> PolymorphismMultiGContainer {
    let mut extracted = PolymorphismMultiGContainer::new();
    for group in groups {
        if let Some(name) = container.raw_group_name(*group) {
            extracted.add_group_name(*group, name);
        }
    }
    for (genotype, group) in container.iter().filter(|(_, group)| groups.contains(group)) {
        extracted.add_multilocus_genotype(genotype.clone(), group);
    }
    extracted
}
