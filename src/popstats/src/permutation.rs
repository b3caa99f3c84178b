use std::{collections::BTreeSet, fmt::{self, Display, Formatter}, ops::Add};

use log::{debug, info, warn};
use logger::Logger;
use polymorphism::{tools, ContainerError, GroupId, PolymorphismMultiGContainer};
use rayon::prelude::*;

use crate::{fstatistics, StatsError};

/// Outcome of a permutation test.
/// - `statistic`       : observed value of the statistic.
/// - `fraction_greater`: fraction of replicates strictly greater than the observed value.
/// - `fraction_lesser` : fraction of replicates strictly lesser than the observed value.
/// - `undefined`       : number of replicates for which the statistic was undefined. These are
///                       excluded from both tallies, but still count in the denominator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermResults {
    pub statistic       : f64,
    pub fraction_greater: f64,
    pub fraction_lesser : f64,
    pub undefined       : usize,
}

impl Display for PermResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} - {:.6} - {:.6} - {}", self.statistic, self.fraction_greater, self.fraction_lesser, self.undefined)
    }
}

/// Per-replicate comparison counters, merged across threads.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    greater  : usize,
    lesser   : usize,
    undefined: usize,
}

impl Add for Tally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self{greater: self.greater + rhs.greater, lesser: self.lesser + rhs.lesser, undefined: self.undefined + rhs.undefined}
    }
}

impl Tally {
    fn compare(observed: f64, replicate: Result<f64, StatsError>) -> Result<Self, StatsError> {
        match replicate {
            Ok(value) if value > observed => Ok(Self{greater: 1, ..Self::default()}),
            Ok(value) if value < observed => Ok(Self{lesser: 1, ..Self::default()}),
            Ok(_)                         => Ok(Self::default()),
            Err(e) if e.is_undefined()    => Ok(Self{undefined: 1, ..Self::default()}),
            Err(e)                        => Err(e),
        }
    }
}

/// Generic permutation test.
///
/// The selected groups are first extracted into a sub-container, on which the observed statistic
/// is computed. Then, `replicates` permuted copies of this sub-container are built with `permute`,
/// and the statistic is computed again on each of them.
///
/// Replicates run in parallel within the current `rayon` thread pool. Each replicate draws its own
/// generator, seeded from `rng`: results are reproducible for a given seed, whatever the number of
/// threads.
///
/// # Arguments
/// - `container` : input container. Left untouched.
/// - `groups`    : groups to extract before computing anything.
/// - `replicates`: number of permutations `N`. With `N = 0`, both fractions are 0.
/// - `rng`       : seeded random number generator.
/// - `permute`   : randomization operator, applied on the extracted sub-container.
/// - `statistic` : statistic to compute on the observed and permuted sub-containers.
///
/// # Errors
/// - `GroupNotFound` if any of the groups does not exist.
/// - any error raised while computing the observed statistic (undefined values included).
/// - any hard error raised by a replicate. Undefined replicates are only counted.
pub fn permutation_test<P, S>(
    container : &PolymorphismMultiGContainer,
    groups    : &BTreeSet<GroupId>,
    replicates: usize,
    rng       : &mut fastrand::Rng,
    permute   : P,
    statistic : S,
) -> Result<PermResults, StatsError>
where
    P: Fn(&PolymorphismMultiGContainer, &mut fastrand::Rng) -> Result<PolymorphismMultiGContainer, ContainerError> + Sync,
    S: Fn(&PolymorphismMultiGContainer) -> Result<f64, StatsError> + Sync,
{
    container.check_groups(groups)?;
    let extracted = tools::extract_groups(container, groups);
    let observed = statistic(&extracted)?;
    debug!("Observed statistic: {observed}");

    let seeds: Vec<u64> = (0..replicates).map(|_| rng.u64(..)).collect();
    let progress = Logger::progress_bar(replicates as u64, "Permutations");

    let tally = seeds.par_iter()
        .map(|seed| -> Result<Tally, StatsError> {
            let mut replicate_rng = fastrand::Rng::with_seed(*seed);
            let permuted = permute(&extracted, &mut replicate_rng)?;
            let tally = Tally::compare(observed, statistic(&permuted))?;
            progress.inc(1);
            Ok(tally)
        })
        .try_reduce(Tally::default, |a, b| Ok(a + b))?;
    progress.finish_and_clear();

    if tally.undefined > 0 {
        warn!("{} out of {replicates} permutation replicates yielded an undefined statistic", tally.undefined);
    }

    let fraction = |count: usize| match replicates {
        0 => 0.0,
        n => count as f64 / n as f64,
    };
    let results = PermResults{
        statistic       : observed,
        fraction_greater: fraction(tally.greater),
        fraction_lesser : fraction(tally.lesser),
        undefined       : tally.undefined,
    };
    info!("Permutation test over {replicates} replicates: {results:?}");
    Ok(results)
}

/// Multilocus Weir & Cockerham Fst, tested by shuffling group labels across the selected groups.
///
/// # Errors
/// - see [`permutation_test`] and [`fstatistics::wc_multilocus_fst`]
pub fn wc_multilocus_fst_and_perm(
    container : &PolymorphismMultiGContainer,
    loci      : &[usize],
    groups    : &BTreeSet<GroupId>,
    replicates: usize,
    rng       : &mut fastrand::Rng,
) -> Result<PermResults, StatsError> {
    permutation_test(container, groups, replicates, rng,
        |c, rng| Ok(tools::permute_multilocus_genotypes(c, rng)),
        |c| fstatistics::wc_multilocus_fst(c, loci, groups),
    )
}

/// Multilocus Weir & Cockerham Fis, tested by shuffling alleles within each selected group.
///
/// # Errors
/// - see [`permutation_test`] and [`fstatistics::wc_multilocus_fis`]
pub fn wc_multilocus_fis_and_perm(
    container : &PolymorphismMultiGContainer,
    loci      : &[usize],
    groups    : &BTreeSet<GroupId>,
    replicates: usize,
    rng       : &mut fastrand::Rng,
) -> Result<PermResults, StatsError> {
    permutation_test(container, groups, replicates, rng,
        |c, rng| tools::permute_intra_group_alleles(c, groups, rng),
        |c| fstatistics::wc_multilocus_fis(c, loci, groups),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mock::{self, GROUP_A, GROUP_B}, Denominator};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn zero_replicates() -> anyhow::Result<()> {
        let container = mock::structured()?;
        let groups = container.all_group_ids();
        let loci = [0, 1, 2];
        let mut rng = fastrand::Rng::with_seed(42);

        let results = wc_multilocus_fst_and_perm(&container, &loci, &groups, 0, &mut rng)?;
        assert_eq!(results.statistic, fstatistics::wc_multilocus_fst(&container, &loci, &groups)?);
        assert_eq!(results.fraction_greater, 0.0);
        assert_eq!(results.fraction_lesser, 0.0);
        assert_eq!(results.undefined, 0);

        let results = wc_multilocus_fis_and_perm(&container, &loci, &groups, 0, &mut rng)?;
        assert_eq!(results.statistic, fstatistics::wc_multilocus_fis(&container, &loci, &groups)?);
        assert_eq!((results.fraction_greater, results.fraction_lesser), (0.0, 0.0));
        Ok(())
    }

    #[test]
    fn fractions_are_bounded() -> anyhow::Result<()> {
        let container = mock::structured()?;
        let groups = container.all_group_ids();
        let mut rng = fastrand::Rng::with_seed(7);
        let results = wc_multilocus_fst_and_perm(&container, &[0, 1, 2], &groups, 200, &mut rng)?;
        let total = results.fraction_greater + results.fraction_lesser + results.undefined as f64 / 200.0;
        assert!(total <= 1.0 + 1e-12);
        // ---- Locus 0 is strongly differentiated: few label shuffles should exceed it.
        assert!(results.fraction_greater < 0.2, "{results}");
        Ok(())
    }

    #[test]
    fn seeded_results_are_reproducible() -> anyhow::Result<()> {
        let container = mock::structured()?;
        let groups = container.all_group_ids();
        let a = wc_multilocus_fis_and_perm(&container, &[0, 2], &groups, 50, &mut fastrand::Rng::with_seed(3))?;
        let b = wc_multilocus_fis_and_perm(&container, &[0, 2], &groups, 50, &mut fastrand::Rng::with_seed(3))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn undefined_replicates_are_excluded() -> anyhow::Result<()> {
        let container = mock::two_groups()?;
        let groups = container.all_group_ids();
        let mut rng = fastrand::Rng::with_seed(1);
        let calls = AtomicUsize::new(0);
        let results = permutation_test(&container, &groups, 10, &mut rng,
            |c, _| Ok(c.clone()),
            |_| match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(0.5),
                _ => Err(StatsError::Undefined(Denominator::VarianceComponents)),
            },
        )?;
        assert_eq!(results.statistic, 0.5);
        assert_eq!(results.undefined, 10);
        assert_eq!((results.fraction_greater, results.fraction_lesser), (0.0, 0.0));
        assert_eq!(calls.load(Ordering::SeqCst), 11);
        Ok(())
    }

    #[test]
    fn unsampled_group_permutations() -> anyhow::Result<()> {
        let container = mock::partially_missing()?;
        let groups = container.all_group_ids();
        let mut rng = fastrand::Rng::with_seed(9);

        let err = wc_multilocus_fst_and_perm(&container, &[1], &groups, 20, &mut rng).expect_err("locus 1 is only sampled in A");
        assert_eq!(err, StatsError::Undefined(Denominator::VarianceComponents));

        let results = wc_multilocus_fst_and_perm(&container, &[0, 1], &groups, 20, &mut rng)?;
        assert!((results.statistic - 0.2).abs() < 1e-12, "{results}");
        let total = results.fraction_greater + results.fraction_lesser + results.undefined as f64 / 20.0;
        assert!(total <= 1.0 + 1e-12);
        Ok(())
    }

    #[test]
    fn hard_errors_are_propagated() -> anyhow::Result<()> {
        let container = mock::two_groups()?;
        let mut rng = fastrand::Rng::with_seed(1);
        let unknown = BTreeSet::from([GROUP_A, GroupId(8)]);
        let err = wc_multilocus_fst_and_perm(&container, &[0], &unknown, 10, &mut rng).expect_err("group 8 does not exist");
        assert_eq!(err, StatsError::Container(ContainerError::GroupNotFound(GroupId(8))));

        let single = BTreeSet::from([GROUP_B]);
        let err = wc_multilocus_fst_and_perm(&container, &[0], &single, 10, &mut rng).expect_err("a single group is provided");
        assert_eq!(err, StatsError::InsufficientGroups(1));
        Ok(())
    }
}
