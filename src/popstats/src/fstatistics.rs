//! Weir & Cockerham (1984) variance components, and the F-statistics derived from them.

use std::collections::{BTreeMap, BTreeSet};

use genotype::AlleleKey;
use log::{debug, trace};
use polymorphism::{GroupId, PolymorphismMultiGContainer};

use crate::{frequencies, heterozygosity, Denominator, StatsError};

/// Variance components of a single allele.
/// - `a`   : among groups
/// - `b`   : among individuals, within groups
/// - `c`   : within individuals
/// - `pbar`: weighted mean frequency of the allele across groups
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarComp {
    pub a   : f64,
    pub b   : f64,
    pub c   : f64,
    pub pbar: f64,
}

/// `numerator / denominator`, flagged as undefined whenever it does not yield a finite value.
fn ratio(numerator: f64, denominator: f64) -> Result<f64, StatsError> {
    match numerator / denominator {
        value if denominator == 0.0 || !value.is_finite() => Err(StatsError::Undefined(Denominator::VarianceComponents)),
        value                                             => Ok(value),
    }
}

impl VarComp {
    /// `a` is `NaN` when fewer than two groups carry data at the locus.
    fn among(&self) -> Result<f64, StatsError> {
        match self.a.is_nan() {
            true  => Err(StatsError::Undefined(Denominator::AmongGroups)),
            false => Ok(self.a),
        }
    }

    fn fit(&self) -> Result<f64, StatsError> {
        let total = self.among()? + self.b + self.c;
        Ok(1.0 - ratio(self.c, total)?)
    }

    fn fst(&self) -> Result<f64, StatsError> {
        let a = self.among()?;
        ratio(a, a + self.b + self.c)
    }

    fn fis(&self) -> Result<f64, StatsError> {
        Ok(1.0 - ratio(self.c, self.b + self.c)?)
    }
}

/// F-statistics of a single allele. Undefined values are set to `NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fstats {
    pub fit: f64,
    pub fst: f64,
    pub fis: f64,
}

/// Sample size, allele frequencies and heterozygote frequencies of one group at one locus.
struct GroupSample {
    n  : f64,
    p  : BTreeMap<AlleleKey, f64>,
    het: BTreeMap<AlleleKey, f64>,
}

impl GroupSample {
    fn new(container: &PolymorphismMultiGContainer, locus: usize, group: GroupId) -> Result<Self, StatsError> {
        let n = container.locus_group_size(group, locus)? as f64;
        let single = BTreeSet::from([group]);
        let p = undefined_as_empty(frequencies::allele_frequency_map(container, locus, &single))?;
        let het = undefined_as_empty(heterozygosity::heterozygous_frequencies(container, locus, &single))?;
        Ok(Self{n, p, het})
    }

    fn p(&self, allele: AlleleKey) -> f64 {
        self.p.get(&allele).copied().unwrap_or(0.0)
    }

    fn h(&self, allele: AlleleKey) -> f64 {
        self.het.get(&allele).copied().unwrap_or(0.0)
    }
}

/// A group without any observation contributes null frequencies.
fn undefined_as_empty(map: Result<BTreeMap<AlleleKey, f64>, StatsError>) -> Result<BTreeMap<AlleleKey, f64>, StatsError> {
    match map {
        Err(e) if e.is_undefined() => Ok(BTreeMap::new()),
        other                      => other,
    }
}

fn check_group_count(groups: &BTreeSet<GroupId>) -> Result<(), StatsError> {
    match groups.len() < 2 {
        true  => Err(StatsError::InsufficientGroups(groups.len())),
        false => Ok(()),
    }
}

/// Weir & Cockerham variance components of every allele found within the selected groups at
/// `locus`. Group sample sizes are their number of non-missing genotypes. Groups without any
/// non-missing genotype at `locus` are left out, and do not count in `r`.
///
/// When fewer than two groups carry data, the among-group variance `s²` is null and `a` is `NaN`.
///
/// # Errors
/// - `Undefined(MeanSampleSize)` if the mean sample size `n̄` is lower or equal to 1.
pub fn variance_components(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, VarComp>, StatsError> {
    container.check_groups(groups)?;
    let alleles = frequencies::allele_ids(container, locus, groups)?;
    let mut samples = groups.iter()
        .map(|group| GroupSample::new(container, locus, *group))
        .collect::<Result<Vec<GroupSample>, StatsError>>()?;
    samples.retain(|sample| sample.n > 0.0);
    if samples.len() < groups.len() {
        debug!("Locus {locus}: {} out of {} groups carry no data", groups.len() - samples.len(), groups.len());
    }

    let r = samples.len() as f64;
    let nbar = samples.iter().map(|s| s.n).sum::<f64>() / r;
    if nbar.is_nan() || nbar <= 1.0 {
        return Err(StatsError::Undefined(Denominator::MeanSampleSize))
    }
    let rnbar = r * nbar;
    let nc = match samples.len() {
        1 => f64::NAN,
        _ => (rnbar - samples.iter().map(|s| s.n * s.n).sum::<f64>() / rnbar) / (r - 1.0),
    };
    trace!("Locus {locus}: r = {r}, n̄ = {nbar}, nc = {nc}");

    let mut components = BTreeMap::new();
    for allele in alleles {
        let pbar = samples.iter().map(|s| s.n * s.p(allele)).sum::<f64>() / rnbar;
        let hbar = samples.iter().map(|s| s.n * s.h(allele)).sum::<f64>() / rnbar;
        let s2 = match samples.len() {
            1 => 0.0,
            _ => samples.iter().map(|s| s.n * (s.p(allele) - pbar).powi(2)).sum::<f64>() / ((r - 1.0) * nbar),
        };

        let pq = pbar * (1.0 - pbar);
        let among = s2 * (r - 1.0) / r;
        let a = nbar / nc * (s2 - (pq - among - hbar / 4.0) / (nbar - 1.0));
        let b = nbar / (nbar - 1.0) * (pq - among - (2.0 * nbar - 1.0) * hbar / (4.0 * nbar));
        let c = hbar / 2.0;
        components.insert(allele, VarComp{a, b, c, pbar});
    }
    Ok(components)
}

/// Per-allele `Fit = 1 - c / (a + b + c)`
///
/// # Errors
/// - `InsufficientGroups` if less than two groups are provided.
/// - `Undefined(AmongGroups)` if fewer than two of the groups carry data at `locus`.
/// - `Undefined` if the variance components are undefined, or if any allele has `a + b + c = 0`.
pub fn alleles_fit(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, f64>, StatsError> {
    check_group_count(groups)?;
    variance_components(container, locus, groups)?
        .into_iter()
        .map(|(allele, comp)| Ok((allele, comp.fit()?)))
        .collect()
}

/// Per-allele `Fst = a / (a + b + c)`
///
/// # Errors
/// - `InsufficientGroups` if less than two groups are provided.
/// - `Undefined(AmongGroups)` if fewer than two of the groups carry data at `locus`.
/// - `Undefined` if the variance components are undefined, or if any allele has `a + b + c = 0`.
pub fn alleles_fst(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, f64>, StatsError> {
    check_group_count(groups)?;
    variance_components(container, locus, groups)?
        .into_iter()
        .map(|(allele, comp)| Ok((allele, comp.fst()?)))
        .collect()
}

/// Per-allele `Fis = 1 - c / (b + c)`
///
/// # Errors
/// - `Undefined` if the variance components are undefined, or if any allele has `b + c = 0`.
pub fn alleles_fis(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, f64>, StatsError> {
    variance_components(container, locus, groups)?
        .into_iter()
        .map(|(allele, comp)| Ok((allele, comp.fis()?)))
        .collect()
}

/// Per-allele `Fit`, `Fst` and `Fis`. Any undefined value is set to `NaN` instead of failing.
///
/// # Errors
/// - `Undefined(MeanSampleSize)` if the variance components themselves are undefined.
/// - any hard error (unknown group, locus out of bounds).
pub fn alleles_fstats(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<BTreeMap<AlleleKey, Fstats>, StatsError> {
    let or_nan = |value: Result<f64, StatsError>| value.unwrap_or(f64::NAN);
    Ok(variance_components(container, locus, groups)?
        .into_iter()
        .map(|(allele, comp)| (allele, Fstats{fit: or_nan(comp.fit()), fst: or_nan(comp.fst()), fis: or_nan(comp.fis())}))
        .collect())
}

/// Number of selected groups carrying at least one non-missing genotype at `locus`.
fn groups_with_data(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>) -> Result<usize, StatsError> {
    let mut count = 0;
    for group in groups {
        if container.locus_group_size(*group, locus)? > 0 {
            count += 1;
        }
    }
    Ok(count)
}

/// Variance components of `locus`, or `None` if the locus is monomorphic within the selected
/// groups, or if fewer than `min_groups` of them carry data.
fn locus_components(container: &PolymorphismMultiGContainer, locus: usize, groups: &BTreeSet<GroupId>, min_groups: usize) -> Result<Option<BTreeMap<AlleleKey, VarComp>>, StatsError> {
    let alleles = frequencies::allele_ids(container, locus, groups)?;
    if alleles.len() < 2 {
        debug!("Skipping monomorphic locus {locus} ({} allele)", alleles.len());
        return Ok(None)
    }
    let sampled = groups_with_data(container, locus, groups)?;
    if sampled < min_groups {
        debug!("Skipping locus {locus}: only {sampled} group(s) carry data");
        return Ok(None)
    }
    variance_components(container, locus, groups).map(Some)
}

/// Variance components of the loci that are polymorphic (at least two alleles) within the
/// selected groups, and sampled in at least `min_groups` of them. Other loci are skipped.
fn polymorphic_components<'a>(container: &'a PolymorphismMultiGContainer, loci: &'a [usize], groups: &'a BTreeSet<GroupId>, min_groups: usize) -> impl Iterator<Item = Result<BTreeMap<AlleleKey, VarComp>, StatsError>> + 'a {
    loci.iter().filter_map(move |locus| locus_components(container, *locus, groups, min_groups).transpose())
}

/// Sums of the `a`, `b` and `c` components across alleles and retained loci.
fn summed_components(container: &PolymorphismMultiGContainer, loci: &[usize], groups: &BTreeSet<GroupId>, min_groups: usize) -> Result<(f64, f64, f64), StatsError> {
    let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
    for components in polymorphic_components(container, loci, groups, min_groups) {
        for comp in components?.values() {
            a += comp.a;
            b += comp.b;
            c += comp.c;
        }
    }
    Ok((a, b, c))
}

/// Multilocus Weir & Cockerham `θ = ΣA / (ΣA + ΣB + ΣC)`, over the polymorphic loci of `loci`.
/// Loci where fewer than two of the selected groups carry data are skipped.
///
/// # Errors
/// - `InsufficientGroups` if less than two groups are provided.
/// - `Undefined` if a locus has undefined variance components, or if the sum of all components
///   is zero (e.g. no polymorphic locus).
pub fn wc_multilocus_fst(container: &PolymorphismMultiGContainer, loci: &[usize], groups: &BTreeSet<GroupId>) -> Result<f64, StatsError> {
    check_group_count(groups)?;
    let (a, b, c) = summed_components(container, loci, groups, 2)?;
    ratio(a, a + b + c)
}

/// Multilocus Weir & Cockerham `f = 1 - ΣC / (ΣB + ΣC)`, over the polymorphic loci of `loci`.
/// A single group is enough.
///
/// # Errors
/// - `Undefined` if a locus has undefined variance components, or if `ΣB + ΣC` is zero.
pub fn wc_multilocus_fis(container: &PolymorphismMultiGContainer, loci: &[usize], groups: &BTreeSet<GroupId>) -> Result<f64, StatsError> {
    let (_, b, c) = summed_components(container, loci, groups, 1)?;
    Ok(1.0 - ratio(c, b + c)?)
}

/// Robertson & Hill (1984) weighted multilocus Fst: `Σ (1 - p̄ᵢ)·Fstᵢ / Σ (1 - p̄ᵢ)`, over every
/// allele of the polymorphic loci of `loci`. Loci where fewer than two of the selected groups
/// carry data, and alleles with an undefined Fst, are skipped.
///
/// # Errors
/// - `InsufficientGroups` if less than two groups are provided.
/// - `Undefined` if a locus has undefined variance components, or if no allele contributes.
pub fn rh_multilocus_fst(container: &PolymorphismMultiGContainer, loci: &[usize], groups: &BTreeSet<GroupId>) -> Result<f64, StatsError> {
    check_group_count(groups)?;
    let (mut numerator, mut denominator) = (0.0, 0.0);
    for components in polymorphic_components(container, loci, groups, 2) {
        for (allele, comp) in components? {
            match comp.fst() {
                Ok(fst) => {
                    let weight = 1.0 - comp.pbar;
                    numerator += weight * fst;
                    denominator += weight;
                },
                Err(e) if e.is_undefined() => trace!("Skipping allele {allele}: {e}"),
                Err(e) => return Err(e),
            }
        }
    }
    ratio(numerator, denominator)
}
