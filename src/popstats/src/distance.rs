use std::{collections::{BTreeMap, BTreeSet}, fmt::{self, Display, Formatter}, str::FromStr};

use genotype::AlleleKey;
use itertools::Itertools;
use log::{debug, warn};
use polymorphism::{GroupId, PolymorphismMultiGContainer};

use crate::{fstatistics, frequencies, Denominator, StatsError};

/// Space padding of the labels, when displaying a [`DistanceMatrix`].
const LABEL_DISPLAY_LEN: usize = 10;

/// Decimal precision of the values, when displaying a [`DistanceMatrix`].
const VALUE_DISPLAY_PRECISION: usize = 6;

/// Pairwise genetic distance estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceMethod {
    /// Nei (1972) standard genetic distance.
    Nei72,
    /// Nei (1978) unbiased genetic distance.
    Nei78,
    /// Weir & Cockerham (1984) multilocus Fst.
    WC,
    /// Robertson & Hill (1984) multilocus Fst.
    RH,
    /// Number of migrants: `(1 - Fst) / (4·Fst)`
    Nm,
    /// Reynolds et al. (1983): `-ln(1 - Fst)`
    D,
    /// Rousset (1997): `Fst / (1 - Fst)`
    Rousset,
}

impl DistanceMethod {
    /// Apply a derived metric to a Weir & Cockerham Fst value. Identity for non-derived methods.
    fn from_fst(self, fst: f64) -> Result<f64, StatsError> {
        let degenerate = Err(StatsError::Undefined(Denominator::DegenerateFst));
        match self {
            Self::Nm if fst == 0.0                 => degenerate,
            Self::Nm                               => Ok((1.0 - fst) / (4.0 * fst)),
            Self::D | Self::Rousset if fst == 1.0  => degenerate,
            Self::D                                => Ok(-(1.0 - fst).ln()),
            Self::Rousset                          => Ok(fst / (1.0 - fst)),
            Self::Nei72 | Self::Nei78 | Self::WC | Self::RH => Ok(fst),
        }
    }
}

impl Display for DistanceMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let method = match self {
            Self::Nei72   => "nei72",
            Self::Nei78   => "nei78",
            Self::WC      => "wc",
            Self::RH      => "rh",
            Self::Nm      => "nm",
            Self::D       => "d",
            Self::Rousset => "rousset",
        };
        Display::fmt(method, f)
    }
}

impl FromStr for DistanceMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nei72"   => Ok(Self::Nei72),
            "nei78"   => Ok(Self::Nei78),
            "wc"      => Ok(Self::WC),
            "rh"      => Ok(Self::RH),
            "nm"      => Ok(Self::Nm),
            "d"       => Ok(Self::D),
            "rousset" => Ok(Self::Rousset),
            _         => Err(StatsError::ParseDistanceMethod(s.to_string())),
        }
    }
}

/// Gene identity accumulators, summed across loci.
#[derive(Debug, Default)]
struct GeneIdentity {
    jx : f64,
    jy : f64,
    jxy: f64,
}

impl GeneIdentity {
    /// `-ln(Jxy / √(Jx·Jy))`
    fn distance(&self) -> Result<f64, StatsError> {
        let product = self.jx * self.jy;
        if product <= 0.0 || product.is_nan() {
            return Err(StatsError::Undefined(Denominator::GeneIdentity))
        }
        Ok(-(self.jxy / product.sqrt()).ln())
    }
}

/// Allele frequencies of a single group at a locus. `None` if the group carries no allele.
fn group_frequencies(container: &PolymorphismMultiGContainer, locus: usize, group: GroupId) -> Result<Option<BTreeMap<AlleleKey, f64>>, StatsError> {
    match frequencies::allele_frequency_map(container, locus, &BTreeSet::from([group])) {
        Ok(freqs)                  => Ok(Some(freqs)),
        Err(e) if e.is_undefined() => Ok(None),
        Err(e)                     => Err(e),
    }
}

/// Visit every locus where both groups carry at least one allele, providing their frequencies.
/// Loci lacking data for either group are skipped.
fn for_each_shared_locus<F>(container: &PolymorphismMultiGContainer, loci: &[usize], group_x: GroupId, group_y: GroupId, mut visit: F) -> Result<(), StatsError>
where
    F: FnMut(usize, &BTreeMap<AlleleKey, f64>, &BTreeMap<AlleleKey, f64>) -> Result<(), StatsError>,
{
    container.check_groups([&group_x, &group_y])?;
    for locus in loci {
        match (group_frequencies(container, *locus, group_x)?, group_frequencies(container, *locus, group_y)?) {
            (Some(x), Some(y)) => visit(*locus, &x, &y)?,
            _                  => debug!("Skipping locus {locus}: no data for group {group_x} or {group_y}"),
        }
    }
    Ok(())
}

/// `Σ x²`, `Σ y²` and `Σ xy`, over the union of the alleles of both groups.
fn locus_identities(x: &BTreeMap<AlleleKey, f64>, y: &BTreeMap<AlleleKey, f64>) -> (f64, f64, f64) {
    let mut identities = (0.0, 0.0, 0.0);
    for allele in x.keys().chain(y.keys()).unique() {
        let px = x.get(allele).copied().unwrap_or(0.0);
        let py = y.get(allele).copied().unwrap_or(0.0);
        identities.0 += px * px;
        identities.1 += py * py;
        identities.2 += px * py;
    }
    identities
}

/// Nei (1972) standard genetic distance between two groups, over `loci`.
///
/// # Errors
/// - `Undefined(GeneIdentity)` if `Jx·Jy = 0` (e.g. no locus carrying data for both groups).
pub fn nei72_distance(container: &PolymorphismMultiGContainer, loci: &[usize], group_x: GroupId, group_y: GroupId) -> Result<f64, StatsError> {
    let mut identity = GeneIdentity::default();
    for_each_shared_locus(container, loci, group_x, group_y, |_, x, y| {
        let (jx, jy, jxy) = locus_identities(x, y);
        identity.jx += jx;
        identity.jy += jy;
        identity.jxy += jxy;
        Ok(())
    })?;
    identity.distance()
}

/// Nei (1978) unbiased genetic distance between two groups, over `loci`. Per-locus homozygosities
/// are corrected using each group's number of non-missing genotypes `n`: `(2n·Σx² - 1) / (2n - 1)`.
/// This is the same `n` as [`crate::heterozygosity::hnb`].
///
/// # Errors
/// - `Undefined(SampleSize)` if `2n - 1 <= 0` for a group at a shared locus.
/// - `Undefined(GeneIdentity)` if `Jx·Jy <= 0`
pub fn nei78_distance(container: &PolymorphismMultiGContainer, loci: &[usize], group_x: GroupId, group_y: GroupId) -> Result<f64, StatsError> {
    let unbiased = |j: f64, group: GroupId, locus: usize| -> Result<f64, StatsError> {
        let n = frequencies::count_non_missing(container, locus, &BTreeSet::from([group]))? as f64;
        match 2.0 * n - 1.0 {
            denominator if denominator <= 0.0 => Err(StatsError::Undefined(Denominator::SampleSize)),
            denominator                       => Ok((2.0 * n * j - 1.0) / denominator),
        }
    };

    let mut identity = GeneIdentity::default();
    for_each_shared_locus(container, loci, group_x, group_y, |locus, x, y| {
        let (jx, jy, jxy) = locus_identities(x, y);
        identity.jx += unbiased(jx, group_x, locus)?;
        identity.jy += unbiased(jy, group_y, locus)?;
        identity.jxy += jxy;
        Ok(())
    })?;
    identity.distance()
}

/// Distance between two groups, using `method`.
///
/// # Errors
/// - `Undefined` if the distance is undefined for this pair of groups.
/// - any hard error (unknown group, locus out of bounds).
pub fn pairwise_distance(container: &PolymorphismMultiGContainer, loci: &[usize], group_x: GroupId, group_y: GroupId, method: DistanceMethod) -> Result<f64, StatsError> {
    let pair = BTreeSet::from([group_x, group_y]);
    match method {
        DistanceMethod::Nei72 => nei72_distance(container, loci, group_x, group_y),
        DistanceMethod::Nei78 => nei78_distance(container, loci, group_x, group_y),
        DistanceMethod::RH    => fstatistics::rh_multilocus_fst(container, loci, &pair),
        DistanceMethod::WC | DistanceMethod::Nm | DistanceMethod::D | DistanceMethod::Rousset => {
            method.from_fst(fstatistics::wc_multilocus_fst(container, loci, &pair)?)
        },
    }
}

/// Symmetric matrix of pairwise distances, labelled with group names. The diagonal is zero, and
/// undefined distances are set to `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    labels: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    /// Instantiate a zero-filled matrix.
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        let values = vec![vec![0.0; labels.len()]; labels.len()];
        Self{labels, values}
    }

    /// Access the distance between the `i`th and `j`th groups. `None` if out of bounds.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied()
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i][j] = value;
        self.values[j][i] = value;
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate over the rows of the matrix, along with their label.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.labels.iter().map(String::as_str).zip(self.values.iter().map(Vec::as_slice))
    }
}

/// PHYLIP-like square layout: the number of groups, followed by one labelled row per group.
impl Display for DistanceMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.len())?;
        for (label, row) in self.rows() {
            write!(f, "{label: <LABEL_DISPLAY_LEN$}")?;
            for value in row {
                write!(f, " {value:.VALUE_DISPLAY_PRECISION$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Pairwise distance matrix of `groups` (ordered by id), over `loci`.
///
/// Undefined distances are set to `NaN` rather than failing, so that the matrix is always complete.
///
/// # Errors
/// - any hard error (unknown group, locus out of bounds).
pub fn distance_matrix(container: &PolymorphismMultiGContainer, loci: &[usize], groups: &BTreeSet<GroupId>, method: DistanceMethod) -> Result<DistanceMatrix, StatsError> {
    container.check_groups(groups)?;
    let labels = groups.iter()
        .map(|group| container.group_name(*group))
        .collect::<Result<Vec<String>, _>>()?;

    let mut matrix = DistanceMatrix::new(labels);
    let groups: Vec<GroupId> = groups.iter().copied().collect();
    for ((i, x), (j, y)) in groups.iter().enumerate().tuple_combinations() {
        let distance = match pairwise_distance(container, loci, *x, *y, method) {
            Ok(distance)               => distance,
            Err(e) if e.is_undefined() => {
                warn!("Undefined {method} distance between groups {x} and {y}: {e}");
                f64::NAN
            },
            Err(e) => return Err(e),
        };
        debug!("{method} distance between groups {x} and {y}: {distance}");
        matrix.set(i, j, distance);
    }
    Ok(matrix)
}
