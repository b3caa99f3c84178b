extern crate parser;
extern crate logger;

use std::collections::BTreeSet;

use parser::{Cli, Common, Commands::*, Method};
use popgen_io::{parse::output_file, read::Dataset};
use polymorphism::GroupId;
use popstats::{fstatistics, frequencies, heterozygosity, permutation, distance, DistanceMethod, StatsError};

use located_error::prelude::*;

#[macro_use]
extern crate log;

pub mod report;
use report::{AlleleFstatsRow, DiversityRow, FrequencyRow, MultilocusRow};

/// Selected dataset, loci and groups, along with the thread pool every computation runs in.
struct Analysis {
    dataset: Dataset,
    loci   : Vec<usize>,
    groups : BTreeSet<GroupId>,
    pool   : rayon::ThreadPool,
}

impl Analysis {
    /// Read the input dataset, and resolve `--loci` and `--groups` against it. Both default to
    /// every locus and every group found within the dataset.
    fn new(common: &Common) -> Result<Self> {
        let dataset = Dataset::from_yaml(&common.input)?;

        let loci = match common.parse_loci()? {
            Some(loci) => loci,
            None       => (0..dataset.loci.len()).collect(),
        };
        for position in &loci {
            dataset.loci.locus(*position).loc("While checking --loci")?;
        }

        let groups = match common.parse_groups()? {
            Some(groups) => groups.into_iter().map(GroupId).collect(),
            None         => dataset.container.all_group_ids(),
        };
        dataset.container.check_groups(&groups).loc("While checking --groups")?;
        info!("Selected {} loci and {} groups", loci.len(), groups.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(common.threads)
            .build()
            .loc("While building thread pool")?;
        Ok(Self{dataset, loci, groups, pool})
    }

    fn locus_name(&self, position: usize) -> Result<&str> {
        Ok(self.dataset.loci.locus(position)?.name())
    }

    fn allele_name(&self, position: usize, key: genotype::AlleleKey) -> Result<String> {
        Ok(self.dataset.loci.locus(position)?.allele(key)?.id.clone())
    }
}

/// Replace undefined statistics with `NaN`. Hard errors are propagated.
fn or_nan(value: Result<f64, StatsError>) -> Result<f64, StatsError> {
    match value {
        Err(e) if e.is_undefined() => Ok(f64::NAN),
        other                      => other,
    }
}

/// Same as [`or_nan`], but estimators requiring more groups than selected are also reported as
/// `NaN`, so that the remaining estimators can still be computed.
fn or_nan_multilocus(estimator: &str, value: Result<f64, StatsError>) -> Result<f64, StatsError> {
    match value {
        Err(StatsError::InsufficientGroups(n)) => {
            warn!("Skipping {estimator}: at least two groups are required. Got {n}");
            Ok(f64::NAN)
        },
        other => or_nan(other),
    }
}

fn distance_method(method: Method) -> DistanceMethod {
    match method {
        Method::Nei72   => DistanceMethod::Nei72,
        Method::Nei78   => DistanceMethod::Nei78,
        Method::Wc      => DistanceMethod::WC,
        Method::Rh      => DistanceMethod::RH,
        Method::Nm      => DistanceMethod::Nm,
        Method::D       => DistanceMethod::D,
        Method::Rousset => DistanceMethod::Rousset,
    }
}

/// Allele frequencies, and Hobs, Hexp, Hnb for every selected locus and group.
fn run_summary(analysis: &Analysis, common: &Common) -> Result<()> {
    let frequencies_file = output_file(&common.output_dir, "summary-frequencies", "tsv", common.overwrite)?;
    let diversity_file   = output_file(&common.output_dir, "summary-diversity", "tsv", common.overwrite)?;

    let container = &analysis.dataset.container;
    let mut frequency_rows = Vec::new();
    let mut diversity_rows = Vec::new();
    for &locus in &analysis.loci {
        for &group in &analysis.groups {
            let selected = BTreeSet::from([group]);
            let locus_name = analysis.locus_name(locus)?;
            let group_name = container.group_name(group)?;

            match frequencies::allele_frequency_map(container, locus, &selected) {
                Ok(freqs) => for (key, frequency) in freqs {
                    let allele = analysis.allele_name(locus, key)?;
                    frequency_rows.push(FrequencyRow{locus: locus_name.to_string(), group: group_name.clone(), allele, frequency});
                },
                Err(e) if e.is_undefined() => debug!("No allele frequency for group {group_name} at locus {locus_name}: {e}"),
                Err(e) => return Err(e).loc("While computing allele frequencies"),
            }

            diversity_rows.push(DiversityRow{
                locus: locus_name.to_string(),
                group: group_name,
                n    : frequencies::count_non_missing(container, locus, &selected)?,
                hobs : or_nan(heterozygosity::hobs(container, locus, &selected))?,
                hexp : or_nan(heterozygosity::hexp(container, locus, &selected))?,
                hnb  : or_nan(heterozygosity::hnb(container, locus, &selected))?,
            });
        }
    }

    info!("Printing results...");
    report::write_table(&frequencies_file, FrequencyRow::header(), &frequency_rows)?;
    report::write_table(&diversity_file, DiversityRow::header(), &diversity_rows)
}

/// Multilocus WC Fst and Fis with their permutation tests, RH Fst, and per-allele F-statistics.
/// With a single selected group, both Fst estimators are reported as `NaN`.
fn run_fstats(analysis: &Analysis, common: &Common, permutations: usize) -> Result<()> {
    let multilocus_file = output_file(&common.output_dir, "fstats-multilocus", "tsv", common.overwrite)?;
    let alleles_file    = output_file(&common.output_dir, "fstats-alleles", "tsv", common.overwrite)?;

    let container = &analysis.dataset.container;
    let (loci, groups) = (&analysis.loci, &analysis.groups);
    let mut rng = fastrand::Rng::with_seed(common.seed);

    info!("Computing multilocus F-statistics over {permutations} permutations...");
    let tested = |estimator: &'static str, test: Result<popstats::PermResults, StatsError>, observed: &dyn Fn() -> Result<f64, StatsError>| -> Result<MultilocusRow, StatsError> {
        match test {
            Ok(test) => Ok(MultilocusRow::from((estimator, test))),
            Err(e) if e.is_undefined() || matches!(e, StatsError::InsufficientGroups(_)) => {
                warn!("Cannot test {estimator}: {e}");
                Ok(MultilocusRow{estimator, value: or_nan_multilocus(estimator, observed())?, test: None})
            },
            Err(e) => Err(e),
        }
    };
    let multilocus_rows = vec![
        tested("WC-Fst", permutation::wc_multilocus_fst_and_perm(container, loci, groups, permutations, &mut rng), &|| fstatistics::wc_multilocus_fst(container, loci, groups))?,
        tested("WC-Fis", permutation::wc_multilocus_fis_and_perm(container, loci, groups, permutations, &mut rng), &|| fstatistics::wc_multilocus_fis(container, loci, groups))?,
        MultilocusRow{estimator: "RH-Fst", value: or_nan_multilocus("RH-Fst", fstatistics::rh_multilocus_fst(container, loci, groups))?, test: None},
    ];

    let mut allele_rows = Vec::new();
    for &locus in loci {
        let locus_name = analysis.locus_name(locus)?;
        match fstatistics::alleles_fstats(container, locus, groups) {
            Ok(fstats) => for (key, fstats) in fstats {
                let allele = analysis.allele_name(locus, key)?;
                allele_rows.push(AlleleFstatsRow{locus: locus_name.to_string(), allele, fstats});
            },
            Err(e) if e.is_undefined() => warn!("Skipping locus {locus_name}: {e}"),
            Err(e) => return Err(e).loc("While computing per-allele F-statistics"),
        }
    }

    info!("Printing results...");
    report::write_table(&multilocus_file, MultilocusRow::header(), &multilocus_rows)?;
    report::write_table(&alleles_file, AlleleFstatsRow::header(), &allele_rows)
}

/// Pairwise distance matrix between the selected groups.
fn run_distance(analysis: &Analysis, common: &Common, method: Method) -> Result<()> {
    info!("Computing distance matrix: {method}...");
    let method = distance_method(method);
    let matrix_file = output_file(&common.output_dir, &format!("distance-{method}"), "dist", common.overwrite)?;
    let matrix = distance::distance_matrix(&analysis.dataset.container, &analysis.loci, &analysis.groups, method)?;

    info!("Printing results...");
    print!("{matrix}");
    let mut writer = popgen_io::write::GenericWriter::new(Some(&matrix_file))?;
    writer.write_iter(std::iter::once(&matrix))
}

/// Unpack the command line arguments, and run the requested command.
///
/// # Errors
/// - if the input dataset cannot be read, or `--loci`/`--groups` do not match it.
/// - if a statistic raises a hard error (undefined values are reported as `NaN`).
/// - if results cannot be written within `--output-dir`.
pub fn run(cli: Cli) -> Result<()> {
    match cli.commands {
        Summary{common} => {
            let analysis = Analysis::new(&common)?;
            analysis.pool.install(|| run_summary(&analysis, &common))?;
        },

        Fstats{common, perm} => {
            let analysis = Analysis::new(&common)?;
            analysis.pool.install(|| run_fstats(&analysis, &common, perm.permutations))?;
        },

        Distance{common, method} => {
            let analysis = Analysis::new(&common)?;
            analysis.pool.install(|| run_distance(&analysis, &common, method))?;
        },

        FromYaml{yaml} => {
            let cli = Cli::deserialize(&yaml)?;
            self::run(cli)?;
        },
    };
    Ok(())
}
