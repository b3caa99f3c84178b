use std::{fmt::{self, Display, Formatter}, path::Path};

use anyhow::Result;
use located_error::LocatedError;
use popgen_io::write::GenericWriter;
use popstats::{Fstats, PermResults};

const DISPL_SEP             : &str  = " - ";
const LABEL_FORMAT_LEN      : usize = 12;
const COUNT_FORMAT_LEN      : usize = 7;
const FLOAT_FORMAT_LEN      : usize = 9;
const FLOAT_FORMAT_PRECISION: usize = 5;

/// Frequency of one allele, within one group, at one locus.
pub struct FrequencyRow {
    pub locus    : String,
    pub group    : String,
    pub allele   : String,
    pub frequency: f64,
}

impl FrequencyRow {
    pub fn header() -> String {
        format!("{: <LABEL_FORMAT_LEN$}{DISPL_SEP}{: <LABEL_FORMAT_LEN$}{DISPL_SEP}{: <LABEL_FORMAT_LEN$}{DISPL_SEP}Freq.", "Locus", "Group", "Allele")
    }
}

impl Display for FrequencyRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f,
            "{: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}",
            self.locus, self.group, self.allele, self.frequency
        )
    }
}

/// Heterozygosity summary of one group at one locus. Undefined values are `NaN`.
pub struct DiversityRow {
    pub locus: String,
    pub group: String,
    pub n    : usize,
    pub hobs : f64,
    pub hexp : f64,
    pub hnb  : f64,
}

impl DiversityRow {
    pub fn header() -> String {
        format!(
            "{: <LABEL_FORMAT_LEN$}{DISPL_SEP}{: <LABEL_FORMAT_LEN$}{DISPL_SEP}{: <COUNT_FORMAT_LEN$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$}{DISPL_SEP}{: <FLOAT_FORMAT_LEN$}{DISPL_SEP}Hnb",
            "Locus", "Group", "N", "Hobs", "Hexp"
        )
    }
}

impl Display for DiversityRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f,
            "{: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <COUNT_FORMAT_LEN$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}",
            self.locus, self.group, self.n, self.hobs, self.hexp, self.hnb
        )
    }
}

/// Per-allele Fit, Fst and Fis at one locus.
pub struct AlleleFstatsRow {
    pub locus : String,
    pub allele: String,
    pub fstats: Fstats,
}

impl AlleleFstatsRow {
    pub fn header() -> String {
        format!(
            "{: <LABEL_FORMAT_LEN$}{DISPL_SEP}{: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$}{DISPL_SEP}{: <FLOAT_FORMAT_LEN$}{DISPL_SEP}Fis",
            "Locus", "Allele", "Fit", "Fst"
        )
    }
}

impl Display for AlleleFstatsRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f,
            "{: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <LABEL_FORMAT_LEN$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}",
            self.locus, self.allele, self.fstats.fit, self.fstats.fst, self.fstats.fis
        )
    }
}

/// A multilocus estimator, along with its permutation test when one was run.
pub struct MultilocusRow {
    pub estimator: &'static str,
    pub value    : f64,
    pub test     : Option<PermResults>,
}

impl MultilocusRow {
    pub fn header() -> String {
        format!(
            "{: <LABEL_FORMAT_LEN$}{DISPL_SEP}{: <FLOAT_FORMAT_LEN$}{DISPL_SEP}\
            {: <FLOAT_FORMAT_LEN$}{DISPL_SEP}{: <FLOAT_FORMAT_LEN$}{DISPL_SEP}Undefined",
            "Estimator", "Value", "P(>obs)", "P(<obs)"
        )
    }
}

impl From<(&'static str, PermResults)> for MultilocusRow {
    fn from((estimator, test): (&'static str, PermResults)) -> Self {
        Self{estimator, value: test.statistic, test: Some(test)}
    }
}

impl Display for MultilocusRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{: <LABEL_FORMAT_LEN$}{DISPL_SEP}{: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}{DISPL_SEP}", self.estimator, self.value)?;
        match &self.test {
            Some(test) => write!(f,
                "{: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}{DISPL_SEP}\
                {: <FLOAT_FORMAT_LEN$.FLOAT_FORMAT_PRECISION$}{DISPL_SEP}\
                {}",
                test.fraction_greater, test.fraction_lesser, test.undefined
            ),
            None => write!(f, "{: <FLOAT_FORMAT_LEN$}{DISPL_SEP}{: <FLOAT_FORMAT_LEN$}{DISPL_SEP}NA", "NA", "NA"),
        }
    }
}

/// Print a results table to the console, and write it as a tab-separated file at `path`.
///
/// # Errors
/// - if `path` cannot be created or written into.
pub fn write_table<R: Display>(path: &Path, header: String, rows: &[R]) -> Result<()> {
    println!("{header}");
    for row in rows {
        println!("{row}");
    }
    let mut writer = GenericWriter::new(Some(path)).with_loc(|| format!("While opening results file {}", path.display()))?;
    writer.write_iter(std::iter::once(header))?;
    writer.write_iter(rows).with_loc(|| format!("While writing results into {}", path.display()))
}
