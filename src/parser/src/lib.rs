use std::{
    fs::File,
    path::{Path, PathBuf},
    str::FromStr,
    ops::{Add, Range},
    fmt::{self, Display, Formatter}, ffi::OsStr
};

use located_error::prelude::*;

use clap::{Parser, Subcommand, Args, ArgEnum};
use serde::{Serialize, Deserialize};
use log::debug;
use num::One;

mod error;
pub use error::ParserError;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name="popgen-rs", author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// popgen-rs: group-structured population genetics statistics
pub struct Cli {
    ///Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. Multiple levels allowed {n}
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Note that the program will still output warnings by default, even when this flag is off.
    /// Use The --quiet/-q to disable them
    #[clap(short='v', long, parse(from_occurrences), global=true)]
    pub verbose: u8,

    /// Disable warnings.
    ///
    /// By default, warnings are emmited and redirected to the console, even when verbose mode is off.
    /// Use this argument to disable this. Only errors will be displayed.
    #[clap(short='q', long, global=true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli{
    /// Serialize command line arguments within a `.yaml` file.
    ///
    /// # Behavior
    /// - File naming follows the convention '{current time}-{command name}.yaml'. current time follows the format
    ///   `YYYY`-`MM`-`DD`T`hhmmss`
    /// - File is written at the root of the user-provided `--output-dir` folder.
    /// - `from-yaml` commands are never serialized.
    ///
    /// # Errors
    /// - if `serde_yaml` fails to parse `Self` to a string.
    /// - if the output file cannot be written.
    pub fn serialize(&self) -> Result<()> {
        let (common, command) = match &self.commands {
            Commands::Summary{common}     => (common, "summary"),
            Commands::Fstats{common, ..}  => (common, "fstats"),
            Commands::Distance{common, ..}=> (common, "distance"),
            Commands::FromYaml{..}        => return Ok(()),
        };

        // Parse arguments to yaml and print to console.
        let serialized = serde_yaml::to_string(&self).loc("Failed to serialize command line arguments")?;
        debug!("\n---- Command line args ----\n{}\n---", serialized);

        let current_time = chrono::offset::Local::now().format("%Y-%m-%dT%H%M%S").to_string();
        let output_file = common.output_dir.join(format!("{current_time}-{command}.yaml"));

        std::fs::write(&output_file, serialized)
            .with_loc(|| format!("Unable to serialize arguments into {}", output_file.display()))
    }

    /// Deserialize a `.yaml` file into Command line arguments.
    ///
    /// # Errors
    ///
    /// - Returns `FileNotFound` or `PermissionDenied` if the provided `.yaml` is invalid,
    ///   or does not carry read permissions
    /// - if `serde_yaml` fails to parse the provided file to `Self`.
    pub fn deserialize(yaml: &Path) -> Result<Self> {
        let file = File::open(yaml).with_loc(|| format!("While opening {}", yaml.display()))?;
        serde_yaml::from_reader(file).with_loc(|| format!("While parsing arguments from {}", yaml.display()))
    }
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Commands {
    /// Per-locus, per-group diversity summary.
    ///
    /// Report allele frequencies, observed heterozygosity (Hobs), expected heterozygosity (Hexp) and
    /// Nei's unbiased gene diversity (Hnb), for every selected locus and group.
    Summary {
        #[clap(flatten)]
        common: Common,
    },

    /// Weir & Cockerham F-statistics.
    ///
    /// Compute the multilocus Weir & Cockerham Fst and Fis estimators along with their permutation
    /// tests, the Robertson & Hill multilocus Fst, and per-locus Fit/Fst/Fis.
    Fstats {
        #[clap(flatten)]
        common: Common,

        #[clap(flatten)]
        perm: Permutations,
    },

    /// Pairwise genetic distance matrix between groups.
    Distance {
        #[clap(flatten)]
        common: Common,

        /// Distance method.
        ///
        /// nei72: Nei's standard genetic distance (1972).{n}
        /// nei78: Nei's unbiased genetic distance (1978).{n}
        /// wc/rh: pairwise multilocus Fst (Weir & Cockerham / Robertson & Hill).{n}
        /// nm: number of migrants, (1/Fst - 1)/4.{n}
        /// d: Reynolds' distance, -ln(1 - Fst).{n}
        /// rousset: Fst / (1 - Fst).
        #[clap(short='m', long, arg_enum, default_value("nei72"))]
        method: Method,
    },

    /// Run popgen-rs using a previously generated .yaml configuration file.
    ///
    /// This allows users to easily re-apply a popgen-rs command using the exact same parameters
    /// and arguments.
    FromYaml {
        #[clap(parse(try_from_os_str=valid_input_file))]
        yaml: PathBuf,
    },
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct Common {
    /// Input YAML dataset.
    ///
    /// Declares the analyzed loci (name, ploidy and alleles), optional group names, and every
    /// individual's group and per-locus allele identifiers.
    #[clap(short, long, parse(try_from_os_str=valid_input_file))]
    pub input: PathBuf,

    /// Restrict computations to a given set of group ids.
    ///
    /// Argument may accept slices (inclusive) such as '--groups 1-3' and/or discrete integers such as '--groups 1 4 7'.{n}
    /// By default, every group found within the dataset is used.
    #[clap(short, long, multiple_values(true))]
    pub groups: Option<Vec<String>>,

    /// Restrict computations to a given set of locus positions (0-based).
    ///
    /// Argument may accept slices (inclusive) such as '--loci 0-3' and/or discrete integers such as '--loci 0 4 13'.{n}
    /// Example:{n}
    ///   specifying          : '--loci 0-2 5 7-8 '{n}
    ///   ...will be parsed as: [0, 1, 2, 5, 7, 8]
    ///
    /// By default, every locus is used.
    #[clap(short, long, multiple_values(true))]
    pub loci: Option<Vec<String>>,

    /// Output directory where results will be written.
    ///
    /// Note that popgen-rs will create the specified leaf directory if it is not present, by does not
    /// allow itself from creating parent directories.
    #[clap(short, long, default_value("popgen-output"), parse(try_from_os_str=valid_output_dir))]
    pub output_dir: PathBuf,

    /// Overwrite existing output files.
    ///
    /// By default, popgen-rs does not allow itself from overwriting existing results files. Use this flag
    /// to force this behaviour.
    #[clap(short='w', long)]
    pub overwrite: bool,

    /// Number of worker threads. 0 lets the thread pool pick the number of available cores.
    #[clap(short='@', long, default_value("1"))]
    pub threads: usize,

    /// Provide the RNG with a set seed.
    #[clap(long, required(false), default_value_t=fastrand::u64(u64::MIN..=u64::MAX))]
    pub seed: u64,
}

impl Common {
    /// Parse `--groups` into a sorted, deduplicated list of group ids. `None` if unspecified.
    ///
    /// # Errors
    /// - `ParseArg` if any of the provided ranges cannot be parsed into integers.
    pub fn parse_groups(&self) -> Result<Option<Vec<usize>>, ParserError> {
        self.groups.as_ref().map(|ranges| parse_user_ranges(ranges, "groups")).transpose()
    }

    /// Parse `--loci` into a sorted, deduplicated list of locus positions. `None` if unspecified.
    ///
    /// # Errors
    /// - `ParseArg` if any of the provided ranges cannot be parsed into integers.
    pub fn parse_loci(&self) -> Result<Option<Vec<usize>>, ParserError> {
        self.loci.as_ref().map(|ranges| parse_user_ranges(ranges, "loci")).transpose()
    }
}

#[derive(Args, Debug, Default, Serialize, Deserialize)]
pub struct Permutations {
    /// Number of permutation replicates used to test the multilocus Fst and Fis estimators.
    ///
    /// Fst is tested by shuffling individuals across groups, Fis by shuffling alleles within groups.
    /// Use 0 to skip testing.
    #[clap(short='p', long, default_value("1000"))]
    pub permutations: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum Method {
    Nei72,
    Nei78,
    Wc,
    Rh,
    Nm,
    D,
    Rousset,
}

impl Default for Method {
    fn default() -> Self {Self::Nei72}
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nei72   => write!(f, "Nei's standard distance (1972)"),
            Self::Nei78   => write!(f, "Nei's unbiased distance (1978)"),
            Self::Wc      => write!(f, "Weir & Cockerham Fst"),
            Self::Rh      => write!(f, "Robertson & Hill Fst"),
            Self::Nm      => write!(f, "Number of migrants"),
            Self::D       => write!(f, "Reynolds' distance"),
            Self::Rousset => write!(f, "Rousset's Fst/(1-Fst)"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FileEntity {File, Directory}

impl Display for FileEntity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::File      => write!(f, "File"),
            Self::Directory => write!(f, "Directory"),
        }
    }
}

impl FileEntity {
    fn validate(&self, path: &Path) -> Result<(), ParserError> {
        use ParserError::InvalidFileEntity;
        let valid = match self {
            Self::File      => path.is_file(),
            Self::Directory => path.is_dir()
        };

        if valid {
            Ok(())
        } else {
            Err(InvalidFileEntity(*self, path.display().to_string()))
        }
    }
}

fn assert_filesystem_entity_is_valid(s: &OsStr, entity: &FileEntity) -> Result<()> {
    use ParserError::MissingFileEntity;
    let path = Path::new(s);
    if ! path.exists() {
        return Err(MissingFileEntity(*entity, path.display().to_string()))
            .loc("While parsing arguments.")
    }

    entity.validate(path).loc("While parsing arguments.")
}

fn valid_input_file(s: &OsStr) -> Result<PathBuf> {
    assert_filesystem_entity_is_valid(s, &FileEntity::File)
        .loc("While checking for file validity")?;
    Ok(PathBuf::from(s))
}

fn valid_output_dir(s: &OsStr) -> Result<PathBuf> {
    if ! Path::new(s).exists() {
        std::fs::create_dir(s).with_loc(|| format!("While creating output directory {}", Path::new(s).display()))?;
    }
    assert_filesystem_entity_is_valid(s, &FileEntity::Directory)
        .loc("While checking for directory validity")?;
    Ok(PathBuf::from(s))
}

/// Convert a user-defined string "range" into a vector of integers.
/// "9-14" thus becomes [9, 10, 11, 12, 13, 14]
/// Note that the range is fully inclusive.
fn parse_user_range<T>(s: &str) -> Result<Vec<T>, <T as FromStr>::Err>
where   T       : FromStr + Add<Output = T> + Ord + One,
        Range<T>: Iterator<Item = T>,
{
    match s.split_once('-') {
            Some(t) => Ok((t.0.parse::<T>()?..t.1.parse::<T>()?+One::one()).collect::<Vec<T>>()),
            None    => Ok(vec![s.parse::<T>()?])
    }
}

/// Convert a vector of Strings with user-input ranges to a single, sorted and deduplicated vector of integers.
///
/// ```text
/// --> ["1-6", "8"] for the user, becomes [1, 2, 3, 4, 5, 6, 8] for our program.
/// ```
///
/// # Example
///```
///use parser::parse_user_ranges;
///let user_input: Vec<String> = vec!["5".into(), "1-3".into(), "7".into(), "2".into()];
///let parsed_input: Vec<usize> = parse_user_ranges(&user_input, "loci").expect("error");
///assert_eq!(parsed_input, vec![1, 2, 3, 5, 7])
///```
///
/// # Errors
///  returns a `ParseArg` error if the provided ranges cannot be parsed into integers.
pub fn parse_user_ranges<T>(ranges: &[String], arg: &str) -> Result<Vec<T>, ParserError>
where   T                   : FromStr + Add<Output = T> + Ord + One,
        Range<T>            : Iterator<Item = T>,
        <T as FromStr>::Err : ToString,
{
    let mut parsed_ranges = ranges.iter()
        .map(|s| parse_user_range(s))
        .collect::<Result<Vec<Vec<T>>, _>>()
        .map_err(|err| ParserError::ParseArg{arg: arg.to_string(), err: err.to_string()})?
        .into_iter()
        .flatten()
        .collect::<Vec<T>>();
    parsed_ranges.sort();
    parsed_ranges.dedup();
    Ok(parsed_ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_input(dir: &Path) -> Result<PathBuf> {
        let input = dir.join("dataset.yaml");
        std::fs::write(&input, "loci: []")?;
        Ok(input)
    }

    #[test]
    fn user_ranges() -> Result<()> {
        let ranges: Vec<String> = ["7-9", "2", "8", "0-1"].iter().map(ToString::to_string).collect();
        assert_eq!(parse_user_ranges::<usize>(&ranges, "loci")?, vec![0, 1, 2, 7, 8, 9]);
        Ok(())
    }

    #[test]
    fn invalid_user_ranges() {
        let ranges = vec!["1-a".to_string()];
        let err = parse_user_ranges::<usize>(&ranges, "groups").expect_err("'a' is not an integer");
        assert!(matches!(err, ParserError::ParseArg{ref arg, ..} if arg == "groups"));
    }

    #[test]
    fn parse_fstats() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let input = mock_input(tmpdir.path())?;
        let output = tmpdir.path().join("out");
        let cli = Cli::try_parse_from([
            "popgen-rs", "-vv", "fstats",
            "--input", input.to_str().loc("non UTF-8 path")?,
            "--output-dir", output.to_str().loc("non UTF-8 path")?,
            "--groups", "1-2", "4",
            "--permutations", "50",
            "--seed", "42",
        ])?;
        assert_eq!(cli.verbose, 2);
        assert!(output.is_dir());

        let Commands::Fstats{common, perm} = &cli.commands else {
            panic!("Expected an fstats command");
        };
        assert_eq!(common.parse_groups()?, Some(vec![1, 2, 4]));
        assert_eq!(common.parse_loci()?, None);
        assert_eq!(common.seed, 42);
        assert_eq!(common.threads, 1);
        assert_eq!(perm.permutations, 50);
        Ok(())
    }

    #[test]
    fn parse_distance_method() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let input = mock_input(tmpdir.path())?;
        let input = input.to_str().loc("non UTF-8 path")?;
        let output = tmpdir.path().join("out");
        let output = output.to_str().loc("non UTF-8 path")?;

        let cli = Cli::try_parse_from(["popgen-rs", "distance", "-i", input, "-o", output, "--method", "rousset"])?;
        assert!(matches!(cli.commands, Commands::Distance{method: Method::Rousset, ..}));

        let cli = Cli::try_parse_from(["popgen-rs", "distance", "-i", input, "-o", output])?;
        assert!(matches!(cli.commands, Commands::Distance{method: Method::Nei72, ..}));

        assert!(Cli::try_parse_from(["popgen-rs", "distance", "-i", input, "-o", output, "-m", "euclid"]).is_err());
        Ok(())
    }

    #[test]
    fn missing_input_file() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let missing = tmpdir.path().join("missing.yaml");
        assert!(Cli::try_parse_from(["popgen-rs", "summary", "--input", missing.to_str().loc("non UTF-8 path")?]).is_err());
        Ok(())
    }

    #[test]
    fn serialize_roundtrip() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let input = mock_input(tmpdir.path())?;
        let output = tmpdir.path().join("out");
        let cli = Cli::try_parse_from([
            "popgen-rs", "summary",
            "--input", input.to_str().loc("non UTF-8 path")?,
            "--output-dir", output.to_str().loc("non UTF-8 path")?,
            "--loci", "0-1",
        ])?;
        cli.serialize()?;

        let serialized = std::fs::read_dir(&output)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(serialized.len(), 1);
        assert!(serialized[0].to_string_lossy().ends_with("-summary.yaml"));

        let restored = Cli::deserialize(&serialized[0])?;
        let Commands::Summary{common} = restored.commands else {
            panic!("Expected a summary command");
        };
        assert_eq!(common.input, input);
        assert_eq!(common.parse_loci()?, Some(vec![0, 1]));
        Ok(())
    }
}
