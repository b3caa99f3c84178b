use std::{fs, ops::Deref, path::{Path, PathBuf}, fmt::{self, Formatter, Display}};
use tempfile::{self, TempDir};

/// Two groups, two diploid loci. `Loc-B` is monomorphic and partially missing.
pub const TWO_GROUPS_DATASET: &str = "
loci:
  - name: Loc-A
    ploidy: diploid
    alleles: ['120', '124']
  - name: Loc-B
    ploidy: diploid
    alleles: [A]
groups:
  1: pop-A
  2: pop-B
individuals:
  - {name: a1, group: 1, genotypes: [['120', '120'], [A, A]]}
  - {name: a2, group: 1, genotypes: [['120', '124'], null]}
  - {name: b1, group: 2, genotypes: [['124', '124'], [A, A]]}
  - {name: b2, group: 2, genotypes: [['120', '124'], null]}
";

/// A YAML dataset written within a temporary directory, along with a path for results.
pub struct Fixture {
    path: PathBuf,
    output_dir: PathBuf,
    _tempdir: TempDir,
}

impl Fixture {
    pub fn dataset(content: &str) -> Self {
        let tempdir = tempfile::tempdir().expect("Failed to generate temp directory");
        let path = tempdir.path().join("dataset.yaml");
        fs::write(&path, content).expect("Failed to write dataset fixture");
        let output_dir = tempdir.path().join("popgen-test-output");
        Fixture { path, output_dir, _tempdir: tempdir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

impl Deref for Fixture {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path.deref()
    }
}

impl Display for Fixture {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.to_str().expect("Invalid path (non UTF8 characters ?)"))
    }
}
