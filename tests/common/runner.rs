use clap::Parser;

use super::Fixture;

/// Build and run a `popgen-rs` command line against a [`Fixture`].
pub struct PopgenRunner<'a> {
    fixture: &'a Fixture,
    module : &'static str,
    args   : Vec<String>,
}

impl<'a> PopgenRunner<'a> {
    pub fn new(fixture: &'a Fixture, module: &'static str) -> Self {
        Self{fixture, module, args: Vec::new()}
    }

    pub fn arg(mut self, flag: &str, values: &[&str]) -> Self {
        self.args.push(flag.to_string());
        self.args.extend(values.iter().map(ToString::to_string));
        self
    }

    pub fn overwrite(self) -> Self {
        self.arg("--overwrite", &[])
    }

    pub fn cli(&self) -> parser::Cli {
        let output_dir = self.fixture.output_dir().display().to_string();
        let mut args = vec!["popgen-rs".to_string(), "-q".to_string(), self.module.to_string()];
        args.extend(["--input".to_string(), self.fixture.to_string(), "--output-dir".to_string(), output_dir]);
        args.extend(self.args.iter().cloned());
        parser::Cli::parse_from(args)
    }

    pub fn run(&self) -> anyhow::Result<()> {
        popgen_rs::run(self.cli())
    }
}

/// Read a tab-separated results file, skipping its header.
pub fn read_table(path: &std::path::Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to open {}", path.display()))
        .lines()
        .skip(1)
        .map(|line| line.split('\t').map(ToString::to_string).collect())
        .collect()
}
