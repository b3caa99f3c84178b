mod common;
use common::{read_table, Fixture, PopgenRunner, TWO_GROUPS_DATASET};
#[cfg(test)] use pretty_assertions::assert_eq;

fn parse_f64(field: &str) -> f64 {
    field.parse::<f64>().unwrap_or_else(|_| panic!("Invalid float {field}"))
}

#[test]
fn summary_two_groups() -> anyhow::Result<()> {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    PopgenRunner::new(&fixture, "summary").run()?;

    let frequencies = read_table(&fixture.output_file("summary-frequencies.tsv"));
    let want = [
        ["Loc-A", "pop-A", "120", "0.75000"],
        ["Loc-A", "pop-A", "124", "0.25000"],
        ["Loc-A", "pop-B", "120", "0.25000"],
        ["Loc-A", "pop-B", "124", "0.75000"],
        ["Loc-B", "pop-A", "A",   "1.00000"],
        ["Loc-B", "pop-B", "A",   "1.00000"],
    ];
    assert_eq!(frequencies, want.iter().map(|row| row.map(String::from).to_vec()).collect::<Vec<_>>());

    let diversity = read_table(&fixture.output_file("summary-diversity.tsv"));
    assert_eq!(diversity.len(), 4);
    assert_eq!(diversity[0], vec!["Loc-A", "pop-A", "2", "0.50000", "0.37500", "0.50000"]);
    // ---- Single homozygous genotype: no heterozygote to average over.
    assert_eq!(diversity[2], vec!["Loc-B", "pop-A", "1", "NaN", "0.00000", "0.00000"]);
    Ok(())
}

#[test]
fn fstats_two_groups() -> anyhow::Result<()> {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    PopgenRunner::new(&fixture, "fstats")
        .arg("--permutations", &["100"])
        .arg("--seed", &["42"])
        .arg("--threads", &["2"])
        .run()?;

    let multilocus = read_table(&fixture.output_file("fstats-multilocus.tsv"));
    let estimators: Vec<&str> = multilocus.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(estimators, vec!["WC-Fst", "WC-Fis", "RH-Fst"]);

    // ---- Monomorphic Loc-B does not contribute.
    assert!((parse_f64(&multilocus[0][1]) - 0.2).abs() < 1e-5);
    assert!(parse_f64(&multilocus[1][1]).abs() < 1e-5);

    for row in &multilocus[0..2] {
        let (greater, lesser) = (parse_f64(&row[2]), parse_f64(&row[3]));
        assert!((0.0..=1.0).contains(&greater));
        assert!((0.0..=1.0).contains(&lesser));
        assert!(greater + lesser <= 1.0 + 1e-9);
    }
    assert_eq!(&multilocus[2][2..], &["NA", "NA", "NA"]);

    let alleles = read_table(&fixture.output_file("fstats-alleles.tsv"));
    let loc_a: Vec<&Vec<String>> = alleles.iter().filter(|row| row[0] == "Loc-A").collect();
    assert_eq!(loc_a.len(), 2);
    for row in loc_a {
        assert!((parse_f64(&row[2]) - 0.2).abs() < 1e-5, "Fit: {row:?}");
        assert!((parse_f64(&row[3]) - 0.2).abs() < 1e-5, "Fst: {row:?}");
        assert!(parse_f64(&row[4]).abs() < 1e-5, "Fis: {row:?}");
    }
    Ok(())
}

#[test]
fn fstats_are_reproducible() -> anyhow::Result<()> {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    let runner = PopgenRunner::new(&fixture, "fstats")
        .arg("--permutations", &["50"])
        .arg("--seed", &["7"])
        .overwrite();

    runner.run()?;
    let first = read_table(&fixture.output_file("fstats-multilocus.tsv"));
    runner.run()?;
    let second = read_table(&fixture.output_file("fstats-multilocus.tsv"));
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn fstats_single_group() -> anyhow::Result<()> {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    PopgenRunner::new(&fixture, "fstats")
        .arg("--groups", &["1"])
        .arg("--permutations", &["20"])
        .arg("--seed", &["3"])
        .run()?;

    let multilocus = read_table(&fixture.output_file("fstats-multilocus.tsv"));
    let estimators: Vec<&str> = multilocus.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(estimators, vec!["WC-Fst", "WC-Fis", "RH-Fst"]);

    // ---- Fst requires two groups. Fis is still estimated and tested within pop-A.
    assert_eq!(&multilocus[0][1..], &["NaN", "NA", "NA", "NA"]);
    assert_eq!(&multilocus[2][1..], &["NaN", "NA", "NA", "NA"]);
    assert!(parse_f64(&multilocus[1][1]).abs() < 1e-5);
    assert!((0.0..=1.0).contains(&parse_f64(&multilocus[1][2])));
    assert_eq!(multilocus[1][4], "0");

    let alleles = read_table(&fixture.output_file("fstats-alleles.tsv"));
    assert_eq!(alleles.len(), 2);
    for row in alleles {
        assert_eq!(row[0], "Loc-A");
        assert_eq!(row[3], "NaN");
        assert!(parse_f64(&row[4]).abs() < 1e-5, "Fis: {row:?}");
    }
    Ok(())
}

#[test]
fn distance_nei72() -> anyhow::Result<()> {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    PopgenRunner::new(&fixture, "distance")
        .arg("--method", &["nei72"])
        .arg("--loci", &["0"])
        .run()?;

    let matrix = std::fs::read_to_string(fixture.output_file("distance-nei72.dist"))?;
    assert_eq!(matrix, "2\npop-A      0.000000 0.510826\npop-B      0.510826 0.000000\n");
    Ok(())
}

#[test]
fn overwrite_disallowed() -> anyhow::Result<()> {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    let runner = PopgenRunner::new(&fixture, "summary");
    runner.run()?;
    let err = runner.run().expect_err("Results already exist");
    assert!(err.chain().any(|cause| cause.to_string().contains("--overwrite")), "{err:?}");
    PopgenRunner::new(&fixture, "summary").overwrite().run()
}

#[test]
fn invalid_selection() {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    assert!(PopgenRunner::new(&fixture, "summary").arg("--loci", &["0-2"]).run().is_err());
    assert!(PopgenRunner::new(&fixture, "summary").arg("--groups", &["1", "7"]).run().is_err());
}

#[test]
fn from_yaml() -> anyhow::Result<()> {
    let fixture = Fixture::dataset(TWO_GROUPS_DATASET);
    let runner = PopgenRunner::new(&fixture, "distance").arg("--method", &["rousset"]).overwrite();
    let cli = runner.cli();
    cli.serialize()?;
    popgen_rs::run(cli)?;
    let want = std::fs::read_to_string(fixture.output_file("distance-rousset.dist"))?;
    std::fs::remove_file(fixture.output_file("distance-rousset.dist"))?;

    let yaml = std::fs::read_dir(fixture.output_dir())?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| path.to_string_lossy().ends_with("-distance.yaml"))
        .expect("Missing serialized arguments");

    let rerun = <parser::Cli as clap::Parser>::parse_from(["popgen-rs", "from-yaml", yaml.to_str().expect("non UTF-8 path")]);
    popgen_rs::run(rerun)?;
    assert_eq!(std::fs::read_to_string(fixture.output_file("distance-rousset.dist"))?, want);
    Ok(())
}
