use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use zip::write::SimpleFileOptions;

fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../irs990-core/testdata")
        .join(name)
}

/// The binary with its user config directory pointed at `home`.
fn irs990(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("irs990").unwrap();
    cmd.env("XDG_CONFIG_HOME", home).env("HOME", home);
    cmd
}

fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_fields_prints_header() {
    let home = tempfile::tempdir().unwrap();

    irs990(home.path())
        .args(["fields", "--csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "ein,name,returntype,taxyear,taxperiodstart,taxperiodend,contributions,",
        ));

    irs990(home.path())
        .args(["fields", "BondIssue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cusip\nissuerein\n"));
}

#[test]
fn test_fields_unknown_form_fails() {
    let home = tempfile::tempdir().unwrap();

    irs990(home.path())
        .args(["fields", "990EZ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("990EZ"));
}

#[test]
fn test_parse_writes_one_file_per_form() {
    let home = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pattern = testdata("*.xml");

    irs990(home.path())
        .arg("parse")
        .arg(pattern.to_str().unwrap())
        .args(["--forms", "990,BondIssue", "--prefix", "t", "--output-dir"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed filings:"));

    let filings = read_rows(&out.path().join("t-990.csv"));
    assert_eq!(filings.len(), 3);
    assert_eq!(filings[0].len(), 57);

    let mut eins = filings.iter().map(|r| r[0].to_string()).collect::<Vec<_>>();
    eins.sort();
    assert_eq!(eins, vec!["041234567", "041234567", "550765432"]);

    let bonds = read_rows(&out.path().join("t-BondIssue.csv"));
    assert_eq!(bonds.len(), 5);
    assert!(bonds.iter().any(|r| &r[6] == "575831AA2"));
}

#[test]
fn test_parse_json_to_stdout() {
    let home = tempfile::tempdir().unwrap();

    irs990(home.path())
        .arg("parse")
        .arg(testdata("ridgeline_2017v2.2.xml"))
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ein\": \"550765432\""))
        .stdout(predicate::str::contains("\"contributions\": \"83118\""));
}

#[test]
fn test_parse_without_matches_fails() {
    let home = tempfile::tempdir().unwrap();

    irs990(home.path())
        .args(["parse", "/nonexistent/*.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_index_over_directory_tree() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();

    let year = work.path().join("filings/2017/batch1");
    fs::create_dir_all(&year).unwrap();
    fs::copy(testdata("ridgeline_2017v2.2.xml"), year.join("201700000004_public.xml")).unwrap();
    fs::copy(testdata("malformed.xml"), year.join("201700000002_public.xml")).unwrap();

    let index = work.path().join("index.csv");
    fs::write(
        &index,
        "RETURN_ID,EIN,RETURN_TYPE,OBJECT_ID\n\
         1,550765432,990,201700000004\n\
         2,041234567,990,201700000002\n\
         3,041234568,990EZ,201700000003\n",
    )
    .unwrap();

    irs990(home.path())
        .arg("index")
        .arg(&index)
        .arg("--filings")
        .arg(work.path().join("filings"))
        .arg("--output-dir")
        .arg(work.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("201700000002"));

    let rows = read_rows(&work.path().join("out/irs990-990.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "550765432");
}

#[test]
fn test_index_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();

    irs990(home.path())
        .args(["index", "/nonexistent/index.csv", "--filings"])
        .arg(work.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read index"));
}

fn write_zip(path: &Path, members: &[(&str, &Path)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, source) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&fs::read(source).unwrap()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn test_archives_prefer_current_over_prior() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let current = work.path().join("current");
    let prior = work.path().join("prior");
    fs::create_dir_all(&current).unwrap();
    fs::create_dir_all(&prior).unwrap();

    let ridgeline = testdata("ridgeline_2017v2.2.xml");
    let harborview = testdata("harborview_2016v3.0.xml");
    write_zip(
        &current.join("2017_TEOS_XML_01A.zip"),
        &[("2017_TEOS_XML_01A/201700000004_public.xml", ridgeline.as_path())],
    );
    write_zip(
        &prior.join("2017_TEOS_XML_01A.zip"),
        &[
            ("201700000004_public.xml", harborview.as_path()),
            ("201700000001_public.xml", harborview.as_path()),
        ],
    );

    irs990(home.path())
        .arg("archives")
        .arg("--archives")
        .arg(&current)
        .arg("--prior")
        .arg(&prior)
        .args(["--forms", "990,BondIssue", "--output-dir"])
        .arg(work.path().join("out"))
        .assert()
        .success();

    let rows = read_rows(&work.path().join("out/irs990-990.csv"));
    let eins = rows.iter().map(|r| r[0].to_string()).collect::<Vec<_>>();
    assert_eq!(eins, vec!["550765432", "041234567"]);

    let bonds = read_rows(&work.path().join("out/irs990-BondIssue.csv"));
    assert_eq!(bonds.len(), 4);

    irs990(home.path())
        .arg("archives")
        .arg("--archives")
        .arg(&current)
        .arg("--prior")
        .arg(&prior)
        .args(["--limit", "1", "--prefix", "sample", "--output-dir"])
        .arg(work.path().join("out"))
        .assert()
        .success();

    assert_eq!(read_rows(&work.path().join("out/sample-990.csv")).len(), 1);
}

#[test]
fn test_config_init_set_get() {
    let home = tempfile::tempdir().unwrap();

    irs990(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    irs990(home.path())
        .args(["config", "set", "output.prefix", "nightly"])
        .assert()
        .success();

    irs990(home.path())
        .args(["config", "get", "output.prefix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nightly\""));

    irs990(home.path())
        .args(["config", "set", "output.unknown", "1"])
        .assert()
        .failure();

    irs990(home.path())
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Required forms: 990, BondIssue"))
        .stdout(predicate::str::contains("2016"));
}
