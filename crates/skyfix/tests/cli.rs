use assert_cmd::Command;
use predicates::prelude::*;

fn skyfix() -> Command {
    Command::cargo_bin("skyfix").unwrap()
}

#[test]
fn help_lists_commands() {
    skyfix()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("split"))
        .stdout(predicate::str::contains("localize"));
}

#[test]
fn download_requires_a_coordinate() {
    skyfix()
        .args(["download", "--lat", "60.45"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--lon"));
}

#[test]
fn download_rejects_zoom_beyond_the_pyramid() {
    skyfix()
        .args(["download", "--lat", "60.45", "--lon", "22.27", "-z", "31"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("31"));
}

#[test]
fn split_rejects_a_file_without_georeferencing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.tif");
    std::fs::write(&path, b"not a tiff").unwrap();
    skyfix().args(["split"]).arg(&path).assert().failure();
    assert!(!dir.path().join("map.csv").exists());
}

#[test]
fn localize_without_matcher_fails() {
    let dir = tempfile::tempdir().unwrap();
    skyfix()
        .args(["localize", "--path"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingMatcher"));
}

#[test]
fn localize_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("run.json");
    std::fs::write(&config, r#"{"base_path": "/nonexistent/skyfix", "matcher_program": "true"}"#).unwrap();
    // the configured matcher is accepted; the missing basemap is what fails
    skyfix()
        .args(["localize", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingMatcher").not());
}
