//! Integration tests for `curvegate stats`

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, text).expect("write fixture");
}

#[test]
fn stats_from_historical_runs() {
    let dir = tempdir().expect("temp dir");
    let root = dir.path();
    write(&root.join("baselines/BAR/bar1.answ"), "# ke\n0 100\n");
    write(&root.join("baselines/BAR/run1/bar1.answ"), "# ke\n0 1\n");
    write(&root.join("baselines/BAR/run2/bar1.answ"), "# ke\n0 3\n");

    Command::new(assert_cmd::cargo::cargo_bin!("curvegate"))
        .args(["stats", "--suite", "BAR", "--test", "bar1", "--print"])
        .arg("--baseline-dir")
        .arg(root.join("baselines"))
        .arg("--output-dir")
        .arg(root.join("runs"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ke:0.0e+00,max=3"))
        .stderr(predicate::str::contains("2 historical run(s)"));

    let written = fs::read_to_string(root.join("runs/BAR/bar1/bar1.stats")).expect("stats file");
    assert!(written.contains("mean=2"));
}

#[test]
fn no_history_is_a_tool_error() {
    let dir = tempdir().expect("temp dir");

    Command::new(assert_cmd::cargo::cargo_bin!("curvegate"))
        .args(["stats", "--suite", "BAR", "--test", "bar1"])
        .arg("--baseline-dir")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no historical baseline runs"));
}
