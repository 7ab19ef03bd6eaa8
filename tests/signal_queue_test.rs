use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn abtrack(home: &Path, runtime: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ABTRACK").expect("binary");
    cmd.env("AUDIOBOOKS_HOME", home)
        .env("ABTRACK_RUNTIME_DIR", runtime)
        .env("ABTRACK_AUTHORITATIVE_ENABLED", "false");
    cmd
}

#[test]
fn emitted_signals_show_in_status_until_drained() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("audiobooks");
    let runtime = tmp.path().join("runtime");

    abtrack(&home, &runtime)
        .args(["signal", "converted-added"])
        .assert()
        .success();
    abtrack(&home, &runtime)
        .args(["signal", "converted-added"])
        .assert()
        .success();

    abtrack(&home, &runtime)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("signals.converted-added.pending=2"));

    abtrack(&home, &runtime)
        .args(["signal", "converted-added", "--drain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("drained=2"));

    abtrack(&home, &runtime)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("signals.converted-added.pending=0"));
}

#[test]
fn unknown_signal_kind_is_refused() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("audiobooks");
    let runtime = tmp.path().join("runtime");

    abtrack(&home, &runtime)
        .args(["signal", "reindex-everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown signal kind"));
}

#[test]
fn queue_diffs_source_scan_against_the_index() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("audiobooks");
    let runtime = tmp.path().join("runtime");

    fs::create_dir_all(home.join("source")).expect("mkdir source");
    fs::write(
        home.join("source/Children_of_Dune-B002V0QK4C.aax"),
        b"audio",
    )
    .expect("write");
    fs::write(home.join("source/fresh_item.aax"), b"audio").expect("write");

    fs::create_dir_all(home.join("state")).expect("mkdir state");
    fs::write(home.join("state/converted.index"), "B002V0QK4C\n").expect("seed index");

    abtrack(&home, &runtime)
        .arg("queue")
        .assert()
        .success()
        .stdout(predicate::str::contains("queue.total=1"))
        .stdout(predicate::str::contains("fresh item"));
}

#[test]
fn queue_json_emits_parseable_entries() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("audiobooks");
    let runtime = tmp.path().join("runtime");

    fs::create_dir_all(home.join("source")).expect("mkdir source");
    fs::write(home.join("source/fresh_item.aax"), b"audio").expect("write");

    let output = abtrack(&home, &runtime)
        .args(["queue", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let raw = String::from_utf8(output).expect("utf8");
    let entry_line = raw
        .lines()
        .find(|line| line.starts_with('{'))
        .expect("json entry line");
    let parsed: serde_json::Value = serde_json::from_str(entry_line).expect("parse entry");
    assert_eq!(parsed["item"]["status"], "pending");
    assert_eq!(parsed["item"]["title"], "fresh item");
}

#[test]
fn health_provisions_runtime_dirs_and_reports_paths() {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().join("audiobooks");
    let runtime = tmp.path().join("runtime/nested");

    abtrack(&home, &runtime)
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("runtime_dir=provisioned"))
        .stdout(predicate::str::contains("lock.index=free"));

    assert!(runtime.join("signals").exists());
    assert!(runtime.join("locks").exists());
}
