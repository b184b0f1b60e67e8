use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn kad(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kad").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1").env_remove("KAD_LOG");
    cmd
}

fn init(home: &Path, policy: &str) {
    let data_dir = home.join("data");
    kad(home)
        .args(["init", "--data-dir", data_dir.to_str().unwrap(), "--policy", policy])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized kad"));
}

fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("Κωδικός Δραστηριότητας,Περιγραφή\n{body}")).unwrap();
    path
}

#[test]
fn normalize_pads_under_pad6() {
    let home = tempfile::tempdir().unwrap();
    kad(home.path())
        .args(["normalize", "10000", "--policy", "pad6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10.00.00"))
        .stdout(predicate::str::contains("Μεταποίηση"));
}

#[test]
fn normalize_keeps_eight_digits_grouped() {
    let home = tempfile::tempdir().unwrap();
    kad(home.path())
        .args(["normalize", "46421114"])
        .assert()
        .success()
        .stdout(predicate::str::contains("46.42.11.14"));
}

#[test]
fn normalize_rejects_header_text() {
    let home = tempfile::tempdir().unwrap();
    kad(home.path())
        .args(["normalize", "Κωδικός Δραστηριότητας"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("NonNumeric"))
        .stderr(predicate::str::contains("1 value(s) rejected"));
}

#[test]
fn classify_uses_default_section() {
    let home = tempfile::tempdir().unwrap();
    kad(home.path())
        .args(["classify", "99.00", "04.11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activities of extraterritorial organisations"))
        .stdout(predicate::str::contains("Manufacturing"));
}

#[test]
fn import_then_show_and_edit() {
    let home = tempfile::tempdir().unwrap();
    init(home.path(), "grouped");
    let csv = write_csv(
        home.path(),
        "kad.csv",
        "01.11,Καλλιέργεια σιτηρών\n46421114,Χονδρικό εμπόριο ενδυμάτων\nΣύνολο,3\n",
    );

    kad(home.path())
        .args(["import", csv.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted"))
        .stdout(predicate::str::contains("NonNumeric"));

    kad(home.path())
        .args(["codes", "show", "46421114"])
        .assert()
        .success()
        .stdout(predicate::str::contains("46.42.11.14"))
        .stdout(predicate::str::contains("Section:       G"));

    kad(home.path())
        .args(["codes", "update", "01.11", "--vat-rate", "13", "--popular", "true"])
        .assert()
        .success();
    kad(home.path())
        .args(["codes", "show", "01.11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VAT rate:      13%"))
        .stdout(predicate::str::contains("Popular:       yes"));

    kad(home.path())
        .args(["codes", "deactivate", "01.11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("now inactive"));
    kad(home.path())
        .args(["codes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activity codes (1)"));

    // same file again
    kad(home.path())
        .args(["import", csv.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("already been imported"));
}

#[test]
fn collisions_need_review() {
    let home = tempfile::tempdir().unwrap();
    init(home.path(), "truncate6");
    let csv = write_csv(
        home.path(),
        "kad.csv",
        "111000,Καλλιέργεια ρυζιού\n1110000,Καλλιέργεια ρυζιού σε αγρούς\n",
    );

    kad(home.path())
        .args(["import", csv.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("11.10.00 (2)"))
        .stderr(predicate::str::contains("--accept-collisions"));

    kad(home.path())
        .args(["import", csv.to_str().unwrap(), "--accept-collisions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted"));
}

#[test]
fn policy_mismatch_is_refused() {
    let home = tempfile::tempdir().unwrap();
    init(home.path(), "pad6");
    let first = write_csv(home.path(), "a.csv", "10000,Παραγωγή κρέατος\n");
    kad(home.path()).args(["import", first.to_str().unwrap()]).assert().success();

    let second = write_csv(home.path(), "b.csv", "10001,Παραγωγή πουλερικών\n");
    kad(home.path())
        .args(["import", second.to_str().unwrap(), "--policy", "grouped"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pinned").or(predicate::str::contains("policy 'pad6'")));
}

#[test]
fn dry_run_json_report() {
    let home = tempfile::tempdir().unwrap();
    init(home.path(), "grouped");
    let csv = write_csv(home.path(), "kad.csv", "0111,Σιτηρά\n0111,Σιτηρά\n011,Λάθος\n");

    let output = kad(home.path())
        .args(["import", csv.to_str().unwrap(), "--dry-run", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], 2);
    assert_eq!(report["unique_codes"], 1);
    assert_eq!(report["exact_duplicates"].as_array().unwrap().len(), 1);
    assert_eq!(report["skipped"][0]["line"], 4);
    assert_eq!(report["written"], false);

    kad(home.path())
        .args(["codes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activity codes (0)"));
}

#[test]
fn check_greek_identifiers() {
    let home = tempfile::tempdir().unwrap();
    kad(home.path())
        .args(["check", "afm", "090000045"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid AFM: 090000045"));
    kad(home.path())
        .args(["check", "afm", "090000046"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("check digit"));
    kad(home.path())
        .args(["check", "iban", "GR16 0110 1250 0000 0001 2300 695"])
        .assert()
        .success();
    kad(home.path())
        .args(["check", "vat", "EL094019245"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EL094019245"));
}

#[test]
fn status_reports_pinned_policy() {
    let home = tempfile::tempdir().unwrap();
    init(home.path(), "pad6");
    let csv = write_csv(home.path(), "kad.csv", "10000,Παραγωγή κρέατος\n");
    kad(home.path()).args(["import", csv.to_str().unwrap()]).assert().success();
    kad(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pinned to:  pad6"))
        .stdout(predicate::str::contains("Codes:      1"));
}
