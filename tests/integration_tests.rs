//! Integration tests for the qms CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a qms command with a fixed author
fn qms() -> Command {
    let mut cmd = Command::cargo_bin("qms").unwrap();
    cmd.env("QMS_AUTHOR", "Test Inspector")
        .env_remove("QMS_PROJECT")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    qms().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Run a command in the project and return stdout
fn run_ok(tmp: &TempDir, args: &[&str]) -> String {
    let output = qms().current_dir(tmp.path()).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "qms {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn create_rnc(tmp: &TempDir, title: &str) -> String {
    run_ok(tmp, &["rnc", "new", "-t", title, "-f", "id"]).trim().to_string()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    qms()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rnc"))
        .stdout(predicate::str::contains("tol"));
}

#[test]
fn test_version_displays() {
    qms()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("qms"));
}

#[test]
fn test_outside_project_fails() {
    let tmp = TempDir::new().unwrap();
    qms()
        .current_dir(tmp.path())
        .args(["rnc", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a QMS project"));
}

#[test]
fn test_completions_bash() {
    qms()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("qms"));
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_structure() {
    let tmp = TempDir::new().unwrap();
    qms()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized QMS project"));

    assert!(tmp.path().join(".qms/config.yaml").is_file());
    assert!(tmp.path().join("quality/rncs").is_dir());
    assert!(tmp.path().join("quality/calibrations").is_dir());
    assert!(tmp.path().join("quality/inspections").is_dir());
    assert!(tmp.path().join("sales/quotes").is_dir());
    assert!(tmp.path().join("sales/orders").is_dir());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();
    qms()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_project_flag_from_elsewhere() {
    let tmp = setup_test_project();
    let other = TempDir::new().unwrap();
    qms()
        .current_dir(other.path())
        .args(["--project", tmp.path().to_str().unwrap(), "seq", "next", "rnc"])
        .assert()
        .success()
        .stdout("RNC-0001\n");
}

// ============================================================================
// Numbering Tests
// ============================================================================

#[test]
fn test_rnc_numbers_are_sequential() {
    let tmp = setup_test_project();
    qms()
        .current_dir(tmp.path())
        .args(["rnc", "new", "-t", "Bore oversize"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RNC-0001"));
    qms()
        .current_dir(tmp.path())
        .args(["rnc", "new", "-t", "Weld porosity", "-S", "major"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RNC-0002"));

    let list = run_ok(&tmp, &["rnc", "list"]);
    assert!(list.contains("RNC-0001"));
    assert!(list.contains("RNC-0002"));
    assert!(list.contains("Weld porosity"));

    assert_eq!(run_ok(&tmp, &["rnc", "list", "--count"]).trim(), "2");
    assert_eq!(
        run_ok(&tmp, &["rnc", "list", "-S", "major", "--count"]).trim(),
        "1"
    );
}

#[test]
fn test_seq_next_does_not_write() {
    let tmp = setup_test_project();
    assert_eq!(run_ok(&tmp, &["seq", "next", "rnc"]).trim(), "RNC-0001");
    assert_eq!(run_ok(&tmp, &["seq", "next", "rnc"]).trim(), "RNC-0001");

    create_rnc(&tmp, "Scratch on flange face");
    assert_eq!(run_ok(&tmp, &["seq", "next", "rnc"]).trim(), "RNC-0002");
}

#[test]
fn test_seq_next_lesson_year() {
    let tmp = setup_test_project();
    assert_eq!(
        run_ok(&tmp, &["seq", "next", "lesson", "--year", "2024"]).trim(),
        "LA-2024-001"
    );
}

#[test]
fn test_seq_honours_configured_floor() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join(".qms/config.yaml"),
        "numbering:\n  quote:\n    floor: 1000\n",
    )
    .unwrap();
    assert_eq!(run_ok(&tmp, &["seq", "next", "quote"]).trim(), "ORC-1001");
}

#[test]
fn test_seq_list_shows_all_families() {
    let tmp = setup_test_project();
    let out = run_ok(&tmp, &["seq", "list", "-f", "tsv"]);
    assert!(out.contains("rnc\tRNC-####\tRNC-0001"));
    assert!(out.contains("ndt\tEND-####\tEND-0001"));
    assert!(out.contains("lesson\tLA-YYYY-###"));
}

#[test]
fn test_number_gap_follows_highest() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "First");
    let yaml = run_ok(&tmp, &["rnc", "show", "RNC-0001", "-f", "yaml"]);
    // Simulate a hand-edited record far ahead of the others
    let path = fs::read_dir(tmp.path().join("quality/rncs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.to_string_lossy().ends_with(".qms.yaml"))
        .unwrap();
    fs::write(&path, yaml.replace("RNC-0001", "RNC-0041")).unwrap();

    assert_eq!(run_ok(&tmp, &["seq", "next", "rnc"]).trim(), "RNC-0042");
}

// ============================================================================
// RNC Tests
// ============================================================================

#[test]
fn test_rnc_show_by_number_and_short_id() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "Wrong heat treatment");

    qms()
        .current_dir(tmp.path())
        .args(["rnc", "show", "RNC-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrong heat treatment"));

    qms()
        .current_dir(tmp.path())
        .args(["rnc", "show", "RNC@1", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"number\": \"RNC-0001\""));
}

#[test]
fn test_rnc_show_unknown_fails() {
    let tmp = setup_test_project();
    qms()
        .current_dir(tmp.path())
        .args(["rnc", "show", "RNC-0099"])
        .assert()
        .failure();
}

#[test]
fn test_rnc_close() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "Paint thickness low");

    qms()
        .current_dir(tmp.path())
        .args([
            "rnc",
            "close",
            "RNC-0001",
            "-d",
            "rework",
            "-j",
            "Repainted and re-measured",
        ])
        .assert()
        .success();

    assert_eq!(
        run_ok(&tmp, &["rnc", "list", "-s", "closed", "--count"]).trim(),
        "1"
    );
    assert_eq!(
        run_ok(&tmp, &["rnc", "list", "-s", "active", "--count"]).trim(),
        "0"
    );

    // Closing twice is refused
    qms()
        .current_dir(tmp.path())
        .args(["rnc", "close", "RNC-0001"])
        .assert()
        .failure();
}

#[test]
fn test_rnc_list_csv() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "Burr, sharp edge");
    let out = run_ok(&tmp, &["rnc", "list", "-f", "csv"]);
    assert!(out.contains("\"Burr, sharp edge\""));
}

// ============================================================================
// Tolerance Tests
// ============================================================================

#[test]
fn test_tol_eval_conforming() {
    qms()
        .args(["tol", "eval", "--nominal", "10", "--measured", "10.1", "+0.1", "-0.05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[9.95, 10.1]"))
        .stdout(predicate::str::contains("Conforme"))
        .stdout(predicate::str::contains("Não").not());
}

#[test]
fn test_tol_eval_nonconforming_still_exits_zero() {
    qms()
        .args(["tol", "eval", "-n", "10", "-m", "9.94", "+0.1", "-0.05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Não Conforme"));
}

#[test]
fn test_tol_eval_symmetric_and_json() {
    let out = qms()
        .args(["tol", "eval", "-n", "25", "-m", "25.2", "0.2", "-f", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["lower"], 24.8);
    assert_eq!(json["upper"], 25.2);
    assert_eq!(json["verdict"], "Conforme");
}

#[test]
fn test_tol_eval_without_tokens_is_exact() {
    qms()
        .args(["tol", "eval", "-n", "5", "-m", "5", "-f", "id"])
        .assert()
        .success()
        .stdout("Conforme\n");
    qms()
        .args(["tol", "eval", "-n", "5", "-m", "5.001", "-f", "id"])
        .assert()
        .success()
        .stdout("Não Conforme\n");
}

#[test]
fn test_tol_eval_garbage_token_adds_nothing() {
    qms()
        .args(["tol", "eval", "-n", "5", "-m", "5.1", "abc", "-f", "id"])
        .assert()
        .success()
        .stdout("Não Conforme\n");
}

#[test]
fn test_tol_eval_rejects_non_finite() {
    qms()
        .args(["tol", "eval", "-n", "NaN", "-m", "5"])
        .assert()
        .failure();
    qms()
        .args(["tol", "eval", "-n", "5", "-m", "inf"])
        .assert()
        .failure();
}

#[test]
fn test_tol_eval_too_many_tokens() {
    qms()
        .args(["tol", "eval", "-n", "5", "-m", "5", "+0.1", "-0.1", "0.2"])
        .assert()
        .failure();
}

// ============================================================================
// Inspection Tests
// ============================================================================

#[test]
fn test_insp_measure_and_verdict() {
    let tmp = setup_test_project();
    qms()
        .current_dir(tmp.path())
        .args(["insp", "new", "-D", "dimensional", "-t", "Shaft first article"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DIM-0001"));

    qms()
        .current_dir(tmp.path())
        .args([
            "insp", "measure", "DIM-0001", "-c", "Ø40 h7", "-n", "40", "-t", "+0", "-t", "-0.025",
            "-m", "39.99",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Conforme"));

    qms()
        .current_dir(tmp.path())
        .args([
            "insp", "measure", "DIM-0001", "-c", "Length", "-n", "120", "-t", "0.1", "-m", "120.3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Não Conforme"));

    qms()
        .current_dir(tmp.path())
        .args(["insp", "show", "DIM-0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Result: Não Conforme"));

    assert_eq!(
        run_ok(&tmp, &["insp", "list", "--nonconforming", "--count"]).trim(),
        "1"
    );
}

#[test]
fn test_insp_ndt_disciplines_share_sequence() {
    let tmp = setup_test_project();
    let welding = run_ok(&tmp, &["insp", "new", "-D", "welding", "-t", "Butt weld W1"]);
    assert!(welding.contains("END-0001"));
    let lp = run_ok(&tmp, &["insp", "new", "-D", "liquid-penetrant", "-t", "Weld W1 LP"]);
    assert!(lp.contains("END-0002"));
    let paint = run_ok(&tmp, &["insp", "new", "-D", "painting", "-t", "Skid coating"]);
    assert!(paint.contains("PIN-0001"));
}

#[test]
fn test_insp_measure_from_csv() {
    let tmp = setup_test_project();
    run_ok(&tmp, &["insp", "new", "-D", "dimensional", "-t", "Bracket"]);

    let csv_path = tmp.path().join("measurements.csv");
    fs::write(
        &csv_path,
        "characteristic,nominal,tolerance_a,tolerance_b,measured,unit\n\
         Hole A,12,+0.1,-0,12.05,mm\n\
         Hole B,12,0.05,,12.2,mm\n",
    )
    .unwrap();

    qms()
        .current_dir(tmp.path())
        .args(["insp", "measure", "DIM-0001", "--csv", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 2 measurement(s)"));

    let json = run_ok(&tmp, &["insp", "show", "DIM-0001", "-f", "json"]);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let measurements = value["measurements"].as_array().unwrap();
    assert_eq!(measurements.len(), 2);
    assert_eq!(measurements[0]["result"], "Conforme");
    assert_eq!(measurements[1]["result"], "Não Conforme");
}

#[test]
fn test_insp_csv_missing_column_fails() {
    let tmp = setup_test_project();
    run_ok(&tmp, &["insp", "new", "-D", "dimensional", "-t", "Bracket"]);
    let csv_path = tmp.path().join("bad.csv");
    fs::write(&csv_path, "characteristic,measured\nHole A,12\n").unwrap();

    qms()
        .current_dir(tmp.path())
        .args(["insp", "measure", "DIM-0001", "--csv", csv_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nominal"));
}

#[cfg(unix)]
#[test]
fn test_insp_edit_rejects_nan_measurement() {
    let tmp = setup_test_project();
    run_ok(&tmp, &["insp", "new", "-D", "dimensional", "-t", "Shaft"]);
    run_ok(
        &tmp,
        &["insp", "measure", "DIM-0001", "-c", "Ø40", "-n", "40", "-t", "0.1", "-m", "39.99"],
    );

    // The "editor" swaps the measured value for a YAML NaN
    qms()
        .current_dir(tmp.path())
        .env("EDITOR", "sed -i -e s/39.99$/.nan/")
        .args(["insp", "edit", "DIM-0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a finite number"));
}

// ============================================================================
// Calibration Tests
// ============================================================================

#[test]
fn test_cal_due_listing() {
    let tmp = setup_test_project();
    run_ok(
        &tmp,
        &["cal", "new", "-T", "PAQ-01", "-t", "Caliper 150mm", "--last", "2024-01-10", "--interval", "12"],
    );
    run_ok(
        &tmp,
        &["cal", "new", "-T", "MIC-02", "-t", "Micrometer 0-25", "--last", "2024-11-20", "--interval", "12"],
    );

    // PAQ-01 is due 2025-01-10, MIC-02 is due 2025-11-20
    let due = run_ok(&tmp, &["cal", "list", "--due", "--on", "2025-01-20"]);
    assert!(due.contains("PAQ-01"));
    assert!(due.contains("overdue"));
    assert!(!due.contains("MIC-02"));

    assert_eq!(
        run_ok(&tmp, &["cal", "list", "--due", "--on", "2024-06-01", "--count"]).trim(),
        "0"
    );
}

#[test]
fn test_cal_record_restarts_cycle() {
    let tmp = setup_test_project();
    run_ok(
        &tmp,
        &["cal", "new", "-T", "PAQ-01", "-t", "Caliper", "--last", "2024-01-10"],
    );
    run_ok(
        &tmp,
        &["cal", "record", "CAL-0001", "--date", "2025-01-08", "-c", "RBC-2025-0117"],
    );

    let json = run_ok(&tmp, &["cal", "show", "CAL-0001", "-f", "json"]);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["last_calibration"], "2025-01-08");
    assert_eq!(value["history"].as_array().unwrap().len(), 1);

    // Backdating is refused
    qms()
        .current_dir(tmp.path())
        .args(["cal", "record", "CAL-0001", "--date", "2024-12-01"])
        .assert()
        .failure();
}

#[test]
fn test_cal_interval_bounds() {
    let tmp = setup_test_project();
    qms()
        .current_dir(tmp.path())
        .args(["cal", "new", "-T", "X", "-t", "X", "--last", "2025-01-01", "--interval", "0"])
        .assert()
        .failure();
}

// ============================================================================
// Lessons and Action Plans
// ============================================================================

#[test]
fn test_lesson_numbering_by_year() {
    let tmp = setup_test_project();
    let out = run_ok(
        &tmp,
        &["lesson", "new", "-t", "Check heat certs at receiving", "--date", "2024-05-02"],
    );
    assert!(out.contains("LA-2024-001"));
    let out = run_ok(
        &tmp,
        &["lesson", "new", "-t", "Mask threads before painting", "--date", "2024-09-12"],
    );
    assert!(out.contains("LA-2024-002"));
    let out = run_ok(
        &tmp,
        &["lesson", "new", "-t", "Calibrate torque wrenches", "--date", "2025-02-01"],
    );
    assert!(out.contains("LA-2025-001"));

    assert_eq!(
        run_ok(&tmp, &["lesson", "list", "--year", "2024", "--count"]).trim(),
        "2"
    );
    assert_eq!(
        run_ok(&tmp, &["lesson", "list", "--search", "painting", "--count"]).trim(),
        "1"
    );
}

#[test]
fn test_plan_lifecycle_linked_to_rnc() {
    let tmp = setup_test_project();
    create_rnc(&tmp, "Bore drift on lathe 3");

    let out = run_ok(
        &tmp,
        &["plan", "new", "-t", "Stop bore drift", "--rnc", "RNC-0001", "-c", "Worn spindle bearing"],
    );
    assert!(out.contains("PA-0001"));

    let rnc = run_ok(&tmp, &["rnc", "show", "RNC-0001", "-f", "json"]);
    let rnc: serde_json::Value = serde_json::from_str(&rnc).unwrap();
    assert_eq!(rnc["status"], "action");

    run_ok(&tmp, &["plan", "action", "PA-0001", "-w", "Replace bearing", "--who", "Maintenance"]);
    run_ok(&tmp, &["plan", "action", "PA-0001", "-w", "Add weekly runout check"]);

    // Verification before completion is refused
    qms()
        .current_dir(tmp.path())
        .args(["plan", "verify", "PA-0001"])
        .assert()
        .failure();

    run_ok(&tmp, &["plan", "done", "PA-0001", "1", "--evidence", "WO-778"]);
    run_ok(&tmp, &["plan", "done", "PA-0001", "2"]);

    let plan = run_ok(&tmp, &["plan", "show", "PA-0001", "-f", "json"]);
    let plan: serde_json::Value = serde_json::from_str(&plan).unwrap();
    assert_eq!(plan["status"], "completed");
    assert_eq!(plan["origin_rnc"], "RNC-0001");

    run_ok(&tmp, &["plan", "verify", "PA-0001"]);
    assert_eq!(
        run_ok(&tmp, &["plan", "list", "-s", "verified", "--count"]).trim(),
        "1"
    );
}

#[test]
fn test_plan_overdue_filter() {
    let tmp = setup_test_project();
    run_ok(&tmp, &["plan", "new", "-t", "Late plan"]);
    run_ok(&tmp, &["plan", "action", "PA-0001", "-w", "Overdue task", "-d", "2020-01-01"]);
    run_ok(&tmp, &["plan", "new", "-t", "Fine plan"]);

    assert_eq!(
        run_ok(&tmp, &["plan", "list", "--overdue", "--count"]).trim(),
        "1"
    );
}

// ============================================================================
// Quotes and Orders
// ============================================================================

#[test]
fn test_quote_convert_to_order() {
    let tmp = setup_test_project();
    let out = run_ok(
        &tmp,
        &["quote", "new", "-t", "Flanges for pump skid", "-c", "Acme", "--date", "2025-03-10"],
    );
    assert!(out.contains("ORC-0001"));

    run_ok(
        &tmp,
        &["quote", "item", "ORC-0001", "-d", "Flange 6in 150#", "--qty", "4", "-p", "250", "-l", "10"],
    );
    run_ok(
        &tmp,
        &["quote", "item", "ORC-0001", "-d", "Gasket kit", "--qty", "4", "-p", "37.5", "-l", "5"],
    );
    run_ok(&tmp, &["quote", "status", "ORC-0001", "approved"]);

    qms()
        .current_dir(tmp.path())
        .args(["quote", "convert", "ORC-0001", "--date", "2025-03-20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PED-0001"));

    let order = run_ok(&tmp, &["order", "show", "PED-0001", "-f", "json"]);
    let order: serde_json::Value = serde_json::from_str(&order).unwrap();
    assert_eq!(order["quote_number"], "ORC-0001");
    assert_eq!(order["promised_date"], "2025-04-04");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    let quote = run_ok(&tmp, &["quote", "show", "ORC-0001", "-f", "json"]);
    let quote: serde_json::Value = serde_json::from_str(&quote).unwrap();
    assert_eq!(quote["status"], "converted");

    // A second conversion is refused and no order is created
    qms()
        .current_dir(tmp.path())
        .args(["quote", "convert", "ORC-0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already converted"));
    assert_eq!(run_ok(&tmp, &["order", "list", "--count"]).trim(), "1");
}

#[test]
fn test_rejected_quote_cannot_convert() {
    let tmp = setup_test_project();
    run_ok(&tmp, &["quote", "new", "-t", "Shafts", "-c", "Sul"]);
    run_ok(&tmp, &["quote", "item", "ORC-0001", "-d", "Shaft", "--qty", "1", "-p", "80"]);
    run_ok(&tmp, &["quote", "status", "ORC-0001", "rejected"]);

    qms()
        .current_dir(tmp.path())
        .args(["quote", "convert", "ORC-0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rejected"));
}

#[test]
fn test_empty_quote_cannot_convert() {
    let tmp = setup_test_project();
    run_ok(&tmp, &["quote", "new", "-t", "Nothing yet", "-c", "Sul"]);
    qms()
        .current_dir(tmp.path())
        .args(["quote", "convert", "ORC-0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no items"));
}

#[test]
fn test_order_advances_forward_only() {
    let tmp = setup_test_project();
    run_ok(&tmp, &["quote", "new", "-t", "Brackets", "-c", "Sul"]);
    run_ok(&tmp, &["quote", "item", "ORC-0001", "-d", "Bracket", "--qty", "10", "-p", "12"]);
    run_ok(&tmp, &["quote", "convert", "ORC-0001"]);

    run_ok(&tmp, &["order", "advance", "PED-0001", "in-production"]);
    run_ok(&tmp, &["order", "advance", "PED-0001", "delivered", "--date", "2025-05-02"]);
    qms()
        .current_dir(tmp.path())
        .args(["order", "advance", "PED-0001", "open"])
        .assert()
        .failure();

    assert_eq!(
        run_ok(&tmp, &["order", "list", "-s", "delivered", "--count"]).trim(),
        "1"
    );
}
