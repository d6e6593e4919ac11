//! Integration tests for the reqtrace CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get a reqtrace command rooted at a project
fn reqtrace(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("reqtrace").unwrap();
    cmd.arg("--root")
        .arg(root)
        .env_remove("REQTRACE_MIN_COVERAGE")
        .env_remove("REQTRACE_STRICT")
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// Two stakeholder needs, three functional requirements (one untraced, 003
/// missing) and one test file
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "01-stakeholder-requirements/needs.md",
        "# Stakeholder needs\n\n## StR-001: Secure access\n\n## StR-002: Fast search\n",
    );
    write(
        root,
        "02-requirements/functional.md",
        "# Functional requirements\n\n\
         ## REQ-F-001: Login\n\nTraces to: StR-001\nVerified by: TEST-LOGIN-001\n\n\
         ## REQ-F-002: Search\n\nTraces to: StR-002\n\n\
         ## REQ-F-004: Export\n\nNothing yet.\n",
    );
    write(
        root,
        "tests/test_login.py",
        "# TEST-LOGIN-001 verifies REQ-F-001\ndef test_login():\n    pass\n",
    );
    tmp
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    Command::cargo_bin("reqtrace")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("traceability"));
}

#[test]
fn test_version_displays() {
    Command::cargo_bin("reqtrace")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reqtrace"));
}

#[test]
fn test_unknown_command_fails() {
    Command::cargo_bin("reqtrace")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

#[test]
fn test_missing_root_fails() {
    let tmp = TempDir::new().unwrap();
    reqtrace(&tmp.path().join("does-not-exist"))
        .arg("build")
        .assert()
        .failure();
}

// ============================================================================
// Build Tests
// ============================================================================

#[test]
fn test_build_json_report() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["build", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"items\""))
        .stdout(predicate::str::contains("\"duplicateDefinitionIds\": []"))
        .stdout(predicate::str::contains("\"forward_links\""))
        .stdout(predicate::str::contains("\"backward_links\""))
        .stdout(predicate::str::contains("\"generated_at\""))
        .stdout(predicate::str::contains("\"REQ-F-004\""))
        .stdout(predicate::str::contains("02-requirements/functional.md"));
}

#[test]
fn test_build_markdown_to_file() {
    let tmp = setup_test_project();
    let out = tmp.path().join("report.md");
    reqtrace(tmp.path())
        .args(["build", "--format", "md", "-o"])
        .arg(&out)
        .assert()
        .success();

    let report = fs::read_to_string(&out).unwrap();
    assert!(report.contains("# Traceability Report"));
    assert!(report.contains("## Coverage"));
    assert!(report.contains("REQ-F-004"));
}

#[test]
fn test_build_csv_lists_edges() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["build", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("from,relation,to"))
        .stdout(predicate::str::contains("REQ-F-001,traces_to,StR-001"))
        .stdout(predicate::str::contains("REQ-F-001,verified_by,TEST-LOGIN-001"));
}

#[test]
fn test_build_empty_project() {
    let tmp = TempDir::new().unwrap();
    reqtrace(tmp.path())
        .args(["build", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"items\": []"));
}

#[test]
fn test_build_with_issue_export() {
    let tmp = setup_test_project();
    write(
        tmp.path(),
        "issues.json",
        r#"[{"number": 7, "title": "REQ-NF-001: Response time", "body": "Traces to: StR-002", "html_url": "https://github.com/acme/app/issues/7"}]"#,
    );
    reqtrace(tmp.path())
        .args(["build", "--format", "csv", "--issues"])
        .arg(tmp.path().join("issues.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("REQ-NF-001,traces_to,StR-002"));
}

#[test]
fn test_build_with_invalid_issue_export_fails() {
    let tmp = setup_test_project();
    write(tmp.path(), "issues.json", "{\"not\": \"an array\"}");
    reqtrace(tmp.path())
        .args(["build", "--issues"])
        .arg(tmp.path().join("issues.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid issue export"));
}

// ============================================================================
// Check Tests
// ============================================================================

#[test]
fn test_check_passes_with_gaps_by_default() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("No duplicate definitions"))
        .stdout(predicate::str::contains("REQ-F"));
}

#[test]
fn test_check_strict_fails_on_gaps() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["check", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("numbering gap"));
}

#[test]
fn test_check_strict_from_config() {
    let tmp = setup_test_project();
    write(tmp.path(), ".reqtrace.yaml", "strict_gaps: true\n");
    reqtrace(tmp.path()).arg("check").assert().failure();
}

#[test]
fn test_check_fails_on_duplicates() {
    let tmp = setup_test_project();
    write(
        tmp.path(),
        "02-requirements/more.md",
        "## REQ-F-001: Login again\n\nTraces to: StR-001\n",
    );
    reqtrace(tmp.path())
        .args(["check", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"passed\": false"))
        .stdout(predicate::str::contains("02-requirements/more.md"))
        .stderr(predicate::str::contains("duplicate definition"));
}

// ============================================================================
// Coverage Tests
// ============================================================================

#[test]
fn test_coverage_json() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["coverage", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"requirement_to_test\""))
        .stdout(predicate::str::contains("\"coverage_pct\": 33.33"));
}

#[test]
fn test_coverage_below_minimum_fails() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["coverage", "--min", "requirement_to_test=50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("coverage below minimum"));
}

#[test]
fn test_coverage_above_minimum_passes() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["coverage", "--min", "requirement_to_test=30,requirement=60"])
        .assert()
        .success();
}

#[test]
fn test_coverage_minimum_from_config() {
    let tmp = setup_test_project();
    write(tmp.path(), ".reqtrace.yaml", "min_coverage:\n  requirement: 90\n");
    reqtrace(tmp.path()).arg("coverage").assert().failure();
}

#[test]
fn test_coverage_uncovered_ids() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["coverage", "--format", "id", "--uncovered", "requirement"])
        .assert()
        .success()
        .stdout("REQ-F-004\n");
}

#[test]
fn test_coverage_rejects_bad_threshold() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["coverage", "--min", "bogus=10"])
        .assert()
        .failure();
}

// ============================================================================
// Orphans Tests
// ============================================================================

#[test]
fn test_orphans_ids() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["orphans", "--format", "id"])
        .assert()
        .success()
        .stdout("REQ-F-004\n");
}

#[test]
fn test_orphans_type_filter() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["orphans", "--format", "id", "--type", "TEST"])
        .assert()
        .success()
        .stdout("");
}

// ============================================================================
// Links Tests
// ============================================================================

#[test]
fn test_links_for_artifact() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["links", "REQ-F-001", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"StR-001\""))
        .stdout(predicate::str::contains("\"verified_by\""));
}

#[test]
fn test_links_incoming_uses_reverse_label() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["links", "StR-001", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("incoming,traced_from,REQ-F-001"));
}

#[test]
fn test_links_relation_filter() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["links", "--format", "csv", "--relation", "verified_by"])
        .assert()
        .success()
        .stdout(predicate::str::contains("REQ-F-001,verified_by,TEST-LOGIN-001"))
        .stdout(predicate::str::contains("traces_to").not());
}

#[test]
fn test_links_unknown_id_fails() {
    let tmp = setup_test_project();
    reqtrace(tmp.path())
        .args(["links", "REQ-F-999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("REQ-F-999"));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_completions_bash() {
    Command::cargo_bin("reqtrace")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reqtrace"));
}
