use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_functional_inputs(dir: &Path) {
    fs::write(
        dir.join("suite.yaml"),
        r#"
suiteName: Storage
tests:
  STOR-Hot-Add:
    testparams:
      - [TC_COVERED, STOR-01]
  STOR-Never-Ran: {}
vms:
  vm1: {hvServer: HV01, os: Linux}
  spare: {hvServer: HV01, os: Linux}
"#,
    )
    .unwrap();
    fs::write(
        dir.join("log.yaml"),
        r#"
timestamp: "8/9/2020 11:00:00"
GuestOS: Linux
GuestDistro: "CentOS 8"
KernelVersion: "4.18.0"
vms:
  vm1: {hostOS: "Windows Server 2016", hvServer: HV03, TestLocation: Lab}
tests:
  STOR-Hot-Add: [vm1, Success]
"#,
    )
    .unwrap();
}

#[test]
fn test_dry_run_writes_records() {
    let dir = TempDir::new().unwrap();
    write_functional_inputs(dir.path());
    let out = dir.path().join("records.json");

    let mut cmd = Command::cargo_bin("lisa-parser").unwrap();
    cmd.current_dir(dir.path())
        .arg("ingest")
        .arg("--suite")
        .arg("suite.yaml")
        .arg("--log")
        .arg("log.yaml")
        .arg("--dry-run")
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let records: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["TestCaseName"], "STOR-Hot-Add");
    assert_eq!(records[0]["HostName"], "HV03");
    assert_eq!(records[0]["TestDate"], "202089");
    assert!(!dir.path().join("lisa.db").exists());
}

#[test]
fn test_ingest_inserts_into_database() {
    let dir = TempDir::new().unwrap();
    write_functional_inputs(dir.path());
    let db = dir.path().join("results.db");

    let mut cmd = Command::cargo_bin("lisa-parser").unwrap();
    cmd.current_dir(dir.path())
        .args(["ingest", "--suite", "suite.yaml", "--log", "log.yaml", "--init-schema"])
        .arg("--db")
        .arg(&db)
        .assert()
        .success();

    let conn = rusqlite::Connection::open(&db).unwrap();
    let (name, result): (String, String) = conn
        .query_row("SELECT TestCaseName, TestResult FROM TestResults", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(name, "STOR-Hot-Add");
    assert_eq!(result, "Success");
}

#[test]
fn test_perf_ingest_uses_family_table() {
    let dir = TempDir::new().unwrap();
    let perf = dir.path().join("perf");
    fs::create_dir(&perf).unwrap();
    fs::write(
        dir.path().join("suite.yaml"),
        "suiteName: latency\ntests:\n  TCP-Lat: {}\nvms:\n  vm1: {hvServer: HV01, os: Linux}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("log.yaml"),
        "timestamp: '1/2/2022 03:04:05'\ntests:\n  TCP-Lat: [vm1, Success]\n",
    )
    .unwrap();
    fs::write(
        perf.join("latency.jsonl"),
        concat!(
            r#"{"IPVersion": "IPv4", "ProtocolType": "TCP", "MinLatency_us": 10, "#,
            r#""AverageLatency_us": 20.5, "MaxLatency_us": 90, "#,
            r#""Latency95Percentile_us": 30, "Latency99Percentile_us": 45}"#,
            "\n"
        ),
    )
    .unwrap();
    fs::write(dir.path().join("lisa.yaml"), "configVersion: 1\nhost_by: CI-01\n").unwrap();

    let mut cmd = Command::cargo_bin("lisa-parser").unwrap();
    cmd.current_dir(dir.path())
        .args([
            "ingest", "--suite", "suite.yaml", "--log", "log.yaml", "--perf-dir", "perf",
            "--init-schema",
        ])
        .assert()
        .success();

    let conn = rusqlite::Connection::open(dir.path().join("lisa.db")).unwrap();
    let (name, host_by, path, min): (String, String, String, f64) = conn
        .query_row(
            "SELECT TestCaseName, HostBy, DataPath, MinLatency_us FROM Perf_Network_Latency",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(name, "TCP-Lat");
    assert_eq!(host_by, "CI-01");
    assert_eq!(path, "Synthetic");
    assert_eq!(min, 10.0);
}

#[test]
fn test_undeclared_vm_fails_ingest() {
    let dir = TempDir::new().unwrap();
    write_functional_inputs(dir.path());
    fs::write(
        dir.path().join("log.yaml"),
        "timestamp: '8/9/2020 11:00:00'
vms:
  ghost: {hostOS: X, hvServer: Y, TestLocation: Z}
",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("lisa-parser").unwrap();
    cmd.current_dir(dir.path())
        .args(["ingest", "--suite", "suite.yaml", "--log", "log.yaml", "--dry-run"])
        .assert()
        .code(1)
        .stderr(contains("ghost"));
}

#[test]
fn test_bad_config_version_is_config_error() {
    let dir = TempDir::new().unwrap();
    write_functional_inputs(dir.path());
    fs::write(dir.path().join("lisa.yaml"), "configVersion: 7\n").unwrap();

    let mut cmd = Command::cargo_bin("lisa-parser").unwrap();
    cmd.current_dir(dir.path())
        .args(["ingest", "--suite", "suite.yaml", "--log", "log.yaml", "--dry-run"])
        .assert()
        .code(2)
        .stderr(contains("unsupported config version 7"));
}
