mod common;

use assert_cmd::Command;
use common::{TestWorkspace, VOCABULARY_YAML, report_csv, sqlite_store};
use predicates::{prelude::PredicateBooleanExt, str::contains};
use rusqlite::Connection;

fn count(db: &std::path::Path, table: &str) -> i64 {
    let conn = Connection::open(db).expect("open db");
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })
    .expect("count rows")
}

fn lab_id(db: &std::path::Path, sample_point: &str) -> Option<String> {
    let conn = Connection::open(db).expect("open db");
    conn.query_row(
        "SELECT LabID FROM ChemistrySampleInfo WHERE SamplePtID = ?1",
        [sample_point],
        |row| row.get(0),
    )
    .expect("lab id")
}

fn import_cmd(workspace: &TestWorkspace, report: &str) -> Command {
    let report_path = workspace.write("report.csv", report);
    let config = workspace.write("vocabulary.yaml", VOCABULARY_YAML);
    let mut cmd = Command::cargo_bin("labchem-import").expect("binary exists");
    cmd.args([
        "import",
        report_path.to_str().unwrap(),
        workspace.path().join("store.db").to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    cmd
}

#[test]
fn import_writes_rows_and_prints_report() {
    let workspace = TestWorkspace::new();
    let db = workspace.path().join("store.db");
    sqlite_store(&db, &["W-1"]);
    let report = report_csv(&[["W-1", "Chloride", "", "42", "1.0", "1.0", "S100", "mg/L"]]);

    import_cmd(&workspace, &report)
        .assert()
        .success()
        .stdout(contains("Added 1 rows to database"))
        .stdout(contains("W-1\n"))
        .stdout(contains("All samples within water-quality standards"));

    assert_eq!(count(&db, "MajorChemistry"), 1);
    assert_eq!(lab_id(&db, "W-1").as_deref(), Some("S100"));
    let conn = Connection::open(&db).unwrap();
    let (analyte, value, units): (String, f64, String) = conn
        .query_row(
            "SELECT Analyte, SampleValue, Units FROM MajorChemistry",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(analyte, "CL");
    assert_eq!(value, 42.0);
    assert_eq!(units, "mg/L");
}

#[test]
fn non_unique_sample_number_fails_without_writes() {
    let workspace = TestWorkspace::new();
    let db = workspace.path().join("store.db");
    sqlite_store(&db, &["W-1A"]);
    let report = report_csv(&[
        ["W-1A", "Chloride", "", "10", "", "", "S1", "mg/L"],
        ["W-1A", "Arsenic", "A", "0.001", "", "", "S2", "mg/L"],
    ]);

    import_cmd(&workspace, &report)
        .assert()
        .failure()
        .stderr(contains("exactly one SampleNumber").and(contains("W-1A [S1, S2]")))
        .stdout(contains("Added").not());

    assert_eq!(count(&db, "MajorChemistry"), 0);
    assert_eq!(count(&db, "MinorandTraceChemistry"), 0);
    assert_eq!(lab_id(&db, "W-1A"), None);
}

#[test]
fn failed_insert_rolls_back_earlier_rows() {
    let workspace = TestWorkspace::new();
    let db = workspace.path().join("store.db");
    sqlite_store(&db, &["W-1A"]);
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            r#"CREATE TRIGGER reject_minor BEFORE INSERT ON "MinorandTraceChemistry"
               BEGIN SELECT RAISE(FAIL, 'minor chemistry is read-only'); END;"#,
        )
        .unwrap();
    }
    let report = report_csv(&[
        ["W-1A", "Chloride", "", "10", "", "", "S1", "mg/L"],
        ["W-1A", "Arsenic", "A", "0.001", "", "", "S1", "mg/L"],
    ]);

    import_cmd(&workspace, &report)
        .assert()
        .failure()
        .stderr(contains("minor chemistry is read-only"));

    assert_eq!(count(&db, "MajorChemistry"), 0);
    assert_eq!(lab_id(&db, "W-1A"), None);
}

#[test]
fn dry_run_reports_without_writing() {
    let workspace = TestWorkspace::new();
    let db = workspace.path().join("store.db");
    sqlite_store(&db, &["W-1"]);
    let report = report_csv(&[["W-1", "Chloride", "", "ND", "0.5", "2", "S100", "mg/L"]]);

    import_cmd(&workspace, &report)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("Would add 1 rows to database"));

    assert_eq!(count(&db, "MajorChemistry"), 0);
    assert_eq!(lab_id(&db, "W-1"), None);
}

#[test]
fn missing_store_is_an_error() {
    let workspace = TestWorkspace::new();
    let report = report_csv(&[["W-1", "Chloride", "", "42", "", "", "S100", "mg/L"]]);
    import_cmd(&workspace, &report)
        .assert()
        .failure()
        .stderr(contains("Opening store"));
    assert!(!workspace.path().join("store.db").exists());
}

#[test]
fn tsv_report_with_builtin_vocabulary() {
    let workspace = TestWorkspace::new();
    let db = workspace.path().join("store.db");
    sqlite_store(&db, &["NM-0001A"]);
    let report = workspace.write(
        "report.tsv",
        "SamplePointID\tParam\tTest\tReportedND\tLowerLimit\tDilution\tSampleNumber\tResults_Units\n\
         NM-0001A\tpH\t\t7.2\t\t\tL-1\tpH units\n",
    );

    Command::cargo_bin("labchem-import")
        .expect("binary exists")
        .args(["import", report.to_str().unwrap(), db.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Added 1 rows to database"));

    let conn = Connection::open(&db).unwrap();
    let (point, units): (String, String) = conn
        .query_row(
            "SELECT SamplePointID, Units FROM MajorChemistry",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(point, "NM-0001");
    assert_eq!(units, "SU");
}

#[test]
fn vocabulary_lists_categories() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "vocabulary.json",
        r#"{"categories": {"Chloride": {"analyte": "CL", "table": "major", "tests": ["X", "Y"]}}}"#,
    );
    Command::cargo_bin("labchem-import")
        .expect("binary exists")
        .args(["vocabulary", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("param").and(contains("Chloride")).and(contains("X > Y")));
}

#[test]
fn invalid_vocabulary_is_rejected() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "vocabulary.yaml",
        "categories: {}\nstandards:\n  CL: { lower: 9.0, upper: 1.0 }\n",
    );
    Command::cargo_bin("labchem-import")
        .expect("binary exists")
        .args(["vocabulary", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("lower bound"));
}
