#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use labchem_import::{
    data::Value,
    io_utils::ReportSheet,
    store::{SAMPLE_INFO_TABLE, Store, memory::MemoryStore},
    vocabulary::Vocabulary,
};
use rusqlite::{Connection, params};
use tempfile::{TempDir, tempdir};

pub const HEADER: [&str; 8] = [
    "SamplePointID",
    "Param",
    "Test",
    "ReportedND",
    "LowerLimit",
    "Dilution",
    "SampleNumber",
    "Results_Units",
];

pub const VOCABULARY_YAML: &str = r"
not_detected_marker: ND
categories:
  Chloride:
    analyte: CL
    table: major
    method: EPA 300.0
  Arsenic:
    analyte: As
    table: minor
    tests: [A, B]
standards:
  As: { lower: 0.0, upper: 0.01 }
  CL: { lower: 0.0, upper: 250.0 }
";

pub const DESTINATION_SCHEMA: &str = r#"
CREATE TABLE "ChemistrySampleInfo" (
  "SamplePtID" TEXT PRIMARY KEY,
  "SamplePointID" TEXT,
  "SamplePointGUID" TEXT,
  "LabID" TEXT
);
CREATE TABLE "MajorChemistry" (
  "ID" INTEGER PRIMARY KEY AUTOINCREMENT,
  "SamplePtID" TEXT NOT NULL,
  "SamplePointID" TEXT,
  "SamplePointGUID" TEXT,
  "Analyte" TEXT,
  "AnalysisMethod" TEXT,
  "SampleValue" REAL,
  "Symbol" TEXT,
  "Units" TEXT
);
CREATE TABLE "MinorandTraceChemistry" (
  "ID" INTEGER PRIMARY KEY AUTOINCREMENT,
  "SamplePtID" TEXT NOT NULL,
  "SamplePointID" TEXT,
  "SamplePointGUID" TEXT,
  "Analyte" TEXT,
  "AnalysisMethod" TEXT,
  "SampleValue" REAL,
  "Symbol" TEXT,
  "Units" TEXT
);
"#;

pub fn vocabulary() -> Vocabulary {
    Vocabulary::from_yaml_str(VOCABULARY_YAML).expect("test vocabulary")
}

pub fn guid(n: usize) -> String {
    format!("550e8400-e29b-41d4-a716-{n:012}")
}

pub fn sheet(rows: &[[&str; 8]]) -> ReportSheet {
    ReportSheet {
        headers: HEADER.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

/// In-memory store with one sample-info row per known sample point.
pub fn memory_store(sample_points: &[&str]) -> MemoryStore {
    let mut store = MemoryStore::with_destination_schema();
    for (idx, sample_point) in sample_points.iter().enumerate() {
        store
            .insert_row(
                SAMPLE_INFO_TABLE,
                &[
                    (
                        "SamplePtID".to_string(),
                        Some(Value::Text(sample_point.to_string())),
                    ),
                    ("SamplePointGUID".to_string(), Some(Value::Text(guid(idx)))),
                ],
            )
            .expect("seed sample info");
    }
    store
}

/// SQLite database with the destination tables and the given sample points.
pub fn sqlite_store(path: &Path, sample_points: &[&str]) {
    let conn = Connection::open(path).expect("create sqlite store");
    conn.execute_batch(DESTINATION_SCHEMA)
        .expect("create destination tables");
    for (idx, sample_point) in sample_points.iter().enumerate() {
        conn.execute(
            "INSERT INTO ChemistrySampleInfo (SamplePtID, SamplePointGUID) VALUES (?1, ?2)",
            params![sample_point, guid(idx)],
        )
        .expect("seed sample info");
    }
}

pub fn report_csv(rows: &[[&str; 8]]) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER).expect("write header");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    String::from_utf8(writer.into_inner().expect("flush csv")).expect("utf-8 csv")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
