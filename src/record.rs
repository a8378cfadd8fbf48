//! Report rows as column-keyed records.
//!
//! The lab sheet is read as a header row plus data rows. [`validate_header()`]
//! checks the one column the pipeline cannot run without, and
//! [`normalize_rows()`] zips the header with each row into a [`RawRecord`].

use std::collections::BTreeMap;

use crate::error::ImportError;

/// Report columns the pipeline consumes. Anything else in the sheet is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportColumn {
    SamplePointId,
    Param,
    Test,
    ReportedNd,
    LowerLimit,
    Dilution,
    SampleNumber,
    ResultsUnits,
}

impl ReportColumn {
    pub const ALL: [ReportColumn; 8] = [
        ReportColumn::SamplePointId,
        ReportColumn::Param,
        ReportColumn::Test,
        ReportColumn::ReportedNd,
        ReportColumn::LowerLimit,
        ReportColumn::Dilution,
        ReportColumn::SampleNumber,
        ReportColumn::ResultsUnits,
    ];

    pub fn header(self) -> &'static str {
        match self {
            ReportColumn::SamplePointId => "SamplePointID",
            ReportColumn::Param => "Param",
            ReportColumn::Test => "Test",
            ReportColumn::ReportedNd => "ReportedND",
            ReportColumn::LowerLimit => "LowerLimit",
            ReportColumn::Dilution => "Dilution",
            ReportColumn::SampleNumber => "SampleNumber",
            ReportColumn::ResultsUnits => "Results_Units",
        }
    }

    pub fn from_header(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.header() == name)
    }
}

pub const REQUIRED_COLUMN: ReportColumn = ReportColumn::SamplePointId;

/// One data row of the report keyed by recognized column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    cells: BTreeMap<&'static str, String>,
}

impl RawRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut cells = BTreeMap::new();
        for (name, value) in pairs {
            if let Some(column) = ReportColumn::from_header(name.as_ref()) {
                cells.insert(column.header(), value.into());
            }
        }
        RawRecord { cells }
    }

    /// Cell text for `column`; absent cells read as the empty string.
    pub fn get(&self, column: ReportColumn) -> &str {
        self.cells
            .get(column.header())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn sample_point_id(&self) -> &str {
        self.get(ReportColumn::SamplePointId)
    }

    pub fn param(&self) -> &str {
        self.get(ReportColumn::Param)
    }

    pub fn test(&self) -> &str {
        self.get(ReportColumn::Test)
    }

    pub fn sample_number(&self) -> &str {
        self.get(ReportColumn::SampleNumber)
    }
}

pub fn validate_header(headers: &[String]) -> Result<(), ImportError> {
    let required = REQUIRED_COLUMN.header();
    if headers.iter().any(|header| header == required) {
        Ok(())
    } else {
        Err(ImportError::InvalidInputHeader {
            column: required.to_string(),
        })
    }
}

/// Zips the header with one data row. Missing trailing cells read as empty;
/// when a column name repeats, the rightmost cell wins.
pub fn normalize_row(headers: &[String], row: &[String]) -> RawRecord {
    RawRecord::from_pairs(headers.iter().enumerate().map(|(idx, header)| {
        let value = row.get(idx).map(String::as_str).unwrap_or("");
        (header.as_str(), value)
    }))
}

pub fn normalize_rows(headers: &[String], rows: &[Vec<String>]) -> Vec<RawRecord> {
    rows.iter().map(|row| normalize_row(headers, row)).collect()
}
