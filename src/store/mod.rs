//! Destination store capability.
//!
//! The pipeline only needs a handful of table operations, captured by the
//! [`Store`] trait. [`sqlite::SqliteStore`] backs the CLI; [`memory::MemoryStore`]
//! serves library callers and tests.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use anyhow::Result;

use crate::{convert::ChemistryTable, data::Value};

pub const SAMPLE_INFO_TABLE: &str = "ChemistrySampleInfo";
pub const MAJOR_CHEMISTRY_TABLE: &str = "MajorChemistry";
pub const MINOR_CHEMISTRY_TABLE: &str = "MinorandTraceChemistry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleInfoColumn {
    SamplePtId,
    SamplePointId,
    SamplePointGuid,
    LabId,
}

impl SampleInfoColumn {
    pub const ALL: [SampleInfoColumn; 4] = [
        SampleInfoColumn::SamplePtId,
        SampleInfoColumn::SamplePointId,
        SampleInfoColumn::SamplePointGuid,
        SampleInfoColumn::LabId,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SampleInfoColumn::SamplePtId => "SamplePtID",
            SampleInfoColumn::SamplePointId => "SamplePointID",
            SampleInfoColumn::SamplePointGuid => "SamplePointGUID",
            SampleInfoColumn::LabId => "LabID",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChemistryColumn {
    SamplePtId,
    SamplePointId,
    SamplePointGuid,
    Analyte,
    AnalysisMethod,
    SampleValue,
    Symbol,
    Units,
}

impl ChemistryColumn {
    pub const ALL: [ChemistryColumn; 8] = [
        ChemistryColumn::SamplePtId,
        ChemistryColumn::SamplePointId,
        ChemistryColumn::SamplePointGuid,
        ChemistryColumn::Analyte,
        ChemistryColumn::AnalysisMethod,
        ChemistryColumn::SampleValue,
        ChemistryColumn::Symbol,
        ChemistryColumn::Units,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChemistryColumn::SamplePtId => "SamplePtID",
            ChemistryColumn::SamplePointId => "SamplePointID",
            ChemistryColumn::SamplePointGuid => "SamplePointGUID",
            ChemistryColumn::Analyte => "Analyte",
            ChemistryColumn::AnalysisMethod => "AnalysisMethod",
            ChemistryColumn::SampleValue => "SampleValue",
            ChemistryColumn::Symbol => "Symbol",
            ChemistryColumn::Units => "Units",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.name() == name)
    }
}

pub fn chemistry_table_name(table: ChemistryTable) -> &'static str {
    match table {
        ChemistryTable::Major => MAJOR_CHEMISTRY_TABLE,
        ChemistryTable::Minor => MINOR_CHEMISTRY_TABLE,
    }
}

/// A row read back from a table. NULL cells are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredRow {
    fields: BTreeMap<String, Value>,
}

impl StoredRow {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field rendered as text, for comparing against report identifiers.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).map(Value::as_display)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }
}

impl FromIterator<(String, Value)> for StoredRow {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        StoredRow {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Table operations the import pipeline consumes.
///
/// Implementations may buffer writes until [`Store::flush`]; callers invoke it
/// once after every insert and update of a run has been issued.
pub trait Store {
    fn scan(&self, table: &str) -> Result<Vec<StoredRow>>;

    fn find_by_key(&self, table: &str, field: &str, value: &str) -> Result<Option<StoredRow>>;

    /// Column names of `table` in definition order.
    fn columns(&self, table: &str) -> Result<Vec<String>>;

    fn insert_row(&mut self, table: &str, row: &[(String, Option<Value>)]) -> Result<()>;

    /// Sets `field` on every row whose `key_field` equals `key_value` and
    /// returns the number of rows touched.
    fn update_field(
        &mut self,
        table: &str,
        key_field: &str,
        key_value: &str,
        field: &str,
        value: Option<Value>,
    ) -> Result<usize>;

    fn flush(&mut self) -> Result<()>;
}
