//! Conversion of report rows into chemistry-table records.
//!
//! Each [`RawRecord`] becomes one [`ChemistryRecord`] through a fixed set of
//! field rules: the result value (with not-detected handling), the sample
//! point identifiers and GUID, the analyte mapping, and the units. The record
//! also carries the transient test-method priority and destination table tag,
//! neither of which is written to the store.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Value, parse_float, parse_guid},
    error::ImportError,
    record::{RawRecord, ReportColumn},
    samples::SamplePointIndex,
    store::ChemistryColumn,
    vocabulary::Vocabulary,
};

pub const LESS_THAN_SYMBOL: &str = "<";

/// Destination chemistry table, resolved to a concrete table at insert time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChemistryTable {
    Major,
    Minor,
}

impl fmt::Display for ChemistryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChemistryTable::Major => write!(f, "major"),
            ChemistryTable::Minor => write!(f, "minor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleKey {
    pub sample_point: String,
    pub analyte: String,
}

impl SampleKey {
    pub fn new(sample_point: impl Into<String>, analyte: impl Into<String>) -> Self {
        SampleKey {
            sample_point: sample_point.into(),
            analyte: analyte.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChemistryRecord {
    pub sample_pt_id: String,
    pub point_id: String,
    pub sample_point_guid: String,
    pub analyte: String,
    pub analysis_method: Option<String>,
    pub sample_value: f64,
    pub symbol: Option<String>,
    pub units: String,
    pub priority: usize,
    pub table: ChemistryTable,
}

impl ChemistryRecord {
    pub fn key(&self) -> SampleKey {
        SampleKey::new(self.sample_pt_id.clone(), self.analyte.clone())
    }

    /// Value for a destination column; `None` for NULL or unknown columns.
    pub fn field(&self, column: &str) -> Option<Value> {
        let text = |value: &str| Some(Value::Text(value.to_string()));
        match ChemistryColumn::from_name(column)? {
            ChemistryColumn::SamplePtId => text(&self.sample_pt_id),
            ChemistryColumn::SamplePointId => text(&self.point_id),
            ChemistryColumn::SamplePointGuid => text(&self.sample_point_guid),
            ChemistryColumn::Analyte => text(&self.analyte),
            ChemistryColumn::AnalysisMethod => self.analysis_method.as_deref().and_then(text),
            ChemistryColumn::SampleValue => Some(Value::Float(self.sample_value)),
            ChemistryColumn::Symbol => self.symbol.as_deref().and_then(text),
            ChemistryColumn::Units => text(&self.units),
        }
    }
}

/// The lab appends one suffix character to a site identifier to form each
/// sample point identifier; the site identifier is that prefix.
pub fn point_id(sample_pt_id: &str) -> &str {
    let mut chars = sample_pt_id.chars();
    chars.next_back();
    chars.as_str()
}

pub fn convert_record(
    raw: &RawRecord,
    vocabulary: &Vocabulary,
    sample_points: &SamplePointIndex,
) -> Result<ChemistryRecord, ImportError> {
    let sample_pt_id = raw.sample_point_id();
    let fail = |reason: String| ImportError::Conversion {
        sample_point: sample_pt_id.to_string(),
        reason,
    };

    let (sample_value, symbol) = if raw.get(ReportColumn::ReportedNd)
        == vocabulary.not_detected_marker
    {
        let lower_limit =
            parse_float(raw.get(ReportColumn::LowerLimit)).map_err(|e| fail(format!("{e:#}")))?;
        let dilution =
            parse_float(raw.get(ReportColumn::Dilution)).map_err(|e| fail(format!("{e:#}")))?;
        (lower_limit * dilution, Some(LESS_THAN_SYMBOL.to_string()))
    } else {
        let value =
            parse_float(raw.get(ReportColumn::ReportedNd)).map_err(|e| fail(format!("{e:#}")))?;
        (value, None)
    };

    let guid = sample_points
        .guid(sample_pt_id)
        .ok_or_else(|| fail("no SamplePointGUID in sample info".to_string()))?;
    if let Err(err) = parse_guid(guid) {
        warn!("SamplePointGUID for {sample_pt_id} is not a GUID: {err:#}");
    }

    let param = raw.param();
    let rule = vocabulary
        .category(param)
        .ok_or_else(|| fail(format!("no analyte conversion for Param '{param}'")))?;
    let priority = vocabulary
        .test_priority(param, raw.test())
        .ok_or_else(|| fail(format!("Test '{}' not accepted for '{param}'", raw.test())))?;

    let units = rule
        .units
        .clone()
        .unwrap_or_else(|| raw.get(ReportColumn::ResultsUnits).to_string());

    Ok(ChemistryRecord {
        sample_pt_id: sample_pt_id.to_string(),
        point_id: point_id(sample_pt_id).to_string(),
        sample_point_guid: guid.to_string(),
        analyte: rule.analyte.clone(),
        analysis_method: rule.method.clone(),
        sample_value,
        symbol,
        units,
        priority,
        table: rule.table,
    })
}

pub fn convert_records(
    records: &[RawRecord],
    vocabulary: &Vocabulary,
    sample_points: &SamplePointIndex,
) -> Result<Vec<ChemistryRecord>, ImportError> {
    records
        .iter()
        .map(|raw| convert_record(raw, vocabulary, sample_points))
        .collect()
}
