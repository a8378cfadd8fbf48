use std::{fmt, io::Write};

use anyhow::Result;
use itertools::Itertools;

use crate::{convert::ChemistryRecord, data::format_float, vocabulary::Vocabulary};

pub const ALL_CLEAR_LINE: &str = "All samples within water-quality standards";

/// An inserted result outside its analyte's configured bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardsFailure {
    pub sample_point: String,
    pub analyte: String,
    pub value: f64,
    pub units: String,
}

impl fmt::Display for StandardsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({} {})",
            self.sample_point,
            self.analyte,
            format_float(self.value),
            self.units
        )
    }
}

/// Failures in ascending (sample point, analyte) order. Analytes without
/// configured bounds always pass.
pub fn check_standards(
    records: &[ChemistryRecord],
    vocabulary: &Vocabulary,
) -> Vec<StandardsFailure> {
    records
        .iter()
        .sorted_by(|a, b| {
            (&a.sample_pt_id, &a.analyte).cmp(&(&b.sample_pt_id, &b.analyte))
        })
        .filter(|record| {
            vocabulary
                .bounds(&record.analyte)
                .is_some_and(|bounds| !bounds.contains(record.sample_value))
        })
        .map(|record| StandardsFailure {
            sample_point: record.sample_pt_id.clone(),
            analyte: record.analyte.clone(),
            value: record.sample_value,
            units: record.units.clone(),
        })
        .collect()
}

pub fn write_standards_report<W: Write>(out: &mut W, failures: &[StandardsFailure]) -> Result<()> {
    if failures.is_empty() {
        writeln!(out, "{ALL_CLEAR_LINE}")?;
        return Ok(());
    }
    for failure in failures {
        writeln!(out, "{failure}")?;
    }
    writeln!(
        out,
        "{} sample(s) outside water-quality standards",
        failures.len()
    )?;
    Ok(())
}
