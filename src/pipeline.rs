//! Stage orchestration for one report import.
//!
//! Stages run strictly in order and the first failing validation aborts the
//! run before the store is written. Only [`insert::apply`] touches persistent
//! state.

use std::io::Write;

use anyhow::Result;
use itertools::Itertools;
use log::info;

use crate::{
    convert::{ChemistryRecord, convert_records},
    insert,
    io_utils::ReportSheet,
    priority::resolve_priorities,
    record::{normalize_rows, validate_header},
    samples::{ResolvedSampleNumbers, SampleNumberMap, SamplePointIndex, filter_known_sample_points},
    standards::{StandardsFailure, check_standards, write_standards_report},
    store::Store,
    validate::{ExistingSamples, validate_no_duplicates, validate_params, validate_tests},
    vocabulary::Vocabulary,
};

pub const REPORT_SEPARATOR: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Run every check but skip the store writes.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub records: Vec<ChemistryRecord>,
    pub sample_numbers: ResolvedSampleNumbers,
    pub failures: Vec<StandardsFailure>,
    pub dry_run: bool,
}

impl ImportSummary {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Distinct sample points among the records, ascending.
    pub fn sample_points(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|record| record.sample_pt_id.as_str())
            .sorted()
            .dedup()
            .collect()
    }

    pub fn write_report<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.dry_run {
            writeln!(out, "Would add {} rows to database", self.row_count())?;
        } else {
            writeln!(out, "Added {} rows to database", self.row_count())?;
        }
        for sample_point in self.sample_points() {
            writeln!(out, "{sample_point}")?;
        }
        writeln!(out, "{REPORT_SEPARATOR}")?;
        write_standards_report(out, &self.failures)
    }
}

pub fn run_import<S: Store + ?Sized>(
    sheet: &ReportSheet,
    vocabulary: &Vocabulary,
    store: &mut S,
    options: ImportOptions,
) -> Result<ImportSummary> {
    validate_header(&sheet.headers)?;
    let records = normalize_rows(&sheet.headers, &sheet.rows);
    info!("Read {} report row(s)", records.len());

    validate_params(&records, vocabulary)?;
    validate_tests(&records, vocabulary)?;

    let sample_points = SamplePointIndex::load(&*store)?;
    let records = filter_known_sample_points(records, &sample_points);
    let sample_numbers = SampleNumberMap::build(&records).resolve()?;

    let converted = convert_records(&records, vocabulary, &sample_points)?;
    let existing = ExistingSamples::load(&*store)?;
    validate_no_duplicates(&converted, &existing)?;
    let resolved = resolve_priorities(converted);

    if options.dry_run {
        info!("Dry run: skipping store writes for {} row(s)", resolved.len());
    } else if resolved.is_empty() && sample_numbers.is_empty() {
        info!("Nothing to import");
    } else {
        insert::apply(store, &resolved, &sample_numbers)?;
    }

    let failures = check_standards(&resolved, vocabulary);
    Ok(ImportSummary {
        records: resolved,
        sample_numbers,
        failures,
        dry_run: options.dry_run,
    })
}
