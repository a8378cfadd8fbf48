//! Batch validators run before anything is written.
//!
//! Each validator scans the whole batch and reports every offender it finds
//! in a single [`ImportError`], in first-seen order without repeats.

use std::collections::HashSet;

use anyhow::Result;
use itertools::Itertools;
use log::debug;

use crate::{
    convert::{ChemistryRecord, SampleKey},
    error::{ImportError, InvalidTest},
    record::RawRecord,
    store::{ChemistryColumn, MAJOR_CHEMISTRY_TABLE, MINOR_CHEMISTRY_TABLE, Store, StoredRow},
    vocabulary::Vocabulary,
};

/// Every `Param` must have an analyte conversion.
pub fn validate_params(records: &[RawRecord], vocabulary: &Vocabulary) -> Result<(), ImportError> {
    let params = records
        .iter()
        .map(RawRecord::param)
        .filter(|param| vocabulary.analyte(param).is_none())
        .unique()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if params.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingParamConversion { params })
    }
}

/// Categories with a configured test vocabulary only accept tests from it.
pub fn validate_tests(records: &[RawRecord], vocabulary: &Vocabulary) -> Result<(), ImportError> {
    let entries = records
        .iter()
        .filter(|record| vocabulary.test_priority(record.param(), record.test()).is_none())
        .map(|record| InvalidTest {
            sample_point: record.sample_point_id().to_string(),
            param: record.param().to_string(),
            test: record.test().to_string(),
        })
        .unique()
        .collect::<Vec<_>>();
    if entries.is_empty() {
        Ok(())
    } else {
        Err(ImportError::InvalidTestDescription { entries })
    }
}

/// (sample point, analyte) pairs already stored in the chemistry tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingSamples {
    keys: HashSet<SampleKey>,
}

impl ExistingSamples {
    /// Rows lacking a sample point or analyte are skipped.
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a StoredRow>,
    {
        let mut keys = HashSet::new();
        for row in rows {
            let sample_point = row.text(ChemistryColumn::SamplePtId.name());
            let analyte = row.text(ChemistryColumn::Analyte.name());
            if let (Some(sample_point), Some(analyte)) = (sample_point, analyte) {
                keys.insert(SampleKey::new(sample_point, analyte));
            }
        }
        ExistingSamples { keys }
    }

    pub fn load<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let major = store.scan(MAJOR_CHEMISTRY_TABLE)?;
        let minor = store.scan(MINOR_CHEMISTRY_TABLE)?;
        let existing = Self::from_rows(major.iter().chain(minor.iter()));
        debug!(
            "Found {} existing sample/analyte pair(s) in chemistry tables",
            existing.len()
        );
        Ok(existing)
    }

    pub fn contains(&self, key: &SampleKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub fn validate_no_duplicates(
    records: &[ChemistryRecord],
    existing: &ExistingSamples,
) -> Result<(), ImportError> {
    let sample_points = records
        .iter()
        .filter(|record| existing.contains(&record.key()))
        .map(|record| record.sample_pt_id.as_str())
        .unique()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if sample_points.is_empty() {
        Ok(())
    } else {
        Err(ImportError::DuplicateSample { sample_points })
    }
}
