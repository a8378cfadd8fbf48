//! Sample point cross-referencing.
//!
//! The sample-info table is scanned once per run into a [`SamplePointIndex`];
//! it decides which report rows are in scope and supplies the GUID for each
//! sample point during conversion. [`SampleNumberMap`] groups lab sample
//! numbers per sample point and resolves them to exactly one each.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use log::{debug, info};

use crate::{
    error::{ImportError, SampleNumberConflict},
    record::RawRecord,
    store::{SAMPLE_INFO_TABLE, SampleInfoColumn, Store, StoredRow},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplePointIndex {
    guids: BTreeMap<String, Option<String>>,
}

impl SamplePointIndex {
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a StoredRow>,
    {
        let mut guids = BTreeMap::new();
        for row in rows {
            let Some(id) = row.text(SampleInfoColumn::SamplePtId.name()) else {
                continue;
            };
            let guid = row.text(SampleInfoColumn::SamplePointGuid.name());
            guids.entry(id).or_insert(guid);
        }
        SamplePointIndex { guids }
    }

    pub fn load<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let rows = store.scan(SAMPLE_INFO_TABLE)?;
        let index = Self::from_rows(&rows);
        debug!(
            "Indexed {} known sample point(s) from {SAMPLE_INFO_TABLE}",
            index.len()
        );
        Ok(index)
    }

    pub fn contains(&self, sample_point: &str) -> bool {
        self.guids.contains_key(sample_point)
    }

    /// GUID text for a known sample point; `None` when unknown or unset.
    pub fn guid(&self, sample_point: &str) -> Option<&str> {
        self.guids.get(sample_point).and_then(|guid| guid.as_deref())
    }

    pub fn len(&self) -> usize {
        self.guids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guids.is_empty()
    }
}

/// Keeps records whose sample point is already registered, preserving order.
pub fn filter_known_sample_points(
    records: Vec<RawRecord>,
    known: &SamplePointIndex,
) -> Vec<RawRecord> {
    let before = records.len();
    let kept = records
        .into_iter()
        .filter(|record| known.contains(record.sample_point_id()))
        .collect::<Vec<_>>();
    let dropped = before - kept.len();
    if dropped > 0 {
        info!("Skipped {dropped} row(s) for sample points not in {SAMPLE_INFO_TABLE}");
    }
    kept
}

/// Distinct lab sample numbers observed per sample point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleNumberMap {
    numbers: BTreeMap<String, BTreeSet<String>>,
}

impl SampleNumberMap {
    /// Blank sample-number cells are not counted, so a sample point whose
    /// rows are all blank ends up with an empty set.
    pub fn build(records: &[RawRecord]) -> Self {
        let mut numbers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for record in records {
            let entry = numbers
                .entry(record.sample_point_id().to_string())
                .or_default();
            let number = record.sample_number().trim();
            if !number.is_empty() {
                entry.insert(number.to_string());
            }
        }
        SampleNumberMap { numbers }
    }

    pub fn get(&self, sample_point: &str) -> Option<&BTreeSet<String>> {
        self.numbers.get(sample_point)
    }

    /// Fails with every sample point that does not map to exactly one number.
    pub fn resolve(self) -> Result<ResolvedSampleNumbers, ImportError> {
        let conflicts = self
            .numbers
            .iter()
            .filter(|(_, numbers)| numbers.len() != 1)
            .map(|(sample_point, numbers)| SampleNumberConflict {
                sample_point: sample_point.clone(),
                sample_numbers: numbers.iter().cloned().collect(),
            })
            .collect::<Vec<_>>();
        if !conflicts.is_empty() {
            return Err(ImportError::NonUniqueSampleNumber { conflicts });
        }
        let resolved = self
            .numbers
            .into_iter()
            .filter_map(|(sample_point, numbers)| {
                numbers.into_iter().next().map(|number| (sample_point, number))
            })
            .collect();
        Ok(ResolvedSampleNumbers { numbers: resolved })
    }
}

/// The sole lab sample number for every sample point in the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSampleNumbers {
    numbers: BTreeMap<String, String>,
}

impl ResolvedSampleNumbers {
    pub fn get(&self, sample_point: &str) -> Option<&str> {
        self.numbers.get(sample_point).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.numbers
            .iter()
            .map(|(sample_point, number)| (sample_point.as_str(), number.as_str()))
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}
