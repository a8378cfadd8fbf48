//! Writes converted records and lab ids to the destination store.
//!
//! Rows are aligned to each destination table's own column list, so columns
//! the record does not carry are written as NULL. Whether a failure part-way
//! through leaves earlier writes behind depends on the store: the SQLite
//! backend discards them, the in-memory one keeps them.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    convert::{ChemistryRecord, ChemistryTable},
    data::Value,
    samples::ResolvedSampleNumbers,
    store::{SAMPLE_INFO_TABLE, SampleInfoColumn, Store, chemistry_table_name},
};

pub fn insert_records<S: Store + ?Sized>(
    store: &mut S,
    records: &[ChemistryRecord],
) -> Result<usize> {
    let mut columns: HashMap<ChemistryTable, Vec<String>> = HashMap::new();
    for record in records {
        let table = chemistry_table_name(record.table);
        if !columns.contains_key(&record.table) {
            columns.insert(record.table, store.columns(table)?);
        }
        let row = columns[&record.table]
            .iter()
            .map(|column| (column.clone(), record.field(column)))
            .collect::<Vec<_>>();
        store.insert_row(table, &row).with_context(|| {
            format!(
                "Inserting {} result for {} into {table}",
                record.analyte, record.sample_pt_id
            )
        })?;
    }
    Ok(records.len())
}

pub fn update_lab_ids<S: Store + ?Sized>(
    store: &mut S,
    sample_numbers: &ResolvedSampleNumbers,
) -> Result<()> {
    for (sample_point, number) in sample_numbers.iter() {
        let touched = store.update_field(
            SAMPLE_INFO_TABLE,
            SampleInfoColumn::SamplePtId.name(),
            sample_point,
            SampleInfoColumn::LabId.name(),
            Some(Value::Text(number.to_string())),
        )?;
        if touched == 0 {
            bail!("No {SAMPLE_INFO_TABLE} row for sample point '{sample_point}'");
        }
    }
    Ok(())
}

/// Inserts every record, records lab ids, then flushes the store once.
pub fn apply<S: Store + ?Sized>(
    store: &mut S,
    records: &[ChemistryRecord],
    sample_numbers: &ResolvedSampleNumbers,
) -> Result<usize> {
    let inserted = insert_records(store, records)?;
    update_lab_ids(store, sample_numbers)?;
    store.flush().context("Flushing store")?;
    info!(
        "Inserted {inserted} row(s) and set lab ids for {} sample point(s)",
        sample_numbers.len()
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::RawRecord,
        samples::SampleNumberMap,
        store::{MAJOR_CHEMISTRY_TABLE, MINOR_CHEMISTRY_TABLE, memory::MemoryStore},
    };

    fn record(table: ChemistryTable, symbol: Option<&str>) -> ChemistryRecord {
        ChemistryRecord {
            sample_pt_id: "W-1A".to_string(),
            point_id: "W-1".to_string(),
            sample_point_guid: "g".to_string(),
            analyte: "CL".to_string(),
            analysis_method: None,
            sample_value: 3.0,
            symbol: symbol.map(str::to_string),
            units: "mg/L".to_string(),
            priority: 0,
            table,
        }
    }

    fn numbers(pairs: &[(&str, &str)]) -> ResolvedSampleNumbers {
        let records = pairs
            .iter()
            .map(|(sp, n)| RawRecord::from_pairs([("SamplePointID", *sp), ("SampleNumber", *n)]))
            .collect::<Vec<_>>();
        SampleNumberMap::build(&records).resolve().unwrap()
    }

    #[test]
    fn rows_go_to_tagged_tables_with_nulls() {
        let mut store = MemoryStore::with_destination_schema();
        let inserted = insert_records(
            &mut store,
            &[
                record(ChemistryTable::Major, None),
                record(ChemistryTable::Minor, Some("<")),
            ],
        )
        .unwrap();
        assert_eq!(inserted, 2);
        let major = store.rows(MAJOR_CHEMISTRY_TABLE);
        assert_eq!(major.len(), 1);
        assert_eq!(major[0].get("Symbol"), None);
        assert_eq!(major[0].get("AnalysisMethod"), None);
        assert_eq!(major[0].text("SamplePointID").as_deref(), Some("W-1"));
        let minor = store.rows(MINOR_CHEMISTRY_TABLE);
        assert_eq!(minor[0].text("Symbol").as_deref(), Some("<"));
    }

    #[test]
    fn lab_id_update_requires_sample_info_row() {
        let mut store = MemoryStore::with_destination_schema();
        store
            .insert_row(
                SAMPLE_INFO_TABLE,
                &[("SamplePtID".to_string(), Some(Value::Text("W-1A".into())))],
            )
            .unwrap();
        update_lab_ids(&mut store, &numbers(&[("W-1A", "S100")])).unwrap();
        assert_eq!(
            store.rows(SAMPLE_INFO_TABLE)[0].text("LabID").as_deref(),
            Some("S100")
        );
        let err = update_lab_ids(&mut store, &numbers(&[("W-9Z", "S1")])).unwrap_err();
        assert!(err.to_string().contains("W-9Z"));
    }

    #[test]
    fn apply_flushes_once() {
        let mut store = MemoryStore::with_destination_schema();
        apply(&mut store, &[], &ResolvedSampleNumbers::default()).unwrap();
        assert_eq!(store.flush_count(), 1);
    }
}
