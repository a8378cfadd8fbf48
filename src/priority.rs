use std::collections::HashMap;

use log::info;

use crate::convert::{ChemistryRecord, SampleKey};

/// Keeps one record per (sample point, analyte): the lowest priority rank,
/// with ties going to the earliest record. Output follows the order in which
/// each key first appeared.
pub fn resolve_priorities(records: Vec<ChemistryRecord>) -> Vec<ChemistryRecord> {
    let before = records.len();
    let mut slots: HashMap<SampleKey, usize> = HashMap::new();
    let mut kept: Vec<ChemistryRecord> = Vec::with_capacity(records.len());
    for record in records {
        let key = record.key();
        if let Some(&slot) = slots.get(&key) {
            if record.priority < kept[slot].priority {
                kept[slot] = record;
            }
        } else {
            slots.insert(key, kept.len());
            kept.push(record);
        }
    }
    let discarded = before - kept.len();
    if discarded > 0 {
        info!("Discarded {discarded} lower-priority duplicate result(s)");
    }
    kept
}
