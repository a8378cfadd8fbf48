use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};

use super::{
    ChemistryColumn, MAJOR_CHEMISTRY_TABLE, MINOR_CHEMISTRY_TABLE, SAMPLE_INFO_TABLE,
    SampleInfoColumn, Store, StoredRow,
};
use crate::data::Value;

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<StoredRow>,
}

/// Ordered in-memory tables. Writes apply immediately; `flush` only counts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, MemoryTable>,
    flushes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with empty sample-info, major and minor chemistry tables.
    pub fn with_destination_schema() -> Self {
        let chemistry = ChemistryColumn::ALL.map(ChemistryColumn::name);
        let mut store = Self::new();
        store.create_table(
            SAMPLE_INFO_TABLE,
            &SampleInfoColumn::ALL.map(SampleInfoColumn::name),
        );
        store.create_table(MAJOR_CHEMISTRY_TABLE, &chemistry);
        store.create_table(MINOR_CHEMISTRY_TABLE, &chemistry);
        store
    }

    pub fn create_table(&mut self, name: &str, columns: &[&str]) {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
            },
        );
    }

    pub fn rows(&self, table: &str) -> &[StoredRow] {
        self.tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| anyhow!("Unknown table '{name}'"))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| anyhow!("Unknown table '{name}'"))
    }
}

fn check_column(table: &str, columns: &[String], field: &str) -> Result<()> {
    if columns.iter().any(|c| c == field) {
        Ok(())
    } else {
        bail!("Table '{table}' has no column '{field}'")
    }
}

impl Store for MemoryStore {
    fn scan(&self, table: &str) -> Result<Vec<StoredRow>> {
        Ok(self.table(table)?.rows.clone())
    }

    fn find_by_key(&self, table: &str, field: &str, value: &str) -> Result<Option<StoredRow>> {
        Ok(self
            .table(table)?
            .rows
            .iter()
            .find(|row| row.text(field).as_deref() == Some(value))
            .cloned())
    }

    fn columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    fn insert_row(&mut self, table: &str, row: &[(String, Option<Value>)]) -> Result<()> {
        let target = self.table_mut(table)?;
        let mut stored = StoredRow::default();
        for (field, value) in row {
            check_column(table, &target.columns, field)?;
            if let Some(value) = value {
                stored.set(field.clone(), value.clone());
            }
        }
        target.rows.push(stored);
        Ok(())
    }

    fn update_field(
        &mut self,
        table: &str,
        key_field: &str,
        key_value: &str,
        field: &str,
        value: Option<Value>,
    ) -> Result<usize> {
        let target = self.table_mut(table)?;
        check_column(table, &target.columns, field)?;
        let mut touched = 0;
        for row in target
            .rows
            .iter_mut()
            .filter(|row| row.text(key_field).as_deref() == Some(key_value))
        {
            match &value {
                Some(value) => row.set(field, value.clone()),
                None => {
                    row.remove(field);
                }
            }
            touched += 1;
        }
        Ok(touched)
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
