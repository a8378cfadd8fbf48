//! SQLite-backed destination store.
//!
//! All writes of a run share one transaction: the first insert or update
//! opens it, [`Store::flush`] commits it, and dropping the store while it is
//! still open rolls every write back.

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use rusqlite::{
    Connection, OpenFlags, params,
    types::{ToSql, ToSqlOutput, Type, ValueRef},
};

use super::{
    ChemistryColumn, MAJOR_CHEMISTRY_TABLE, MINOR_CHEMISTRY_TABLE, SAMPLE_INFO_TABLE,
    SampleInfoColumn, Store, StoredRow,
};
use crate::data::Value;

pub struct SqliteStore {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteStore {
    /// Opens an existing database and checks the destination tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Opening store {path:?}"))?;
        let store = Self::from_connection(conn);
        store.ensure_destination_tables()?;
        Ok(store)
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteStore {
            conn,
            in_transaction: false,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ensure_destination_tables(&self) -> Result<()> {
        let sample_info = [
            SampleInfoColumn::SamplePtId,
            SampleInfoColumn::SamplePointGuid,
            SampleInfoColumn::LabId,
        ]
        .map(SampleInfoColumn::name);
        let chemistry = [ChemistryColumn::SamplePtId, ChemistryColumn::Analyte]
            .map(ChemistryColumn::name);
        for (table, required) in [
            (SAMPLE_INFO_TABLE, sample_info.as_slice()),
            (MAJOR_CHEMISTRY_TABLE, chemistry.as_slice()),
            (MINOR_CHEMISTRY_TABLE, chemistry.as_slice()),
        ] {
            let columns = self.columns(table)?;
            let missing = required
                .iter()
                .filter(|name| !columns.iter().any(|c| c == *name))
                .copied()
                .collect::<Vec<_>>();
            if !missing.is_empty() {
                bail!(
                    "Table '{table}' is missing required column(s): {}",
                    missing.join(", ")
                );
            }
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .context("Starting store transaction")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if self.in_transaction {
            warn!("Rolling back uncommitted store writes");
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback failed: {err}");
            }
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn read_row(row: &rusqlite::Row<'_>, names: &[String]) -> rusqlite::Result<StoredRow> {
    let mut stored = StoredRow::default();
    for (idx, name) in names.iter().enumerate() {
        let value = match row.get_ref(idx)? {
            ValueRef::Null => continue,
            ValueRef::Blob(_) => {
                return Err(rusqlite::Error::InvalidColumnType(
                    idx,
                    name.clone(),
                    Type::Blob,
                ));
            }
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        };
        stored.set(name.clone(), value);
    }
    Ok(stored)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
        })
    }
}

impl Store for SqliteStore {
    fn scan(&self, table: &str) -> Result<Vec<StoredRow>> {
        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Preparing scan of '{table}'"))?;
        let names = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let rows = stmt
            .query_map([], |row| read_row(row, &names))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Scanning '{table}'"))?;
        Ok(rows)
    }

    fn find_by_key(&self, table: &str, field: &str, value: &str) -> Result<Option<StoredRow>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 LIMIT 1",
            quote_identifier(table),
            quote_identifier(field)
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Preparing lookup on '{table}'.'{field}'"))?;
        let names = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let mut rows = stmt.query(params![value])?;
        match rows.next()? {
            Some(row) => Ok(Some(read_row(row, &names)?)),
            None => Ok(None),
        }
    }

    fn columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Reading columns of '{table}'"))?;
        if columns.is_empty() {
            bail!("Table '{table}' does not exist in store");
        }
        Ok(columns)
    }

    fn insert_row(&mut self, table: &str, row: &[(String, Option<Value>)]) -> Result<()> {
        if row.is_empty() {
            bail!("Refusing to insert an empty row into '{table}'");
        }
        let names = row
            .iter()
            .map(|(name, _)| quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=row.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({names}) VALUES ({placeholders})",
            quote_identifier(table)
        );
        self.begin()?;
        self.conn
            .execute(
                &sql,
                rusqlite::params_from_iter(row.iter().map(|(_, value)| value)),
            )
            .with_context(|| format!("Inserting row into '{table}'"))?;
        debug!("Inserted row into {table}");
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
        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE {} = ?2",
            quote_identifier(table),
            quote_identifier(field),
            quote_identifier(key_field)
        );
        self.begin()?;
        let touched = self
            .conn
            .execute(&sql, params![value, key_value])
            .with_context(|| format!("Updating '{table}'.'{field}' for '{key_value}'"))?;
        debug!("Updated {field} on {touched} {table} row(s) for {key_value}");
        Ok(touched)
    }

    fn flush(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn
                .execute_batch("COMMIT")
                .context("Committing store transaction")?;
            self.in_transaction = false;
        }
        Ok(())
    }
}
