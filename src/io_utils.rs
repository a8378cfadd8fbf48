//! Reading lab report exports.
//!
//! Reports arrive as delimited text exported from the lab's spreadsheet:
//!
//! - **Delimiter**: extension-based (`.tsv` → tab, otherwise comma) unless
//!   overridden.
//! - **Encoding**: cells are decoded via `encoding_rs`, defaulting to UTF-8.
//! - **Shape**: the first record is the header; later records may be shorter
//!   than the header, and rows with only blank cells are skipped.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// Header plus data rows, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn read_sheet<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<ReportSheet> {
    let mut reader = open_csv_reader(reader, delimiter);
    let mut records = reader.byte_records();
    let headers = match records.next() {
        Some(record) => {
            let record = record.context("Reading report header")?;
            let mut headers = decode_record(&record, encoding)?;
            if let Some(first) = headers.first_mut() {
                *first = first.trim_start_matches('\u{feff}').to_string();
            }
            headers
        }
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record.with_context(|| format!("Reading report row {}", idx + 2))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding report row {}", idx + 2))?;
        if decoded.iter().all(|cell| cell.trim().is_empty()) {
            debug!("Skipping blank report row {}", idx + 2);
            continue;
        }
        rows.push(decoded);
    }
    Ok(ReportSheet { headers, rows })
}

pub fn read_report(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<ReportSheet> {
    let file = File::open(path).with_context(|| format!("Opening report {path:?}"))?;
    read_sheet(BufReader::new(file), delimiter, encoding)
        .with_context(|| format!("Reading report {path:?}"))
}
