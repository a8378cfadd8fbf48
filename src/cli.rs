use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Load water-chemistry lab reports into a sample database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a lab report and insert its results into the store
    Import(ImportArgs),
    /// List the category vocabulary used to convert reports
    Vocabulary(VocabularyArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Lab report exported as CSV or TSV
    pub report: PathBuf,
    /// SQLite database holding the sample-info and chemistry tables
    pub store: PathBuf,
    /// Vocabulary file (YAML, or JSON with a .json extension); built-in when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Report delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the report (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Run every check and print the report without writing to the store
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct VocabularyArgs {
    /// Vocabulary file (YAML, or JSON with a .json extension); built-in when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
