pub mod cli;
pub mod convert;
pub mod data;
pub mod error;
pub mod insert;
pub mod io_utils;
pub mod pipeline;
pub mod priority;
pub mod record;
pub mod samples;
pub mod standards;
pub mod store;
pub mod table;
pub mod validate;
pub mod vocabulary;

use std::{
    env,
    io::{self, Write},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    pipeline::{ImportOptions, run_import},
    store::sqlite::SqliteStore,
    vocabulary::Vocabulary,
};

pub use crate::error::ImportError;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("labchem_import", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => handle_import(&args),
        Commands::Vocabulary(args) => handle_vocabulary(&args),
    }
}

fn handle_import(args: &cli::ImportArgs) -> Result<()> {
    let vocabulary = Vocabulary::load_or_builtin(args.config.as_deref())?;
    debug!(
        "Using {} vocabulary with {} categor(ies)",
        args.config
            .as_ref()
            .map(|p| format!("{p:?}"))
            .unwrap_or_else(|| "built-in".into()),
        vocabulary.categories.len()
    );
    let delimiter = io_utils::resolve_input_delimiter(&args.report, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Importing '{}' into '{}' (delimiter '{}')",
        args.report.display(),
        args.store.display(),
        printable_delimiter(delimiter)
    );
    let sheet = io_utils::read_report(&args.report, delimiter, encoding)?;
    let mut store = SqliteStore::open(&args.store)?;
    let summary = run_import(
        &sheet,
        &vocabulary,
        &mut store,
        ImportOptions {
            dry_run: args.dry_run,
        },
    )?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    summary.write_report(&mut out)?;
    out.flush().context("Writing report")?;
    Ok(())
}

fn handle_vocabulary(args: &cli::VocabularyArgs) -> Result<()> {
    let vocabulary = Vocabulary::load_or_builtin(args.config.as_deref())?;
    let rows = vocabulary
        .categories
        .iter()
        .map(|(param, rule)| {
            vec![
                param.clone(),
                rule.analyte.clone(),
                rule.table.to_string(),
                rule.method.clone().unwrap_or_default(),
                rule.tests.join(" > "),
                rule.units.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    print!(
        "{}",
        table::render_table(
            &["param", "analyte", "table", "method", "tests", "units"],
            &rows
        )
    );
    info!(
        "Listed {} categor(ies) and {} standard(s)",
        rows.len(),
        vocabulary.standards.len()
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
