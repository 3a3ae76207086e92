//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured store and print its readiness summary.
//! - Keep output deterministic for quick local sanity checks.

use booksmart_core::db::migrations::schema_version;
use booksmart_core::{init_logging, CoreConfig, SqliteDocumentStore};
use std::process::ExitCode;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let conn = config.open_db()?;
    let store = SqliteDocumentStore::try_new(&conn, config.codec())?;

    println!("booksmart_core ping={}", booksmart_core::ping());
    println!("booksmart_core version={}", booksmart_core::core_version());
    println!("schema_version={}", schema_version(&conn)?);
    println!("collections={}", store.collection_names()?.join(","));
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("booksmart_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}
