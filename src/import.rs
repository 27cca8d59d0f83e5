//! Catalog import command.
//!
//! Reads one XML document from disk and runs the core walker against the
//! configured SQLite database. Recoverable issues are printed but do not
//! fail the command; unreadable files, unparsable markup and an unreachable
//! or uninitialized database do.

use anyhow::{Context, Result};
use std::path::Path;

use pricebase_core::report::ImportReport;
use pricebase_core::walker;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Imports `path` and returns the run's report.
pub async fn import_file(config: &Config, path: &Path) -> Result<ImportReport> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

    let store = SqliteStore::open(config).await?;
    let result = walker::migrate_bytes(&store, &bytes, &config.import.migrate_options()).await;
    store.pool().close().await;

    result.with_context(|| format!("import of {} failed", path.display()))
}

pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let report = import_file(config, path).await?;
    let s = &report.stats;

    println!("import {}", path.display());
    println!("  base id: {}", report.base_id);
    println!("  resource categories: {}", s.resource_categories);
    println!("  sections: {}", s.sections);
    println!("  name groups: {}", s.name_groups);
    println!("  works: {}", s.works);
    println!("  items: {} new, {} linked", s.items_created, s.items_linked);
    println!(
        "  resources: {} new, {} linked",
        s.resources_created, s.resources_linked
    );
    println!("  prices: {}", s.prices);
    println!("  corrections: {}", s.corrections);

    if report.is_clean() {
        println!("  issues: none");
    } else {
        println!("  issues: {}", report.issues.len());
        for message in report.messages() {
            println!("    - {}", message);
        }
    }
    println!("ok");
    Ok(())
}
