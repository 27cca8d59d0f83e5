//! Database statistics.
//!
//! Prints row counts for every relation and the database file size, so an
//! import can be sanity-checked without opening SQLite by hand.

use anyhow::Result;

use pricebase_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let c = store.counts().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Pricebase Database Stats");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();

    let rows = [
        ("bases", c.bases),
        ("resource categories", c.resource_categories),
        ("sections", c.sections),
        ("name groups", c.name_groups),
        ("works", c.works),
        ("items", c.items),
        ("work items", c.work_items),
        ("resources", c.resources),
        ("abstract resources", c.abstract_resources),
        ("service resources", c.service_resources),
        ("work resources", c.work_resources),
        ("prices", c.prices),
        ("corrections", c.corrections),
    ];
    for (label, count) in rows {
        println!("  {:<22} {:>8}", format!("{}:", label), count);
    }
    println!();

    store.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::format_bytes;

    #[test]
    fn bytes_are_scaled() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
