//! Listing commands: `roots`, `children`, `groups`, `works` and `work`.
//!
//! Thin CLI wrappers around [`pricebase_core::catalog`]; the HTTP server
//! serves the same operations as JSON.

use anyhow::Result;

use pricebase_core::catalog;
use pricebase_core::models::{RowId, SectionRow};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

fn print_sections(sections: &[SectionRow]) {
    if sections.is_empty() {
        println!("No sections.");
        return;
    }
    for s in sections {
        println!(
            "{:>6}  {:<12} {}",
            s.id,
            s.code.as_deref().unwrap_or("-"),
            s.name.as_deref().unwrap_or("(unnamed)")
        );
    }
}

pub async fn run_roots(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let sections = catalog::root_sections(&store).await?;
    print_sections(&sections);
    Ok(())
}

pub async fn run_children(config: &Config, parent_id: RowId) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let sections = catalog::children(&store, parent_id).await?;
    print_sections(&sections);
    Ok(())
}

pub async fn run_groups(config: &Config, section_id: RowId) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let groups = catalog::name_groups(&store, section_id).await?;
    if groups.is_empty() {
        println!("No name groups.");
    }
    for g in &groups {
        println!("{:>6}  {}", g.id, g.begin_name.as_deref().unwrap_or("(unnamed)"));
    }
    Ok(())
}

pub async fn run_works(config: &Config, name_group_id: RowId) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let works = catalog::works(&store, name_group_id).await?;
    if works.is_empty() {
        println!("No works.");
    }
    for w in &works {
        println!(
            "{:>6}  {:<14} {} [{}]",
            w.id,
            w.code.as_deref().unwrap_or("-"),
            w.end_name.as_deref().unwrap_or(""),
            w.measure_unit.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Prints one work in full. Exits with status 1 when the id is unknown.
pub async fn run_work(config: &Config, id: RowId) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let detail = match catalog::work_detail(&store, id).await {
        Ok(d) => d,
        Err(e) if e.is_not_found() => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    let w = &detail.work;

    println!("--- Work ---");
    println!("id:           {}", w.id);
    println!("code:         {}", w.code.as_deref().unwrap_or("-"));
    println!("name:         {}", w.end_name.as_deref().unwrap_or(""));
    println!("measure unit: {}", w.measure_unit.as_deref().unwrap_or(""));
    if w.nr.is_some() || w.sp.is_some() {
        println!(
            "nr/sp:        {} / {}",
            w.nr.as_deref().unwrap_or("-"),
            w.sp.as_deref().unwrap_or("-")
        );
    }
    println!();

    println!("--- Items ({}) ---", detail.items.len());
    for item in &detail.items {
        println!("- {}", item.text);
    }
    println!();

    println!("--- Resources ({}) ---", detail.resources.len());
    for r in &detail.resources {
        println!(
            "{:<18} {:<14} {:>10} {:<6} {}",
            r.kind.label(),
            r.code,
            r.quantity.as_deref().unwrap_or(""),
            r.measure_unit.as_deref().unwrap_or(""),
            r.name.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
