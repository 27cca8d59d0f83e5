//! Schema creation. Every statement is idempotent, so `pbase init` can run
//! any number of times.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS base (
        id INTEGER PRIMARY KEY,
        price_level TEXT,
        creation_date TEXT,
        creation_time TEXT,
        program_name TEXT,
        base_name TEXT,
        base_type TEXT,
        decree TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resource_category (
        id INTEGER PRIMARY KEY,
        base_id INTEGER NOT NULL REFERENCES base(id),
        type TEXT,
        code_prefix TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS section (
        id INTEGER PRIMARY KEY,
        base_id INTEGER NOT NULL REFERENCES base(id),
        resource_category_id INTEGER REFERENCES resource_category(id),
        parent_section_id INTEGER REFERENCES section(id),
        name TEXT,
        type TEXT,
        code TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS name_group (
        id INTEGER PRIMARY KEY,
        section_id INTEGER NOT NULL REFERENCES section(id),
        begin_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work (
        id INTEGER PRIMARY KEY,
        name_group_id INTEGER NOT NULL REFERENCES name_group(id),
        code TEXT,
        end_name TEXT,
        measure_unit TEXT,
        nr TEXT,
        sp TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS item (
        id INTEGER PRIMARY KEY,
        text TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work_item (
        work_id INTEGER NOT NULL REFERENCES work(id),
        item_id INTEGER NOT NULL REFERENCES item(id),
        PRIMARY KEY (work_id, item_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resource (
        id INTEGER PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        end_name TEXT,
        measure_unit TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS abstract_resource (
        id INTEGER PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT,
        measure_unit TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS service_resource (
        id INTEGER PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        category TEXT,
        name TEXT,
        measure_unit TEXT,
        type TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work_resource (
        id INTEGER PRIMARY KEY,
        work_id INTEGER NOT NULL REFERENCES work(id),
        resource_id INTEGER REFERENCES resource(id),
        abstract_resource_id INTEGER REFERENCES abstract_resource(id),
        service_resource_id INTEGER REFERENCES service_resource(id),
        quantity TEXT,
        measure_unit TEXT,
        CHECK ((resource_id IS NOT NULL)
             + (abstract_resource_id IS NOT NULL)
             + (service_resource_id IS NOT NULL) = 1),
        UNIQUE (work_id, resource_id),
        UNIQUE (work_id, abstract_resource_id),
        UNIQUE (work_id, service_resource_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS price (
        id INTEGER PRIMARY KEY,
        work_id INTEGER NOT NULL REFERENCES work(id),
        cost REAL,
        salary REAL,
        salary_mach REAL,
        machines REAL,
        materials REAL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS correction (
        id INTEGER PRIMARY KEY,
        price_id INTEGER NOT NULL REFERENCES price(id),
        coeff REAL,
        from_field TEXT,
        to_field TEXT
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_section_parent ON section(parent_section_id)",
    "CREATE INDEX IF NOT EXISTS idx_name_group_section ON name_group(section_id)",
    "CREATE INDEX IF NOT EXISTS idx_work_name_group ON work(name_group_id)",
    "CREATE INDEX IF NOT EXISTS idx_work_resource_work ON work_resource(work_id)",
    "CREATE INDEX IF NOT EXISTS idx_price_work ON price(work_id)",
    "CREATE INDEX IF NOT EXISTS idx_correction_price ON correction(price_id)",
];

/// Creates every table and index on an open pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("schema statement failed: {}", statement.trim()))?;
    }
    Ok(())
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}
