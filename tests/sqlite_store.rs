//! Library-level tests: the core walker and read API running against a real
//! SQLite database in a temporary directory.

use std::path::Path;

use tempfile::TempDir;

use pricebase::config::Config;
use pricebase::db;
use pricebase::import::import_file;
use pricebase::migrate::{create_schema, run_migrations};
use pricebase::sqlite_store::SqliteStore;
use pricebase_core::catalog;
use pricebase_core::error::ImportError;
use pricebase_core::models::{ResourceKind, ResourceRecord, TableCounts};
use pricebase_core::store::Store;
use pricebase_core::walker::{migrate, MigrateOptions};

async fn fresh_store(tmp: &TempDir) -> SqliteStore {
    let config = Config::with_db_path(tmp.path().join("pricebase.sqlite"));
    let pool = db::connect(&config).await.unwrap();
    create_schema(&pool).await.unwrap();
    SqliteStore::new(pool)
}

fn fixture() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.xml");
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn fixture_import_populates_every_table() {
    let tmp = TempDir::new().unwrap();
    let store = fresh_store(&tmp).await;

    let report = migrate(&store, &fixture(), &MigrateOptions { concurrency: 2 })
        .await
        .unwrap();

    let counts = store.counts().await.unwrap();
    assert_eq!(
        counts,
        TableCounts {
            bases: 1,
            resource_categories: 1,
            sections: 5,
            name_groups: 1,
            works: 2,
            items: 2,
            work_items: 3,
            resources: 1,
            abstract_resources: 1,
            service_resources: 1,
            work_resources: 4,
            prices: 2,
            corrections: 1,
        }
    );
    assert_eq!(report.issues.len(), 1);
    assert_eq!(
        report.messages()[0],
        "duplicate resource 1-100-20 for work 01-01-001-01"
    );

    let row: (Option<String>, Option<String>, Option<String>) =
        sqlx::query_as("SELECT creation_date, creation_time, decree FROM base")
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(row.0.as_deref(), Some("2023-05-17"));
    assert_eq!(row.1.as_deref(), Some("10:30:00"));
    assert_eq!(row.2.as_deref(), Some("Приказ № 123/пр"));

    let cost: Option<f64> = sqlx::query_scalar("SELECT cost FROM price WHERE id = 1")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(cost, Some(1520.4));
}

#[tokio::test]
async fn second_import_reuses_shared_rows() {
    let tmp = TempDir::new().unwrap();
    let store = fresh_store(&tmp).await;
    let options = MigrateOptions::default();

    migrate(&store, &fixture(), &options).await.unwrap();
    let second = migrate(&store, &fixture(), &options).await.unwrap();

    assert_eq!(second.stats.items_created, 0);
    assert_eq!(second.stats.resources_created, 0);
    let counts = store.counts().await.unwrap();
    assert_eq!(counts.bases, 2);
    assert_eq!(counts.sections, 10);
    assert_eq!(counts.items, 2);
    assert_eq!(counts.resources, 1);
}

#[tokio::test]
async fn search_is_case_insensitive_for_cyrillic() {
    let tmp = TempDir::new().unwrap();
    let store = fresh_store(&tmp).await;
    migrate(&store, &fixture(), &MigrateOptions::default())
        .await
        .unwrap();

    let forest = catalog::search(&store, "котлованы").await.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].id, 1);
    assert_eq!(forest[0].children.len(), 1);
    assert_eq!(forest[0].children[0].id, 2);
    assert_eq!(forest[0].children[0].children[0].id, 3);
    assert_eq!(
        forest[0].children[0].children[0].name.as_deref(),
        Some("Котлованы и траншеи")
    );

    let everything = catalog::search(&store, "").await.unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn work_detail_joins_resources_in_link_order() {
    let tmp = TempDir::new().unwrap();
    let store = fresh_store(&tmp).await;
    migrate(&store, &fixture(), &MigrateOptions::default())
        .await
        .unwrap();

    let detail = catalog::work_detail(&store, 2).await.unwrap();
    assert_eq!(detail.work.code.as_deref(), Some("01-01-001-02"));
    assert_eq!(detail.items.len(), 1);
    let kinds: Vec<ResourceKind> = detail.resources.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![ResourceKind::Resource, ResourceKind::ServiceResource]);
    assert_eq!(detail.resources[0].name.as_deref(), Some("Рабочий строитель"));
    assert_eq!(detail.resources[1].code, "400-0001");

    let err = catalog::work_detail(&store, 999).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(catalog::root_sections(&store).await.unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_document_leaves_database_empty() {
    let tmp = TempDir::new().unwrap();
    let store = fresh_store(&tmp).await;

    let err = migrate(&store, "<Base><Section>", &MigrateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Parse(_)));
    assert_eq!(store.counts().await.unwrap(), TableCounts::default());
}

#[tokio::test]
async fn missing_schema_is_store_unavailable() {
    let tmp = TempDir::new().unwrap();
    let config = Config::with_db_path(tmp.path().join("empty.sqlite"));
    let store = SqliteStore::open(&config).await.unwrap();

    let err = migrate(&store, &fixture(), &MigrateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::StoreUnavailable(_)), "{}", err);
}

#[tokio::test]
async fn schema_rejects_duplicate_natural_keys() {
    let tmp = TempDir::new().unwrap();
    let store = fresh_store(&tmp).await;
    let record = ResourceRecord {
        kind: ResourceKind::AbstractResource,
        code: "91.01".to_string(),
        name: None,
        measure_unit: None,
        category: None,
        service_type: None,
    };

    store.insert_resource(&record).await.unwrap();
    assert!(store.insert_resource(&record).await.is_err());
    assert!(store.insert_item("x").await.is_ok());
    assert!(store.insert_item("x").await.is_err());
}

#[tokio::test]
async fn foreign_keys_are_enforced() {
    let tmp = TempDir::new().unwrap();
    let store = fresh_store(&tmp).await;

    assert!(store.insert_work_item(1, 1).await.is_err());
}

#[tokio::test]
async fn windows_1251_catalog_file_imports() {
    let tmp = TempDir::new().unwrap();
    let config = Config::with_db_path(tmp.path().join("pricebase.sqlite"));
    run_migrations(&config).await.unwrap();

    let xml = fixture().replacen("encoding=\"utf-8\"", "encoding=\"windows-1251\"", 1);
    let (bytes, _, unmappable) = encoding_rs::WINDOWS_1251.encode(&xml);
    assert!(!unmappable);
    let path = tmp.path().join("catalog-1251.xml");
    std::fs::write(&path, &bytes).unwrap();

    let report = import_file(&config, &path).await.unwrap();
    assert_eq!(report.stats.sections, 5);

    let store = SqliteStore::open(&config).await.unwrap();
    let decree: Option<String> = sqlx::query_scalar("SELECT decree FROM base")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(decree.as_deref(), Some("Приказ № 123/пр"));
}
