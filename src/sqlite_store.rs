//! SQLite-backed [`Store`] implementation.
//!
//! Each write is a single autocommitted statement. Natural keys and
//! association pairs are also protected by `UNIQUE` constraints in the
//! schema (see [`migrate`](crate::migrate)), so a second writer bypassing
//! the resolver still cannot create duplicates.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use pricebase_core::models::{
    BaseRecord, CorrectionRecord, ItemRow, NameGroupRecord, NameGroupRow, PriceRecord,
    ResourceCategoryRecord, ResourceKind, ResourceRecord, RowId, SectionRecord, SectionRow,
    TableCounts, WorkRecord, WorkResourceRecord, WorkResourceView, WorkRow,
};
use pricebase_core::store::Store;

use crate::config::Config;
use crate::db;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to the database named in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(db::connect(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn count(&self, table: &str) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

fn resource_table(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Resource => "resource",
        ResourceKind::AbstractResource => "abstract_resource",
        ResourceKind::ServiceResource => "service_resource",
    }
}

/// The `work_resource` column that references a resource of `kind`.
fn link_column(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Resource => "resource_id",
        ResourceKind::AbstractResource => "abstract_resource_id",
        ResourceKind::ServiceResource => "service_resource_id",
    }
}

fn section_row(row: &SqliteRow) -> SectionRow {
    SectionRow {
        id: row.get("id"),
        name: row.get("name"),
        kind: row.get("type"),
        code: row.get("code"),
        parent_id: row.get("parent_section_id"),
    }
}

fn work_row(row: &SqliteRow) -> WorkRow {
    WorkRow {
        id: row.get("id"),
        code: row.get("code"),
        end_name: row.get("end_name"),
        measure_unit: row.get("measure_unit"),
        nr: row.get("nr"),
        sp: row.get("sp"),
    }
}

fn work_resource_view(row: &SqliteRow) -> Option<WorkResourceView> {
    let (kind, resource_id) = ResourceKind::ALL
        .into_iter()
        .find_map(|kind| {
            row.get::<Option<RowId>, _>(link_column(kind))
                .map(|id| (kind, id))
        })?;
    Some(WorkResourceView {
        kind,
        resource_id,
        quantity: row.get("quantity"),
        measure_unit: row.get("measure_unit"),
        code: row.get::<Option<String>, _>("code").unwrap_or_default(),
        name: row.get("name"),
    })
}

const SECTION_COLUMNS: &str = "id, name, type, code, parent_section_id";
const WORK_COLUMNS: &str = "id, code, end_name, measure_unit, nr, sp";

#[async_trait]
impl Store for SqliteStore {
    /// Also fails when the schema has not been created yet.
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1 FROM base LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_base(&self, base: &BaseRecord) -> Result<RowId> {
        let id = sqlx::query(
            r#"
            INSERT INTO base (price_level, creation_date, creation_time, program_name,
                              base_name, base_type, decree)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&base.price_level)
        .bind(base.creation_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(base.creation_time.map(|t| t.format("%H:%M:%S").to_string()))
        .bind(&base.program_name)
        .bind(&base.base_name)
        .bind(&base.base_type)
        .bind(&base.decree)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn insert_resource_category(&self, category: &ResourceCategoryRecord) -> Result<RowId> {
        let id = sqlx::query("INSERT INTO resource_category (base_id, type, code_prefix) VALUES (?, ?, ?)")
            .bind(category.base_id)
            .bind(&category.kind)
            .bind(&category.code_prefix)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    async fn insert_section(&self, section: &SectionRecord) -> Result<RowId> {
        let id = sqlx::query(
            r#"
            INSERT INTO section (base_id, resource_category_id, parent_section_id, name, type, code)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(section.base_id)
        .bind(section.resource_category_id)
        .bind(section.parent_id)
        .bind(&section.name)
        .bind(&section.kind)
        .bind(&section.code)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn insert_name_group(&self, group: &NameGroupRecord) -> Result<RowId> {
        let id = sqlx::query("INSERT INTO name_group (section_id, begin_name) VALUES (?, ?)")
            .bind(group.section_id)
            .bind(&group.begin_name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    async fn insert_work(&self, work: &WorkRecord) -> Result<RowId> {
        let id = sqlx::query(
            r#"
            INSERT INTO work (name_group_id, code, end_name, measure_unit, nr, sp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(work.name_group_id)
        .bind(&work.code)
        .bind(&work.end_name)
        .bind(&work.measure_unit)
        .bind(&work.nr)
        .bind(&work.sp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn find_item(&self, text: &str) -> Result<Option<RowId>> {
        let id: Option<RowId> = sqlx::query_scalar("SELECT id FROM item WHERE text = ?")
            .bind(text)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_item(&self, text: &str) -> Result<RowId> {
        let id = sqlx::query("INSERT INTO item (text) VALUES (?)")
            .bind(text)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    async fn find_resource(&self, kind: ResourceKind, code: &str) -> Result<Option<RowId>> {
        let sql = format!("SELECT id FROM {} WHERE code = ?", resource_table(kind));
        let id: Option<RowId> = sqlx::query_scalar(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_resource(&self, resource: &ResourceRecord) -> Result<RowId> {
        let query = match resource.kind {
            ResourceKind::Resource => {
                sqlx::query("INSERT INTO resource (code, end_name, measure_unit) VALUES (?, ?, ?)")
                    .bind(&resource.code)
                    .bind(&resource.name)
                    .bind(&resource.measure_unit)
            }
            ResourceKind::AbstractResource => sqlx::query(
                "INSERT INTO abstract_resource (code, name, measure_unit) VALUES (?, ?, ?)",
            )
            .bind(&resource.code)
            .bind(&resource.name)
            .bind(&resource.measure_unit),
            ResourceKind::ServiceResource => sqlx::query(
                r#"
                INSERT INTO service_resource (code, category, name, measure_unit, type)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&resource.code)
            .bind(&resource.category)
            .bind(&resource.name)
            .bind(&resource.measure_unit)
            .bind(&resource.service_type),
        };
        let id = query.execute(&self.pool).await?.last_insert_rowid();
        Ok(id)
    }

    async fn work_item_exists(&self, work_id: RowId, item_id: RowId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM work_item WHERE work_id = ? AND item_id = ?")
                .bind(work_id)
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_work_item(&self, work_id: RowId, item_id: RowId) -> Result<()> {
        sqlx::query("INSERT INTO work_item (work_id, item_id) VALUES (?, ?)")
            .bind(work_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn work_resource_exists(
        &self,
        work_id: RowId,
        kind: ResourceKind,
        resource_id: RowId,
    ) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) > 0 FROM work_resource WHERE work_id = ? AND {} = ?",
            link_column(kind)
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(work_id)
            .bind(resource_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert_work_resource(&self, link: &WorkResourceRecord) -> Result<RowId> {
        let sql = format!(
            "INSERT INTO work_resource (work_id, {}, quantity, measure_unit) VALUES (?, ?, ?, ?)",
            link_column(link.kind)
        );
        let id = sqlx::query(&sql)
            .bind(link.work_id)
            .bind(link.resource_id)
            .bind(&link.quantity)
            .bind(&link.measure_unit)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    async fn insert_price(&self, price: &PriceRecord) -> Result<RowId> {
        let id = sqlx::query(
            r#"
            INSERT INTO price (work_id, cost, salary, salary_mach, machines, materials)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(price.work_id)
        .bind(price.cost)
        .bind(price.salary)
        .bind(price.salary_mach)
        .bind(price.machines)
        .bind(price.materials)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn insert_correction(&self, correction: &CorrectionRecord) -> Result<RowId> {
        let id = sqlx::query(
            "INSERT INTO correction (price_id, coeff, from_field, to_field) VALUES (?, ?, ?, ?)",
        )
        .bind(correction.price_id)
        .bind(correction.coeff)
        .bind(&correction.from_field)
        .bind(&correction.to_field)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn sections(&self) -> Result<Vec<SectionRow>> {
        let rows = sqlx::query(&format!("SELECT {} FROM section ORDER BY id", SECTION_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(section_row).collect())
    }

    async fn child_sections(&self, parent_id: RowId) -> Result<Vec<SectionRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM section WHERE parent_section_id = ? ORDER BY id",
            SECTION_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(section_row).collect())
    }

    async fn root_sections(&self) -> Result<Vec<SectionRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM section WHERE parent_section_id IS NULL ORDER BY id",
            SECTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(section_row).collect())
    }

    async fn name_groups(&self, section_id: RowId) -> Result<Vec<NameGroupRow>> {
        let rows = sqlx::query("SELECT id, begin_name FROM name_group WHERE section_id = ? ORDER BY id")
            .bind(section_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| NameGroupRow {
                id: row.get("id"),
                begin_name: row.get("begin_name"),
            })
            .collect())
    }

    async fn works(&self, name_group_id: RowId) -> Result<Vec<WorkRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM work WHERE name_group_id = ? ORDER BY id",
            WORK_COLUMNS
        ))
        .bind(name_group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(work_row).collect())
    }

    async fn work(&self, id: RowId) -> Result<Option<WorkRow>> {
        let row = sqlx::query(&format!("SELECT {} FROM work WHERE id = ?", WORK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(work_row))
    }

    async fn work_items(&self, work_id: RowId) -> Result<Vec<ItemRow>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.text
            FROM work_item wi
            JOIN item i ON i.id = wi.item_id
            WHERE wi.work_id = ?
            ORDER BY i.id
            "#,
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| ItemRow {
                id: row.get("id"),
                text: row.get("text"),
            })
            .collect())
    }

    async fn work_resources(&self, work_id: RowId) -> Result<Vec<WorkResourceView>> {
        let rows = sqlx::query(
            r#"
            SELECT wr.resource_id, wr.abstract_resource_id, wr.service_resource_id,
                   wr.quantity, wr.measure_unit,
                   COALESCE(r.code, a.code, s.code) AS code,
                   COALESCE(r.end_name, a.name, s.name) AS name
            FROM work_resource wr
            LEFT JOIN resource r ON r.id = wr.resource_id
            LEFT JOIN abstract_resource a ON a.id = wr.abstract_resource_id
            LEFT JOIN service_resource s ON s.id = wr.service_resource_id
            WHERE wr.work_id = ?
            ORDER BY wr.id
            "#,
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().filter_map(work_resource_view).collect())
    }

    async fn counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            bases: self.count("base").await?,
            resource_categories: self.count("resource_category").await?,
            sections: self.count("section").await?,
            name_groups: self.count("name_group").await?,
            works: self.count("work").await?,
            items: self.count("item").await?,
            work_items: self.count("work_item").await?,
            resources: self.count("resource").await?,
            abstract_resources: self.count("abstract_resource").await?,
            service_resources: self.count("service_resource").await?,
            work_resources: self.count("work_resource").await?,
            prices: self.count("price").await?,
            corrections: self.count("correction").await?,
        })
    }
}
