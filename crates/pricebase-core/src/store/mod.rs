//! Storage abstraction for Pricebase.
//!
//! The [`Store`] trait is the relational writer used by the import walker
//! and the query surface used by the read API. Every write method persists
//! exactly one row and commits it on its own; there is no transaction
//! spanning a document or a work.
//!
//! Implementations must be `Send + Sync` so sibling branches of an import
//! can share one store.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    BaseRecord, CorrectionRecord, ItemRow, NameGroupRecord, NameGroupRow, PriceRecord,
    ResourceCategoryRecord, ResourceKind, ResourceRecord, RowId, SectionRecord, SectionRow,
    TableCounts, WorkRecord, WorkResourceRecord, WorkResourceView, WorkRow,
};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ping`](Store::ping) | Connectivity probe run before an import |
/// | `insert_*` | Plain inserts returning the generated id |
/// | [`find_item`](Store::find_item) / [`find_resource`](Store::find_resource) | Natural-key lookups for the resolver |
/// | [`work_item_exists`](Store::work_item_exists) / [`work_resource_exists`](Store::work_resource_exists) | Association duplicate checks |
/// | [`sections`](Store::sections) | Every section, ascending id (search input) |
/// | [`child_sections`](Store::child_sections) / [`root_sections`](Store::root_sections) | Adjacency slices |
/// | [`name_groups`](Store::name_groups) / [`works`](Store::works) / [`work`](Store::work) | Browsing |
/// | [`work_items`](Store::work_items) / [`work_resources`](Store::work_resources) | Work detail joins |
#[async_trait]
pub trait Store: Send + Sync {
    /// Fails if the backend cannot be reached.
    async fn ping(&self) -> Result<()>;

    async fn insert_base(&self, base: &BaseRecord) -> Result<RowId>;

    async fn insert_resource_category(&self, category: &ResourceCategoryRecord) -> Result<RowId>;

    async fn insert_section(&self, section: &SectionRecord) -> Result<RowId>;

    async fn insert_name_group(&self, group: &NameGroupRecord) -> Result<RowId>;

    async fn insert_work(&self, work: &WorkRecord) -> Result<RowId>;

    async fn find_item(&self, text: &str) -> Result<Option<RowId>>;

    async fn insert_item(&self, text: &str) -> Result<RowId>;

    async fn find_resource(&self, kind: ResourceKind, code: &str) -> Result<Option<RowId>>;

    async fn insert_resource(&self, resource: &ResourceRecord) -> Result<RowId>;

    async fn work_item_exists(&self, work_id: RowId, item_id: RowId) -> Result<bool>;

    async fn insert_work_item(&self, work_id: RowId, item_id: RowId) -> Result<()>;

    async fn work_resource_exists(
        &self,
        work_id: RowId,
        kind: ResourceKind,
        resource_id: RowId,
    ) -> Result<bool>;

    async fn insert_work_resource(&self, link: &WorkResourceRecord) -> Result<RowId>;

    async fn insert_price(&self, price: &PriceRecord) -> Result<RowId>;

    async fn insert_correction(&self, correction: &CorrectionRecord) -> Result<RowId>;

    /// Every section, ordered by ascending id.
    async fn sections(&self) -> Result<Vec<SectionRow>>;

    /// Direct children of `parent_id`, ordered by ascending id.
    async fn child_sections(&self, parent_id: RowId) -> Result<Vec<SectionRow>>;

    /// Sections with no parent, ordered by ascending id.
    async fn root_sections(&self) -> Result<Vec<SectionRow>>;

    async fn name_groups(&self, section_id: RowId) -> Result<Vec<NameGroupRow>>;

    async fn works(&self, name_group_id: RowId) -> Result<Vec<WorkRow>>;

    async fn work(&self, id: RowId) -> Result<Option<WorkRow>>;

    /// Items linked to a work, ordered by item id.
    async fn work_items(&self, work_id: RowId) -> Result<Vec<ItemRow>>;

    /// Resource links of a work in link order, joined with the resource's
    /// code and name.
    async fn work_resources(&self, work_id: RowId) -> Result<Vec<WorkResourceView>>;

    async fn counts(&self) -> Result<TableCounts>;
}
