//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Tables are plain `Vec`s behind one `std::sync::RwLock`; a row's id is its
//! position plus one. Natural-key and association uniqueness, and the parent
//! references, are enforced the same way the SQLite schema enforces them.

use std::collections::BTreeSet;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{
    BaseRecord, CorrectionRecord, ItemRow, NameGroupRecord, NameGroupRow, PriceRecord,
    ResourceCategoryRecord, ResourceKind, ResourceRecord, RowId, SectionRecord, SectionRow,
    TableCounts, WorkRecord, WorkResourceRecord, WorkResourceView, WorkRow,
};

use super::Store;

#[derive(Default)]
struct Tables {
    bases: Vec<BaseRecord>,
    categories: Vec<ResourceCategoryRecord>,
    sections: Vec<SectionRecord>,
    name_groups: Vec<NameGroupRecord>,
    works: Vec<WorkRecord>,
    items: Vec<String>,
    work_items: BTreeSet<(RowId, RowId)>,
    resources: Vec<ResourceRecord>,
    abstract_resources: Vec<ResourceRecord>,
    service_resources: Vec<ResourceRecord>,
    work_resources: Vec<WorkResourceRecord>,
    prices: Vec<PriceRecord>,
    corrections: Vec<CorrectionRecord>,
}

impl Tables {
    fn resources_of(&self, kind: ResourceKind) -> &Vec<ResourceRecord> {
        match kind {
            ResourceKind::Resource => &self.resources,
            ResourceKind::AbstractResource => &self.abstract_resources,
            ResourceKind::ServiceResource => &self.service_resources,
        }
    }

    fn resources_of_mut(&mut self, kind: ResourceKind) -> &mut Vec<ResourceRecord> {
        match kind {
            ResourceKind::Resource => &mut self.resources,
            ResourceKind::AbstractResource => &mut self.abstract_resources,
            ResourceKind::ServiceResource => &mut self.service_resources,
        }
    }
}

/// In-memory store.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn next_id(len: usize) -> RowId {
    len as RowId + 1
}

fn exists(len: usize, id: RowId) -> bool {
    id >= 1 && id <= len as RowId
}

fn ensure_ref(len: usize, id: RowId, what: &str) -> Result<()> {
    if !exists(len, id) {
        bail!("FOREIGN KEY constraint failed: {} {} does not exist", what, id);
    }
    Ok(())
}

fn section_row(id: RowId, s: &SectionRecord) -> SectionRow {
    SectionRow {
        id,
        name: s.name.clone(),
        kind: s.kind.clone(),
        code: s.code.clone(),
        parent_id: s.parent_id,
    }
}

fn work_row(id: RowId, w: &WorkRecord) -> WorkRow {
    WorkRow {
        id,
        code: w.code.clone(),
        end_name: w.end_name.clone(),
        measure_unit: w.measure_unit.clone(),
        nr: w.nr.clone(),
        sp: w.sp.clone(),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_base(&self, base: &BaseRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        t.bases.push(base.clone());
        Ok(next_id(t.bases.len() - 1))
    }

    async fn insert_resource_category(&self, category: &ResourceCategoryRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.bases.len(), category.base_id, "base")?;
        t.categories.push(category.clone());
        Ok(next_id(t.categories.len() - 1))
    }

    async fn insert_section(&self, section: &SectionRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.bases.len(), section.base_id, "base")?;
        if let Some(category) = section.resource_category_id {
            ensure_ref(t.categories.len(), category, "resource category")?;
        }
        if let Some(parent) = section.parent_id {
            ensure_ref(t.sections.len(), parent, "section")?;
        }
        t.sections.push(section.clone());
        Ok(next_id(t.sections.len() - 1))
    }

    async fn insert_name_group(&self, group: &NameGroupRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.sections.len(), group.section_id, "section")?;
        t.name_groups.push(group.clone());
        Ok(next_id(t.name_groups.len() - 1))
    }

    async fn insert_work(&self, work: &WorkRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.name_groups.len(), work.name_group_id, "name group")?;
        t.works.push(work.clone());
        Ok(next_id(t.works.len() - 1))
    }

    async fn find_item(&self, text: &str) -> Result<Option<RowId>> {
        let t = self.tables.read().unwrap();
        Ok(t.items.iter().position(|i| i == text).map(next_id))
    }

    async fn insert_item(&self, text: &str) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        if t.items.iter().any(|i| i == text) {
            bail!("UNIQUE constraint failed: item.text");
        }
        t.items.push(text.to_string());
        Ok(next_id(t.items.len() - 1))
    }

    async fn find_resource(&self, kind: ResourceKind, code: &str) -> Result<Option<RowId>> {
        let t = self.tables.read().unwrap();
        Ok(t
            .resources_of(kind)
            .iter()
            .position(|r| r.code == code)
            .map(next_id))
    }

    async fn insert_resource(&self, resource: &ResourceRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        let table = t.resources_of_mut(resource.kind);
        if table.iter().any(|r| r.code == resource.code) {
            bail!("UNIQUE constraint failed: {}.code", resource.kind.label());
        }
        table.push(resource.clone());
        Ok(next_id(table.len() - 1))
    }

    async fn work_item_exists(&self, work_id: RowId, item_id: RowId) -> Result<bool> {
        let t = self.tables.read().unwrap();
        Ok(t.work_items.contains(&(work_id, item_id)))
    }

    async fn insert_work_item(&self, work_id: RowId, item_id: RowId) -> Result<()> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.works.len(), work_id, "work")?;
        ensure_ref(t.items.len(), item_id, "item")?;
        if !t.work_items.insert((work_id, item_id)) {
            bail!("UNIQUE constraint failed: work_item.work_id, work_item.item_id");
        }
        Ok(())
    }

    async fn work_resource_exists(
        &self,
        work_id: RowId,
        kind: ResourceKind,
        resource_id: RowId,
    ) -> Result<bool> {
        let t = self.tables.read().unwrap();
        Ok(t
            .work_resources
            .iter()
            .any(|l| l.work_id == work_id && l.kind == kind && l.resource_id == resource_id))
    }

    async fn insert_work_resource(&self, link: &WorkResourceRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.works.len(), link.work_id, "work")?;
        ensure_ref(t.resources_of(link.kind).len(), link.resource_id, link.kind.label())?;
        if t.work_resources.iter().any(|l| {
            l.work_id == link.work_id && l.kind == link.kind && l.resource_id == link.resource_id
        }) {
            bail!("UNIQUE constraint failed: work_resource");
        }
        t.work_resources.push(link.clone());
        Ok(next_id(t.work_resources.len() - 1))
    }

    async fn insert_price(&self, price: &PriceRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.works.len(), price.work_id, "work")?;
        t.prices.push(price.clone());
        Ok(next_id(t.prices.len() - 1))
    }

    async fn insert_correction(&self, correction: &CorrectionRecord) -> Result<RowId> {
        let mut t = self.tables.write().unwrap();
        ensure_ref(t.prices.len(), correction.price_id, "price")?;
        t.corrections.push(correction.clone());
        Ok(next_id(t.corrections.len() - 1))
    }

    async fn sections(&self) -> Result<Vec<SectionRow>> {
        let t = self.tables.read().unwrap();
        Ok(t.sections
            .iter()
            .enumerate()
            .map(|(i, s)| section_row(next_id(i), s))
            .collect())
    }

    async fn child_sections(&self, parent_id: RowId) -> Result<Vec<SectionRow>> {
        let t = self.tables.read().unwrap();
        Ok(t.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.parent_id == Some(parent_id))
            .map(|(i, s)| section_row(next_id(i), s))
            .collect())
    }

    async fn root_sections(&self) -> Result<Vec<SectionRow>> {
        let t = self.tables.read().unwrap();
        Ok(t.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.parent_id.is_none())
            .map(|(i, s)| section_row(next_id(i), s))
            .collect())
    }

    async fn name_groups(&self, section_id: RowId) -> Result<Vec<NameGroupRow>> {
        let t = self.tables.read().unwrap();
        Ok(t.name_groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.section_id == section_id)
            .map(|(i, g)| NameGroupRow {
                id: next_id(i),
                begin_name: g.begin_name.clone(),
            })
            .collect())
    }

    async fn works(&self, name_group_id: RowId) -> Result<Vec<WorkRow>> {
        let t = self.tables.read().unwrap();
        Ok(t.works
            .iter()
            .enumerate()
            .filter(|(_, w)| w.name_group_id == name_group_id)
            .map(|(i, w)| work_row(next_id(i), w))
            .collect())
    }

    async fn work(&self, id: RowId) -> Result<Option<WorkRow>> {
        let t = self.tables.read().unwrap();
        if !exists(t.works.len(), id) {
            return Ok(None);
        }
        Ok(Some(work_row(id, &t.works[(id - 1) as usize])))
    }

    async fn work_items(&self, work_id: RowId) -> Result<Vec<ItemRow>> {
        let t = self.tables.read().unwrap();
        Ok(t.work_items
            .range((work_id, RowId::MIN)..=(work_id, RowId::MAX))
            .map(|&(_, item_id)| ItemRow {
                id: item_id,
                text: t.items[(item_id - 1) as usize].clone(),
            })
            .collect())
    }

    async fn work_resources(&self, work_id: RowId) -> Result<Vec<WorkResourceView>> {
        let t = self.tables.read().unwrap();
        Ok(t.work_resources
            .iter()
            .filter(|l| l.work_id == work_id)
            .map(|l| {
                let resource = &t.resources_of(l.kind)[(l.resource_id - 1) as usize];
                WorkResourceView {
                    kind: l.kind,
                    resource_id: l.resource_id,
                    quantity: l.quantity.clone(),
                    measure_unit: l.measure_unit.clone(),
                    code: resource.code.clone(),
                    name: resource.name.clone(),
                }
            })
            .collect())
    }

    async fn counts(&self) -> Result<TableCounts> {
        let t = self.tables.read().unwrap();
        let n = |len: usize| len as i64;
        Ok(TableCounts {
            bases: n(t.bases.len()),
            resource_categories: n(t.categories.len()),
            sections: n(t.sections.len()),
            name_groups: n(t.name_groups.len()),
            works: n(t.works.len()),
            items: n(t.items.len()),
            work_items: n(t.work_items.len()),
            resources: n(t.resources.len()),
            abstract_resources: n(t.abstract_resources.len()),
            service_resources: n(t.service_resources.len()),
            work_resources: n(t.work_resources.len()),
            prices: n(t.prices.len()),
            corrections: n(t.corrections.len()),
        })
    }
}
