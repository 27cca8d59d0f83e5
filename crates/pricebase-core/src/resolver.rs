//! Natural-key deduplication for the globally shared tables.
//!
//! Items are keyed by their text; the three resource kinds by their code.
//! Each namespace has its own cache behind its own async mutex, held across
//! the whole find-then-insert sequence, so concurrent branches of one import
//! can never create two rows for the same key.
//!
//! Association links (work-item, work-resource) are exactly-once: a second
//! link for the same pair is skipped and reported as a
//! [`ImportIssue::DuplicateAssociation`].

use std::collections::HashMap;

use anyhow::Result;
use futures::lock::Mutex;

use crate::models::{ResourceKind, ResourceRecord, RowId, WorkResourceRecord};
use crate::report::{AssociationKind, ImportIssue, WalkOutcome};
use crate::store::Store;

/// A lookup key for [`EntityResolver::lookup_or_create`], carrying the
/// attributes to insert when the key is new.
#[derive(Debug, Clone, Copy)]
pub enum NaturalKey<'a> {
    Item(&'a str),
    Resource(&'a ResourceRecord),
}

impl<'a> NaturalKey<'a> {
    fn key(&self) -> &'a str {
        match *self {
            NaturalKey::Item(text) => text,
            NaturalKey::Resource(record) => record.code.as_str(),
        }
    }
}

/// Result of a lookup-or-create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: RowId,
    /// True when this call inserted the row.
    pub created: bool,
}

/// Per-run dedup cache.
#[derive(Default)]
pub struct EntityResolver {
    items: Mutex<HashMap<String, RowId>>,
    resources: Mutex<HashMap<String, RowId>>,
    abstract_resources: Mutex<HashMap<String, RowId>>,
    service_resources: Mutex<HashMap<String, RowId>>,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, key: &NaturalKey<'_>) -> &Mutex<HashMap<String, RowId>> {
        match key {
            NaturalKey::Item(_) => &self.items,
            NaturalKey::Resource(record) => match record.kind {
                ResourceKind::Resource => &self.resources,
                ResourceKind::AbstractResource => &self.abstract_resources,
                ResourceKind::ServiceResource => &self.service_resources,
            },
        }
    }

    /// Returns the id of the row with this natural key, inserting it first
    /// if no such row exists. When the row exists, its stored attributes win
    /// over the ones passed in.
    pub async fn lookup_or_create<S: Store + ?Sized>(
        &self,
        store: &S,
        key: NaturalKey<'_>,
    ) -> Result<Resolved> {
        let mut cache = self.namespace(&key).lock().await;
        if let Some(&id) = cache.get(key.key()) {
            return Ok(Resolved { id, created: false });
        }

        let existing = match key {
            NaturalKey::Item(text) => store.find_item(text).await?,
            NaturalKey::Resource(record) => store.find_resource(record.kind, &record.code).await?,
        };
        let resolved = match existing {
            Some(id) => Resolved { id, created: false },
            None => {
                let id = match key {
                    NaturalKey::Item(text) => store.insert_item(text).await?,
                    NaturalKey::Resource(record) => store.insert_resource(record).await?,
                };
                tracing::debug!(key = key.key(), id, "created shared row");
                Resolved { id, created: true }
            }
        };

        cache.insert(key.key().to_string(), resolved.id);
        Ok(resolved)
    }

    /// Links an item to a work unless that pair is already linked.
    ///
    /// Returns `Ok(true)` when a row was written and `Ok(false)` when the
    /// duplicate was recorded in `outcome` instead.
    pub async fn link_work_item<S: Store + ?Sized>(
        &self,
        store: &S,
        work_id: RowId,
        item_id: RowId,
        labels: LinkLabels<'_>,
        outcome: &mut WalkOutcome,
    ) -> Result<bool> {
        if store.work_item_exists(work_id, item_id).await? {
            outcome.record(labels.duplicate(AssociationKind::Item));
            return Ok(false);
        }
        store.insert_work_item(work_id, item_id).await?;
        Ok(true)
    }

    /// Links a resource of one kind to a work unless the `(work, kind,
    /// resource)` triple is already linked.
    ///
    /// Returns `Ok(true)` when a row was written and `Ok(false)` when the
    /// duplicate was recorded in `outcome` instead.
    pub async fn link_work_resource<S: Store + ?Sized>(
        &self,
        store: &S,
        link: &WorkResourceRecord,
        labels: LinkLabels<'_>,
        outcome: &mut WalkOutcome,
    ) -> Result<bool> {
        if store
            .work_resource_exists(link.work_id, link.kind, link.resource_id)
            .await?
        {
            outcome.record(labels.duplicate(link.kind.into()));
            return Ok(false);
        }
        store.insert_work_resource(link).await?;
        Ok(true)
    }
}

/// Natural keys of both sides of a link, used in duplicate messages.
#[derive(Debug, Clone, Copy)]
pub struct LinkLabels<'a> {
    pub key: &'a str,
    pub work_code: &'a str,
}

impl LinkLabels<'_> {
    fn duplicate(&self, kind: AssociationKind) -> ImportIssue {
        ImportIssue::DuplicateAssociation {
            kind,
            key: self.key.to_string(),
            work_code: self.work_code.to_string(),
        }
    }
}
