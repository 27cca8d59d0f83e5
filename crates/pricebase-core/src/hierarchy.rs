//! Rebuilds a section forest from flat `{id, parent_id}` rows.
//!
//! Rows are indexed by id, then each row is attached under its parent or,
//! when it has none, to the root list. Children end up ordered by ascending
//! id regardless of input order. A row whose parent is absent from the set
//! is rejected rather than silently promoted to a root, and rows that can
//! never be reached from a root (a parent cycle) are rejected as well.

use std::collections::BTreeMap;

use crate::error::HierarchyError;
use crate::models::{RowId, SectionNode, SectionRow};

/// Builds the forest for `rows`. Every row appears exactly once in the
/// output. Duplicate ids keep the first row.
pub fn build_forest(rows: Vec<SectionRow>) -> Result<Vec<SectionNode>, HierarchyError> {
    let mut by_id: BTreeMap<RowId, SectionRow> = BTreeMap::new();
    for row in rows {
        by_id.entry(row.id).or_insert(row);
    }

    let mut children: BTreeMap<RowId, Vec<RowId>> = BTreeMap::new();
    let mut roots: Vec<RowId> = Vec::new();
    for row in by_id.values() {
        match row.parent_id {
            None => roots.push(row.id),
            Some(parent_id) if by_id.contains_key(&parent_id) => {
                children.entry(parent_id).or_default().push(row.id);
            }
            Some(parent_id) => {
                return Err(HierarchyError::MissingParent {
                    id: row.id,
                    parent_id,
                })
            }
        }
    }

    let forest: Vec<SectionNode> = roots
        .into_iter()
        .filter_map(|id| attach(id, &mut by_id, &children))
        .collect();

    if !by_id.is_empty() {
        return Err(HierarchyError::Cycle {
            ids: by_id.into_keys().collect(),
        });
    }
    Ok(forest)
}

/// Moves `id` out of the index and recursively attaches its children.
fn attach(
    id: RowId,
    by_id: &mut BTreeMap<RowId, SectionRow>,
    children: &BTreeMap<RowId, Vec<RowId>>,
) -> Option<SectionNode> {
    let row = by_id.remove(&id)?;
    let mut node = SectionNode::leaf(row);
    if let Some(ids) = children.get(&id) {
        node.children = ids
            .iter()
            .filter_map(|&child| attach(child, by_id, children))
            .collect();
    }
    Some(node)
}
