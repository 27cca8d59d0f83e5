//! Section search with ancestor closure.
//!
//! # Algorithm
//!
//! 1. Match: every section whose stored name contains the substring,
//!    compared after Unicode lower-casing. The empty substring matches every
//!    section.
//! 2. Closure: from each match, walk parent links upward, adding each
//!    ancestor. The walk stops at a root or at a node already collected.
//! 3. Order: emit the closure ascending by id and hand it to
//!    [`build_forest`](crate::hierarchy::build_forest).
//!
//! The resulting forest is pruned: an ancestor only carries the children
//! that are themselves matches or ancestors of matches.

use std::collections::{BTreeMap, HashMap};

use crate::error::CatalogError;
use crate::hierarchy::build_forest;
use crate::models::{RowId, SectionNode, SectionRow};
use crate::store::Store;

/// Whether `name` contains `needle`, ignoring case. `needle` must already be
/// lower-cased.
fn name_matches(name: Option<&str>, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    name.map(|n| n.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Matches plus all their ancestors, ascending by id.
///
/// `sections` is the complete section table. Ancestors missing from it are
/// skipped; [`build_forest`] reports them.
pub fn ancestor_closure(sections: &[SectionRow], substring: &str) -> Vec<SectionRow> {
    let needle = substring.to_lowercase();
    let index: HashMap<RowId, &SectionRow> = sections.iter().map(|s| (s.id, s)).collect();
    let mut closure: BTreeMap<RowId, &SectionRow> = BTreeMap::new();

    for matched in sections
        .iter()
        .filter(|s| name_matches(s.name.as_deref(), &needle))
    {
        let mut current = Some(matched);
        while let Some(section) = current {
            if closure.insert(section.id, section).is_some() {
                break;
            }
            current = section.parent_id.and_then(|p| index.get(&p).copied());
        }
    }

    closure.into_values().cloned().collect()
}

/// Runs the closure search against `store` and rebuilds the pruned forest.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    substring: &str,
) -> Result<Vec<SectionNode>, CatalogError> {
    let sections = store.sections().await?;
    let closure = ancestor_closure(&sections, substring);
    tracing::debug!(
        substring,
        total = sections.len(),
        matched = closure.len(),
        "section search"
    );
    Ok(build_forest(closure)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn row(id: RowId, name: &str, parent_id: Option<RowId>) -> SectionRow {
        SectionRow {
            id,
            name: Some(name.to_string()),
            kind: None,
            code: None,
            parent_id,
        }
    }

    fn sample() -> Vec<SectionRow> {
        vec![
            row(1, "Earthworks", None),
            row(2, "Excavation", Some(1)),
            row(3, "Pit digging", Some(2)),
            row(4, "Backfill", Some(1)),
            row(5, "Concrete", None),
            row(6, "Formwork", Some(5)),
        ]
    }

    fn ids(rows: &[SectionRow]) -> Vec<RowId> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn match_deep_in_tree_returns_single_chain() {
        let closure = ancestor_closure(&sample(), "pit");
        assert_eq!(ids(&closure), vec![1, 2, 3]);

        let forest = build_forest(closure).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, 1);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].id, 2);
        assert_eq!(forest[0].children[0].children[0].id, 3);
        assert!(forest[0].children[0].children[0].children.is_empty());
    }

    #[test]
    fn empty_substring_returns_every_section() {
        let closure = ancestor_closure(&sample(), "");
        assert_eq!(ids(&closure), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn matching_is_unicode_case_insensitive() {
        let rows = vec![
            row(1, "ЗЕМЛЯНЫЕ РАБОТЫ", None),
            row(2, "Разработка грунта", Some(1)),
        ];
        assert_eq!(ids(&ancestor_closure(&rows, "земляные")), vec![1]);
        assert_eq!(ids(&ancestor_closure(&rows, "ГРУНТА")), vec![1, 2]);
    }

    #[test]
    fn no_match_gives_empty_closure() {
        assert!(ancestor_closure(&sample(), "steel").is_empty());
    }

    #[test]
    fn closure_contains_matches_and_is_parent_closed() {
        let rows = sample();
        for needle in ["o", "work", "fill", "e"] {
            let closure = ancestor_closure(&rows, needle);
            let present: HashSet<RowId> = closure.iter().map(|r| r.id).collect();

            for s in rows.iter().filter(|s| name_matches(s.name.as_deref(), needle)) {
                assert!(present.contains(&s.id), "{} missing for {:?}", s.id, needle);
            }
            for s in &closure {
                if let Some(parent) = s.parent_id {
                    assert!(present.contains(&parent));
                }
            }
        }
    }

    #[test]
    fn corrupted_parent_cycle_still_terminates() {
        let rows = vec![row(1, "a", Some(2)), row(2, "b", Some(1))];
        assert_eq!(ids(&ancestor_closure(&rows, "a")), vec![1, 2]);
    }

    #[test]
    fn unnamed_sections_match_only_the_empty_substring() {
        let mut rows = sample();
        rows.push(SectionRow {
            id: 7,
            name: None,
            kind: None,
            code: None,
            parent_id: None,
        });
        assert!(!ids(&ancestor_closure(&rows, "a")).contains(&7));
        assert!(ids(&ancestor_closure(&rows, "")).contains(&7));
    }
}
