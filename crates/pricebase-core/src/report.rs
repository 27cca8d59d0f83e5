//! Import outcome accumulation.
//!
//! Every step of the walk returns a [`WalkOutcome`]: row counters plus the
//! recoverable issues it ran into. Parents absorb their children's outcomes,
//! so the root of the walk ends up holding the whole run's summary, which is
//! returned to the caller as an [`ImportReport`].

use std::fmt;
use std::ops::AddAssign;

use serde::Serialize;

use crate::models::{ResourceKind, RowId};

/// Which association a duplicate was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    Item,
    Resource,
    AbstractResource,
    ServiceResource,
}

impl From<ResourceKind> for AssociationKind {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Resource => AssociationKind::Resource,
            ResourceKind::AbstractResource => AssociationKind::AbstractResource,
            ResourceKind::ServiceResource => AssociationKind::ServiceResource,
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssociationKind::Item => "item",
            AssociationKind::Resource => ResourceKind::Resource.label(),
            AssociationKind::AbstractResource => ResourceKind::AbstractResource.label(),
            AssociationKind::ServiceResource => ResourceKind::ServiceResource.label(),
        })
    }
}

/// A recoverable problem found while importing one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ImportIssue {
    /// The association already existed; the second link was skipped.
    DuplicateAssociation {
        kind: AssociationKind,
        key: String,
        work_code: String,
    },
    /// An attribute was present but could not be interpreted; stored as null.
    InvalidValue {
        element: &'static str,
        attribute: &'static str,
        value: String,
        context: String,
    },
    /// An attribute the element cannot be stored without was absent.
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        context: String,
    },
    /// The store rejected the row; the element and its subtree were skipped.
    RowFailed {
        element: &'static str,
        context: String,
        message: String,
    },
}

impl ImportIssue {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ImportIssue::DuplicateAssociation { .. })
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportIssue::DuplicateAssociation {
                kind,
                key,
                work_code,
            } => write!(f, "duplicate {} {} for work {}", kind, key, work_code),
            ImportIssue::InvalidValue {
                element,
                attribute,
                value,
                context,
            } => write!(
                f,
                "invalid {}@{} value {:?} in {}; stored as null",
                element, attribute, value, context
            ),
            ImportIssue::MissingAttribute {
                element,
                attribute,
                context,
            } => write!(f, "{} without {} in {}; skipped", element, attribute, context),
            ImportIssue::RowFailed {
                element,
                context,
                message,
            } => write!(f, "failed to store {} {}: {}", element, context, message),
        }
    }
}

/// Rows written by (part of) an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub resource_categories: u64,
    pub sections: u64,
    pub name_groups: u64,
    pub works: u64,
    pub items_created: u64,
    pub items_linked: u64,
    pub resources_created: u64,
    pub resources_linked: u64,
    pub prices: u64,
    pub corrections: u64,
}

impl AddAssign<&ImportStats> for ImportStats {
    fn add_assign(&mut self, other: &ImportStats) {
        self.resource_categories += other.resource_categories;
        self.sections += other.sections;
        self.name_groups += other.name_groups;
        self.works += other.works;
        self.items_created += other.items_created;
        self.items_linked += other.items_linked;
        self.resources_created += other.resources_created;
        self.resources_linked += other.resources_linked;
        self.prices += other.prices;
        self.corrections += other.corrections;
    }
}

/// Partial result of one recursive step.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    pub stats: ImportStats,
    pub issues: Vec<ImportIssue>,
}

impl WalkOutcome {
    /// Records an issue and logs it.
    pub fn record(&mut self, issue: ImportIssue) {
        tracing::warn!("{}", issue);
        self.issues.push(issue);
    }

    /// Folds a child step's outcome into this one, keeping issue order.
    pub fn absorb(&mut self, child: WalkOutcome) {
        self.stats += &child.stats;
        self.issues.extend(child.issues);
    }
}

/// Final summary of an import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub base_id: RowId,
    pub stats: ImportStats,
    pub issues: Vec<ImportIssue>,
}

impl ImportReport {
    pub fn new(base_id: RowId, outcome: WalkOutcome) -> Self {
        Self {
            base_id,
            stats: outcome.stats,
            issues: outcome.issues,
        }
    }

    /// True when the run recorded no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn duplicates(&self) -> impl Iterator<Item = &ImportIssue> {
        self.issues.iter().filter(|i| i.is_duplicate())
    }

    /// Human-readable issue messages, in the order they were recorded.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_names_resource_and_work() {
        let issue = ImportIssue::DuplicateAssociation {
            kind: AssociationKind::from(ResourceKind::ServiceResource),
            key: "R1".to_string(),
            work_code: "W1".to_string(),
        };
        assert_eq!(issue.to_string(), "duplicate service resource R1 for work W1");
    }

    #[test]
    fn association_labels_follow_resource_kinds() {
        for kind in [
            ResourceKind::Resource,
            ResourceKind::AbstractResource,
            ResourceKind::ServiceResource,
        ] {
            assert_eq!(AssociationKind::from(kind).to_string(), kind.label());
        }
        assert_eq!(AssociationKind::Item.to_string(), "item");
    }

    #[test]
    fn absorb_sums_stats_and_keeps_issue_order() {
        let mut parent = WalkOutcome::default();
        parent.stats.sections = 1;
        parent.record(ImportIssue::MissingAttribute {
            element: "Item",
            attribute: "Text",
            context: "work W1".to_string(),
        });

        let mut child = WalkOutcome::default();
        child.stats.sections = 2;
        child.stats.works = 3;
        child.record(ImportIssue::RowFailed {
            element: "Work",
            context: "W2".to_string(),
            message: "boom".to_string(),
        });

        parent.absorb(child);
        assert_eq!(parent.stats.sections, 3);
        assert_eq!(parent.stats.works, 3);
        assert_eq!(parent.issues.len(), 2);
        assert!(matches!(parent.issues[1], ImportIssue::RowFailed { .. }));

        let report = ImportReport::new(7, parent);
        assert!(!report.is_clean());
        assert_eq!(report.duplicates().count(), 0);
        assert_eq!(report.messages()[0], "Item without Text in work W1; skipped");
    }
}
