//! Data model shared by the import walker, the stores, and the read API.
//!
//! `*Record` types are rows about to be written (no id yet). `*Row` and
//! `*View` types are what the read side gets back from a [`Store`](crate::store::Store).

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// Store-assigned row identifier.
pub type RowId = i64;

/// Header of one imported catalog document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseRecord {
    pub price_level: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub creation_time: Option<NaiveTime>,
    pub program_name: Option<String>,
    pub base_name: Option<String>,
    pub base_type: Option<String>,
    pub decree: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCategoryRecord {
    pub base_id: RowId,
    pub kind: Option<String>,
    pub code_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub base_id: RowId,
    pub resource_category_id: Option<RowId>,
    pub parent_id: Option<RowId>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameGroupRecord {
    pub section_id: RowId,
    pub begin_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkRecord {
    pub name_group_id: RowId,
    pub code: Option<String>,
    pub end_name: Option<String>,
    pub measure_unit: Option<String>,
    pub nr: Option<String>,
    pub sp: Option<String>,
}

/// The three resource taxonomies a work can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Resource,
    AbstractResource,
    ServiceResource,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Resource,
        ResourceKind::AbstractResource,
        ResourceKind::ServiceResource,
    ];

    /// Maps a catalog element name (`Resource`, `AbstractResource`,
    /// `ServiceResource`) to its kind.
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "Resource" => Some(ResourceKind::Resource),
            "AbstractResource" => Some(ResourceKind::AbstractResource),
            "ServiceResource" => Some(ResourceKind::ServiceResource),
            _ => None,
        }
    }

    pub fn element(&self) -> &'static str {
        match self {
            ResourceKind::Resource => "Resource",
            ResourceKind::AbstractResource => "AbstractResource",
            ResourceKind::ServiceResource => "ServiceResource",
        }
    }

    /// Human label used in import messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Resource => "resource",
            ResourceKind::AbstractResource => "abstract resource",
            ResourceKind::ServiceResource => "service resource",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A resource of any kind, keyed globally by `(kind, code)`.
///
/// `name` holds `EndName` for plain resources and `Name` for the other two.
/// `category` and `service_type` are only present on service resources.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub code: String,
    pub name: Option<String>,
    pub measure_unit: Option<String>,
    pub category: Option<String>,
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkResourceRecord {
    pub work_id: RowId,
    pub kind: ResourceKind,
    pub resource_id: RowId,
    pub quantity: Option<String>,
    pub measure_unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceRecord {
    pub work_id: RowId,
    pub cost: Option<f64>,
    pub salary: Option<f64>,
    pub salary_mach: Option<f64>,
    pub machines: Option<f64>,
    pub materials: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionRecord {
    pub price_id: RowId,
    pub coeff: Option<f64>,
    pub from_field: Option<String>,
    pub to_field: Option<String>,
}

// ---------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------

/// One flat section row as stored: the input of the hierarchy builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRow {
    pub id: RowId,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "parent_section_id")]
    pub parent_id: Option<RowId>,
}

/// A section with its (possibly pruned) children, ascending by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionNode {
    pub id: RowId,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "parent_section_id")]
    pub parent_id: Option<RowId>,
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    /// A node with no children attached yet.
    pub fn leaf(row: SectionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            kind: row.kind,
            code: row.code,
            parent_id: row.parent_id,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameGroupRow {
    pub id: RowId,
    pub begin_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkRow {
    pub id: RowId,
    pub code: Option<String>,
    pub end_name: Option<String>,
    pub measure_unit: Option<String>,
    pub nr: Option<String>,
    pub sp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub id: RowId,
    pub text: String,
}

/// A work-resource link joined with the linked resource's code and name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkResourceView {
    pub kind: ResourceKind,
    pub resource_id: RowId,
    pub quantity: Option<String>,
    pub measure_unit: Option<String>,
    pub code: String,
    pub name: Option<String>,
}

/// Everything known about one work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkDetail {
    #[serde(flatten)]
    pub work: WorkRow,
    pub items: Vec<ItemRow>,
    pub resources: Vec<WorkResourceView>,
}

/// Row counts per relation, used by `pbase stats` and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub bases: i64,
    pub resource_categories: i64,
    pub sections: i64,
    pub name_groups: i64,
    pub works: i64,
    pub items: i64,
    pub work_items: i64,
    pub resources: i64,
    pub abstract_resources: i64,
    pub service_resources: i64,
    pub work_resources: i64,
    pub prices: i64,
    pub corrections: i64,
}
