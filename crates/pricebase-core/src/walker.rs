//! Recursive import of one catalog document.
//!
//! [`migrate`] checks the store, parses the whole document, writes the base
//! row and then descends `ResourceCategory → Section* → NameGroup → Work`.
//! Every entity is written before its children so they can reference its
//! id. Each step returns a [`WalkOutcome`] that its parent absorbs. The
//! conditions that end a run early are listed on [`migrate`].
//!
//! Sibling works under one name group are driven through
//! `futures::stream::buffered`, so up to [`MigrateOptions::concurrency`] of
//! them are in flight at once while their outcomes are still absorbed in
//! document order.

use chrono::{NaiveDate, NaiveTime};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};

use crate::document::{self, Element};
use crate::error::ImportError;
use crate::models::{
    BaseRecord, CorrectionRecord, NameGroupRecord, PriceRecord, ResourceCategoryRecord,
    ResourceKind, ResourceRecord, RowId, SectionRecord, WorkRecord, WorkResourceRecord,
};
use crate::report::{ImportIssue, ImportReport, WalkOutcome};
use crate::resolver::{EntityResolver, LinkLabels, NaturalKey};
use crate::store::Store;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Knobs for one import run.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Maximum number of sibling works processed at once. Values below 1
    /// are treated as 1.
    pub concurrency: usize,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Imports one catalog document into `store`.
///
/// Returns the run's report, which may carry recoverable issues. Fails only
/// when the store is unreachable ([`ImportError::StoreUnavailable`]), the
/// markup is malformed ([`ImportError::Parse`], nothing written), or the
/// base row itself cannot be stored.
pub async fn migrate(
    store: &dyn Store,
    xml: &str,
    options: &MigrateOptions,
) -> Result<ImportReport, ImportError> {
    ensure_reachable(store).await?;
    let root = document::parse(xml)?;
    import_root(store, &root, options).await
}

/// Like [`migrate`], for raw file contents. The bytes are decoded by their
/// byte order mark or XML declaration first; an unknown or violated
/// encoding is an [`ImportError::Parse`].
pub async fn migrate_bytes(
    store: &dyn Store,
    bytes: &[u8],
    options: &MigrateOptions,
) -> Result<ImportReport, ImportError> {
    ensure_reachable(store).await?;
    let xml = document::decode(bytes)?;
    let root = document::parse(&xml)?;
    import_root(store, &root, options).await
}

async fn ensure_reachable(store: &dyn Store) -> Result<(), ImportError> {
    store
        .ping()
        .await
        .map_err(|e| ImportError::StoreUnavailable(format!("{:#}", e)))
}

async fn import_root(
    store: &dyn Store,
    root: &Element,
    options: &MigrateOptions,
) -> Result<ImportReport, ImportError> {
    let mut outcome = WalkOutcome::default();
    let base = base_record(root, &mut outcome);
    let base_id = store.insert_base(&base).await?;
    tracing::info!(base_id, base_name = ?base.base_name, "base stored");

    let walker = Walker {
        store,
        resolver: EntityResolver::new(),
        concurrency: options.concurrency.max(1),
    };
    for category in root.grouped("ResourcesDirectory", "ResourceCategory") {
        let child = walker.walk_category(category, base_id).await;
        outcome.absorb(child);
    }

    let report = ImportReport::new(base_id, outcome);
    tracing::info!(
        base_id,
        sections = report.stats.sections,
        works = report.stats.works,
        issues = report.issues.len(),
        "import finished"
    );
    Ok(report)
}

/// Ids threaded down the recursion.
#[derive(Debug, Clone, Copy)]
struct WalkContext {
    base_id: RowId,
    resource_category_id: Option<RowId>,
    parent_section_id: Option<RowId>,
}

struct Walker<'a> {
    store: &'a dyn Store,
    resolver: EntityResolver,
    concurrency: usize,
}

impl<'a> Walker<'a> {
    async fn walk_category(&self, category: &Element, base_id: RowId) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let record = ResourceCategoryRecord {
            base_id,
            kind: category.attr_owned("Type"),
            code_prefix: category.attr_owned("CodePrefix"),
        };
        let label = describe(&[record.kind.as_deref(), record.code_prefix.as_deref()]);

        let category_id = match self.store.insert_resource_category(&record).await {
            Ok(id) => id,
            Err(e) => {
                outcome.record(row_failed("ResourceCategory", label, e));
                return outcome;
            }
        };
        outcome.stats.resource_categories += 1;
        tracing::info!(category_id, category = %label, "resource category stored");

        let ctx = WalkContext {
            base_id,
            resource_category_id: Some(category_id),
            parent_section_id: None,
        };
        for section in category.children_named("Section") {
            let child = self.walk_section(section, ctx).await;
            outcome.absorb(child);
        }
        outcome
    }

    fn walk_section<'b>(&'b self, section: &'b Element, ctx: WalkContext) -> BoxFuture<'b, WalkOutcome> {
        async move {
            let mut outcome = WalkOutcome::default();
            let record = SectionRecord {
                base_id: ctx.base_id,
                resource_category_id: ctx.resource_category_id,
                parent_id: ctx.parent_section_id,
                name: section.attr_owned("Name"),
                kind: section.attr_owned("Type"),
                code: section.attr_owned("Code"),
            };
            let label = describe(&[record.code.as_deref(), record.name.as_deref()]);

            let section_id = match self.store.insert_section(&record).await {
                Ok(id) => id,
                Err(e) => {
                    outcome.record(row_failed("Section", label, e));
                    return outcome;
                }
            };
            outcome.stats.sections += 1;
            tracing::debug!(section_id, parent_id = ?ctx.parent_section_id, "section stored");

            let nested = WalkContext {
                parent_section_id: Some(section_id),
                ..ctx
            };
            for child in section.children_named("Section") {
                let child_outcome = self.walk_section(child, nested).await;
                outcome.absorb(child_outcome);
            }
            for group in section.children_named("NameGroup") {
                let child_outcome = self.walk_name_group(group, section_id).await;
                outcome.absorb(child_outcome);
            }
            outcome
        }
        .boxed()
    }

    async fn walk_name_group(&self, group: &Element, section_id: RowId) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let record = NameGroupRecord {
            section_id,
            begin_name: group.attr_owned("BeginName"),
        };

        let group_id = match self.store.insert_name_group(&record).await {
            Ok(id) => id,
            Err(e) => {
                let label = describe(&[record.begin_name.as_deref()]);
                outcome.record(row_failed("NameGroup", label, e));
                return outcome;
            }
        };
        outcome.stats.name_groups += 1;

        let pending: Vec<_> = group
            .children_named("Work")
            .map(|work| self.walk_work(work, group_id))
            .collect();
        let works: Vec<WalkOutcome> = futures::stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await;
        for child in works {
            outcome.absorb(child);
        }
        outcome
    }

    async fn walk_work(&self, work: &Element, name_group_id: RowId) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let reason = work.grouped("NrSp", "ReasonItem").next();
        let record = WorkRecord {
            name_group_id,
            code: work.attr_owned("Code"),
            end_name: work.attr_owned("EndName"),
            measure_unit: work.attr_owned("MeasureUnit"),
            nr: reason.and_then(|r| r.attr_owned("Nr")),
            sp: reason.and_then(|r| r.attr_owned("Sp")),
        };
        let work_code = record.code.as_deref().unwrap_or("<no code>");
        let context = format!("work {}", work_code);

        let work_id = match self.store.insert_work(&record).await {
            Ok(id) => id,
            Err(e) => {
                outcome.record(row_failed("Work", work_code.to_string(), e));
                return outcome;
            }
        };
        outcome.stats.works += 1;
        tracing::debug!(work_id, code = work_code, "work stored");

        for item in work.grouped("Content", "Item") {
            self.import_item(item, work_id, work_code, &context, &mut outcome)
                .await;
        }

        if let Some(resources) = work.child("Resources") {
            for resource in &resources.children {
                if let Some(kind) = ResourceKind::from_element(&resource.name) {
                    self.import_resource(resource, kind, work_id, work_code, &context, &mut outcome)
                        .await;
                }
            }
        }

        for price in work.grouped("Prices", "Price") {
            self.import_price(price, work_id, &context, &mut outcome).await;
        }
        outcome
    }

    async fn import_item(
        &self,
        item: &Element,
        work_id: RowId,
        work_code: &str,
        context: &str,
        outcome: &mut WalkOutcome,
    ) {
        let Some(text) = item.attr("Text") else {
            outcome.record(ImportIssue::MissingAttribute {
                element: "Item",
                attribute: "Text",
                context: context.to_string(),
            });
            return;
        };

        let resolved = match self
            .resolver
            .lookup_or_create(self.store, NaturalKey::Item(text))
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                outcome.record(row_failed("Item", format!("{:?} in {}", text, context), e));
                return;
            }
        };
        if resolved.created {
            outcome.stats.items_created += 1;
        }

        let labels = LinkLabels {
            key: text,
            work_code,
        };
        match self
            .resolver
            .link_work_item(self.store, work_id, resolved.id, labels, outcome)
            .await
        {
            Ok(true) => outcome.stats.items_linked += 1,
            Ok(false) => {}
            Err(e) => outcome.record(row_failed("work item link", format!("{:?} in {}", text, context), e)),
        }
    }

    async fn import_resource(
        &self,
        resource: &Element,
        kind: ResourceKind,
        work_id: RowId,
        work_code: &str,
        context: &str,
        outcome: &mut WalkOutcome,
    ) {
        let Some(code) = resource.attr_owned("Code") else {
            outcome.record(ImportIssue::MissingAttribute {
                element: kind.element(),
                attribute: "Code",
                context: context.to_string(),
            });
            return;
        };
        let name_attr = match kind {
            ResourceKind::Resource => "EndName",
            ResourceKind::AbstractResource | ResourceKind::ServiceResource => "Name",
        };
        let service = kind == ResourceKind::ServiceResource;
        let record = ResourceRecord {
            kind,
            code,
            name: resource.attr_owned(name_attr),
            measure_unit: resource.attr_owned("MeasureUnit"),
            category: resource.attr_owned("Category").filter(|_| service),
            service_type: resource.attr_owned("Type").filter(|_| service),
        };
        let label = format!("{} in {}", record.code, context);

        let resolved = match self
            .resolver
            .lookup_or_create(self.store, NaturalKey::Resource(&record))
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                outcome.record(row_failed(kind.element(), label, e));
                return;
            }
        };
        if resolved.created {
            outcome.stats.resources_created += 1;
        }

        let link = WorkResourceRecord {
            work_id,
            kind,
            resource_id: resolved.id,
            quantity: resource.attr_owned("Quantity"),
            measure_unit: resource.attr_owned("MeasureUnit"),
        };
        let labels = LinkLabels {
            key: &record.code,
            work_code,
        };
        match self
            .resolver
            .link_work_resource(self.store, &link, labels, outcome)
            .await
        {
            Ok(true) => outcome.stats.resources_linked += 1,
            Ok(false) => {}
            Err(e) => outcome.record(row_failed("work resource link", label, e)),
        }
    }

    async fn import_price(
        &self,
        price: &Element,
        work_id: RowId,
        context: &str,
        outcome: &mut WalkOutcome,
    ) {
        let record = PriceRecord {
            work_id,
            cost: number_attr(price, "Price", "Cost", context, outcome),
            salary: number_attr(price, "Price", "Salary", context, outcome),
            salary_mach: number_attr(price, "Price", "SalaryMach", context, outcome),
            machines: number_attr(price, "Price", "Machines", context, outcome),
            materials: number_attr(price, "Price", "Materials", context, outcome),
        };

        let price_id = match self.store.insert_price(&record).await {
            Ok(id) => id,
            Err(e) => {
                outcome.record(row_failed("Price", context.to_string(), e));
                return;
            }
        };
        outcome.stats.prices += 1;

        for correction in price.children_named("Correction") {
            let record = CorrectionRecord {
                price_id,
                coeff: number_attr(correction, "Correction", "Coeff", context, outcome),
                from_field: correction.attr_owned("From"),
                to_field: correction.attr_owned("To"),
            };
            match self.store.insert_correction(&record).await {
                Ok(_) => outcome.stats.corrections += 1,
                Err(e) => outcome.record(row_failed("Correction", context.to_string(), e)),
            }
        }
    }
}

fn base_record(root: &Element, outcome: &mut WalkOutcome) -> BaseRecord {
    BaseRecord {
        price_level: root.attr_owned("PriceLevel"),
        creation_date: temporal_attr(root, "CreationDate", &DATE_FORMATS, outcome, |raw, f| {
            NaiveDate::parse_from_str(raw, f).ok()
        }),
        creation_time: temporal_attr(root, "CreationTime", &TIME_FORMATS, outcome, |raw, f| {
            NaiveTime::parse_from_str(raw, f).ok()
        }),
        program_name: root.attr_owned("ProgramName"),
        base_name: root.attr_owned("BaseName"),
        base_type: root.attr_owned("BaseType"),
        decree: root
            .grouped("Decrees", "Decree")
            .next()
            .and_then(|d| d.attr_owned("Name")),
    }
}

/// Reads a date or time attribute; blank means absent, anything else that
/// matches none of `formats` is recorded and stored as null.
fn temporal_attr<T>(
    root: &Element,
    attribute: &'static str,
    formats: &[&str],
    outcome: &mut WalkOutcome,
    parse: impl Fn(&str, &str) -> Option<T>,
) -> Option<T> {
    let raw = root.attr(attribute)?.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = formats.iter().find_map(|f| parse(raw, f));
    if parsed.is_none() {
        outcome.record(ImportIssue::InvalidValue {
            element: "Base",
            attribute,
            value: raw.to_string(),
            context: "document header".to_string(),
        });
    }
    parsed
}

/// Reads a decimal attribute, accepting a comma as the decimal separator.
fn number_attr(
    element: &Element,
    element_name: &'static str,
    attribute: &'static str,
    context: &str,
    outcome: &mut WalkOutcome,
) -> Option<f64> {
    let raw = element.attr(attribute)?.trim();
    if raw.is_empty() {
        return None;
    }
    match parse_number(raw) {
        Some(value) => Some(value),
        None => {
            outcome.record(ImportIssue::InvalidValue {
                element: element_name,
                attribute,
                value: raw.to_string(),
                context: context.to_string(),
            });
            None
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn row_failed(element: &'static str, context: String, error: anyhow::Error) -> ImportIssue {
    ImportIssue::RowFailed {
        element,
        context,
        message: format!("{:#}", error),
    }
}

/// Joins the present parts of an element's identity for messages.
fn describe(parts: &[Option<&str>]) -> String {
    let present: Vec<&str> = parts.iter().flatten().copied().collect();
    if present.is_empty() {
        "<unnamed>".to_string()
    } else {
        present.join(" ")
    }
}
