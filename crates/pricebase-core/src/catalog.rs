//! Read API consumed by the CLI and the HTTP server.
//!
//! | Function | Returns |
//! |----------|---------|
//! | [`search`] | Pruned section forest for a name substring |
//! | [`children`] | Direct child sections, ascending id |
//! | [`root_sections`] | Sections without a parent, ascending id |
//! | [`name_groups`] | Name groups of a section |
//! | [`works`] | Works of a name group |
//! | [`work_detail`] | A work with its items and resource links |
//!
//! Section names are returned in sentence case. Unknown ids yield empty
//! lists, except in [`work_detail`], which reports
//! [`CatalogError::NotFound`].

use crate::error::CatalogError;
use crate::models::{NameGroupRow, RowId, SectionNode, SectionRow, WorkDetail, WorkRow};
use crate::store::Store;

/// Upper-cases the first character and lower-cases the rest.
pub fn sentence_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn present_row(mut row: SectionRow) -> SectionRow {
    row.name = row.name.as_deref().map(sentence_case);
    row
}

fn present_node(mut node: SectionNode) -> SectionNode {
    node.name = node.name.as_deref().map(sentence_case);
    node.children = node.children.into_iter().map(present_node).collect();
    node
}

pub async fn search<S: Store + ?Sized>(
    store: &S,
    substring: &str,
) -> Result<Vec<SectionNode>, CatalogError> {
    let forest = crate::search::search(store, substring).await?;
    Ok(forest.into_iter().map(present_node).collect())
}

pub async fn children<S: Store + ?Sized>(
    store: &S,
    parent_id: RowId,
) -> Result<Vec<SectionRow>, CatalogError> {
    let rows = store.child_sections(parent_id).await?;
    Ok(rows.into_iter().map(present_row).collect())
}

pub async fn root_sections<S: Store + ?Sized>(store: &S) -> Result<Vec<SectionRow>, CatalogError> {
    let rows = store.root_sections().await?;
    Ok(rows.into_iter().map(present_row).collect())
}

pub async fn name_groups<S: Store + ?Sized>(
    store: &S,
    section_id: RowId,
) -> Result<Vec<NameGroupRow>, CatalogError> {
    Ok(store.name_groups(section_id).await?)
}

pub async fn works<S: Store + ?Sized>(
    store: &S,
    name_group_id: RowId,
) -> Result<Vec<WorkRow>, CatalogError> {
    Ok(store.works(name_group_id).await?)
}

/// Loads one work with its items (by item id) and resource links (in link
/// order).
pub async fn work_detail<S: Store + ?Sized>(
    store: &S,
    work_id: RowId,
) -> Result<WorkDetail, CatalogError> {
    let work = store
        .work(work_id)
        .await?
        .ok_or_else(|| CatalogError::not_found("work", work_id))?;
    let items = store.work_items(work_id).await?;
    let resources = store.work_resources(work_id).await?;
    Ok(WorkDetail {
        work,
        items,
        resources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::walker::{migrate, MigrateOptions};

    const CATALOG: &str = r#"<Base BaseName="demo">
  <ResourcesDirectory>
    <ResourceCategory Type="Works" CodePrefix="01">
      <Section Name="EARTHWORKS" Code="01">
        <Section Name="excavation" Code="01-01">
          <Section Name="PIT DIGGING" Code="01-01-01">
            <NameGroup BeginName="Digging of pits">
              <Work Code="W1" EndName="by hand" MeasureUnit="m3">
                <Content><Item Text="Loosen"/><Item Text="Dig"/></Content>
                <Resources>
                  <ServiceResource Code="S1" Name="Truck" Category="transport" Type="auto" Quantity="2" MeasureUnit="trip"/>
                  <Resource Code="R1" EndName="Water" Quantity="0.1" MeasureUnit="m3"/>
                </Resources>
              </Work>
            </NameGroup>
          </Section>
        </Section>
        <Section Name="Backfill" Code="01-02"/>
      </Section>
      <Section Name="Concrete" Code="02"/>
    </ResourceCategory>
  </ResourcesDirectory>
</Base>"#;

    async fn loaded() -> InMemoryStore {
        let store = InMemoryStore::new();
        migrate(&store, CATALOG, &MigrateOptions::default())
            .await
            .unwrap();
        store
    }

    #[test]
    fn sentence_case_handles_cyrillic_and_empty() {
        assert_eq!(sentence_case("EARTHWORKS"), "Earthworks");
        assert_eq!(sentence_case("земляные РАБОТЫ"), "Земляные работы");
        assert_eq!(sentence_case(""), "");
    }

    #[tokio::test]
    async fn search_returns_pruned_chain() {
        let store = loaded().await;
        let forest = search(&store, "pit").await.unwrap();

        assert_eq!(forest.len(), 1);
        let root = &forest[0];
        assert_eq!(root.name.as_deref(), Some("Earthworks"));
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name.as_deref(), Some("Excavation"));
        assert_eq!(root.children[0].children[0].name.as_deref(), Some("Pit digging"));
    }

    #[tokio::test]
    async fn empty_search_returns_whole_forest() {
        let store = loaded().await;
        let forest = search(&store, "").await.unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].children.len(), 2);
    }

    #[tokio::test]
    async fn roots_and_children_are_ordered_by_id() {
        let store = loaded().await;
        let roots = root_sections(&store).await.unwrap();
        let names: Vec<_> = roots.iter().filter_map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["Earthworks", "Concrete"]);

        let kids = children(&store, roots[0].id).await.unwrap();
        assert_eq!(kids.len(), 2);
        assert!(kids[0].id < kids[1].id);
        assert!(children(&store, 999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn browse_down_to_work_detail() {
        let store = loaded().await;
        let pit = search(&store, "pit digging").await.unwrap()[0].children[0].children[0].id;

        let groups = name_groups(&store, pit).await.unwrap();
        assert_eq!(groups.len(), 1);
        let listed = works(&store, groups[0].id).await.unwrap();
        assert_eq!(listed[0].code.as_deref(), Some("W1"));

        let detail = work_detail(&store, listed[0].id).await.unwrap();
        let texts: Vec<_> = detail.items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["Loosen", "Dig"]);
        let codes: Vec<_> = detail.resources.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["S1", "R1"]);
        assert_eq!(detail.resources[0].name.as_deref(), Some("Truck"));
    }

    #[tokio::test]
    async fn unknown_work_is_not_found_and_store_stays_readable() {
        let store = loaded().await;
        let err = work_detail(&store, 4040).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "work not found: 4040");

        assert_eq!(root_sections(&store).await.unwrap().len(), 2);
    }
}
