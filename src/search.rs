//! `pbase search`: prints the pruned section forest as an indented tree.

use anyhow::Result;

use pricebase_core::catalog;
use pricebase_core::models::SectionNode;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_search(config: &Config, substring: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let forest = catalog::search(&store, substring).await?;

    if forest.is_empty() {
        println!("No sections match {:?}.", substring);
        return Ok(());
    }

    let mut out = String::new();
    for root in &forest {
        render(root, 0, &mut out);
    }
    print!("{}", out);
    Ok(())
}

fn render(node: &SectionNode, depth: usize, out: &mut String) {
    let code = node
        .code
        .as_deref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default();
    out.push_str(&format!(
        "{}[{}] {}{}\n",
        "  ".repeat(depth),
        node.id,
        node.name.as_deref().unwrap_or("(unnamed)"),
        code
    ));
    for child in &node.children {
        render(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, name: &str, children: Vec<SectionNode>) -> SectionNode {
        SectionNode {
            id,
            name: Some(name.to_string()),
            kind: None,
            code: None,
            parent_id: None,
            children,
        }
    }

    #[test]
    fn render_indents_by_depth() {
        let tree = node(1, "Earthworks", vec![node(2, "Excavation", vec![node(3, "Pits", vec![])])]);
        let mut out = String::new();
        render(&tree, 0, &mut out);
        assert_eq!(out, "[1] Earthworks\n  [2] Excavation\n    [3] Pits\n");
    }
}
