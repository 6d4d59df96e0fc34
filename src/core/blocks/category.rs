use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// A node of the toolbox category tree.
///
/// Nodes that match a generated unit carry its key; the others only group
/// their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    /// Last dotted segment, the visible category name
    pub name: String,

    /// Full dotted path of this node
    pub key: String,

    pub unit: Option<String>,

    /// Sorted by name
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTree {
    pub roots: Vec<CategoryNode>,
}

#[derive(Default)]
struct Trie {
    children: BTreeMap<String, Trie>,
}

impl CategoryTree {
    /// Prefix tree of unit keys split on `.`
    pub fn build(unit_keys: &BTreeSet<String>) -> Self {
        let mut trunk = Trie::default();
        for key in unit_keys {
            let mut tree = &mut trunk;
            for part in key.split('.') {
                tree = tree.children.entry(part.to_string()).or_default();
            }
        }

        Self {
            roots: Self::nodes("", &trunk, unit_keys),
        }
    }

    fn nodes(parent: &str, trie: &Trie, unit_keys: &BTreeSet<String>) -> Vec<CategoryNode> {
        trie.children.iter()
            .map(|(part, child)| {
                let key = if parent.is_empty() {
                    part.clone()
                } else {
                    format!("{}.{}", parent, part)
                };
                CategoryNode {
                    name: part.clone(),
                    unit: unit_keys.contains(&key).then(|| key.clone()),
                    children: Self::nodes(&key, child, unit_keys),
                    key,
                }
            })
            .collect()
    }

    pub fn find(&self, key: &str) -> Option<&CategoryNode> {
        let mut nodes = &self.roots;
        let mut found = None;
        for part in key.split('.') {
            let node = nodes.iter().find(|n| n.name == part)?;
            nodes = &node.children;
            found = Some(node);
        }
        found
    }

    /// Body of the toolbox array: unit categories call their category
    /// function with their subcategories, grouping nodes are inline literals
    pub fn render_toolbox(&self) -> String {
        let mut out = String::new();
        for node in &self.roots {
            node.render_toolbox("", &mut out);
        }
        out
    }
}

impl CategoryNode {
    pub fn ts_module(key: &str) -> String {
        key.replace('.', "_")
    }

    fn render_toolbox(&self, spaces: &str, out: &mut String) {
        match &self.unit {
            Some(unit) => out.push_str(&format!(
                "    {}{}.getToolboxCategory([",
                spaces,
                Self::ts_module(unit)
            )),
            None => out.push_str(&format!(
                "    {}{{ kind: \"category\", name: \"{}\", contents: [",
                spaces, self.name
            )),
        }

        let mut nested = String::new();
        let child_spaces = format!("{}  ", spaces);
        for child in &self.children {
            child.render_toolbox(&child_spaces, &mut nested);
        }
        if !nested.is_empty() {
            out.push('\n');
            out.push_str(&nested);
            out.push_str(&format!("    {}", spaces));
        }

        out.push_str(if self.unit.is_some() { "]),\n" } else { "]},\n" });
    }
}
