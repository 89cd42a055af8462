pub mod builder;
pub mod node;
pub mod types;

pub use builder::{build_schema, FieldDecl, SchemaDeclaration};
pub use node::{NodeKind, SchemaNode};
pub use types::{LogicalType, PrimitiveType, RepetitionType};

use crate::error::{ParquetCoreError, Result};

/// The compiled schema tree plus its canonical leaf ordering (spec.md §3
/// FieldList): the pre-order traversal of leaves, used throughout writing
/// and reading.
#[derive(Debug, Clone)]
pub struct Schema {
    /// All nodes, root first, in the order they were constructed. Index 0
    /// is the synthetic root group.
    pub nodes: Vec<SchemaNode>,
    /// Indices into `nodes` of every leaf, in pre-order (declaration order).
    pub leaves: Vec<usize>,
}

pub const ROOT: usize = 0;

impl Schema {
    pub fn root(&self) -> &SchemaNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, idx: usize) -> &SchemaNode {
        &self.nodes[idx]
    }

    pub fn leaves(&self) -> impl Iterator<Item = (usize, &SchemaNode)> {
        self.leaves.iter().map(move |&i| (i, &self.nodes[i]))
    }

    /// The ancestor chain of `idx`, root-exclusive, nearest-ancestor last.
    pub fn ancestors(&self, idx: usize) -> Vec<usize> {
        let mut chain = vec![];
        let mut cur = self.nodes[idx].parent;
        while let Some(p) = cur {
            if p != ROOT {
                chain.push(p);
            }
            cur = self.nodes[p].parent;
        }
        chain.reverse();
        chain
    }

    /// Resolves a dotted or segmented path to a node index, used by the
    /// reader's column projection (spec.md §4.1 `findField`).
    pub fn find_field(&self, path: &[&str]) -> Result<usize> {
        let mut cur = ROOT;
        for segment in path {
            let children = self.nodes[cur].children();
            let found = children
                .iter()
                .find(|&&c| self.nodes[c].name == *segment)
                .copied();
            match found {
                Some(next) => cur = next,
                None => {
                    return Err(ParquetCoreError::config(format!(
                        "no field named '{segment}' under '{}'",
                        self.nodes[cur].path_string()
                    )))
                }
            }
        }
        Ok(cur)
    }

    pub fn find_leaf_by_path(&self, path: &[String]) -> Option<usize> {
        self.leaves
            .iter()
            .copied()
            .find(|&i| self.nodes[i].path == path)
    }
}
