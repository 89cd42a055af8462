//! `SchemaNode`: the compiled schema tree, immutable after construction
//! (spec.md §3 "Lifecycles"). Ancestor/descendant relationships are captured
//! as indices into `Schema::fields` rather than via any form of reflection
//! (Design Note "No runtime reflection").

use super::types::{LogicalType, PrimitiveType, RepetitionType};

#[derive(Debug, Clone)]
pub enum NodeKind {
    Primitive {
        primitive_type: PrimitiveType,
        logical_type: Option<LogicalType>,
        type_length: Option<i32>,
        compression: String,
        encoding: String,
    },
    Group {
        /// Indices into `Schema::fields` of this group's direct children.
        children: Vec<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub name: String,
    pub repetition: RepetitionType,
    pub kind: NodeKind,
    /// Index of the parent node in `Schema::fields`, or `None` for the root.
    pub parent: Option<usize>,
    /// Names from (exclusive of) the root down to and including this node.
    pub path: Vec<String>,
    /// Number of REPEATED ancestors, including self.
    pub r_level_max: i16,
    /// Number of non-REQUIRED ancestors, including self.
    pub d_level_max: i16,
}

impl SchemaNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Primitive { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match &self.kind {
            NodeKind::Primitive { primitive_type, .. } => Some(*primitive_type),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn logical_type(&self) -> Option<LogicalType> {
        match &self.kind {
            NodeKind::Primitive { logical_type, .. } => *logical_type,
            NodeKind::Group { .. } => None,
        }
    }

    pub fn type_length(&self) -> Option<i32> {
        match &self.kind {
            NodeKind::Primitive { type_length, .. } => *type_length,
            NodeKind::Group { .. } => None,
        }
    }

    pub fn compression(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Primitive { compression, .. } => Some(compression.as_str()),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn encoding(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Primitive { encoding, .. } => Some(encoding.as_str()),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn children(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Group { children } => children.as_slice(),
            NodeKind::Primitive { .. } => &[],
        }
    }

    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}
