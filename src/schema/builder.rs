//! `build_schema`: turns a declaration (spec.md §6) into a compiled `Schema`.
//!
//! The declaration mirrors the ordered-array shape other Parquet-adjacent
//! tooling in the corpus uses for schema literals (a field is `{name,
//! type?, optional?, repeated?, fields?, compression?, encoding?,
//! typeLength?, precision?, scale?}`), which also sidesteps relying on a
//! JSON object's key order (spec.md §3 FieldList must preserve declaration
//! order).

use serde::Deserialize;

use crate::error::{ParquetCoreError, Result};
use crate::schema::node::{NodeKind, SchemaNode};
use crate::schema::types::{LogicalType, PrimitiveType, RepetitionType};
use crate::schema::Schema;

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub fields: Option<Vec<FieldDecl>>,
    #[serde(default)]
    pub compression: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default, rename = "typeLength")]
    pub type_length: Option<i32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<i32>,
}

pub type SchemaDeclaration = Vec<FieldDecl>;

const DEFAULT_COMPRESSION: &str = "UNCOMPRESSED";
const DEFAULT_ENCODING: &str = "PLAIN";

/// Recursively walks `declaration` and compiles it into a `Schema`.
pub fn build_schema(declaration: &[FieldDecl]) -> Result<Schema> {
    let mut nodes = vec![SchemaNode {
        name: "schema".to_string(),
        repetition: RepetitionType::Required,
        kind: NodeKind::Group { children: vec![] },
        parent: None,
        path: vec![],
        r_level_max: 0,
        d_level_max: 0,
    }];

    let children = build_children(&mut nodes, 0, declaration)?;
    nodes[0].kind = NodeKind::Group { children };

    let mut leaves = vec![];
    collect_leaves(&nodes, 0, &mut leaves);

    Ok(Schema { nodes, leaves })
}

fn build_children(
    nodes: &mut Vec<SchemaNode>,
    parent_idx: usize,
    decls: &[FieldDecl],
) -> Result<Vec<usize>> {
    let mut seen_names = std::collections::HashSet::new();
    let mut child_indices = Vec::with_capacity(decls.len());

    for decl in decls {
        if !seen_names.insert(decl.name.clone()) {
            return Err(ParquetCoreError::config(format!(
                "duplicate field name '{}' among siblings",
                decl.name
            )));
        }

        let repetition = match (decl.optional, decl.repeated) {
            (_, true) => RepetitionType::Repeated,
            (true, false) => RepetitionType::Optional,
            (false, false) => RepetitionType::Required,
        };

        let parent = &nodes[parent_idx];
        let mut path = parent.path.clone();
        path.push(decl.name.clone());
        let r_level_max = parent.r_level_max + (repetition == RepetitionType::Repeated) as i16;
        let d_level_max = parent.d_level_max + (repetition != RepetitionType::Required) as i16;

        if decl.type_name.is_some() && decl.fields.is_some() {
            return Err(ParquetCoreError::config(format!(
                "field '{}' declares both a primitive 'type' and nested 'fields'",
                decl.name
            )));
        }

        let is_group = decl.type_name.is_none() || decl.fields.is_some();

        let node_idx = nodes.len();
        if is_group {
            nodes.push(SchemaNode {
                name: decl.name.clone(),
                repetition,
                kind: NodeKind::Group { children: vec![] },
                parent: Some(parent_idx),
                path,
                r_level_max,
                d_level_max,
            });
            let grandchildren =
                build_children(nodes, node_idx, decl.fields.as_deref().unwrap_or(&[]))?;
            if let NodeKind::Group { children } = &mut nodes[node_idx].kind {
                *children = grandchildren;
            }
        } else {
            if decl.fields.is_some() {
                return Err(ParquetCoreError::config(format!(
                    "field '{}' is a primitive leaf but declares nested 'fields'",
                    decl.name
                )));
            }
            let (primitive_type, logical_type, type_length) = resolve_leaf_type(decl)?;
            nodes.push(SchemaNode {
                name: decl.name.clone(),
                repetition,
                kind: NodeKind::Primitive {
                    primitive_type,
                    logical_type,
                    type_length,
                    compression: decl
                        .compression
                        .clone()
                        .unwrap_or_else(|| DEFAULT_COMPRESSION.to_string()),
                    encoding: decl
                        .encoding
                        .clone()
                        .unwrap_or_else(|| DEFAULT_ENCODING.to_string()),
                },
                parent: Some(parent_idx),
                path,
                r_level_max,
                d_level_max,
            });
            if r_level_max > d_level_max {
                return Err(ParquetCoreError::config(format!(
                    "field '{}' has rLevelMax ({r_level_max}) > dLevelMax ({d_level_max})",
                    nodes[node_idx].path_string()
                )));
            }
        }

        child_indices.push(node_idx);
    }

    Ok(child_indices)
}

fn resolve_leaf_type(
    decl: &FieldDecl,
) -> Result<(PrimitiveType, Option<LogicalType>, Option<i32>)> {
    let type_name = decl.type_name.as_deref().unwrap();

    // try the primitive registry first, then the logical-type registry.
    if let Ok(primitive) = PrimitiveType::from_name(type_name) {
        let type_length = match primitive {
            PrimitiveType::FixedLenByteArray => Some(decl.type_length.ok_or_else(|| {
                ParquetCoreError::config(format!(
                    "field '{}' is FIXED_LEN_BYTE_ARRAY but doesn't declare 'typeLength'",
                    decl.name
                ))
            })?),
            _ => None,
        };
        return Ok((primitive, None, type_length));
    }

    let logical = LogicalType::from_name(type_name, decl.precision, decl.scale)?;
    let primitive = logical.backing_primitive();
    let type_length = logical.type_length().or(decl.type_length);
    Ok((primitive, Some(logical), type_length))
}

fn collect_leaves(nodes: &[SchemaNode], idx: usize, out: &mut Vec<usize>) {
    match &nodes[idx].kind {
        NodeKind::Primitive { .. } => out.push(idx),
        NodeKind::Group { children } => {
            for &c in children {
                collect_leaves(nodes, c, out);
            }
        }
    }
}
