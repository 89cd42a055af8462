//! Shredding: drives a `Value` record tree down into the per-leaf column
//! buffers the page engine consumes, the way the teacher's
//! `postgres_cloner::build_schema` pairs a Postgres row type with the
//! appender tree it builds alongside it — except here the appender tree is
//! built once from a compiled `Schema` and reused across every record.

pub mod appender;

pub use appender::{ColumnAppender, ColumnSink, DynAppender};

use crate::error::Result;
use crate::levels::LevelIndexList;
use crate::schema::{NodeKind, RepetitionType, Schema};
use crate::value::Value;

use self::appender::{desugar_transposed_group, ArrayAppender, GroupAppender, LeafAppender};

/// Builds the appender tree mirroring `schema` and shreds `Value` records
/// into it, flushing buffered columns to a `ColumnSink` on demand.
pub struct Shredder {
    schema: Schema,
    root: GroupAppender,
    next_record_index: usize,
}

impl Shredder {
    pub fn new(schema: &Schema) -> Shredder {
        let root_children = build_children(schema, crate::schema::ROOT);
        Shredder {
            schema: schema.clone(),
            root: GroupAppender::new(0, 0, root_children),
            next_record_index: 0,
        }
    }

    /// Shreds one top-level record, returning an estimate of bytes buffered.
    pub fn append_record(&mut self, record: &Value) -> Result<usize> {
        let desugared = desugar_record(&self.schema, crate::schema::ROOT, record);
        let ri = LevelIndexList::new_i(self.next_record_index);
        self.next_record_index += 1;
        self.root.copy_value(&ri, &desugared)
    }

    pub fn flush_into(&mut self, sink: &mut dyn ColumnSink) -> Result<()> {
        self.root.flush_into(sink)
    }
}

fn build_children(schema: &Schema, group_idx: usize) -> Vec<(String, DynAppender)> {
    let node = schema.node(group_idx);
    let child_idxs = node.children().to_vec();
    let group_field_names: Vec<&str> = child_idxs
        .iter()
        .map(|&c| schema.node(c).name.as_str())
        .collect();

    child_idxs
        .iter()
        .map(|&child_idx| {
            let child = schema.node(child_idx);
            let name = child.name.clone();
            let appender = build_appender(schema, child_idx);
            let appender: DynAppender = if child.repetition == RepetitionType::Repeated {
                wrap_repeated(schema, child_idx, appender, &group_field_names)
            } else {
                appender
            };
            (name, appender)
        })
        .collect()
}

/// Builds the appender for `node_idx` at its own (ancestor-inclusive) level
/// maxima, ignoring whether it is itself REPEATED — the REPEATED wrapping
/// happens one layer up, in `build_children`/`wrap_repeated`.
fn build_appender(schema: &Schema, node_idx: usize) -> DynAppender {
    let node = schema.node(node_idx);
    let dl = node.d_level_max;
    let rl = node.r_level_max;
    match &node.kind {
        NodeKind::Primitive {
            primitive_type,
            logical_type,
            ..
        } => {
            let leaf_idx = schema
                .leaves
                .iter()
                .position(|&i| i == node_idx)
                .expect("primitive node must be registered as a schema leaf");
            Box::new(LeafAppender::new(leaf_idx, dl, rl, *primitive_type, *logical_type))
        }
        NodeKind::Group { .. } => {
            let fields = build_children(schema, node_idx);
            Box::new(GroupAppender::new(dl, rl, fields))
        }
    }
}

fn wrap_repeated(
    schema: &Schema,
    node_idx: usize,
    element: DynAppender,
    _siblings: &[&str],
) -> DynAppender {
    let node = schema.node(node_idx);
    Box::new(ArrayAppender::new(element, node.d_level_max, node.r_level_max))
}

/// Applies the transposed-group sugar (spec.md §9 Open Question) to every
/// REPEATED group field of `record` before shredding, so
/// `{stock: {q: [1,2], w: [3,4]}}` and `{stock: [{q:1,w:3},{q:2,w:4}]}`
/// shred identically.
pub fn desugar_record(schema: &Schema, group_idx: usize, value: &Value) -> Value {
    let node = schema.node(group_idx);
    let map = match value.as_group() {
        Some(m) => m.clone(),
        None => return value.clone(),
    };

    let mut out = std::collections::BTreeMap::new();
    for &child_idx in node.children() {
        let child = schema.node(child_idx);
        let Some(raw) = map.get(&child.name) else {
            continue;
        };

        let field_value = if child.is_group() {
            let field_names: Vec<&str> = child
                .children()
                .iter()
                .map(|&c| schema.node(c).name.as_str())
                .collect();

            if child.repetition == RepetitionType::Repeated {
                let transposed = match raw {
                    Value::List(_) => raw.clone(),
                    Value::Group(_) => desugar_transposed_group(raw, &field_names),
                    other => other.clone(),
                };
                match transposed {
                    Value::List(items) => Value::List(
                        items
                            .iter()
                            .map(|item| desugar_record(schema, child_idx, item))
                            .collect(),
                    ),
                    other => other,
                }
            } else {
                desugar_record(schema, child_idx, raw)
            }
        } else {
            raw.clone()
        };

        out.insert(child.name.clone(), field_value);
    }
    Value::Group(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_schema;
    use std::cell::RefCell;

    #[derive(Default)]
    struct CollectingSink {
        columns: RefCell<std::collections::BTreeMap<usize, (Vec<Value>, Vec<i16>, Vec<i16>)>>,
    }

    impl ColumnSink for CollectingSink {
        fn write_leaf_column(
            &mut self,
            leaf_idx: usize,
            values: &[Value],
            dls: &[i16],
            rls: &[i16],
        ) -> Result<()> {
            self.columns
                .borrow_mut()
                .insert(leaf_idx, (values.to_vec(), dls.to_vec(), rls.to_vec()));
            Ok(())
        }
    }

    fn fruit_schema() -> Schema {
        let decl: crate::schema::SchemaDeclaration = serde_json::from_value(serde_json::json!([
            {"name": "name", "type": "UTF8"},
            {"name": "quantity", "type": "INT32", "optional": true},
            {"name": "tags", "type": "UTF8", "repeated": true},
        ]))
        .unwrap();
        build_schema(&decl).unwrap()
    }

    #[test]
    fn shreds_optional_and_repeated_leaves() {
        let schema = fruit_schema();
        let mut shredder = Shredder::new(&schema);

        shredder
            .append_record(&Value::group([
                ("name", Value::Bytes(b"apple".to_vec())),
                ("quantity", Value::I32(10)),
                (
                    "tags",
                    Value::list([Value::Bytes(b"red".to_vec()), Value::Bytes(b"sweet".to_vec())]),
                ),
            ]))
            .unwrap();
        shredder
            .append_record(&Value::group([
                ("name", Value::Bytes(b"banana".to_vec())),
                ("quantity", Value::Null),
                ("tags", Value::List(vec![])),
            ]))
            .unwrap();

        let mut sink = CollectingSink::default();
        shredder.flush_into(&mut sink).unwrap();
        let columns = sink.columns.into_inner();

        let name_leaf = schema.find_leaf_by_path(&["name".to_string()]).unwrap();
        let name_col = &columns[&schema.leaves.iter().position(|&i| i == name_leaf).unwrap()];
        assert_eq!(name_col.0.len(), 2);

        let qty_leaf = schema.find_leaf_by_path(&["quantity".to_string()]).unwrap();
        let qty_col = &columns[&schema.leaves.iter().position(|&i| i == qty_leaf).unwrap()];
        assert_eq!(qty_col.0.len(), 1); // banana's null isn't in the value buffer
        assert_eq!(qty_col.1, vec![1, 0]); // present, absent

        let tags_leaf = schema.find_leaf_by_path(&["tags".to_string()]).unwrap();
        let tags_col = &columns[&schema.leaves.iter().position(|&i| i == tags_leaf).unwrap()];
        assert_eq!(tags_col.0.len(), 2); // apple's two tags only
        assert_eq!(tags_col.1, vec![1, 1, 0]); // red, sweet, banana's empty list
        assert_eq!(tags_col.2, vec![0, 1, 0]); // new record, repeat, new record
    }
}
