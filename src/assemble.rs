//! The reader-side counterpart to `shred`: reassembles per-leaf
//! `(value, rLevel, dLevel)` triples back into `Value` records, walking the
//! schema tree the same way `Shredder` built the appender tree, but in
//! reverse (values flow up out of leaves into groups and arrays instead of
//! down into them).
//!
//! Dremel assembly is driven record-by-record: each leaf column exposes a
//! small cursor over its decoded triples, and `Assembler::next_record` peeks
//! the repetition levels to decide when a repeated field's run of elements
//! ends and the next record begins (the standard "rLevel == 0 marks a new
//! top-level record" rule).

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ParquetCoreError, Result};
use crate::schema::{NodeKind, RepetitionType, Schema};
use crate::value::Value;

/// One leaf's fully decoded column: values (non-null only, spec.md §4.2) plus
/// a definition level and repetition level per logical slot (present or
/// null).
#[derive(Debug, Clone)]
pub struct LeafColumn {
    pub values: Vec<Value>,
    pub dls: Vec<i16>,
    pub rls: Vec<i16>,
}

struct LeafCursor {
    column: LeafColumn,
    value_pos: usize,
    slot_pos: usize,
}

impl LeafCursor {
    fn new(column: LeafColumn) -> Self {
        LeafCursor {
            column,
            value_pos: 0,
            slot_pos: 0,
        }
    }

    fn has_more(&self) -> bool {
        self.slot_pos < self.column.dls.len()
    }

    fn peek_rl(&self) -> i16 {
        self.column.rls.get(self.slot_pos).copied().unwrap_or(0)
    }

    fn peek_dl(&self) -> i16 {
        self.column.dls[self.slot_pos]
    }

    /// Consumes one slot, returning `(dl, value_if_present)`.
    fn take(&mut self, max_dl: i16) -> (i16, Option<Value>) {
        let dl = self.column.dls[self.slot_pos];
        self.slot_pos += 1;
        if dl == max_dl {
            let v = self.column.values[self.value_pos].clone();
            self.value_pos += 1;
            (dl, Some(v))
        } else {
            (dl, None)
        }
    }
}

pub struct Assembler<'a> {
    schema: &'a Schema,
    cursors: BTreeMap<usize, LeafCursor>,
    /// Every node whose value contributes to the assembled record: the
    /// projected leaves themselves plus all of their ancestor groups
    /// (spec.md §4.4 "Projection" / §7 invariant 8). A group with no
    /// projected leaf beneath it is omitted entirely, not materialized as
    /// null — this is what keeps a projected record's keys exactly `P`.
    active: BTreeSet<usize>,
}

impl<'a> Assembler<'a> {
    /// `columns` maps a leaf's schema node index to its decoded column.
    /// Assembles the full schema: every leaf in `columns` is expected to
    /// cover the whole `FieldList`.
    pub fn new(schema: &'a Schema, columns: BTreeMap<usize, LeafColumn>) -> Self {
        Self::new_projected(schema, columns)
    }

    /// Assembles only the given leaves and their ancestor groups, per
    /// spec.md §4.4's column projection: records come out with exactly the
    /// requested keys (plus ancestors of nested ones), omitting any group
    /// that has no projected leaf beneath it.
    pub fn new_projected(schema: &'a Schema, columns: BTreeMap<usize, LeafColumn>) -> Self {
        let mut active = BTreeSet::new();
        for &leaf_idx in columns.keys() {
            active.insert(leaf_idx);
            for ancestor in schema.ancestors(leaf_idx) {
                active.insert(ancestor);
            }
        }
        let cursors = columns
            .into_iter()
            .map(|(idx, col)| (idx, LeafCursor::new(col)))
            .collect();
        Assembler { schema, cursors, active }
    }

    pub fn has_more(&self) -> bool {
        self.cursors.values().any(|c| c.has_more())
    }

    /// Assembles the next top-level record, or `None` once every leaf is
    /// exhausted.
    pub fn next_record(&mut self) -> Result<Option<Value>> {
        if !self.has_more() {
            return Ok(None);
        }
        let root = crate::schema::ROOT;
        let group = self.assemble_group(root, true)?;
        Ok(Some(group))
    }

    /// Assembles one instance of the group at `group_idx`. `is_record_root`
    /// is true only for the synthetic schema root, where there is no
    /// enclosing repetition to bound the group's lifetime.
    ///
    /// A null OPTIONAL child (leaf or group) is left out of `fields`
    /// entirely rather than inserted as `Value::Null` (spec.md §4.4 "null
    /// leaves are omitted from output objects"). A REPEATED child never
    /// produces `Value::Null` itself — an absent repeated field surfaces as
    /// an empty `Value::List` and is always kept.
    fn assemble_group(&mut self, group_idx: usize, is_record_root: bool) -> Result<Value> {
        let child_idxs = self.schema.node(group_idx).children().to_vec();
        let mut fields = BTreeMap::new();
        for child_idx in child_idxs {
            if !self.active.contains(&child_idx) {
                continue;
            }
            let child = self.schema.node(child_idx).clone();
            let value = match child.repetition {
                RepetitionType::Repeated => self.assemble_repeated(child_idx)?,
                _ => self.assemble_single(child_idx)?,
            };
            if !matches!(value, Value::Null) {
                fields.insert(child.name.clone(), value);
            }
            let _ = is_record_root;
        }
        Ok(Value::Group(fields))
    }

    /// Assembles a single (REQUIRED/OPTIONAL) instance of the node at
    /// `node_idx`. Returns `Value::Null` to mean "absent" for an OPTIONAL
    /// node that wasn't present in the column stream; `assemble_group`
    /// treats that return value as a sentinel and omits the field rather
    /// than keeping it.
    fn assemble_single(&mut self, node_idx: usize) -> Result<Value> {
        let node = self.schema.node(node_idx).clone();
        match &node.kind {
            NodeKind::Primitive { .. } => {
                let (dl, value) = self.take_leaf(node_idx, node.d_level_max)?;
                match value {
                    Some(v) => Ok(apply_logical(&node, v)),
                    None => {
                        debug_assert!(dl < node.d_level_max);
                        Ok(Value::Null)
                    }
                }
            }
            NodeKind::Group { .. } => {
                if node.d_level_max == 0 {
                    // REQUIRED group: always present.
                    self.assemble_group(node_idx, false)
                } else {
                    // OPTIONAL group: peek a representative descendant leaf's
                    // dl to decide presence before recursing.
                    let representative = self.first_leaf_under(node_idx);
                    let dl = self.peek_dl(representative);
                    if dl < node.d_level_max {
                        self.skip_group(node_idx, dl)?;
                        Ok(Value::Null)
                    } else {
                        self.assemble_group(node_idx, false)
                    }
                }
            }
        }
    }

    /// Assembles all repetitions of a REPEATED node into a `Value::List`,
    /// stopping once the repetition level drops back to (or below) the
    /// node's own `rLevelMax - 1`, i.e. the element boundary it owns.
    fn assemble_repeated(&mut self, node_idx: usize) -> Result<Value> {
        let node = self.schema.node(node_idx).clone();
        let representative = self.first_leaf_under(node_idx);

        let first_dl = self.peek_dl(representative);
        if first_dl < node.d_level_max {
            // zero elements: a single null marker consumed across every
            // descendant leaf at this level.
            self.skip_node(node_idx, first_dl)?;
            return Ok(Value::List(vec![]));
        }

        let mut items = Vec::new();
        loop {
            let item = match &node.kind {
                NodeKind::Primitive { .. } => {
                    let (_, v) = self.take_leaf(node_idx, node.d_level_max)?;
                    apply_logical(&node, v.expect("element dl checked above"))
                }
                NodeKind::Group { .. } => self.assemble_group(node_idx, false)?,
            };
            items.push(item);

            if !self.cursor_has_more(representative) {
                break;
            }
            let next_rl = self.peek_rl(representative);
            if next_rl < node.r_level_max {
                break;
            }
        }
        Ok(Value::List(items))
    }

    fn take_leaf(&mut self, leaf_idx: usize, max_dl: i16) -> Result<(i16, Option<Value>)> {
        let cursor = self.cursors.get_mut(&leaf_idx).ok_or_else(|| {
            ParquetCoreError::format(format!("no decoded column for leaf node {leaf_idx}"))
        })?;
        Ok(cursor.take(max_dl))
    }

    fn peek_dl(&self, leaf_idx: usize) -> i16 {
        self.cursors
            .get(&leaf_idx)
            .map(|c| c.peek_dl())
            .unwrap_or(0)
    }

    fn peek_rl(&self, leaf_idx: usize) -> i16 {
        self.cursors
            .get(&leaf_idx)
            .map(|c| c.peek_rl())
            .unwrap_or(0)
    }

    fn cursor_has_more(&self, leaf_idx: usize) -> bool {
        self.cursors.get(&leaf_idx).map(|c| c.has_more()).unwrap_or(false)
    }

    /// A descendant leaf of `node_idx` that is actually projected (has a
    /// cursor), used to peek levels for group/array presence decisions:
    /// every leaf under a group shares the same rl/dl slot sequence up to
    /// that group's own level, by construction, so any projected one will
    /// do. Only ever called on nodes in `active`, which guarantees at least
    /// one descendant leaf has a cursor.
    fn first_leaf_under(&self, node_idx: usize) -> usize {
        match &self.schema.node(node_idx).kind {
            NodeKind::Primitive { .. } => node_idx,
            NodeKind::Group { children } => children
                .iter()
                .copied()
                .find(|&c| self.active.contains(&c))
                .map(|c| self.first_leaf_under(c))
                .expect("active group has a projected descendant leaf"),
        }
    }

    /// Consumes one null slot from every *projected* leaf under `node_idx`
    /// (used when a whole group/array is absent); leaves outside the
    /// projection have no cursor and nothing to consume.
    fn skip_node(&mut self, node_idx: usize, level: i16) -> Result<()> {
        match &self.schema.node(node_idx).kind.clone() {
            NodeKind::Primitive { .. } => {
                if self.cursors.contains_key(&node_idx) {
                    self.take_leaf(node_idx, i16::MAX)?;
                }
                let _ = level;
                Ok(())
            }
            NodeKind::Group { children } => {
                for &c in children {
                    if self.active.contains(&c) {
                        self.skip_node(c, level)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn skip_group(&mut self, node_idx: usize, level: i16) -> Result<()> {
        self.skip_node(node_idx, level)
    }
}

fn apply_logical(node: &crate::schema::SchemaNode, value: Value) -> Value {
    match node.logical_type() {
        Some(logical) => logical.from_primitive(value),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_schema;
    use crate::shred::{ColumnSink, Shredder};
    use std::cell::RefCell;

    #[derive(Default)]
    struct CollectingSink {
        // Keyed by the ordinal position in `Schema::leaves`, the same
        // convention `Shredder` writes with.
        columns: RefCell<BTreeMap<usize, LeafColumn>>,
    }

    impl ColumnSink for CollectingSink {
        fn write_leaf_column(
            &mut self,
            leaf_idx: usize,
            values: &[Value],
            dls: &[i16],
            rls: &[i16],
        ) -> Result<()> {
            self.columns.borrow_mut().insert(
                leaf_idx,
                LeafColumn {
                    values: values.to_vec(),
                    dls: dls.to_vec(),
                    rls: rls.to_vec(),
                },
            );
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

    fn fruit_records() -> Vec<Value> {
        vec![
            Value::group([
                ("name", Value::Bytes(b"apple".to_vec())),
                ("quantity", Value::I32(10)),
                (
                    "tags",
                    Value::list([Value::Bytes(b"red".to_vec()), Value::Bytes(b"sweet".to_vec())]),
                ),
            ]),
            Value::group([
                ("name", Value::Bytes(b"banana".to_vec())),
                ("quantity", Value::Null),
                ("tags", Value::List(vec![])),
            ]),
        ]
    }

    /// Shreds `fruit_records()` and returns its leaf columns keyed by schema
    /// node index, the convention `Assembler` expects (`Shredder`/`ColumnSink`
    /// key by ordinal leaf position instead; the reader performs this same
    /// translation via `Schema::leaves`).
    fn shred_fruit() -> (Schema, BTreeMap<usize, LeafColumn>) {
        let schema = fruit_schema();
        let mut shredder = Shredder::new(&schema);
        for record in fruit_records() {
            shredder.append_record(&record).unwrap();
        }
        let mut sink = CollectingSink::default();
        shredder.flush_into(&mut sink).unwrap();
        let by_ordinal = sink.columns.into_inner();
        let by_node_idx = by_ordinal
            .into_iter()
            .map(|(ordinal, col)| (schema.leaves[ordinal], col))
            .collect();
        (schema, by_node_idx)
    }

    #[test]
    fn reassembles_full_records() {
        let (schema, columns) = shred_fruit();
        let mut assembler = Assembler::new(&schema, columns);

        let first = assembler.next_record().unwrap().unwrap();
        assert_eq!(
            first,
            Value::group([
                ("name", Value::Bytes(b"apple".to_vec())),
                ("quantity", Value::I32(10)),
                (
                    "tags",
                    Value::list([Value::Bytes(b"red".to_vec()), Value::Bytes(b"sweet".to_vec())]),
                ),
            ])
        );

        let second = assembler.next_record().unwrap().unwrap();
        assert_eq!(
            second,
            Value::group([
                ("name", Value::Bytes(b"banana".to_vec())),
                ("tags", Value::List(vec![])),
            ])
        );

        assert!(assembler.next_record().unwrap().is_none());
    }

    #[test]
    fn projected_columns_omit_unrequested_keys() {
        let (schema, mut columns) = shred_fruit();
        let quantity_leaf = schema.find_leaf_by_path(&["quantity".to_string()]).unwrap();
        columns.remove(&quantity_leaf);

        let mut assembler = Assembler::new_projected(&schema, columns);

        let first = assembler.next_record().unwrap().unwrap();
        let group = first.as_group().expect("record assembles to a group");
        assert_eq!(group.len(), 2);
        assert!(!group.contains_key("quantity"));
        assert_eq!(group.get("name"), Some(&Value::Bytes(b"apple".to_vec())));

        let second = assembler.next_record().unwrap().unwrap();
        let group = second.as_group().unwrap();
        assert!(!group.contains_key("quantity"));
        assert_eq!(group.get("name"), Some(&Value::Bytes(b"banana".to_vec())));

        assert!(assembler.next_record().unwrap().is_none());
    }
}
