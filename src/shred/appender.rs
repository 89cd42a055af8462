//! Column appenders: an appender tree mirrors the schema tree, the same way
//! the teacher's `appenders/` module mirrors a Postgres row's shape — but
//! generalized to the single `Value` type instead of static per-column Rust
//! generics, since schemas here are built at runtime from a declaration
//! rather than known at compile time.
//!
//! Every node in the schema gets exactly one appender whose `max_dl`/
//! `max_rl` equal that node's own (ancestor-inclusive) level maxima. A
//! REPEATED node's appender is an `ArrayAppender` wrapping the per-element
//! writer (a `LeafAppender` or `GroupAppender`) — unlike the teacher, there
//! is no extra "element-nullable" layer, because spec.md's repetition model
//! is the classic flat Dremel one (no 3-level LIST/MAP convention): a
//! REPEATED node contributes exactly one definition level, for "present
//! with N>=0 elements" vs "absent".

use crate::error::{ParquetCoreError, Result};
use crate::levels::{LevelIndexList, LevelIndexState};
use crate::schema::{LogicalType, PrimitiveType};
use crate::value::Value;

/// Sink a flushed leaf column's buffered (value, rLevel, dLevel) triples are
/// handed to — implemented by the page engine / column chunk writer.
pub trait ColumnSink {
    fn write_leaf_column(
        &mut self,
        leaf_idx: usize,
        values: &[Value],
        dls: &[i16],
        rls: &[i16],
    ) -> Result<()>;
}

pub trait ColumnAppender {
    /// Records a null at the given (absolute) definition level.
    fn write_null(&mut self, repetition_index: &LevelIndexList, level: i16) -> Result<usize>;

    /// Records a present value. `value` must not be `Value::Null` — callers
    /// go through `copy_value_opt` when a value may be absent.
    fn copy_value(&mut self, repetition_index: &LevelIndexList, value: &Value) -> Result<usize>;

    fn max_dl(&self) -> i16;
    fn max_rl(&self) -> i16;

    fn flush_into(&mut self, sink: &mut dyn ColumnSink) -> Result<()>;

    fn copy_value_opt(&mut self, repetition_index: &LevelIndexList, value: &Value) -> Result<usize> {
        if value.is_null() {
            assert!(self.max_dl() > 0, "a null was supplied for a column with max_dl=0");
            self.write_null(repetition_index, self.max_dl() - 1)
        } else {
            self.copy_value(repetition_index, value)
        }
    }
}

pub type DynAppender = Box<dyn ColumnAppender>;

/// A leaf column: buffers (value, dl, rl) triples until `flush_into` drains
/// them to the page engine.
pub struct LeafAppender {
    leaf_idx: usize,
    max_dl: i16,
    max_rl: i16,
    primitive: PrimitiveType,
    logical: Option<LogicalType>,
    values: Vec<Value>,
    dls: Vec<i16>,
    rls: Vec<i16>,
    repetition_index: LevelIndexState,
}

impl LeafAppender {
    pub fn new(
        leaf_idx: usize,
        max_dl: i16,
        max_rl: i16,
        primitive: PrimitiveType,
        logical: Option<LogicalType>,
    ) -> Self {
        LeafAppender {
            leaf_idx,
            max_dl,
            max_rl,
            primitive,
            logical,
            values: Vec::new(),
            dls: Vec::new(),
            rls: Vec::new(),
            repetition_index: LevelIndexState::new(max_rl),
        }
    }

    fn coerce(&self, value: &Value) -> Result<Value> {
        let coerced = match &self.logical {
            Some(logical) => logical.to_primitive(value.clone())?,
            None => value.clone(),
        };
        validate_primitive(&coerced, self.primitive)?;
        Ok(coerced)
    }
}

fn validate_primitive(value: &Value, expected: PrimitiveType) -> Result<()> {
    let ok = match (value, expected) {
        (Value::Bool(_), PrimitiveType::Boolean) => true,
        (Value::I32(_), PrimitiveType::Int32) => true,
        (Value::I64(_), PrimitiveType::Int64) => true,
        (Value::I96(_), PrimitiveType::Int96) => true,
        (Value::Float(_), PrimitiveType::Float) => true,
        (Value::Double(_), PrimitiveType::Double) => true,
        (Value::Bytes(_), PrimitiveType::ByteArray) => true,
        (Value::Bytes(_), PrimitiveType::FixedLenByteArray) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ParquetCoreError::invalid_input(format!(
            "value of type '{}' does not match column's physical type",
            value.type_name()
        )))
    }
}

impl ColumnAppender for LeafAppender {
    fn write_null(&mut self, repetition_index: &LevelIndexList, level: i16) -> Result<usize> {
        debug_assert!(level < self.max_dl);
        self.dls.push(level);
        if self.max_rl > 0 {
            let rl = self.repetition_index.copy_and_diff(repetition_index);
            self.rls.push(rl);
            Ok(4)
        } else {
            Ok(2)
        }
    }

    fn copy_value(&mut self, repetition_index: &LevelIndexList, value: &Value) -> Result<usize> {
        let coerced = self.coerce(value)?;
        let size = estimate_size(&coerced);
        self.values.push(coerced);
        if self.max_dl > 0 {
            self.dls.push(self.max_dl);
        }
        if self.max_rl > 0 {
            let rl = self.repetition_index.copy_and_diff(repetition_index);
            self.rls.push(rl);
        }
        Ok(size)
    }

    fn max_dl(&self) -> i16 {
        self.max_dl
    }
    fn max_rl(&self) -> i16 {
        self.max_rl
    }

    fn flush_into(&mut self, sink: &mut dyn ColumnSink) -> Result<()> {
        sink.write_leaf_column(self.leaf_idx, &self.values, &self.dls, &self.rls)?;
        self.values.clear();
        self.dls.clear();
        self.rls.clear();
        Ok(())
    }
}

fn estimate_size(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::I32(_) | Value::Float(_) => 4,
        Value::I64(_) | Value::Double(_) => 8,
        Value::I96(_) => 12,
        Value::Bytes(b) => b.len(),
        Value::Group(_) | Value::List(_) => 0,
    }
}

/// A non-repeated group: fans a `Value::Group` out to its children by name,
/// and propagates an explicit-level null to every descendant leaf.
pub struct GroupAppender {
    dl: i16,
    rl: i16,
    fields: Vec<(String, DynAppender)>,
}

impl GroupAppender {
    pub fn new(dl: i16, rl: i16, fields: Vec<(String, DynAppender)>) -> Self {
        GroupAppender { dl, rl, fields }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl ColumnAppender for GroupAppender {
    fn write_null(&mut self, repetition_index: &LevelIndexList, level: i16) -> Result<usize> {
        let mut total = 0;
        for (_, appender) in self.fields.iter_mut() {
            total += appender.write_null(repetition_index, level)?;
        }
        Ok(total)
    }

    fn copy_value(&mut self, repetition_index: &LevelIndexList, value: &Value) -> Result<usize> {
        let map = value.as_group().ok_or_else(|| {
            ParquetCoreError::invalid_input(format!(
                "expected a group/struct value, got '{}'",
                value.type_name()
            ))
        })?;
        let mut total = 0;
        for (name, appender) in self.fields.iter_mut() {
            match map.get(name) {
                Some(v) => total += appender.copy_value_opt(repetition_index, v)?,
                None => total += appender.copy_value_opt(repetition_index, &Value::Null)?,
            }
        }
        Ok(total)
    }

    fn max_dl(&self) -> i16 {
        self.dl
    }
    fn max_rl(&self) -> i16 {
        self.rl
    }

    fn flush_into(&mut self, sink: &mut dyn ColumnSink) -> Result<()> {
        for (_, appender) in self.fields.iter_mut() {
            appender.flush_into(sink)?;
        }
        Ok(())
    }
}

/// Wraps the per-element writer of a REPEATED node, handling Dremel list
/// iteration: a present `Value::List` fans its elements out (incrementing
/// the repetition index between them); an empty list or `Value::Null`
/// writes a single null marking "present ancestors, zero elements here"; a
/// bare scalar is treated as a one-element list (spec.md §4.3, §8 inv. 2).
pub struct ArrayAppender {
    element: DynAppender,
    dl: i16,
    rl: i16,
}

impl ArrayAppender {
    pub fn new(element: DynAppender, dl: i16, rl: i16) -> Self {
        ArrayAppender { element, dl, rl }
    }
}

impl ColumnAppender for ArrayAppender {
    fn write_null(&mut self, repetition_index: &LevelIndexList, level: i16) -> Result<usize> {
        self.element.write_null(repetition_index, level)
    }

    fn copy_value(&mut self, repetition_index: &LevelIndexList, value: &Value) -> Result<usize> {
        let nested_ri = repetition_index.new_child();

        let items: Vec<&Value> = match value {
            Value::List(items) => items.iter().collect(),
            scalar => vec![scalar],
        };

        if items.is_empty() {
            return self.element.write_null(&nested_ri, self.dl - 1);
        }

        let mut nested_ri = nested_ri;
        let mut total = 0;
        for item in items {
            total += self.element.copy_value_opt(&nested_ri, item)?;
            nested_ri.inc();
        }
        Ok(total)
    }

    fn copy_value_opt(&mut self, repetition_index: &LevelIndexList, value: &Value) -> Result<usize> {
        match value {
            Value::Null => {
                let nested_ri = repetition_index.new_child();
                self.element.write_null(&nested_ri, self.dl - 1)
            }
            other => self.copy_value(repetition_index, other),
        }
    }

    fn max_dl(&self) -> i16 {
        self.dl
    }
    fn max_rl(&self) -> i16 {
        self.rl
    }

    fn flush_into(&mut self, sink: &mut dyn ColumnSink) -> Result<()> {
        self.element.flush_into(sink)
    }
}

/// The "`stock: {q:[...], w:...}`" sugar (spec.md §9 Open Question): a
/// transposed-object form of a list of records is fanned over the longest
/// contained list's length (or 1, if none of its fields are lists), turning
/// it into the canonical `Value::List(Value::Group(...))` form.
pub fn desugar_transposed_group(value: &Value, field_names: &[&str]) -> Value {
    let map = match value.as_group() {
        Some(m) => m,
        None => return value.clone(),
    };

    let longest = field_names
        .iter()
        .filter_map(|name| match map.get(*name) {
            Some(Value::List(items)) => Some(items.len()),
            _ => None,
        })
        .max()
        .unwrap_or(1);

    let mut rows = Vec::with_capacity(longest);
    for i in 0..longest {
        let mut group = std::collections::BTreeMap::new();
        for name in field_names {
            let field_value = match map.get(*name) {
                Some(Value::List(items)) => items.get(i).cloned().unwrap_or(Value::Null),
                Some(scalar) => scalar.clone(),
                None => Value::Null,
            };
            group.insert(name.to_string(), field_value);
        }
        rows.push(Value::Group(group));
    }
    Value::List(rows)
}
