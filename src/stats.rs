//! Per-page and per-chunk statistics (spec.md §4.2, §5): min/max, null
//! count, distinct count. Byte arrays compare lexicographically by raw
//! bytes; everything else compares numerically. `ColumnStats::merge` folds
//! page-level stats up into the chunk-level `Statistics` struct the writer
//! closes a column chunk with.

use std::collections::HashSet;

use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub null_count: i64,
    distinct: HashSet<DistinctKey>,
    pub distinct_count_exact: bool,
}

/// A hashable, totally-ordered projection of the subset of `Value` that can
/// appear in a leaf column (never `Group`/`List`/`Null`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DistinctKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    I96([u8; 12]),
    FloatBits(u32),
    DoubleBits(u64),
    Bytes(Vec<u8>),
}

impl DistinctKey {
    fn of(value: &Value) -> Option<DistinctKey> {
        Some(match value {
            Value::Bool(b) => DistinctKey::Bool(*b),
            Value::I32(v) => DistinctKey::I32(*v),
            Value::I64(v) => DistinctKey::I64(*v),
            Value::I96(v) => DistinctKey::I96(*v),
            Value::Float(v) => DistinctKey::FloatBits(v.to_bits()),
            Value::Double(v) => DistinctKey::DoubleBits(v.to_bits()),
            Value::Bytes(b) => DistinctKey::Bytes(b.clone()),
            Value::Null | Value::Group(_) | Value::List(_) => return None,
        })
    }
}

impl ColumnStats {
    pub fn new() -> Self {
        ColumnStats {
            distinct_count_exact: true,
            ..Default::default()
        }
    }

    pub fn observe_null(&mut self) {
        self.null_count += 1;
    }

    pub fn observe(&mut self, value: &Value) {
        if let Some(key) = DistinctKey::of(value) {
            self.distinct.insert(key);
        } else {
            self.distinct_count_exact = false;
        }

        self.observe_min_candidate(value);
        self.observe_max_candidate(value);
    }

    pub fn distinct_count(&self) -> Option<i64> {
        if self.distinct_count_exact {
            Some(self.distinct.len() as i64)
        } else {
            None
        }
    }

    /// Folds `other` (a page's stats) into `self` (the running chunk stats).
    pub fn merge(&mut self, other: &ColumnStats) {
        self.null_count += other.null_count;
        if let Some(v) = &other.min {
            self.observe_min_candidate(v);
        }
        if let Some(v) = &other.max {
            self.observe_max_candidate(v);
        }
        for key in &other.distinct {
            self.distinct.insert(key.clone());
        }
        self.distinct_count_exact &= other.distinct_count_exact;
    }

    fn observe_min_candidate(&mut self, value: &Value) {
        match &self.min {
            Some(cur) if compare_values(cur, value) != std::cmp::Ordering::Greater => {}
            _ => self.min = Some(value.clone()),
        }
    }

    fn observe_max_candidate(&mut self, value: &Value) {
        match &self.max {
            Some(cur) if compare_values(cur, value) != std::cmp::Ordering::Less => {}
            _ => self.max = Some(value.clone()),
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::I32(x), Value::I32(y)) => x.cmp(y),
        (Value::I64(x), Value::I64(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::I96(x), Value::I96(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
