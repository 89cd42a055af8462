//! `RecordCursor`: pulls row groups off a `ByteSource` one at a time,
//! decoding each projected leaf's column chunk into an `assemble::LeafColumn`
//! and handing the buffered triples to an `Assembler` (spec.md §4.7
//! `getCursor`/`next`). Grounded the same way the writer side drains a
//! `Shredder` into `RowGroupSink` one row group at a time, just inverted.

use std::collections::BTreeMap;

use crate::assemble::{Assembler, LeafColumn};
use crate::codec::codec_for;
use crate::error::{ParquetCoreError, Result};
use crate::format::{CompressionCodec, ColumnMetaData, PageHeader, PageType, RowGroup};
use crate::io::ByteSource;
use crate::metacodec::MetaCodec;
use crate::page::decode_page;
use crate::schema::Schema;
use crate::value::{Record, Value};

/// Produces assembled `Record`s across every row group of a file, projected
/// to a fixed set of leaf columns.
pub struct RecordCursor<'a, S: ByteSource, M: MetaCodec> {
    source: &'a mut S,
    #[allow(dead_code)]
    meta_codec: &'a M,
    schema: &'a Schema,
    row_groups: &'a [RowGroup],
    leaf_indices: Vec<usize>,
    row_group_pos: usize,
    assembler: Option<Assembler<'a>>,
}

impl<'a, S: ByteSource, M: MetaCodec> RecordCursor<'a, S, M> {
    pub(super) fn new(
        source: &'a mut S,
        meta_codec: &'a M,
        schema: &'a Schema,
        row_groups: &'a [RowGroup],
        leaf_indices: Vec<usize>,
    ) -> Self {
        RecordCursor {
            source,
            meta_codec,
            schema,
            row_groups,
            leaf_indices,
            row_group_pos: 0,
            assembler: None,
        }
    }

    /// Returns the next assembled record, or `None` once every row group has
    /// been exhausted.
    pub fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(assembler) = &mut self.assembler {
                if let Some(record) = assembler.next_record()? {
                    return Ok(Some(unwrap_root_group(record)));
                }
            }
            if self.row_group_pos >= self.row_groups.len() {
                return Ok(None);
            }
            let columns = self.load_row_group(self.row_group_pos)?;
            self.row_group_pos += 1;
            self.assembler = Some(Assembler::new_projected(self.schema, columns));
        }
    }

    fn load_row_group(&mut self, rg_idx: usize) -> Result<BTreeMap<usize, LeafColumn>> {
        let row_group = &self.row_groups[rg_idx];
        let mut columns = BTreeMap::new();

        for &leaf_node_idx in &self.leaf_indices {
            let ordinal = self
                .schema
                .leaves
                .iter()
                .position(|&l| l == leaf_node_idx)
                .ok_or_else(|| ParquetCoreError::format("projected leaf is not part of the schema's leaf list"))?;
            let chunk = row_group.columns.get(ordinal).ok_or_else(|| {
                ParquetCoreError::format(format!("row group is missing column chunk {ordinal}"))
            })?;
            let meta = chunk
                .meta_data
                .as_ref()
                .ok_or_else(|| ParquetCoreError::format("column chunk is missing its metadata"))?;

            let column = read_leaf_column(self.source, self.schema, leaf_node_idx, meta)?;
            columns.insert(leaf_node_idx, column);
        }

        Ok(columns)
    }
}

fn unwrap_root_group(record: Value) -> Record {
    match record {
        Value::Group(map) => map,
        other => {
            // `Assembler::next_record` always assembles from `schema::ROOT`,
            // which is always a group.
            unreachable!("assembled root record was not a group: {}", other.type_name())
        }
    }
}

/// Reads and decodes one projected leaf's whole column chunk, concatenating
/// every page's triples in file order (spec.md §4.7 invariant 9: "a leaf's
/// decoded slots and its data pages replay in the same order they were
/// written").
fn read_leaf_column(
    source: &mut impl ByteSource,
    schema: &Schema,
    leaf_node_idx: usize,
    meta: &ColumnMetaData,
) -> Result<LeafColumn> {
    let node = schema.node(leaf_node_idx);
    let primitive = node
        .primitive_type()
        .ok_or_else(|| ParquetCoreError::format("projected column does not name a leaf"))?;
    let type_length = node.type_length();
    let max_dl = node.d_level_max;
    let max_rl = node.r_level_max;

    let codec_kind = CompressionCodec::from_id(meta.codec_id)?;
    let codec = codec_for(codec_kind)?;

    let chunk_bytes = source.read_at(meta.data_page_offset as u64, meta.total_compressed_size as usize)?;

    let mut values = Vec::new();
    let mut dls = Vec::new();
    let mut rls = Vec::new();
    let mut pos = 0usize;
    let mut values_seen = 0i64;

    while pos < chunk_bytes.len() && values_seen < meta.num_values {
        let (header, header_len) = PageHeader::from_bytes(&chunk_bytes[pos..])?;
        let body_start = pos + header_len;
        let body_end = body_start + header.compressed_page_size as usize;
        let body = chunk_bytes.get(body_start..body_end).ok_or_else(|| {
            ParquetCoreError::format("column chunk is truncated mid-page")
        })?;

        let page_type = PageType::from_id(header.page_type_id)?;
        match page_type {
            PageType::DataPage | PageType::DataPageV2 => {
                let decoded = decode_page(&header, body, max_dl, max_rl, primitive, type_length, codec.as_ref())?;
                values_seen += decoded.dls.len().max(decoded.values.len()) as i64;
                values.extend(decoded.values);
                dls.extend(decoded.dls);
                rls.extend(decoded.rls);
            }
            PageType::DictionaryPage | PageType::IndexPage => {
                return Err(ParquetCoreError::format(
                    "dictionary/index pages are not supported by this reader",
                ));
            }
        }

        pos = body_end;
    }

    if values_seen != meta.num_values {
        return Err(ParquetCoreError::format(format!(
            "column chunk declared {} values but decoded {}",
            meta.num_values, values_seen
        )));
    }

    Ok(LeafColumn { values, dls, rls })
}
