//! The row-group column sink (spec.md §4.6): receives each leaf's fully
//! buffered `(value, rLevel, dLevel)` triples from `Shredder::flush_into`,
//! slices them into pages via `page::plan_pages`/`build_page`, and writes
//! the resulting bytes straight to the writer's `ByteSink`, the way the
//! teacher's `parquet_writer`/`parquet_row_writer` pair drove column-chunk
//! writes off a flushed appender tree.

use crate::codec::codec_for;
use crate::error::Result;
use crate::format::CompressionCodec;
use crate::io::ByteSink;
use crate::page::{build_page, plan_pages};
use crate::schema::{PrimitiveType, Schema};
use crate::shred::ColumnSink;
use crate::stats::ColumnStats;
use crate::value::Value;

use super::config::WriterConfig;

/// Static, per-leaf facts the column writer needs, derived once from the
/// schema and held for the life of the `ParquetWriter`.
#[derive(Debug, Clone)]
pub struct LeafMeta {
    pub path: Vec<String>,
    pub primitive: PrimitiveType,
    pub type_length: Option<i32>,
    pub max_dl: i16,
    pub max_rl: i16,
    pub codec_kind: CompressionCodec,
}

/// Resolves compression per leaf: a leaf's own declared compression wins
/// unless it was left at the schema-declaration default, in which case the
/// writer's configured default applies (spec.md §6 "default compression
/// inherited by leaves lacking one").
pub fn build_leaf_metas(schema: &Schema, config: &WriterConfig) -> Result<Vec<LeafMeta>> {
    schema
        .leaves()
        .map(|(_, node)| {
            let codec_kind = match node.compression() {
                Some("UNCOMPRESSED") | None => config.compression,
                Some(name) => CompressionCodec::from_name(name)?,
            };
            Ok(LeafMeta {
                path: node.path.clone(),
                primitive: node.primitive_type().expect("leaf node always has a primitive type"),
                type_length: node.type_length(),
                max_dl: node.d_level_max,
                max_rl: node.r_level_max,
                codec_kind,
            })
        })
        .collect()
}

/// What's accumulated for one leaf across every page flushed in a row group.
#[derive(Debug, Default)]
pub struct LeafAccum {
    pub first_page_offset: Option<i64>,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub num_values: i64,
    pub stats: ColumnStats,
}

/// Drives pages straight onto the sink as each leaf is flushed, rather than
/// buffering whole column chunks in memory a second time (spec.md §9 "Arena
/// style column buffers ... released after the row group is flushed").
pub struct RowGroupSink<'a, S: ByteSink> {
    sink: &'a mut S,
    leaf_metas: &'a [LeafMeta],
    use_v2: bool,
    page_size_target: usize,
    pub accums: Vec<LeafAccum>,
}

impl<'a, S: ByteSink> RowGroupSink<'a, S> {
    pub fn new(sink: &'a mut S, leaf_metas: &'a [LeafMeta], use_v2: bool, page_size_target: usize) -> Self {
        let accums = leaf_metas.iter().map(|_| LeafAccum::default()).collect();
        RowGroupSink {
            sink,
            leaf_metas,
            use_v2,
            page_size_target,
            accums,
        }
    }
}

impl<'a, S: ByteSink> ColumnSink for RowGroupSink<'a, S> {
    fn write_leaf_column(&mut self, leaf_idx: usize, values: &[Value], dls: &[i16], rls: &[i16]) -> Result<()> {
        let meta = &self.leaf_metas[leaf_idx];
        let accum = &mut self.accums[leaf_idx];
        let codec = codec_for(meta.codec_kind)?;

        let slices = plan_pages(values, dls, meta.max_dl, meta.primitive, self.page_size_target);
        for slice in slices {
            let page_values = &values[slice.value_range.clone()];
            let page_dls = if meta.max_dl > 0 { &dls[slice.dl_range.clone()] } else { &[] as &[i16] };
            let page_rls = if meta.max_rl > 0 { &rls[slice.dl_range.clone()] } else { &[] as &[i16] };

            let page = build_page(
                page_values,
                page_dls,
                page_rls,
                meta.max_dl,
                meta.max_rl,
                meta.primitive,
                meta.type_length,
                codec.as_ref(),
                meta.codec_kind.id(),
                self.use_v2,
            )?;

            if accum.first_page_offset.is_none() {
                accum.first_page_offset = Some(self.sink.position()? as i64);
            }
            self.sink.write_all(&page.header_bytes)?;
            self.sink.write_all(&page.body)?;

            accum.total_uncompressed_size += (page.header_bytes.len() + page.uncompressed_size as usize) as i64;
            accum.total_compressed_size += (page.header_bytes.len() + page.body.len()) as i64;
            accum.num_values += page.num_values as i64;
            accum.stats.merge(&page.stats);
        }
        Ok(())
    }
}
