//! The row-group/file writer (spec.md §4.6): the `Open → [Row*] → [Flush*]
//! → Closed` state machine that shreds rows into the buffered appender
//! tree, flushes row groups to pages on size thresholds, and finalizes the
//! footer — the direct descendant of the teacher's `parquet_writer`/
//! `parquet_row_writer` pair, generalized from a fixed Postgres row shape to
//! any `Schema`.

pub mod column_buffer;
pub mod config;

pub use config::{BloomFilterSpec, WriterConfig};

use crate::error::{ParquetCoreError, Result};
use crate::format::{
    schema_to_elements, ColumnChunk, ColumnMetaData, Encoding, FileMetaData, KeyValue, RowGroup, Statistics,
    CREATED_BY, FILE_VERSION, PARQUET_MAGIC,
};
use crate::io::ByteSink;
use crate::metacodec::{MetaCodec, ThriftMetaCodec};
use crate::schema::Schema;
use crate::shred::Shredder;
use crate::value::Value;

use self::column_buffer::{build_leaf_metas, LeafMeta, RowGroupSink};

#[derive(Debug, PartialEq, Eq)]
enum WriterState {
    Open,
    Poisoned,
    Closed,
}

/// Writes a complete Parquet file to a `ByteSink` (spec.md §5 "the writer
/// holds a single handle to its sink and releases it only in `close`").
pub struct ParquetWriter<S: ByteSink, M: MetaCodec = ThriftMetaCodec> {
    sink: S,
    schema: Schema,
    config: WriterConfig,
    meta_codec: M,
    shredder: Shredder,
    leaf_metas: Vec<LeafMeta>,
    row_count_in_group: i64,
    total_row_count: i64,
    buffered_estimate: usize,
    row_groups: Vec<RowGroup>,
    key_value_metadata: Vec<KeyValue>,
    state: WriterState,
}

impl<S: ByteSink> ParquetWriter<S, ThriftMetaCodec> {
    /// Opens a writer over `sink`, writing the leading `PAR1` magic
    /// immediately (spec.md §6 "the file begins with magic `PAR1`").
    pub fn create(sink: S, schema: Schema, config: WriterConfig) -> Result<Self> {
        Self::with_meta_codec(sink, schema, config, ThriftMetaCodec)
    }
}

impl<S: ByteSink, M: MetaCodec> ParquetWriter<S, M> {
    pub fn with_meta_codec(mut sink: S, schema: Schema, config: WriterConfig, meta_codec: M) -> Result<Self> {
        sink.write_all(PARQUET_MAGIC)?;
        let leaf_metas = build_leaf_metas(&schema, &config)?;
        let shredder = Shredder::new(&schema);
        Ok(ParquetWriter {
            sink,
            schema,
            config,
            meta_codec,
            shredder,
            leaf_metas,
            row_count_in_group: 0,
            total_row_count: 0,
            buffered_estimate: 0,
            row_groups: Vec::new(),
            key_value_metadata: Vec::new(),
            state: WriterState::Open,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Appends one key-value pair to the footer's user metadata (spec.md
    /// §4.6 `setMetadata`); duplicate keys are retained, not overwritten.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.key_value_metadata.push(KeyValue {
            key: key.into(),
            value: Some(value.into()),
        });
    }

    /// Shreds `record` into the buffered column appenders, flushing the
    /// current row group first if the configured threshold was reached.
    pub fn append_row(&mut self, record: &Value) -> Result<()> {
        self.ensure_open()?;
        match self.try_append_row(record) {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_poisoning() {
                    self.state = WriterState::Poisoned;
                }
                Err(e)
            }
        }
    }

    fn try_append_row(&mut self, record: &Value) -> Result<()> {
        let estimate = self.shredder.append_record(record)?;
        self.buffered_estimate += estimate;
        self.row_count_in_group += 1;
        self.total_row_count += 1;
        if self.buffered_estimate >= self.config.row_group_size {
            self.flush_row_group()?;
        }
        Ok(())
    }

    /// Flushes the currently buffered row group, if any rows are pending.
    /// A no-op when called with nothing buffered, so `close` can call it
    /// unconditionally.
    pub fn flush_row_group(&mut self) -> Result<()> {
        if self.row_count_in_group == 0 {
            return Ok(());
        }
        let row_group = match self.try_flush_row_group() {
            Ok(rg) => rg,
            Err(e) => {
                if e.is_poisoning() {
                    self.state = WriterState::Poisoned;
                }
                return Err(e);
            }
        };
        tracing::debug!(num_rows = row_group.num_rows, num_columns = row_group.columns.len(), "flushed row group");
        self.row_groups.push(row_group);
        self.row_count_in_group = 0;
        self.buffered_estimate = 0;
        Ok(())
    }

    fn try_flush_row_group(&mut self) -> Result<RowGroup> {
        let accums = {
            let mut row_group_sink = RowGroupSink::new(
                &mut self.sink,
                &self.leaf_metas,
                self.config.use_data_page_v2,
                self.config.page_size,
            );
            self.shredder.flush_into(&mut row_group_sink)?;
            row_group_sink.accums
        };

        let mut columns = Vec::with_capacity(accums.len());
        let mut total_byte_size = 0i64;
        for (meta, accum) in self.leaf_metas.iter().zip(accums.into_iter()) {
            let encodings = if meta.max_dl > 0 || meta.max_rl > 0 {
                vec![Encoding::Rle.id(), Encoding::Plain.id()]
            } else {
                vec![Encoding::Plain.id()]
            };
            let statistics = Statistics::from_column_stats(&accum.stats, meta.primitive, meta.type_length)?;
            let data_page_offset = accum.first_page_offset.unwrap_or(self.sink.position()? as i64);
            let col_meta = ColumnMetaData {
                primitive_type_id: meta.primitive.thrift_id(),
                encodings,
                path_in_schema: meta.path.clone(),
                codec_id: meta.codec_kind.id(),
                num_values: accum.num_values,
                total_uncompressed_size: accum.total_uncompressed_size,
                total_compressed_size: accum.total_compressed_size,
                key_value_metadata: vec![],
                data_page_offset,
                dictionary_page_offset: None,
                statistics: Some(statistics),
                bloom_filter_offset: None,
                bloom_filter_length: None,
            };
            total_byte_size += col_meta.total_compressed_size;
            columns.push(ColumnChunk {
                file_offset: data_page_offset,
                meta_data: Some(col_meta),
            });
        }

        self.reserve_bloom_filters(&mut columns)?;

        Ok(RowGroup {
            columns,
            total_byte_size,
            num_rows: self.row_count_in_group,
        })
    }

    /// Reserves each configured bloom filter's byte range after the row
    /// group's pages (spec.md §4.6, §6 `bloomFilters`): the bytes
    /// themselves are a zero-filled placeholder, only the offset matters.
    fn reserve_bloom_filters(&mut self, columns: &mut [ColumnChunk]) -> Result<()> {
        for spec in &self.config.bloom_filters {
            let chunk = columns.iter_mut().find(|c| {
                c.meta_data
                    .as_ref()
                    .map(|m| m.path_in_schema.join(".") == spec.column)
                    .unwrap_or(false)
            });
            let Some(chunk) = chunk else {
                return Err(ParquetCoreError::config(format!(
                    "bloomFilters spec references unknown column '{}'",
                    spec.column
                )));
            };
            let offset = self.sink.position()? as i64;
            self.sink.write_all(&vec![0u8; spec.num_filter_bytes.max(0) as usize])?;
            if let Some(meta) = chunk.meta_data.as_mut() {
                meta.bloom_filter_offset = Some(offset);
                meta.bloom_filter_length = Some(spec.num_filter_bytes);
            }
        }
        Ok(())
    }

    /// Flushes any pending row group, writes the footer, and releases the
    /// sink back to the caller (spec.md §4.6 `close`): ownership of `S`
    /// returns here rather than vanishing, so a `VecSink`-backed writer can
    /// hand its caller the finished bytes. A writer poisoned by a prior
    /// error still attempts to flush the sink, but returns the poisoning
    /// error instead of the sink.
    pub fn close(mut self) -> Result<S> {
        if self.state == WriterState::Poisoned {
            let _ = self.sink.flush();
            return Err(ParquetCoreError::format("writer is poisoned by a previous error"));
        }

        match self.finish_close() {
            Ok(()) => {
                let _ = self.sink.flush();
                Ok(self.sink)
            }
            Err(e) => {
                let _ = self.sink.flush();
                Err(e)
            }
        }
    }

    fn finish_close(&mut self) -> Result<()> {
        self.flush_row_group()?;

        let file_meta = FileMetaData {
            version: FILE_VERSION,
            schema: schema_to_elements(&self.schema),
            num_rows: self.total_row_count,
            row_groups: std::mem::take(&mut self.row_groups),
            key_value_metadata: std::mem::take(&mut self.key_value_metadata),
            created_by: Some(CREATED_BY.to_string()),
        };
        let meta_bytes = self.meta_codec.encode(&file_meta)?;
        self.sink.write_all(&meta_bytes)?;
        self.sink.write_all(&(meta_bytes.len() as u32).to_le_bytes())?;
        self.sink.write_all(PARQUET_MAGIC)?;
        self.state = WriterState::Closed;
        tracing::debug!(num_rows = file_meta.num_rows, num_row_groups = file_meta.row_groups.len(), "closed parquet writer");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Poisoned => Err(ParquetCoreError::format("writer is poisoned by a previous error")),
            WriterState::Closed => Err(ParquetCoreError::format("writer is already closed")),
        }
    }
}

impl<M: MetaCodec> ParquetWriter<crate::io::VecSink, M> {
    /// Peeks everything written to the in-memory sink so far, without
    /// taking it (spec.md §6 "streaming writer" / `stream.rs`): the
    /// transformer drains this incrementally rather than waiting for
    /// `close`.
    pub fn peek_written(&self) -> &[u8] {
        &self.sink.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::VecSink;

    fn fruit_schema() -> Schema {
        let decl: crate::schema::SchemaDeclaration = serde_json::from_value(serde_json::json!([
            {"name": "name", "type": "UTF8"},
            {"name": "quantity", "type": "INT32", "optional": true},
            {"name": "tags", "type": "UTF8", "repeated": true},
        ]))
        .unwrap();
        crate::schema::build_schema(&decl).unwrap()
    }

    #[test]
    fn writes_magic_header_and_trailer() {
        let schema = fruit_schema();
        let sink = VecSink::new();
        let mut writer = ParquetWriter::create(sink, schema, WriterConfig::default()).unwrap();
        writer
            .append_row(&Value::group([
                ("name", Value::Bytes(b"apple".to_vec())),
                ("quantity", Value::I32(10)),
                ("tags", Value::list([Value::Bytes(b"red".to_vec())])),
            ]))
            .unwrap();
        let sink = writer.close().unwrap();
        let bytes = sink.into_inner();
        assert_eq!(&bytes[0..4], &crate::format::PARQUET_MAGIC[..]);
        assert_eq!(&bytes[bytes.len() - 4..], &crate::format::PARQUET_MAGIC[..]);
    }

    #[test]
    fn produces_a_well_formed_footer() {
        let schema = fruit_schema();
        let sink = VecSink::new();
        let mut config = WriterConfig::default();
        config.row_group_size = 16; // force at least one mid-stream flush
        let mut writer = ParquetWriter::create(sink, schema, config).unwrap();
        for i in 0..5 {
            writer
                .append_row(&Value::group([
                    ("name", Value::Bytes(format!("fruit{i}").into_bytes())),
                    ("quantity", Value::I32(i)),
                    ("tags", Value::List(vec![])),
                ]))
                .unwrap();
        }

        let bytes = writer.close().unwrap().into_inner();
        assert_eq!(&bytes[0..4], &crate::format::PARQUET_MAGIC[..]);
        assert_eq!(&bytes[bytes.len() - 4..], &crate::format::PARQUET_MAGIC[..]);

        let footer_len = u32::from_le_bytes(bytes[bytes.len() - 8..bytes.len() - 4].try_into().unwrap()) as usize;
        let footer_start = bytes.len() - 8 - footer_len;
        let meta = FileMetaData::from_bytes(&bytes[footer_start..bytes.len() - 8]).unwrap();
        assert_eq!(meta.num_rows, 5);
        assert!(!meta.row_groups.is_empty());
        assert_eq!(meta.created_by.as_deref(), Some(CREATED_BY));
    }

}
