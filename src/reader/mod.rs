//! The Envelope Reader (spec.md §4.7): opens a `ByteSource`, decodes the
//! footer, and exposes typed cursors over the row groups it describes. The
//! counterpart to `writer::ParquetWriter` — grounded the same way, on the
//! teacher's writer-side state machine, generalized to the read path with
//! the footer-reading strategy other_examples/ Parquet readers (parquet2's
//! `read::metadata`, arrow-rs's `serialized_reader`) use: read a small tail
//! window first, then the exact footer range it names.

pub mod cursor;

pub use cursor::RecordCursor;

use crate::error::{ParquetCoreError, Result};
use crate::format::{schema_from_elements, FileMetaData, FOOTER_LEN_SIZE, PARQUET_MAGIC};
use crate::io::ByteSource;
use crate::metacodec::{MetaCodec, ThriftMetaCodec};
use crate::schema::Schema;

/// Reads a complete Parquet file from a `ByteSource` (spec.md §5 "the
/// reader holds its source until `close`").
pub struct ParquetReader<S: ByteSource, M: MetaCodec = ThriftMetaCodec> {
    source: S,
    meta_codec: M,
    meta: FileMetaData,
    schema: Schema,
}

impl<S: ByteSource> ParquetReader<S, ThriftMetaCodec> {
    /// Opens `source`, validating both magic markers and decoding the
    /// footer (spec.md §4.7 `open`).
    pub fn open(source: S) -> Result<Self> {
        Self::open_with_meta_codec(source, ThriftMetaCodec)
    }
}

impl<S: ByteSource, M: MetaCodec> ParquetReader<S, M> {
    pub fn open_with_meta_codec(mut source: S, meta_codec: M) -> Result<Self> {
        let file_len = source.len()?;
        let min_len = (PARQUET_MAGIC.len() * 2 + FOOTER_LEN_SIZE) as u64;
        if file_len < min_len {
            return Err(ParquetCoreError::format(format!(
                "file is too small to be a parquet file ({file_len} bytes)"
            )));
        }

        let head = source.read_at(0, PARQUET_MAGIC.len())?;
        if head != PARQUET_MAGIC {
            return Err(ParquetCoreError::format("missing leading PAR1 magic"));
        }

        let tail_len = PARQUET_MAGIC.len() + FOOTER_LEN_SIZE;
        let tail = source.read_at(file_len - tail_len as u64, tail_len)?;
        let (footer_len_bytes, trailing_magic) = tail.split_at(FOOTER_LEN_SIZE);
        if trailing_magic != PARQUET_MAGIC {
            return Err(ParquetCoreError::format("missing trailing PAR1 magic"));
        }
        let footer_len = u32::from_le_bytes(footer_len_bytes.try_into().unwrap()) as u64;

        let footer_start = file_len
            .checked_sub(tail_len as u64)
            .and_then(|v| v.checked_sub(footer_len))
            .ok_or_else(|| ParquetCoreError::format("footer length exceeds file size"))?;
        if footer_start < PARQUET_MAGIC.len() as u64 {
            return Err(ParquetCoreError::format("footer overlaps the leading magic"));
        }

        let footer_bytes = source.read_at(footer_start, footer_len as usize)?;
        let (meta, _consumed) = meta_codec.decode(&footer_bytes)?;
        let schema = schema_from_elements(&meta.schema)?;

        Ok(ParquetReader {
            source,
            meta_codec,
            meta,
            schema,
        })
    }

    pub fn get_row_count(&self) -> i64 {
        self.meta.num_rows
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_metadata(&self) -> &FileMetaData {
        &self.meta
    }

    /// Returns a cursor producing assembled records, optionally projected
    /// to a subset of leaf paths (spec.md §4.7 `getCursor`, §4.4
    /// "Projection"). `None` reads every leaf.
    pub fn get_cursor(&mut self, paths: Option<&[&[&str]]>) -> Result<RecordCursor<'_, S, M>> {
        let leaf_indices = match paths {
            None => self.schema.leaves.clone(),
            Some(paths) => paths
                .iter()
                .map(|path| {
                    let idx = self.schema.find_field(path)?;
                    if !self.schema.node(idx).is_leaf() {
                        return Err(ParquetCoreError::config(format!(
                            "projected path '{}' does not name a leaf column",
                            path.join(".")
                        )));
                    }
                    Ok(idx)
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(RecordCursor::new(
            &mut self.source,
            &self.meta_codec,
            &self.schema,
            &self.meta.row_groups,
            leaf_indices,
        ))
    }

    /// Releases the source (spec.md §4.7 `close`). A no-op beyond dropping
    /// the handle — this reader does not retain any cross-call I/O state
    /// beyond the decoded footer.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::VecSink;
    use crate::value::Value;
    use crate::writer::{ParquetWriter, WriterConfig};
    use std::io::Cursor;

    fn fruit_schema() -> Schema {
        let decl: crate::schema::SchemaDeclaration = serde_json::from_value(serde_json::json!([
            {"name": "name", "type": "UTF8"},
            {"name": "quantity", "type": "INT32", "optional": true},
            {"name": "tags", "type": "UTF8", "repeated": true},
        ]))
        .unwrap();
        crate::schema::build_schema(&decl).unwrap()
    }

    fn write_fruit_file() -> Vec<u8> {
        let schema = fruit_schema();
        let sink = VecSink::new();
        let mut writer = ParquetWriter::create(sink, schema, WriterConfig::default()).unwrap();
        writer
            .append_row(&Value::group([
                ("name", Value::Bytes(b"apple".to_vec())),
                ("quantity", Value::I32(10)),
                ("tags", Value::list([Value::Bytes(b"red".to_vec()), Value::Bytes(b"sweet".to_vec())])),
            ]))
            .unwrap();
        writer
            .append_row(&Value::group([
                ("name", Value::Bytes(b"banana".to_vec())),
                ("quantity", Value::Null),
                ("tags", Value::List(vec![])),
            ]))
            .unwrap();
        writer.close().unwrap().into_inner()
    }

    #[test]
    fn opens_and_reports_row_count() {
        let bytes = write_fruit_file();
        let source = Cursor::new(bytes);
        let reader = ParquetReader::open(source).unwrap();
        assert_eq!(reader.get_row_count(), 2);
        assert_eq!(reader.get_schema().leaves.len(), 3);
    }

    #[test]
    fn rejects_missing_magic() {
        let mut bytes = write_fruit_file();
        bytes[0] = b'X';
        let source = Cursor::new(bytes);
        let err = ParquetReader::open(source).unwrap_err();
        assert!(matches!(err, ParquetCoreError::FormatError(_)));
    }

    #[test]
    fn cursor_round_trips_full_records() {
        let bytes = write_fruit_file();
        let source = Cursor::new(bytes);
        let mut reader = ParquetReader::open(source).unwrap();
        let mut cursor = reader.get_cursor(None).unwrap();

        let first = cursor.next().unwrap().unwrap();
        assert_eq!(first.get("name"), Some(&Value::Bytes(b"apple".to_vec())));
        assert_eq!(first.get("quantity"), Some(&Value::I32(10)));

        let second = cursor.next().unwrap().unwrap();
        assert_eq!(second.get("name"), Some(&Value::Bytes(b"banana".to_vec())));
        assert!(second.get("quantity").is_none());

        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn cursor_projection_omits_other_keys() {
        let bytes = write_fruit_file();
        let source = Cursor::new(bytes);
        let mut reader = ParquetReader::open(source).unwrap();
        let mut cursor = reader.get_cursor(Some(&[&["name"], &["quantity"]])).unwrap();

        let first = cursor.next().unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert!(!first.contains_key("tags"));

        let second = cursor.next().unwrap().unwrap();
        assert!(!second.contains_key("tags"));
        assert!(cursor.next().unwrap().is_none());
    }
}
