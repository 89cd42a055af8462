//! Error-kind coverage: configuration errors for malformed schemas and
//! unsupported typed input, the writer's poisoning behaviour once an
//! append fails, bloom-filter offset bookkeeping, and streaming error
//! propagation.

use std::io::Cursor;

use futures_util::sink::SinkExt;

use parquet_core::format::FileMetaData;
use parquet_core::io::VecSink;
use parquet_core::reader::ParquetReader;
use parquet_core::schema::SchemaDeclaration;
use parquet_core::stream::ParquetByteStream;
use parquet_core::writer::{BloomFilterSpec, ParquetWriter, WriterConfig};
use parquet_core::{build_schema, ParquetCoreError, Record, Schema, Value};

fn utf8_schema() -> Schema {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "label", "type": "UTF8"},
    ]))
    .unwrap();
    build_schema(&decl).unwrap()
}

#[test]
fn build_schema_rejects_unknown_type_name() {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "x", "type": "NOT_A_TYPE"},
    ]))
    .unwrap();
    let err = build_schema(&decl).unwrap_err();
    assert!(matches!(err, ParquetCoreError::ConfigError(_)));
}

#[test]
fn build_schema_rejects_decimal_precision_out_of_range() {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "amount", "type": "DECIMAL", "precision": 50, "scale": 0},
    ]))
    .unwrap();
    let err = build_schema(&decl).unwrap_err();
    assert!(matches!(err, ParquetCoreError::ConfigError(_)));
}

/// A field that pairs a primitive `type` with nested `fields` is illegal
/// nesting (spec.md §4.1 "primitive with children") rather than silently
/// treated as a group with the type ignored.
#[test]
fn build_schema_rejects_primitive_with_nested_fields() {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "bad", "type": "INT32", "fields": [
            {"name": "inner", "type": "UTF8"},
        ]},
    ]))
    .unwrap();
    let err = build_schema(&decl).unwrap_err();
    assert!(matches!(err, ParquetCoreError::ConfigError(_)));
}

/// A typed input other than raw bytes, supplied for a column whose logical
/// type only accepts a byte-level buffer, fails with a message naming it
/// unsupported rather than silently coercing.
#[test]
fn unsupported_typed_input_for_a_byte_backed_column_is_rejected() {
    let schema = utf8_schema();
    let mut writer = ParquetWriter::create(VecSink::new(), schema, WriterConfig::default()).unwrap();
    let err = writer
        .append_row(&Value::group([("label", Value::I32(42))]))
        .unwrap_err();
    assert!(matches!(err, ParquetCoreError::ConfigError(_)));
    assert!(err.to_string().contains("is not supported"), "{err}");
}

/// A record that violates the physical type of its column poisons the
/// writer: every later call fails instead of silently producing a corrupt
/// file.
#[test]
fn type_mismatch_poisons_the_writer() {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "id", "type": "INT64"},
    ]))
    .unwrap();
    let schema = build_schema(&decl).unwrap();
    let mut writer = ParquetWriter::create(VecSink::new(), schema, WriterConfig::default()).unwrap();

    let err = writer
        .append_row(&Value::group([("id", Value::Bytes(b"not an int".to_vec()))]))
        .unwrap_err();
    assert!(matches!(err, ParquetCoreError::InvalidInput(_)));

    let second = writer
        .append_row(&Value::group([("id", Value::I64(1))]))
        .unwrap_err();
    assert!(matches!(second, ParquetCoreError::FormatError(_)));

    let closed = writer.close().unwrap_err();
    assert!(matches!(closed, ParquetCoreError::FormatError(_)));
}

/// A configuration error, unlike an input-shape error, does not poison the
/// writer — the caller can simply try a different record.
#[test]
fn config_errors_do_not_poison_the_writer() {
    let schema = utf8_schema();
    let mut writer = ParquetWriter::create(VecSink::new(), schema, WriterConfig::default()).unwrap();

    let err = writer
        .append_row(&Value::group([("label", Value::I32(42))]))
        .unwrap_err();
    assert!(matches!(err, ParquetCoreError::ConfigError(_)));

    writer
        .append_row(&Value::group([("label", Value::Bytes(b"ok".to_vec()))]))
        .unwrap();
    writer.close().unwrap();
}

/// The column's recorded bloom-filter offset matches the absolute byte
/// position of the reserved region, and the region is exactly the
/// requested size.
#[test]
fn bloom_filter_offset_points_at_the_reserved_region() {
    let schema = utf8_schema();
    let mut config = WriterConfig::default();
    config.bloom_filters = vec![BloomFilterSpec {
        column: "label".to_string(),
        num_filter_bytes: 1024,
    }];
    let mut writer = ParquetWriter::create(VecSink::new(), schema, config).unwrap();
    writer
        .append_row(&Value::group([("label", Value::Bytes(b"apple".to_vec()))]))
        .unwrap();
    let bytes = writer.close().unwrap().into_inner();

    let footer_len = u32::from_le_bytes(bytes[bytes.len() - 8..bytes.len() - 4].try_into().unwrap()) as usize;
    let footer_start = bytes.len() - 8 - footer_len;
    let meta = FileMetaData::from_bytes(&bytes[footer_start..bytes.len() - 8]).unwrap();
    let col_meta = meta.row_groups[0].columns[0].meta_data.as_ref().unwrap();
    let offset = col_meta.bloom_filter_offset.unwrap() as usize;
    let length = col_meta.bloom_filter_length.unwrap() as usize;

    assert_eq!(length, 1024);
    assert!(offset + length <= footer_start);
    assert!(bytes[offset..offset + length].iter().all(|&b| b == 0));

    let reader = ParquetReader::open(Cursor::new(bytes)).unwrap();
    let read_back = reader.get_metadata().row_groups[0].columns[0]
        .meta_data
        .as_ref()
        .unwrap()
        .bloom_filter_offset
        .unwrap();
    assert_eq!(read_back as usize, offset);
}

/// A streaming transform surfaces a shredding failure as the sink's error
/// signal instead of finishing silently.
#[test]
fn streaming_type_mismatch_surfaces_as_a_sink_error() {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "id", "type": "INT64"},
    ]))
    .unwrap();
    let schema = build_schema(&decl).unwrap();

    futures::executor::block_on(async {
        let mut stream = ParquetByteStream::new(schema, WriterConfig::default()).unwrap();
        let err = stream
            .send(Record::from([(
                "id".to_string(),
                Value::Bytes(b"not an int".to_vec()),
            )]))
            .await
            .unwrap_err();
        assert!(matches!(err, ParquetCoreError::InvalidInput(_)));
    });
}
