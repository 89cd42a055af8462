//! Column projection on read: a cursor built over a path subset yields
//! records containing exactly those keys (plus the ancestor groups of any
//! nested path), regardless of what else the schema declares and
//! regardless of whether a given record actually supplied those fields.

use std::io::Cursor;

use parquet_core::io::VecSink;
use parquet_core::reader::ParquetReader;
use parquet_core::schema::SchemaDeclaration;
use parquet_core::writer::{ParquetWriter, WriterConfig};
use parquet_core::{build_schema, Schema, Value};

fn projection_schema() -> Schema {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "name", "type": "UTF8"},
        {"name": "quantity", "type": "INT32", "optional": true},
        {"name": "stock", "repeated": true, "fields": [
            {"name": "q", "type": "INT32"},
            {"name": "w", "type": "UTF8"},
        ]},
    ]))
    .unwrap();
    build_schema(&decl).unwrap()
}

fn write_rows() -> Vec<u8> {
    let schema = projection_schema();
    let mut writer = ParquetWriter::create(VecSink::new(), schema, WriterConfig::default()).unwrap();
    writer
        .append_row(&Value::group([
            ("name", Value::Bytes(b"kiwi".to_vec())),
            (
                "stock",
                Value::list([Value::group([("q", Value::I32(42)), ("w", Value::Bytes(b"f".to_vec()))])]),
            ),
        ]))
        .unwrap(); // quantity omitted
    writer
        .append_row(&Value::group([("name", Value::Bytes(b"banana".to_vec()))]))
        .unwrap(); // quantity and stock both omitted
    writer.close().unwrap().into_inner()
}

#[test]
fn projected_cursor_yields_exactly_the_requested_keys() {
    let bytes = write_rows();
    let mut reader = ParquetReader::open(Cursor::new(bytes)).unwrap();
    let mut cursor = reader.get_cursor(Some(&[&["name"], &["quantity"]])).unwrap();

    // neither row supplied a quantity, so it's absent (null) for both and
    // is left out of the assembled record entirely, even though it was
    // requested: the projection narrows which keys *can* appear, it
    // doesn't force null fields to appear.
    let kiwi = cursor.next().unwrap().unwrap();
    assert_eq!(kiwi.len(), 1);
    assert!(!kiwi.contains_key("stock"));
    assert_eq!(kiwi.get("name"), Some(&Value::Bytes(b"kiwi".to_vec())));
    assert!(kiwi.get("quantity").is_none());

    let banana = cursor.next().unwrap().unwrap();
    assert_eq!(banana.len(), 1);
    assert!(!banana.contains_key("stock"));
    assert!(banana.get("quantity").is_none());

    assert!(cursor.next().unwrap().is_none());
}

#[test]
fn unprojected_cursor_still_carries_every_declared_non_null_key() {
    let bytes = write_rows();
    let mut reader = ParquetReader::open(Cursor::new(bytes)).unwrap();
    let mut cursor = reader.get_cursor(None).unwrap();

    // kiwi supplied name and stock but not quantity, so quantity (null)
    // is omitted while the other two declared fields are kept.
    let kiwi = cursor.next().unwrap().unwrap();
    assert_eq!(kiwi.len(), 2);
    assert!(kiwi.contains_key("stock"));
    assert!(!kiwi.contains_key("quantity"));
}

#[test]
fn projected_cursor_over_nested_path_includes_ancestor_group() {
    let decl: SchemaDeclaration = serde_json::from_value(serde_json::json!([
        {"name": "name", "type": "UTF8"},
        {"name": "info", "fields": [
            {"name": "weight", "type": "DOUBLE", "optional": true},
            {"name": "colour", "type": "UTF8", "optional": true},
        ]},
    ]))
    .unwrap();
    let schema = build_schema(&decl).unwrap();
    let mut writer = ParquetWriter::create(VecSink::new(), schema, WriterConfig::default()).unwrap();
    writer
        .append_row(&Value::group([
            ("name", Value::Bytes(b"apple".to_vec())),
            (
                "info",
                Value::group([("weight", Value::Double(1.5)), ("colour", Value::Bytes(b"red".to_vec()))]),
            ),
        ]))
        .unwrap();
    let bytes = writer.close().unwrap().into_inner();

    let mut reader = ParquetReader::open(Cursor::new(bytes)).unwrap();
    let mut cursor = reader.get_cursor(Some(&[&["info", "weight"]])).unwrap();
    let record = cursor.next().unwrap().unwrap();

    assert_eq!(record.len(), 1);
    assert!(!record.contains_key("name"));
    let info = record.get("info").unwrap().as_group().unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info.get("weight"), Some(&Value::Double(1.5)));
    assert!(!info.contains_key("colour"));
}
