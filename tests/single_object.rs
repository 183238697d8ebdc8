//! Tests for the single-object encoding.

use anson::{read_single_object, write_single_object, AnsonErr, Schema, SchemaStore, Value};
use std::str::FromStr;

#[test]
fn single_object_layout() {
    let schema = Schema::from_str(r##""int""##).unwrap();
    let mut buf = Vec::new();
    write_single_object(&Value::Int(3), &schema, &mut buf).unwrap();

    // marker, little-endian rabin fingerprint of "int", then the datum
    assert_eq!(
        buf,
        vec![0xC3, 0x01, 143, 92, 57, 63, 26, 213, 117, 114, 0x06]
    );
}

#[test]
fn single_object_round_trip() {
    let mut store = SchemaStore::new();
    let fingerprint = store.register(Schema::from_str(r##""string""##).unwrap());
    assert_eq!(fingerprint, 0x8f014872634503c7);

    let schema = Schema::from_str(r##""string""##).unwrap();
    let mut buf = Vec::new();
    write_single_object(&Value::Str("hello".to_string()), &schema, &mut buf).unwrap();

    let decoded = read_single_object(&mut buf.as_slice(), &store).unwrap();
    assert_eq!(decoded, Value::Str("hello".to_string()));
}

#[test]
fn single_object_record_round_trip() {
    let schema_json = r##"{
        "type": "record",
        "name": "Ping",
        "fields": [
            {"name": "seq", "type": "long"},
            {"name": "payload", "type": "bytes"}
        ]
    }"##;
    let mut store = SchemaStore::new();
    store.register(Schema::from_str(schema_json).unwrap());

    let schema = Schema::from_str(schema_json).unwrap();
    let mut rec = anson::Record::new("Ping");
    rec.insert("seq", 42i64).unwrap();
    rec.insert("payload", vec![1u8, 2, 3]).unwrap();
    let value = Value::Record(rec);

    let mut buf = Vec::new();
    write_single_object(&value, &schema, &mut buf).unwrap();
    let decoded = read_single_object(&mut buf.as_slice(), &store).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn unknown_fingerprint_fails() {
    let store = SchemaStore::new();

    let schema = Schema::from_str(r##""int""##).unwrap();
    let mut buf = Vec::new();
    write_single_object(&Value::Int(3), &schema, &mut buf).unwrap();

    match read_single_object(&mut buf.as_slice(), &store) {
        Err(AnsonErr::UnknownFingerprint(fp)) => {
            assert_eq!(fp, schema.canonical_form().rabin64())
        }
        other => panic!("expected UnknownFingerprint, got {:?}", other),
    }
}

#[test]
fn bad_marker_fails() {
    let store = SchemaStore::new();
    let buf = [0xC4u8, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0x06];
    match read_single_object(&mut buf.as_ref(), &store) {
        Err(AnsonErr::InvalidSingleObjectMarker(0xC4, 0x01)) => {}
        other => panic!("expected InvalidSingleObjectMarker, got {:?}", other),
    }
}

#[test]
fn truncated_header_fails_with_eof() {
    let store = SchemaStore::new();
    let buf = [0xC3u8, 0x01, 1, 2, 3];
    match read_single_object(&mut buf.as_ref(), &store) {
        Err(AnsonErr::UnexpectedEof) => {}
        other => panic!("expected UnexpectedEof, got {:?}", other),
    }
}

#[test]
fn store_resolves_between_registered_schemas() {
    // two schemas registered; the fingerprint picks the right one
    let mut store = SchemaStore::new();
    store.register(Schema::from_str(r##""int""##).unwrap());
    store.register(Schema::from_str(r##""string""##).unwrap());

    let schema = Schema::from_str(r##""int""##).unwrap();
    let mut buf = Vec::new();
    write_single_object(&Value::Int(-1), &schema, &mut buf).unwrap();
    assert_eq!(
        read_single_object(&mut buf.as_slice(), &store).unwrap(),
        Value::Int(-1)
    );
}
