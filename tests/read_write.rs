mod common;

use crate::common::{writer_from_schema, MockSchema, Primitive};
use anson::{from_datum, to_datum, Reader, Record, Schema, Value, WriterBuilder};
use std::collections::HashMap;
use std::str::FromStr;

const DATUM_COUNT: usize = 1000;

const CODECS: [&str; 3] = ["null", "deflate", "bzip2"];

///////////////////////////////////////////////////////////////////////////////
/// Primitive schema tests
///////////////////////////////////////////////////////////////////////////////

static PRIMITIVES: [Primitive; 8] = [
    Primitive::Null,
    Primitive::Boolean,
    Primitive::Int,
    Primitive::Long,
    Primitive::Float,
    Primitive::Double,
    Primitive::Bytes,
    Primitive::String,
];

fn sample(primitive: Primitive, i: usize) -> Value {
    match primitive {
        Primitive::Null => Value::Null,
        Primitive::Boolean => Value::Boolean(i % 2 == 0),
        Primitive::Int => Value::Int(i32::MAX),
        Primitive::Long => Value::Long(i64::MAX),
        Primitive::Float => Value::Float(f32::MAX),
        Primitive::Double => Value::Double(f64::MAX),
        Primitive::Bytes => Value::Bytes(vec![b'a', b'n', b's', b'o', b'n']),
        Primitive::String => Value::Str("anson".to_string()),
    }
}

#[test]
fn read_write_primitive() {
    for codec in CODECS.iter() {
        for primitive in PRIMITIVES.iter() {
            let name = format!("{}", primitive);
            let schema = MockSchema.prim(&name);
            let mut writer = writer_from_schema(&schema, codec);
            for i in 0..DATUM_COUNT {
                writer.write(sample(*primitive, i)).unwrap();
            }

            let buf = writer.into_inner().unwrap();

            let reader = Reader::new(buf.as_slice()).unwrap();
            let mut count = 0;
            for (i, value) in reader.enumerate() {
                assert_eq!(value.unwrap(), sample(*primitive, i));
                count += 1;
            }
            assert_eq!(count, DATUM_COUNT);
        }
    }
}

#[test]
fn read_write_integer_boundaries() {
    for (ty, values) in &[
        (
            "int",
            vec![Value::Int(0), Value::Int(i32::MAX), Value::Int(i32::MIN)],
        ),
        (
            "long",
            vec![Value::Long(0), Value::Long(i64::MAX), Value::Long(i64::MIN)],
        ),
    ] {
        let schema = MockSchema.prim(ty);
        let mut writer = writer_from_schema(&schema, "null");
        for v in values {
            writer.write(v.clone()).unwrap();
        }
        let buf = writer.into_inner().unwrap();
        let decoded: Vec<Value> = Reader::new(buf.as_slice())
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(&decoded, values);
    }
}

#[test]
fn read_write_zero_length_values() {
    for (ty, value) in &[
        ("bytes", Value::Bytes(vec![])),
        ("string", Value::Str(String::new())),
    ] {
        let schema = MockSchema.prim(ty);
        let mut writer = writer_from_schema(&schema, "null");
        writer.write(value.clone()).unwrap();
        let buf = writer.into_inner().unwrap();
        let mut reader = Reader::new(buf.as_slice()).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), *value);
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Complex schema tests
///////////////////////////////////////////////////////////////////////////////

fn long_list(values: &[i64]) -> Value {
    let mut next = Value::Union(0, Box::new(Value::Null));
    for v in values.iter().rev() {
        let mut rec = Record::new("LongList");
        rec.insert("value", *v).unwrap();
        rec.insert("next", next).unwrap();
        next = Value::Union(1, Box::new(Value::Record(rec)));
    }
    match next {
        Value::Union(1, boxed) => *boxed,
        _ => panic!("empty list"),
    }
}

#[test]
fn read_write_self_referential_record() {
    for codec in CODECS.iter() {
        let schema = MockSchema.record();
        let mut writer = writer_from_schema(&schema, codec);
        let value = long_list(&[1, 2, 3]);
        writer.write(value.clone()).unwrap();

        let buf = writer.into_inner().unwrap();

        let mut reader = Reader::new(buf.as_slice()).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), value);
        assert!(reader.next().is_none());
    }
}

#[test]
fn enum_read_write() {
    for codec in CODECS.iter() {
        let schema = Schema::from_str(
            r##"
        {
            "type": "enum",
            "name": "Suit",
            "symbols" : ["SPADES", "HEARTS", "DIAMONDS", "CLUBS"]
        }
        "##,
        )
        .unwrap();

        let mut writer = writer_from_schema(&schema, codec);
        writer.write(Value::Enum("SPADES".to_string())).unwrap();
        writer.write(Value::Enum("CLUBS".to_string())).unwrap();

        let buf = writer.into_inner().unwrap();

        let decoded: Vec<Value> = Reader::new(buf.as_slice())
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(
            decoded,
            vec![
                Value::Enum("SPADES".to_string()),
                Value::Enum("CLUBS".to_string())
            ]
        );
    }
}

#[test]
fn enum_unknown_symbol_fails_on_write() {
    let schema =
        Schema::from_str(r##"{"type": "enum", "name": "Suit", "symbols": ["SPADES"]}"##).unwrap();
    let mut writer = writer_from_schema(&schema, "null");
    assert!(writer.write(Value::Enum("JOKER".to_string())).is_err());
}

#[test]
fn array_read_write() {
    for codec in CODECS.iter() {
        let schema = Schema::from_str(r##"{"type": "array", "items": "string"}"##).unwrap();

        let mut writer = writer_from_schema(&schema, codec);
        let value = Value::from(vec!["a", "n", "s", "o", "n"]);
        for _ in 0..DATUM_COUNT {
            writer.write(value.clone()).unwrap();
        }

        let buf = writer.into_inner().unwrap();

        let mut count = 0;
        for decoded in Reader::new(buf.as_slice()).unwrap() {
            assert_eq!(decoded.unwrap(), value);
            count += 1;
        }
        assert_eq!(count, DATUM_COUNT);
    }
}

#[test]
fn empty_array_and_map_read_write() {
    let schema = Schema::from_str(r##"{"type": "array", "items": "long"}"##).unwrap();
    let mut writer = writer_from_schema(&schema, "null");
    writer.write(Value::Array(vec![])).unwrap();
    let buf = writer.into_inner().unwrap();
    let mut reader = Reader::new(buf.as_slice()).unwrap();
    assert_eq!(reader.next().unwrap().unwrap(), Value::Array(vec![]));

    let schema = Schema::from_str(r##"{"type": "map", "values": "long"}"##).unwrap();
    let mut writer = writer_from_schema(&schema, "null");
    writer.write(Value::Map(HashMap::new())).unwrap();
    let buf = writer.into_inner().unwrap();
    let mut reader = Reader::new(buf.as_slice()).unwrap();
    assert_eq!(reader.next().unwrap().unwrap(), Value::Map(HashMap::new()));
}

#[test]
fn map_read_write() {
    for codec in CODECS.iter() {
        let schema = Schema::from_str(r##"{"type": "map", "values": "long"}"##).unwrap();

        let mut writer = writer_from_schema(&schema, codec);
        let mut value = HashMap::new();
        value.insert("foo".to_string(), 1i64);
        value.insert("bar".to_string(), 2);
        writer.write(Value::from(value)).unwrap();

        let buf = writer.into_inner().unwrap();

        let decoded = Reader::new(buf.as_slice())
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let decoded = decoded.as_map().unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["foo"], Value::Long(1));
        assert_eq!(decoded["bar"], Value::Long(2));
    }
}

#[test]
fn union_read_write() {
    for codec in CODECS.iter() {
        let schema = Schema::from_str(r##"["null", "string"]"##).unwrap();

        let mut writer = writer_from_schema(&schema, codec);
        // explicitly tagged
        writer.write(Value::Union(0, Box::new(Value::Null))).unwrap();
        writer
            .write(Value::Union(1, Box::new(Value::Str("hello".to_string()))))
            .unwrap();
        // untagged values pick the first matching member
        writer.write(Value::Str("world".to_string())).unwrap();

        let buf = writer.into_inner().unwrap();

        let decoded: Vec<Value> = Reader::new(buf.as_slice())
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(
            decoded,
            vec![
                Value::Union(0, Box::new(Value::Null)),
                Value::Union(1, Box::new(Value::Str("hello".to_string()))),
                Value::Union(1, Box::new(Value::Str("world".to_string()))),
            ]
        );
    }
}

#[test]
fn union_tag_out_of_range_fails_on_write() {
    let schema = Schema::from_str(r##"["null", "string"]"##).unwrap();
    let mut writer = writer_from_schema(&schema, "null");
    assert!(writer
        .write(Value::Union(2, Box::new(Value::Null)))
        .is_err());
}

#[test]
fn fixed_read_write() {
    for codec in CODECS.iter() {
        let schema = Schema::from_str(r##"{"type": "fixed", "size": 16, "name": "md5"}"##).unwrap();

        let mut writer = writer_from_schema(&schema, codec);
        let value = Value::Fixed(b"0123456789abcdef".to_vec());
        writer.write(value.clone()).unwrap();

        let buf = writer.into_inner().unwrap();

        let mut reader = Reader::new(buf.as_slice()).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), value);
    }
}

#[test]
fn fixed_wrong_length_fails_on_write() {
    let schema = Schema::from_str(r##"{"type": "fixed", "size": 16, "name": "md5"}"##).unwrap();
    let mut writer = writer_from_schema(&schema, "null");
    assert!(writer.write(Value::Fixed(vec![1, 2, 3])).is_err());
}

#[test]
fn record_with_no_fields_read_write() {
    let schema =
        Schema::from_str(r##"{"type": "record", "name": "Empty", "fields": []}"##).unwrap();
    let mut writer = writer_from_schema(&schema, "null");
    writer.write(Value::Record(Record::new("Empty"))).unwrap();
    let buf = writer.into_inner().unwrap();
    let mut reader = Reader::new(buf.as_slice()).unwrap();
    assert_eq!(
        reader.next().unwrap().unwrap(),
        Value::Record(Record::new("Empty"))
    );
}

#[test]
fn write_invalid_union_data_fails() {
    let schema = Schema::from_str(r##"["int", "float"]"##).unwrap();
    let mut writer = writer_from_schema(&schema, "null");
    assert!(writer.write(Value::Str("string".to_string())).is_err());
}

///////////////////////////////////////////////////////////////////////////////
/// Wire format
///////////////////////////////////////////////////////////////////////////////

#[test]
fn known_datum_encodings() {
    let schema = Schema::from_str(r##""int""##).unwrap();
    assert_eq!(to_datum(&schema, &Value::Int(64)).unwrap(), vec![0x80, 0x01]);
    assert_eq!(to_datum(&schema, &Value::Int(-1)).unwrap(), vec![0x01]);

    let schema = Schema::from_str(r##""string""##).unwrap();
    assert_eq!(
        to_datum(&schema, &Value::Str("foo".to_string())).unwrap(),
        vec![0x06, 0x66, 0x6F, 0x6F]
    );

    let schema = Schema::from_str(r##"{"type": "array", "items": "long"}"##).unwrap();
    assert_eq!(
        to_datum(&schema, &Value::from(vec![3i64, 27])).unwrap(),
        vec![0x04, 0x06, 0x36, 0x00]
    );

    let schema = Schema::from_str(r##"["null", "string"]"##).unwrap();
    assert_eq!(
        to_datum(&schema, &Value::Union(0, Box::new(Value::Null))).unwrap(),
        vec![0x00]
    );
    assert_eq!(
        to_datum(&schema, &Value::Union(1, Box::new(Value::Str("a".to_string())))).unwrap(),
        vec![0x02, 0x02, 0x61]
    );
}

#[test]
fn known_datum_decodings() {
    let schema = Schema::from_str(r##""int""##).unwrap();
    let decoded = from_datum(&schema, &mut [0x80u8, 0x01].as_ref()).unwrap();
    assert_eq!(decoded, Value::Int(64));
    let decoded = from_datum(&schema, &mut [0x01u8].as_ref()).unwrap();
    assert_eq!(decoded, Value::Int(-1));

    let schema = Schema::from_str(r##""string""##).unwrap();
    let decoded = from_datum(&schema, &mut [0x06u8, 0x66, 0x6F, 0x6F].as_ref()).unwrap();
    assert_eq!(decoded, Value::Str("foo".to_string()));

    let schema = Schema::from_str(r##"{"type": "array", "items": "long"}"##).unwrap();
    let decoded = from_datum(&schema, &mut [0x04u8, 0x06, 0x36, 0x00].as_ref()).unwrap();
    assert_eq!(decoded, Value::from(vec![3i64, 27]));
}

#[test]
fn array_decoder_accepts_size_prefixed_blocks() {
    // a writer may emit (-count, byte size) so readers can skip; 2 longs in
    // 2 bytes
    let schema = Schema::from_str(r##"{"type": "array", "items": "long"}"##).unwrap();
    let bytes = [0x03u8, 0x04, 0x06, 0x36, 0x00];
    let decoded = from_datum(&schema, &mut bytes.as_ref()).unwrap();
    assert_eq!(decoded, Value::from(vec![3i64, 27]));
}

#[test]
fn boolean_rejects_other_bytes() {
    let schema = Schema::from_str(r##""boolean""##).unwrap();
    assert!(from_datum(&schema, &mut [0x02u8].as_ref()).is_err());
}

#[test]
fn union_index_out_of_range_fails_on_read() {
    let schema = Schema::from_str(r##"["null", "string"]"##).unwrap();
    // index 2 in a two member union
    assert!(from_datum(&schema, &mut [0x04u8].as_ref()).is_err());
}

///////////////////////////////////////////////////////////////////////////////
/// Container file framing
///////////////////////////////////////////////////////////////////////////////

const SYNC: [u8; 16] = [0xAB; 16];

fn container_with_one_int(value: i32) -> Vec<u8> {
    let schema = Schema::from_str(r##""int""##).unwrap();
    let mut writer = WriterBuilder::new()
        .set_schema(&schema)
        .set_datafile(vec![])
        .set_sync_marker(SYNC)
        .build()
        .unwrap();
    writer.write(Value::Int(value)).unwrap();
    writer.into_inner().unwrap()
}

#[test]
fn block_layout_for_single_int() {
    let buf = container_with_one_int(5);
    // header ends with the sync marker; the single block is
    // count=1, size=1, the datum 0x0A, then the sync marker again
    let block = &buf[buf.len() - 19..];
    assert_eq!(&block[..3], &[0x02, 0x02, 0x0A]);
    assert_eq!(&block[3..], &SYNC);
}

#[test]
fn corrupted_sync_marker_fails_with_sync_mismatch() {
    let mut buf = container_with_one_int(5);
    let len = buf.len();
    // flip a byte in the block's trailing sync marker
    buf[len - 1] ^= 0xFF;
    let mut reader = Reader::new(buf.as_slice()).unwrap();
    match reader.next() {
        Some(Err(anson::AnsonErr::SyncMarkerMismatch)) => {}
        other => panic!("expected SyncMarkerMismatch, got {:?}", other),
    }
}

#[test]
fn empty_container_file_decodes_to_empty_sequence() {
    let schema = Schema::from_str(r##""int""##).unwrap();
    let writer = writer_from_schema(&schema, "null");
    let buf = writer.into_inner().unwrap();
    let mut reader = Reader::new(buf.as_slice()).unwrap();
    assert!(reader.next().is_none());
}

#[test]
fn zero_count_block_is_legal() {
    let schema = Schema::from_str(r##""int""##).unwrap();
    let writer = WriterBuilder::new()
        .set_schema(&schema)
        .set_datafile(vec![])
        .set_sync_marker(SYNC)
        .build()
        .unwrap();
    let mut buf = writer.into_inner().unwrap();
    // an empty block: count=0, size=0, sync
    buf.extend_from_slice(&[0x00, 0x00]);
    buf.extend_from_slice(&SYNC);
    // then a block holding int 5
    buf.extend_from_slice(&[0x02, 0x02, 0x0A]);
    buf.extend_from_slice(&SYNC);

    let decoded: Vec<Value> = Reader::new(buf.as_slice())
        .unwrap()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(decoded, vec![Value::Int(5)]);
}

#[test]
fn truncated_block_fails() {
    let buf = container_with_one_int(5);
    // cut into the trailing sync marker
    let truncated = &buf[..buf.len() - 8];
    let mut reader = Reader::new(truncated).unwrap();
    assert!(reader.next().unwrap().is_err());
}

#[test]
fn small_flush_interval_produces_multiple_blocks() {
    let schema = Schema::from_str(r##""long""##).unwrap();
    let mut writer = WriterBuilder::new()
        .set_schema(&schema)
        .set_datafile(vec![])
        .set_flush_interval(64)
        .build()
        .unwrap();
    for i in 0..DATUM_COUNT {
        writer.write(Value::Long(i as i64)).unwrap();
    }
    let buf = writer.into_inner().unwrap();

    let decoded: Vec<Value> = Reader::new(buf.as_slice())
        .unwrap()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(decoded.len(), DATUM_COUNT);
    for (i, v) in decoded.iter().enumerate() {
        assert_eq!(v, &Value::Long(i as i64));
    }
}

#[test]
fn reader_exposes_writer_schema_and_codec() {
    let buf = container_with_one_int(5);
    let reader = Reader::new(buf.as_slice()).unwrap();
    assert_eq!(
        reader.writer_schema().canonical_form().to_string(),
        r#""int""#
    );
    assert!(reader.meta().contains_key("avro.codec"));
}
