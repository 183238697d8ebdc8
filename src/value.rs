//! The in-memory representation of avro values, mirroring the schema
//! variants, along with the binary encoder.

use crate::error::{AnsonErr, AnsonResult};
use crate::schema;
use crate::schema::common::validate_name;
use crate::schema::parser::parse_default;
use crate::schema::LogicalType;
use crate::schema::NameTable;
use crate::util::{encode_int, encode_long, encode_raw_bytes};
use crate::Schema;
use byteorder::{LittleEndian, WriteBytesExt};
use indexmap::IndexMap;
use schema::Order;
use schema::Variant;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::io::Write;
use uuid::Uuid;

/// Convenient type alias for map initialization.
pub type Map = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldValue {
    pub(crate) value: Value,
    order: schema::Order,
}

impl FieldValue {
    pub(crate) fn new(value: Value) -> Self {
        FieldValue {
            value,
            order: Order::Ascending,
        }
    }
}

/// The [Record](https://avro.apache.org/docs/current/spec.html#schema_record) avro type:
/// an ordered collection of named field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) name: String,
    pub(crate) fields: IndexMap<String, FieldValue>,
}

impl Record {
    /// Creates a new avro record type with the given name.
    pub fn new(name: &str) -> Self {
        Record {
            fields: IndexMap::new(),
            name: name.to_string(),
        }
    }

    /// Adds a field to the record.
    pub fn insert<T: Into<Value>>(&mut self, field_name: &str, ty: T) -> Result<(), AnsonErr> {
        validate_name(field_name)?;
        self.fields
            .insert(field_name.to_string(), FieldValue::new(ty.into()));
        Ok(())
    }

    /// Sets the ordering of the field in the record.
    pub fn set_field_order(&mut self, field_name: &str, order: Order) -> Result<(), AnsonErr> {
        let a = self
            .fields
            .get_mut(field_name)
            .ok_or_else(|| AnsonErr::RecordFieldMissing(field_name.to_string()))?;
        a.order = order;
        Ok(())
    }

    /// The name this record was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the value of the given field, if present.
    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name).map(|f| &f.value)
    }

    /// Creates a record from a [BTreeMap](https://doc.rust-lang.org/std/collections/struct.BTreeMap.html)
    /// by consuming it. The `name` provided must match the name in the record
    /// schema being provided to the writer.
    pub fn from_btree<K: Into<String> + Ord + Display, V: Into<Value>>(
        name: &str,
        btree: BTreeMap<K, V>,
    ) -> Result<Self, AnsonErr> {
        let mut record = Record::new(name);
        for (k, v) in btree {
            record.fields.insert(k.to_string(), FieldValue::new(v.into()));
        }
        Ok(record)
    }

    /// Creates a record from a JSON object (serde_json::Value). A conforming
    /// record schema must be provided.
    pub fn from_json(
        json: serde_json::Map<String, serde_json::Value>,
        schema: &Schema,
    ) -> Result<Value, AnsonErr> {
        if let Variant::Record {
            name,
            fields: record_schema_fields,
            ..
        } = &schema.variant
        {
            let mut values = IndexMap::with_capacity(record_schema_fields.len());
            'fields: for (k, field) in record_schema_fields {
                if let Some(json_value) = json.get(k) {
                    if let Variant::Union { variants } = &field.ty {
                        for (idx, var) in variants.iter().enumerate() {
                            if let Ok(v) = parse_default(json_value, var) {
                                let tagged = Value::Union(idx as u32, Box::new(v));
                                values.insert(k.to_string(), FieldValue::new(tagged));
                                continue 'fields;
                            }
                        }
                        return Err(AnsonErr::FailedDefaultUnion);
                    } else {
                        let parsed_value = parse_default(json_value, &field.ty)?;
                        values.insert(k.to_string(), FieldValue::new(parsed_value));
                    }
                } else if let Some(v) = &field.default {
                    values.insert(k.to_string(), FieldValue::new(v.clone()));
                } else {
                    return Err(AnsonErr::RecordFieldMissing(k.to_string()));
                }
            }

            Ok(Value::Record(Record {
                fields: values,
                name: name.fullname(),
            }))
        } else {
            Err(AnsonErr::ExpectedJsonObject)
        }
    }
}

/// An arbitrary precision decimal: the two's-complement big-endian unscaled
/// value, kept in its minimal byte representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decimal {
    unscaled: Vec<u8>,
}

impl Decimal {
    /// Creates a decimal from a two's-complement big-endian unscaled value.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Decimal {
            unscaled: minimize_twos_complement(bytes),
        }
    }

    /// Creates a decimal from a signed unscaled integer.
    pub fn from_i64(n: i64) -> Self {
        Decimal::from_be_bytes(&n.to_be_bytes())
    }

    /// The minimal two's-complement big-endian unscaled value.
    pub fn as_be_bytes(&self) -> &[u8] {
        &self.unscaled
    }

    // Sign-extends the unscaled value to exactly `size` bytes, as required
    // when the base schema is fixed.
    pub(crate) fn to_sign_extended(&self, size: usize) -> AnsonResult<Vec<u8>> {
        if self.unscaled.len() > size {
            return Err(AnsonErr::DecimalTooLarge {
                unscaled: self.unscaled.len(),
                size,
            });
        }
        let fill = if self.unscaled[0] & 0x80 != 0 { 0xff } else { 0x00 };
        let mut out = vec![fill; size - self.unscaled.len()];
        out.extend_from_slice(&self.unscaled);
        Ok(out)
    }
}

fn minimize_twos_complement(bytes: &[u8]) -> Vec<u8> {
    if bytes.is_empty() {
        return vec![0];
    }
    let mut i = 0;
    while i + 1 < bytes.len() {
        let redundant = (bytes[i] == 0x00 && bytes[i + 1] < 0x80)
            || (bytes[i] == 0xff && bytes[i + 1] >= 0x80);
        if !redundant {
            break;
        }
        i += 1;
    }
    bytes[i..].to_vec()
}

/// The avro duration logical type: months, days and milliseconds, each an
/// unsigned 32-bit count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duration {
    months: u32,
    days: u32,
    millis: u32,
}

impl Duration {
    /// Creates a duration value.
    pub fn new(months: u32, days: u32, millis: u32) -> Self {
        Duration {
            months,
            days,
            millis,
        }
    }

    /// Number of months.
    pub fn months(&self) -> u32 {
        self.months
    }

    /// Number of days.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Number of milliseconds.
    pub fn millis(&self) -> u32 {
        self.millis
    }

    pub(crate) fn to_bytes(self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[..4].copy_from_slice(&self.months.to_le_bytes());
        buf[4..8].copy_from_slice(&self.days.to_le_bytes());
        buf[8..].copy_from_slice(&self.millis.to_le_bytes());
        buf
    }

    pub(crate) fn from_bytes(buf: [u8; 12]) -> Self {
        let mut quad = [0u8; 4];
        quad.copy_from_slice(&buf[..4]);
        let months = u32::from_le_bytes(quad);
        quad.copy_from_slice(&buf[4..8]);
        let days = u32::from_le_bytes(quad);
        quad.copy_from_slice(&buf[8..]);
        let millis = u32::from_le_bytes(quad);
        Duration {
            months,
            days,
            millis,
        }
    }
}

/// Represents an Avro value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A null value.
    Null,
    /// An i32 integer value.
    Int(i32),
    /// An i64 long value.
    Long(i64),
    /// A boolean value.
    Boolean(bool),
    /// A f32 float value.
    Float(f32),
    /// A f64 float value.
    Double(f64),
    /// A Record value.
    Record(Record),
    /// A Fixed value.
    Fixed(Vec<u8>),
    /// A Map value.
    Map(Map),
    /// A sequence of u8 bytes.
    Bytes(Vec<u8>),
    /// Rust strings map directly to avro strings.
    Str(String),
    /// A union value carrying the zero-based index of the member that
    /// produced it.
    Union(u32, Box<Value>),
    /// An enumeration. Unlike Rust enums, enums in avro don't support data
    /// within their variants.
    Enum(String),
    /// An array of `Value`s.
    Array(Vec<Value>),
    /// An RFC 4122 uuid, written as its text form over a string schema.
    Uuid(Uuid),
    /// An arbitrary precision decimal over a bytes or fixed schema.
    Decimal(Decimal),
    /// Days since the unix epoch.
    Date(i32),
    /// Milliseconds since midnight.
    TimeMillis(i32),
    /// Microseconds since midnight.
    TimeMicros(i64),
    /// Milliseconds since the unix epoch UTC.
    TimestampMillis(i64),
    /// Microseconds since the unix epoch UTC.
    TimestampMicros(i64),
    /// Zoneless wall-clock milliseconds.
    LocalTimestampMillis(i64),
    /// Zoneless wall-clock microseconds.
    LocalTimestampMicros(i64),
    /// Months, days and milliseconds over a fixed(12) schema.
    Duration(Duration),
}

impl Value {
    pub(crate) fn encode<W: Write>(
        &self,
        writer: &mut W,
        schema: &Variant,
        names: &NameTable,
    ) -> AnsonResult<()> {
        match (self, schema) {
            (Value::Null, Variant::Null) => {}
            (Value::Boolean(b), Variant::Boolean) => writer
                .write_all(&[*b as u8])
                .map_err(AnsonErr::EncodeFailed)?,
            (Value::Int(i), Variant::Int) => {
                encode_int(*i, writer)?;
            }
            // int is promotable to long, float or double ---
            (Value::Int(i), Variant::Long) => {
                encode_long(i64::from(*i), writer)?;
            }
            (Value::Int(i), Variant::Float) => {
                writer
                    .write_f32::<LittleEndian>(*i as f32)
                    .map_err(AnsonErr::EncodeFailed)?;
            }
            (Value::Int(i), Variant::Double) => {
                writer
                    .write_f64::<LittleEndian>(*i as f64)
                    .map_err(AnsonErr::EncodeFailed)?;
            }
            // ---
            (Value::Long(l), Variant::Long) => {
                encode_long(*l, writer)?;
            }
            (Value::Long(l), Variant::Float) => {
                writer
                    .write_f32::<LittleEndian>(*l as f32)
                    .map_err(AnsonErr::EncodeFailed)?;
            }
            (Value::Long(l), Variant::Double) => {
                writer
                    .write_f64::<LittleEndian>(*l as f64)
                    .map_err(AnsonErr::EncodeFailed)?;
            }
            (Value::Float(f), Variant::Float) => {
                writer
                    .write_f32::<LittleEndian>(*f)
                    .map_err(AnsonErr::EncodeFailed)?;
            }
            // float is promotable to double ---
            (Value::Float(f), Variant::Double) => {
                writer
                    .write_f64::<LittleEndian>(f64::from(*f))
                    .map_err(AnsonErr::EncodeFailed)?;
            } // ---
            (Value::Double(d), Variant::Double) => {
                writer
                    .write_f64::<LittleEndian>(*d)
                    .map_err(AnsonErr::EncodeFailed)?;
            }
            (ref value, Variant::Named(name)) => {
                let schema = names.get(name).ok_or(AnsonErr::NamedSchemaNotFound)?;
                value.encode(writer, schema, names)?;
            }
            // An explicitly tagged union value encodes its declared member.
            (Value::Union(idx, value), Variant::Union { variants }) => {
                let member =
                    variants
                        .get(*idx as usize)
                        .ok_or(AnsonErr::UnionTagOutOfRange {
                            index: *idx as usize,
                            members: variants.len(),
                        })?;
                if let Value::Union(..) = **value {
                    return Err(AnsonErr::NoImmediateUnion);
                }
                encode_long(i64::from(*idx), writer)?;
                value.encode(writer, member, names)?;
            }
            // An untagged value picks the first member it matches.
            (ref value, Variant::Union { variants }) => {
                let (union_idx, member) = resolve_union(value, variants, names)?;
                encode_long(union_idx as i64, writer)?;
                value.encode(writer, member, names)?;
            }
            (Value::Record(record), Variant::Record { fields, .. }) => {
                // fields are written in schema declaration order
                for (f_name, field) in fields {
                    match record.fields.get(f_name) {
                        Some(f_value) => f_value.value.encode(writer, &field.ty, names)?,
                        None => return Err(AnsonErr::RecordFieldMissing(f_name.to_string())),
                    }
                }
            }
            (Value::Map(hmap), Variant::Map { values }) => {
                if !hmap.is_empty() {
                    encode_long(hmap.len() as i64, writer)?;
                    for (k, v) in hmap.iter() {
                        encode_long(k.len() as i64, writer)?;
                        encode_raw_bytes(k.as_bytes(), writer)?;
                        v.encode(writer, values, names)?;
                    }
                }
                // end of map blocks
                encode_long(0, writer)?;
            }
            (Value::Fixed(v), Variant::Fixed { size, .. })
            | (Value::Bytes(v), Variant::Fixed { size, .. }) => {
                if v.len() != *size {
                    return Err(AnsonErr::FixedValueLenMismatch {
                        found: v.len(),
                        expected: *size,
                    });
                }
                encode_raw_bytes(v, writer)?;
            }
            (Value::Str(s), Variant::Str) | (Value::Str(s), Variant::Bytes) => {
                encode_long(s.len() as i64, writer)?;
                encode_raw_bytes(s.as_bytes(), writer)?;
            }
            (Value::Bytes(b), Variant::Bytes) | (Value::Bytes(b), Variant::Str) => {
                encode_long(b.len() as i64, writer)?;
                encode_raw_bytes(b, writer)?;
            }
            (Value::Enum(sym), Variant::Enum { symbols, .. }) => {
                match symbols.iter().position(|r| r == sym) {
                    Some(idx) => encode_int(idx as i32, writer)?,
                    None => return Err(AnsonErr::EnumSymbolNotPresent),
                };
            }
            (Value::Array(values), Variant::Array { items }) => {
                if !values.is_empty() {
                    encode_long(values.len() as i64, writer)?;
                    for i in values {
                        i.encode(writer, items, names)?;
                    }
                }
                // end of array blocks
                encode_long(0, writer)?;
            }
            (value, Variant::Logical { kind, inner }) => {
                encode_logical(value, kind, inner, writer, names)?;
            }
            _ => return Err(AnsonErr::ValueSchemaMismatch),
        };
        Ok(())
    }
}

fn encode_logical<W: Write>(
    value: &Value,
    kind: &LogicalType,
    inner: &Variant,
    writer: &mut W,
    names: &NameTable,
) -> AnsonResult<()> {
    match (value, kind) {
        (Value::Uuid(u), LogicalType::Uuid) => {
            let text = u.to_string();
            encode_long(text.len() as i64, writer)?;
            encode_raw_bytes(text.as_bytes(), writer)
        }
        (Value::Str(s), LogicalType::Uuid) => {
            // writes validate the text form
            Uuid::parse_str(s).map_err(|_| AnsonErr::InvalidUuid(s.clone()))?;
            encode_long(s.len() as i64, writer)?;
            encode_raw_bytes(s.as_bytes(), writer)
        }
        (Value::Decimal(d), LogicalType::Decimal { .. }) => match inner {
            Variant::Fixed { size, .. } => {
                let extended = d.to_sign_extended(*size)?;
                encode_raw_bytes(&extended, writer)
            }
            _ => {
                encode_long(d.as_be_bytes().len() as i64, writer)?;
                encode_raw_bytes(d.as_be_bytes(), writer)
            }
        },
        (Value::Date(n), LogicalType::Date) | (Value::TimeMillis(n), LogicalType::TimeMillis) => {
            encode_int(*n, writer).map(|_| ())
        }
        (Value::TimeMicros(n), LogicalType::TimeMicros)
        | (Value::TimestampMillis(n), LogicalType::TimestampMillis)
        | (Value::TimestampMicros(n), LogicalType::TimestampMicros)
        | (Value::LocalTimestampMillis(n), LogicalType::LocalTimestampMillis)
        | (Value::LocalTimestampMicros(n), LogicalType::LocalTimestampMicros) => {
            encode_long(*n, writer).map(|_| ())
        }
        (Value::Duration(d), LogicalType::Duration) => encode_raw_bytes(&d.to_bytes(), writer),
        // raw base representations encode under the base schema
        _ => value.encode(writer, inner, names),
    }
}

// Given an untagged value, returns the index and schema of the first union
// member it matches.
fn resolve_union<'a>(
    value: &Value,
    union_variants: &'a [Variant],
    names: &'a NameTable,
) -> Result<(usize, &'a Variant), AnsonErr> {
    for (idx, variant) in union_variants.iter().enumerate() {
        match (value, variant) {
            (Value::Null, Variant::Null)
            | (Value::Boolean(_), Variant::Boolean)
            | (Value::Int(_), Variant::Int)
            | (Value::Long(_), Variant::Long)
            | (Value::Float(_), Variant::Float)
            | (Value::Double(_), Variant::Double)
            | (Value::Bytes(_), Variant::Bytes)
            | (Value::Str(_), Variant::Str)
            | (Value::Map(_), Variant::Map { .. })
            | (Value::Array(_), Variant::Array { .. })
            | (Value::Enum(_), Variant::Enum { .. })
            | (Value::Record(_), Variant::Record { .. }) => return Ok((idx, variant)),
            (Value::Fixed(v), Variant::Fixed { size, .. }) => {
                if v.len() == *size {
                    return Ok((idx, variant));
                }
                return Err(AnsonErr::FixedValueLenMismatch {
                    found: v.len(),
                    expected: *size,
                });
            }
            (Value::Union(..), _) => return Err(AnsonErr::NoImmediateUnion),
            (Value::Uuid(_), Variant::Logical { kind: LogicalType::Uuid, .. })
            | (Value::Decimal(_), Variant::Logical { kind: LogicalType::Decimal { .. }, .. })
            | (Value::Date(_), Variant::Logical { kind: LogicalType::Date, .. })
            | (Value::TimeMillis(_), Variant::Logical { kind: LogicalType::TimeMillis, .. })
            | (Value::TimeMicros(_), Variant::Logical { kind: LogicalType::TimeMicros, .. })
            | (
                Value::TimestampMillis(_),
                Variant::Logical { kind: LogicalType::TimestampMillis, .. },
            )
            | (
                Value::TimestampMicros(_),
                Variant::Logical { kind: LogicalType::TimestampMicros, .. },
            )
            | (
                Value::LocalTimestampMillis(_),
                Variant::Logical { kind: LogicalType::LocalTimestampMillis, .. },
            )
            | (
                Value::LocalTimestampMicros(_),
                Variant::Logical { kind: LogicalType::LocalTimestampMicros, .. },
            )
            | (Value::Duration(_), Variant::Logical { kind: LogicalType::Duration, .. }) => {
                return Ok((idx, variant))
            }
            (Value::Record(_), Variant::Named(name))
            | (Value::Enum(_), Variant::Named(name))
            | (Value::Fixed(_), Variant::Named(name)) => {
                return match names.get(name) {
                    Some(schema) => Ok((idx, schema)),
                    None => Err(AnsonErr::NamedSchemaNotFound),
                };
            }
            _ => {}
        }
    }

    Err(AnsonErr::NotFoundInUnion)
}

///////////////////////////////////////////////////////////////////////////////
/// From impls for Value
///////////////////////////////////////////////////////////////////////////////

impl From<()> for Value {
    fn from(_v: ()) -> Value {
        Value::Null
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(v: HashMap<String, T>) -> Value {
        let mut map = HashMap::with_capacity(v.len());
        for (k, v) in v.into_iter() {
            map.insert(k, v.into());
        }
        Value::Map(map)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Value {
        Value::Bytes(value)
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(value: &'a [u8]) -> Value {
        Value::Bytes(value.to_vec())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Value {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Double(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Value {
        Value::Str(value.to_string())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Value {
        Value::Record(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Value {
        Value::Uuid(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Value {
        Value::Decimal(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Value {
        Value::Duration(value)
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Value -> Rust value
///////////////////////////////////////////////////////////////////////////////

impl Value {
    /// Try to retrieve an avro null
    pub fn as_null(&self) -> Result<(), AnsonErr> {
        if let Value::Null = self {
            Ok(())
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro boolean
    pub fn as_boolean(&self) -> Result<&bool, AnsonErr> {
        if let Value::Boolean(b) = self {
            Ok(b)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro int
    pub fn as_int(&self) -> Result<&i32, AnsonErr> {
        if let Value::Int(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro long
    pub fn as_long(&self) -> Result<&i64, AnsonErr> {
        if let Value::Long(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro float
    pub fn as_float(&self) -> Result<&f32, AnsonErr> {
        if let Value::Float(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro double
    pub fn as_double(&self) -> Result<&f64, AnsonErr> {
        if let Value::Double(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro bytes
    pub fn as_bytes(&self) -> Result<&[u8], AnsonErr> {
        if let Value::Bytes(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro string
    pub fn as_string(&self) -> Result<&str, AnsonErr> {
        if let Value::Str(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro record
    pub fn as_record(&self) -> Result<&Record, AnsonErr> {
        if let Value::Record(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve the variant of the enum as a string
    pub fn as_enum(&self) -> Result<&str, AnsonErr> {
        if let Value::Enum(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro array
    pub fn as_array(&self) -> Result<&[Value], AnsonErr> {
        if let Value::Array(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro map
    pub fn as_map(&self) -> Result<&HashMap<String, Value>, AnsonErr> {
        if let Value::Map(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro union as its member index and inner value
    pub fn as_union(&self) -> Result<(u32, &Value), AnsonErr> {
        if let Value::Union(idx, v) = self {
            Ok((*idx, v))
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro fixed
    pub fn as_fixed(&self) -> Result<&[u8], AnsonErr> {
        if let Value::Fixed(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve a uuid
    pub fn as_uuid(&self) -> Result<&Uuid, AnsonErr> {
        if let Value::Uuid(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve a decimal
    pub fn as_decimal(&self) -> Result<&Decimal, AnsonErr> {
        if let Value::Decimal(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve a duration
    pub fn as_duration(&self) -> Result<&Duration, AnsonErr> {
        if let Value::Duration(v) = self {
            Ok(v)
        } else {
            Err(AnsonErr::ExpectedVariantNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Decimal, Duration, Record};
    use crate::Schema;
    use crate::Value;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    #[test]
    fn record_from_btree() {
        let mut rec = BTreeMap::new();
        rec.insert("foo", "bar");
        let r = Record::from_btree("test", rec).unwrap();
        assert_eq!(r.get("foo"), Some(&Value::Str("bar".to_string())));
    }

    #[test]
    fn record_from_json() {
        let schema = Schema::from_str(
            r##"
                {
                "name": "rust_mentors",
                "type": "record",
                "fields": [
                    { "name": "name", "type": "string" },
                    { "name": "active", "type": "boolean" },
                    {
                        "name":"mentees",
                        "type": {
                            "name":"mentees",
                            "type": "record",
                            "fields": [
                                {"name":"id", "type": "int"},
                                {"name":"username", "type": "string"}
                            ]
                        }
                    }
                ]
                }
"##,
        )
        .unwrap();

        let json = serde_json::from_str(
            r##"{ "name": "bob", "active": true, "mentees": {"id": 1, "username": "alice"} }"##,
        )
        .unwrap();
        let rec = Record::from_json(json, &schema).unwrap();
        let rec = rec.as_record().unwrap();
        assert_eq!(rec.get("name"), Some(&Value::Str("bob".to_string())));
        let mentees = rec.get("mentees").unwrap().as_record().unwrap();
        assert_eq!(mentees.get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn record_has_fields_with_default() {
        let schema_str = r##"
        {
            "namespace": "sensor.data",
            "type": "record",
            "name": "common",
            "fields" : [
                {"name": "data", "type": ["null", "string"], "default": null}
            ]
        }
"##;

        let sample_data = r#"{ "data": null }"#;

        let json = serde_json::from_str(sample_data).unwrap();
        let schema = Schema::from_str(schema_str).unwrap();
        let rec = Record::from_json(json, &schema).unwrap();
        let field = rec.as_record().unwrap().get("data").unwrap();
        assert_eq!(field, &Value::Union(0, Box::new(Value::Null)));
    }

    #[test]
    fn decimal_minimal_representation() {
        assert_eq!(Decimal::from_i64(0).as_be_bytes(), &[0x00]);
        assert_eq!(Decimal::from_i64(127).as_be_bytes(), &[0x7f]);
        assert_eq!(Decimal::from_i64(128).as_be_bytes(), &[0x00, 0x80]);
        assert_eq!(Decimal::from_i64(-1).as_be_bytes(), &[0xff]);
        assert_eq!(Decimal::from_i64(-128).as_be_bytes(), &[0x80]);
        assert_eq!(Decimal::from_i64(-129).as_be_bytes(), &[0xff, 0x7f]);
        // sign extension round-trips back to the minimal form
        let d = Decimal::from_i64(-2);
        let wide = d.to_sign_extended(8).unwrap();
        assert_eq!(wide, vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(Decimal::from_be_bytes(&wide), d);
    }

    #[test]
    fn decimal_too_large_for_fixed() {
        let d = Decimal::from_i64(i64::MAX);
        assert!(d.to_sign_extended(4).is_err());
    }

    #[test]
    fn duration_little_endian_layout() {
        let d = Duration::new(1, 2, 3);
        let bytes = d.to_bytes();
        assert_eq!(
            bytes,
            [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]
        );
        assert_eq!(Duration::from_bytes(bytes), d);
    }
}
