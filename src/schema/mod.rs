//! Routines for parsing and validating an Avro schema.
//! Schemas in avro are written as JSON and can be provided as .avsc files
//! to a Writer or a Reader.

pub mod common;
use crate::error::AnsonErr;
pub use common::Order;
mod canonical;
pub mod parser;
pub(crate) use parser::NameTable;

use crate::error::AnsonResult;
use crate::value::Value;
use canonical::normalize_schema;
pub use canonical::CanonicalSchema;
use common::{Field, Name};
use indexmap::IndexMap;
use serde_json::{self, Value as JsonValue};
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;

/// A logical type annotating a base schema with additional semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalType {
    /// RFC 4122 uuid in text form, over a string schema.
    Uuid,
    /// Arbitrary precision decimal over a bytes or fixed schema.
    Decimal {
        /// Maximum number of unscaled decimal digits.
        precision: usize,
        /// Digits to the right of the decimal point.
        scale: usize,
    },
    /// Days since the unix epoch, over an int schema.
    Date,
    /// Milliseconds since midnight, over an int schema.
    TimeMillis,
    /// Microseconds since midnight, over a long schema.
    TimeMicros,
    /// Milliseconds since the unix epoch UTC, over a long schema.
    TimestampMillis,
    /// Microseconds since the unix epoch UTC, over a long schema.
    TimestampMicros,
    /// Zoneless wall-clock milliseconds, over a long schema.
    LocalTimestampMillis,
    /// Zoneless wall-clock microseconds, over a long schema.
    LocalTimestampMicros,
    /// Months, days and milliseconds, over a fixed(12) schema.
    Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Variant {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Record {
        name: Name,
        aliases: Option<Vec<String>>,
        fields: IndexMap<String, Field>,
    },
    Fixed {
        name: Name,
        aliases: Option<Vec<String>>,
        size: usize,
    },
    Enum {
        name: Name,
        aliases: Option<Vec<String>>,
        symbols: Vec<String>,
        default: Option<String>,
    },
    Map {
        values: Box<Variant>,
    },
    Array {
        items: Box<Variant>,
    },
    Union {
        variants: Vec<Variant>,
    },
    // Back-reference into the name table; how recursive schemas avoid
    // owning themselves.
    Named(String),
    Logical {
        kind: LogicalType,
        inner: Box<Variant>,
    },
}

/// Represents the avro schema used to write encoded avro data.
#[derive(Debug)]
pub struct Schema {
    // verbatim JSON, written to the `avro.schema` header entry
    inner: JsonValue,
    // lookup table resolving named schema references
    pub(crate) names: NameTable,
    // typed and stripped version of schema used internally
    pub(crate) variant: Variant,
    // canonical form of schema; used for equality and fingerprints
    pub(crate) canonical: CanonicalSchema,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl FromStr for Schema {
    type Err = AnsonErr;
    /// Parse an avro schema from a JSON string.
    /// One can use Rust's raw string syntax (r##""##) to pass schema.
    fn from_str(schema: &str) -> Result<Self, Self::Err> {
        let schema_json =
            serde_json::from_str(schema).map_err(|e| AnsonErr::SchemaParseErr(e.into()))?;
        Schema::parse_imp(schema_json)
    }
}

impl Schema {
    /// Parses an avro schema from a JSON schema in a file.
    /// Alternatively, one can use the [`FromStr`](https://doc.rust-lang.org/std/str/trait.FromStr.html)
    /// impl to create the Schema from a JSON string:
    /// ```
    /// use std::str::FromStr;
    /// use anson::Schema;
    ///
    /// let schema = Schema::from_str(r##""null""##).unwrap();
    /// ```
    pub fn from_path<P: AsRef<Path> + Debug>(path: P) -> AnsonResult<Self> {
        let schema_file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(AnsonErr::SchemaParseErr)?;
        let value =
            serde_json::from_reader(schema_file).map_err(|e| AnsonErr::SchemaParseErr(e.into()))?;
        Schema::parse_imp(value)
    }

    fn parse_imp(schema_json: JsonValue) -> AnsonResult<Self> {
        let mut table = NameTable::new();
        let pcf = CanonicalSchema(normalize_schema(&schema_json, None)?);
        let variant = table.parse_schema(&schema_json, None)?;
        Ok(Schema {
            inner: schema_json,
            names: table,
            variant,
            canonical: pcf,
        })
    }

    pub(crate) fn as_bytes(&self) -> Vec<u8> {
        self.inner.to_string().into_bytes()
    }

    pub(crate) fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Checks a value against this schema, as done before every write.
    #[inline(always)]
    pub fn validate(&self, value: &Value) -> AnsonResult<()> {
        self.variant.validate(value, &self.names)
    }

    /// Returns the parsing canonical form of this schema.
    /// Example:
    /// ```rust
    /// use anson::Schema;
    /// use std::str::FromStr;
    ///
    /// let schema = Schema::from_str(r##"
    ///     {
    ///         "type": "record",
    ///         "name": "LongList",
    ///         "aliases": ["LinkedLongs"],
    ///         "fields" : [
    ///             {"name": "value", "type": "long"},
    ///             {"name": "next", "type": ["null", "LongList"]
    ///         }]
    ///     }
    /// "##).unwrap();
    ///
    /// let canonical = schema.canonical_form();
    /// ```
    pub fn canonical_form(&self) -> &CanonicalSchema {
        &self.canonical
    }
}

impl Variant {
    pub(crate) fn validate(&self, value: &Value, names: &NameTable) -> AnsonResult<()> {
        match (value, self) {
            (Value::Null, Variant::Null)
            | (Value::Boolean(_), Variant::Boolean)
            | (Value::Int(_), Variant::Int)
            // int is promotable to long, float or double
            | (Value::Int(_), Variant::Long)
            | (Value::Int(_), Variant::Float)
            | (Value::Int(_), Variant::Double)
            | (Value::Long(_), Variant::Long)
            // long is promotable to float or double
            | (Value::Long(_), Variant::Float)
            | (Value::Long(_), Variant::Double)
            | (Value::Float(_), Variant::Float)
            // float is promotable to double
            | (Value::Float(_), Variant::Double)
            | (Value::Double(_), Variant::Double)
            | (Value::Str(_), Variant::Str)
            // string and bytes promote to each other
            | (Value::Str(_), Variant::Bytes)
            | (Value::Bytes(_), Variant::Str)
            | (Value::Bytes(_), Variant::Bytes) => Ok(()),
            (Value::Fixed(v), Variant::Fixed { size, .. })
            | (Value::Bytes(v), Variant::Fixed { size, .. }) => {
                if v.len() != *size {
                    Err(AnsonErr::FixedValueLenMismatch {
                        found: v.len(),
                        expected: *size,
                    })
                } else {
                    Ok(())
                }
            }
            (Value::Record(rec), Variant::Record { fields, .. }) => {
                for (fname, field) in fields {
                    match rec.fields.get(fname) {
                        Some(fvalue) => field.ty.validate(&fvalue.value, names)?,
                        None => return Err(AnsonErr::RecordFieldMissing(fname.to_string())),
                    }
                }
                if rec.fields.len() != fields.len() {
                    return Err(AnsonErr::ValueSchemaMismatch);
                }
                Ok(())
            }
            (Value::Map(hmap), Variant::Map { values }) => {
                for v in hmap.values() {
                    values.validate(v, names)?;
                }
                Ok(())
            }
            (Value::Enum(sym), Variant::Enum { symbols, .. }) => {
                if symbols.iter().any(|s| s == sym) {
                    Ok(())
                } else {
                    Err(AnsonErr::EnumSymbolNotPresent)
                }
            }
            (Value::Array(items), Variant::Array { items: item_schema }) => {
                for v in items {
                    item_schema.validate(v, names)?;
                }
                Ok(())
            }
            (v, Variant::Named(name)) => match names.get(name) {
                Some(schema) => schema.validate(v, names),
                None => Err(AnsonErr::NamedSchemaNotFound),
            },
            (Value::Union(idx, inner), Variant::Union { variants }) => {
                let member = variants
                    .get(*idx as usize)
                    .ok_or(AnsonErr::UnionTagOutOfRange {
                        index: *idx as usize,
                        members: variants.len(),
                    })?;
                if let Value::Union(..) = **inner {
                    return Err(AnsonErr::NoImmediateUnion);
                }
                member.validate(inner, names)
            }
            (a, Variant::Union { variants }) => {
                for s in variants {
                    if s.validate(a, names).is_ok() {
                        return Ok(());
                    }
                }
                Err(AnsonErr::NotFoundInUnion)
            }
            (v, Variant::Logical { kind, inner }) => validate_logical(v, kind, inner, names),
            (_, _) => Err(AnsonErr::ValueSchemaMismatch),
        }
    }
}

fn validate_logical(
    value: &Value,
    kind: &LogicalType,
    inner: &Variant,
    names: &NameTable,
) -> AnsonResult<()> {
    match (value, kind) {
        (Value::Uuid(_), LogicalType::Uuid) => Ok(()),
        (Value::Str(s), LogicalType::Uuid) => uuid::Uuid::parse_str(s)
            .map(|_| ())
            .map_err(|_| AnsonErr::InvalidUuid(s.clone())),
        (Value::Decimal(d), LogicalType::Decimal { .. }) => match inner {
            Variant::Fixed { size, .. } => d.to_sign_extended(*size).map(|_| ()),
            _ => Ok(()),
        },
        (Value::Date(_), LogicalType::Date)
        | (Value::TimeMillis(_), LogicalType::TimeMillis)
        | (Value::TimeMicros(_), LogicalType::TimeMicros)
        | (Value::TimestampMillis(_), LogicalType::TimestampMillis)
        | (Value::TimestampMicros(_), LogicalType::TimestampMicros)
        | (Value::LocalTimestampMillis(_), LogicalType::LocalTimestampMillis)
        | (Value::LocalTimestampMicros(_), LogicalType::LocalTimestampMicros) => Ok(()),
        (Value::Duration(_), LogicalType::Duration) => Ok(()),
        // raw base representations are accepted as-is
        _ => inner.validate(value, names),
    }
}
