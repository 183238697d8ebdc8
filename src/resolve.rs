//! Schema resolution: reading data written with one schema through a
//! compatible reader schema.
//!
//! A writer/reader schema pair is compiled once into a [`ResolutionPlan`],
//! a tree of resolution nodes (pass-through, promotion, field mapping,
//! symbol mapping, union branch tables). Decoding a value is then a
//! table-driven walk of the plan, with no schema comparison per value.

use crate::error::{AnsonErr, AnsonResult};
use crate::reader::skip_value;
use crate::schema::common::{Field, Name};
use crate::schema::{LogicalType, NameTable, Schema, Variant};
use crate::util::{
    decode_bytes, decode_int, decode_len, decode_long, decode_string, eof_to_err, read_byte,
};
use crate::value::{Decimal, Duration, FieldValue, Record, Value};
use byteorder::{LittleEndian, ReadBytesExt};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::Read;
use uuid::Uuid;

/// A compiled writer/reader schema pair, ready to drive reads.
#[derive(Debug)]
pub struct ResolutionPlan {
    root: PlanNode,
    // completed record nodes, keyed by writer and reader fullname; record
    // back-references point into this table so recursive schemas compile
    // finitely
    named: HashMap<String, PlanNode>,
    // needed to skip writer-only fields
    writer_names: NameTable,
}

#[derive(Debug)]
enum PlanNode {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Promote(Promotion),
    Logical {
        kind: LogicalType,
        inner: Box<PlanNode>,
    },
    Record {
        name: String,
        steps: Vec<FieldStep>,
        defaults: Vec<(String, Value)>,
        field_order: Vec<String>,
    },
    Enum {
        symbols: Vec<String>,
        writer_symbols: Vec<String>,
        mapping: Vec<Option<usize>>,
        default: Option<usize>,
    },
    Array(Box<PlanNode>),
    Map(Box<PlanNode>),
    Fixed {
        size: usize,
    },
    WriterUnion {
        branches: Vec<Option<PlanNode>>,
    },
    IntoReaderUnion {
        index: usize,
        inner: Box<PlanNode>,
    },
    Ref(String),
}

// Steps run in writer field declaration order.
#[derive(Debug)]
enum FieldStep {
    Read { target: String, node: PlanNode },
    Skip(Variant),
}

#[derive(Debug, Clone, Copy)]
enum Promotion {
    IntToLong,
    IntToFloat,
    IntToDouble,
    LongToFloat,
    LongToDouble,
    FloatToDouble,
    StrToBytes,
    BytesToStr,
}

impl ResolutionPlan {
    /// Compiles a plan resolving data written with `writer` into values
    /// shaped by `reader`, failing when the schemas are incompatible.
    pub fn new(writer: &Schema, reader: &Schema) -> AnsonResult<Self> {
        let mut compiler = Compiler {
            writer_names: &writer.names,
            reader_names: &reader.names,
            named: HashMap::new(),
            in_progress: Vec::new(),
        };
        let root = compiler.node(writer.variant(), reader.variant())?;
        Ok(ResolutionPlan {
            root,
            named: compiler.named,
            writer_names: writer.names.clone(),
        })
    }

    /// Reads one value through the plan.
    pub fn read_value<R: Read>(&self, reader: &mut R) -> AnsonResult<Value> {
        self.read_node(&self.root, reader)
    }

    fn read_node<R: Read>(&self, node: &PlanNode, reader: &mut R) -> AnsonResult<Value> {
        let value = match node {
            PlanNode::Null => Value::Null,
            PlanNode::Boolean => match read_byte(reader)? {
                0x00 => Value::Boolean(false),
                0x01 => Value::Boolean(true),
                other => return Err(AnsonErr::InvalidBoolean(other)),
            },
            PlanNode::Int => Value::Int(decode_int(reader)?),
            PlanNode::Long => Value::Long(decode_long(reader)?),
            PlanNode::Float => Value::Float(
                reader
                    .read_f32::<LittleEndian>()
                    .map_err(eof_to_err)?,
            ),
            PlanNode::Double => Value::Double(
                reader
                    .read_f64::<LittleEndian>()
                    .map_err(eof_to_err)?,
            ),
            PlanNode::Bytes => Value::Bytes(decode_bytes(reader)?),
            PlanNode::Str => Value::Str(decode_string(reader)?),
            // promotions decode the writer's format and widen
            PlanNode::Promote(p) => match p {
                Promotion::IntToLong => Value::Long(i64::from(decode_int(reader)?)),
                Promotion::IntToFloat => Value::Float(decode_int(reader)? as f32),
                Promotion::IntToDouble => Value::Double(f64::from(decode_int(reader)?)),
                Promotion::LongToFloat => Value::Float(decode_long(reader)? as f32),
                Promotion::LongToDouble => Value::Double(decode_long(reader)? as f64),
                Promotion::FloatToDouble => Value::Double(f64::from(
                    reader
                        .read_f32::<LittleEndian>()
                        .map_err(eof_to_err)?,
                )),
                Promotion::StrToBytes => Value::Bytes(decode_bytes(reader)?),
                Promotion::BytesToStr => Value::Str(decode_string(reader)?),
            },
            PlanNode::Logical { kind, inner } => {
                let base = self.read_node(inner, reader)?;
                apply_logical(kind, base)?
            }
            PlanNode::Record {
                name,
                steps,
                defaults,
                field_order,
            } => {
                let mut by_name: HashMap<&str, Value> = HashMap::with_capacity(field_order.len());
                for step in steps {
                    match step {
                        FieldStep::Read { target, node } => {
                            let value = self.read_node(node, reader)?;
                            by_name.insert(target.as_str(), value);
                        }
                        FieldStep::Skip(writer_schema) => {
                            skip_value(writer_schema, reader, &self.writer_names)?;
                        }
                    }
                }
                for (fname, default) in defaults {
                    by_name.insert(fname.as_str(), default.clone());
                }
                // assemble in the reader's declaration order
                let mut fields = IndexMap::with_capacity(field_order.len());
                for fname in field_order {
                    let value = by_name
                        .remove(fname.as_str())
                        .ok_or_else(|| AnsonErr::FieldMissingDefault(fname.clone()))?;
                    fields.insert(fname.clone(), FieldValue::new(value));
                }
                Value::Record(Record {
                    name: name.clone(),
                    fields,
                })
            }
            PlanNode::Enum {
                symbols,
                writer_symbols,
                mapping,
                default,
            } => {
                let idx = decode_int(reader)?;
                if idx < 0 || idx as usize >= mapping.len() {
                    return Err(AnsonErr::InvalidEnumSymbolIdx(
                        idx.max(0) as usize,
                        format!("{:?}", writer_symbols),
                    ));
                }
                match (mapping[idx as usize], default) {
                    (Some(reader_idx), _) => Value::Enum(symbols[reader_idx].clone()),
                    (None, Some(default_idx)) => Value::Enum(symbols[*default_idx].clone()),
                    (None, None) => {
                        return Err(AnsonErr::EnumSymbolUnmapped(
                            writer_symbols[idx as usize].clone(),
                        ))
                    }
                }
            }
            PlanNode::Array(inner) => {
                let mut decoded = Vec::new();
                loop {
                    let block_count = decode_long(reader)?;
                    if block_count == 0 {
                        break;
                    }
                    let block_count = if block_count < 0 {
                        let _byte_size = decode_len(reader)?;
                        block_count
                            .checked_neg()
                            .ok_or(AnsonErr::NegativeLength(block_count))?
                    } else {
                        block_count
                    };
                    for _ in 0..block_count {
                        decoded.push(self.read_node(inner, reader)?);
                    }
                }
                Value::Array(decoded)
            }
            PlanNode::Map(inner) => {
                let mut decoded = HashMap::new();
                loop {
                    let block_count = decode_long(reader)?;
                    if block_count == 0 {
                        break;
                    }
                    let block_count = if block_count < 0 {
                        let _byte_size = decode_len(reader)?;
                        block_count
                            .checked_neg()
                            .ok_or(AnsonErr::NegativeLength(block_count))?
                    } else {
                        block_count
                    };
                    for _ in 0..block_count {
                        let key = decode_string(reader)?;
                        let value = self.read_node(inner, reader)?;
                        decoded.insert(key, value);
                    }
                }
                Value::Map(decoded)
            }
            PlanNode::Fixed { size } => {
                let mut fixed = vec![0u8; *size];
                reader.read_exact(&mut fixed).map_err(eof_to_err)?;
                Value::Fixed(fixed)
            }
            PlanNode::WriterUnion { branches } => {
                let idx = decode_long(reader)?;
                let branch = if idx >= 0 {
                    branches.get(idx as usize)
                } else {
                    None
                };
                match branch {
                    Some(Some(node)) => self.read_node(node, reader)?,
                    Some(None) => return Err(AnsonErr::UnresolvedUnionBranch(idx as usize)),
                    None => {
                        return Err(AnsonErr::UnionIndexOutOfBounds {
                            index: idx,
                            members: branches.len(),
                        })
                    }
                }
            }
            PlanNode::IntoReaderUnion { index, inner } => {
                let value = self.read_node(inner, reader)?;
                Value::Union(*index as u32, Box::new(value))
            }
            PlanNode::Ref(key) => {
                let node = self.named.get(key).ok_or(AnsonErr::NamedSchemaNotFound)?;
                self.read_node(node, reader)?
            }
        };
        Ok(value)
    }
}

fn apply_logical(kind: &LogicalType, base: Value) -> AnsonResult<Value> {
    let value = match (kind, base) {
        (LogicalType::Uuid, Value::Str(text)) => Value::Uuid(
            Uuid::parse_str(&text).map_err(|_| AnsonErr::InvalidUuid(text.clone()))?,
        ),
        (LogicalType::Decimal { .. }, Value::Bytes(unscaled))
        | (LogicalType::Decimal { .. }, Value::Fixed(unscaled)) => {
            Value::Decimal(Decimal::from_be_bytes(&unscaled))
        }
        (LogicalType::Date, Value::Int(n)) => Value::Date(n),
        (LogicalType::TimeMillis, Value::Int(n)) => Value::TimeMillis(n),
        (LogicalType::TimeMicros, Value::Long(n)) => Value::TimeMicros(n),
        (LogicalType::TimestampMillis, Value::Long(n)) => Value::TimestampMillis(n),
        (LogicalType::TimestampMicros, Value::Long(n)) => Value::TimestampMicros(n),
        (LogicalType::LocalTimestampMillis, Value::Long(n)) => Value::LocalTimestampMillis(n),
        (LogicalType::LocalTimestampMicros, Value::Long(n)) => Value::LocalTimestampMicros(n),
        (LogicalType::Duration, Value::Fixed(buf)) if buf.len() == 12 => {
            let mut bytes = [0u8; 12];
            bytes.copy_from_slice(&buf);
            Value::Duration(Duration::from_bytes(bytes))
        }
        (_, _) => return Err(AnsonErr::ValueSchemaMismatch),
    };
    Ok(value)
}

struct Compiler<'s> {
    writer_names: &'s NameTable,
    reader_names: &'s NameTable,
    named: HashMap<String, PlanNode>,
    in_progress: Vec<String>,
}

// Resolves Named back-references through the owning table.
fn deref<'s>(mut variant: &'s Variant, names: &'s NameTable) -> AnsonResult<&'s Variant> {
    while let Variant::Named(name) = variant {
        variant = names.get(name).ok_or(AnsonErr::NamedSchemaNotFound)?;
    }
    Ok(variant)
}

// Splits a logical wrapper off its base schema.
fn strip_logical(variant: &Variant) -> (&Variant, Option<&LogicalType>) {
    match variant {
        Variant::Logical { kind, inner } => (inner, Some(kind)),
        other => (other, None),
    }
}

// A writer name is accepted when the reader's fullname matches it or any of
// the reader's aliases (bare, or qualified with the reader's namespace)
// matches it.
fn names_match(
    writer_fullname: &str,
    reader_name: &Name,
    reader_aliases: &Option<Vec<String>>,
) -> bool {
    if reader_name.fullname() == writer_fullname {
        return true;
    }
    if let Some(aliases) = reader_aliases {
        for alias in aliases {
            if alias == writer_fullname {
                return true;
            }
            if let Some(ns) = reader_name.namespace() {
                if format!("{}.{}", ns, alias) == writer_fullname {
                    return true;
                }
            }
        }
    }
    false
}

// A reader field matches a writer field when the names are equal or the
// writer's name appears among the reader field's aliases.
fn field_matches(writer_field_name: &str, reader_field: &Field) -> bool {
    if reader_field.name == writer_field_name {
        return true;
    }
    match &reader_field.aliases {
        Some(aliases) => aliases.iter().any(|a| a == writer_field_name),
        None => false,
    }
}

impl<'s> Compiler<'s> {
    fn node(&mut self, writer: &'s Variant, reader: &'s Variant) -> AnsonResult<PlanNode> {
        let writer = deref(writer, self.writer_names)?;
        let reader = deref(reader, self.reader_names)?;

        let (w_base, _) = strip_logical(writer);
        let (r_base, r_kind) = strip_logical(reader);

        // logical types resolve through their bases; the reader's logical
        // kind shapes the decoded value
        if let Some(kind) = r_kind {
            let inner = self.base_node(w_base, r_base)?;
            return Ok(PlanNode::Logical {
                kind: kind.clone(),
                inner: Box::new(inner),
            });
        }
        self.base_node(w_base, r_base)
    }

    fn base_node(&mut self, writer: &'s Variant, reader: &'s Variant) -> AnsonResult<PlanNode> {
        match (writer, reader) {
            // the writer's runtime branch decides; each branch is resolved
            // against the whole reader schema up front
            (Variant::Union { variants }, _) => {
                let mut branches = Vec::with_capacity(variants.len());
                for branch in variants {
                    branches.push(self.node(branch, reader).ok());
                }
                Ok(PlanNode::WriterUnion { branches })
            }
            // a non-union writer resolves against the first matching reader
            // branch
            (_, Variant::Union { variants }) => {
                for (index, branch) in variants.iter().enumerate() {
                    if let Ok(inner) = self.node(writer, branch) {
                        return Ok(PlanNode::IntoReaderUnion {
                            index,
                            inner: Box::new(inner),
                        });
                    }
                }
                Err(AnsonErr::WriterNotInReader)
            }
            (Variant::Null, Variant::Null) => Ok(PlanNode::Null),
            (Variant::Boolean, Variant::Boolean) => Ok(PlanNode::Boolean),
            (Variant::Int, Variant::Int) => Ok(PlanNode::Int),
            (Variant::Long, Variant::Long) => Ok(PlanNode::Long),
            (Variant::Float, Variant::Float) => Ok(PlanNode::Float),
            (Variant::Double, Variant::Double) => Ok(PlanNode::Double),
            (Variant::Bytes, Variant::Bytes) => Ok(PlanNode::Bytes),
            (Variant::Str, Variant::Str) => Ok(PlanNode::Str),
            (Variant::Int, Variant::Long) => Ok(PlanNode::Promote(Promotion::IntToLong)),
            (Variant::Int, Variant::Float) => Ok(PlanNode::Promote(Promotion::IntToFloat)),
            (Variant::Int, Variant::Double) => Ok(PlanNode::Promote(Promotion::IntToDouble)),
            (Variant::Long, Variant::Float) => Ok(PlanNode::Promote(Promotion::LongToFloat)),
            (Variant::Long, Variant::Double) => Ok(PlanNode::Promote(Promotion::LongToDouble)),
            (Variant::Float, Variant::Double) => Ok(PlanNode::Promote(Promotion::FloatToDouble)),
            (Variant::Str, Variant::Bytes) => Ok(PlanNode::Promote(Promotion::StrToBytes)),
            (Variant::Bytes, Variant::Str) => Ok(PlanNode::Promote(Promotion::BytesToStr)),
            (
                Variant::Array { items: w_items },
                Variant::Array { items: r_items },
            ) => Ok(PlanNode::Array(Box::new(self.node(w_items, r_items)?))),
            (
                Variant::Map { values: w_values },
                Variant::Map { values: r_values },
            ) => Ok(PlanNode::Map(Box::new(self.node(w_values, r_values)?))),
            (
                Variant::Fixed {
                    name: w_name,
                    size: w_size,
                    ..
                },
                Variant::Fixed {
                    name: r_name,
                    size: r_size,
                    aliases: r_aliases,
                },
            ) => {
                if w_size != r_size || !names_match(&w_name.fullname(), r_name, r_aliases) {
                    return Err(AnsonErr::FixedSchemaMismatch);
                }
                Ok(PlanNode::Fixed { size: *r_size })
            }
            (
                Variant::Enum {
                    name: w_name,
                    symbols: w_symbols,
                    ..
                },
                Variant::Enum {
                    name: r_name,
                    symbols: r_symbols,
                    aliases: r_aliases,
                    default: r_default,
                },
            ) => {
                if !names_match(&w_name.fullname(), r_name, r_aliases) {
                    return Err(AnsonErr::EnumNameMismatch);
                }
                let mapping = w_symbols
                    .iter()
                    .map(|w_sym| r_symbols.iter().position(|r_sym| r_sym == w_sym))
                    .collect();
                let default = match r_default {
                    Some(d) => r_symbols.iter().position(|s| s == d),
                    None => None,
                };
                Ok(PlanNode::Enum {
                    symbols: r_symbols.clone(),
                    writer_symbols: w_symbols.clone(),
                    mapping,
                    default,
                })
            }
            (
                Variant::Record {
                    name: w_name,
                    fields: w_fields,
                    ..
                },
                Variant::Record {
                    name: r_name,
                    fields: r_fields,
                    aliases: r_aliases,
                },
            ) => {
                let w_fullname = w_name.fullname();
                if !names_match(&w_fullname, r_name, r_aliases) {
                    return Err(AnsonErr::RecordNameMismatch);
                }
                let key = format!("{}>{}", w_fullname, r_name.fullname());
                if self.named.contains_key(&key) || self.in_progress.contains(&key) {
                    return Ok(PlanNode::Ref(key));
                }
                self.in_progress.push(key.clone());
                let body = self.record_body(r_name, w_fields, r_fields);
                self.in_progress.pop();
                self.named.insert(key.clone(), body?);
                Ok(PlanNode::Ref(key))
            }
            (w, r) => Err(AnsonErr::SchemaResolutionFailed(
                format!("{:?}", r),
                format!("{:?}", w),
            )),
        }
    }

    fn record_body(
        &mut self,
        r_name: &Name,
        w_fields: &'s IndexMap<String, Field>,
        r_fields: &'s IndexMap<String, Field>,
    ) -> AnsonResult<PlanNode> {
        // writer fields decode in writer declaration order; those without a
        // reader counterpart are skipped
        let mut steps = Vec::with_capacity(w_fields.len());
        for (w_fname, w_field) in w_fields {
            let matched = r_fields.values().find(|r_field| field_matches(w_fname, r_field));
            match matched {
                Some(r_field) => steps.push(FieldStep::Read {
                    target: r_field.name.clone(),
                    node: self.node(&w_field.ty, &r_field.ty)?,
                }),
                None => steps.push(FieldStep::Skip(w_field.ty.clone())),
            }
        }

        // reader fields with no writer counterpart take their default
        let mut defaults = Vec::new();
        for r_field in r_fields.values() {
            let has_writer = w_fields
                .keys()
                .any(|w_fname| field_matches(w_fname, r_field));
            if !has_writer {
                match &r_field.default {
                    Some(default) => defaults.push((r_field.name.clone(), default.clone())),
                    None => {
                        return Err(AnsonErr::FieldMissingDefault(r_field.name.clone()));
                    }
                }
            }
        }

        Ok(PlanNode::Record {
            name: r_name.fullname(),
            steps,
            defaults,
            field_order: r_fields.keys().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ResolutionPlan;
    use crate::Schema;
    use std::str::FromStr;

    #[test]
    fn incompatible_primitives_fail_to_compile() {
        let writer = Schema::from_str(r##""string""##).unwrap();
        let reader = Schema::from_str(r##""int""##).unwrap();
        assert!(ResolutionPlan::new(&writer, &reader).is_err());
    }

    #[test]
    fn demotion_is_not_promotion() {
        let writer = Schema::from_str(r##""long""##).unwrap();
        let reader = Schema::from_str(r##""int""##).unwrap();
        assert!(ResolutionPlan::new(&writer, &reader).is_err());
    }

    #[test]
    fn recursive_record_pair_compiles() {
        let schema = r##"
        {
            "type": "record",
            "name": "LongList",
            "fields" : [
              {"name": "value", "type": "long"},
              {"name": "next", "type": ["null", "LongList"]}
            ]
        }
        "##;
        let writer = Schema::from_str(schema).unwrap();
        let reader = Schema::from_str(schema).unwrap();
        assert!(ResolutionPlan::new(&writer, &reader).is_ok());
    }

    #[test]
    fn reader_alias_accepts_renamed_record() {
        let writer = Schema::from_str(
            r##"{"type": "record", "name": "OldName", "fields": [{"name": "a", "type": "int"}]}"##,
        )
        .unwrap();
        let reader = Schema::from_str(
            r##"{"type": "record", "name": "NewName", "aliases": ["OldName"],
                 "fields": [{"name": "a", "type": "int"}]}"##,
        )
        .unwrap();
        assert!(ResolutionPlan::new(&writer, &reader).is_ok());
    }

    #[test]
    fn missing_default_fails_to_compile() {
        let writer = Schema::from_str(
            r##"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"##,
        )
        .unwrap();
        let reader = Schema::from_str(
            r##"{"type": "record", "name": "R",
                 "fields": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}]}"##,
        )
        .unwrap();
        assert!(ResolutionPlan::new(&writer, &reader).is_err());
    }
}
