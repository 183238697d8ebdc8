//! The Reader is the primary interface for reading values from an avro
//! datafile, along with the writer-schema decoder it drives.

use crate::codec::{CodecRef, CodecRegistry};
use crate::config::{DEFAULT_FLUSH_INTERVAL, MAGIC_BYTES, SYNC_MARKER_SIZE};
use crate::error::{AnsonErr, AnsonResult};
use crate::resolve::ResolutionPlan;
use crate::schema::{LogicalType, NameTable, Schema, Variant};
use crate::util::{
    decode_bytes, decode_int, decode_len, decode_long, decode_long_or_eof, decode_string,
    eof_to_err,
};
use crate::value::{Decimal, Duration, FieldValue, Record, Value};
use byteorder::{LittleEndian, ReadBytesExt};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::Cursor;
use std::io::Read;
use std::str;
use std::str::FromStr;
use uuid::Uuid;

/// Reader is the primary interface for reading data from an avro datafile.
pub struct Reader<R> {
    source: R,
    header: Header,
    // compiled once when a reader schema is supplied
    plan: Option<ResolutionPlan>,
    block_buffer: Cursor<Vec<u8>>,
    entries_in_block: u64,
}

impl<R> Reader<R>
where
    R: Read,
{
    /// Creates a Reader from an avro encoded readable buffer, decoding
    /// values with the schema embedded in the datafile header.
    pub fn new(avro_source: R) -> AnsonResult<Self> {
        Reader::with_codec_registry(avro_source, None, &CodecRegistry::new())
    }

    /// Creates a Reader which resolves values written with the datafile's
    /// schema into the given reader schema.
    pub fn with_schema(source: R, reader_schema: &Schema) -> AnsonResult<Self> {
        Reader::with_codec_registry(source, Some(reader_schema), &CodecRegistry::new())
    }

    /// Creates a Reader with an explicit codec registry, for datafiles
    /// compressed with custom codecs.
    pub fn with_codec_registry(
        mut source: R,
        reader_schema: Option<&Schema>,
        registry: &CodecRegistry,
    ) -> AnsonResult<Self> {
        let header = Header::from_reader(&mut source, registry)?;
        let plan = match reader_schema {
            Some(reader_schema) => Some(ResolutionPlan::new(&header.schema, reader_schema)?),
            None => None,
        };
        Ok(Reader {
            source,
            header,
            plan,
            block_buffer: Cursor::new(Vec::with_capacity(DEFAULT_FLUSH_INTERVAL)),
            entries_in_block: 0,
        })
    }

    // Reads the next block into the block buffer. Ok(None) marks a clean
    // end of file at a block boundary.
    fn next_block(&mut self) -> AnsonResult<Option<()>> {
        let count = match decode_long_or_eof(&mut self.source)? {
            Some(count) => count,
            None => return Ok(None),
        };
        if count < 0 {
            return Err(AnsonErr::NegativeLength(count));
        }

        let size = decode_len(&mut self.source)?;
        let mut compressed = vec![0u8; size];
        self.source.read_exact(&mut compressed).map_err(eof_to_err)?;

        self.block_buffer.get_mut().clear();
        self.header
            .codec
            .decompress(&compressed, self.block_buffer.get_mut())?;
        self.block_buffer.set_position(0);

        let mut sync_marker_buf = [0u8; SYNC_MARKER_SIZE];
        self.source
            .read_exact(&mut sync_marker_buf)
            .map_err(eof_to_err)?;

        if sync_marker_buf != self.header.sync_marker {
            return Err(AnsonErr::SyncMarkerMismatch);
        }

        self.entries_in_block = count as u64;
        Ok(Some(()))
    }

    /// Retrieves a reference to the header metadata map.
    pub fn meta(&self) -> &HashMap<String, Vec<u8>> {
        self.header.metadata()
    }

    /// The writer's schema embedded in the datafile header.
    pub fn writer_schema(&self) -> &Schema {
        self.header.schema()
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = AnsonResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        // invariant: true on start and end of an avro datafile; a zero
        // count block simply loops to the next one
        while self.entries_in_block == 0 {
            match self.next_block() {
                Ok(Some(())) => {}
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }

        let value = match &self.plan {
            Some(plan) => plan.read_value(&mut self.block_buffer),
            None => decode(
                self.header.schema.variant(),
                &mut self.block_buffer,
                &self.header.schema.names,
            ),
        };

        self.entries_in_block -= 1;
        Some(value)
    }
}

pub(crate) fn decode<R: Read>(
    schema: &Variant,
    reader: &mut R,
    names: &NameTable,
) -> AnsonResult<Value> {
    let value = match schema {
        Variant::Null => Value::Null,
        Variant::Boolean => match crate::util::read_byte(reader)? {
            0x00 => Value::Boolean(false),
            0x01 => Value::Boolean(true),
            other => return Err(AnsonErr::InvalidBoolean(other)),
        },
        Variant::Int => Value::Int(decode_int(reader)?),
        Variant::Long => Value::Long(decode_long(reader)?),
        Variant::Float => Value::Float(
            reader
                .read_f32::<LittleEndian>()
                .map_err(eof_to_err)?,
        ),
        Variant::Double => Value::Double(
            reader
                .read_f64::<LittleEndian>()
                .map_err(eof_to_err)?,
        ),
        Variant::Bytes => Value::Bytes(decode_bytes(reader)?),
        Variant::Str => Value::Str(decode_string(reader)?),
        Variant::Array { items } => {
            let mut decoded = Vec::new();
            loop {
                let block_count = decode_long(reader)?;
                if block_count == 0 {
                    break;
                }
                let block_count = if block_count < 0 {
                    // a negative count is followed by the block's byte size
                    let _byte_size = decode_len(reader)?;
                    block_count
                        .checked_neg()
                        .ok_or(AnsonErr::NegativeLength(block_count))?
                } else {
                    block_count
                };
                for _ in 0..block_count {
                    decoded.push(decode(items, reader, names)?);
                }
            }
            Value::Array(decoded)
        }
        Variant::Map { values } => {
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
                    let value = decode(values, reader, names)?;
                    decoded.insert(key, value);
                }
            }
            Value::Map(decoded)
        }
        Variant::Record { name, fields, .. } => {
            let mut decoded = IndexMap::with_capacity(fields.len());
            for (field_name, field) in fields {
                let field_value = decode(&field.ty, reader, names)?;
                decoded.insert(field_name.to_string(), FieldValue::new(field_value));
            }
            Value::Record(Record {
                name: name.fullname(),
                fields: decoded,
            })
        }
        Variant::Enum { symbols, .. } => {
            let idx = decode_int(reader)?;
            if idx < 0 || idx as usize >= symbols.len() {
                return Err(AnsonErr::InvalidEnumSymbolIdx(
                    idx.max(0) as usize,
                    format!("{:?}", symbols),
                ));
            }
            Value::Enum(symbols[idx as usize].to_string())
        }
        Variant::Union { variants } => {
            let idx = decode_long(reader)?;
            let member = if idx >= 0 {
                variants.get(idx as usize)
            } else {
                None
            };
            match member {
                Some(member) => {
                    let decoded = decode(member, reader, names)?;
                    Value::Union(idx as u32, Box::new(decoded))
                }
                None => {
                    return Err(AnsonErr::UnionIndexOutOfBounds {
                        index: idx,
                        members: variants.len(),
                    })
                }
            }
        }
        Variant::Fixed { size, .. } => {
            let mut fixed = vec![0u8; *size];
            reader.read_exact(&mut fixed).map_err(eof_to_err)?;
            Value::Fixed(fixed)
        }
        Variant::Named(schema_name) => {
            let schema_variant = names
                .get(schema_name)
                .ok_or(AnsonErr::NamedSchemaNotFound)?;
            decode(schema_variant, reader, names)?
        }
        Variant::Logical { kind, inner } => decode_logical(kind, inner, reader)?,
    };

    Ok(value)
}

pub(crate) fn decode_logical<R: Read>(
    kind: &LogicalType,
    inner: &Variant,
    reader: &mut R,
) -> AnsonResult<Value> {
    let value = match kind {
        LogicalType::Uuid => {
            let text = decode_string(reader)?;
            let parsed = Uuid::parse_str(&text).map_err(|_| AnsonErr::InvalidUuid(text))?;
            Value::Uuid(parsed)
        }
        LogicalType::Decimal { .. } => {
            let unscaled = match inner {
                Variant::Fixed { size, .. } => {
                    let mut buf = vec![0u8; *size];
                    reader.read_exact(&mut buf).map_err(eof_to_err)?;
                    buf
                }
                _ => decode_bytes(reader)?,
            };
            Value::Decimal(Decimal::from_be_bytes(&unscaled))
        }
        LogicalType::Date => Value::Date(decode_int(reader)?),
        LogicalType::TimeMillis => Value::TimeMillis(decode_int(reader)?),
        LogicalType::TimeMicros => Value::TimeMicros(decode_long(reader)?),
        LogicalType::TimestampMillis => Value::TimestampMillis(decode_long(reader)?),
        LogicalType::TimestampMicros => Value::TimestampMicros(decode_long(reader)?),
        LogicalType::LocalTimestampMillis => Value::LocalTimestampMillis(decode_long(reader)?),
        LogicalType::LocalTimestampMicros => Value::LocalTimestampMicros(decode_long(reader)?),
        LogicalType::Duration => {
            let mut buf = [0u8; 12];
            reader.read_exact(&mut buf).map_err(eof_to_err)?;
            Value::Duration(Duration::from_bytes(buf))
        }
    };
    Ok(value)
}

// Decodes and discards a value, without building a Value. Array and map
// blocks that carry a byte size are skipped wholesale.
pub(crate) fn skip_value<R: Read>(
    schema: &Variant,
    reader: &mut R,
    names: &NameTable,
) -> AnsonResult<()> {
    match schema {
        Variant::Null => {}
        Variant::Boolean => {
            crate::util::read_byte(reader)?;
        }
        Variant::Int => {
            decode_int(reader)?;
        }
        Variant::Long => {
            decode_long(reader)?;
        }
        Variant::Float => skip_exact(reader, 4)?,
        Variant::Double => skip_exact(reader, 8)?,
        Variant::Bytes | Variant::Str => {
            let len = decode_len(reader)?;
            skip_exact(reader, len)?;
        }
        Variant::Fixed { size, .. } => skip_exact(reader, *size)?,
        Variant::Enum { .. } => {
            decode_int(reader)?;
        }
        Variant::Record { fields, .. } => {
            for (_, field) in fields {
                skip_value(&field.ty, reader, names)?;
            }
        }
        Variant::Union { variants } => {
            let idx = decode_long(reader)?;
            let member = if idx >= 0 {
                variants.get(idx as usize)
            } else {
                None
            };
            match member {
                Some(member) => skip_value(member, reader, names)?,
                None => {
                    return Err(AnsonErr::UnionIndexOutOfBounds {
                        index: idx,
                        members: variants.len(),
                    })
                }
            }
        }
        Variant::Array { items } => loop {
            let block_count = decode_long(reader)?;
            if block_count == 0 {
                break;
            }
            if block_count < 0 {
                let byte_size = decode_len(reader)?;
                skip_exact(reader, byte_size)?;
            } else {
                for _ in 0..block_count {
                    skip_value(items, reader, names)?;
                }
            }
        },
        Variant::Map { values } => loop {
            let block_count = decode_long(reader)?;
            if block_count == 0 {
                break;
            }
            if block_count < 0 {
                let byte_size = decode_len(reader)?;
                skip_exact(reader, byte_size)?;
            } else {
                for _ in 0..block_count {
                    let key_len = decode_len(reader)?;
                    skip_exact(reader, key_len)?;
                    skip_value(values, reader, names)?;
                }
            }
        },
        Variant::Named(schema_name) => {
            let schema_variant = names
                .get(schema_name)
                .ok_or(AnsonErr::NamedSchemaNotFound)?;
            skip_value(schema_variant, reader, names)?;
        }
        Variant::Logical { inner, .. } => skip_value(inner, reader, names)?,
    }
    Ok(())
}

fn skip_exact<R: Read>(reader: &mut R, len: usize) -> AnsonResult<()> {
    let mut taken = reader.take(len as u64);
    let copied = std::io::copy(&mut taken, &mut std::io::sink()).map_err(AnsonErr::DecodeFailed)?;
    if copied as usize != len {
        return Err(AnsonErr::UnexpectedEof);
    }
    Ok(())
}

/// Header represents the avro datafile header.
pub struct Header {
    /// Writer's schema
    pub(crate) schema: Schema,
    /// A map which stores avro metadata, like `avro.codec` and `avro.schema`.
    /// Additional key values can be added through the
    /// [WriterBuilder](struct.WriterBuilder.html)'s `set_metadata` method.
    pub(crate) metadata: HashMap<String, Vec<u8>>,
    /// A unique 16 byte sequence for file integrity when writing avro data to file.
    pub(crate) sync_marker: [u8; SYNC_MARKER_SIZE],
    /// codec resolved from the datafile metadata
    pub(crate) codec: CodecRef,
}

impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("schema", &self.schema)
            .field("metadata", &self.metadata)
            .field("sync_marker", &self.sync_marker)
            .field("codec", &self.codec.name())
            .finish()
    }
}

fn decode_header_map<R>(reader: &mut R) -> AnsonResult<HashMap<String, Vec<u8>>>
where
    R: Read,
{
    let mut map = HashMap::new();
    loop {
        let count = decode_long(reader)?;
        if count == 0 {
            break;
        }
        let count = if count < 0 {
            let _byte_size = decode_len(reader)?;
            count.checked_neg().ok_or(AnsonErr::NegativeLength(count))?
        } else {
            count
        };
        for _ in 0..count {
            let key = decode_string(reader)?;
            let val = decode_bytes(reader)?;
            map.insert(key, val);
        }
    }
    Ok(map)
}

impl Header {
    /// Reads the header from an avro datafile, resolving its codec through
    /// the given registry.
    pub fn from_reader<R: Read>(reader: &mut R, registry: &CodecRegistry) -> AnsonResult<Self> {
        let mut magic_buf = [0u8; 4];
        reader
            .read_exact(&mut magic_buf[..])
            .map_err(|_| AnsonErr::HeaderDecodeFailed)?;

        if &magic_buf[..] != MAGIC_BYTES {
            return Err(AnsonErr::InvalidDataFile);
        }

        let map = decode_header_map(reader)?;

        let mut sync_marker = [0u8; SYNC_MARKER_SIZE];
        reader
            .read_exact(&mut sync_marker)
            .map_err(|_| AnsonErr::HeaderDecodeFailed)?;

        let schema_bytes = map.get("avro.schema").ok_or(AnsonErr::HeaderDecodeFailed)?;
        let schema = str::from_utf8(schema_bytes)
            .map(Schema::from_str)
            .map_err(|_| AnsonErr::HeaderDecodeFailed)??;

        let codec = match map.get("avro.codec") {
            Some(c) => match str::from_utf8(c) {
                Ok(name) => registry.get(name)?,
                Err(_) => return Err(AnsonErr::UnsupportedCodec("<non-utf8>".to_string())),
            },
            None => registry.get("null")?,
        };

        Ok(Header {
            schema,
            metadata: map,
            sync_marker,
            codec,
        })
    }

    /// Returns a reference to metadata from avro datafile header
    pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.metadata
    }

    /// Returns a reference to the writer's schema in this header
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The `avro.codec` name this datafile was written with.
    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }
}
