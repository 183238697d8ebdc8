//! Avro single-object encoding: a two byte marker, the schema's
//! CRC-64-AVRO fingerprint in little-endian, then the plain binary datum.
//! Readers select the schema by fingerprint from a [`SchemaStore`].

use crate::config::SINGLE_OBJECT_MARKER;
use crate::error::{AnsonErr, AnsonResult};
use crate::reader::decode;
use crate::util::eof_to_err;
use crate::value::Value;
use crate::Schema;
use std::collections::HashMap;
use std::io::{Read, Write};

/// A collection of schemas addressable by their CRC-64-AVRO fingerprint.
#[derive(Debug, Default)]
pub struct SchemaStore {
    schemas: HashMap<u64, Schema>,
}

impl SchemaStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        SchemaStore {
            schemas: HashMap::new(),
        }
    }

    /// Registers a schema and returns its fingerprint.
    pub fn register(&mut self, schema: Schema) -> u64 {
        let fingerprint = schema.canonical_form().rabin64();
        self.schemas.insert(fingerprint, schema);
        fingerprint
    }

    /// Looks up a schema by fingerprint.
    pub fn get(&self, fingerprint: u64) -> Option<&Schema> {
        self.schemas.get(&fingerprint)
    }
}

/// Writes a value as a single-object encoded datum: marker, fingerprint,
/// then the binary encoding under `schema`.
pub fn write_single_object<W: Write>(
    value: &Value,
    schema: &Schema,
    out: &mut W,
) -> AnsonResult<()> {
    schema.validate(value)?;
    out.write_all(&SINGLE_OBJECT_MARKER)
        .map_err(AnsonErr::EncodeFailed)?;
    out.write_all(&schema.canonical_form().rabin64().to_le_bytes())
        .map_err(AnsonErr::EncodeFailed)?;
    value.encode(out, schema.variant(), &schema.names)
}

/// Reads a single-object encoded datum, selecting its schema from the store
/// by the embedded fingerprint.
pub fn read_single_object<R: Read>(source: &mut R, store: &SchemaStore) -> AnsonResult<Value> {
    let mut marker = [0u8; 2];
    source.read_exact(&mut marker).map_err(eof_to_err)?;
    if marker != SINGLE_OBJECT_MARKER {
        return Err(AnsonErr::InvalidSingleObjectMarker(marker[0], marker[1]));
    }

    let mut fingerprint = [0u8; 8];
    source.read_exact(&mut fingerprint).map_err(eof_to_err)?;
    let fingerprint = u64::from_le_bytes(fingerprint);

    let schema = store
        .get(fingerprint)
        .ok_or(AnsonErr::UnknownFingerprint(fingerprint))?;
    decode(schema.variant(), source, &schema.names)
}
