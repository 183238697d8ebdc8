//! Anson is a pure Rust implementation of the [Apache Avro specification](https://avro.apache.org/docs/current/spec.html):
//! the binary codec for all schema shapes, object container files with
//! per-block compression, schema resolution between writer and reader
//! schemas, schema fingerprints and the single-object encoding.
//!
//! ## A hello world example of reading and writing avro data files
//!
//!```rust
//! use anson::{Reader, Schema, Value, Writer};
//! use std::str::FromStr;
//! use anyhow::Error;
//!
//! fn main() -> Result<(), Error> {
//!     // Writing data
//!
//!     // Create a schema
//!     let schema = Schema::from_str(r##""long""##)?;
//!     // Create a writer using the schema, providing a buffer to write to
//!     let mut writer = Writer::new(&schema, vec![])?;
//!     // Values are validated against the schema and buffered
//!     writer.write(27i64)?;
//!     // Retrieve the underlying buffer using the into_inner method
//!     let buf = writer.into_inner()?;
//!
//!     // Reading data
//!
//!     // Create a Reader by providing a Read wrapped version of `buf`
//!     let reader = Reader::new(buf.as_slice())?;
//!     // The reader is an iterator of decoded values; decoding can fail,
//!     // so it yields `Result<Value, _>`
//!     for value in reader {
//!         assert_eq!(value?, Value::Long(27));
//!     }
//!
//!     Ok(())
//! }
//!```

#![deny(missing_docs)]
#![deny(unused_must_use)]
#![recursion_limit = "1024"]

mod codec;
pub mod config;
mod error;
mod fingerprint;
mod reader;
mod resolve;
mod schema;
mod single_object;
mod util;
mod value;
mod writer;

pub use codec::BlockCodec;
pub use codec::CodecRef;
pub use codec::CodecRegistry;
pub use error::AnsonErr;
pub use error::AnsonResult;
pub use reader::Header;
pub use reader::Reader;
pub use resolve::ResolutionPlan;
pub use schema::CanonicalSchema;
pub use schema::LogicalType;
pub use schema::Order;
pub use schema::Schema;
pub use single_object::read_single_object;
pub use single_object::write_single_object;
pub use single_object::SchemaStore;
pub use value::Decimal;
pub use value::Duration;
pub use value::Record;
pub use value::Value;
pub use writer::Writer;
pub use writer::WriterBuilder;

use std::io::Read;

/// Serializes a single value under the given schema, without any container
/// framing. The inverse of [`from_datum`].
pub fn to_datum(schema: &Schema, value: &Value) -> AnsonResult<Vec<u8>> {
    schema.validate(value)?;
    let mut buf = Vec::new();
    value.encode(&mut buf, schema.variant(), &schema.names)?;
    Ok(buf)
}

/// Deserializes a single value under the given schema from a stream of its
/// plain binary encoding.
pub fn from_datum<R: Read>(schema: &Schema, source: &mut R) -> AnsonResult<Value> {
    reader::decode(schema.variant(), source, &schema.names)
}

/// Deserializes a single value written with `writer_schema`, resolved into
/// the shape of `reader_schema`.
pub fn from_datum_with<R: Read>(
    writer_schema: &Schema,
    reader_schema: &Schema,
    source: &mut R,
) -> AnsonResult<Value> {
    let plan = ResolutionPlan::new(writer_schema, reader_schema)?;
    plan.read_value(source)
}
