//! The Writer is the primary interface for writing values in avro encoded format.

use crate::codec::{CodecRef, CodecRegistry};
use crate::config::{DEFAULT_FLUSH_INTERVAL, MAGIC_BYTES, SYNC_MARKER_SIZE};
use crate::error::{AnsonErr, AnsonResult};
use crate::schema::NameTable;
use crate::schema::Schema;
use crate::schema::Variant;
use crate::util::{encode_long, encode_raw_bytes};
use crate::value::Value;
use rand::RngCore;
use std::collections::HashMap;
use std::default::Default;
use std::io::Write;

fn random_sync_marker() -> [u8; SYNC_MARKER_SIZE] {
    let mut marker = [0u8; SYNC_MARKER_SIZE];
    rand::thread_rng().fill_bytes(&mut marker[..]);
    marker
}

/// Convenient builder struct for configuring and instantiating a Writer.
pub struct WriterBuilder<'a, W> {
    metadata: HashMap<String, Value>,
    codec: String,
    registry: CodecRegistry,
    schema: Option<&'a Schema>,
    datafile: Option<W>,
    flush_interval: usize,
    sync_marker: Option<[u8; SYNC_MARKER_SIZE]>,
}

impl<'a, W: Write> WriterBuilder<'a, W> {
    /// Creates a builder instance to construct a Writer.
    pub fn new() -> Self {
        WriterBuilder {
            metadata: Default::default(),
            codec: "null".to_string(),
            registry: CodecRegistry::new(),
            schema: None,
            datafile: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            sync_marker: None,
        }
    }

    /// Set any custom metadata for the datafile.
    pub fn set_metadata(mut self, k: &str, v: &str) -> Self {
        self.metadata
            .insert(k.to_string(), Value::Bytes(v.as_bytes().to_vec()));
        self
    }

    /// Set the compression codec by its `avro.codec` name. Built-ins are
    /// `null`, `deflate` and `bzip2`, plus any feature-gated or registered
    /// codecs.
    pub fn set_codec(mut self, codec: &str) -> Self {
        self.codec = codec.to_string();
        self
    }

    /// Provide the codec registry to resolve the codec name against. Only
    /// needed when writing with a custom codec.
    pub fn set_codec_registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Provide the writer with a reference to the schema.
    pub fn set_schema(mut self, schema: &'a Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the underlying output stream. This can be any type that implements the `Write` trait.
    pub fn set_datafile(mut self, w: W) -> Self {
        self.datafile = Some(w);
        self
    }

    /// Set the 16 byte synchronization marker. A random marker is generated
    /// when none is provided.
    pub fn set_sync_marker(mut self, marker: [u8; SYNC_MARKER_SIZE]) -> Self {
        self.sync_marker = Some(marker);
        self
    }

    /// Set the flush interval (in bytes) for the internal buffer. It's the amount of bytes post which
    /// the internal buffer is written to the underlying datafile or output stream.
    /// Defaults to [`DEFAULT_FLUSH_INTERVAL`](config/constant.DEFAULT_FLUSH_INTERVAL.html).
    pub fn set_flush_interval(mut self, interval: usize) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Builds the `Writer` instance consuming this builder.
    pub fn build(self) -> AnsonResult<Writer<'a, W>> {
        let codec = self.registry.get(&self.codec)?;
        let mut writer = Writer {
            out_stream: self.datafile.ok_or(AnsonErr::WriterBuildFailed)?,
            schema: self.schema.ok_or(AnsonErr::WriterBuildFailed)?,
            block_stream: Vec::with_capacity(self.flush_interval),
            block_count: 0,
            codec,
            sync_marker: self.sync_marker.unwrap_or_else(random_sync_marker),
            flush_interval: self.flush_interval,
        };
        writer.encode_header(self.metadata)?;
        Ok(writer)
    }
}

impl<'a, W: Write> Default for WriterBuilder<'a, W> {
    fn default() -> Self {
        Self::new()
    }
}

/// The Writer is the primary interface for writing values to an avro datafile or a byte container (say a `Vec<u8>`).
/// It takes a reference to the schema for validating the values being written
/// and an output stream `W` which can be any type
/// implementing the [Write](https://doc.rust-lang.org/std/io/trait.Write.html) trait.
pub struct Writer<'a, W> {
    out_stream: W,
    schema: &'a Schema,
    block_stream: Vec<u8>,
    block_count: usize,
    codec: CodecRef,
    sync_marker: [u8; SYNC_MARKER_SIZE],
    flush_interval: usize,
}

impl<'a, W: Write> Writer<'a, W> {
    /// Creates a new avro `Writer` instance taking a reference to a `Schema`
    /// and a type implementing [`Write`](https://doc.rust-lang.org/std/io/trait.Write.html).
    pub fn new(schema: &'a Schema, out_stream: W) -> AnsonResult<Self> {
        Writer::with_codec(schema, out_stream, "null")
    }

    /// Same as the `new` method, but additionally takes the name of a
    /// compression codec. Codecs compress the serialized data blocks in an
    /// avro datafile. Built-in codecs are:
    /// * null (default): no compression is applied.
    /// * [deflate](https://en.wikipedia.org/wiki/DEFLATE): RFC 1951.
    /// * [bzip2](https://en.wikipedia.org/wiki/Bzip2)
    ///
    /// with `snappy`, `zstandard` and `xz` available behind feature flags,
    /// and custom codecs through [`WriterBuilder::set_codec_registry`](struct.WriterBuilder.html#method.set_codec_registry).
    pub fn with_codec(schema: &'a Schema, out_stream: W, codec: &str) -> AnsonResult<Self> {
        WriterBuilder::new()
            .set_schema(schema)
            .set_datafile(out_stream)
            .set_codec(codec)
            .build()
    }

    /// Appends a value to the buffer.
    /// Before a value gets written, it gets validated with the schema referenced
    /// by this writer.
    ///
    /// # Note:
    /// writes are buffered internally as per the flush interval (for performance) and the underlying
    /// buffer may not reflect values immediately.
    /// Call [`flush`](struct.Writer.html#method.flush) to explicitly write all buffered data.
    /// Alternatively calling [`into_inner`](struct.Writer.html#method.into_inner) on the writer
    /// guarantees that flush will happen and will hand over
    /// the underlying buffer with all data written.
    pub fn write<T: Into<Value>>(&mut self, value: T) -> AnsonResult<()> {
        let val: Value = value.into();
        self.schema.validate(&val)?;

        val.encode(
            &mut self.block_stream,
            self.schema.variant(),
            &self.schema.names,
        )?;
        self.block_count += 1;

        if self.block_stream.len() >= self.flush_interval {
            self.flush()?;
        }

        Ok(())
    }

    fn reset_block_buffer(&mut self) {
        self.block_count = 0;
        self.block_stream.clear();
    }

    /// Sync/flush any buffered data to the underlying buffer as one
    /// container file block.
    pub fn flush(&mut self) -> AnsonResult<()> {
        // bail if no data was written or it has already been flushed before
        if self.block_count == 0 {
            return Ok(());
        }
        let compressed = self.codec.compress(&self.block_stream)?;
        // object count
        encode_long(self.block_count as i64, &mut self.out_stream)?;
        // size of the serialized, compressed payload
        encode_long(compressed.len() as i64, &mut self.out_stream)?;
        encode_raw_bytes(&compressed, &mut self.out_stream)?;
        encode_raw_bytes(&self.sync_marker, &mut self.out_stream)?;
        self.out_stream.flush().map_err(AnsonErr::EncodeFailed)?;
        self.reset_block_buffer();
        Ok(())
    }

    fn encode_header(&mut self, mut map: HashMap<String, Value>) -> AnsonResult<()> {
        self.out_stream
            .write_all(MAGIC_BYTES)
            .map_err(AnsonErr::EncodeFailed)?;
        map.insert("avro.schema".to_string(), self.schema.as_bytes().into());
        map.insert(
            "avro.codec".to_string(),
            self.codec.name().as_bytes().into(),
        );
        // the metadata map is itself avro encoded
        let meta_schema = &Variant::Map {
            values: Box::new(Variant::Bytes),
        };

        Value::Map(map).encode(&mut self.out_stream, meta_schema, &NameTable::new())?;
        encode_raw_bytes(&self.sync_marker, &mut self.out_stream)?;
        Ok(())
    }

    /// Consumes self and yields the inner `Write` instance.
    /// Additionally calls `flush` if no flush has happened before this call.
    pub fn into_inner(mut self) -> AnsonResult<W> {
        self.flush()?;
        Ok(self.out_stream)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Reader, Schema, Value, Writer, WriterBuilder};
    use std::io::Cursor;
    use std::str::FromStr;

    #[test]
    fn header_written_on_writer_creation() {
        let schema = Schema::from_str(r##""null""##).unwrap();
        let v = Cursor::new(vec![]);
        let writer = Writer::new(&schema, v).unwrap();
        let buf = writer.into_inner().unwrap().into_inner();
        let slice = &buf[0..4];

        assert_eq!(slice[0], b'O');
        assert_eq!(slice[1], b'b');
        assert_eq!(slice[2], b'j');
        assert_eq!(slice[3], 1);
    }

    #[test]
    fn writer_with_builder() {
        let schema = Schema::from_str(r##""null""##).unwrap();
        let mut writer = WriterBuilder::new()
            .set_codec("null")
            .set_schema(&schema)
            .set_datafile(vec![])
            .set_flush_interval(128_000)
            .build()
            .unwrap();
        writer.write(()).unwrap();
        let buf = writer.into_inner().unwrap();

        let reader = Reader::with_schema(buf.as_slice(), &schema).unwrap();
        for i in reader {
            assert_eq!(i.unwrap(), Value::Null);
        }
    }

    #[test]
    fn custom_metadata_header() {
        let schema = Schema::from_str(r##""null""##).unwrap();
        let mut writer = WriterBuilder::new()
            .set_codec("null")
            .set_schema(&schema)
            .set_datafile(vec![])
            .set_metadata("hello", "world")
            .build()
            .unwrap();
        writer.write(()).unwrap();
        let buf = writer.into_inner().unwrap();

        let reader = Reader::new(buf.as_slice()).unwrap();
        assert!(reader.meta().contains_key("hello"));
    }

    #[test]
    fn explicit_sync_marker_is_used() {
        let schema = Schema::from_str(r##""long""##).unwrap();
        let marker = [7u8; 16];
        let mut writer = WriterBuilder::new()
            .set_schema(&schema)
            .set_datafile(vec![])
            .set_sync_marker(marker)
            .build()
            .unwrap();
        writer.write(1i64).unwrap();
        let buf = writer.into_inner().unwrap();
        assert_eq!(&buf[buf.len() - 16..], &marker);
    }
}
