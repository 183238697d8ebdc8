//! Per-block compression codecs for object container files, exposed as a
//! registry keyed by the `avro.codec` metadata string so that additional
//! codecs can be plugged in without touching the block framing code.

use crate::error::{AnsonErr, AnsonResult};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

/// A per-block compression codec, named after its `avro.codec` metadata
/// value.
pub trait BlockCodec {
    /// The `avro.codec` metadata value identifying this codec.
    fn name(&self) -> &'static str;
    /// Compresses one serialized block.
    fn compress(&self, block: &[u8]) -> AnsonResult<Vec<u8>>;
    /// Decompresses one block payload into `out`. `out` arrives empty.
    fn decompress(&self, block: &[u8], out: &mut Vec<u8>) -> AnsonResult<()>;
}

/// A shareable handle to a codec implementation.
pub type CodecRef = Arc<dyn BlockCodec + Send + Sync>;

/// Codec lookup table used when reading and writing container files.
/// `null`, `deflate` and `bzip2` are always present; `snappy`, `zstd` and
/// `xz` join them when the corresponding cargo feature is enabled, and
/// custom codecs can be registered under their metadata name.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, CodecRef>,
}

impl CodecRegistry {
    /// Creates a registry holding the built-in codecs.
    pub fn new() -> Self {
        let mut registry = CodecRegistry {
            codecs: HashMap::new(),
        };
        registry.register(Arc::new(NullCodec));
        registry.register(Arc::new(DeflateCodec));
        registry.register(Arc::new(Bzip2Codec));
        #[cfg(feature = "snappy")]
        registry.register(Arc::new(SnappyCodec));
        #[cfg(feature = "zstd")]
        registry.register(Arc::new(ZstdCodec));
        #[cfg(feature = "xz")]
        registry.register(Arc::new(XzCodec));
        registry
    }

    /// Adds a codec under its `avro.codec` name, replacing any codec
    /// previously registered under that name.
    pub fn register(&mut self, codec: CodecRef) {
        self.codecs.insert(codec.name().to_string(), codec);
    }

    /// Looks up a codec by its `avro.codec` name.
    pub fn get(&self, name: &str) -> AnsonResult<CodecRef> {
        self.codecs
            .get(name)
            .cloned()
            .ok_or_else(|| AnsonErr::UnsupportedCodec(name.to_string()))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The null codec: blocks are stored as-is. The default when no codec is
/// specified at Writer creation.
pub struct NullCodec;

impl BlockCodec for NullCodec {
    fn name(&self) -> &'static str {
        "null"
    }

    fn compress(&self, block: &[u8]) -> AnsonResult<Vec<u8>> {
        Ok(block.to_vec())
    }

    fn decompress(&self, block: &[u8], out: &mut Vec<u8>) -> AnsonResult<()> {
        out.extend_from_slice(block);
        Ok(())
    }
}

/// The deflate codec (RFC 1951, no zlib header). <br>Uses https://docs.rs/flate2
/// as the underlying implementation.
pub struct DeflateCodec;

impl BlockCodec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, block: &[u8]) -> AnsonResult<Vec<u8>> {
        use flate2::write::DeflateEncoder;
        use flate2::Compression;

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(block).map_err(AnsonErr::EncodeFailed)?;
        encoder.finish().map_err(AnsonErr::EncodeFailed)
    }

    fn decompress(&self, block: &[u8], out: &mut Vec<u8>) -> AnsonResult<()> {
        use flate2::bufread::DeflateDecoder;

        let mut decoder = DeflateDecoder::new(block);
        decoder.read_to_end(out).map_err(AnsonErr::DecodeFailed)?;
        Ok(())
    }
}

/// The bzip2 codec. <br>Uses https://docs.rs/bzip2 as the underlying
/// implementation.
pub struct Bzip2Codec;

impl BlockCodec for Bzip2Codec {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn compress(&self, block: &[u8]) -> AnsonResult<Vec<u8>> {
        use bzip2::write::BzEncoder;
        use bzip2::Compression;

        let mut encoder = BzEncoder::new(Vec::new(), Compression::new(6));
        encoder.write_all(block).map_err(AnsonErr::EncodeFailed)?;
        encoder.finish().map_err(AnsonErr::EncodeFailed)
    }

    fn decompress(&self, block: &[u8], out: &mut Vec<u8>) -> AnsonResult<()> {
        use bzip2::read::BzDecoder;

        let mut decoder = BzDecoder::new(block);
        decoder.read_to_end(out).map_err(AnsonErr::DecodeFailed)?;
        Ok(())
    }
}

/// The snappy codec, with the 4 byte big-endian CRC32 of the uncompressed
/// block appended as the avro spec requires. <br>Uses https://docs.rs/snap
/// as the underlying implementation.
#[cfg(feature = "snappy")]
pub struct SnappyCodec;

#[cfg(feature = "snappy")]
impl BlockCodec for SnappyCodec {
    fn name(&self) -> &'static str {
        "snappy"
    }

    fn compress(&self, block: &[u8]) -> AnsonResult<Vec<u8>> {
        use crate::error::io_err;

        let mut compressed = snap::Encoder::new()
            .compress_vec(block)
            .map_err(|e| AnsonErr::EncodeFailed(io_err(&e.to_string())))?;
        let checksum = crc::crc32::checksum_ieee(block);
        compressed.extend_from_slice(&checksum.to_be_bytes());
        Ok(compressed)
    }

    fn decompress(&self, block: &[u8], out: &mut Vec<u8>) -> AnsonResult<()> {
        use crate::config::CRC_CHECKSUM_LEN;
        use crate::error::io_err;

        if block.len() < CRC_CHECKSUM_LEN {
            return Err(AnsonErr::DecodeFailed(io_err(
                "snappy block too short for trailing checksum",
            )));
        }
        let (data, checksum) = block.split_at(block.len() - CRC_CHECKSUM_LEN);
        let len =
            snap::decompress_len(data).map_err(|e| AnsonErr::DecodeFailed(io_err(&e.to_string())))?;
        out.resize(len, 0);
        snap::Decoder::new()
            .decompress(data, &mut out[..])
            .map_err(|e| AnsonErr::DecodeFailed(io_err(&e.to_string())))?;

        let mut expected = [0u8; CRC_CHECKSUM_LEN];
        expected.copy_from_slice(checksum);
        let expected = u32::from_be_bytes(expected);
        let found = crc::crc32::checksum_ieee(out);
        if expected != found {
            return Err(AnsonErr::DecodeFailed(io_err(&format!(
                "snappy checksum mismatch: expected {:#010x}, found {:#010x}",
                expected, found
            ))));
        }
        Ok(())
    }
}

/// The zstd codec. <br>Uses https://docs.rs/zstd as the underlying
/// implementation.
#[cfg(feature = "zstd")]
pub struct ZstdCodec;

#[cfg(feature = "zstd")]
impl BlockCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstandard"
    }

    fn compress(&self, block: &[u8]) -> AnsonResult<Vec<u8>> {
        zstdd::encode_all(std::io::Cursor::new(block), 0).map_err(AnsonErr::EncodeFailed)
    }

    fn decompress(&self, block: &[u8], out: &mut Vec<u8>) -> AnsonResult<()> {
        let decompressed =
            zstdd::decode_all(std::io::Cursor::new(block)).map_err(AnsonErr::DecodeFailed)?;
        out.extend_from_slice(&decompressed);
        Ok(())
    }
}

/// The xz codec. <br>Uses https://docs.rs/xz2 as the underlying
/// implementation.
#[cfg(feature = "xz")]
pub struct XzCodec;

#[cfg(feature = "xz")]
impl BlockCodec for XzCodec {
    fn name(&self) -> &'static str {
        "xz"
    }

    fn compress(&self, block: &[u8]) -> AnsonResult<Vec<u8>> {
        use xz2::write::XzEncoder;

        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(block).map_err(AnsonErr::EncodeFailed)?;
        encoder.finish().map_err(AnsonErr::EncodeFailed)
    }

    fn decompress(&self, block: &[u8], out: &mut Vec<u8>) -> AnsonResult<()> {
        use xz2::read::XzDecoder;

        let mut decoder = XzDecoder::new(block);
        decoder.read_to_end(out).map_err(AnsonErr::DecodeFailed)?;
        Ok(())
    }
}
