//! Wire-level primitives: zig-zag varints and length prefixed byte sequences.

use crate::config::{MAX_INT_VARINT_BYTES, MAX_LONG_VARINT_BYTES};
use crate::error::{AnsonErr, AnsonResult};
use integer_encoding::VarIntWriter;
use std::convert::TryFrom;
use std::io::{ErrorKind, Read, Write};
use std::str;

pub(crate) fn read_byte<R: Read>(reader: &mut R) -> AnsonResult<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).map_err(eof_to_err)?;
    Ok(buf[0])
}

// Read failures at an item boundary are surfaced as UnexpectedEof so callers
// can tell truncation apart from other I/O failures.
pub(crate) fn eof_to_err(e: std::io::Error) -> AnsonErr {
    if e.kind() == ErrorKind::UnexpectedEof {
        AnsonErr::UnexpectedEof
    } else {
        AnsonErr::DecodeFailed(e)
    }
}

// Accumulates little-endian 7-bit groups, starting from an already read
// first byte. Rejects encodings longer than `max_bytes` and values that
// spill past 64 bits.
fn accumulate_varint<R: Read>(first: u8, reader: &mut R, max_bytes: usize) -> AnsonResult<u64> {
    let mut acc = 0u64;
    let mut byte = first;
    for i in 0..max_bytes {
        let group = u64::from(byte & 0x7f);
        let shift = (7 * i) as u32;
        if shift >= 64 || (group << shift) >> shift != group {
            return Err(AnsonErr::IntegerOverflow("long"));
        }
        acc |= group << shift;
        if byte & 0x80 == 0 {
            return Ok(acc);
        }
        byte = read_byte(reader)?;
    }
    Err(AnsonErr::VarintTooLong { limit: max_bytes })
}

#[inline]
fn unzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

pub(crate) fn decode_long<R: Read>(reader: &mut R) -> AnsonResult<i64> {
    let first = read_byte(reader)?;
    let n = accumulate_varint(first, reader, MAX_LONG_VARINT_BYTES)?;
    Ok(unzag(n))
}

pub(crate) fn decode_int<R: Read>(reader: &mut R) -> AnsonResult<i32> {
    let first = read_byte(reader)?;
    let n = accumulate_varint(first, reader, MAX_INT_VARINT_BYTES)?;
    i32::try_from(unzag(n)).map_err(|_| AnsonErr::IntegerOverflow("int"))
}

// Reads a long, signalling a clean end of stream (no bytes at all) as None.
// Container file readers use this to find the end of the last block.
pub(crate) fn decode_long_or_eof<R: Read>(reader: &mut R) -> AnsonResult<Option<i64>> {
    let mut first = [0u8; 1];
    loop {
        match reader.read(&mut first) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(AnsonErr::DecodeFailed(e)),
        }
    }
    let n = accumulate_varint(first[0], reader, MAX_LONG_VARINT_BYTES)?;
    Ok(Some(unzag(n)))
}

// A length prefix must be non-negative.
pub(crate) fn decode_len<R: Read>(reader: &mut R) -> AnsonResult<usize> {
    let len = decode_long(reader)?;
    if len < 0 {
        return Err(AnsonErr::NegativeLength(len));
    }
    Ok(len as usize)
}

pub(crate) fn decode_bytes<R: Read>(reader: &mut R) -> AnsonResult<Vec<u8>> {
    let len = decode_len(reader)?;
    let mut byte_buf = vec![0u8; len];
    reader.read_exact(&mut byte_buf).map_err(eof_to_err)?;
    Ok(byte_buf)
}

pub(crate) fn decode_string<R: Read>(reader: &mut R) -> AnsonResult<String> {
    let buf = decode_bytes(reader)?;
    let s = str::from_utf8(&buf).map_err(|_| AnsonErr::InvalidUtf8)?;
    Ok(s.to_string())
}

pub(crate) fn encode_long<W: Write>(value: i64, writer: &mut W) -> AnsonResult<usize> {
    writer.write_varint(value).map_err(AnsonErr::EncodeFailed)
}

pub(crate) fn encode_int<W: Write>(value: i32, writer: &mut W) -> AnsonResult<usize> {
    writer.write_varint(value).map_err(AnsonErr::EncodeFailed)
}

pub(crate) fn encode_raw_bytes<W: Write>(value: &[u8], writer: &mut W) -> AnsonResult<()> {
    writer.write_all(value).map_err(AnsonErr::EncodeFailed)
}
