//! Constants and configuration parameters for avro readers and writers.

/// Synchronization marker length in bytes.
pub const SYNC_MARKER_SIZE: usize = 16;
/// The magic bytes identifying an avro object container file.
pub const MAGIC_BYTES: &[u8] = b"Obj\x01";
/// The two byte marker prefixing a single-object encoded datum.
pub const SINGLE_OBJECT_MARKER: [u8; 2] = [0xC3, 0x01];
/// Checksum length appended to snappy compressed blocks.
#[cfg(feature = "snappy")]
pub const CRC_CHECKSUM_LEN: usize = 4;
/// Longest legal varint encoding of a 32-bit integer.
pub(crate) const MAX_INT_VARINT_BYTES: usize = 5;
/// Longest legal varint encoding of a 64-bit integer.
pub(crate) const MAX_LONG_VARINT_BYTES: usize = 10;
/// Minimum buffering granularity for container file blocks.
pub const BLOCK_SIZE: usize = 4096;
/// Threshold in bytes past which the writer's scratch buffer is
/// flushed to the underlying stream as a container file block.
/// Suggested values are between 2K and 2M.
pub const DEFAULT_FLUSH_INTERVAL: usize = 16 * BLOCK_SIZE;
