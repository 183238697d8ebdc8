//! Fingerprint algorithms over a schema's parsing canonical form.

use once_cell::sync::Lazy;

// CRC-64-AVRO empty state, as defined by the avro specification.
const EMPTY: u64 = 0xc15d_213a_a4d7_a795;

static FP_TABLE: Lazy<[u64; 256]> = Lazy::new(|| {
    let mut fp_table = [0u64; 256];
    for (i, entry) in fp_table.iter_mut().enumerate() {
        let mut fp = i as u64;
        for _ in 0..8 {
            fp = (fp >> 1) ^ (EMPTY & (fp & 1).wrapping_neg());
        }
        *entry = fp;
    }
    fp_table
});

// CRC-64-AVRO (rabin) fingerprint: bytes folded LSB-first.
pub(crate) fn rabin64(buf: &[u8]) -> u64 {
    let mut fp = EMPTY;
    for b in buf {
        fp = (fp >> 8) ^ FP_TABLE[((fp ^ u64::from(*b)) & 0xff) as usize];
    }
    fp
}

pub(crate) fn md5(buf: &[u8]) -> [u8; 16] {
    mdfive::compute(buf).0
}

#[cfg(feature = "sha2")]
pub(crate) fn sha256(buf: &[u8]) -> Vec<u8> {
    use shatwo::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(buf);
    hasher.finalize().to_vec()
}
