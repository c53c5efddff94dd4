//! CRC32 (IEEE) checksums over commit log frames

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the concatenation of `parts`.
pub fn compute_checksum(parts: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}
