//! Commit log frame codec
//!
//! Frame layout:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, total including this field and checksum)
//! +------------------+
//! | Sequence         | (u64 LE)
//! +------------------+
//! | Batch Payload    | (JSON-encoded mutation list)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over length + sequence + payload)
//! +------------------+
//! ```
//!
//! Decoding distinguishes two failure kinds through `io::ErrorKind`:
//! `UnexpectedEof` means the frame is incomplete (a torn write), anything
//! `InvalidData` means a complete frame failed verification. A declared
//! length above `MAX_FRAME_LEN` is never a torn write.

use std::io;

use super::batch::{Batch, Mutation};
use super::checksum::compute_checksum;
use super::errors::{StorageError, StorageResult};

/// Length prefix + sequence + checksum
pub const FRAME_OVERHEAD: usize = 4 + 8 + 4;

/// Largest frame a writer produces or a reader accepts
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Encodes a batch into a self-verifying frame.
pub fn encode(batch: &Batch) -> StorageResult<Vec<u8>> {
    let payload = serde_json::to_vec(&batch.mutations).map_err(|e| {
        StorageError::write_failed_no_source(format!(
            "Failed to encode batch {}: {}",
            batch.sequence, e
        ))
    })?;

    let frame_length = FRAME_OVERHEAD + payload.len();
    if frame_length > MAX_FRAME_LEN {
        return Err(StorageError::write_failed_no_source(format!(
            "Batch {} too large for one frame: {} bytes",
            batch.sequence, frame_length
        )));
    }

    let len_bytes = (frame_length as u32).to_le_bytes();
    let seq_bytes = batch.sequence.to_le_bytes();
    let checksum = compute_checksum(&[&len_bytes, &seq_bytes, &payload]);

    let mut frame = Vec::with_capacity(frame_length);
    frame.extend_from_slice(&len_bytes);
    frame.extend_from_slice(&seq_bytes);
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&checksum.to_le_bytes());
    Ok(frame)
}

/// Decodes one frame from the start of `data`.
///
/// Returns the batch and the number of bytes consumed.
pub fn decode(data: &[u8]) -> io::Result<(Batch, usize)> {
    if data.len() < 4 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("Frame header truncated: {} bytes", data.len()),
        ));
    }

    let frame_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

    if !(FRAME_OVERHEAD..=MAX_FRAME_LEN).contains(&frame_length) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid frame length: {}", frame_length),
        ));
    }

    if data.len() < frame_length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "Frame truncated: expected {} bytes, got {}",
                frame_length,
                data.len()
            ),
        ));
    }

    let checksum_offset = frame_length - 4;
    let stored_checksum = u32::from_le_bytes([
        data[checksum_offset],
        data[checksum_offset + 1],
        data[checksum_offset + 2],
        data[checksum_offset + 3],
    ]);
    let computed_checksum = compute_checksum(&[&data[0..checksum_offset]]);

    if computed_checksum != stored_checksum {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Checksum mismatch: computed {:08x}, stored {:08x}",
                computed_checksum, stored_checksum
            ),
        ));
    }

    let mut seq_bytes = [0u8; 8];
    seq_bytes.copy_from_slice(&data[4..12]);
    let sequence = u64::from_le_bytes(seq_bytes);

    let mutations: Vec<Mutation> =
        serde_json::from_slice(&data[12..checksum_offset]).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Undecodable batch {}: {}", sequence, e),
            )
        })?;

    Ok((Batch::new(sequence, mutations), frame_length))
}

/// Offset of the first complete, checksum-valid frame in `data`.
pub fn find_frame(data: &[u8]) -> Option<usize> {
    let last_start = data.len().saturating_sub(FRAME_OVERHEAD - 1);
    (0..last_start).find(|&start| decode(&data[start..]).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_batch() -> Batch {
        let record = json!({"id": "c1", "name": "Access review"})
            .as_object()
            .cloned()
            .unwrap();
        Batch::new(
            3,
            vec![Mutation::put("controls", record), Mutation::clear("risks")],
        )
    }

    #[test]
    fn test_frame_roundtrip() {
        let batch = sample_batch();
        let frame = encode(&batch).unwrap();
        let (decoded, consumed) = decode(&frame).unwrap();
        assert_eq!(decoded, batch);
        assert_eq!(consumed, frame.len());
    }

    #[test]
    fn test_decode_consumes_only_first_frame() {
        let mut data = encode(&sample_batch()).unwrap();
        let first_len = data.len();
        data.extend(encode(&Batch::new(4, vec![])).unwrap());

        let (_, consumed) = decode(&data).unwrap();
        assert_eq!(consumed, first_len);
        let (second, _) = decode(&data[consumed..]).unwrap();
        assert_eq!(second.sequence, 4);
    }

    #[test]
    fn test_truncated_frame_is_eof() {
        let frame = encode(&sample_batch()).unwrap();
        for cut in [1, 3, 10, frame.len() - 1] {
            let err = decode(&frame[..cut]).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof, "cut at {}", cut);
        }
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut frame = encode(&sample_batch()).unwrap();
        let mid = frame.len() / 2;
        frame[mid] ^= 0xFF;

        let err = decode(&frame).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_bogus_length_is_invalid() {
        let data = [2u8, 0, 0, 0, 0, 0, 0, 0];
        let err = decode(&data).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_oversized_length_is_invalid() {
        let mut frame = encode(&sample_batch()).unwrap();
        frame[3] = 0x7F;

        let err = decode(&frame).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_find_frame() {
        let frame = encode(&sample_batch()).unwrap();
        let mut data = vec![0x40, 0x00, 0x00];
        data.extend_from_slice(&frame);

        assert_eq!(find_frame(&data), Some(3));
        assert_eq!(find_frame(&data[4..]), None);
        assert_eq!(find_frame(&frame[..frame.len() - 1]), None);
        assert_eq!(find_frame(&[]), None);
    }

    #[test]
    fn test_deterministic_encoding() {
        let batch = sample_batch();
        assert_eq!(encode(&batch).unwrap(), encode(&batch).unwrap());
    }
}
