use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::{FrameError, Result};

/// Marker pair opening every frame.
pub const MARKER: [u8; 2] = [0xFF, 0xAA];

/// Terminator byte closing every frame.
pub const TERMINATOR: u8 = 0xFE;

/// Frame header: marker (2) + length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Frame trailer: checksum (2) + terminator (1) = 3 bytes.
pub const TRAILER_SIZE: usize = 3;

/// Total framing overhead per payload.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + TRAILER_SIZE;

/// Maximum payload size: the device's 1024-byte receive buffer minus
/// framing overhead.
pub const MAX_PAYLOAD: usize = 1024 - FRAME_OVERHEAD;

/// One checksummed unit of the wire protocol.
///
/// Immutable once constructed: produced by encoding a payload or by
/// decoding a wire buffer, discarded after being written or after its
/// payload is consumed.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The frame payload (opaque; JSON text in practice).
    pub payload: Bytes,
    /// CRC-16/MCRF4XX over the payload bytes alone.
    pub checksum: u16,
}

impl Frame {
    /// Build a frame for a payload, computing its checksum.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = crc16(&payload);
        Self { payload, checksum }
    }

    /// The total wire size of this frame (header + payload + trailer).
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬───────────┬────────────────┬───────────┬──────┐
/// │ Marker (2B)│ Length    │ Payload        │ CRC       │ End  │
/// │ 0xFF 0xAA  │ (2B LE)   │ (Length bytes) │ (2B LE)   │ 0xFE │
/// └────────────┴───────────┴────────────────┴───────────┴──────┘
/// ```
/// The checksum covers the payload only, never header or terminator.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.put_slice(&MARKER);
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    dst.put_u16_le(crc16(payload));
    dst.put_u8(TERMINATOR);
    Ok(())
}

/// A bare frame header declaring `claimed_len` payload bytes, with no
/// payload following. Feeding the device one of these with a length it
/// cannot satisfy stalls its receive state machine — this is the probe
/// used to deliberately induce a hang under test.
pub fn bare_header(claimed_len: u16) -> [u8; 4] {
    let len = claimed_len.to_le_bytes();
    [MARKER[0], MARKER[1], len[0], len[1]]
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer; the returned
/// payload is an owned buffer independent of `src`. After an error the
/// buffer state is unspecified — callers close and reopen rather than
/// scanning for the next marker.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    if src[0..2] != MARKER {
        return Err(FrameError::InvalidHeader {
            found: [src[0], src[1]],
        });
    }

    let payload_len = u16::from_le_bytes([src[2], src[3]]) as usize;

    // A declared length above the cap can never complete; waiting for it
    // is exactly the stall the hang-recovery protocol exists to escape.
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len + TRAILER_SIZE;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let terminator = src[total - 1];
    if terminator != TERMINATOR {
        return Err(FrameError::InvalidTrailer { found: terminator });
    }

    let crc_at = HEADER_SIZE + payload_len;
    let wire_crc = u16::from_le_bytes([src[crc_at], src[crc_at + 1]]);
    let computed = crc16(&src[HEADER_SIZE..crc_at]);
    if wire_crc != computed {
        return Err(FrameError::ChecksumMismatch {
            expected: wire_crc,
            actual: computed,
        });
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(TRAILER_SIZE);

    Ok(Some(Frame {
        payload,
        checksum: wire_crc,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: [`MAX_PAYLOAD`].
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
        }
    }
}
