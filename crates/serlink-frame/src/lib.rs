//! Checksummed wire framing for the serlink controller protocol.
//!
//! Every payload crossing the serial link is framed as:
//! - A 2-byte marker pair (`0xFF 0xAA`) opening the frame
//! - A 2-byte little-endian payload length
//! - The payload bytes (JSON text in practice, opaque here)
//! - A 2-byte little-endian CRC-16/MCRF4XX over the payload alone
//! - A terminator byte (`0xFE`)
//!
//! The device's receive buffer caps frames at 1024 bytes on the wire, so
//! payloads top out at 1017 bytes. Framing errors are surfaced, never
//! resynchronized — a desynchronized stream means close and reopen.

pub mod codec;
pub mod crc;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    bare_header, decode_frame, encode_frame, Frame, FrameConfig, FRAME_OVERHEAD, HEADER_SIZE,
    MARKER, MAX_PAYLOAD, TERMINATOR, TRAILER_SIZE,
};
pub use crc::crc16;
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
