/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the device's receive capacity.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame does not open with the `0xFF 0xAA` marker pair.
    #[error("invalid frame header (expected 0xFF 0xAA, found {found:02X?})")]
    InvalidHeader { found: [u8; 2] },

    /// The frame does not close with the `0xFE` terminator.
    #[error("invalid frame trailer (expected 0xFE, found 0x{found:02X})")]
    InvalidTrailer { found: u8 },

    /// The checksum recomputed over the payload disagrees with the wire.
    #[error("checksum mismatch (frame 0x{expected:04X}, computed 0x{actual:04X})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection. During decode this is how the
    /// liveliness timeout is observed, not a transport fault.
    #[error("connection closed by peer")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
