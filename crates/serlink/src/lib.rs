//! Client protocol stack for serial-attached peripheral controllers.
//!
//! serlink speaks a length-prefixed, CRC-16-checksummed binary frame
//! format carrying JSON request/response payloads over a duplex serial
//! byte stream, and models the device's two awkward habits: unilateral
//! connection closure after a quiet interval, and a receive-state hang
//! induced by length-inconsistent frame headers.
//!
//! # Crate Structure
//!
//! - [`transport`] — Byte-stream links (tty/PTY, discovery, unread-byte probe)
//! - [`frame`] — Wire framing and the CRC-16/MCRF4XX checksum
//! - [`client`] — Liveliness supervision, hang recovery, RPC correlation

/// Re-export transport types.
pub mod transport {
    pub use serlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serlink_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use serlink_client::*;
}
