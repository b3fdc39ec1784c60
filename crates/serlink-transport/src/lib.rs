//! Byte-stream link primitives for serial-attached controllers.
//!
//! Provides the connection surface everything else builds on: a [`Link`]
//! is a duplex byte stream (a tty, a PTY exported by a simulator, or a
//! Unix socket in tests) that can be cloned into independently owned
//! reader/writer halves and asked how many bytes are readable right now.
//!
//! Line configuration (baud rate, raw mode) is out of scope — devices
//! and simulators are expected to present an already-configured stream.

pub mod discovery;
pub mod error;
pub mod link;

pub use discovery::{open_any, open_device, open_simulator, wait_open, DiscoveryConfig};
pub use error::{Result, TransportError};
pub use link::{Link, TtyLink};
