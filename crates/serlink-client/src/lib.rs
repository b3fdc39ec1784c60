//! Liveliness supervision, hang recovery and RPC correlation for serlink
//! devices.
//!
//! The controller enforces a connection-liveliness contract: absent
//! qualifying traffic within a fixed quiet interval it unilaterally
//! closes the connection, and a length-inconsistent frame header can
//! leave its receive state machine stuck until enough well-formed
//! traffic clears it. This crate models both contracts on the client
//! side and layers one-in-flight JSON request/response correlation on
//! top of the frame codec.

pub mod client;
pub mod error;
pub mod json;
pub mod liveliness;
pub mod recovery;
pub mod rpc;

pub use client::DeviceClient;
pub use error::{ClientError, Result};
pub use liveliness::{
    within_tolerance, LivelinessMode, LivelinessWindow, CLOSURE_TOLERANCE, WATCHDOG_PING,
};
pub use recovery::{
    recover_or_reset, HardReset, RecoveryConfig, RecoveryOutcome, RecoveryResolution,
    RecoverySession,
};
pub use rpc::{PendingRequest, Reply, Request};
