//! Escaping a stuck device receive state machine.
//!
//! A frame header declaring a payload length the device can never
//! receive leaves its parser waiting for bytes that will not arrive;
//! until that debt is paid the device ignores well-formed frames. The
//! recovery protocol pays it down: transmit complete frames (content is
//! irrelevant, only the bytes count) and after each one check whether
//! the device has produced any output. The loop is bounded — exceeding
//! the ceiling reports failure for the caller to escalate, it never
//! spins forever.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serlink_frame::{encode_frame, Result as FrameResult};
use serlink_transport::Link;

use crate::error::{ClientError, Result};

/// Hang-recovery tuning.
///
/// The exact byte count needed to un-stick a given firmware is
/// hardware-dependent and fuzzy, so both the ceiling and the probe are
/// configuration rather than constants.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum probe attempts before reporting failure.
    pub attempt_ceiling: u32,
    /// Payload of the probe frame. Content is irrelevant to the device.
    pub probe_payload: Bytes,
    /// Pause between writing a probe and polling for output, giving the
    /// device time to respond.
    pub poll_delay: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            attempt_ceiling: 16,
            probe_payload: Bytes::from_static(b"{\"id\":0,\"method\":\"probe\"}"),
            poll_delay: Duration::from_millis(50),
        }
    }
}

/// Outcome of one [`RecoverySession::run`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The device produced output; it is unstuck.
    Recovered,
    /// The write or availability probe failed: the peer also tore down
    /// the connection. Reopen and call `run` again on this session —
    /// the attempt counter carries across.
    LinkDown,
}

/// One bounded attempt to un-stick the device.
///
/// Ephemeral: created when a hang is suspected, discarded once recovery
/// succeeds, the ceiling is exceeded, or the caller escalates.
#[derive(Debug)]
pub struct RecoverySession {
    config: RecoveryConfig,
    attempts: u32,
    bytes_sent: usize,
    recovered: bool,
}

impl RecoverySession {
    /// Start a session with default tuning.
    pub fn new() -> Self {
        Self::with_config(RecoveryConfig::default())
    }

    /// Start a session with explicit tuning.
    pub fn with_config(config: RecoveryConfig) -> Self {
        Self {
            config,
            attempts: 0,
            bytes_sent: 0,
            recovered: false,
        }
    }

    /// Probe attempts made so far, across reconnects.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Probe bytes written so far, across reconnects.
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Whether a run has already observed device output.
    pub fn recovered(&self) -> bool {
        self.recovered
    }

    /// Drive probe attempts against `link` until the device shows
    /// output, the link dies, or the ceiling is reached.
    ///
    /// Attempts are counted across calls: a reconnect mid-recovery does
    /// not restart the budget, so a flapping link cannot mask true
    /// non-recovery.
    pub fn run<L: Link>(&mut self, link: &mut L) -> Result<RecoveryOutcome> {
        let probe = self.encode_probe().map_err(ClientError::Frame)?;

        while self.attempts < self.config.attempt_ceiling {
            self.attempts += 1;

            if let Err(err) = write_all(link, &probe) {
                tracing::debug!(attempt = self.attempts, %err, "probe write failed, link down");
                return Ok(RecoveryOutcome::LinkDown);
            }
            self.bytes_sent += probe.len();

            std::thread::sleep(self.config.poll_delay);

            match link.unread_bytes() {
                Ok(0) => {
                    tracing::trace!(attempt = self.attempts, "no device output yet");
                }
                Ok(n) => {
                    tracing::debug!(attempt = self.attempts, unread = n, "device unstuck");
                    self.recovered = true;
                    return Ok(RecoveryOutcome::Recovered);
                }
                Err(err) => {
                    tracing::debug!(
                        attempt = self.attempts,
                        %err,
                        "availability probe failed, link down"
                    );
                    return Ok(RecoveryOutcome::LinkDown);
                }
            }
        }

        Err(ClientError::HangUnrecovered {
            attempts: self.attempts,
        })
    }

    fn encode_probe(&self) -> FrameResult<Vec<u8>> {
        let mut buf = BytesMut::new();
        encode_frame(&self.config.probe_payload, &mut buf)?;
        Ok(buf.to_vec())
    }
}

impl Default for RecoverySession {
    fn default() -> Self {
        Self::new()
    }
}

fn write_all<L: Link>(link: &mut L, bytes: &[u8]) -> std::io::Result<()> {
    link.write_all(bytes)?;
    link.flush()
}

/// The out-of-band power-cycle collaborator. Invoked as an opaque
/// external action with a boolean success result.
pub trait HardReset {
    fn reset(&mut self) -> bool;
}

/// How an escalated recovery ended.
#[derive(Debug)]
pub enum RecoveryResolution<L> {
    /// The device recovered over `link`.
    Recovered(L),
    /// The attempt ceiling was exhausted and the hard reset was
    /// invoked; `success` is its reported result.
    HardReset { success: bool },
}

/// Full escalation policy in one place: run recovery, reopening the
/// link whenever the peer tears it down, and fall back to the hard
/// reset once the session's attempt budget is spent.
pub fn recover_or_reset<L, F, R>(
    mut session: RecoverySession,
    mut link: L,
    mut reopen: F,
    resetter: &mut R,
) -> Result<RecoveryResolution<L>>
where
    L: Link,
    F: FnMut() -> serlink_transport::Result<L>,
    R: HardReset,
{
    loop {
        match session.run(&mut link) {
            Ok(RecoveryOutcome::Recovered) => return Ok(RecoveryResolution::Recovered(link)),
            Ok(RecoveryOutcome::LinkDown) => {
                link = reopen()?;
            }
            Err(ClientError::HangUnrecovered { attempts }) => {
                tracing::warn!(attempts, "recovery exhausted, escalating to hard reset");
                let success = resetter.reset();
                return Ok(RecoveryResolution::HardReset { success });
            }
            Err(other) => return Err(other),
        }
    }
}
