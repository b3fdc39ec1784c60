//! The peer-enforced idle-timeout contract, modeled as a value.
//!
//! The device owns the actual deadline; the client can neither read nor
//! enforce it. What it can do is classify each outbound write as
//! qualifying or not, predict when the peer will close, and measure the
//! real interval when closure is observed as end-of-stream. The window
//! is therefore a pure value recomputed from observed events, never
//! shared mutable state — and because the deadline lives on the peer, a
//! window value stays meaningful across a local close/reopen.

use std::time::{Duration, Instant};

use bytes::BytesMut;
use serlink_frame::codec::{decode_frame, MAX_PAYLOAD};

/// The literal the watchdog variant recognizes as a qualifying event.
pub const WATCHDOG_PING: &[u8] = b"PING_WATCHDOG\r\n";

/// Tolerance when comparing a measured interval against a predicted one.
/// Clock and scheduling jitter on the device make it this fuzzy.
pub const CLOSURE_TOLERANCE: Duration = Duration::from_millis(500);

/// Which liveliness contract the connected firmware enforces.
///
/// A property of the device being driven, selected by configuration —
/// it cannot be auto-detected over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivelinessMode {
    /// 5 s quiet interval, reset only by the exact ping literal.
    Watchdog,
    /// 3 s quiet interval, reset by any well-formed frame.
    Keepalive,
}

impl LivelinessMode {
    /// The quiet interval this variant enforces.
    pub fn interval(self) -> Duration {
        match self {
            LivelinessMode::Watchdog => Duration::from_secs(5),
            LivelinessMode::Keepalive => Duration::from_secs(3),
        }
    }
}

/// The peer's promise: absent a qualifying event within `interval` of
/// `last_reset`, it closes the connection at `last_reset + interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivelinessWindow {
    mode: LivelinessMode,
    interval: Duration,
    last_reset: Instant,
}

impl LivelinessWindow {
    /// Open a window for `mode` starting now.
    pub fn new(mode: LivelinessMode) -> Self {
        Self::starting_at(mode, Instant::now())
    }

    /// Open a window for `mode` with an explicit start instant.
    pub fn starting_at(mode: LivelinessMode, now: Instant) -> Self {
        Self {
            mode,
            interval: mode.interval(),
            last_reset: now,
        }
    }

    /// Override the quiet interval. Scaled-down intervals keep the
    /// timing tests and the in-process emulator sub-second.
    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// The variant this window models.
    pub fn mode(&self) -> LivelinessMode {
        self.mode
    }

    /// The quiet interval in force.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the window last reset.
    pub fn last_reset(&self) -> Instant {
        self.last_reset
    }

    /// The predicted instant of peer-initiated closure.
    pub fn deadline(&self) -> Instant {
        self.last_reset + self.interval
    }

    /// Time left before the predicted closure, zero if already past.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }

    /// Elapsed real time since the last qualifying event.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_reset)
    }

    /// Would the device count these outbound bytes as a qualifying event?
    ///
    /// Watchdog: the exact ping literal. Keepalive: exactly one frame the
    /// device would decode without protocol error.
    pub fn qualifies(&self, bytes: &[u8]) -> bool {
        match self.mode {
            LivelinessMode::Watchdog => bytes == WATCHDOG_PING,
            LivelinessMode::Keepalive => is_one_well_formed_frame(bytes),
        }
    }

    /// Account for an outbound write, returning the window that now
    /// governs: reset if the bytes qualify, unchanged otherwise.
    #[must_use]
    pub fn observe_write(&self, bytes: &[u8], now: Instant) -> Self {
        if self.qualifies(bytes) {
            tracing::debug!(mode = ?self.mode, "qualifying write, window reset");
            self.reset(now)
        } else {
            *self
        }
    }

    /// The window after a known-qualifying event at `now`.
    #[must_use]
    pub fn reset(&self, now: Instant) -> Self {
        Self {
            last_reset: now,
            ..*self
        }
    }
}

/// Predicate for the keepalive variant: the bytes must decode as one
/// complete, valid frame with nothing left over.
fn is_one_well_formed_frame(bytes: &[u8]) -> bool {
    let mut buf = BytesMut::from(bytes);
    match decode_frame(&mut buf, MAX_PAYLOAD) {
        Ok(Some(_)) => buf.is_empty(),
        Ok(None) | Err(_) => false,
    }
}

/// Whether a measured closure interval matches a predicted one within
/// [`CLOSURE_TOLERANCE`].
pub fn within_tolerance(measured: Duration, expected: Duration) -> bool {
    let delta = if measured > expected {
        measured - expected
    } else {
        expected - measured
    };
    delta <= CLOSURE_TOLERANCE
}
