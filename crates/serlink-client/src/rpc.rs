//! JSON request/response payloads and identifier correlation.
//!
//! One request in flight per connection: a single frame is written,
//! then exactly one frame is read and treated as the reply. Whatever
//! `id` the device actually echoes is surfaced to the caller — the
//! device is not trusted to guarantee ordering across arbitrary
//! identifiers.

use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A JSON request carrying a numeric identifier and a method name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: i64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Build a request with no parameters.
    pub fn new(id: i64, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            params: None,
        }
    }

    /// Attach parameters.
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Serialize to the JSON payload bytes that go on the wire.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// The single request in flight on a connection, recorded at the
/// moment it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    id: i64,
    sent_at: Instant,
}

impl PendingRequest {
    /// Record a request as sent at `sent_at`.
    pub fn new(id: i64, sent_at: Instant) -> Self {
        Self { id, sent_at }
    }

    /// The identifier the reply must echo.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// The instant the request frame was written.
    pub fn sent_at(&self) -> Instant {
        self.sent_at
    }

    /// Time this request has been waiting for its reply, as of `now`.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.sent_at)
    }
}

/// A framed reply, with whatever identifier the device echoed.
#[derive(Debug, Clone)]
pub struct Reply {
    /// The `id` field of the reply JSON, if present and numeric.
    pub id: Option<i64>,
    /// The complete reply payload, owned.
    pub payload: Bytes,
    /// Time between writing the request and this reply arriving.
    pub round_trip: Duration,
}

impl Reply {
    /// Parse the payload as a JSON value.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }
}

/// Pull the numeric `id` out of a reply payload, if there is one.
///
/// Non-JSON payloads, non-object roots, missing fields and non-integer
/// ids all surface as `None` — the correlation check reports them as a
/// mismatch rather than failing the decode.
pub fn extract_id(payload: &[u8]) -> Option<i64> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    value.get("id")?.as_i64()
}
