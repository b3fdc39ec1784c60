/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] serlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] serlink_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The reply's `id` does not echo the request's.
    #[error("correlation mismatch (sent id {expected}, device echoed {actual:?})")]
    CorrelationMismatch {
        expected: i64,
        actual: Option<i64>,
    },

    /// Recovery traffic did not un-stick the device within the attempt
    /// ceiling. Escalation (reconnect, hard reset) is caller policy.
    #[error("device hang not recovered after {attempts} attempts")]
    HangUnrecovered { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, ClientError>;
