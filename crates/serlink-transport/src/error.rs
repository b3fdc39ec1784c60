use std::path::PathBuf;

/// Errors that can occur while opening or probing a link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device node at `path`.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Neither the simulator nor the physical device is present.
    #[error("no device available (tried {simulator}, {device})")]
    NotAvailable {
        simulator: PathBuf,
        device: PathBuf,
    },

    /// The runtime directory needed to locate the simulator is not set.
    #[error("XDG_RUNTIME_DIR is not set; cannot locate simulator")]
    NoRuntimeDir,

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
