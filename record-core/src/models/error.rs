use thiserror::Error;

/// Errors that can occur during recording operations.
///
/// Payloads are plain strings so errors stay `Clone` across the
/// control/worker thread boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("audio device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("audio device in use: {0}")]
    DeviceInUse(String),

    #[error("audio format not supported: {0}")]
    FormatUnsupported(String),

    #[error("audio endpoint creation failed: {0}")]
    EndpointCreateFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

impl RecordError {
    /// Storage error from an I/O failure.
    pub fn storage(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
