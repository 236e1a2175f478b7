use thiserror::Error;

/// Error taxonomy for core operations.
///
/// Validation failures reject the request before any write. Store failures
/// propagate to the caller without internal retries: every write in this
/// core is safe to repeat, so retry policy belongs to the host.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("missing or malformed field: {0}")]
    Validation(&'static str),

    #[error("store unavailable: {0}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for PlatformError {
    fn from(err: anyhow::Error) -> Self {
        PlatformError::Store(err)
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
