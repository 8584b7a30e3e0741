//! Error types for the recognition core.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// The closed set of error kinds the core can return to a caller.
///
/// Anything not representable here is a programming bug and panics instead
/// of being wrapped — see the propagation rules in the crate's spec.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("fingerprint index write failed: {0}")]
    IndexWrite(String),

    #[error("fingerprint index read failed: {0}")]
    IndexRead(String),

    #[error("operation exceeded its wall-clock budget of {0:?}")]
    Timeout(std::time::Duration),

    #[error("song {0} is already ingested")]
    DuplicateSong(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
