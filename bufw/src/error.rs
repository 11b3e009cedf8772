//! Error types for bufw.

use std::time::Duration;

use crate::duration::format_duration;

/// Result type alias for bufw.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bufw operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No write arrived before the wait deadline.
    #[error("timeout after {}", display_duration(.0))]
    Timeout(Duration),

    /// Wait called on a buffer built without synchronization.
    #[error("wait called on unsynchronized buffer")]
    UnsynchronizedWait,

    /// Malformed duration text.
    #[error("invalid duration: {0}")]
    ParseDuration(String),
}

fn display_duration(d: &Duration) -> String {
    format_duration(*d)
}

impl Error {
    /// Returns true if this is a wait timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
