//! Vehicle link errors

use thiserror::Error;

/// Errors that can occur while talking to the OBD-II adapter
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Link unavailable: {0}")]
    LinkUnavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Adapter timeout")]
    Timeout,

    #[error("Not connected to adapter")]
    NotConnected,

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Invalid response from adapter: {0}")]
    InvalidResponse(String),

    #[error("Not supported by this link: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LinkError {
    /// Whether the link handle must be considered unusable after this error.
    ///
    /// A garbled reply leaves the adapter session intact, so the poller keeps
    /// the link. Everything else forces a rebuild.
    pub fn is_link_failure(&self) -> bool {
        !matches!(
            self,
            LinkError::InvalidResponse(_) | LinkError::Unsupported(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(LinkError::Timeout.is_link_failure());
        assert!(LinkError::QueryFailed("eof".into()).is_link_failure());
        assert!(LinkError::IoError(std::io::Error::other("gone")).is_link_failure());
        assert!(!LinkError::InvalidResponse("41 0C".into()).is_link_failure());
        assert!(!LinkError::Unsupported("dtc").is_link_failure());
    }
}
