use thiserror::Error;

/// Errors produced by the remote call adapter.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection-level failure (DNS, TLS, timeout, malformed body).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("Server returned status {0}")]
    Status(u16),
}

impl ApiError {
    /// Whether the failure asserts the resource is authoritatively gone for
    /// this viewer (deleted, or access revoked), as opposed to a transient
    /// failure that leaves local state untouched.
    pub fn is_gone(&self) -> bool {
        matches!(self, ApiError::Status(403) | ApiError::Status(404))
    }
}

/// Convenience alias used throughout the crate.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_statuses() {
        assert!(ApiError::Status(404).is_gone());
        assert!(ApiError::Status(403).is_gone());
        assert!(!ApiError::Status(500).is_gone());
        assert!(!ApiError::Status(401).is_gone());
    }
}
