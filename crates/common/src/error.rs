//! Error types shared across FrameSnap crates.

/// Top-level error type for FrameSnap operations.
#[derive(Debug, thiserror::Error)]
pub enum FramesnapError {
    /// Rejected before a session starts (bad fps, degenerate region, bad config file).
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The screen-grab primitive failed. Fatal to the active capture session.
    #[error("Acquisition error: {message}")]
    Acquisition { message: String },

    #[error("Frame index {index} out of range (buffer holds {len} frames)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Frame buffer capacity of {limit} frames exceeded")]
    CapacityExceeded { limit: usize },

    /// An operation was issued in a state that does not allow it.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FramesnapError.
pub type FramesnapResult<T> = Result<T, FramesnapError>;

impl FramesnapError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    /// Whether this error ends a capture session.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            Self::Acquisition { .. } | Self::CapacityExceeded { .. } | Self::Platform { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_error_reports_bounds() {
        let err = FramesnapError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "Frame index 7 out of range (buffer holds 3 frames)"
        );
    }

    #[test]
    fn only_capture_failures_are_fatal() {
        assert!(FramesnapError::acquisition("denied").is_fatal_to_session());
        assert!(FramesnapError::CapacityExceeded { limit: 10 }.is_fatal_to_session());
        assert!(!FramesnapError::configuration("fps").is_fatal_to_session());
        assert!(!FramesnapError::IndexOutOfRange { index: 1, len: 0 }.is_fatal_to_session());
    }
}
