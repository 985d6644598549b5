//! Error taxonomy for capture, recording and session control

use serde::Serialize;
use thiserror::Error;

use crate::recorder::{RecorderKind, RecorderState};

/// Failures while acquiring a capture source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Capture or recording capability is missing on this platform
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The user dismissed the picker
    #[error("capture cancelled by user")]
    UserCancelled,

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
}

impl CaptureError {
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            CaptureError::PermissionDenied(_) => "PERMISSION_DENIED",
            CaptureError::UserCancelled => "USER_CANCELLED",
            CaptureError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
        }
    }

    /// Everything except a missing capability can be retried by the user
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CaptureError::UnsupportedPlatform(_))
    }
}

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("{kind:?} recorder cannot {action} while {state:?}")]
    InvalidState {
        kind: RecorderKind,
        state: RecorderState,
        action: &'static str,
    },

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("recorder task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Capture(e) => e.code(),
            SessionError::Recorder(_) => "RECORDER_ERROR",
        }
    }
}

/// Error body returned to API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

impl From<&SessionError> for ErrorResponse {
    fn from(error: &SessionError) -> Self {
        Self {
            code: error.code().to_string(),
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_codes() {
        assert_eq!(CaptureError::UserCancelled.code(), "USER_CANCELLED");
        assert_eq!(
            SessionError::from(CaptureError::PermissionDenied("mic".into())).code(),
            "PERMISSION_DENIED"
        );
    }

    #[test]
    fn test_only_unsupported_is_fatal() {
        assert!(!CaptureError::UnsupportedPlatform("x".into()).is_recoverable());
        assert!(CaptureError::UserCancelled.is_recoverable());
        assert!(CaptureError::DeviceUnavailable("mic".into()).is_recoverable());
    }
}
