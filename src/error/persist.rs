// Persistence and service trigger error types

use crate::error::{DeviceError, ErrorCode};
use std::fmt;

/// Persistence error code constants
///
/// Error code range: 3001-3003
pub struct PersistErrorCodes {}

impl PersistErrorCodes {
    pub const WRITE: i32 = 3001;
    pub const REMOVE: i32 = 3002;
    pub const SERVICE: i32 = 3003;
}

/// Errors raised while storing a calibration result or re-arming the service
#[derive(Debug, Clone, PartialEq)]
pub enum PersistError {
    /// Result could not be written
    Write { target: String, details: String },

    /// Stale result could not be removed
    Remove { target: String, details: String },

    /// Service manager command failed
    Service { command: String, details: String },
}

impl ErrorCode for PersistError {
    fn code(&self) -> i32 {
        match self {
            PersistError::Write { .. } => PersistErrorCodes::WRITE,
            PersistError::Remove { .. } => PersistErrorCodes::REMOVE,
            PersistError::Service { .. } => PersistErrorCodes::SERVICE,
        }
    }

    fn message(&self) -> String {
        match self {
            PersistError::Write { target, details } => {
                format!("Failed to write calibration to {}: {}", target, details)
            }
            PersistError::Remove { target, details } => {
                format!("Failed to remove {}: {}", target, details)
            }
            PersistError::Service { command, details } => {
                format!("Service command `{}` failed: {}", command, details)
            }
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PersistError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for PersistError {}

impl From<DeviceError> for PersistError {
    fn from(err: DeviceError) -> Self {
        let target = match &err {
            DeviceError::Io { path, .. }
            | DeviceError::Parse { path, .. }
            | DeviceError::MissingField { path, .. }
            | DeviceError::Unavailable { path } => path.clone(),
        };
        PersistError::Write {
            target,
            details: err.message(),
        }
    }
}
