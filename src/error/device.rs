// Device interface error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Device error code constants
///
/// Error code range: 1001-1004
pub struct DeviceErrorCodes {}

impl DeviceErrorCodes {
    /// Attribute could not be read or written
    pub const IO: i32 = 1001;

    /// Attribute content is not an integer
    pub const PARSE: i32 = 1002;

    /// Attribute has fewer whitespace-separated fields than requested
    pub const MISSING_FIELD: i32 = 1003;

    /// Device reported the attribute as temporarily unavailable
    pub const UNAVAILABLE: i32 = 1004;
}

/// Log a device error with structured context
pub fn log_device_error(err: &DeviceError, context: &str) {
    error!(
        "Device error in {}: code={}, component=DeviceInterface, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the device interface
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Attribute could not be read or written
    Io { path: String, details: String },

    /// Attribute content is not an integer
    Parse { path: String, raw: String },

    /// Attribute has fewer fields than requested
    MissingField { path: String, index: usize },

    /// Attribute temporarily unavailable (bus busy, sensor not ready)
    Unavailable { path: String },
}

impl ErrorCode for DeviceError {
    fn code(&self) -> i32 {
        match self {
            DeviceError::Io { .. } => DeviceErrorCodes::IO,
            DeviceError::Parse { .. } => DeviceErrorCodes::PARSE,
            DeviceError::MissingField { .. } => DeviceErrorCodes::MISSING_FIELD,
            DeviceError::Unavailable { .. } => DeviceErrorCodes::UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            DeviceError::Io { path, details } => format!("I/O error on {}: {}", path, details),
            DeviceError::Parse { path, raw } => {
                format!("Cannot parse {:?} read from {}", raw, path)
            }
            DeviceError::MissingField { path, index } => {
                format!("Field {} missing in {}", index, path)
            }
            DeviceError::Unavailable { path } => format!("{} temporarily unavailable", path),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for DeviceError {}
