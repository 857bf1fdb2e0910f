// Error types for the calibration tool
//
// This module defines custom error types for device access, the calibration
// run and result persistence. Each enum carries a stable numeric code so the
// binary can report failures consistently.

mod calibration;
mod device;
mod persist;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use device::{log_device_error, DeviceError, DeviceErrorCodes};
pub use persist::{PersistError, PersistErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
