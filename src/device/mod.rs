// Device interface - access to the board's sysfs-style attributes
//
// Calibration code never touches the filesystem directly. It goes through
// `DeviceInterface` so the same sequence runs against the kernel driver, the
// simulated board, or scripted mocks in tests.

pub mod feedback;
pub mod sysfs;

pub use feedback::{Feedback, LedState, StatusPulse, BEEP_DONE, BEEP_START};
pub use sysfs::SysfsDevice;

use crate::error::DeviceError;

/// Raw text access to device attributes addressed by relative path
pub trait DeviceInterface: Send + Sync {
    /// Read the attribute, trimmed of surrounding whitespace
    fn read(&self, path: &str) -> Result<String, DeviceError>;

    /// Write a value to the attribute
    fn write(&self, path: &str, value: &str) -> Result<(), DeviceError>;
}

impl<T: DeviceInterface + ?Sized> DeviceInterface for &T {
    fn read(&self, path: &str) -> Result<String, DeviceError> {
        (**self).read(path)
    }

    fn write(&self, path: &str, value: &str) -> Result<(), DeviceError> {
        (**self).write(path, value)
    }
}

impl<T: DeviceInterface + ?Sized> DeviceInterface for Box<T> {
    fn read(&self, path: &str) -> Result<String, DeviceError> {
        (**self).read(path)
    }

    fn write(&self, path: &str, value: &str) -> Result<(), DeviceError> {
        (**self).write(path, value)
    }
}
