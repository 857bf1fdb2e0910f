// Sysfs-backed device interface for the kernel driver

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::DeviceInterface;
use crate::error::DeviceError;

/// EBUSY, returned by the driver while the I2C bus is held elsewhere
const EBUSY: i32 = 16;

/// Device attributes exposed under a sysfs class directory
pub struct SysfsDevice {
    root: PathBuf,
}

impl SysfsDevice {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn map_err(&self, path: &str, err: std::io::Error) -> DeviceError {
        if err.raw_os_error() == Some(EBUSY)
            || matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
        {
            DeviceError::Unavailable {
                path: path.to_string(),
            }
        } else {
            DeviceError::Io {
                path: path.to_string(),
                details: err.to_string(),
            }
        }
    }
}

impl DeviceInterface for SysfsDevice {
    fn read(&self, path: &str) -> Result<String, DeviceError> {
        fs::read_to_string(self.root.join(path))
            .map(|raw| raw.trim().to_string())
            .map_err(|err| self.map_err(path, err))
    }

    fn write(&self, path: &str, value: &str) -> Result<(), DeviceError> {
        fs::write(self.root.join(path), value).map_err(|err| self.map_err(path, err))
    }
}
