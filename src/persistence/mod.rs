// Persistence - where a calibration result ends up
//
// Two deployment styles exist. One writes kernel module options and disables
// the one-shot calibration unit; the other writes "C M B" straight to the
// driver and enables a unit instance named after the result. Both are
// selected by the binary; the calibration sequence never knows which.

pub mod device;
pub mod modprobe;
pub mod service;

pub use device::DeviceParams;
pub use modprobe::ModprobeConf;
pub use service::{NoService, ServiceAction, ServiceTrigger, Systemctl};

use crate::calibration::CalibrationResult;
use crate::error::PersistError;

/// Durable storage for a calibration result
pub trait CalibrationSink {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Called before calibrating, e.g. to drop a stale result
    fn prepare(&self) -> Result<(), PersistError> {
        Ok(())
    }

    fn persist(&self, result: &CalibrationResult) -> Result<(), PersistError>;
}

impl<T: CalibrationSink + ?Sized> CalibrationSink for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn prepare(&self) -> Result<(), PersistError> {
        (**self).prepare()
    }

    fn persist(&self, result: &CalibrationResult) -> Result<(), PersistError> {
        (**self).persist(result)
    }
}
