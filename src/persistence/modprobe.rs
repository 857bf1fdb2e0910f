// Kernel module options file
//
// The driver reads temp_calib_m / temp_calib_b as module parameters at load
// time. The file is removed before calibrating so a stale result cannot
// survive a failed run.

use log::info;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::CalibrationSink;
use crate::calibration::CalibrationResult;
use crate::error::PersistError;

pub struct ModprobeConf {
    path: PathBuf,
    module: String,
}

impl ModprobeConf {
    pub fn new<P: AsRef<Path>>(path: P, module: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            module: module.into(),
        }
    }

    /// The options line written for `result`
    pub fn render(&self, result: &CalibrationResult) -> String {
        format!(
            "options {} temp_calib_m={} temp_calib_b={}\n",
            self.module, result.m, result.b
        )
    }
}

impl CalibrationSink for ModprobeConf {
    fn describe(&self) -> String {
        format!("modprobe options {}", self.path.display())
    }

    fn prepare(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("[Persist] Removed previous {}", self.path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistError::Remove {
                target: self.path.display().to_string(),
                details: err.to_string(),
            }),
        }
    }

    fn persist(&self, result: &CalibrationResult) -> Result<(), PersistError> {
        fs::write(&self.path, self.render(result)).map_err(|err| PersistError::Write {
            target: self.path.display().to_string(),
            details: err.to_string(),
        })
    }
}
