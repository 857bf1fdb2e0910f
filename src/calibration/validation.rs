// Perturbation checks for calibration samples
//
// A fit is only meaningful if the board actually heated up. The idle phase
// must show the body sensor above its ambient baseline (E1 < 0) and a positive
// internal gradient (DT1 > 0). The loaded phase must push both further
// (E2 < E1, DT2 > DT1).

use crate::calibration::state::CalibrationSample;
use crate::error::CalibrationError;

/// Validator for calibration samples
pub struct PerturbationValidator;

impl PerturbationValidator {
    /// Validate the idle-phase sample
    ///
    /// # Validation Rules
    /// * E1 must be strictly negative
    /// * DT1 must be strictly positive
    pub fn validate_idle(idle: &CalibrationSample) -> Result<(), CalibrationError> {
        if idle.e >= 0.0 {
            return Err(CalibrationError::InsufficientPerturbation {
                reason: format!("No temperature variation: E1={}", idle.e),
            });
        }

        if idle.dt <= 0.0 {
            return Err(CalibrationError::InsufficientPerturbation {
                reason: format!("No internal temperature difference: DT1={}", idle.dt),
            });
        }

        Ok(())
    }

    /// Validate the loaded-phase sample against the idle one
    ///
    /// # Validation Rules
    /// * E2 must be strictly below E1
    /// * DT2 must be strictly above DT1
    pub fn validate_loaded(
        idle: &CalibrationSample,
        loaded: &CalibrationSample,
    ) -> Result<(), CalibrationError> {
        if loaded.e >= idle.e {
            return Err(CalibrationError::InsufficientPerturbation {
                reason: format!("No temperature variation: E1={} E2={}", idle.e, loaded.e),
            });
        }

        if loaded.dt <= idle.dt {
            return Err(CalibrationError::InsufficientPerturbation {
                reason: format!(
                    "No internal temperature difference: DT1={} DT2={}",
                    idle.dt, loaded.dt
                ),
            });
        }

        Ok(())
    }
}
