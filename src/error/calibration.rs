// Calibration error types and constants

use crate::calibration::CalibrationPhase;
use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2004
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// A channel could not be sampled within the attempt budget
    pub const READ: i32 = 2001;

    /// Temperatures did not stabilize before the phase timeout
    pub const STABILIZATION_TIMEOUT: i32 = 2002;

    /// The thermal gradient between phases is missing or inverted
    pub const INSUFFICIENT_PERTURBATION: i32 = 2003;

    /// A load worker thread could not be spawned
    pub const LOAD_START: i32 = 2004;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationProcedure, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// All of them are fatal for the run: nothing is persisted and the operator
/// has to start over.
///
/// Error code ranges: 2001-2004
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Fewer than the required reads succeeded on a channel
    Read {
        channel: String,
        successes: usize,
        required: usize,
        attempts: usize,
    },

    /// Temperatures kept drifting until the phase timeout
    StabilizationTimeout { phase: CalibrationPhase, ticks: usize },

    /// A sign or monotonicity check on E/DT failed
    InsufficientPerturbation { reason: String },

    /// The CPU load could not be started in full
    LoadStart {
        requested: usize,
        started: usize,
        details: String,
    },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::Read { .. } => CalibrationErrorCodes::READ,
            CalibrationError::StabilizationTimeout { .. } => {
                CalibrationErrorCodes::STABILIZATION_TIMEOUT
            }
            CalibrationError::InsufficientPerturbation { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_PERTURBATION
            }
            CalibrationError::LoadStart { .. } => CalibrationErrorCodes::LOAD_START,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::Read {
                channel,
                successes,
                required,
                attempts,
            } => format!(
                "Error reading temperature {}: {} of {} reads succeeded in {} attempts",
                channel, successes, required, attempts
            ),
            CalibrationError::StabilizationTimeout { phase, ticks } => format!(
                "Temperatures not stable in {} phase after {} reads",
                phase.display_name(),
                ticks
            ),
            CalibrationError::InsufficientPerturbation { reason } => {
                format!("Insufficient thermal perturbation: {}", reason)
            }
            CalibrationError::LoadStart {
                requested,
                started,
                details,
            } => format!(
                "Only {} of {} CPU load workers started: {}",
                started, requested, details
            ),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
