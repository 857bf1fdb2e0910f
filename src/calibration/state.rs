// Calibration samples and the resulting compensation coefficients
//
// Each stabilization phase yields one sample:
//   E  = TAMB - TB   (how far the body sensor drifted from the ambient baseline)
//   DT = T1 - T2     (internal gradient between the reference probes)
//
// The driver corrects the body temperature as TB + M*DT + B, so the two
// samples give the line E = M*DT + B. Coefficients are stored as integers
// scaled by 1000 and truncated toward zero.

use std::fmt;

use crate::calibration::progress::CalibrationPhase;
use crate::calibration::validation::PerturbationValidator;
use crate::error::CalibrationError;
use crate::thermal::TemperatureReading;

/// Fixed-point scale of persisted coefficients
pub const FIXED_POINT_SCALE: f64 = 1000.0;

/// Drift and internal gradient captured at the end of a phase
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationSample {
    pub phase: CalibrationPhase,
    /// Ambient baseline minus current body temperature
    pub e: f64,
    /// T1 minus T2
    pub dt: f64,
}

impl CalibrationSample {
    pub fn new(phase: CalibrationPhase, e: f64, dt: f64) -> Self {
        Self { phase, e, dt }
    }

    /// Derive the sample from the ambient baseline and a stable reading
    pub fn capture(phase: CalibrationPhase, ambient: f64, reading: &TemperatureReading) -> Self {
        Self {
            phase,
            e: ambient - reading.tb,
            dt: reading.internal_delta(),
        }
    }
}

impl fmt::Display for CalibrationSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = self.phase.index();
        write!(f, "E{}={} DT{}={}", i, self.e, i, self.dt)
    }
}

/// Compensation coefficients consumed by the sensor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationResult {
    /// Slope, ×1000
    pub m: i32,
    /// Intercept, ×1000
    pub b: i32,
    /// Driver configuration selector, when the target needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<u8>,
}

impl CalibrationResult {
    /// Build a result from already encoded coefficients
    pub fn from_coefficients(m: i32, b: i32) -> Self {
        Self {
            m,
            b,
            selector: None,
        }
    }

    pub fn with_selector(mut self, selector: Option<u8>) -> Self {
        self.selector = selector;
        self
    }

    /// Validate both samples and solve the two-point fit
    ///
    /// # Errors
    /// `CalibrationError::InsufficientPerturbation` if either sample fails
    /// its sign check or the loaded sample does not move past the idle one
    pub fn solve(
        idle: &CalibrationSample,
        loaded: &CalibrationSample,
    ) -> Result<Self, CalibrationError> {
        PerturbationValidator::validate_idle(idle)?;
        PerturbationValidator::validate_loaded(idle, loaded)?;

        let m = (loaded.e - idle.e) / (loaded.dt - idle.dt);
        let b = idle.e - m * idle.dt;

        Ok(Self::from_coefficients(to_fixed_point(m), to_fixed_point(b)))
    }

    pub fn slope(&self) -> f64 {
        self.m as f64 / FIXED_POINT_SCALE
    }

    pub fn intercept(&self) -> f64 {
        self.b as f64 / FIXED_POINT_SCALE
    }

    /// Corrected body temperature as computed by the driver
    pub fn compensate(&self, tb: f64, dt: f64) -> f64 {
        tb + self.slope() * dt + self.intercept()
    }
}

impl fmt::Display for CalibrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector {
            Some(c) => write!(f, "C={} M={} B={}", c, self.m, self.b),
            None => write!(f, "M={} B={}", self.m, self.b),
        }
    }
}

/// Scale by 1000 and truncate toward zero
pub fn to_fixed_point(value: f64) -> i32 {
    (value * FIXED_POINT_SCALE).trunc() as i32
}
