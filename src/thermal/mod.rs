// Thermal module - sampling and stabilization of the three temperatures
//
// The calibration compares the body sensor (TB) against the two internal
// reference probes (T1, T2). This module provides:
// 1. ThermalSampler: averaged, retry-tolerant reads of each channel
// 2. StabilizationDetector: waits until all three stop drifting

pub mod sampler;
pub mod stabilization;

pub use sampler::{Channel, ThermalSampler};
pub use stabilization::{MovingWindow, Stabilization, StabilizationDetector};

use crate::error::CalibrationError;
use std::fmt;

/// One averaged sample of the three monitored temperatures, in degrees
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TemperatureReading {
    /// Body (temperature/humidity sensor) temperature
    pub tb: f64,
    /// First internal reference probe
    pub t1: f64,
    /// Second internal reference probe
    pub t2: f64,
}

impl TemperatureReading {
    pub fn new(tb: f64, t1: f64, t2: f64) -> Self {
        Self { tb, t1, t2 }
    }

    /// Internal gradient between the two reference probes
    pub fn internal_delta(&self) -> f64 {
        self.t1 - self.t2
    }
}

impl fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TB={:.2} T1={:.2} T2={:.2}", self.tb, self.t1, self.t2)
    }
}

/// Anything able to produce a fresh `TemperatureReading`
pub trait TemperatureSource {
    fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError>;
}

impl<S: TemperatureSource + ?Sized> TemperatureSource for &mut S {
    fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError> {
        (**self).read_all()
    }
}
