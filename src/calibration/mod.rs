// Calibration module - two-point thermal compensation of the body sensor
//
// This module provides:
// 1. CalibrationProcedure: runs the idle and loaded stabilization phases
// 2. CalibrationResult: the fixed-point (M, B) fit handed to persistence
// 3. LoadGenerator / CpuLoad: busy workers heating the board
//
// The calibration workflow:
// 1. Record the ambient baseline and wait for idle stabilization
// 2. Saturate every core and wait for loaded stabilization
// 3. Solve E = M*DT + B through the two samples

pub mod load;
pub mod procedure;
pub mod progress;
pub mod state;
pub mod validation;

pub use load::{CpuLoad, LoadGenerator, ThermalLoad};
pub use procedure::{CalibrationProcedure, CalibrationReport};
pub use progress::CalibrationPhase;
pub use state::{CalibrationResult, CalibrationSample};
pub use validation::PerturbationValidator;
