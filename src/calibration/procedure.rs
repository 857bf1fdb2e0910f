// CalibrationProcedure - the two-phase calibration sequence
//
// The procedure follows a linear workflow:
// 1. Record the ambient baseline TAMB from a first reading
// 2. Wait for idle stabilization, capture (E1, DT1) and check it
// 3. Saturate the CPUs, wait for loaded stabilization, stop the load
// 4. Capture (E2, DT2), check it against the idle sample and solve the fit
//
// Any failure aborts the run. There is no resume: a new run starts at step 1.

use log::info;
use std::time::Duration;

use crate::calibration::load::ThermalLoad;
use crate::calibration::progress::CalibrationPhase;
use crate::calibration::state::{CalibrationResult, CalibrationSample};
use crate::calibration::validation::PerturbationValidator;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::config::StabilizationConfig;
use crate::device::StatusPulse;
use crate::error::CalibrationError;
use crate::thermal::{Stabilization, StabilizationDetector, TemperatureReading, TemperatureSource};

/// Everything a successful run measured, with the final coefficients
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationReport {
    /// Body temperature before any stabilization
    pub ambient: f64,
    pub idle: CalibrationSample,
    pub loaded: CalibrationSample,
    /// Readings taken until each phase stabilized
    pub idle_ticks: usize,
    pub loaded_ticks: usize,
    pub result: CalibrationResult,
}

/// Drives the sampler, detector and load generator through both phases
pub struct CalibrationProcedure<'a> {
    stabilization: StabilizationConfig,
    settle: Duration,
    clock: &'a dyn Clock,
    status: &'a dyn StatusPulse,
}

impl<'a> CalibrationProcedure<'a> {
    /// Create a new calibration procedure
    ///
    /// # Arguments
    /// * `config` - Stabilization timing and load settle delay
    /// * `clock` - Time source for every wait of the run
    /// * `status` - Indicator pulsed while waiting
    pub fn new(config: &AppConfig, clock: &'a dyn Clock, status: &'a dyn StatusPulse) -> Self {
        Self {
            stabilization: config.stabilization.clone(),
            settle: Duration::from_secs(config.load.settle_secs),
            clock,
            status,
        }
    }

    /// Run the whole sequence
    ///
    /// `load` is stopped before this returns on every path once it has been
    /// started, including detection timeouts and read errors.
    pub fn run<S, L>(&self, source: &mut S, load: &mut L) -> Result<CalibrationReport, CalibrationError>
    where
        S: TemperatureSource + ?Sized,
        L: ThermalLoad + ?Sized,
    {
        let initial = source.read_all()?;
        info!("[Calibration] Initial temperatures: {}", initial);
        let ambient = initial.tb;

        info!("[Calibration] Waiting for temperature to stabilize...");
        let (idle_reading, idle_ticks) = self.stabilize(CalibrationPhase::Idle, source)?;
        let idle = CalibrationSample::capture(CalibrationPhase::Idle, ambient, &idle_reading);
        self.log_phase(&idle, &idle_reading, idle_ticks);
        PerturbationValidator::validate_idle(&idle)?;

        info!("[Calibration] Warming up CPUs...");
        let workers = load.start()?;
        self.clock.sleep(self.settle);
        info!(
            "[Calibration] Waiting for temperature to stabilize under load ({} workers)...",
            workers
        );
        let loaded_outcome = self.stabilize(CalibrationPhase::Loaded, source);
        load.stop_and_join();
        let (loaded_reading, loaded_ticks) = loaded_outcome?;

        let loaded = CalibrationSample::capture(CalibrationPhase::Loaded, ambient, &loaded_reading);
        self.log_phase(&loaded, &loaded_reading, loaded_ticks);

        let result = CalibrationResult::solve(&idle, &loaded)?;
        info!("[Calibration] Calibration params computed: {}", result);

        Ok(CalibrationReport {
            ambient,
            idle,
            loaded,
            idle_ticks,
            loaded_ticks,
            result,
        })
    }

    /// Wait for one phase to stabilize, turning a timeout into an error
    fn stabilize<S>(
        &self,
        phase: CalibrationPhase,
        source: &mut S,
    ) -> Result<(TemperatureReading, usize), CalibrationError>
    where
        S: TemperatureSource + ?Sized,
    {
        let detector = StabilizationDetector::new(self.stabilization.clone(), self.clock, self.status);
        match detector.wait_for_stable(source)? {
            Stabilization::Stable { reading, ticks } => Ok((reading, ticks)),
            Stabilization::TimedOut { ticks, .. } => {
                Err(CalibrationError::StabilizationTimeout { phase, ticks })
            }
        }
    }

    fn log_phase(&self, sample: &CalibrationSample, reading: &TemperatureReading, ticks: usize) {
        info!("[Calibration] Stable temperatures: {}", reading);
        tracing::info!(
            phase = sample.phase.display_name(),
            ticks,
            e = sample.e,
            dt = sample.dt,
            "phase stabilized"
        );
    }
}

#[cfg(test)]
mod tests;
