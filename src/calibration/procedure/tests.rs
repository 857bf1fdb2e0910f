use super::*;
use crate::calibration::load::CpuLoad;
use crate::clock::ManualClock;
use std::cell::Cell;
use std::rc::Rc;

/// Source returning fixed readings depending on whether the load is running
struct PhasedSource {
    loaded: Rc<Cell<bool>>,
    reads: usize,
    loaded_reads: usize,
    initial: TemperatureReading,
    idle: TemperatureReading,
    hot: TemperatureReading,
    /// Added to TB on every loaded read
    hot_drift: f64,
    /// Fail the nth loaded read
    fail_loaded_at: Option<usize>,
}

impl PhasedSource {
    fn new(loaded: Rc<Cell<bool>>) -> Self {
        Self {
            loaded,
            reads: 0,
            loaded_reads: 0,
            initial: TemperatureReading::new(25.0, 31.0, 30.0),
            idle: TemperatureReading::new(26.0, 33.0, 31.0),
            hot: TemperatureReading::new(28.0, 36.0, 31.0),
            hot_drift: 0.0,
            fail_loaded_at: None,
        }
    }
}

impl TemperatureSource for PhasedSource {
    fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError> {
        self.reads += 1;
        if self.reads == 1 {
            return Ok(self.initial);
        }
        if !self.loaded.get() {
            return Ok(self.idle);
        }

        self.loaded_reads += 1;
        if self.fail_loaded_at == Some(self.loaded_reads) {
            return Err(CalibrationError::Read {
                channel: "sys_temp/t1".to_string(),
                successes: 1,
                required: 5,
                attempts: 10,
            });
        }
        let mut reading = self.hot;
        reading.tb += self.hot_drift * self.loaded_reads as f64;
        Ok(reading)
    }
}

/// Load double counting start/stop calls and flipping the shared flag
struct CountingLoad {
    loaded: Rc<Cell<bool>>,
    starts: usize,
    stops: usize,
}

impl CountingLoad {
    fn new(loaded: Rc<Cell<bool>>) -> Self {
        Self {
            loaded,
            starts: 0,
            stops: 0,
        }
    }
}

impl ThermalLoad for CountingLoad {
    fn start(&mut self) -> Result<usize, CalibrationError> {
        self.starts += 1;
        self.loaded.set(true);
        Ok(4)
    }

    fn stop_and_join(&mut self) {
        self.stops += 1;
        self.loaded.set(false);
    }
}

fn fixture() -> (PhasedSource, CountingLoad) {
    let flag = Rc::new(Cell::new(false));
    (PhasedSource::new(Rc::clone(&flag)), CountingLoad::new(flag))
}

#[test]
fn test_full_run_produces_coefficients() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());
    let (mut source, mut load) = fixture();

    let report = procedure.run(&mut source, &mut load).unwrap();

    assert_eq!(report.ambient, 25.0);
    assert!((report.idle.e + 1.0).abs() < 1e-12);
    assert!((report.idle.dt - 2.0).abs() < 1e-12);
    assert!((report.loaded.e + 3.0).abs() < 1e-12);
    assert!((report.loaded.dt - 5.0).abs() < 1e-12);
    assert_eq!(report.result.m, -666);
    assert_eq!(report.result.b, 333);
    assert_eq!(report.idle_ticks, config.stabilization.window_len() + 1);
    assert_eq!(report.loaded_ticks, config.stabilization.window_len() + 1);
    assert_eq!((load.starts, load.stops), (1, 1));
}

#[test]
fn test_settle_delay_precedes_loaded_phase() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());
    let (mut source, mut load) = fixture();

    procedure.run(&mut source, &mut load).unwrap();

    // 18 waiting ticks of 10 s per phase, plus the 1 s settle delay
    let n = config.stabilization.window_len() as u64;
    assert_eq!(clock.elapsed(), Duration::from_secs(2 * n * 10 + 1));
}

#[test]
fn test_idle_timeout_never_starts_load() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());

    struct Drifting(usize);
    impl TemperatureSource for Drifting {
        fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError> {
            self.0 += 1;
            Ok(TemperatureReading::new(25.0 + 0.1 * self.0 as f64, 33.0, 31.0))
        }
    }

    let (_, mut load) = fixture();
    let result = procedure.run(&mut Drifting(0), &mut load);

    assert_eq!(
        result.unwrap_err(),
        CalibrationError::StabilizationTimeout {
            phase: CalibrationPhase::Idle,
            ticks: 240
        }
    );
    assert_eq!((load.starts, load.stops), (0, 0));
}

#[test]
fn test_idle_sensor_below_baseline_rejected() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());
    let (mut source, mut load) = fixture();
    source.idle = TemperatureReading::new(24.0, 33.0, 31.0);

    match procedure.run(&mut source, &mut load) {
        Err(CalibrationError::InsufficientPerturbation { reason }) => {
            assert!(reason.contains("E1=1"), "{}", reason)
        }
        other => panic!("Expected InsufficientPerturbation, got {:?}", other),
    }
    assert_eq!(load.starts, 0);
}

#[test]
fn test_idle_without_internal_gradient_rejected() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());
    let (mut source, mut load) = fixture();
    source.idle = TemperatureReading::new(26.0, 31.0, 31.0);

    match procedure.run(&mut source, &mut load) {
        Err(CalibrationError::InsufficientPerturbation { reason }) => {
            assert!(reason.contains("DT1=0"), "{}", reason)
        }
        other => panic!("Expected InsufficientPerturbation, got {:?}", other),
    }
}

#[test]
fn test_loaded_timeout_still_stops_load() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());
    let (mut source, mut load) = fixture();
    source.hot_drift = 0.05;

    let result = procedure.run(&mut source, &mut load);

    assert_eq!(
        result.unwrap_err(),
        CalibrationError::StabilizationTimeout {
            phase: CalibrationPhase::Loaded,
            ticks: 240
        }
    );
    assert_eq!((load.starts, load.stops), (1, 1));
    assert!(!load.loaded.get());
}

#[test]
fn test_loaded_read_error_still_stops_load() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());
    let (mut source, mut load) = fixture();
    source.fail_loaded_at = Some(5);

    let result = procedure.run(&mut source, &mut load);

    assert!(matches!(result, Err(CalibrationError::Read { .. })));
    assert_eq!((load.starts, load.stops), (1, 1));
}

#[test]
fn test_loaded_phase_without_extra_heat_rejected() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());
    let (mut source, mut load) = fixture();
    source.hot = source.idle;

    match procedure.run(&mut source, &mut load) {
        Err(CalibrationError::InsufficientPerturbation { reason }) => {
            assert!(reason.contains("E1=-1 E2=-1"), "{}", reason)
        }
        other => panic!("Expected InsufficientPerturbation, got {:?}", other),
    }
    assert_eq!((load.starts, load.stops), (1, 1));
}

#[test]
fn test_identical_traces_give_identical_results() {
    let config = AppConfig::default();
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());

    let (mut source, mut load) = fixture();
    let first = procedure.run(&mut source, &mut load).unwrap();
    let (mut source, mut load) = fixture();
    let second = procedure.run(&mut source, &mut load).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_cpu_workers_gone_after_loaded_timeout() {
    let mut config = AppConfig::default();
    config.stabilization.timeout_secs = 50;
    config.stabilization.moving_average_secs = 20;
    let clock = ManualClock::new();
    let procedure = CalibrationProcedure::new(&config, &clock, &());

    struct IdleThenDrift(usize);
    impl TemperatureSource for IdleThenDrift {
        fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError> {
            self.0 += 1;
            // initial + 3 idle reads stabilize with a window of 2
            let tb = if self.0 == 1 {
                25.0
            } else if self.0 <= 4 {
                26.0
            } else {
                26.0 + self.0 as f64
            };
            Ok(TemperatureReading::new(tb, 33.0, 31.0))
        }
    }

    let mut load = CpuLoad::new(2);
    let result = procedure.run(&mut IdleThenDrift(0), &mut load);

    assert!(matches!(
        result,
        Err(CalibrationError::StabilizationTimeout {
            phase: CalibrationPhase::Loaded,
            ..
        })
    ));
    assert_eq!(load.active_workers(), 0);
}
