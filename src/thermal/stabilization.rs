// StabilizationDetector - waits for TB, T1 and T2 to stop drifting
//
// One reading is taken per tick. Each channel keeps a sliding window of the
// previous N readings. Once the windows are full, the window means (before
// the new reading is inserted) are compared with the new reading; when all
// three differences are below `delta` the temperatures are declared stable.

use log::debug;
use std::collections::VecDeque;

use super::{TemperatureReading, TemperatureSource};
use crate::clock::Clock;
use crate::config::StabilizationConfig;
use crate::device::StatusPulse;
use crate::error::CalibrationError;

/// Fixed-capacity FIFO of channel values
#[derive(Debug, Clone)]
pub struct MovingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl MovingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Arithmetic mean, `None` while empty
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Append a value, evicting the oldest one when full
    pub fn push(&mut self, value: f64) {
        if self.is_full() {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }
}

/// Outcome of one detection run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stabilization {
    /// All channels converged; `reading` is the one that satisfied the check
    Stable {
        reading: TemperatureReading,
        ticks: usize,
    },
    /// The tick budget ran out
    TimedOut {
        last: Option<TemperatureReading>,
        ticks: usize,
    },
}

impl Stabilization {
    pub fn is_stable(&self) -> bool {
        matches!(self, Stabilization::Stable { .. })
    }

    pub fn ticks(&self) -> usize {
        match self {
            Stabilization::Stable { ticks, .. } | Stabilization::TimedOut { ticks, .. } => *ticks,
        }
    }
}

/// Per-channel windows for TB, T1 and T2
struct ChannelWindows {
    tb: MovingWindow,
    t1: MovingWindow,
    t2: MovingWindow,
}

impl ChannelWindows {
    fn new(capacity: usize) -> Self {
        Self {
            tb: MovingWindow::new(capacity),
            t1: MovingWindow::new(capacity),
            t2: MovingWindow::new(capacity),
        }
    }

    fn is_full(&self) -> bool {
        self.tb.is_full() && self.t1.is_full() && self.t2.is_full()
    }

    fn means(&self) -> Option<TemperatureReading> {
        Some(TemperatureReading {
            tb: self.tb.mean()?,
            t1: self.t1.mean()?,
            t2: self.t2.mean()?,
        })
    }

    fn push(&mut self, reading: &TemperatureReading) {
        self.tb.push(reading.tb);
        self.t1.push(reading.t1);
        self.t2.push(reading.t2);
    }
}

/// Moving-average convergence check bounded by a tick budget
pub struct StabilizationDetector<'a> {
    config: StabilizationConfig,
    clock: &'a dyn Clock,
    status: &'a dyn StatusPulse,
}

impl<'a> StabilizationDetector<'a> {
    pub fn new(
        config: StabilizationConfig,
        clock: &'a dyn Clock,
        status: &'a dyn StatusPulse,
    ) -> Self {
        Self {
            config,
            clock,
            status,
        }
    }

    /// Sample `source` until all three channels are stable or the budget runs out
    ///
    /// Every call starts from empty windows.
    ///
    /// # Errors
    /// Any read failure from `source` aborts detection immediately
    pub fn wait_for_stable<S>(&self, source: &mut S) -> Result<Stabilization, CalibrationError>
    where
        S: TemperatureSource + ?Sized,
    {
        let max_ticks = self.config.max_ticks();
        let mut windows = ChannelWindows::new(self.config.window_len());
        let mut last = None;

        for tick in 0..max_ticks {
            let reading = source.read_all()?;
            debug!("[Stabilization] tick {}: {}", tick + 1, reading);

            if windows.is_full() {
                if let Some(means) = windows.means() {
                    if self.converged(&means, &reading) {
                        return Ok(Stabilization::Stable {
                            reading,
                            ticks: tick + 1,
                        });
                    }
                }
            }
            windows.push(&reading);
            last = Some(reading);

            self.wait_tick();
        }

        Ok(Stabilization::TimedOut {
            last,
            ticks: max_ticks,
        })
    }

    fn converged(&self, means: &TemperatureReading, now: &TemperatureReading) -> bool {
        let delta = self.config.delta;
        (means.tb - now.tb).abs() < delta
            && (means.t1 - now.t1).abs() < delta
            && (means.t2 - now.t2).abs() < delta
    }

    /// Sleep one read interval, pulsing the status indicator along the way
    fn wait_tick(&self) {
        let pulse = self.config.pulse_interval();
        let interval = self.config.read_interval();
        let pulses = interval.as_secs() / pulse.as_secs();
        for _ in 0..pulses {
            self.status.pulse();
            self.clock.sleep(pulse);
        }
        let rest = interval.saturating_sub(pulse * pulses as u32);
        if !rest.is_zero() {
            self.clock.sleep(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;
    use std::time::Duration;

    /// Source producing readings from a closure of the tick index
    struct FnSource<F: FnMut(usize) -> TemperatureReading> {
        next: F,
        reads: usize,
    }

    impl<F: FnMut(usize) -> TemperatureReading> FnSource<F> {
        fn new(next: F) -> Self {
            Self { next, reads: 0 }
        }
    }

    impl<F: FnMut(usize) -> TemperatureReading> TemperatureSource for FnSource<F> {
        fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError> {
            let reading = (self.next)(self.reads);
            self.reads += 1;
            Ok(reading)
        }
    }

    #[derive(Default)]
    struct CountingPulse(Cell<usize>);

    impl StatusPulse for CountingPulse {
        fn pulse(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn config() -> StabilizationConfig {
        StabilizationConfig::default()
    }

    #[test]
    fn test_moving_window_evicts_oldest() {
        let mut window = MovingWindow::new(3);
        assert!(window.mean().is_none());
        for value in [1.0, 2.0, 3.0, 4.0] {
            window.push(value);
        }
        assert!(window.is_full());
        // 1.0 evicted: mean of 2, 3, 4
        assert!((window.mean().unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_input_stabilizes_after_window_fill() {
        let clock = ManualClock::new();
        let detector = StabilizationDetector::new(config(), &clock, &());
        let mut source = FnSource::new(|_| TemperatureReading::new(25.0, 31.0, 29.0));

        let outcome = detector.wait_for_stable(&mut source).unwrap();
        let n = config().window_len();

        // N readings fill the window, the next one is compared and accepted
        assert_eq!(outcome.ticks(), n + 1);
        assert!(outcome.is_stable());
        assert_eq!(source.reads, n + 1);
        // No sleep after the accepting read
        assert_eq!(clock.elapsed(), Duration::from_secs(10 * n as u64));
    }

    #[test]
    fn test_drifting_input_times_out_after_exact_budget() {
        let clock = ManualClock::new();
        let pulse = CountingPulse::default();
        let detector = StabilizationDetector::new(config(), &clock, &pulse);
        let mut source =
            FnSource::new(|tick| TemperatureReading::new(25.0 + 0.05 * tick as f64, 31.0, 29.0));

        let outcome = detector.wait_for_stable(&mut source).unwrap();

        assert_eq!(source.reads, 240);
        match outcome {
            Stabilization::TimedOut { last, ticks } => {
                assert_eq!(ticks, 240);
                let last = last.unwrap();
                assert!((last.tb - (25.0 + 0.05 * 239.0)).abs() < 1e-9);
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert_eq!(pulse.0.get(), 2400);
        assert_eq!(clock.elapsed(), Duration::from_secs(2400));
    }

    #[test]
    fn test_zero_read_interval_still_waits_out_the_timeout() {
        let stab = StabilizationConfig {
            read_interval_secs: 0,
            ..config()
        };
        let timeout = Duration::from_secs(stab.timeout_secs);
        let clock = ManualClock::new();
        let pulse = CountingPulse::default();
        let detector = StabilizationDetector::new(stab, &clock, &pulse);
        let mut source =
            FnSource::new(|tick| TemperatureReading::new(25.0 + 0.05 * tick as f64, 31.0, 29.0));

        let outcome = detector.wait_for_stable(&mut source).unwrap();

        assert!(!outcome.is_stable());
        assert_eq!(outcome.ticks(), 2400);
        assert_eq!(clock.elapsed(), timeout);
        assert_eq!(pulse.0.get(), 2400);
    }

    #[test]
    fn test_single_channel_drift_blocks_stability() {
        let clock = ManualClock::new();
        let detector = StabilizationDetector::new(config(), &clock, &());
        let mut source =
            FnSource::new(|tick| TemperatureReading::new(25.0, 31.0, 29.0 - 0.02 * tick as f64));

        let outcome = detector.wait_for_stable(&mut source).unwrap();
        assert!(!outcome.is_stable());
    }

    #[test]
    fn test_comparison_uses_pre_insertion_window() {
        // Window of 2: readings 20, 20 fill it, then 20.05 is compared with
        // mean(20, 20) and accepted even though it differs from both.
        let stab = StabilizationConfig {
            timeout_secs: 100,
            moving_average_secs: 20,
            read_interval_secs: 10,
            delta: 0.1,
            pulse_interval_secs: 1,
        };
        let clock = ManualClock::new();
        let detector = StabilizationDetector::new(stab, &clock, &());
        let values = [20.0, 20.0, 20.05];
        let mut source = FnSource::new(|tick| {
            let v = values[tick.min(2)];
            TemperatureReading::new(v, v, v)
        });

        match detector.wait_for_stable(&mut source).unwrap() {
            Stabilization::Stable { reading, ticks } => {
                assert_eq!(ticks, 3);
                assert!((reading.tb - 20.05).abs() < 1e-12);
            }
            other => panic!("Expected stable, got {:?}", other),
        }
    }

    #[test]
    fn test_settling_input_becomes_stable_before_timeout() {
        let clock = ManualClock::new();
        let detector = StabilizationDetector::new(config(), &clock, &());
        let mut source = FnSource::new(|tick| {
            let settle = (-(tick as f64) / 10.0).exp();
            TemperatureReading::new(26.0 - settle, 33.0 - 2.0 * settle, 30.0 - settle)
        });

        let outcome = detector.wait_for_stable(&mut source).unwrap();
        assert!(outcome.is_stable());
        assert!(outcome.ticks() > config().window_len());
        assert!(outcome.ticks() < config().max_ticks());
    }

    #[test]
    fn test_read_error_aborts_detection() {
        struct FailingSource(usize);
        impl TemperatureSource for FailingSource {
            fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError> {
                self.0 += 1;
                if self.0 > 3 {
                    return Err(CalibrationError::Read {
                        channel: "sys_temp/t1".to_string(),
                        successes: 2,
                        required: 5,
                        attempts: 10,
                    });
                }
                Ok(TemperatureReading::new(25.0, 30.0, 28.0))
            }
        }

        let clock = ManualClock::new();
        let detector = StabilizationDetector::new(config(), &clock, &());
        let mut source = FailingSource(0);
        let result = detector.wait_for_stable(&mut source);
        assert!(matches!(result, Err(CalibrationError::Read { .. })));
        assert_eq!(source.0, 4);
    }

    #[test]
    fn test_each_run_starts_with_empty_windows() {
        let clock = ManualClock::new();
        let detector = StabilizationDetector::new(config(), &clock, &());
        let mut source = FnSource::new(|_| TemperatureReading::new(25.0, 31.0, 29.0));

        let first = detector.wait_for_stable(&mut source).unwrap();
        let second = detector.wait_for_stable(&mut source).unwrap();
        assert_eq!(first.ticks(), second.ticks());
    }
}
