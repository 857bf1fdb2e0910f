// Time source for the calibration sequence
//
// The run spends almost all of its wall time sleeping between readings. The
// sleeps go through `Clock` so the simulated board can advance its own time
// instead, and tests finish instantly.

use std::cell::Cell;
use std::time::Duration;

pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Real time, blocking the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Never sleeps, only accumulates the requested time
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Cell<Duration>,
    sleeps: Cell<usize>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
        self.sleeps.set(self.sleeps.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_accumulates() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_secs(1));
        clock.sleep(Duration::from_secs(10));
        assert_eq!(clock.elapsed(), Duration::from_secs(11));
        assert_eq!(clock.sleeps(), 2);
    }
}
