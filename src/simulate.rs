//! Simulated Exo Sense board for dry runs and tests
//!
//! The model is a first-order thermal response: every temperature relaxes
//! exponentially toward a target that depends on whether the CPUs are loaded.
//! Simulated time only moves when the run sleeps through [`SimulatedClock`],
//! so a forty-minute phase completes instantly. Read noise and transient read
//! failures come from a seeded RNG, making a run fully reproducible.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calibration::ThermalLoad;
use crate::clock::Clock;
use crate::config::DeviceConfig;
use crate::device::DeviceInterface;
use crate::error::{CalibrationError, DeviceError};

/// Offsets above ambient reached by TB, T1 and T2 at equilibrium
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatProfile {
    pub body: f64,
    pub t1: f64,
    pub t2: f64,
}

/// Physical parameters of the simulated board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardModel {
    pub ambient: f64,
    /// Equilibrium offsets with the board idle
    pub idle: HeatProfile,
    /// Equilibrium offsets with every core saturated
    pub loaded: HeatProfile,
    /// Time constant of the exponential response
    pub tau_secs: f64,
    /// Peak amplitude of uniform read noise, in degrees
    pub noise: f64,
    /// Probability that a single attribute read fails
    pub failure_rate: f64,
    /// Workers reported by the simulated load
    pub cores: usize,
}

impl Default for BoardModel {
    fn default() -> Self {
        Self {
            ambient: 25.0,
            idle: HeatProfile {
                body: 1.0,
                t1: 8.0,
                t2: 6.0,
            },
            loaded: HeatProfile {
                body: 3.0,
                t1: 11.0,
                t2: 6.0,
            },
            tau_secs: 240.0,
            noise: 0.02,
            failure_rate: 0.02,
            cores: 4,
        }
    }
}

struct BoardState {
    elapsed: Duration,
    tb: f64,
    t1: f64,
    t2: f64,
    loaded: bool,
    rng: StdRng,
    writes: Vec<(String, String)>,
}

struct Shared {
    model: BoardModel,
    channels: DeviceConfig,
    state: Mutex<BoardState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        let target = if state.loaded {
            self.model.loaded
        } else {
            self.model.idle
        };
        let ambient = self.model.ambient;
        let k = 1.0 - (-duration.as_secs_f64() / self.model.tau_secs).exp();

        state.tb += (ambient + target.body - state.tb) * k;
        state.t1 += (ambient + target.t1 - state.t1) * k;
        state.t2 += (ambient + target.t2 - state.t2) * k;
        state.elapsed += duration;
    }

    /// Noisy value in hundredths of a degree
    fn sample(&self, state: &mut BoardState, value: f64) -> i64 {
        let noise = if self.model.noise > 0.0 {
            state.rng.gen_range(-self.model.noise..=self.model.noise)
        } else {
            0.0
        };
        ((value + noise) * 100.0).round() as i64
    }
}

/// Handle to a simulated board; hands out device, clock and load views
#[derive(Clone)]
pub struct SimulatedBoard {
    shared: Arc<Shared>,
}

impl SimulatedBoard {
    pub fn new(model: BoardModel, channels: DeviceConfig, seed: u64) -> Self {
        let ambient = model.ambient;
        Self {
            shared: Arc::new(Shared {
                model,
                channels,
                state: Mutex::new(BoardState {
                    elapsed: Duration::ZERO,
                    tb: ambient,
                    t1: ambient,
                    t2: ambient,
                    loaded: false,
                    rng: StdRng::seed_from_u64(seed),
                    writes: Vec::new(),
                }),
            }),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(BoardModel::default(), DeviceConfig::default(), seed)
    }

    pub fn device(&self) -> SimulatedDevice {
        SimulatedDevice {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn clock(&self) -> SimulatedClock {
        SimulatedClock {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn load(&self) -> SimulatedLoad {
        SimulatedLoad {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Simulated time elapsed so far
    pub fn elapsed(&self) -> Duration {
        self.shared.lock().elapsed
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.lock().loaded
    }

    /// Every attribute write received, in order
    pub fn writes(&self) -> Vec<(String, String)> {
        self.shared.lock().writes.clone()
    }

    /// Last value written to `path`
    pub fn last_write(&self, path: &str) -> Option<String> {
        self.shared
            .lock()
            .writes
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v.clone())
    }
}

/// Device interface view of the board
pub struct SimulatedDevice {
    shared: Arc<Shared>,
}

impl DeviceInterface for SimulatedDevice {
    fn read(&self, path: &str) -> Result<String, DeviceError> {
        let shared = &self.shared;
        let channels = &shared.channels;
        let mut state = shared.lock();

        if shared.model.failure_rate > 0.0 && state.rng.gen_bool(shared.model.failure_rate) {
            return Err(DeviceError::Unavailable {
                path: path.to_string(),
            });
        }

        if path == channels.body_path {
            let tb = state.tb;
            let t = shared.sample(&mut state, tb);
            let mut fields = vec!["0".to_string(); channels.body_field.max(4) + 1];
            fields[channels.body_field] = t.to_string();
            Ok(fields.join(" "))
        } else if path == channels.t1_path {
            let t1 = state.t1;
            Ok(shared.sample(&mut state, t1).to_string())
        } else if path == channels.t2_path {
            let t2 = state.t2;
            Ok(shared.sample(&mut state, t2).to_string())
        } else if let Some((_, value)) = state.writes.iter().rev().find(|(p, _)| p == path) {
            Ok(value.clone())
        } else {
            Err(DeviceError::Io {
                path: path.to_string(),
                details: "no such attribute".to_string(),
            })
        }
    }

    fn write(&self, path: &str, value: &str) -> Result<(), DeviceError> {
        self.shared
            .lock()
            .writes
            .push((path.to_string(), value.to_string()));
        Ok(())
    }
}

/// Clock advancing the thermal model instead of sleeping
pub struct SimulatedClock {
    shared: Arc<Shared>,
}

impl Clock for SimulatedClock {
    fn sleep(&self, duration: Duration) {
        self.shared.advance(duration);
    }
}

/// Switches the board's heat profile between idle and loaded
pub struct SimulatedLoad {
    shared: Arc<Shared>,
}

impl ThermalLoad for SimulatedLoad {
    fn start(&mut self) -> Result<usize, CalibrationError> {
        self.shared.lock().loaded = true;
        Ok(self.shared.model.cores)
    }

    fn stop_and_join(&mut self) {
        self.shared.lock().loaded = false;
    }
}
