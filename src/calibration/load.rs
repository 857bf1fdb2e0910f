// CPU load generator used to heat the board during the loaded phase
//
// Each worker spins on a shared stop flag and does nothing else. Workers
// share no data with the calibration sequence; only their combined heat
// matters. `LoadGenerator::stop_and_join` consumes the generator so a started
// set can only be stopped once, and dropping it stops the workers too.

use log::{debug, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::CalibrationError;

/// A running set of busy-loop workers
pub struct LoadGenerator {
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    active: Arc<AtomicUsize>,
}

impl LoadGenerator {
    /// Spawn `n` busy workers
    pub fn start(n: usize) -> Result<Self, CalibrationError> {
        Self::start_with_gauge(n, Arc::new(AtomicUsize::new(0)))
    }

    /// Spawn `n` busy workers, tracking live ones in `active`
    ///
    /// # Errors
    /// `CalibrationError::LoadStart` if a thread cannot be created. The
    /// workers already running are stopped and joined first.
    pub fn start_with_gauge(n: usize, active: Arc<AtomicUsize>) -> Result<Self, CalibrationError> {
        Self::start_with_spawner(n, active, |index, body| {
            thread::Builder::new()
                .name(format!("cpu-load-{}", index + 1))
                .spawn(body)
        })
    }

    fn start_with_spawner<F>(
        n: usize,
        active: Arc<AtomicUsize>,
        mut spawn: F,
    ) -> Result<Self, CalibrationError>
    where
        F: FnMut(usize, WorkerBody) -> io::Result<JoinHandle<()>>,
    {
        let mut generator = Self {
            running: Arc::new(AtomicBool::new(true)),
            workers: Vec::with_capacity(n),
            active,
        };

        for index in 0..n {
            let running = Arc::clone(&generator.running);
            let live = LiveWorker::enter(Arc::clone(&generator.active));
            let body: WorkerBody = Box::new(move || {
                let _live = live;
                debug!("[Load] CPU {} started", index + 1);
                while running.load(Ordering::Relaxed) {
                    std::hint::spin_loop();
                }
            });

            match spawn(index, body) {
                Ok(handle) => generator.workers.push(handle),
                Err(err) => {
                    let started = generator.worker_count();
                    warn!(
                        "[Load] Failed to spawn worker {} of {}: {}",
                        index + 1,
                        n,
                        err
                    );
                    generator.stop_and_join();
                    return Err(CalibrationError::LoadStart {
                        requested: n,
                        started,
                        details: err.to_string(),
                    });
                }
            }
        }

        info!("[Load] Started {} busy workers", n);
        Ok(generator)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Workers that have not exited yet
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Signal every worker and block until all have exited
    pub fn stop_and_join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let stopped = self.workers.len();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        if stopped > 0 {
            info!("[Load] Stopped {} busy workers", stopped);
        }
    }
}

impl Drop for LoadGenerator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Entry point of one busy worker
type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

/// Live-worker gauge slot, released when the worker exits or never runs
struct LiveWorker(Arc<AtomicUsize>);

impl LiveWorker {
    fn enter(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Thermal perturbation applied during the loaded phase
pub trait ThermalLoad {
    /// Start heating, returning the number of workers started
    ///
    /// On error nothing is left running.
    fn start(&mut self) -> Result<usize, CalibrationError>;

    /// Stop heating and wait until it has fully stopped
    fn stop_and_join(&mut self);
}

/// Saturates `workers` cores with `LoadGenerator`
pub struct CpuLoad {
    workers: usize,
    generator: Option<LoadGenerator>,
    active: Arc<AtomicUsize>,
}

impl CpuLoad {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            generator: None,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl ThermalLoad for CpuLoad {
    fn start(&mut self) -> Result<usize, CalibrationError> {
        if let Some(previous) = self.generator.take() {
            previous.stop_and_join();
        }
        let generator = LoadGenerator::start_with_gauge(self.workers, Arc::clone(&self.active))?;
        let started = generator.worker_count();
        self.generator = Some(generator);
        Ok(started)
    }

    fn stop_and_join(&mut self) {
        if let Some(generator) = self.generator.take() {
            generator.stop_and_join();
        }
    }
}
