//! Configuration management for the calibration run
//!
//! Timing constants, sampling budgets, device paths and persistence targets
//! are loaded from an optional JSON file so field technicians can tune a run
//! without rebuilding. Every section falls back to the factory defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/exosense-calibrate/config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stabilization: StabilizationConfig,
    pub sampler: SamplerConfig,
    pub device: DeviceConfig,
    pub load: LoadConfig,
    pub persistence: PersistenceConfig,
}

/// Stabilization detector timing, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    /// Give up on a phase after this long
    pub timeout_secs: u64,
    /// Span covered by the moving average window
    pub moving_average_secs: u64,
    /// Delay between two readings
    pub read_interval_secs: u64,
    /// Maximum |average - latest| for a channel to count as stable
    pub delta: f64,
    /// Status LED flash period while waiting
    pub pulse_interval_secs: u64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 40 * 60,
            moving_average_secs: 3 * 60,
            read_interval_secs: 10,
            delta: 0.1,
            pulse_interval_secs: 1,
        }
    }
}

impl StabilizationConfig {
    /// Number of readings held by each moving window
    pub fn window_len(&self) -> usize {
        (self.moving_average_secs / self.read_interval_secs.max(1)) as usize
    }

    /// Number of readings taken before a phase times out
    pub fn max_ticks(&self) -> usize {
        (self.timeout_secs / self.read_interval_secs.max(1)) as usize
    }

    /// Delay between two readings; zero counts as one second
    pub fn read_interval(&self) -> Duration {
        Duration::from_secs(self.read_interval_secs.max(1))
    }

    pub fn pulse_interval(&self) -> Duration {
        Duration::from_secs(self.pulse_interval_secs.max(1))
    }
}

/// Per-channel sampling budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Successful reads averaged into one value
    pub reads: usize,
    /// Attempts allowed to collect them
    pub attempts: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            reads: 5,
            attempts: 10,
        }
    }
}

/// Device attribute layout, relative to `sysfs_dir`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub sysfs_dir: PathBuf,
    /// Temperature/humidity attribute holding the body temperature
    pub body_path: String,
    /// Whitespace-separated field of `body_path` holding the temperature
    pub body_field: usize,
    pub t1_path: String,
    pub t2_path: String,
    pub led_path: String,
    pub buzzer_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sysfs_dir: PathBuf::from("/sys/class/exosensepi/"),
            body_path: "tha/temp_rh".to_string(),
            body_field: 1,
            t1_path: "sys_temp/t1".to_string(),
            t2_path: "sys_temp/t2".to_string(),
            led_path: "led/status".to_string(),
            buzzer_path: "buzzer/beep".to_string(),
        }
    }
}

/// CPU load phase settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Busy workers to spawn; `None` uses every available core
    pub workers: Option<usize>,
    /// Pause between starting the workers and sampling again
    pub settle_secs: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: None,
            settle_secs: 1,
        }
    }
}

impl LoadConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Where results go and which service gets re-armed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Kernel module options file
    pub modprobe_conf: PathBuf,
    /// Module name used in the options line
    pub module: String,
    /// Device attribute accepting "C M B"
    pub device_attribute: String,
    /// One-shot calibration unit disabled after success
    pub unit: String,
    /// Template unit enabled with the result as instance name
    pub template: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            modprobe_conf: PathBuf::from("/etc/modprobe.d/exosensepi.conf"),
            module: "exosensepi".to_string(),
            device_attribute: "tha/temp_calib".to_string(),
            unit: "exosensepi-calibrate".to_string(),
            template: "exosensepi-calibrate".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::debug!(
                    "[Config] No config file at {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }
}
