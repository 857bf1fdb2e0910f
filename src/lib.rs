// Exo Sense calibration core
// Two-point thermal compensation of the board temperature sensor

// Module declarations
pub mod calibration;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod persistence;
pub mod simulate;
pub mod thermal;

// Re-exports for convenience
pub use calibration::{CalibrationProcedure, CalibrationReport, CalibrationResult};
pub use config::AppConfig;
pub use error::{CalibrationError, DeviceError, ErrorCode, PersistError};
pub use thermal::{TemperatureReading, ThermalSampler};

use tracing::Level;

/// Install the fmt subscriber on stderr; `log` records from the library are
/// forwarded to it
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
