// ThermalSampler - averaged, retry-tolerant channel reads
//
// The driver occasionally fails a read (bus contention, sensor busy) or
// returns garbage. Each channel read therefore makes up to `attempts` raw
// reads and averages the first `reads` that parse. Failed attempts are
// skipped silently. There is no backoff between attempts.

use log::debug;
use std::fmt;

use super::{TemperatureReading, TemperatureSource};
use crate::config::{DeviceConfig, SamplerConfig};
use crate::device::DeviceInterface;
use crate::error::{CalibrationError, DeviceError};

/// One physical temperature source exposed by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    path: String,
    /// Whitespace-separated field to pick, `None` for single-value attributes
    field: Option<usize>,
}

impl Channel {
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            field: None,
        }
    }

    pub fn field(path: impl Into<String>, index: usize) -> Self {
        Self {
            path: path.into(),
            field: Some(index),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parse one raw attribute value into degrees
    fn parse(&self, raw: &str) -> Result<f64, DeviceError> {
        let value = match self.field {
            Some(index) => {
                raw.split_whitespace()
                    .nth(index)
                    .ok_or_else(|| DeviceError::MissingField {
                        path: self.path.clone(),
                        index,
                    })?
            }
            None => raw.trim(),
        };

        let hundredths: i64 = value.parse().map_err(|_| DeviceError::Parse {
            path: self.path.clone(),
            raw: value.to_string(),
        })?;
        Ok(hundredths as f64 / 100.0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(index) => write!(f, "{}[{}]", self.path, index),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Reads TB, T1 and T2 from a device interface
pub struct ThermalSampler<D: DeviceInterface> {
    device: D,
    body: Channel,
    t1: Channel,
    t2: Channel,
    reads: usize,
    attempts: usize,
}

impl<D: DeviceInterface> ThermalSampler<D> {
    pub fn new(device: D, channels: &DeviceConfig, budget: &SamplerConfig) -> Self {
        Self {
            device,
            body: Channel::field(channels.body_path.clone(), channels.body_field),
            t1: Channel::single(channels.t1_path.clone()),
            t2: Channel::single(channels.t2_path.clone()),
            reads: budget.reads.max(1),
            attempts: budget.attempts,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Average of the first `reads` successful reads of `channel`
    ///
    /// # Errors
    /// `CalibrationError::Read` when fewer than `reads` succeed within
    /// `attempts` tries
    pub fn read_temperature(&self, channel: &Channel) -> Result<f64, CalibrationError> {
        let mut sum = 0.0;
        let mut successes = 0;

        for _ in 0..self.attempts {
            match self
                .device
                .read(channel.path())
                .and_then(|raw| channel.parse(&raw))
            {
                Ok(value) => {
                    sum += value;
                    successes += 1;
                    if successes >= self.reads {
                        break;
                    }
                }
                Err(err) => debug!("[Sampler] Skipping failed read of {}: {}", channel, err),
            }
        }

        if successes < self.reads {
            return Err(CalibrationError::Read {
                channel: channel.to_string(),
                successes,
                required: self.reads,
                attempts: self.attempts,
            });
        }
        Ok(sum / successes as f64)
    }

    /// Read all three channels in TB, T1, T2 order
    pub fn read_all_temperatures(&self) -> Result<TemperatureReading, CalibrationError> {
        let tb = self.read_temperature(&self.body)?;
        let t1 = self.read_temperature(&self.t1)?;
        let t2 = self.read_temperature(&self.t2)?;
        Ok(TemperatureReading { tb, t1, t2 })
    }
}

impl<D: DeviceInterface> TemperatureSource for ThermalSampler<D> {
    fn read_all(&mut self) -> Result<TemperatureReading, CalibrationError> {
        self.read_all_temperatures()
    }
}
