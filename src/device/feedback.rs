// Operator feedback through the status LED and the buzzer
//
// Writes come in two flavours. Required writes return the error so startup
// can abort when the driver is missing. Best-effort writes log and swallow
// the failure, used while waiting and on the way out.

use log::warn;

use super::DeviceInterface;
use crate::config::DeviceConfig;
use crate::error::DeviceError;

/// Buzzer pattern played when the tool starts
pub const BEEP_START: &str = "100";

/// Buzzer pattern played when the tool exits, successful or not
pub const BEEP_DONE: &str = "100 100 3";

/// Status LED modes understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    Off,
    On,
    Flash,
}

impl LedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedState::Off => "0",
            LedState::On => "1",
            LedState::Flash => "F",
        }
    }
}

/// Something pulsed once per second while the detector waits
pub trait StatusPulse {
    fn pulse(&self);
}

/// No indicator attached
impl StatusPulse for () {
    fn pulse(&self) {}
}

/// LED and buzzer handle bound to a device interface
pub struct Feedback<'a> {
    device: &'a dyn DeviceInterface,
    led_path: String,
    buzzer_path: String,
}

impl<'a> Feedback<'a> {
    pub fn new(device: &'a dyn DeviceInterface, config: &DeviceConfig) -> Self {
        Self {
            device,
            led_path: config.led_path.clone(),
            buzzer_path: config.buzzer_path.clone(),
        }
    }

    pub fn led(&self, state: LedState) -> Result<(), DeviceError> {
        self.device.write(&self.led_path, state.as_str())
    }

    pub fn beep(&self, pattern: &str) -> Result<(), DeviceError> {
        self.device.write(&self.buzzer_path, pattern)
    }

    pub fn led_best_effort(&self, state: LedState) {
        if let Err(err) = self.led(state) {
            warn!("[Feedback] LED {:?} not set: {}", state, err);
        }
    }

    pub fn beep_best_effort(&self, pattern: &str) {
        if let Err(err) = self.beep(pattern) {
            warn!("[Feedback] Beep {:?} not played: {}", pattern, err);
        }
    }
}

impl StatusPulse for Feedback<'_> {
    fn pulse(&self) {
        self.led_best_effort(LedState::Flash);
    }
}
