// Direct driver write of "C M B"

use super::CalibrationSink;
use crate::calibration::CalibrationResult;
use crate::device::DeviceInterface;
use crate::error::PersistError;

/// Selector written when the result carries none
pub const DEFAULT_SELECTOR: u8 = 0;

pub struct DeviceParams<'a> {
    device: &'a dyn DeviceInterface,
    attribute: String,
}

impl<'a> DeviceParams<'a> {
    pub fn new(device: &'a dyn DeviceInterface, attribute: impl Into<String>) -> Self {
        Self {
            device,
            attribute: attribute.into(),
        }
    }

    pub fn render(result: &CalibrationResult) -> String {
        format!(
            "{} {} {}",
            result.selector.unwrap_or(DEFAULT_SELECTOR),
            result.m,
            result.b
        )
    }
}

impl CalibrationSink for DeviceParams<'_> {
    fn describe(&self) -> String {
        format!("device attribute {}", self.attribute)
    }

    fn persist(&self, result: &CalibrationResult) -> Result<(), PersistError> {
        self.device
            .write(&self.attribute, &Self::render(result))
            .map_err(PersistError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct LastWrite(Mutex<Option<(String, String)>>);

    impl DeviceInterface for LastWrite {
        fn read(&self, path: &str) -> Result<String, DeviceError> {
            Err(DeviceError::Unavailable {
                path: path.to_string(),
            })
        }

        fn write(&self, path: &str, value: &str) -> Result<(), DeviceError> {
            *self.0.lock().unwrap() = Some((path.to_string(), value.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_persist_writes_selector_and_coefficients() {
        let device = LastWrite::default();
        let sink = DeviceParams::new(&device, "tha/temp_calib");
        let result = CalibrationResult::from_coefficients(-666, 333).with_selector(Some(2));
        sink.persist(&result).unwrap();

        assert_eq!(
            device.0.lock().unwrap().clone(),
            Some(("tha/temp_calib".to_string(), "2 -666 333".to_string()))
        );
    }

    #[test]
    fn test_missing_selector_uses_default() {
        let result = CalibrationResult::from_coefficients(-1000, -3000);
        assert_eq!(DeviceParams::render(&result), "0 -1000 -3000");
    }
}
