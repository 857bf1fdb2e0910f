// Progress tracking for the calibration run
//
// The run goes through two stabilization phases, idle then loaded, and
// never goes back.

/// Thermal condition under which a phase is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationPhase {
    /// Step 1: board idle, only self-heating
    Idle,
    /// Step 2: all cores saturated by the load generator
    Loaded,
}

impl CalibrationPhase {
    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationPhase::Idle => "idle",
            CalibrationPhase::Loaded => "loaded",
        }
    }

    /// Suffix used in E/DT labels ("E1", "DT2")
    pub fn index(&self) -> u8 {
        match self {
            CalibrationPhase::Idle => 1,
            CalibrationPhase::Loaded => 2,
        }
    }
}
