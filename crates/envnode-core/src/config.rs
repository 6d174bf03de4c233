use serde::{Deserialize, Serialize};

use crate::control::{ControlMode, RelayState, Thresholds, ValidationError};

/// Node-wide settings fixed at startup.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct NodeConfig {
    /// Time between acquisition cycles.
    pub acquisition_interval_ms: u32,
    pub relay: RelayDefaults,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            acquisition_interval_ms: 10_000,
            relay: RelayDefaults::default(),
        }
    }
}

/// Relay configuration used on first boot and for any stored value that
/// cannot be loaded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RelayDefaults {
    pub state: RelayState,
    pub mode: ControlMode,
    pub high_threshold: f32,
    pub low_threshold: f32,
}

impl Default for RelayDefaults {
    fn default() -> Self {
        Self {
            state: RelayState::Off,
            mode: ControlMode::Manual,
            high_threshold: 30.0,
            low_threshold: 25.0,
        }
    }
}

impl RelayDefaults {
    pub fn thresholds(&self) -> Result<Thresholds, ValidationError> {
        Thresholds::new(self.high_threshold, self.low_threshold)
    }
}
