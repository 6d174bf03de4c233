//! Relay control: manual commands and the temperature hysteresis loop.

mod controller;
pub mod hysteresis;
mod shared;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::storage::StoreError;

pub use controller::*;
pub use shared::*;

/// Lowest accepted threshold, degC.
pub const THRESHOLD_MIN: f32 = 0.0;
/// Highest accepted threshold, degC.
pub const THRESHOLD_MAX: f32 = 100.0;

/// Rejected configuration input. Nothing is changed when one is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("high threshold must be greater than low threshold")]
    ThresholdOrder,
    #[error("thresholds must be finite and within 0..=100 C")]
    ThresholdRange,
    #[error("state must be 0 or 1, got {0}")]
    InvalidState(u8),
    #[error("mode must be 0 (manual) or 1 (auto), got {0}")]
    InvalidMode(u8),
}

/// Everything the control surface can fail with.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    #[error("invalid input: {0}")]
    Validation(ValidationError),
    #[error("failed to persist relay configuration: {0}")]
    Store(StoreError),
    #[error("failed to drive relay output")]
    Output,
}

impl From<ValidationError> for ControlError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}

impl From<StoreError> for ControlError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

/// Relay output level. Serialized as 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RelayState {
    #[default]
    Off,
    On,
}

impl RelayState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl From<RelayState> for u8 {
    fn from(state: RelayState) -> Self {
        match state {
            RelayState::Off => 0,
            RelayState::On => 1,
        }
    }
}

impl TryFrom<u8> for RelayState {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            other => Err(ValidationError::InvalidState(other)),
        }
    }
}

/// Who decides the relay state. Serialized as 0 (manual) / 1 (auto).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ControlMode {
    #[default]
    Manual,
    Auto,
}

impl From<ControlMode> for u8 {
    fn from(mode: ControlMode) -> Self {
        match mode {
            ControlMode::Manual => 0,
            ControlMode::Auto => 1,
        }
    }
}

impl TryFrom<u8> for ControlMode {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Manual),
            1 => Ok(Self::Auto),
            other => Err(ValidationError::InvalidMode(other)),
        }
    }
}

/// A validated threshold pair: finite, within range, `high > low`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    high: f32,
    low: f32,
}

impl Thresholds {
    pub fn new(high: f32, low: f32) -> Result<Self, ValidationError> {
        let in_range = |t: f32| t.is_finite() && (THRESHOLD_MIN..=THRESHOLD_MAX).contains(&t);
        if !in_range(high) || !in_range(low) {
            return Err(ValidationError::ThresholdRange);
        }
        if high <= low {
            return Err(ValidationError::ThresholdOrder);
        }
        Ok(Self { high, low })
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    pub fn low(&self) -> f32 {
        self.low
    }
}

/// The persisted relay configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayConfig {
    pub state: RelayState,
    pub mode: ControlMode,
    pub thresholds: Thresholds,
}

/// Snapshot returned by every control operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelayStatus {
    pub state: RelayState,
    pub mode: ControlMode,
    #[serde(rename = "threshold_high")]
    pub high_threshold: f32,
    #[serde(rename = "threshold_low")]
    pub low_threshold: f32,
}

impl From<&RelayConfig> for RelayStatus {
    fn from(config: &RelayConfig) -> Self {
        Self {
            state: config.state,
            mode: config.mode,
            high_threshold: config.thresholds.high(),
            low_threshold: config.thresholds.low(),
        }
    }
}
